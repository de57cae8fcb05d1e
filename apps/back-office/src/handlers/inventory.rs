//! # Inventory Handlers
//!
//! Stock CRUD plus the low stock views. Every item is returned with its
//! derived `status`, computed from the caller's `low_stock_threshold`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bistro_core::validation::{
    validate_name, validate_optional_text, validate_search_query, validate_stock_quantity,
};
use bistro_core::{InventoryItem, InventoryStats, StockStatus};
use bistro_db::{InventoryFilter, NewInventoryItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthAccount;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{Json, Path, Query};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inventory).post(create_inventory_item))
        .route("/stats", get(inventory_stats))
        .route("/low_stock", get(low_stock))
        .route(
            "/{id}",
            get(get_inventory_item)
                .put(replace_inventory_item)
                .patch(patch_inventory_item)
                .delete(delete_inventory_item),
        )
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryItemDto {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItemDto {
    fn new(item: InventoryItem, threshold: i64) -> Self {
        InventoryItemDto {
            status: item.status(threshold),
            id: item.id,
            name: item.name,
            category: item.category,
            quantity: item.quantity,
            unit: item.unit,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InventoryItemRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct InventoryQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

fn validate_full(req: &InventoryItemRequest) -> ApiResult<NewInventoryItem> {
    let mut errors = FieldErrors::default();

    let name = errors
        .check(validate_name("name", req.name.as_deref().unwrap_or_default(), 100))
        .unwrap_or_default();
    let quantity = match req.quantity {
        Some(quantity) => {
            errors.check(validate_stock_quantity(quantity));
            quantity
        }
        None => {
            errors.push("quantity", "quantity is required");
            0.0
        }
    };
    let category = errors
        .check(validate_optional_text("category", req.category.as_deref(), 50))
        .flatten();
    let unit = errors
        .check(validate_optional_text("unit", req.unit.as_deref(), 20))
        .flatten();
    errors.into_result()?;

    Ok(NewInventoryItem {
        name,
        category,
        quantity,
        unit,
    })
}

/// `GET /inventory?category=&search=`
pub async fn list_inventory(
    State(state): State<AppState>,
    auth: AuthAccount,
    Query(query): Query<InventoryQuery>,
) -> ApiResult<Json<Vec<InventoryItemDto>>> {
    let filter = InventoryFilter {
        category: query.category,
        search: validate_search_query(query.search.as_deref())?,
    };

    let repo = state.db.inventory();
    let threshold = repo.threshold(auth.scope()).await?;
    let items = repo.list(auth.scope(), &filter).await?;

    Ok(Json(
        items
            .into_iter()
            .map(|item| InventoryItemDto::new(item, threshold))
            .collect(),
    ))
}

/// `POST /inventory`
pub async fn create_inventory_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<InventoryItemRequest>,
) -> ApiResult<(StatusCode, Json<InventoryItemDto>)> {
    let new = validate_full(&req)?;

    let repo = state.db.inventory();
    let item = repo.insert(auth.scope(), &new).await?;
    let threshold = repo.threshold(auth.scope()).await?;

    Ok((StatusCode::CREATED, Json(InventoryItemDto::new(item, threshold))))
}

/// `GET /inventory/{id}`
pub async fn get_inventory_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<Json<InventoryItemDto>> {
    let item = find(&state, &auth, id).await?;
    let threshold = state.db.inventory().threshold(auth.scope()).await?;
    Ok(Json(InventoryItemDto::new(item, threshold)))
}

/// `PUT /inventory/{id}`
pub async fn replace_inventory_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
    Json(req): Json<InventoryItemRequest>,
) -> ApiResult<Json<InventoryItemDto>> {
    let mut item = find(&state, &auth, id).await?;
    let new = validate_full(&req)?;

    item.name = new.name;
    item.category = new.category;
    item.quantity = new.quantity;
    item.unit = new.unit;

    save(&state, &auth, &item).await
}

/// `PATCH /inventory/{id}`
pub async fn patch_inventory_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
    Json(req): Json<InventoryItemRequest>,
) -> ApiResult<Json<InventoryItemDto>> {
    let mut item = find(&state, &auth, id).await?;
    let mut errors = FieldErrors::default();

    if let Some(name) = &req.name {
        if let Some(name) = errors.check(validate_name("name", name, 100)) {
            item.name = name;
        }
    }
    if let Some(category) = &req.category {
        if let Some(category) = errors.check(validate_optional_text("category", Some(category), 50)) {
            item.category = category;
        }
    }
    if let Some(quantity) = req.quantity {
        if errors.check(validate_stock_quantity(quantity)).is_some() {
            item.quantity = quantity;
        }
    }
    if let Some(unit) = &req.unit {
        if let Some(unit) = errors.check(validate_optional_text("unit", Some(unit), 20)) {
            item.unit = unit;
        }
    }
    errors.into_result()?;

    save(&state, &auth, &item).await
}

/// `DELETE /inventory/{id}`
pub async fn delete_inventory_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.inventory().delete(auth.scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /inventory/stats`
pub async fn inventory_stats(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<InventoryStats>> {
    let stats = state.db.inventory().stats(auth.scope()).await?;
    Ok(Json(stats))
}

/// `GET /inventory/low_stock`
pub async fn low_stock(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<Vec<InventoryItemDto>>> {
    let repo = state.db.inventory();
    let threshold = repo.threshold(auth.scope()).await?;
    let items = repo.low_stock(auth.scope()).await?;

    Ok(Json(
        items
            .into_iter()
            .map(|item| InventoryItemDto::new(item, threshold))
            .collect(),
    ))
}

async fn find(state: &AppState, auth: &AuthAccount, id: i64) -> ApiResult<InventoryItem> {
    state
        .db
        .inventory()
        .get(auth.scope(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("InventoryItem", &id.to_string()))
}

async fn save(
    state: &AppState,
    auth: &AuthAccount,
    item: &InventoryItem,
) -> ApiResult<Json<InventoryItemDto>> {
    let repo = state.db.inventory();
    let item = repo.update(auth.scope(), item).await?;
    let threshold = repo.threshold(auth.scope()).await?;
    Ok(Json(InventoryItemDto::new(item, threshold)))
}
