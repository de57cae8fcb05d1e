//! Menu item handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bistro_core::money::decimal;
use bistro_core::validation::{validate_name, validate_optional_text, validate_price};
use bistro_core::{MenuItem, Money};
use bistro_db::NewMenuItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthAccount;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::extract::{Json, Path, Query};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_menu_items).post(create_menu_item))
        .route(
            "/{id}",
            get(get_menu_item)
                .put(replace_menu_item)
                .patch(patch_menu_item)
                .delete(delete_menu_item),
        )
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuItemDto {
    pub id: i64,
    pub name: String,
    #[serde(with = "decimal")]
    pub price: Money,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<MenuItem> for MenuItemDto {
    fn from(item: MenuItem) -> Self {
        MenuItemDto {
            id: item.id,
            price: item.price(),
            name: item.name,
            category: item.category,
            created_at: item.created_at,
        }
    }
}

/// Body for create, PUT and PATCH.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MenuItemRequest {
    pub name: Option<String>,
    #[serde(with = "decimal::option")]
    pub price: Option<Money>,
    pub category: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MenuQuery {
    pub category: Option<String>,
}

/// Validated fields of a full menu item body.
fn validate_full(req: &MenuItemRequest) -> ApiResult<NewMenuItem> {
    let mut errors = FieldErrors::default();

    let name = errors
        .check(validate_name("name", req.name.as_deref().unwrap_or_default(), 100))
        .unwrap_or_default();
    let price = match req.price {
        Some(price) => {
            errors.check(validate_price(price));
            price
        }
        None => {
            errors.push("price", "price is required");
            Money::zero()
        }
    };
    let category = errors
        .check(validate_optional_text("category", req.category.as_deref(), 50))
        .flatten();
    errors.into_result()?;

    Ok(NewMenuItem {
        name,
        price,
        category,
    })
}

/// `GET /menu-items?category=`
pub async fn list_menu_items(
    State(state): State<AppState>,
    auth: AuthAccount,
    Query(query): Query<MenuQuery>,
) -> ApiResult<Json<Vec<MenuItemDto>>> {
    let items = state
        .db
        .menu()
        .list(auth.scope(), query.category.as_deref())
        .await?;
    Ok(Json(items.into_iter().map(MenuItemDto::from).collect()))
}

/// `POST /menu-items`
pub async fn create_menu_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<MenuItemRequest>,
) -> ApiResult<(StatusCode, Json<MenuItemDto>)> {
    let new = validate_full(&req)?;
    let item = state.db.menu().insert(auth.scope(), &new).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// `GET /menu-items/{id}`
pub async fn get_menu_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<Json<MenuItemDto>> {
    let item = find(&state, &auth, id).await?;
    Ok(Json(item.into()))
}

/// `PUT /menu-items/{id}`
pub async fn replace_menu_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
    Json(req): Json<MenuItemRequest>,
) -> ApiResult<Json<MenuItemDto>> {
    let mut item = find(&state, &auth, id).await?;
    let new = validate_full(&req)?;

    item.name = new.name;
    item.price_cents = new.price.cents();
    item.category = new.category;

    let item = state.db.menu().update(auth.scope(), &item).await?;
    Ok(Json(item.into()))
}

/// `PATCH /menu-items/{id}`
pub async fn patch_menu_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
    Json(req): Json<MenuItemRequest>,
) -> ApiResult<Json<MenuItemDto>> {
    let mut item = find(&state, &auth, id).await?;
    let mut errors = FieldErrors::default();

    if let Some(name) = &req.name {
        if let Some(name) = errors.check(validate_name("name", name, 100)) {
            item.name = name;
        }
    }
    if let Some(price) = req.price {
        if errors.check(validate_price(price)).is_some() {
            item.price_cents = price.cents();
        }
    }
    if let Some(category) = &req.category {
        if let Some(category) = errors.check(validate_optional_text("category", Some(category), 50)) {
            item.category = category;
        }
    }
    errors.into_result()?;

    let item = state.db.menu().update(auth.scope(), &item).await?;
    Ok(Json(item.into()))
}

/// `DELETE /menu-items/{id}`
///
/// Order lines that reference the item keep their name and price.
pub async fn delete_menu_item(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.menu().delete(auth.scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn find(state: &AppState, auth: &AuthAccount, id: i64) -> ApiResult<MenuItem> {
    state
        .db
        .menu()
        .get(auth.scope(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("MenuItem", &id.to_string()))
}
