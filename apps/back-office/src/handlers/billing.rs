//! Billing history handlers.
//!
//! Invoices are immutable apart from the customer name.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use bistro_core::money::decimal;
use bistro_core::validation::validate_name;
use bistro_core::{BillingLine, BillingRecord, Money};
use bistro_db::NewBillingRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthAccount;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_billing).post(create_billing))
        .route(
            "/{id}",
            get(get_billing)
                .put(update_billing)
                .patch(update_billing)
                .delete(delete_billing),
        )
        .route("/{id}/items", get(billing_items))
}

#[derive(Debug, Clone, Serialize)]
pub struct BillingDto {
    pub id: i64,
    pub order_number: String,
    pub customer_name: String,
    #[serde(with = "decimal")]
    pub total_amount: Money,
    pub order_date: DateTime<Utc>,
    pub paid_at: DateTime<Utc>,
    /// Stored snapshot JSON text
    pub items_summary: String,
}

impl From<BillingRecord> for BillingDto {
    fn from(record: BillingRecord) -> Self {
        BillingDto {
            id: record.id,
            total_amount: record.total_amount(),
            order_number: record.order_number,
            customer_name: record.customer_name,
            order_date: record.order_date,
            paid_at: record.paid_at,
            items_summary: record.items_summary,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateBillingRequest {
    pub order_number: String,
    pub customer_name: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
    pub items: Vec<BillingLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct BillingLineInput {
    pub name: String,
    pub quantity: i64,
    #[serde(with = "decimal")]
    pub price: Money,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateBillingRequest {
    pub customer_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BillingItemsResponse {
    pub items: Vec<BillingLine>,
}

/// `GET /billing-history`, newest first.
pub async fn list_billing(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<Vec<BillingDto>>> {
    let records = state.db.billing().list(auth.scope()).await?;
    Ok(Json(records.into_iter().map(BillingDto::from).collect()))
}

/// `POST /billing-history`
///
/// Manual invoice; subtotals and the total are computed here.
pub async fn create_billing(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<CreateBillingRequest>,
) -> ApiResult<(StatusCode, Json<BillingDto>)> {
    let order_number = validate_name("order_number", &req.order_number, 50)?;

    let lines = req
        .items
        .into_iter()
        .map(|line| -> ApiResult<BillingLine> {
            let name = validate_name("name", &line.name, 100)?;
            Ok(BillingLine::priced(name, line.quantity, line.price)?)
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let record = state
        .db
        .billing()
        .create(
            auth.scope(),
            &NewBillingRecord {
                order_number,
                customer_name: req.customer_name,
                order_date: req.order_date,
                lines,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// `GET /billing-history/{id}`
pub async fn get_billing(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<Json<BillingDto>> {
    let record = find(&state, &auth, id).await?;
    Ok(Json(record.into()))
}

/// `PUT|PATCH /billing-history/{id}`
pub async fn update_billing(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
    Json(req): Json<UpdateBillingRequest>,
) -> ApiResult<Json<BillingDto>> {
    let record = state
        .db
        .billing()
        .update_customer_name(auth.scope(), id, req.customer_name.as_deref())
        .await?;
    Ok(Json(record.into()))
}

/// `DELETE /billing-history/{id}`
pub async fn delete_billing(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.billing().delete(auth.scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /billing-history/{id}/items`
///
/// A snapshot that no longer parses yields an empty list.
pub async fn billing_items(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<Json<BillingItemsResponse>> {
    let record = find(&state, &auth, id).await?;
    Ok(Json(BillingItemsResponse {
        items: record.lines(),
    }))
}

async fn find(state: &AppState, auth: &AuthAccount, id: i64) -> ApiResult<BillingRecord> {
    state
        .db
        .billing()
        .get(auth.scope(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("BillingHistory", &id.to_string()))
}
