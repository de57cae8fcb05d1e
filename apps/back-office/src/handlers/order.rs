//! # Order Handlers
//!
//! Order creation, the pay workflow and order CRUD.
//!
//! ```text
//! POST /orders/create_order {customer_name, items:[{menu_item_id, quantity}]}
//!      │
//!      ▼  one transaction: price lines, insert order + items
//! 201 Order (total = Σ price × quantity)
//!
//! POST /orders/pay-order {order_id}
//!      │
//!      ▼  one transaction: claim, snapshot, insert billing, delete order
//! 200 {message, billing_id, order_number, total_amount}
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use bistro_core::money::decimal;
use bistro_core::{CoreError, LineRequest, Money, Order, OrderItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthAccount;
use crate::error::{ApiError, ApiResult};
use crate::extract::{Json, Path};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/create_order", post(create_order))
        .route("/orders/pay-order", post(pay_order))
        .route("/orders/pay_order", post(pay_order))
        .route("/pay-order", post(pay_order))
        .route(
            "/orders/{id}",
            get(get_order)
                .put(update_order)
                .patch(update_order)
                .delete(delete_order),
        )
}

// =============================================================================
// DTOs
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct OrderItemDto {
    pub id: i64,
    /// Menu item id; null once the menu item is deleted
    pub menu_item: Option<i64>,
    pub menu_item_name: String,
    pub menu_item_category: Option<String>,
    pub quantity: i64,
    #[serde(with = "decimal")]
    pub price: Money,
    #[serde(with = "decimal")]
    pub subtotal: Money,
}

impl From<OrderItem> for OrderItemDto {
    fn from(item: OrderItem) -> Self {
        OrderItemDto {
            id: item.id,
            price: item.price(),
            subtotal: item.subtotal(),
            menu_item: item.menu_item_id,
            menu_item_name: item.menu_item_name,
            menu_item_category: item.menu_item_category,
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderDto {
    pub id: i64,
    pub customer_name: String,
    pub order_number: String,
    pub order_date: DateTime<Utc>,
    #[serde(with = "decimal")]
    pub total: Money,
    pub items: Vec<OrderItemDto>,
}

impl From<Order> for OrderDto {
    fn from(order: Order) -> Self {
        OrderDto {
            id: order.id,
            total: order.total(),
            customer_name: order.customer_name,
            order_number: order.order_number,
            order_date: order.order_date,
            items: order.items.into_iter().map(OrderItemDto::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateOrderRequest {
    pub customer_name: Option<String>,
    pub items: Vec<LineInput>,
}

#[derive(Debug, Deserialize)]
pub struct LineInput {
    pub menu_item_id: Option<i64>,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateOrderRequest {
    pub customer_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PayOrderRequest {
    pub order_id: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct PayOrderResponse {
    pub message: &'static str,
    pub billing_id: i64,
    pub order_number: String,
    #[serde(with = "decimal")]
    pub total_amount: Money,
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /orders/create_order` (also `POST /orders`)
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<OrderDto>)> {
    if req.items.is_empty() {
        return Err(CoreError::EmptyOrder.into());
    }

    let lines = req
        .items
        .iter()
        .map(|line| {
            line.menu_item_id
                .map(|menu_item_id| LineRequest {
                    menu_item_id,
                    quantity: line.quantity,
                })
                .ok_or_else(|| ApiError::invalid_input("Each item must have menu_item_id."))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let order = state
        .db
        .orders()
        .create(auth.scope(), req.customer_name.as_deref(), &lines)
        .await?;

    Ok((StatusCode::CREATED, Json(order.into())))
}

/// `POST /orders/pay-order`
///
/// Converts the order into a billing record and deletes it.
pub async fn pay_order(
    State(state): State<AppState>,
    auth: AuthAccount,
    Json(req): Json<PayOrderRequest>,
) -> ApiResult<Json<PayOrderResponse>> {
    let order_id = req
        .order_id
        .ok_or_else(|| ApiError::invalid_input("Order ID is required"))?;

    let billing = state.db.orders().pay(auth.scope(), order_id).await?;
    info!(order_id, billing_id = billing.id, "Payment recorded");

    Ok(Json(PayOrderResponse {
        message: "Payment successful",
        billing_id: billing.id,
        total_amount: billing.total_amount(),
        order_number: billing.order_number,
    }))
}

/// `GET /orders`, newest first.
pub async fn list_orders(
    State(state): State<AppState>,
    auth: AuthAccount,
) -> ApiResult<Json<Vec<OrderDto>>> {
    let orders = state.db.orders().list(auth.scope()).await?;
    Ok(Json(orders.into_iter().map(OrderDto::from).collect()))
}

/// `GET /orders/{id}`
pub async fn get_order(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<Json<OrderDto>> {
    let order = state
        .db
        .orders()
        .get(auth.scope(), id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", &id.to_string()))?;
    Ok(Json(order.into()))
}

/// `PUT|PATCH /orders/{id}`
///
/// Only the customer name is editable; items and total are fixed.
pub async fn update_order(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
    Json(req): Json<UpdateOrderRequest>,
) -> ApiResult<Json<OrderDto>> {
    let order = state
        .db
        .orders()
        .update_customer_name(auth.scope(), id, req.customer_name.as_deref())
        .await?;
    Ok(Json(order.into()))
}

/// `DELETE /orders/{id}`
pub async fn delete_order(
    State(state): State<AppState>,
    auth: AuthAccount,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.db.orders().delete(auth.scope(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
