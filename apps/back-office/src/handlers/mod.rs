//! # HTTP Handlers
//!
//! One module per resource. Each module owns its request/response DTOs and
//! exposes a `routes()` function; this module stitches them together.
//!
//! ## Route Map
//! ```text
//! /health                              GET
//! /users/register|login|logout         POST
//! /users/profile                       GET
//! /users/profile/update                PUT PATCH
//! /users/settings                      GET PUT PATCH
//! /users/change-password               POST
//! /users/check-username|check-email    GET
//! /menu-items[/{id}]                   CRUD
//! /inventory[/{id}]                    CRUD
//! /inventory/stats|low_stock           GET
//! /orders[/{id}]                       CRUD (create also at /orders/create_order)
//! /orders/pay-order|pay_order          POST (also /pay-order)
//! /billing-history[/{id}]              CRUD
//! /billing-history/{id}/items          GET
//! /dashboard/dashboard_stats           GET
//! ```

use axum::Router;

use crate::AppState;

pub mod account;
pub mod billing;
pub mod dashboard;
pub mod health;
pub mod inventory;
pub mod menu;
pub mod order;

/// All routes, without state or middleware.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .nest("/users", account::routes())
        .nest("/menu-items", menu::routes())
        .nest("/inventory", inventory::routes())
        .merge(order::routes())
        .nest("/billing-history", billing::routes())
        .nest("/dashboard", dashboard::routes())
}
