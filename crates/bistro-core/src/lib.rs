//! # bistro-core: Pure Business Logic for the Bistro Back Office
//!
//! This crate holds every rule of the back office that can be expressed
//! without touching a database or a socket.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Bistro Back Office Architecture                     │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Dashboard (browser)                          │   │
//! │  │    Menu ──► Orders ──► Pay ──► Billing ──► Reports              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JSON over HTTP                         │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    back-office (axum)                           │   │
//! │  │    create_order, pay_order, dashboard_stats, etc.               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ bistro-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │  types  │ │  money  │ │ pricing │ │snapshot │ │ report  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    bistro-db (Database Layer)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Account, MenuItem, Order, BillingRecord, ...)
//! - [`money`] - Money in integer cents, decimal only at the JSON edge
//! - [`pricing`] - Order line pricing and totals
//! - [`snapshot`] - Billing item snapshot codec
//! - [`stock`] - Low stock derivation
//! - [`report`] - Dashboard and inventory aggregates
//! - [`validation`] - Input validation rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use bistro_core::money::Money;
//!
//! let burger = Money::parse_decimal("8.99").unwrap();
//! let fries = Money::parse_decimal("3.99").unwrap();
//!
//! let total = burger.multiply_quantity(2) + fries;
//! assert_eq!(total.cents(), 2197);
//! assert_eq!(total.to_string(), "21.97");
//! ```

pub mod error;
pub mod money;
pub mod pricing;
pub mod report;
pub mod snapshot;
pub mod stock;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use pricing::{LineRequest, PricedLine, PricedOrder};
pub use report::{DailyActivity, DashboardStats, InventoryStats};
pub use snapshot::{BillingLine, BillingSnapshot};
pub use stock::StockStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Low stock threshold for accounts that never changed it.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum quantity of a single menu item on one order line.
///
/// Guards against typing 1000 instead of 10 at the counter.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of lines on a single order.
pub const MAX_ORDER_LINES: usize = 100;
