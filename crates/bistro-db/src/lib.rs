//! # bistro-db: Database Layer for the Bistro Back Office
//!
//! This crate provides database access for the back office.
//! It uses SQLite with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Back Office Data Flow                            │
//! │                                                                         │
//! │  HTTP handler (POST /orders/pay-order)                                 │
//! │       │  AccountScope from the auth token                               │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     bistro-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ AccountRepo   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ MenuRepo      │    │ 001_init.sql │  │   │
//! │  │   │ Connection    │    │ InventoryRepo │    │              │  │   │
//! │  │   │ Management    │    │ OrderRepo     │    │              │  │   │
//! │  │   │               │    │ BillingRepo   │    │              │  │   │
//! │  │   │               │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bistro_core::{AccountScope, LineRequest};
//! use bistro_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./bistro.db")).await?;
//!
//! let scope = AccountScope::new(account.id);
//! let order = db
//!     .orders()
//!     .create(scope, Some("Alice"), &[LineRequest { menu_item_id: 1, quantity: 2 }])
//!     .await?;
//! let invoice = db.orders().pay(scope, order.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::account::{AccountRepository, NewAccount};
pub use repository::billing::{BillingRepository, NewBillingRecord};
pub use repository::inventory::{InventoryFilter, InventoryRepository, NewInventoryItem};
pub use repository::menu::{MenuRepository, NewMenuItem};
pub use repository::order::OrderRepository;
pub use repository::report::ReportRepository;
