//! # Repository Module
//!
//! Database repository implementations for the back office.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler                                                          │
//! │       │                                                                 │
//! │       │  db.menu().list(scope, Some("Burgers"))                         │
//! │       ▼                                                                 │
//! │  MenuRepository                                                        │
//! │  ├── list(&self, scope, category)                                      │
//! │  ├── get(&self, scope, id)                                             │
//! │  ├── insert(&self, scope, item)                                        │
//! │  └── update(&self, scope, item)                                        │
//! │       │                                                                 │
//! │       │  SQL ... WHERE account_id = ?                                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Account Scoping
//! Every method that touches account-owned rows takes an
//! [`AccountScope`](bistro_core::AccountScope) and filters on it. A row
//! owned by someone else reads as "not found", never as "forbidden".
//!
//! ## Available Repositories
//!
//! - [`AccountRepository`](account::AccountRepository) - Accounts, tokens, profile, settings
//! - [`MenuRepository`](menu::MenuRepository) - Menu item CRUD
//! - [`InventoryRepository`](inventory::InventoryRepository) - Stock CRUD and low stock queries
//! - [`OrderRepository`](order::OrderRepository) - Order creation and the pay workflow
//! - [`BillingRepository`](billing::BillingRepository) - Invoice history
//! - [`ReportRepository`](report::ReportRepository) - Dashboard aggregates

pub mod account;
pub mod billing;
pub mod inventory;
pub mod menu;
pub mod order;
pub mod report;

use bistro_core::DEFAULT_LOW_STOCK_THRESHOLD;

/// Threshold lookup shared by the inventory and reporting queries.
///
/// Falls back to [`DEFAULT_LOW_STOCK_THRESHOLD`] when the account has no
/// profile row. Binds one parameter: the account id.
pub(crate) fn threshold_subquery() -> String {
    format!(
        "COALESCE((SELECT low_stock_threshold FROM profiles WHERE account_id = ?), \
         {DEFAULT_LOW_STOCK_THRESHOLD})"
    )
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for repository tests.

    use bistro_core::AccountScope;

    use crate::repository::account::NewAccount;
    use crate::{Database, DbConfig};

    /// Fresh, migrated in-memory database.
    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }

    /// Registers `username` and returns its scope.
    pub async fn test_account(db: &Database, username: &str) -> AccountScope {
        let account = db
            .accounts()
            .register(&NewAccount {
                username: username.to_string(),
                email: format!("{username}@example.com"),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: "$argon2id$test".to_string(),
                restaurant_name: None,
            })
            .await
            .expect("register test account");
        AccountScope::new(account.id)
    }
}
