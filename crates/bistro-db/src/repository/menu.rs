//! # Menu Repository
//!
//! Menu item CRUD, scoped to one account.
//!
//! Deleting a menu item does not touch existing orders: their line items
//! keep the frozen name, category and price, and `menu_item_id` becomes NULL.

use bistro_core::{AccountScope, MenuItem, Money};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};

const MENU_COLUMNS: &str = "id, account_id, name, price_cents, category, created_at, updated_at";

/// Data needed to create a menu item.
#[derive(Debug, Clone)]
pub struct NewMenuItem {
    pub name: String,
    pub price: Money,
    pub category: Option<String>,
}

/// Repository for menu items.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.menu();
///
/// let burgers = repo.list(scope, Some("burgers")).await?;
/// let item = repo.get(scope, 42).await?;
/// ```
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Lists the account's menu items, ordered by category then name.
    ///
    /// ## Arguments
    /// * `category` - Case-insensitive exact category filter
    pub async fn list(&self, scope: AccountScope, category: Option<&str>) -> DbResult<Vec<MenuItem>> {
        let category = category.map(str::trim).filter(|c| !c.is_empty());
        debug!(account_id = scope.account_id(), category = ?category, "Listing menu items");

        let items = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items
             WHERE account_id = ?
               AND (? IS NULL OR category = ? COLLATE NOCASE)
             ORDER BY category COLLATE NOCASE, name COLLATE NOCASE, id"
        ))
        .bind(scope.account_id())
        .bind(category)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Menu items listed");
        Ok(items)
    }

    /// Gets a menu item by ID.
    ///
    /// ## Returns
    /// * `Ok(Some(MenuItem))` - Item found in this account
    /// * `Ok(None)` - No such item, or it belongs to another account
    pub async fn get(&self, scope: AccountScope, id: i64) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ? AND account_id = ?"
        ))
        .bind(id)
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts a new menu item.
    pub async fn insert(&self, scope: AccountScope, new: &NewMenuItem) -> DbResult<MenuItem> {
        debug!(account_id = scope.account_id(), name = %new.name, "Inserting menu item");

        let now = Utc::now();
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            "INSERT INTO menu_items (account_id, name, price_cents, category, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(scope.account_id())
        .bind(&new.name)
        .bind(new.price.cents())
        .bind(&new.category)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(id = item.id, name = %item.name, "Menu item created");
        Ok(item)
    }

    /// Saves name, price and category of an existing item.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Item missing or owned by another account
    pub async fn update(&self, scope: AccountScope, item: &MenuItem) -> DbResult<MenuItem> {
        debug!(id = item.id, "Updating menu item");

        sqlx::query_as::<_, MenuItem>(&format!(
            "UPDATE menu_items SET name = ?, price_cents = ?, category = ?, updated_at = ?
             WHERE id = ? AND account_id = ?
             RETURNING {MENU_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(item.price_cents)
        .bind(&item.category)
        .bind(Utc::now())
        .bind(item.id)
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("MenuItem", item.id))
    }

    /// Deletes a menu item.
    pub async fn delete(&self, scope: AccountScope, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM menu_items WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(scope.account_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }

        info!(id, "Menu item deleted");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{test_account, test_db};

    fn new_item(name: &str, cents: i64, category: Option<&str>) -> NewMenuItem {
        NewMenuItem {
            name: name.to_string(),
            price: Money::from_cents(cents),
            category: category.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.menu();

        let item = repo
            .insert(scope, &new_item("Cheeseburger", 899, Some("Burgers")))
            .await
            .unwrap();
        assert_eq!(item.price().cents(), 899);
        assert_eq!(item.account_id, scope.account_id());

        let fetched = repo.get(scope, item.id).await.unwrap().unwrap();
        assert_eq!(fetched, item);
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.menu();

        repo.insert(scope, &new_item("Soda", 199, Some("Drinks"))).await.unwrap();
        repo.insert(scope, &new_item("Milkshake", 499, Some("Drinks"))).await.unwrap();
        repo.insert(scope, &new_item("Cheeseburger", 899, Some("Burgers"))).await.unwrap();

        let all = repo.list(scope, None).await.unwrap();
        let names: Vec<_> = all.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Cheeseburger", "Milkshake", "Soda"]);

        let drinks = repo.list(scope, Some("drinks")).await.unwrap();
        assert_eq!(drinks.len(), 2);
        assert!(repo.list(scope, Some("Desserts")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.menu();

        let mut item = repo.insert(scope, &new_item("Pizza", 1299, None)).await.unwrap();
        item.price_cents = 1399;
        item.category = Some("Main".to_string());

        let updated = repo.update(scope, &item).await.unwrap();
        assert_eq!(updated.price_cents, 1399);
        assert_eq!(updated.category.as_deref(), Some("Main"));

        repo.delete(scope, item.id).await.unwrap();
        assert!(repo.get(scope, item.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(scope, item.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_other_account_cannot_see_or_touch() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;
        let repo = db.menu();

        let item = repo.insert(alice, &new_item("Pasta", 1099, Some("Main"))).await.unwrap();

        assert!(repo.get(bob, item.id).await.unwrap().is_none());
        assert!(repo.list(bob, None).await.unwrap().is_empty());
        assert!(matches!(
            repo.update(bob, &item).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
        assert!(matches!(
            repo.delete(bob, item.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_negative_price_rejected_by_schema() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;

        let err = db
            .menu()
            .insert(scope, &new_item("Refund", -100, None))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
