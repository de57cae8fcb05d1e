//! # Inventory Repository
//!
//! Stock items and the low stock queries built on the account threshold.
//!
//! ## Threshold
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  profiles.low_stock_threshold (per account, default 5)                  │
//! │       │                                                                 │
//! │       ├──► InventoryItem::status(threshold)   (per item, read time)     │
//! │       ├──► low_stock(scope)                   quantity < threshold      │
//! │       ├──► stats(scope).low_stock_items       COUNT(quantity < ...)     │
//! │       └──► dashboard low_stock_count          (same query as stats)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bistro_core::{AccountScope, InventoryItem, InventoryStats, DEFAULT_LOW_STOCK_THRESHOLD};
use chrono::Utc;
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::threshold_subquery;

const INVENTORY_COLUMNS: &str = "id, account_id, name, category, quantity, unit, created_at, updated_at";

/// Data needed to create an inventory item.
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: Option<String>,
    pub quantity: f64,
    pub unit: Option<String>,
}

/// Optional filters for listing inventory.
#[derive(Debug, Clone, Default)]
pub struct InventoryFilter {
    /// Case-insensitive exact category match.
    pub category: Option<String>,

    /// Case-insensitive substring over name and category.
    pub search: Option<String>,
}

/// Repository for inventory items.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Lists inventory items matching `filter`, ordered by name.
    pub async fn list(&self, scope: AccountScope, filter: &InventoryFilter) -> DbResult<Vec<InventoryItem>> {
        let category = filter.category.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let pattern = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", escape_like(s)));

        debug!(
            account_id = scope.account_id(),
            category = ?category,
            search = ?pattern,
            "Listing inventory"
        );

        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items
             WHERE account_id = ?
               AND (? IS NULL OR category = ? COLLATE NOCASE)
               AND (? IS NULL OR name LIKE ? ESCAPE '\\' OR category LIKE ? ESCAPE '\\')
             ORDER BY name COLLATE NOCASE, id"
        ))
        .bind(scope.account_id())
        .bind(category)
        .bind(category)
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .bind(pattern.as_deref())
        .fetch_all(&self.pool)
        .await?;

        debug!(count = items.len(), "Inventory listed");
        Ok(items)
    }

    /// Gets an inventory item by ID.
    pub async fn get(&self, scope: AccountScope, id: i64) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items WHERE id = ? AND account_id = ?"
        ))
        .bind(id)
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Inserts a new inventory item.
    pub async fn insert(&self, scope: AccountScope, new: &NewInventoryItem) -> DbResult<InventoryItem> {
        debug!(account_id = scope.account_id(), name = %new.name, "Inserting inventory item");

        let now = Utc::now();
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "INSERT INTO inventory_items (account_id, name, category, quantity, unit, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(scope.account_id())
        .bind(&new.name)
        .bind(&new.category)
        .bind(new.quantity)
        .bind(&new.unit)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(id = item.id, name = %item.name, quantity = item.quantity, "Inventory item created");
        Ok(item)
    }

    /// Saves an existing inventory item.
    pub async fn update(&self, scope: AccountScope, item: &InventoryItem) -> DbResult<InventoryItem> {
        debug!(id = item.id, quantity = item.quantity, "Updating inventory item");

        sqlx::query_as::<_, InventoryItem>(&format!(
            "UPDATE inventory_items
             SET name = ?, category = ?, quantity = ?, unit = ?, updated_at = ?
             WHERE id = ? AND account_id = ?
             RETURNING {INVENTORY_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.quantity)
        .bind(&item.unit)
        .bind(Utc::now())
        .bind(item.id)
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("InventoryItem", item.id))
    }

    /// Deletes an inventory item.
    pub async fn delete(&self, scope: AccountScope, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM inventory_items WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(scope.account_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", id));
        }

        info!(id, "Inventory item deleted");
        Ok(())
    }

    // =========================================================================
    // Low Stock
    // =========================================================================

    /// The account's low stock threshold.
    pub async fn threshold(&self, scope: AccountScope) -> DbResult<i64> {
        let threshold: Option<i64> =
            sqlx::query_scalar("SELECT low_stock_threshold FROM profiles WHERE account_id = ?")
                .bind(scope.account_id())
                .fetch_optional(&self.pool)
                .await?;

        Ok(threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD))
    }

    /// Items whose quantity is below the threshold, lowest first.
    pub async fn low_stock(&self, scope: AccountScope) -> DbResult<Vec<InventoryItem>> {
        let threshold = threshold_subquery();
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {INVENTORY_COLUMNS} FROM inventory_items
             WHERE account_id = ? AND quantity < {threshold}
             ORDER BY quantity, name COLLATE NOCASE"
        ))
        .bind(scope.account_id())
        .bind(scope.account_id())
        .fetch_all(&self.pool)
        .await?;

        debug!(account_id = scope.account_id(), count = items.len(), "Low stock items");
        Ok(items)
    }

    /// Item, low stock and category counts.
    pub async fn stats(&self, scope: AccountScope) -> DbResult<InventoryStats> {
        inventory_stats(&self.pool, scope).await
    }
}

/// Inventory counters, shared with the dashboard query.
pub(crate) async fn inventory_stats<'e, E>(executor: E, scope: AccountScope) -> DbResult<InventoryStats>
where
    E: Executor<'e, Database = Sqlite>,
{
    let threshold = threshold_subquery();
    let (total_items, low_stock_items, categories): (i64, i64, i64) = sqlx::query_as(&format!(
        "SELECT
            COUNT(*),
            COALESCE(SUM(CASE WHEN quantity < {threshold} THEN 1 ELSE 0 END), 0),
            COUNT(DISTINCT category)
         FROM inventory_items
         WHERE account_id = ?"
    ))
    .bind(scope.account_id())
    .bind(scope.account_id())
    .fetch_one(executor)
    .await?;

    Ok(InventoryStats {
        total_items,
        low_stock_items,
        categories,
    })
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::testing::{test_account, test_db};
    use bistro_core::StockStatus;

    fn new_item(name: &str, category: Option<&str>, quantity: f64) -> NewInventoryItem {
        NewInventoryItem {
            name: name.to_string(),
            category: category.map(str::to_string),
            quantity,
            unit: Some("kg".to_string()),
        }
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("tomato"), "tomato");
    }

    #[tokio::test]
    async fn test_crud() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.inventory();

        let mut item = repo
            .insert(scope, &new_item("Tomatoes", Some("Vegetables"), 50.0))
            .await
            .unwrap();
        assert_eq!(repo.get(scope, item.id).await.unwrap().unwrap(), item);

        item.quantity = 12.5;
        let updated = repo.update(scope, &item).await.unwrap();
        assert!((updated.quantity - 12.5).abs() < f64::EPSILON);

        repo.delete(scope, item.id).await.unwrap();
        assert!(repo.get(scope, item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.inventory();

        repo.insert(scope, &new_item("Tomatoes", Some("Vegetables"), 50.0)).await.unwrap();
        repo.insert(scope, &new_item("Lettuce", Some("Vegetables"), 30.0)).await.unwrap();
        repo.insert(scope, &new_item("Cheese", Some("Dairy"), 5.0)).await.unwrap();

        let veg = repo
            .list(
                scope,
                &InventoryFilter {
                    category: Some("vegetables".to_string()),
                    search: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(veg.len(), 2);

        let search = repo
            .list(
                scope,
                &InventoryFilter {
                    category: None,
                    search: Some("CHEE".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].name, "Cheese");

        // Search also covers the category.
        let by_category_text = repo
            .list(
                scope,
                &InventoryFilter {
                    category: None,
                    search: Some("dair".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(by_category_text.len(), 1);

        let all = repo.list(scope, &InventoryFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["Cheese", "Lettuce", "Tomatoes"]);
    }

    #[tokio::test]
    async fn test_low_stock_boundary() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.inventory();

        let low = repo.insert(scope, &new_item("Basil", None, 4.9)).await.unwrap();
        let ok = repo.insert(scope, &new_item("Cheese", Some("Dairy"), 5.0)).await.unwrap();

        let threshold = repo.threshold(scope).await.unwrap();
        assert_eq!(threshold, 5);
        assert_eq!(low.status(threshold), StockStatus::LowStock);
        assert_eq!(ok.status(threshold), StockStatus::InStock);

        let low_items = repo.low_stock(scope).await.unwrap();
        assert_eq!(low_items.len(), 1);
        assert_eq!(low_items[0].id, low.id);

        let stats = repo.stats(scope).await.unwrap();
        assert_eq!(
            stats,
            InventoryStats {
                total_items: 2,
                low_stock_items: 1,
                categories: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_threshold_follows_profile() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.inventory();

        repo.insert(scope, &new_item("Cheese", None, 5.0)).await.unwrap();
        assert!(repo.low_stock(scope).await.unwrap().is_empty());

        sqlx::query("UPDATE profiles SET low_stock_threshold = 10 WHERE account_id = ?")
            .bind(scope.account_id())
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(repo.threshold(scope).await.unwrap(), 10);
        assert_eq!(repo.low_stock(scope).await.unwrap().len(), 1);
        assert_eq!(repo.stats(scope).await.unwrap().low_stock_items, 1);
    }

    #[tokio::test]
    async fn test_missing_profile_uses_default_threshold() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let repo = db.inventory();

        let below = (DEFAULT_LOW_STOCK_THRESHOLD as f64) - 0.1;
        repo.insert(scope, &new_item("Basil", None, below)).await.unwrap();
        repo.insert(scope, &new_item("Cheese", None, DEFAULT_LOW_STOCK_THRESHOLD as f64))
            .await
            .unwrap();

        sqlx::query("DELETE FROM profiles WHERE account_id = ?")
            .bind(scope.account_id())
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(repo.threshold(scope).await.unwrap(), DEFAULT_LOW_STOCK_THRESHOLD);
        assert_eq!(repo.low_stock(scope).await.unwrap().len(), 1);
        assert_eq!(repo.stats(scope).await.unwrap().low_stock_items, 1);
    }

    #[tokio::test]
    async fn test_scoped_to_account() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;
        let repo = db.inventory();

        let item = repo.insert(alice, &new_item("Buns", Some("Bread"), 1.0)).await.unwrap();

        assert!(repo.get(bob, item.id).await.unwrap().is_none());
        assert!(repo.low_stock(bob).await.unwrap().is_empty());
        assert_eq!(repo.stats(bob).await.unwrap(), InventoryStats::default());
        assert!(matches!(
            repo.delete(bob, item.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_negative_quantity_rejected_by_schema() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;

        let err = db
            .inventory()
            .insert(scope, &new_item("Ghost", None, -1.0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }
}
