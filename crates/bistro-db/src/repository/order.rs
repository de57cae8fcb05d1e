//! # Order Repository
//!
//! Order creation and the pay workflow. Both run in a single transaction.
//!
//! ## Create
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(scope, customer, [{menu_item_id, quantity}, ...])               │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  SELECT menu_items WHERE id IN (...) AND account_id = ?                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PricedOrder::price()   ── empty / bad qty / unknown item → abort       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT orders (ORD-YYYYMMDDHHMMSS-XXXX, total_cents)                   │
//! │  INSERT order_items × N (name, category, price frozen)                  │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Pay
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pay(scope, order_id)                                                   │
//! │       │                                                                 │
//! │       ▼  BEGIN                                                          │
//! │  UPDATE orders (no-op write) ── takes the write lock; 0 rows → NotFound │
//! │  SELECT order + items                                                   │
//! │  INSERT billing_history (snapshot JSON, paid_at = now)                  │
//! │  DELETE orders           ── cascades to order_items                     │
//! │       │                                                                 │
//! │       ▼  COMMIT                                                         │
//! │                                                                         │
//! │  A second pay of the same id finds no row → NotFound, no new invoice    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use bistro_core::validation::{validate_customer_name, validate_line_count};
use bistro_core::{
    AccountScope, BillingRecord, CoreError, LineRequest, MenuItem, Order, OrderItem, PricedOrder,
};
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::billing::BILLING_COLUMNS;

const ORDER_COLUMNS: &str = "id, account_id, customer_name, order_number, order_date, total_cents";

const ORDER_NUMBER_ATTEMPTS: usize = 5;

const ITEM_COLUMNS: &str = "id, order_id, menu_item_id, menu_item_name, menu_item_category, \
                            quantity, price_cents, subtotal_cents";

/// Repository for in-flight orders.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Creates an order and its line items, all or nothing.
    ///
    /// ## Arguments
    /// * `customer_name` - Blank or missing becomes "Unknown"
    /// * `requests` - Menu item ids (same account) and quantities
    ///
    /// ## Returns
    /// * `Ok(Order)` - The stored order with its items
    /// * `Err(DbError::Domain(..))` - Empty list, bad quantity, unknown menu item
    /// * `Err(DbError::UniqueViolation)` - No free order number after retries
    pub async fn create(
        &self,
        scope: AccountScope,
        customer_name: Option<&str>,
        requests: &[LineRequest],
    ) -> DbResult<Order> {
        let customer_name = validate_customer_name(customer_name).map_err(CoreError::from)?;
        validate_line_count(requests.len()).map_err(CoreError::from)?;

        debug!(
            account_id = scope.account_id(),
            customer = %customer_name,
            lines = requests.len(),
            "Creating order"
        );

        let mut tx = self.pool.begin().await?;

        let menu = load_menu_items(&mut tx, scope, &PricedOrder::referenced_ids(requests)).await?;
        let priced = PricedOrder::price(requests, |id| menu.get(&id))?;

        let now = Utc::now();
        let order_number = unused_order_number(&mut tx, scope, now).await?;
        let mut order = sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders (account_id, customer_name, order_number, order_date, total_cents)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {ORDER_COLUMNS}"
        ))
        .bind(scope.account_id())
        .bind(&customer_name)
        .bind(&order_number)
        .bind(now)
        .bind(priced.total.cents())
        .fetch_one(&mut *tx)
        .await?;

        for line in &priced.lines {
            let item = sqlx::query_as::<_, OrderItem>(&format!(
                "INSERT INTO order_items
                    (order_id, menu_item_id, menu_item_name, menu_item_category,
                     quantity, price_cents, subtotal_cents)
                 VALUES (?, ?, ?, ?, ?, ?, ?)
                 RETURNING {ITEM_COLUMNS}"
            ))
            .bind(order.id)
            .bind(line.menu_item_id)
            .bind(&line.name)
            .bind(&line.category)
            .bind(line.quantity)
            .bind(line.unit_price.cents())
            .bind(line.subtotal.cents())
            .fetch_one(&mut *tx)
            .await?;
            order.items.push(item);
        }

        tx.commit().await?;

        info!(
            order_id = order.id,
            order_number = %order.order_number,
            total = %order.total(),
            "Order created"
        );
        Ok(order)
    }

    // =========================================================================
    // Read / Update / Delete
    // =========================================================================

    /// Lists the account's orders with their items, newest first.
    pub async fn list(&self, scope: AccountScope) -> DbResult<Vec<Order>> {
        let mut orders = sqlx::query_as::<_, Order>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders
             WHERE account_id = ?
             ORDER BY order_date DESC, id DESC"
        ))
        .bind(scope.account_id())
        .fetch_all(&self.pool)
        .await?;

        let items = sqlx::query_as::<_, OrderItem>(
            "SELECT oi.id, oi.order_id, oi.menu_item_id, oi.menu_item_name, oi.menu_item_category,
                    oi.quantity, oi.price_cents, oi.subtotal_cents
             FROM order_items oi
             INNER JOIN orders o ON o.id = oi.order_id
             WHERE o.account_id = ?
             ORDER BY oi.id",
        )
        .bind(scope.account_id())
        .fetch_all(&self.pool)
        .await?;

        let mut by_order: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }
        for order in &mut orders {
            order.items = by_order.remove(&order.id).unwrap_or_default();
        }

        debug!(account_id = scope.account_id(), count = orders.len(), "Orders listed");
        Ok(orders)
    }

    /// Gets an order with its items.
    pub async fn get(&self, scope: AccountScope, id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, scope, id).await
    }

    /// Renames the customer. Items and totals are never edited.
    pub async fn update_customer_name(
        &self,
        scope: AccountScope,
        id: i64,
        customer_name: Option<&str>,
    ) -> DbResult<Order> {
        let customer_name = validate_customer_name(customer_name).map_err(CoreError::from)?;
        debug!(order_id = id, customer = %customer_name, "Updating order customer");

        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query("UPDATE orders SET customer_name = ? WHERE id = ? AND account_id = ?")
            .bind(&customer_name)
            .bind(id)
            .bind(scope.account_id())
            .execute(&mut *conn)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        fetch_order(&mut conn, scope, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Deletes an unpaid order and its items.
    pub async fn delete(&self, scope: AccountScope, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(scope.account_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order", id));
        }

        info!(order_id = id, "Order deleted");
        Ok(())
    }

    // =========================================================================
    // Pay
    // =========================================================================

    /// Converts an order into a billing record and removes the order.
    ///
    /// ## Returns
    /// * `Ok(BillingRecord)` - The new invoice
    /// * `Err(DbError::NotFound)` - No such order for this account, or already paid
    pub async fn pay(&self, scope: AccountScope, id: i64) -> DbResult<BillingRecord> {
        debug!(account_id = scope.account_id(), order_id = id, "Paying order");

        let mut tx = self.pool.begin().await?;

        // No-op write: takes the write lock before anything is read.
        let claimed = sqlx::query(
            "UPDATE orders SET order_number = order_number WHERE id = ? AND account_id = ?",
        )
        .bind(id)
        .bind(scope.account_id())
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() == 0 {
            warn!(order_id = id, "Pay requested for missing or already paid order");
            return Err(DbError::not_found("Order", id));
        }

        let order = fetch_order(&mut tx, scope, id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))?;
        let items_summary = order.snapshot().encode()?;

        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            "INSERT INTO billing_history
                (account_id, order_number, customer_name, total_amount_cents,
                 order_date, paid_at, items_summary)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {BILLING_COLUMNS}"
        ))
        .bind(scope.account_id())
        .bind(&order.order_number)
        .bind(&order.customer_name)
        .bind(order.total_cents)
        .bind(order.order_date)
        .bind(Utc::now())
        .bind(&items_summary)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM orders WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(scope.account_id())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            order_id = id,
            billing_id = record.id,
            order_number = %record.order_number,
            total = %record.total_amount(),
            "Order paid"
        );
        Ok(record)
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Loads an order and its items on one connection (pool or transaction).
async fn fetch_order(
    conn: &mut SqliteConnection,
    scope: AccountScope,
    id: i64,
) -> DbResult<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = ? AND account_id = ?"
    ))
    .bind(id)
    .bind(scope.account_id())
    .fetch_optional(&mut *conn)
    .await?;

    let Some(mut order) = order else {
        return Ok(None);
    };

    order.items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id = ? ORDER BY id"
    ))
    .bind(order.id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(order))
}

/// Loads the referenced menu items that belong to the account, keyed by id.
async fn load_menu_items(
    conn: &mut SqliteConnection,
    scope: AccountScope,
    ids: &[i64],
) -> DbResult<HashMap<i64, MenuItem>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, account_id, name, price_cents, category, created_at, updated_at
         FROM menu_items WHERE account_id = ",
    );
    query.push_bind(scope.account_id());
    query.push(" AND id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let items = query
        .build_query_as::<MenuItem>()
        .fetch_all(&mut *conn)
        .await?;

    Ok(items.into_iter().map(|item| (item.id, item)).collect())
}

/// Whether the account already uses `order_number` on a live order or an
/// invoice. Order numbers are unique per account across both tables.
pub(crate) async fn order_number_in_use(
    conn: &mut SqliteConnection,
    scope: AccountScope,
    order_number: &str,
) -> DbResult<bool> {
    let in_use: i64 = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM orders WHERE account_id = ? AND order_number = ?)
             OR EXISTS(SELECT 1 FROM billing_history WHERE account_id = ? AND order_number = ?)",
    )
    .bind(scope.account_id())
    .bind(order_number)
    .bind(scope.account_id())
    .bind(order_number)
    .fetch_one(&mut *conn)
    .await?;

    Ok(in_use != 0)
}

/// Draws order numbers until one is free for the account.
async fn unused_order_number(
    conn: &mut SqliteConnection,
    scope: AccountScope,
    now: DateTime<Utc>,
) -> DbResult<String> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let candidate = generate_order_number(now);
        if !order_number_in_use(conn, scope, &candidate).await? {
            return Ok(candidate);
        }
        debug!(order_number = %candidate, "Order number taken, drawing another");
    }

    warn!(account_id = scope.account_id(), "No free order number");
    Err(DbError::duplicate("order_number", now.format("ORD-%Y%m%d%H%M%S").to_string()))
}

/// Builds `ORD-YYYYMMDDHHMMSS-XXXX` from a UTC timestamp and 4 random hex digits.
pub fn generate_order_number(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_uppercase();
    format!("ORD-{}-{}", now.format("%Y%m%d%H%M%S"), suffix)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::menu::NewMenuItem;
    use crate::repository::testing::{test_account, test_db};
    use crate::{Database, DbConfig};
    use bistro_core::{Money, ValidationError};
    use chrono::TimeZone;

    async fn add_menu_item(db: &Database, scope: AccountScope, name: &str, cents: i64) -> MenuItem {
        db.menu()
            .insert(
                scope,
                &NewMenuItem {
                    name: name.to_string(),
                    price: Money::from_cents(cents),
                    category: Some("Test".to_string()),
                },
            )
            .await
            .unwrap()
    }

    fn line(menu_item_id: i64, quantity: i64) -> LineRequest {
        LineRequest {
            menu_item_id,
            quantity,
        }
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn insert_raw_order(db: &Database, scope: AccountScope, number: &str) -> DbResult<()> {
        sqlx::query("INSERT INTO orders (account_id, order_number, order_date) VALUES (?, ?, ?)")
            .bind(scope.account_id())
            .bind(number)
            .bind(Utc::now())
            .execute(db.pool())
            .await?;
        Ok(())
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let number = generate_order_number(now);

        assert!(number.starts_with("ORD-20250314092653-"));
        let suffix = &number["ORD-20250314092653-".len()..];
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[tokio::test]
    async fn test_create_computes_exact_total() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let burger = add_menu_item(&db, scope, "Cheeseburger", 899).await;
        let fries = add_menu_item(&db, scope, "French Fries", 399).await;

        let order = db
            .orders()
            .create(scope, Some("Alice"), &[line(burger.id, 2), line(fries.id, 1)])
            .await
            .unwrap();

        assert_eq!(order.customer_name, "Alice");
        assert_eq!(order.total_cents, 2197);
        assert_eq!(order.items.len(), 2);
        assert_eq!(order.items[0].subtotal_cents, 1798);
        assert_eq!(order.items[0].menu_item_name, "Cheeseburger");
        assert_eq!(order.items[1].subtotal_cents, 399);
        assert_eq!(
            order.items.iter().map(|i| i.subtotal_cents).sum::<i64>(),
            order.total_cents
        );

        let fetched = db.orders().get(scope, order.id).await.unwrap().unwrap();
        assert_eq!(fetched, order);
    }

    #[tokio::test]
    async fn test_create_defaults_customer_name() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let soda = add_menu_item(&db, scope, "Soda", 199).await;

        let order = db
            .orders()
            .create(scope, Some("   "), &[line(soda.id, 1)])
            .await
            .unwrap();
        assert_eq!(order.customer_name, "Unknown");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input_and_persists_nothing() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let soda = add_menu_item(&db, scope, "Soda", 199).await;
        let repo = db.orders();

        let err = repo.create(scope, None, &[]).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::EmptyOrder)));

        let err = repo
            .create(scope, None, &[line(soda.id, 1), line(soda.id, 0)])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::MustBePositive { .. }))
        ));

        let err = repo
            .create(scope, None, &[line(soda.id, 1), line(9999, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MenuItemNotFound(9999))));

        assert_eq!(count(&db, "orders").await, 0);
        assert_eq!(count(&db, "order_items").await, 0);
    }

    #[tokio::test]
    async fn test_create_cannot_use_other_accounts_menu() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;
        let burger = add_menu_item(&db, alice, "Cheeseburger", 899).await;

        let err = db
            .orders()
            .create(bob, None, &[line(burger.id, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::MenuItemNotFound(_))));
    }

    #[tokio::test]
    async fn test_pay_moves_order_to_billing() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let burger = add_menu_item(&db, scope, "Cheeseburger", 899).await;
        let fries = add_menu_item(&db, scope, "French Fries", 399).await;

        let order = db
            .orders()
            .create(scope, Some("Alice"), &[line(burger.id, 2), line(fries.id, 1)])
            .await
            .unwrap();

        let record = db.orders().pay(scope, order.id).await.unwrap();
        assert_eq!(record.order_number, order.order_number);
        assert_eq!(record.customer_name, "Alice");
        assert_eq!(record.total_amount_cents, 2197);
        assert_eq!(record.order_date, order.order_date);

        let lines = record.lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 2);
        assert_eq!(lines[0].price.cents(), 899);
        assert_eq!(lines[0].subtotal.cents(), 1798);
        assert_eq!(lines[1].subtotal.cents(), 399);

        let summary: serde_json::Value = serde_json::from_str(&record.items_summary).unwrap();
        assert_eq!(summary[0]["price"], serde_json::json!(8.99));
        assert_eq!(summary[0]["subtotal"], serde_json::json!(17.98));

        assert!(db.orders().get(scope, order.id).await.unwrap().is_none());
        assert_eq!(count(&db, "order_items").await, 0);
        assert_eq!(count(&db, "billing_history").await, 1);
    }

    #[tokio::test]
    async fn test_pay_twice_is_not_found() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let soda = add_menu_item(&db, scope, "Soda", 199).await;
        let order = db
            .orders()
            .create(scope, None, &[line(soda.id, 3)])
            .await
            .unwrap();

        db.orders().pay(scope, order.id).await.unwrap();
        let err = db.orders().pay(scope, order.id).await.unwrap_err();

        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(count(&db, "billing_history").await, 1);
    }

    #[tokio::test]
    async fn test_pay_other_account_is_not_found() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;
        let soda = add_menu_item(&db, alice, "Soda", 199).await;
        let order = db
            .orders()
            .create(alice, None, &[line(soda.id, 1)])
            .await
            .unwrap();

        let err = db.orders().pay(bob, order.id).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert!(db.orders().get(alice, order.id).await.unwrap().is_some());
        assert_eq!(count(&db, "billing_history").await, 0);
    }

    #[tokio::test]
    async fn test_menu_delete_keeps_order_snapshot() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let pizza = add_menu_item(&db, scope, "Pizza", 1299).await;
        let order = db
            .orders()
            .create(scope, None, &[line(pizza.id, 1)])
            .await
            .unwrap();

        db.menu().delete(scope, pizza.id).await.unwrap();

        let order = db.orders().get(scope, order.id).await.unwrap().unwrap();
        assert_eq!(order.items[0].menu_item_id, None);
        assert_eq!(order.items[0].menu_item_name, "Pizza");
        assert_eq!(order.items[0].price_cents, 1299);
        assert_eq!(order.total_cents, 1299);
    }

    #[tokio::test]
    async fn test_list_update_delete() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let other = test_account(&db, "bob").await;
        let soda = add_menu_item(&db, scope, "Soda", 199).await;
        let repo = db.orders();

        let first = repo.create(scope, Some("A"), &[line(soda.id, 1)]).await.unwrap();
        let second = repo.create(scope, Some("B"), &[line(soda.id, 2)]).await.unwrap();

        let orders = repo.list(scope).await.unwrap();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].items.len(), 1);
        assert!(repo.list(other).await.unwrap().is_empty());

        let renamed = repo
            .update_customer_name(scope, first.id, Some("Carol"))
            .await
            .unwrap();
        assert_eq!(renamed.customer_name, "Carol");
        assert_eq!(renamed.total_cents, first.total_cents);
        assert!(matches!(
            repo.update_customer_name(other, first.id, Some("Mallory"))
                .await
                .unwrap_err(),
            DbError::NotFound { .. }
        ));

        repo.delete(scope, first.id).await.unwrap();
        assert!(repo.get(scope, first.id).await.unwrap().is_none());
        assert_eq!(count(&db, "order_items").await, 1);
    }

    #[tokio::test]
    async fn test_order_numbers_are_scoped_to_account() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;

        insert_raw_order(&db, alice, "ORD-1").await.unwrap();
        insert_raw_order(&db, bob, "ORD-1").await.unwrap();

        let err = insert_raw_order(&db, alice, "ORD-1").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "order_number"));

        let mut conn = db.pool().acquire().await.unwrap();
        assert!(order_number_in_use(&mut conn, alice, "ORD-1").await.unwrap());
        assert!(!order_number_in_use(&mut conn, alice, "ORD-2").await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_pay_bills_each_order_once() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("bistro.db")).max_connections(8))
            .await
            .unwrap();
        let scope = test_account(&db, "alice").await;
        let soda = add_menu_item(&db, scope, "Soda", 199).await;

        let mut order_ids = Vec::new();
        for _ in 0..10 {
            let order = db
                .orders()
                .create(scope, None, &[line(soda.id, 2)])
                .await
                .unwrap();
            order_ids.push(order.id);
        }

        let mut tasks = Vec::new();
        for &order_id in &order_ids {
            for _ in 0..6 {
                let db = db.clone();
                tasks.push(tokio::spawn(async move { db.orders().pay(scope, order_id).await }));
            }
        }

        let (mut paid, mut not_found) = (0, 0);
        for task in tasks {
            match task.await.unwrap() {
                Ok(record) => {
                    assert_eq!(record.total_amount_cents, 398);
                    paid += 1;
                }
                Err(DbError::NotFound { .. }) => not_found += 1,
                Err(other) => panic!("unexpected pay error: {other}"),
            }
        }

        assert_eq!(paid, 10);
        assert_eq!(not_found, 50);
        assert_eq!(count(&db, "billing_history").await, 10);
        assert_eq!(count(&db, "orders").await, 0);

        db.close().await;
    }
}
