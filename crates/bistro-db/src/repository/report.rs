//! # Report Repository
//!
//! Read-only aggregates for the dashboard.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  dashboard(scope, now)                                                  │
//! │       │                                                                 │
//! │       ├──► orders          WHERE order_date in today  → pending         │
//! │       ├──► billing_history WHERE order_date in today  → paid            │
//! │       └──► inventory_items                            → stock counters  │
//! │                                                                         │
//! │  DashboardStats::combine(pending, paid, inventory)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! "Today" is the UTC calendar day containing `now`. An order paid today
//! moves from the pending to the paid figures and the totals stay the same.

use bistro_core::report::today_bounds;
use bistro_core::{AccountScope, DailyActivity, DashboardStats};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::inventory::inventory_stats;

/// Repository for dashboard aggregates.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Computes the dashboard for the UTC day containing `now`.
    pub async fn dashboard(&self, scope: AccountScope, now: DateTime<Utc>) -> DbResult<DashboardStats> {
        let (start, end) = today_bounds(now);
        debug!(account_id = scope.account_id(), %start, %end, "Computing dashboard");

        let pending = self.activity("orders", "total_cents", scope, start, end).await?;
        let paid = self
            .activity("billing_history", "total_amount_cents", scope, start, end)
            .await?;
        let inventory = inventory_stats(&self.pool, scope).await?;

        Ok(DashboardStats::combine(pending, paid, inventory))
    }

    /// Count and sum of `amount_column` for rows dated in `[start, end)`.
    async fn activity(
        &self,
        table: &'static str,
        amount_column: &'static str,
        scope: AccountScope,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> DbResult<DailyActivity> {
        let (count, total): (i64, i64) = sqlx::query_as(&format!(
            "SELECT COUNT(*), COALESCE(SUM({amount_column}), 0)
             FROM {table}
             WHERE account_id = ? AND order_date >= ? AND order_date < ?"
        ))
        .bind(scope.account_id())
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailyActivity::new(count, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::inventory::NewInventoryItem;
    use crate::repository::menu::NewMenuItem;
    use crate::repository::testing::{test_account, test_db};
    use bistro_core::{LineRequest, Money};
    use chrono::Duration;

    #[tokio::test]
    async fn test_empty_dashboard() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;

        let stats = db.reports().dashboard(scope, Utc::now()).await.unwrap();
        assert!(stats.total_sales_today.is_zero());
        assert_eq!(stats.total_orders_today, 0);
        assert_eq!(stats.total_inventory_items, 0);
    }

    #[tokio::test]
    async fn test_dashboard_combines_pending_and_paid() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;

        let burger = db
            .menu()
            .insert(
                alice,
                &NewMenuItem {
                    name: "Cheeseburger".to_string(),
                    price: Money::from_cents(899),
                    category: Some("Burgers".to_string()),
                },
            )
            .await
            .unwrap();
        let line = |quantity| LineRequest {
            menu_item_id: burger.id,
            quantity,
        };

        let paid = db.orders().create(alice, None, &[line(2)]).await.unwrap();
        db.orders().create(alice, None, &[line(1)]).await.unwrap();
        db.orders().pay(alice, paid.id).await.unwrap();

        for (name, quantity) in [("Cheese", 4.9), ("Tomatoes", 50.0)] {
            db.inventory()
                .insert(
                    alice,
                    &NewInventoryItem {
                        name: name.to_string(),
                        category: None,
                        quantity,
                        unit: None,
                    },
                )
                .await
                .unwrap();
        }

        let stats = db.reports().dashboard(alice, Utc::now()).await.unwrap();
        assert_eq!(stats.pending_orders_today, 1);
        assert_eq!(stats.paid_orders_today, 1);
        assert_eq!(stats.total_orders_today, 2);
        assert_eq!(stats.pending_sales_today.cents(), 899);
        assert_eq!(stats.paid_sales_today.cents(), 1798);
        assert_eq!(stats.total_sales_today.cents(), 2697);
        assert_eq!(stats.total_inventory_items, 2);
        assert_eq!(stats.low_stock_count, 1);

        let other = db.reports().dashboard(bob, Utc::now()).await.unwrap();
        assert_eq!(other.total_orders_today, 0);
        assert_eq!(other.total_inventory_items, 0);

        let tomorrow = db
            .reports()
            .dashboard(alice, Utc::now() + Duration::days(1))
            .await
            .unwrap();
        assert_eq!(tomorrow.total_orders_today, 0);
        assert_eq!(tomorrow.total_inventory_items, 2);
    }
}
