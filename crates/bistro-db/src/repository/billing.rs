//! # Billing Repository
//!
//! Invoice history. Records are written by the pay workflow or entered
//! manually; after that only the customer name may change.

use bistro_core::snapshot::{BillingLine, BillingSnapshot};
use bistro_core::validation::validate_customer_name;
use bistro_core::{AccountScope, BillingRecord, CoreError};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::order::order_number_in_use;

pub(crate) const BILLING_COLUMNS: &str = "id, account_id, order_number, customer_name, \
                                          total_amount_cents, order_date, paid_at, items_summary";

/// A manually entered invoice.
#[derive(Debug, Clone)]
pub struct NewBillingRecord {
    pub order_number: String,
    pub customer_name: Option<String>,

    /// Defaults to now.
    pub order_date: Option<DateTime<Utc>>,

    /// Lines with subtotals already computed (see [`BillingLine::priced`]).
    pub lines: Vec<BillingLine>,
}

/// Repository for billing history.
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: SqlitePool,
}

impl BillingRepository {
    /// Creates a new BillingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BillingRepository { pool }
    }

    /// Lists invoices, newest first.
    pub async fn list(&self, scope: AccountScope) -> DbResult<Vec<BillingRecord>> {
        let records = sqlx::query_as::<_, BillingRecord>(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing_history
             WHERE account_id = ?
             ORDER BY order_date DESC, id DESC"
        ))
        .bind(scope.account_id())
        .fetch_all(&self.pool)
        .await?;

        debug!(account_id = scope.account_id(), count = records.len(), "Billing history listed");
        Ok(records)
    }

    /// Gets one invoice.
    pub async fn get(&self, scope: AccountScope, id: i64) -> DbResult<Option<BillingRecord>> {
        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            "SELECT {BILLING_COLUMNS} FROM billing_history WHERE id = ? AND account_id = ?"
        ))
        .bind(id)
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Stores a manual invoice; the total is the sum of the line subtotals.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - The account already uses the order
    ///   number, on an invoice or on an unpaid order
    pub async fn create(&self, scope: AccountScope, new: &NewBillingRecord) -> DbResult<BillingRecord> {
        let customer_name =
            validate_customer_name(new.customer_name.as_deref()).map_err(CoreError::from)?;
        let snapshot = BillingSnapshot::new(new.lines.clone());
        let total = snapshot.total();
        let items_summary = snapshot.encode()?;

        debug!(
            account_id = scope.account_id(),
            order_number = %new.order_number,
            lines = snapshot.lines().len(),
            "Creating billing record"
        );

        let mut tx = self.pool.begin().await?;

        if order_number_in_use(&mut tx, scope, &new.order_number).await? {
            warn!(order_number = %new.order_number, "Order number already in use");
            return Err(DbError::duplicate("order_number", new.order_number.clone()));
        }

        let now = Utc::now();
        let record = sqlx::query_as::<_, BillingRecord>(&format!(
            "INSERT INTO billing_history
                (account_id, order_number, customer_name, total_amount_cents,
                 order_date, paid_at, items_summary)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {BILLING_COLUMNS}"
        ))
        .bind(scope.account_id())
        .bind(&new.order_number)
        .bind(&customer_name)
        .bind(total.cents())
        .bind(new.order_date.unwrap_or(now))
        .bind(now)
        .bind(&items_summary)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(billing_id = record.id, total = %record.total_amount(), "Billing record created");
        Ok(record)
    }

    /// Renames the customer on an invoice.
    pub async fn update_customer_name(
        &self,
        scope: AccountScope,
        id: i64,
        customer_name: Option<&str>,
    ) -> DbResult<BillingRecord> {
        let customer_name = validate_customer_name(customer_name).map_err(CoreError::from)?;

        sqlx::query_as::<_, BillingRecord>(&format!(
            "UPDATE billing_history SET customer_name = ?
             WHERE id = ? AND account_id = ?
             RETURNING {BILLING_COLUMNS}"
        ))
        .bind(&customer_name)
        .bind(id)
        .bind(scope.account_id())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::not_found("BillingHistory", id))
    }

    /// Deletes an invoice.
    pub async fn delete(&self, scope: AccountScope, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM billing_history WHERE id = ? AND account_id = ?")
            .bind(id)
            .bind(scope.account_id())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("BillingHistory", id));
        }

        info!(billing_id = id, "Billing record deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::menu::NewMenuItem;
    use crate::repository::testing::{test_account, test_db};
    use bistro_core::{LineRequest, Money};

    fn manual(order_number: &str) -> NewBillingRecord {
        NewBillingRecord {
            order_number: order_number.to_string(),
            customer_name: None,
            order_date: None,
            lines: vec![
                BillingLine::priced("Pizza", 2, Money::from_cents(1299)).unwrap(),
                BillingLine::priced("Soda", 1, Money::from_cents(199)).unwrap(),
            ],
        }
    }

    #[tokio::test]
    async fn test_create_computes_total() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;

        let record = db.billing().create(scope, &manual("INV-1")).await.unwrap();
        assert_eq!(record.total_amount_cents, 2797);
        assert_eq!(record.customer_name, "Unknown");
        assert_eq!(record.lines().len(), 2);

        let err = db.billing().create(scope, &manual("INV-1")).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "order_number"));
    }

    #[tokio::test]
    async fn test_order_number_unique_per_account() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;

        db.billing().create(alice, &manual("INV-001")).await.unwrap();
        let record = db.billing().create(bob, &manual("INV-001")).await.unwrap();

        assert_eq!(record.order_number, "INV-001");
        assert_eq!(db.billing().list(alice).await.unwrap().len(), 1);
        assert_eq!(db.billing().list(bob).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_manual_invoice_cannot_take_unpaid_order_number() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;
        let soda = db
            .menu()
            .insert(
                alice,
                &NewMenuItem {
                    name: "Soda".to_string(),
                    price: Money::from_cents(199),
                    category: None,
                },
            )
            .await
            .unwrap();
        let order = db
            .orders()
            .create(
                alice,
                None,
                &[LineRequest {
                    menu_item_id: soda.id,
                    quantity: 1,
                }],
            )
            .await
            .unwrap();

        let err = db
            .billing()
            .create(alice, &manual(&order.order_number))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "order_number"));
        assert!(db.billing().list(alice).await.unwrap().is_empty());

        // Other accounts are unaffected, and the order still pays.
        db.billing().create(bob, &manual(&order.order_number)).await.unwrap();
        let record = db.orders().pay(alice, order.id).await.unwrap();
        assert_eq!(record.order_number, order.order_number);
        assert_eq!(record.total_amount_cents, 199);
        assert!(db.orders().get(alice, order.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_customer_keeps_amounts() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let record = db.billing().create(scope, &manual("INV-2")).await.unwrap();

        let updated = db
            .billing()
            .update_customer_name(scope, record.id, Some("Dana"))
            .await
            .unwrap();
        assert_eq!(updated.customer_name, "Dana");
        assert_eq!(updated.total_amount_cents, record.total_amount_cents);
        assert_eq!(updated.items_summary, record.items_summary);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_reads_as_empty() {
        let db = test_db().await;
        let scope = test_account(&db, "alice").await;
        let record = db.billing().create(scope, &manual("INV-3")).await.unwrap();

        sqlx::query("UPDATE billing_history SET items_summary = 'not json' WHERE id = ?")
            .bind(record.id)
            .execute(db.pool())
            .await
            .unwrap();

        let record = db.billing().get(scope, record.id).await.unwrap().unwrap();
        assert!(record.lines().is_empty());
    }

    #[tokio::test]
    async fn test_scoped_list_get_delete() {
        let db = test_db().await;
        let alice = test_account(&db, "alice").await;
        let bob = test_account(&db, "bob").await;
        let repo = db.billing();

        let record = repo.create(alice, &manual("INV-4")).await.unwrap();

        assert_eq!(repo.list(alice).await.unwrap().len(), 1);
        assert!(repo.list(bob).await.unwrap().is_empty());
        assert!(repo.get(bob, record.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(bob, record.id).await.unwrap_err(),
            DbError::NotFound { .. }
        ));

        repo.delete(alice, record.id).await.unwrap();
        assert!(repo.get(alice, record.id).await.unwrap().is_none());
    }
}
