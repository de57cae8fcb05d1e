//! # Reporting Math
//!
//! Aggregates behind `/dashboard/dashboard_stats` and `/inventory/stats`.
//! The database layer runs the `COUNT`/`SUM` queries; this module defines
//! what "today" means and how the partial results combine.
//!
//! ```text
//!   orders today (pending)  ─┐
//!                            ├──► DashboardStats ◄── InventoryStats
//!   billing today (paid)    ─┘
//! ```

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{self, Money};

/// Half-open UTC range `[start, end)` covering one calendar day.
///
/// ## Example
/// ```rust
/// use bistro_core::report::day_bounds;
/// use chrono::NaiveDate;
///
/// let day = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
/// let (start, end) = day_bounds(day);
/// assert_eq!(start.to_rfc3339(), "2025-03-14T00:00:00+00:00");
/// assert_eq!(end.to_rfc3339(), "2025-03-15T00:00:00+00:00");
/// ```
pub fn day_bounds(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN));
    (start, start + Duration::days(1))
}

/// Bounds of the current UTC day.
pub fn today_bounds(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    day_bounds(now.date_naive())
}

// =============================================================================
// Partial Aggregates
// =============================================================================

/// Count and sum of one kind of record within a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DailyActivity {
    pub count: i64,
    pub total: Money,
}

impl DailyActivity {
    pub fn new(count: i64, total_cents: i64) -> Self {
        DailyActivity {
            count,
            total: Money::from_cents(total_cents),
        }
    }
}

/// Inventory counters for one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InventoryStats {
    pub total_items: i64,
    pub low_stock_items: i64,

    /// Distinct non-null categories.
    pub categories: i64,
}

// =============================================================================
// Dashboard
// =============================================================================

/// The dashboard summary for the current day.
///
/// Sales combine orders still open today with invoices dated today, so
/// paying an order moves it from `pending_*` to `paid_*` without changing
/// `total_sales_today`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DashboardStats {
    #[serde(with = "money::decimal")]
    #[ts(as = "f64")]
    pub total_sales_today: Money,
    pub total_orders_today: i64,
    pub total_inventory_items: i64,
    pub low_stock_count: i64,

    pub pending_orders_today: i64,
    pub paid_orders_today: i64,
    #[serde(with = "money::decimal")]
    #[ts(as = "f64")]
    pub pending_sales_today: Money,
    #[serde(with = "money::decimal")]
    #[ts(as = "f64")]
    pub paid_sales_today: Money,
}

impl DashboardStats {
    /// Combines today's open orders, today's invoices and stock counters.
    pub fn combine(pending: DailyActivity, paid: DailyActivity, inventory: InventoryStats) -> Self {
        DashboardStats {
            total_sales_today: pending.total + paid.total,
            total_orders_today: pending.count + paid.count,
            total_inventory_items: inventory.total_items,
            low_stock_count: inventory.low_stock_items,
            pending_orders_today: pending.count,
            paid_orders_today: paid.count,
            pending_sales_today: pending.total,
            paid_sales_today: paid.total,
        }
    }
}
