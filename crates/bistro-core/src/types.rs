//! # Domain Types
//!
//! Core domain records used throughout the back office.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │                        ┌─────────────────┐                              │
//! │                        │    Account      │ ◄── AccountScope             │
//! │                        │  username/email │     (capability)             │
//! │                        └────────┬────────┘                              │
//! │        ┌──────────────┬─────────┼──────────┬───────────────┐            │
//! │        ▼              ▼         ▼          ▼               ▼            │
//! │  ┌──────────┐  ┌──────────┐ ┌────────┐ ┌───────────┐ ┌─────────────┐    │
//! │  │ Profile  │  │ Settings │ │MenuItem│ │ Inventory │ │   Order     │    │
//! │  │ 1:1      │  │ 1:1      │ │price_  │ │ Item      │ │ total_cents │    │
//! │  └──────────┘  └──────────┘ │ cents  │ │ quantity  │ └──────┬──────┘    │
//! │                             └────────┘ └───────────┘        │ 1:N       │
//! │                                                      ┌──────▼──────┐    │
//! │                                                      │ OrderItem   │    │
//! │                                                      │ (snapshot)  │    │
//! │                                                      └─────────────┘    │
//! │                                                                         │
//! │   pay ──► BillingRecord (order_number + items_summary, no FK)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Columns
//! Records keep the raw `*_cents` / `*_bps` integers exactly as stored and
//! expose typed accessors (`price()`, `total()`, `tax_rate()`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::{Money, Rate};
use crate::snapshot::{BillingLine, BillingSnapshot};
use crate::stock::StockStatus;

// =============================================================================
// Account Scope
// =============================================================================

/// Capability value proving the caller acts for one account.
///
/// Every scoped repository call takes an `AccountScope`, and every scoped
/// query filters on `scope.account_id()`. Rows owned by another account are
/// indistinguishable from rows that do not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountScope {
    account_id: i64,
}

impl AccountScope {
    /// Binds a scope to an account id.
    ///
    /// Only the auth layer (after resolving a token) and trusted tooling
    /// such as the seed binary should construct one.
    #[inline]
    pub const fn new(account_id: i64) -> Self {
        AccountScope { account_id }
    }

    /// The account every scoped query is restricted to.
    #[inline]
    pub const fn account_id(&self) -> i64 {
        self.account_id
    }
}

// =============================================================================
// Role
// =============================================================================

/// Role of an account inside its restaurant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Staff,
    Viewer,
}

impl Role {
    /// Lowercase name as stored and serialized.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Staff => "staff",
            Role::Viewer => "viewer",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Staff
    }
}

// =============================================================================
// Account
// =============================================================================

/// A user account; the root that owns all other data.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,

    /// Argon2 PHC string. Never leaves the server.
    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,

    /// Disabled accounts cannot log in and their tokens are refused.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Initials shown in the dashboard avatar.
    pub fn avatar_initials(&self) -> String {
        avatar_initials(&self.first_name, &self.last_name, &self.username)
    }
}

/// Derives avatar initials.
///
/// First letters of first and last name when both are present, otherwise
/// the first two characters of the username. Always uppercased.
///
/// ## Example
/// ```rust
/// use bistro_core::types::avatar_initials;
///
/// assert_eq!(avatar_initials("Alice", "Baker", "alice"), "AB");
/// assert_eq!(avatar_initials("", "", "bob"), "BO");
/// ```
pub fn avatar_initials(first_name: &str, last_name: &str, username: &str) -> String {
    let first = first_name.trim().chars().next();
    let last = last_name.trim().chars().next();

    match (first, last) {
        (Some(f), Some(l)) => [f, l].iter().collect::<String>().to_uppercase(),
        _ => username.chars().take(2).collect::<String>().to_uppercase(),
    }
}

// =============================================================================
// Auth Token
// =============================================================================

/// Opaque bearer token; at most one per account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuthToken {
    /// 40 lowercase hex characters.
    pub token: String,
    pub account_id: i64,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Profile
// =============================================================================

/// Per-account profile and preferences (1:1 with Account).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Profile {
    pub account_id: i64,
    pub restaurant_name: String,
    pub phone: String,
    pub role: Role,
    pub avatar_initials: String,
    pub theme: String,
    pub currency: String,
    pub language: String,
    pub notifications_enabled: bool,

    /// Inventory items below this quantity are "Low Stock".
    pub low_stock_threshold: i64,

    pub ai_model: String,
    pub ai_api_key: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Settings
// =============================================================================

/// Per-account restaurant settings (1:1 with Account).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Settings {
    pub account_id: i64,
    pub restaurant_address: String,
    pub restaurant_phone: String,
    pub restaurant_email: String,

    /// Free-form text; the dashboard stores JSON here.
    pub business_hours: String,

    /// Tax rate in basis points (825 = 8.25%).
    pub tax_rate_bps: i64,

    /// Default tip in basis points (1500 = 15%).
    pub default_tip_bps: i64,

    pub receipt_footer: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Settings {
    #[inline]
    pub fn tax_rate(&self) -> Rate {
        Rate::from_stored(self.tax_rate_bps)
    }

    #[inline]
    pub fn default_tip(&self) -> Rate {
        Rate::from_stored(self.default_tip_bps)
    }
}

// =============================================================================
// Menu Item
// =============================================================================

/// A sellable item on the menu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MenuItem {
    pub id: i64,
    pub account_id: i64,
    pub name: String,

    /// Price in cents (never negative).
    pub price_cents: i64,

    pub category: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A stocked ingredient or supply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: i64,
    pub account_id: i64,
    pub name: String,
    pub category: Option<String>,

    /// Non-negative; fractional for weight/volume units.
    pub quantity: f64,

    pub unit: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Stock status against the account's threshold.
    #[inline]
    pub fn status(&self, threshold: i64) -> StockStatus {
        StockStatus::from_quantity(self.quantity, threshold)
    }
}

// =============================================================================
// Order
// =============================================================================

/// An unpaid order with its line items.
///
/// `total_cents` always equals the sum of the item subtotals; both are
/// fixed when the order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub account_id: i64,
    pub customer_name: String,

    /// `ORD-YYYYMMDDHHMMSS-XXXX`, unique across all accounts.
    pub order_number: String,

    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,

    pub total_cents: i64,

    /// Loaded separately from `order_items`.
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<OrderItem>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Builds the billing snapshot of this order's lines.
    pub fn snapshot(&self) -> BillingSnapshot {
        BillingSnapshot::new(
            self.items
                .iter()
                .map(|item| BillingLine {
                    name: item.menu_item_name.clone(),
                    quantity: item.quantity,
                    price: item.price(),
                    subtotal: item.subtotal(),
                })
                .collect(),
        )
    }
}

/// A line on an order, frozen at creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,

    /// `None` once the menu item has been deleted.
    pub menu_item_id: Option<i64>,

    /// Menu item name at time of ordering (frozen).
    pub menu_item_name: String,

    /// Menu item category at time of ordering (frozen).
    pub menu_item_category: Option<String>,

    pub quantity: i64,

    /// Unit price in cents at time of ordering (frozen).
    pub price_cents: i64,

    /// `price_cents × quantity`.
    pub subtotal_cents: i64,
}

impl OrderItem {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Billing Record
// =============================================================================

/// An invoice written when an order is paid (or entered manually).
///
/// Holds the order number as plain text and a serialized copy of the lines;
/// there is no foreign key back to the order, which no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillingRecord {
    pub id: i64,
    pub account_id: i64,
    pub order_number: String,
    pub customer_name: String,
    pub total_amount_cents: i64,

    #[ts(as = "String")]
    pub order_date: DateTime<Utc>,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,

    /// JSON array of `{name, quantity, price, subtotal}`.
    pub items_summary: String,
}

impl BillingRecord {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Decoded snapshot lines; empty if the stored text is corrupt.
    pub fn lines(&self) -> Vec<BillingLine> {
        BillingSnapshot::decode_lossy(&self.items_summary).into_lines()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn order_item(id: i64, name: &str, quantity: i64, price_cents: i64) -> OrderItem {
        OrderItem {
            id,
            order_id: 1,
            menu_item_id: Some(id),
            menu_item_name: name.to_string(),
            menu_item_category: None,
            quantity,
            price_cents,
            subtotal_cents: price_cents * quantity,
        }
    }

    #[test]
    fn test_account_scope() {
        let scope = AccountScope::new(7);
        assert_eq!(scope.account_id(), 7);
        assert_eq!(scope, AccountScope::new(7));
        assert_ne!(scope, AccountScope::new(8));
    }

    #[test]
    fn test_role_default_and_names() {
        assert_eq!(Role::default(), Role::Staff);
        assert_eq!(Role::Manager.as_str(), "manager");
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
    }

    #[test]
    fn test_avatar_initials() {
        assert_eq!(avatar_initials("alice", "baker", "ab123"), "AB");
        assert_eq!(avatar_initials("Alice", "", "alice"), "AL");
        assert_eq!(avatar_initials("", "", "x"), "X");
        assert_eq!(avatar_initials("  ", "Baker", "zoe"), "ZO");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let account = Account {
            id: 1,
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            password_hash: "$argon2id$secret".to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&account).unwrap();
        assert!(!json.contains("argon2"));
        assert_eq!(account.avatar_initials(), "AL");
    }

    #[test]
    fn test_order_snapshot_copies_lines() {
        let order = Order {
            id: 1,
            account_id: 1,
            customer_name: "Alice".to_string(),
            order_number: "ORD-20250101120000-ABCD".to_string(),
            order_date: Utc::now(),
            total_cents: 2197,
            items: vec![
                order_item(1, "Cheeseburger", 2, 899),
                order_item(2, "French Fries", 1, 399),
            ],
        };

        let snapshot = order.snapshot();
        assert_eq!(snapshot.lines().len(), 2);
        assert_eq!(snapshot.lines()[0].subtotal.cents(), 1798);
        assert_eq!(snapshot.total(), order.total());
    }

    #[test]
    fn test_settings_rates() {
        let now = Utc::now();
        let settings = Settings {
            account_id: 1,
            restaurant_address: String::new(),
            restaurant_phone: String::new(),
            restaurant_email: String::new(),
            business_hours: String::new(),
            tax_rate_bps: 825,
            default_tip_bps: 1500,
            receipt_footer: "Thank you for your business!".to_string(),
            created_at: now,
            updated_at: now,
        };

        assert_eq!(settings.tax_rate().bps(), 825);
        assert!((settings.default_tip().percentage() - 15.0).abs() < f64::EPSILON);
    }
}
