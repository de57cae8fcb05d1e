//! # Order Pricing
//!
//! Turns a list of `(menu_item_id, quantity)` requests into priced lines
//! and an order total, using exact cent arithmetic.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  [{menu_item_id: 1, quantity: 2}, {menu_item_id: 4, quantity: 1}]       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. Non-empty list, at most MAX_ORDER_LINES                             │
//! │  2. Every quantity in 1..=999                                           │
//! │  3. Resolve each menu item (caller supplies the account-scoped lookup)  │
//! │  4. subtotal = price_cents × quantity      (checked)                    │
//! │  5. total    = Σ subtotal                  (checked)                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PricedOrder { lines, total }  ──► persisted by bistro-db in one tx     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lookup is a closure so this module stays free of I/O; the database
//! layer loads the menu items inside its transaction and hands them in.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::MenuItem;
use crate::validation::{validate_line_count, validate_quantity};

// =============================================================================
// Requests
// =============================================================================

/// One requested line: which menu item and how many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineRequest {
    pub menu_item_id: i64,
    pub quantity: i64,
}

// =============================================================================
// Priced Lines
// =============================================================================

/// A line with its price and subtotal fixed.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub menu_item_id: i64,
    pub name: String,
    pub category: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl PricedLine {
    /// Prices `quantity` units of `item`.
    pub fn new(item: &MenuItem, quantity: i64) -> CoreResult<Self> {
        validate_quantity(quantity)?;

        let unit_price = item.price();
        let subtotal =
            unit_price
                .checked_multiply_quantity(quantity)
                .ok_or_else(|| CoreError::AmountOverflow {
                    context: format!("subtotal for menu item {}", item.id),
                })?;

        Ok(PricedLine {
            menu_item_id: item.id,
            name: item.name.clone(),
            category: item.category.clone(),
            quantity,
            unit_price,
            subtotal,
        })
    }
}

/// All lines of a new order plus their total.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub lines: Vec<PricedLine>,
    pub total: Money,
}

impl PricedOrder {
    /// Prices every request against `lookup`.
    ///
    /// ## Arguments
    /// * `requests` - Lines as sent by the client
    /// * `lookup` - Resolves a menu item id within the caller's account
    ///
    /// ## Errors
    /// - [`CoreError::EmptyOrder`] for an empty list
    /// - [`CoreError::Validation`] for a bad quantity or too many lines
    /// - [`CoreError::MenuItemNotFound`] when `lookup` returns `None`
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::pricing::{LineRequest, PricedOrder};
    /// use bistro_core::types::MenuItem;
    /// use chrono::Utc;
    ///
    /// let burger = MenuItem {
    ///     id: 1,
    ///     account_id: 1,
    ///     name: "Cheeseburger".to_string(),
    ///     price_cents: 899,
    ///     category: Some("Burgers".to_string()),
    ///     created_at: Utc::now(),
    ///     updated_at: Utc::now(),
    /// };
    ///
    /// let order = PricedOrder::price(
    ///     &[LineRequest { menu_item_id: 1, quantity: 2 }],
    ///     |id| (id == 1).then_some(&burger),
    /// )
    /// .unwrap();
    /// assert_eq!(order.total.cents(), 1798);
    /// ```
    pub fn price<'a, F>(requests: &[LineRequest], lookup: F) -> CoreResult<Self>
    where
        F: Fn(i64) -> Option<&'a MenuItem>,
    {
        if requests.is_empty() {
            return Err(CoreError::EmptyOrder);
        }
        validate_line_count(requests.len())?;

        // Reject bad quantities before reporting unknown items.
        for request in requests {
            validate_quantity(request.quantity)?;
        }

        let mut lines = Vec::with_capacity(requests.len());
        let mut total = Money::zero();

        for request in requests {
            let item = lookup(request.menu_item_id)
                .ok_or(CoreError::MenuItemNotFound(request.menu_item_id))?;
            let line = PricedLine::new(item, request.quantity)?;

            total = total
                .checked_add(line.subtotal)
                .ok_or_else(|| CoreError::AmountOverflow {
                    context: "order total".to_string(),
                })?;
            lines.push(line);
        }

        Ok(PricedOrder { lines, total })
    }

    /// Distinct menu item ids referenced by `requests`, for bulk loading.
    pub fn referenced_ids(requests: &[LineRequest]) -> Vec<i64> {
        let mut ids: Vec<i64> = requests.iter().map(|r| r.menu_item_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationError;
    use chrono::Utc;

    fn menu_item(id: i64, name: &str, price_cents: i64) -> MenuItem {
        MenuItem {
            id,
            account_id: 1,
            name: name.to_string(),
            price_cents,
            category: Some("Test".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn menu() -> Vec<MenuItem> {
        vec![
            menu_item(1, "Cheeseburger", 899),
            menu_item(2, "French Fries", 399),
        ]
    }

    fn line(menu_item_id: i64, quantity: i64) -> LineRequest {
        LineRequest {
            menu_item_id,
            quantity,
        }
    }

    #[test]
    fn test_price_order_example() {
        let menu = menu();
        let order = PricedOrder::price(&[line(1, 2), line(2, 1)], |id| {
            menu.iter().find(|m| m.id == id)
        })
        .unwrap();

        assert_eq!(order.total.cents(), 2197);
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].subtotal.cents(), 1798);
        assert_eq!(order.lines[0].name, "Cheeseburger");
        assert_eq!(order.lines[1].subtotal.cents(), 399);
    }

    #[test]
    fn test_total_equals_sum_of_subtotals() {
        let menu = menu();
        let requests = [line(1, 7), line(2, 13), line(1, 999)];
        let order =
            PricedOrder::price(&requests, |id| menu.iter().find(|m| m.id == id)).unwrap();

        let sum: Money = order.lines.iter().map(|l| l.subtotal).sum();
        assert_eq!(order.total, sum);
        for l in &order.lines {
            assert_eq!(l.subtotal, l.unit_price.multiply_quantity(l.quantity));
        }
    }

    #[test]
    fn test_empty_order_rejected() {
        let menu = menu();
        let err = PricedOrder::price(&[], |id| menu.iter().find(|m| m.id == id)).unwrap_err();
        assert!(matches!(err, CoreError::EmptyOrder));
    }

    #[test]
    fn test_bad_quantity_rejected_before_lookup() {
        let menu = menu();
        let err = PricedOrder::price(&[line(99, 0)], |id| menu.iter().find(|m| m.id == id))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MustBePositive { .. })
        ));

        let err = PricedOrder::price(&[line(1, -3)], |id| menu.iter().find(|m| m.id == id))
            .unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_unknown_menu_item() {
        let menu = menu();
        let err = PricedOrder::price(&[line(1, 1), line(42, 1)], |id| {
            menu.iter().find(|m| m.id == id)
        })
        .unwrap_err();
        assert!(matches!(err, CoreError::MenuItemNotFound(42)));
    }

    #[test]
    fn test_overflow_is_an_error() {
        let huge = vec![menu_item(1, "Gold", i64::MAX / 2)];
        let err = PricedOrder::price(&[line(1, 3)], |id| huge.iter().find(|m| m.id == id))
            .unwrap_err();
        assert!(matches!(err, CoreError::AmountOverflow { .. }));
    }

    #[test]
    fn test_referenced_ids_dedup() {
        let ids = PricedOrder::referenced_ids(&[line(3, 1), line(1, 1), line(3, 2)]);
        assert_eq!(ids, vec![1, 3]);
    }
}
