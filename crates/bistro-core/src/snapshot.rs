//! # Billing Snapshot
//!
//! When an order is paid its lines are copied into the billing record as a
//! JSON array. The copy is the invoice: later menu edits, order deletion or
//! menu item deletion never change it.
//!
//! ## Stored Format
//! ```text
//! [
//!   {"name": "Cheeseburger", "quantity": 2, "price": 8.99, "subtotal": 17.98},
//!   {"name": "French Fries", "quantity": 1, "price": 3.99, "subtotal": 3.99}
//! ]
//! ```
//!
//! Amounts are decimal numbers in the stored text (that is what the
//! dashboard reads back) and exact cents in memory.
//!
//! ## Reading
//! Decoding is best-effort: a corrupt or hand-edited snapshot yields an
//! empty list instead of failing the request.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{self, Money};
use crate::validation::{validate_price, validate_quantity};

// =============================================================================
// Billing Line
// =============================================================================

/// One frozen line of an invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingLine {
    pub name: String,
    pub quantity: i64,

    #[serde(with = "money::decimal")]
    #[ts(as = "f64")]
    pub price: Money,

    #[serde(with = "money::decimal")]
    #[ts(as = "f64")]
    pub subtotal: Money,
}

impl BillingLine {
    /// Builds a line from a unit price, computing the subtotal.
    ///
    /// Used for manually entered invoices, where there is no order to copy.
    pub fn priced(name: impl Into<String>, quantity: i64, price: Money) -> CoreResult<Self> {
        validate_quantity(quantity)?;
        validate_price(price)?;

        let subtotal = price
            .checked_multiply_quantity(quantity)
            .ok_or_else(|| CoreError::AmountOverflow {
                context: "billing line subtotal".to_string(),
            })?;

        Ok(BillingLine {
            name: name.into(),
            quantity,
            price,
            subtotal,
        })
    }
}

// =============================================================================
// Billing Snapshot
// =============================================================================

/// The full list of lines stored on a billing record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingSnapshot {
    lines: Vec<BillingLine>,
}

impl BillingSnapshot {
    pub fn new(lines: Vec<BillingLine>) -> Self {
        BillingSnapshot { lines }
    }

    pub fn lines(&self) -> &[BillingLine] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<BillingLine> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Sum of line subtotals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(|line| line.subtotal).sum()
    }

    /// Serializes the lines into the stored JSON text.
    pub fn encode(&self) -> CoreResult<String> {
        serde_json::to_string(&self.lines).map_err(|e| CoreError::Snapshot(e.to_string()))
    }

    /// Parses stored JSON text; anything unreadable becomes an empty list.
    pub fn decode_lossy(text: &str) -> Self {
        let lines = serde_json::from_str::<Vec<BillingLine>>(text).unwrap_or_default();
        BillingSnapshot { lines }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> BillingSnapshot {
        BillingSnapshot::new(vec![
            BillingLine::priced("Cheeseburger", 2, Money::from_cents(899)).unwrap(),
            BillingLine::priced("French Fries", 1, Money::from_cents(399)).unwrap(),
        ])
    }

    #[test]
    fn test_encode_matches_stored_format() {
        let text = sample().encode().unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(
            value,
            json!([
                {"name": "Cheeseburger", "quantity": 2, "price": 8.99, "subtotal": 17.98},
                {"name": "French Fries", "quantity": 1, "price": 3.99, "subtotal": 3.99}
            ])
        );
    }

    #[test]
    fn test_decode_reads_back_exact_cents() {
        let decoded = BillingSnapshot::decode_lossy(&sample().encode().unwrap());
        assert_eq!(decoded, sample());
        assert_eq!(decoded.total().cents(), 2197);
    }

    #[test]
    fn test_decode_corrupt_is_empty() {
        assert!(BillingSnapshot::decode_lossy("not json").is_empty());
        assert!(BillingSnapshot::decode_lossy("").is_empty());
        assert!(BillingSnapshot::decode_lossy(r#"{"name": "x"}"#).is_empty());
        assert!(BillingSnapshot::decode_lossy(r#"[{"name": "x"}]"#).is_empty());
    }

    #[test]
    fn test_priced_line_rules() {
        let line = BillingLine::priced("Soda", 3, Money::from_cents(199)).unwrap();
        assert_eq!(line.subtotal.cents(), 597);

        assert!(BillingLine::priced("Soda", 0, Money::from_cents(199)).is_err());
        assert!(BillingLine::priced("Soda", 1, Money::from_cents(-1)).is_err());
    }
}
