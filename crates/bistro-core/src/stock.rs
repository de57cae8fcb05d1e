//! # Stock Status
//!
//! Low stock is never stored. It is derived at read time from the item's
//! quantity and the account's `low_stock_threshold`, so changing the
//! threshold re-labels every item immediately.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// Derived stock label for an inventory item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum StockStatus {
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "In Stock")]
    InStock,
}

impl StockStatus {
    /// `LowStock` iff `quantity < threshold`.
    ///
    /// ## Example
    /// ```rust
    /// use bistro_core::stock::StockStatus;
    ///
    /// assert_eq!(StockStatus::from_quantity(4.9, 5), StockStatus::LowStock);
    /// assert_eq!(StockStatus::from_quantity(5.0, 5), StockStatus::InStock);
    /// ```
    pub fn from_quantity(quantity: f64, threshold: i64) -> Self {
        if quantity < threshold as f64 {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            StockStatus::LowStock => "Low Stock",
            StockStatus::InStock => "In Stock",
        }
    }

    #[inline]
    pub const fn is_low(&self) -> bool {
        matches!(self, StockStatus::LowStock)
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_LOW_STOCK_THRESHOLD;

    #[test]
    fn test_threshold_boundary() {
        let t = DEFAULT_LOW_STOCK_THRESHOLD;
        assert_eq!(StockStatus::from_quantity(4.9, t), StockStatus::LowStock);
        assert_eq!(StockStatus::from_quantity(5.0, t), StockStatus::InStock);
        assert_eq!(StockStatus::from_quantity(0.0, t), StockStatus::LowStock);
        assert_eq!(StockStatus::from_quantity(50.0, t), StockStatus::InStock);
    }

    #[test]
    fn test_zero_threshold_never_low() {
        assert_eq!(StockStatus::from_quantity(0.0, 0), StockStatus::InStock);
    }

    #[test]
    fn test_serialized_labels() {
        assert_eq!(
            serde_json::to_string(&StockStatus::LowStock).unwrap(),
            "\"Low Stock\""
        );
        assert_eq!(StockStatus::InStock.to_string(), "In Stock");
        assert!(StockStatus::LowStock.is_low());
    }
}
