//! # Validation Module
//!
//! Input validation rules for the back office.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: HTTP extractor (back-office)                                 │
//! │  ├── JSON shape and types (serde)                                      │
//! │  └── Decimal amounts parsed to cents                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Business rules (quantity 1..=999, price >= 0, password rules)     │
//! │  └── Normalization (trimming, defaults)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── UNIQUE (username, email, order_number)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validators that normalize return the cleaned value so callers never
//! persist the untrimmed input by accident.

use crate::error::ValidationError;
use crate::money::{Money, Rate};
use crate::{MAX_ITEM_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Customer name used when an order is placed without one.
pub const DEFAULT_CUSTOMER_NAME: &str = "Unknown";

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Themes the dashboard knows how to render.
pub const THEMES: &[&str] = &["light", "dark"];

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required, trimmed text field.
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Pizza ", 100).unwrap(), "Pizza");
/// assert!(validate_name("name", "   ", 100).is_err());
/// ```
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional text field; blank becomes `None`.
pub fn validate_optional_text(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Validates text that may be blank but not over-long; returns it trimmed.
pub fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    Ok(validate_optional_text(field, Some(value), max)?.unwrap_or_default())
}

/// Normalizes the customer name on an order.
///
/// Blank or missing names become [`DEFAULT_CUSTOMER_NAME`].
pub fn validate_customer_name(value: Option<&str>) -> ValidationResult<String> {
    Ok(validate_optional_text("customer_name", value, 100)?
        .unwrap_or_else(|| DEFAULT_CUSTOMER_NAME.to_string()))
}

/// Validates a search query.
///
/// ## Returns
/// The trimmed query, or `None` when blank.
pub fn validate_search_query(query: Option<&str>) -> ValidationResult<Option<String>> {
    validate_optional_text("search", query, 100)
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates a username.
///
/// ## Rules
/// - Required, at most 150 characters
/// - Letters, digits and `@ . + - _` only
pub fn validate_username(username: &str) -> ValidationResult<String> {
    let username = validate_name("username", username, 150)?;

    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err(ValidationError::invalid(
            "username",
            "may contain only letters, numbers, and @/./+/-/_ characters",
        ));
    }

    Ok(username)
}

/// Validates an email address.
///
/// ## Rules
/// - Required, at most 254 characters, no whitespace
/// - Exactly one `@` with a non-empty local part
/// - Domain contains a dot that is neither first nor last
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_email;
///
/// assert!(validate_email("alice@example.com").is_ok());
/// assert!(validate_email("alice@localhost").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_name("email", email, 254)?;

    let invalid = || ValidationError::invalid("email", "enter a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid());
    }

    Ok(email)
}

/// Validates a new password.
///
/// ## Rules
/// - At least [`MIN_PASSWORD_LENGTH`] characters
/// - Not entirely numeric
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid(
            "password",
            "password is entirely numeric",
        ));
    }

    Ok(())
}

/// Validates a registration password and its confirmation.
pub fn validate_password_pair(password: &str, confirmation: &str) -> ValidationResult<()> {
    if password != confirmation {
        return Err(ValidationError::Mismatch {
            field: "password".to_string(),
        });
    }

    validate_password(password)
}

/// Validates a dashboard theme name.
pub fn validate_theme(theme: &str) -> ValidationResult<String> {
    let theme = theme.trim().to_lowercase();

    if !THEMES.contains(&theme.as_str()) {
        return Err(ValidationError::NotAllowed {
            field: "theme".to_string(),
            allowed: THEMES.iter().map(|t| t.to_string()).collect(),
        });
    }

    Ok(theme)
}

/// Validates the per-account low stock threshold.
pub fn validate_low_stock_threshold(threshold: i64) -> ValidationResult<()> {
    if threshold < 0 {
        return Err(ValidationError::Negative {
            field: "low_stock_threshold".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an order line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Create Order                                                           │
/// │                                                                         │
/// │  {"menu_item_id": 3, "quantity": 2}                                     │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(2) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       ├── qty <= 0? → 400 "quantity must be positive"                  │
/// │       │                                                                 │
/// │       ├── qty > 999? → 400 "quantity must be between 1 and 999"        │
/// │       │                                                                 │
/// │       └── OK → price the line                                          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates the number of lines on an order.
pub fn validate_line_count(lines: usize) -> ValidationResult<()> {
    if lines > MAX_ORDER_LINES {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_ORDER_LINES as i64,
        });
    }

    Ok(())
}

/// Validates a menu price.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (free items)
pub fn validate_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::Negative {
            field: "price".to_string(),
        });
    }

    Ok(())
}

/// Validates an inventory quantity.
///
/// ## Rules
/// - Must be a finite number
/// - Must be non-negative
///
/// ## Example
/// ```rust
/// use bistro_core::validation::validate_stock_quantity;
///
/// assert!(validate_stock_quantity(4.9).is_ok());
/// assert!(validate_stock_quantity(-1.0).is_err());
/// assert!(validate_stock_quantity(f64::NAN).is_err());
/// ```
pub fn validate_stock_quantity(quantity: f64) -> ValidationResult<()> {
    if !quantity.is_finite() {
        return Err(ValidationError::invalid("quantity", "must be a finite number"));
    }

    if quantity < 0.0 {
        return Err(ValidationError::Negative {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a percentage setting (tax rate, tip).
///
/// ## Rules
/// - Must be between 0 and 10000 bps (0% to 100%)
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate.bps() > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("name", " Pizza ", 100).unwrap(), "Pizza");
        assert!(validate_name("name", "", 100).is_err());
        assert!(validate_name("name", &"A".repeat(101), 100).is_err());
    }

    #[test]
    fn test_validate_optional_text() {
        assert_eq!(validate_optional_text("unit", None, 20).unwrap(), None);
        assert_eq!(validate_optional_text("unit", Some("  "), 20).unwrap(), None);
        assert_eq!(
            validate_optional_text("unit", Some(" kg "), 20).unwrap(),
            Some("kg".to_string())
        );
        assert!(validate_optional_text("unit", Some(&"x".repeat(21)), 20).is_err());
    }

    #[test]
    fn test_validate_customer_name_defaults() {
        assert_eq!(validate_customer_name(None).unwrap(), "Unknown");
        assert_eq!(validate_customer_name(Some("   ")).unwrap(), "Unknown");
        assert_eq!(validate_customer_name(Some("Alice")).unwrap(), "Alice");
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("alice.b+1@x").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(" alice@example.com ").unwrap(),
            "alice@example.com"
        );
        assert!(validate_email("").is_err());
        assert!(validate_email("alice").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("alice@.com").is_err());
        assert!(validate_email("a b@example.com").is_err());
        assert!(validate_email("a@b@example.com").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("s3cretpass").is_ok());
        assert!(validate_password("short1").is_err());
        assert!(validate_password("12345678").is_err());
        assert!(validate_password("").is_err());
    }

    #[test]
    fn test_validate_password_pair() {
        assert!(validate_password_pair("s3cretpass", "s3cretpass").is_ok());
        let err = validate_password_pair("s3cretpass", "other-pass").unwrap_err();
        assert_eq!(err.field(), "password");
        assert!(matches!(err, ValidationError::Mismatch { .. }));
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Money::zero()).is_ok());
        assert!(validate_price(Money::from_cents(899)).is_ok());
        assert!(validate_price(Money::from_cents(-1)).is_err());
    }

    #[test]
    fn test_validate_stock_quantity() {
        assert!(validate_stock_quantity(0.0).is_ok());
        assert!(validate_stock_quantity(4.9).is_ok());
        assert!(validate_stock_quantity(-0.1).is_err());
        assert!(validate_stock_quantity(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate("tax_rate", Rate::from_bps(0)).is_ok());
        assert!(validate_rate("tax_rate", Rate::from_bps(10_000)).is_ok());
        assert!(validate_rate("tax_rate", Rate::from_bps(10_001)).is_err());
    }

    #[test]
    fn test_validate_theme_and_threshold() {
        assert_eq!(validate_theme("Dark").unwrap(), "dark");
        assert!(validate_theme("neon").is_err());
        assert!(validate_low_stock_threshold(0).is_ok());
        assert!(validate_low_stock_threshold(-1).is_err());
    }

    #[test]
    fn test_validate_line_count() {
        assert!(validate_line_count(1).is_ok());
        assert!(validate_line_count(MAX_ORDER_LINES).is_ok());
        assert!(validate_line_count(MAX_ORDER_LINES + 1).is_err());
    }
}
