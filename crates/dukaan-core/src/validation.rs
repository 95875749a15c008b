//! # Validation Module
//!
//! Input rules checked before any write.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Draft edits (clamping)                                       │
//! │  └── negative quantity/price → 0, discount → [0, 100%]                 │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Commit / payment commands                                    │
//! │  └── THIS MODULE: customer, quantities, amounts, reasons               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  └── CHECK (stock_quantity >= 0), CHECK (amount_paise > 0), FKs        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_NAME_LEN: usize = 120;
const MAX_REASON_LEN: usize = 500;
const MAX_PHONE_LEN: usize = 15;
const MAX_EMAIL_LEN: usize = 254;
const MAX_ADDRESS_LEN: usize = 500;

/// Validates the customer name an invoice is issued to.
///
/// ```rust
/// use dukaan_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Asha Verma").is_ok());
/// assert!(validate_customer_name("   ").is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("customer_name"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Optional phone: digits with an optional leading `+`, spaces ignored.
pub fn validate_phone(phone: Option<&str>) -> ValidationResult<()> {
    let Some(phone) = phone.map(str::trim).filter(|p| !p.is_empty()) else {
        return Ok(());
    };

    let digits: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    let body = digits.strip_prefix('+').unwrap_or(&digits);

    if body.is_empty() || !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "customer_phone".to_string(),
            reason: "only digits and a leading + are allowed".to_string(),
        });
    }

    if body.len() > MAX_PHONE_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_phone".to_string(),
            max: MAX_PHONE_LEN,
        });
    }

    Ok(())
}

/// Optional email: `local@domain.tld`, no whitespace.
///
/// ```rust
/// use dukaan_core::validation::validate_email;
///
/// assert!(validate_email(Some("asha@example.in")).is_ok());
/// assert!(validate_email(Some("asha@localhost")).is_err());
/// ```
pub fn validate_email(email: Option<&str>) -> ValidationResult<()> {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return Ok(());
    };

    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: MAX_EMAIL_LEN,
        });
    }

    let well_formed = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && domain.split('.').all(|part| !part.is_empty())
                && !domain.contains('@')
        }
        None => false,
    };

    if !well_formed || email.contains(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "expected name@domain".to_string(),
        });
    }

    Ok(())
}

/// Optional postal address; only the length is checked.
pub fn validate_address(address: Option<&str>) -> ValidationResult<()> {
    let length = address.map(|a| a.trim().chars().count()).unwrap_or(0);

    if length > MAX_ADDRESS_LEN {
        return Err(ValidationError::TooLong {
            field: "address".to_string(),
            max: MAX_ADDRESS_LEN,
        });
    }

    Ok(())
}

/// Validates a committed line quantity.
///
/// ```rust
/// use dukaan_core::validation::validate_quantity;
///
/// assert!(validate_quantity(1).is_ok());
/// assert!(validate_quantity(0).is_err());
/// ```
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a rate in basis points (tax or discount), 0..=100%.
pub fn validate_rate_bps(field: &str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

/// Payment and waiver amounts must be strictly positive.
pub fn validate_payment_amount(amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "amount".to_string(),
        });
    }

    Ok(())
}

/// Validates a free-text reason (status override, settlement discount).
/// Returns the trimmed reason.
pub fn validate_reason(reason: Option<&str>) -> ValidationResult<String> {
    let reason = reason.map(str::trim).unwrap_or_default();

    if reason.is_empty() {
        return Err(ValidationError::required("reason"));
    }

    if reason.chars().count() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }

    Ok(reason.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_name_length() {
        let longest = "a".repeat(MAX_NAME_LEN);
        assert!(validate_customer_name(&longest).is_ok());
        assert!(validate_customer_name(&format!("{}a", longest)).is_err());
    }

    #[test]
    fn test_phone() {
        assert!(validate_phone(None).is_ok());
        assert!(validate_phone(Some("")).is_ok());
        assert!(validate_phone(Some("+91 98765 43210")).is_ok());
        assert!(validate_phone(Some("98-765")).is_err());
        assert!(validate_phone(Some("+")).is_err());
    }

    #[test]
    fn test_email() {
        assert!(validate_email(None).is_ok());
        assert!(validate_email(Some("  ")).is_ok());
        assert!(validate_email(Some("ravi.k@shop.co.in")).is_ok());
        assert!(validate_email(Some("ravi.k")).is_err());
        assert!(validate_email(Some("@shop.in")).is_err());
        assert!(validate_email(Some("ravi@shop..in")).is_err());
        assert!(validate_email(Some("ravi k@shop.in")).is_err());
    }

    #[test]
    fn test_address_length() {
        let longest = "a".repeat(MAX_ADDRESS_LEN);
        assert!(validate_address(Some(&longest)).is_ok());
        assert!(validate_address(Some(&format!("{}a", longest))).is_err());
    }

    #[test]
    fn test_quantity_bounds() {
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_rate_bps() {
        assert!(validate_rate_bps("tax_rate", 2_800).is_ok());
        assert!(validate_rate_bps("tax_rate", 10_001).is_err());
    }

    #[test]
    fn test_reason_is_trimmed() {
        assert_eq!(
            validate_reason(Some("  wrong tender  ")).ok(),
            Some("wrong tender".to_string())
        );
        assert!(validate_reason(Some("   ")).is_err());
        assert!(validate_reason(None).is_err());
    }

    #[test]
    fn test_payment_amount() {
        assert!(validate_payment_amount(Money::from_paise(1)).is_ok());
        assert!(validate_payment_amount(Money::zero()).is_err());
    }
}
