//! Payload validation helpers
//!
//! Length caps for free-text fields and sanity bounds for monetary amounts
//! on write payloads. Reads are never validated; whatever is already in a
//! partition gets normalized, not rejected.

use serde_json::{Map, Value};

use crate::core::error::{RepoError, RepoResult};

/// Customer names and other short identifiers
pub const MAX_NAME_LEN: usize = 200;
/// Notes, delivery instructions
pub const MAX_NOTE_LEN: usize = 500;
/// Street addresses
pub const MAX_ADDRESS_LEN: usize = 500;
/// Largest monetary amount accepted from a payload
pub const MAX_AMOUNT: f64 = 1_000_000.0;

/// Validate that an optional text field stays within its length limit
pub fn validate_text(value: Option<&str>, field: &str, max_len: usize) -> RepoResult<()> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(RepoError::InvalidPayload(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate that a monetary amount is finite, non-negative and within bounds
pub fn validate_amount(value: f64, field: &str) -> RepoResult<()> {
    if !value.is_finite() {
        return Err(RepoError::InvalidPayload(format!(
            "{field} must be a finite number"
        )));
    }
    if value < 0.0 {
        return Err(RepoError::InvalidPayload(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    if value > MAX_AMOUNT {
        return Err(RepoError::InvalidPayload(format!(
            "{field} exceeds the maximum allowed amount, got {value}"
        )));
    }
    Ok(())
}

/// Check the monetary and free-text fields of an order write payload.
/// Fields that are absent or of an unexpected type are left for the
/// normalizer to default.
pub fn validate_order_payload(data: &Map<String, Value>) -> RepoResult<()> {
    for field in ["total", "subtotal", "deliveryFee", "tipAmount"] {
        if let Some(value) = data.get(field).and_then(Value::as_f64) {
            validate_amount(value, field)?;
        }
    }
    validate_text(
        data.get("customerName").and_then(Value::as_str),
        "customerName",
        MAX_NAME_LEN,
    )?;
    validate_text(
        data.get("address").and_then(Value::as_str),
        "address",
        MAX_ADDRESS_LEN,
    )?;
    validate_text(
        data.get("notes").and_then(Value::as_str),
        "notes",
        MAX_NOTE_LEN,
    )?;
    validate_text(
        data.get("deliveryInstructions").and_then(Value::as_str),
        "deliveryInstructions",
        MAX_NOTE_LEN,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_length_limits() {
        assert!(validate_text(Some("fine"), "notes", MAX_NOTE_LEN).is_ok());
        assert!(validate_text(None, "notes", MAX_NOTE_LEN).is_ok());
        let long = "x".repeat(MAX_NOTE_LEN + 1);
        assert!(validate_text(Some(&long), "notes", MAX_NOTE_LEN).is_err());
    }

    #[test]
    fn test_amount_bounds() {
        assert!(validate_amount(0.0, "total").is_ok());
        assert!(validate_amount(42.5, "total").is_ok());
        assert!(validate_amount(-0.01, "total").is_err());
        assert!(validate_amount(MAX_AMOUNT + 1.0, "total").is_err());
        assert!(validate_amount(f64::NAN, "total").is_err());
    }

    #[test]
    fn test_payload_check() {
        let ok = json!({"total": 25.0, "notes": "extra sauce"});
        assert!(validate_order_payload(ok.as_object().unwrap()).is_ok());

        let bad = json!({"total": -5.0});
        assert!(validate_order_payload(bad.as_object().unwrap()).is_err());

        // Unexpected types are the normalizer's problem, not a rejection
        let odd = json!({"total": "not-a-number"});
        assert!(validate_order_payload(odd.as_object().unwrap()).is_ok());
    }
}
