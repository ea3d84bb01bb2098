//! Custom field validators for request payloads.

use rust_decimal::Decimal;
use validator::ValidationError;

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("non_negative")
            .with_message("must not be negative".into()));
    }
    Ok(())
}

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("not_blank").with_message("must not be blank".into()));
    }
    Ok(())
}

/// Drops an optional text field that was sent empty, so partial updates only
/// overwrite provided values.
pub fn provided(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amounts_are_rejected() {
        assert!(non_negative(&Decimal::new(-1, 2)).is_err());
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::new(25000, 2)).is_ok());
    }

    #[test]
    fn blank_strings_are_rejected() {
        assert!(not_blank("  ").is_err());
        assert!(not_blank("T4").is_ok());
    }

    #[test]
    fn empty_patch_fields_are_ignored() {
        assert_eq!(provided(Some(String::new())), None);
        assert_eq!(provided(Some("  ".into())), None);
        assert_eq!(provided(Some("Cafe".into())), Some("Cafe".into()));
        assert_eq!(provided(None), None);
    }
}
