use crate::error::{AppError, AppResult};

fn all_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

/// Aadhaar numbers are exactly twelve digits.
pub fn is_valid_aadhaar(value: &str) -> bool {
    all_digits(value, 12)
}

/// Mobile numbers are exactly ten digits.
pub fn is_valid_mobile(value: &str) -> bool {
    all_digits(value, 10)
}

/// Returns the trimmed value, or a validation error naming `field`.
pub fn required(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

/// Treats blank optional strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_numbers() {
        assert!(is_valid_aadhaar("123412341234"));
        assert!(!is_valid_aadhaar("1234 1234 1234"));
        assert!(!is_valid_aadhaar("12341234123"));
        assert!(is_valid_mobile("9876543210"));
        assert!(!is_valid_mobile("98765-43210"));
    }

    #[test]
    fn required_fields() {
        assert_eq!(required("Name", "  Asha ").unwrap(), "Asha");
        assert_eq!(
            required("Name", "   ").unwrap_err().to_string(),
            "Name is required"
        );
        assert_eq!(non_blank(Some(" ".to_string())), None);
        assert_eq!(non_blank(Some(" a@b.in ".to_string())), Some("a@b.in".to_string()));
    }
}
