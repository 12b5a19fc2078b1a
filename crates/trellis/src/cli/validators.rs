//! CLI input validation functions.
//!
//! Used via clap's `value_parser` attribute so bad input fails at parse time
//! with a specific message instead of reaching the store.

use chrono::NaiveDate;

use crate::domain::MAX_NAME_LENGTH;

/// Validate a workstream or item name.
///
/// Names are trimmed, must be non-empty, at most [`MAX_NAME_LENGTH`]
/// characters, and single-line.
pub fn validate_name(s: &str) -> Result<String, String> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err("Name cannot be empty".to_string());
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(format!(
            "Name cannot exceed {MAX_NAME_LENGTH} characters (got {})",
            trimmed.chars().count()
        ));
    }
    if trimmed.chars().any(|c| c == '\n' || c == '\r') {
        return Err("Name must be a single line".to_string());
    }

    Ok(trimmed.to_string())
}

/// Parse a date argument in `YYYY-MM-DD` format.
pub fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{s}'. Expected format: YYYY-MM-DD (e.g., 2025-06-30)"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::simple("Release 2.0")]
    #[case::padded("  trimmed  ")]
    fn test_valid_names(#[case] input: &str) {
        assert!(validate_name(input).is_ok());
    }

    #[rstest]
    #[case::empty("", "empty")]
    #[case::whitespace("   ", "empty")]
    #[case::multiline("two\nlines", "single line")]
    fn test_invalid_names(#[case] input: &str, #[case] expected: &str) {
        let err = validate_name(input).unwrap_err();
        assert!(err.to_lowercase().contains(expected), "got: {err}");
    }

    #[test]
    fn test_name_length_limit() {
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_name(&long).is_err());
        let max = "x".repeat(MAX_NAME_LENGTH);
        assert!(validate_name(&max).is_ok());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2025-06-30").unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap()
        );
        assert!(parse_date("30/06/2025").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }
}
