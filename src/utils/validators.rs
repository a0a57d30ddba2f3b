use crate::error::{AppError, AppResult};

/// Validate a GitHub login (alphanumeric, hyphens, underscores, 1-39 chars)
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.is_empty() {
        return Err(AppError::invalid_input(
            "username",
            "username is required (query param or JSON body)",
        ));
    }

    if username.len() > 39 {
        return Err(AppError::invalid_input(
            "username",
            "username must be between 1 and 39 characters",
        ));
    }

    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::invalid_input(
            "username",
            format!(
                "'{}' can only contain alphanumeric characters, hyphens, and underscores",
                username
            ),
        ));
    }

    Ok(())
}

/// Validate a month bucket name of the form `YYYY-MM`
pub fn validate_month_name(month: &str) -> AppResult<()> {
    let invalid = || {
        AppError::invalid_input(
            "month",
            format!("'{}' is not a month of the form YYYY-MM", month),
        )
    };

    let (year, mon) = month.split_once('-').ok_or_else(invalid)?;

    if year.len() != 4 || mon.len() != 2 {
        return Err(invalid());
    }

    if !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }

    match mon.parse::<u32>() {
        Ok(1..=12) => Ok(()),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("octocat").is_ok());
        assert!(validate_username("my-user_123").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(40)).is_err());
        assert!(validate_username("user@example").is_err());
        assert!(validate_username("../admin").is_err());
    }

    #[test]
    fn test_validate_username_names_the_field() {
        match validate_username("") {
            Err(AppError::InvalidInput { field, .. }) => assert_eq!(field, "username"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_validate_month_name() {
        assert!(validate_month_name("2025-09").is_ok());
        assert!(validate_month_name("2025-12").is_ok());
        assert!(validate_month_name("2025-00").is_err());
        assert!(validate_month_name("2025-13").is_err());
        assert!(validate_month_name("2025-9").is_err());
        assert!(validate_month_name("25-09").is_err());
        assert!(validate_month_name("2025/09").is_err());
        assert!(validate_month_name("").is_err());
    }
}
