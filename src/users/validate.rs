use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref BOOL_WORD_RE: Regex = Regex::new(r"(?i)\b(?:true|false)\b").unwrap();
}

const PASSWORD_SYMBOLS: &str = "@$!%*?&#^_-+=.,:;~()[]{}<>/\\|'\"`";

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Trims and checks the human-chosen identifier.
pub fn user_id(raw: &str) -> Result<String, AppError> {
    let v = raw.trim();
    if v.is_empty() || !v.chars().all(|c| c.is_ascii_alphanumeric()) || BOOL_WORD_RE.is_match(v) {
        return Err(AppError::validation(
            "user_id",
            "UserId should be alphanumeric, not empty, and should not be the words \"true\" or \"false\"",
        ));
    }
    Ok(v.to_string())
}

pub fn name(field: &'static str, raw: &str) -> Result<String, AppError> {
    let v = raw.trim();
    if v.is_empty() || !v.chars().all(|c| c.is_ascii_alphabetic()) || BOOL_WORD_RE.is_match(v) {
        return Err(AppError::validation(
            field,
            format!(
                "{field} should only contain letters, not be empty, and should not be the words \"true\" or \"false\""
            ),
        ));
    }
    Ok(v.to_string())
}

pub fn age(value: i32) -> Result<i32, AppError> {
    if value <= 0 {
        return Err(AppError::validation("age", "Age should be a positive number"));
    }
    Ok(value)
}

/// Normalises (trim + lowercase) and checks an email.
pub fn email(raw: &str) -> Result<String, AppError> {
    let v = raw.trim().to_lowercase();
    if !is_valid_email(&v) {
        return Err(AppError::validation("email", "Email is invalid or empty"));
    }
    Ok(v)
}

pub fn password(plain: &str) -> Result<(), AppError> {
    let long_enough = plain.chars().count() >= 8;
    let lower = plain.chars().any(|c| c.is_ascii_lowercase());
    let upper = plain.chars().any(|c| c.is_ascii_uppercase());
    let digit = plain.chars().any(|c| c.is_ascii_digit());
    let symbol = plain.chars().any(|c| PASSWORD_SYMBOLS.contains(c));
    if !(long_enough && lower && upper && digit && symbol) {
        return Err(AppError::validation(
            "password",
            "Password must contain at least 8 characters, including one lowercase letter, \
             one uppercase letter, one digit, and one special character",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_rules() {
        assert_eq!(user_id("  alice42 ").unwrap(), "alice42");
        assert!(user_id("").is_err());
        assert!(user_id("alice_42").is_err());
        assert!(user_id("TRUE").is_err());
        assert!(user_id("false").is_err());
        assert_eq!(user_id("trueblue").unwrap(), "trueblue");
    }

    #[test]
    fn name_rules() {
        assert_eq!(name("first_name", " Ada ").unwrap(), "Ada");
        assert!(name("first_name", "Ada1").is_err());
        assert!(name("last_name", "").is_err());
        let err = name("last_name", "False").unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "last_name", .. }));
    }

    #[test]
    fn email_is_normalised() {
        assert_eq!(email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        assert!(email("not-an-email").is_err());
        assert!(email("").is_err());
    }

    #[test]
    fn age_must_be_positive() {
        assert_eq!(age(30).unwrap(), 30);
        assert!(age(0).is_err());
        assert!(age(-4).is_err());
    }

    #[test]
    fn password_complexity() {
        assert!(password("Secur3P@ss").is_ok());
        assert!(password("Sh0rt!").is_err());
        assert!(password("alllower1!").is_err());
        assert!(password("ALLUPPER1!").is_err());
        assert!(password("NoDigits!!").is_err());
        assert!(password("NoSymbol11").is_err());
    }
}
