//! Input checks applied before a form is submitted.

use chrono::NaiveDate;

use crate::api::ApiError;

/// Characters stripped from free text
const UNSAFE_CHARS: &[char] = &['<', '>', '"', '\'', '`', ';'];

/// Minimum password length accepted by the backend
const MIN_PASSWORD_LENGTH: usize = 8;

/// A password needs at least one of these
const PASSWORD_SPECIAL_CHARS: &[char] = &[
    '!', '@', '#', '$', '%', '^', '&', '*', '(', ')', ',', '.', '?', '"', ':', '{', '}', '|', '<',
    '>',
];

const MIN_USERNAME_LENGTH: usize = 3;
const MAX_USERNAME_LENGTH: usize = 20;

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::InvalidRequest(format!("Invalid date '{}', expected YYYY-MM-DD", value)))
}

/// Both dates valid and `start <= end`
pub fn validate_date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), ApiError> {
    let from = parse_date(start)?;
    let to = parse_date(end)?;
    if from > to {
        return Err(ApiError::InvalidRequest(format!(
            "Start date {} is after end date {}",
            start, end
        )));
    }
    Ok((from, to))
}

/// Loose `local@domain.tld` shape check
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && tld.len() >= 2,
        None => false,
    }
}

/// Password strength: 8+ chars with upper, lower, a digit and a special character
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(&c)) {
        return Err("Password must contain at least one special character".to_string());
    }
    Ok(())
}

/// Usernames are 3 to 20 ASCII letters, digits or underscores
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&len) {
        return Err(format!(
            "Username must be {} to {} characters long",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        ));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Username may only contain letters, digits and underscores".to_string());
    }
    Ok(())
}

/// Trim, collapse whitespace and drop markup/quote characters
pub fn sanitize_input(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .filter(|c| !UNSAFE_CHARS.contains(c))
        .collect()
}
