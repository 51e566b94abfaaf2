//! Utility functions for formatting and input validation.

pub mod format;
pub mod validate;

// Re-export commonly used functions at module level
pub use format::{
    format_date, format_hours, format_optional, format_percent, format_timestamp,
    parse_timestamp, truncate_string,
};
pub use validate::{
    is_valid_email, parse_date, sanitize_input, validate_date_range, validate_password,
    validate_username,
};
