//! # Input Validation: Owner Names
//!
//! Owner names become a directory under the repositories root, so they are
//! restricted to a single plain path component.

use crate::validation::error::ValidationError;
use crate::validation::limits::MAX_OWNER_NAME_LENGTH;
use crate::validation::result::ValidationResult;

/// Validate a user or organization name.
///
/// ASCII letters, digits, `-`, `_` and `.`; no leading or trailing `.` and
/// no `..`.
pub fn validate_owner_name(name: &str) -> ValidationResult<&str> {
    if name.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if name.len() > MAX_OWNER_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            actual: name.len(),
            max: MAX_OWNER_NAME_LENGTH,
        });
    }

    if name
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.'))
    {
        return Err(ValidationError::InvalidCharacters {
            input: name.to_string(),
        });
    }

    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return Err(ValidationError::InvalidFormat {
            reason: format!("'{name}' is not a valid owner name"),
        });
    }

    Ok(name)
}
