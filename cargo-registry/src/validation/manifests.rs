//! # Input Validation: Crate Manifests
//!
//! Name and version rules for published crates.

use crate::validation::error::ValidationError;
use crate::validation::limits::MAX_CRATE_NAME_LENGTH;
use crate::validation::result::ValidationResult;

/// Validate a crate name.
///
/// A valid name is 1 to 64 characters long, starts with an ASCII letter and
/// continues with ASCII letters, digits, `-` or `_`.
pub fn validate_crate_name(name: &str) -> ValidationResult<&str> {
    if name.is_empty() {
        return Err(ValidationError::TooShort { actual: 0, min: 1 });
    }

    if name.len() > MAX_CRATE_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            actual: name.len(),
            max: MAX_CRATE_NAME_LENGTH,
        });
    }

    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidFormat {
            reason: "crate names must start with an ASCII letter".to_string(),
        });
    }

    if name
        .chars()
        .any(|c| !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_'))
    {
        return Err(ValidationError::InvalidCharacters {
            input: name.to_string(),
        });
    }

    Ok(name)
}

/// Validate a version string against the semantic versioning grammar.
pub fn validate_version(version: &str) -> ValidationResult<semver::Version> {
    semver::Version::parse(version).map_err(|e| ValidationError::InvalidFormat {
        reason: format!("'{version}' is not a semantic version: {e}"),
    })
}
