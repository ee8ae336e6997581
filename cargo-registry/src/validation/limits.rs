//! # Input Validation: Size Limits
//!
//! Default bounds for the two length-framed sections of a publish payload.
//! Deployments override them through [`crate::config::LimitsConfig`].

use crate::validation::error::ValidationError;
use crate::validation::result::ValidationResult;

/// Maximum allowed size of the JSON metadata section (1 MB)
pub const MAX_METADATA_SIZE: usize = 1024 * 1024;

/// Maximum allowed size of the `.crate` tarball section (80 MB)
pub const MAX_CRATE_SIZE: u64 = 80 * 1024 * 1024;

/// Initial buffer capacity cap when spooling crate content (10 MB)
pub const MEMORY_THRESHOLD: usize = 10 * 1024 * 1024;

/// Maximum allowed crate name length
pub const MAX_CRATE_NAME_LENGTH: usize = 64;

/// Maximum allowed owner name length
pub const MAX_OWNER_NAME_LENGTH: usize = 40;

/// Validate a declared size against a limit.
pub fn validate_size(size: u64, max: u64) -> ValidationResult<()> {
    if size > max {
        return Err(ValidationError::TooLarge { actual: size, max });
    }

    Ok(())
}
