//! # Input Validation Utilities
//!
//! Validation helpers applied to everything a publisher controls before it
//! reaches storage or the index: crate and owner names, versions, URLs and
//! the framing sizes of the upload payload.

pub mod error;
pub mod limits;
pub mod manifests;
pub mod owners;
pub mod result;
pub mod urls;

pub use self::{
    error::ValidationError,
    limits::{
        validate_size, MAX_CRATE_NAME_LENGTH, MAX_CRATE_SIZE, MAX_METADATA_SIZE,
        MAX_OWNER_NAME_LENGTH, MEMORY_THRESHOLD,
    },
    manifests::{validate_crate_name, validate_version},
    owners::validate_owner_name,
    result::ValidationResult,
    urls::{is_valid_url, normalize_url},
};
