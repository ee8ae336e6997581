//! # Cargo Registry
//!
//! The publish side of a Cargo registry layered on generic package storage:
//! upload decoding, and a per-owner index kept as files in a git repository
//! that `cargo` fetches directly.
//!
//! ## Key Modules
//!
//! - [`cargo`]: upload parsing, index records, `config.json`, publish and yank
//! - [`index_repo`]: the per-owner index repository and its mutations
//! - [`store`]: the package storage seam and a filesystem implementation
//! - [`git`]: the repository hosting seam and a `git2` implementation
//! - [`error`]: error types and HTTP mapping
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cargo_registry::{Config, LocalCargoRegistry, Owner, User};
//!
//! let registry = LocalCargoRegistry::open(&Config::default())?;
//! let doer = User::new("Ferris", "ferris@example.com");
//! let owner = Owner::public("acme")?;
//!
//! registry.index().ensure_initialized(&doer, &owner)?;
//! let body = std::fs::File::open("publish-request.bin")?;
//! registry.upload_package(&doer, &owner, body)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cargo;
pub mod cli;
pub mod config;
pub mod error;
pub mod git;
pub mod hash_utils;
pub mod index_repo;
pub mod locks;
pub mod registry;
pub mod store;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::{ApiErrorResponse, ErrorCode, RegistryError, RegistryResult};
pub use hash_utils::sha256_hash;
pub use index_repo::{IndexSettings, RegistryIndexRepository};
pub use registry::{CargoRegistry, LocalCargoRegistry};
pub use types::{Owner, User, Visibility};
