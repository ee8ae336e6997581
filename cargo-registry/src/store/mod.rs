//! Package storage seam.
//!
//! Storage is the source of truth for packages, versions, their files and
//! properties. The index is derived from it.

use crate::cargo::Metadata;
use crate::RegistryResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

pub mod fs;

pub use fs::FsPackageStore;

pub type PackageId = u64;
pub type VersionId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub owner: String,
    /// Name as first published
    pub name: String,
    pub lower_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub id: VersionId,
    pub package_id: PackageId,
    pub version: String,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageFile {
    pub name: String,
    pub sha256: String,
    pub size: u64,
}

/// A version together with its package and files.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionDescriptor {
    pub package: Package,
    pub version: PackageVersion,
    pub files: Vec<PackageFile>,
}

/// Everything needed to store a new version and its single file.
pub struct NewPackageVersion<'a> {
    pub owner: &'a str,
    pub name: &'a str,
    pub version: &'a str,
    pub metadata: &'a Metadata,
    pub properties: BTreeMap<String, String>,
    pub file_name: String,
    pub sha256: String,
    pub size: u64,
    pub content: &'a mut dyn Read,
}

/// Package, version, file and property storage.
///
/// Names and versions are matched case-insensitively.
pub trait PackageStore {
    fn find_package(&self, owner: &str, name: &str) -> RegistryResult<Option<Package>>;

    fn package_by_id(&self, id: PackageId) -> RegistryResult<Option<Package>>;

    fn list_packages(&self, owner: &str) -> RegistryResult<Vec<Package>>;

    fn find_version(
        &self,
        package_id: PackageId,
        version: &str,
    ) -> RegistryResult<Option<PackageVersion>>;

    fn version_descriptors(&self, package_id: PackageId) -> RegistryResult<Vec<VersionDescriptor>>;

    /// Creates the package on first publish. A version that already exists
    /// is a [`RegistryError::Conflict`](crate::RegistryError::Conflict).
    fn create_package_version(&self, new: NewPackageVersion<'_>) -> RegistryResult<VersionDescriptor>;

    fn version_property(&self, version_id: VersionId, name: &str) -> RegistryResult<Option<String>>;

    fn set_version_property(&self, version_id: VersionId, name: &str, value: &str) -> RegistryResult<()>;

    /// Removes the version and its file records. The package itself stays,
    /// possibly without versions.
    fn delete_version(&self, version_id: VersionId) -> RegistryResult<()>;
}
