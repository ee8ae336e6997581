//! Cargo registry implementation
//!
//! Upload decoding, index records, `config.json` publishing and the publish
//! and yank workflows built on top of them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod config;
pub mod index;
pub mod parsing;
pub mod publish;
pub mod yank;

pub use config::{auth_required, build_config, encode_config, IndexConfig};
pub use index::{create_entry, encode_entries, entry_for, index_path, parse_entries, IndexVersionEntry};
pub use parsing::parse_crate_upload;

/// Name of the per-owner index repository.
pub const INDEX_REPOSITORY_NAME: &str = "_cargo-index";

/// Index file read by `cargo` to discover download and API endpoints.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Version property holding the yanked flag as `"true"` or `"false"`.
pub const PROPERTY_YANKED: &str = "cargo.yanked";

/// A decoded upload: validated identity, metadata and the unread content.
#[derive(Debug)]
pub struct PackageDescriptor<R> {
    pub name: String,
    pub version: String,
    pub metadata: Metadata,
    /// Crate tarball, readable exactly once
    pub content: R,
    /// Length declared in the upload framing
    pub content_size: u64,
}

/// Descriptive crate metadata kept with every version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub dependencies: Vec<Dependency>,
    pub features: BTreeMap<String, Vec<String>>,
    pub authors: Vec<String>,
    pub description: String,
    pub documentation_url: String,
    pub project_url: String,
    pub readme: String,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub license: String,
    pub repository_url: String,
    pub links: String,
}

/// How a dependency is referred to from the dependent crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyName {
    Direct(String),
    /// `alias = { package = "original" }` in the dependent manifest
    Renamed { alias: String, package: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    #[default]
    Normal,
    Dev,
    Build,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawDependency", into = "RawDependency")]
pub struct Dependency {
    pub name: DependencyName,
    pub req: String,
    pub features: Vec<String>,
    pub optional: bool,
    pub default_features: bool,
    pub target: Option<String>,
    pub kind: DependencyKind,
    pub registry: Option<String>,
}

impl Dependency {
    /// The name the dependent crate uses.
    pub fn name(&self) -> &str {
        match &self.name {
            DependencyName::Direct(name) => name,
            DependencyName::Renamed { alias, .. } => alias,
        }
    }

    /// The real crate name when the dependency was renamed.
    pub fn package(&self) -> Option<&str> {
        match &self.name {
            DependencyName::Direct(_) => None,
            DependencyName::Renamed { package, .. } => Some(package),
        }
    }
}

/// Index form of a dependency. Field order is the order of the index line.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawDependency {
    name: String,
    req: String,
    #[serde(default)]
    features: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default = "default_true")]
    default_features: bool,
    #[serde(default)]
    target: Option<String>,
    #[serde(default)]
    kind: DependencyKind,
    #[serde(default)]
    registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    package: Option<String>,
}

fn default_true() -> bool {
    true
}

impl From<RawDependency> for Dependency {
    fn from(raw: RawDependency) -> Self {
        let name = match raw.package {
            Some(package) => DependencyName::Renamed {
                alias: raw.name,
                package,
            },
            None => DependencyName::Direct(raw.name),
        };

        Self {
            name,
            req: raw.req,
            features: raw.features,
            optional: raw.optional,
            default_features: raw.default_features,
            target: raw.target,
            kind: raw.kind,
            registry: raw.registry,
        }
    }
}

impl From<Dependency> for RawDependency {
    fn from(dep: Dependency) -> Self {
        let (name, package) = match dep.name {
            DependencyName::Direct(name) => (name, None),
            DependencyName::Renamed { alias, package } => (alias, Some(package)),
        };

        Self {
            name,
            req: dep.req,
            features: dep.features,
            optional: dep.optional,
            default_features: dep.default_features,
            target: dep.target,
            kind: dep.kind,
            registry: dep.registry,
            package,
        }
    }
}
