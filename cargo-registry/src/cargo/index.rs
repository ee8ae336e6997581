//! Cargo index records
//!
//! Each published version is one JSON line in the index file of its crate.
//! Lines are ordered by semantic version so a file rebuilt from storage is
//! byte-identical to one maintained incrementally.

use super::{Dependency, Metadata, PROPERTY_YANKED};
use crate::store::VersionDescriptor;
use crate::{validation, RegistryError, RegistryResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Calculate Cargo index path for a crate name according to Cargo's index structure
/// Names are organized in directories: 1/a, 2/ab, 3/a/abc, ab/cd/abcd...
///
/// The name is validated first, which also rules out path traversal.
pub fn index_path(name: &str) -> RegistryResult<String> {
    validation::validate_crate_name(name)
        .map_err(|_| RegistryError::InvalidName(name.to_string()))?;

    let name = name.to_lowercase();
    let path = match name.len() {
        1 => format!("1/{name}"),
        2 => format!("2/{name}"),
        3 => format!("3/{}/{name}", &name[..1]),
        _ => format!("{}/{}/{name}", &name[..2], &name[2..4]),
    };

    Ok(path)
}

/// One line of a crate's index file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexVersionEntry {
    pub name: String,
    pub vers: String,
    #[serde(default)]
    pub deps: Vec<Dependency>,
    pub cksum: String,
    #[serde(default)]
    pub features: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub yanked: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub links: String,
}

pub fn create_entry(
    name: &str,
    version: &str,
    metadata: &Metadata,
    checksum: &str,
    yanked: bool,
) -> IndexVersionEntry {
    IndexVersionEntry {
        name: name.to_string(),
        vers: version.to_string(),
        deps: metadata.dependencies.clone(),
        cksum: checksum.to_string(),
        features: metadata.features.clone(),
        yanked,
        links: metadata.links.clone(),
    }
}

/// Build the index record of a stored version.
///
/// The checksum is the SHA-256 of the version's crate file. A missing yanked
/// property reads as not yanked.
pub fn entry_for(descriptor: &VersionDescriptor) -> RegistryResult<IndexVersionEntry> {
    let file = descriptor.files.first().ok_or_else(|| {
        RegistryError::Internal(format!(
            "{} {} has no crate file",
            descriptor.package.name, descriptor.version.version
        ))
    })?;

    let yanked = descriptor
        .version
        .properties
        .get(PROPERTY_YANKED)
        .is_some_and(|value| value == "true");

    Ok(create_entry(
        &descriptor.package.name,
        &descriptor.version.version,
        &descriptor.version.metadata,
        &file.sha256,
        yanked,
    ))
}

fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Serialize entries as index file content, one line per entry in ascending
/// version order. Returns `None` for an empty set; such a crate has no file.
pub fn encode_entries(mut entries: Vec<IndexVersionEntry>) -> RegistryResult<Option<Vec<u8>>> {
    if entries.is_empty() {
        return Ok(None);
    }

    entries.sort_by(|a, b| compare_versions(&a.vers, &b.vers));

    let mut content = Vec::new();
    for entry in &entries {
        serde_json::to_writer(&mut content, entry)?;
        content.push(b'\n');
    }

    Ok(Some(content))
}

/// Parse index file content. Blank lines are skipped.
pub fn parse_entries(content: &[u8]) -> RegistryResult<Vec<IndexVersionEntry>> {
    content
        .split(|byte| *byte == b'\n')
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
        .map(|line| serde_json::from_slice(line).map_err(RegistryError::from))
        .collect()
}
