//! Cargo package upload parsing and validation
//!
//! A publish request body is two length-prefixed sections:
//!
//! ```text
//! u32 LE metadata length | metadata JSON | u32 LE crate length | .crate bytes
//! ```
//!
//! Only the headers and the metadata are consumed here. The crate bytes are
//! handed back as a bounded reader so the caller can stream them to storage.

use super::{Dependency, DependencyKind, DependencyName, Metadata, PackageDescriptor};
use crate::config::LimitsConfig;
use crate::validation::{self, normalize_url};
use crate::{RegistryError, RegistryResult};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::io::{self, Read, Take};
use tracing::{debug, warn};

/// Metadata document sent by `cargo publish`.
#[derive(Debug, Deserialize)]
struct PublishManifest {
    name: String,
    vers: String,
    #[serde(default, deserialize_with = "nullable")]
    deps: Vec<PublishDependency>,
    #[serde(default, deserialize_with = "nullable")]
    features: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    authors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    documentation: Option<String>,
    #[serde(default)]
    homepage: Option<String>,
    #[serde(default)]
    readme: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    keywords: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    categories: Vec<String>,
    #[serde(default)]
    license: Option<String>,
    #[serde(default)]
    repository: Option<String>,
    #[serde(default)]
    links: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublishDependency {
    name: String,
    version_req: String,
    #[serde(default, deserialize_with = "nullable")]
    features: Vec<String>,
    #[serde(default)]
    optional: bool,
    #[serde(default = "default_true")]
    default_features: bool,
    #[serde(default)]
    target: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    kind: DependencyKind,
    #[serde(default)]
    registry: Option<String>,
    #[serde(default)]
    explicit_name_in_toml: Option<String>,
}

fn default_true() -> bool {
    true
}

/// `null` decodes to the type's default.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl From<PublishDependency> for Dependency {
    fn from(dep: PublishDependency) -> Self {
        let name = match dep.explicit_name_in_toml.filter(|alias| !alias.is_empty()) {
            Some(alias) => DependencyName::Renamed {
                alias,
                package: dep.name,
            },
            None => DependencyName::Direct(dep.name),
        };

        Dependency {
            name,
            req: dep.version_req,
            features: dep.features,
            optional: dep.optional,
            default_features: dep.default_features,
            target: dep.target,
            kind: dep.kind,
            registry: dep.registry,
        }
    }
}

fn read_length<R: Read>(reader: &mut R, section: &str) -> RegistryResult<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).map_err(|e| {
        warn!(section = section, error = %e, "Cargo publish payload truncated");
        truncated(section, e)
    })?;
    Ok(u32::from_le_bytes(buf))
}

fn truncated(section: &str, error: io::Error) -> RegistryError {
    if error.kind() == io::ErrorKind::UnexpectedEof {
        RegistryError::UploadError(format!("Payload truncated while reading {section}"))
    } else {
        RegistryError::Io(error)
    }
}

/// Parse the framing and metadata of a crate upload.
///
/// Validates the crate name and version, normalizes link URLs and maps the
/// dependency list into index form. The returned descriptor's `content`
/// yields at most `content_size` bytes and has not been read.
pub fn parse_crate_upload<R: Read>(
    mut reader: R,
    limits: &LimitsConfig,
) -> RegistryResult<PackageDescriptor<Take<R>>> {
    let metadata_len = read_length(&mut reader, "metadata length")? as usize;
    if metadata_len > limits.max_metadata_size {
        warn!(metadata_len = metadata_len, "Cargo metadata section too large");
        return Err(RegistryError::UploadError(format!(
            "Metadata section too large: {} bytes (max: {} bytes)",
            metadata_len, limits.max_metadata_size
        )));
    }

    let mut metadata_bytes = vec![0u8; metadata_len];
    reader
        .read_exact(&mut metadata_bytes)
        .map_err(|e| truncated("metadata", e))?;

    let manifest: PublishManifest = serde_json::from_slice(&metadata_bytes).map_err(|e| {
        warn!(error = %e, "Failed to parse Cargo metadata JSON");
        RegistryError::BadRequest(format!("Invalid metadata JSON: {e}"))
    })?;

    validation::validate_crate_name(&manifest.name).map_err(|e| {
        warn!(crate_name = %manifest.name, error = %e, "Invalid crate name in upload");
        RegistryError::InvalidName(manifest.name.clone())
    })?;
    validation::validate_version(&manifest.vers).map_err(|e| {
        warn!(version = %manifest.vers, error = %e, "Invalid version in upload");
        RegistryError::InvalidVersion(manifest.vers.clone())
    })?;

    let content_size = u64::from(read_length(&mut reader, "crate length")?);
    validation::validate_size(content_size, limits.max_crate_size).map_err(|e| {
        warn!(crate_size = content_size, "Cargo crate section too large");
        RegistryError::UploadError(format!("Crate file too large: {e}"))
    })?;

    debug!(
        crate_name = %manifest.name,
        version = %manifest.vers,
        crate_size = content_size,
        "Parsed crate upload headers"
    );

    let metadata = Metadata {
        dependencies: manifest.deps.into_iter().map(Dependency::from).collect(),
        features: manifest.features,
        authors: manifest.authors,
        description: manifest.description.unwrap_or_default(),
        documentation_url: normalize_url(manifest.documentation),
        project_url: normalize_url(manifest.homepage),
        readme: manifest.readme.unwrap_or_default(),
        keywords: manifest.keywords,
        categories: manifest.categories,
        license: manifest.license.unwrap_or_default(),
        repository_url: normalize_url(manifest.repository),
        links: manifest.links.unwrap_or_default(),
    };

    Ok(PackageDescriptor {
        name: manifest.name,
        version: manifest.vers,
        metadata,
        content: reader.take(content_size),
        content_size,
    })
}
