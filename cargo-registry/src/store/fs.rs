//! JSON document store on the local filesystem.
//!
//! ```text
//! <root>/packages.json      packages, versions, properties, file records
//! <root>/packages.lock      advisory lock serializing writers across processes
//! <root>/blobs/<sha256>     crate files, content addressed
//! ```
//!
//! Updates are read-modify-write under an exclusive lock and replace the
//! document atomically through a temporary file.

use super::{
    NewPackageVersion, Package, PackageFile, PackageId, PackageStore, PackageVersion,
    VersionDescriptor, VersionId,
};
use crate::cargo::Metadata;
use crate::{RegistryError, RegistryResult};
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const DOCUMENT_FILE: &str = "packages.json";
const LOCK_FILE: &str = "packages.lock";
const BLOB_DIR: &str = "blobs";

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    next_package_id: u64,
    next_version_id: u64,
    packages: Vec<StoredPackage>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPackage {
    id: PackageId,
    owner: String,
    name: String,
    lower_name: String,
    versions: Vec<StoredVersion>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredVersion {
    id: VersionId,
    version: String,
    lower_version: String,
    metadata: Metadata,
    created_at: DateTime<Utc>,
    #[serde(default)]
    properties: BTreeMap<String, String>,
    files: Vec<PackageFile>,
}

impl StoredPackage {
    fn to_package(&self) -> Package {
        Package {
            id: self.id,
            owner: self.owner.clone(),
            name: self.name.clone(),
            lower_name: self.lower_name.clone(),
        }
    }

    fn owned_by(&self, owner: &str) -> bool {
        self.owner.eq_ignore_ascii_case(owner)
    }
}

impl StoredVersion {
    fn to_version(&self, package_id: PackageId) -> PackageVersion {
        PackageVersion {
            id: self.id,
            package_id,
            version: self.version.clone(),
            metadata: self.metadata.clone(),
            created_at: self.created_at,
            properties: self.properties.clone(),
        }
    }

    fn describe(&self, package: &StoredPackage) -> VersionDescriptor {
        VersionDescriptor {
            package: package.to_package(),
            version: self.to_version(package.id),
            files: self.files.clone(),
        }
    }
}

impl StoreDocument {
    fn package(&self, id: PackageId) -> Option<&StoredPackage> {
        self.packages.iter().find(|p| p.id == id)
    }

    fn version_mut(&mut self, id: VersionId) -> Option<&mut StoredVersion> {
        self.packages
            .iter_mut()
            .flat_map(|p| p.versions.iter_mut())
            .find(|v| v.id == id)
    }

    fn owner_usage(&self, owner: &str) -> u64 {
        self.packages
            .iter()
            .filter(|p| p.owned_by(owner))
            .flat_map(|p| &p.versions)
            .flat_map(|v| &v.files)
            .map(|f| f.size)
            .sum()
    }
}

/// Releases the advisory lock when dropped.
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.0) {
            warn!(error = %e, "Failed to release store lock");
        }
    }
}

pub struct FsPackageStore {
    root: PathBuf,
    max_owner_storage: Option<u64>,
    state: Mutex<()>,
}

impl FsPackageStore {
    pub fn open(root: impl Into<PathBuf>) -> RegistryResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(BLOB_DIR))?;
        Ok(Self {
            root,
            max_owner_storage: None,
            state: Mutex::new(()),
        })
    }

    /// Cap the total crate bytes stored per owner.
    pub fn with_owner_quota(mut self, max_bytes: Option<u64>) -> Self {
        self.max_owner_storage = max_bytes;
        self
    }

    /// Location of a stored crate file.
    pub fn blob_path(&self, sha256: &str) -> PathBuf {
        self.root.join(BLOB_DIR).join(sha256)
    }

    fn lock(&self, exclusive: bool) -> RegistryResult<LockGuard> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.root.join(LOCK_FILE))?;
        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(LockGuard(file))
    }

    fn load(&self) -> RegistryResult<StoreDocument> {
        match fs::read(self.root.join(DOCUMENT_FILE)) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(StoreDocument::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, document: &StoreDocument) -> RegistryResult<()> {
        let mut temp = NamedTempFile::new_in(&self.root)?;
        serde_json::to_writer_pretty(&mut temp, document)?;
        temp.flush()?;
        temp.persist(self.root.join(DOCUMENT_FILE))
            .map_err(|e| RegistryError::Io(e.error))?;
        Ok(())
    }

    fn read<T>(&self, f: impl FnOnce(&StoreDocument) -> T) -> RegistryResult<T> {
        let _state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = self.lock(false)?;
        let document = self.load()?;
        Ok(f(&document))
    }

    fn update<T>(
        &self,
        f: impl FnOnce(&mut StoreDocument) -> RegistryResult<T>,
    ) -> RegistryResult<T> {
        let _state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let _lock = self.lock(true)?;
        let mut document = self.load()?;
        let result = f(&mut document)?;
        self.save(&document)?;
        Ok(result)
    }

    fn write_blob(&self, sha256: &str, content: &mut dyn io::Read) -> RegistryResult<()> {
        let path = self.blob_path(sha256);
        if path.exists() {
            // Same digest, same bytes; drain the reader all the same.
            io::copy(content, &mut io::sink())?;
            return Ok(());
        }

        let mut temp = NamedTempFile::new_in(self.root.join(BLOB_DIR))?;
        io::copy(content, &mut temp)?;
        temp.flush()?;
        persist_blob(temp, &path)
    }
}

fn persist_blob(temp: NamedTempFile, path: &Path) -> RegistryResult<()> {
    temp.persist(path).map_err(|e| RegistryError::Io(e.error))?;
    Ok(())
}

impl PackageStore for FsPackageStore {
    fn find_package(&self, owner: &str, name: &str) -> RegistryResult<Option<Package>> {
        let lower_name = name.to_lowercase();
        self.read(|doc| {
            doc.packages
                .iter()
                .find(|p| p.owned_by(owner) && p.lower_name == lower_name)
                .map(StoredPackage::to_package)
        })
    }

    fn package_by_id(&self, id: PackageId) -> RegistryResult<Option<Package>> {
        self.read(|doc| doc.package(id).map(StoredPackage::to_package))
    }

    fn list_packages(&self, owner: &str) -> RegistryResult<Vec<Package>> {
        self.read(|doc| {
            let mut packages: Vec<Package> = doc
                .packages
                .iter()
                .filter(|p| p.owned_by(owner))
                .map(StoredPackage::to_package)
                .collect();
            packages.sort_by(|a, b| a.lower_name.cmp(&b.lower_name));
            packages
        })
    }

    fn find_version(
        &self,
        package_id: PackageId,
        version: &str,
    ) -> RegistryResult<Option<PackageVersion>> {
        let lower_version = version.to_lowercase();
        self.read(|doc| {
            doc.package(package_id).and_then(|p| {
                p.versions
                    .iter()
                    .find(|v| v.lower_version == lower_version)
                    .map(|v| v.to_version(p.id))
            })
        })
    }

    fn version_descriptors(&self, package_id: PackageId) -> RegistryResult<Vec<VersionDescriptor>> {
        self.read(|doc| {
            doc.package(package_id)
                .map(|p| p.versions.iter().map(|v| v.describe(p)).collect())
                .unwrap_or_default()
        })
    }

    fn create_package_version(&self, new: NewPackageVersion<'_>) -> RegistryResult<VersionDescriptor> {
        let lower_name = new.name.to_lowercase();
        let lower_version = new.version.to_lowercase();

        self.update(|doc| {
            let existing = doc
                .packages
                .iter()
                .position(|p| p.owned_by(new.owner) && p.lower_name == lower_name);

            if let Some(index) = existing {
                if doc.packages[index]
                    .versions
                    .iter()
                    .any(|v| v.lower_version == lower_version)
                {
                    return Err(RegistryError::Conflict(format!(
                        "{} {} already exists",
                        new.name, new.version
                    )));
                }
            }

            if let Some(max) = self.max_owner_storage {
                let used = doc.owner_usage(new.owner);
                if used.saturating_add(new.size) > max {
                    warn!(owner = %new.owner, used = used, size = new.size, max = max, "Owner storage quota exceeded");
                    return Err(RegistryError::QuotaExceeded(format!(
                        "storing {} bytes would exceed the {} byte limit of '{}'",
                        new.size, max, new.owner
                    )));
                }
            }

            self.write_blob(&new.sha256, new.content)?;

            let index = match existing {
                Some(index) => index,
                None => {
                    doc.next_package_id += 1;
                    doc.packages.push(StoredPackage {
                        id: doc.next_package_id,
                        owner: new.owner.to_string(),
                        name: new.name.to_string(),
                        lower_name: lower_name.clone(),
                        versions: Vec::new(),
                    });
                    info!(owner = %new.owner, package = %new.name, "Created package");
                    doc.packages.len() - 1
                }
            };

            doc.next_version_id += 1;
            let version = StoredVersion {
                id: doc.next_version_id,
                version: new.version.to_string(),
                lower_version: lower_version.clone(),
                metadata: new.metadata.clone(),
                created_at: Utc::now(),
                properties: new.properties,
                files: vec![PackageFile {
                    name: new.file_name,
                    sha256: new.sha256,
                    size: new.size,
                }],
            };

            let package = &mut doc.packages[index];
            let descriptor = version.describe(package);
            package.versions.push(version);

            debug!(package = %package.name, version = %descriptor.version.version, "Stored package version");
            Ok(descriptor)
        })
    }

    fn version_property(&self, version_id: VersionId, name: &str) -> RegistryResult<Option<String>> {
        self.read(|doc| {
            doc.packages
                .iter()
                .flat_map(|p| &p.versions)
                .find(|v| v.id == version_id)
                .and_then(|v| v.properties.get(name).cloned())
        })
    }

    fn set_version_property(&self, version_id: VersionId, name: &str, value: &str) -> RegistryResult<()> {
        self.update(|doc| {
            let version = doc
                .version_mut(version_id)
                .ok_or_else(|| RegistryError::NotFound(format!("version {version_id} not found")))?;
            version.properties.insert(name.to_string(), value.to_string());
            Ok(())
        })
    }

    fn delete_version(&self, version_id: VersionId) -> RegistryResult<()> {
        self.update(|doc| {
            let package_index = doc
                .packages
                .iter()
                .position(|p| p.versions.iter().any(|v| v.id == version_id))
                .ok_or_else(|| RegistryError::NotFound(format!("version {version_id} not found")))?;

            let package = &mut doc.packages[package_index];
            package.versions.retain(|v| v.id != version_id);
            debug!(package = %package.name, version_id = version_id, remaining = package.versions.len(), "Deleted package version");
            Ok(())
        })
    }
}
