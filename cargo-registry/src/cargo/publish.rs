//! Crate publishing
//!
//! Storing a version and updating the index are two systems without a shared
//! transaction. The version is stored first; if the index update fails the
//! version is deleted again so storage never advertises a crate the index
//! does not list.

use super::{parse_crate_upload, PackageDescriptor, PROPERTY_YANKED};
use crate::git::RepositoryHost;
use crate::hash_utils::HashingReader;
use crate::registry::CargoRegistry;
use crate::store::{NewPackageVersion, PackageStore, VersionDescriptor};
use crate::types::{Owner, User};
use crate::validation::MEMORY_THRESHOLD;
use crate::{RegistryError, RegistryResult};
use std::collections::BTreeMap;
use std::io::{self, Read, Seek, SeekFrom};
use tempfile::SpooledTempFile;
use tracing::{error, info, warn};

impl<S, H> CargoRegistry<S, H>
where
    S: PackageStore,
    H: RepositoryHost,
{
    /// Publish a crate from a `cargo publish` request body.
    pub fn upload_package<R: Read>(
        &self,
        doer: &User,
        owner: &Owner,
        reader: R,
    ) -> RegistryResult<VersionDescriptor> {
        let PackageDescriptor {
            name,
            version,
            metadata,
            content,
            content_size,
        } = parse_crate_upload(reader, &self.limits)?;

        // Small crates stay in memory, large ones spill to disk.
        let mut buffer = SpooledTempFile::new(MEMORY_THRESHOLD);
        let mut hashing = HashingReader::new(content);
        io::copy(&mut hashing, &mut buffer)?;
        let (content, digest) = hashing.finish();

        if digest.size != content_size {
            warn!(crate_name = %name, declared = content_size, received = digest.size, "Crate content shorter than declared");
            return Err(RegistryError::UploadError(format!(
                "Crate content is {} bytes, expected {}",
                digest.size, content_size
            )));
        }

        let mut rest = content.into_inner();
        if rest.read(&mut [0u8; 1])? != 0 {
            warn!(crate_name = %name, "Unexpected data after crate content");
            return Err(RegistryError::UploadError(
                "Unexpected data after crate content".to_string(),
            ));
        }

        buffer.seek(SeekFrom::Start(0))?;

        let mut properties = BTreeMap::new();
        properties.insert(PROPERTY_YANKED.to_string(), false.to_string());

        let created = self.store.create_package_version(NewPackageVersion {
            owner: &owner.name,
            name: &name,
            version: &version,
            metadata: &metadata,
            properties,
            file_name: format!("{}-{}.crate", name.to_lowercase(), version.to_lowercase()),
            sha256: digest.sha256,
            size: digest.size,
            content: &mut buffer,
        })?;

        if let Err(err) = self
            .index
            .upsert_package_index(doer, owner, created.package.id)
        {
            error!(
                owner = %owner.name,
                crate_name = %name,
                version = %version,
                error = %err,
                "Index update failed, removing published version"
            );
            if let Err(cleanup) = self.store.delete_version(created.version.id) {
                error!(
                    owner = %owner.name,
                    crate_name = %name,
                    version = %version,
                    error = %cleanup,
                    "Failed to remove version after index update failure"
                );
            }
            return Err(err);
        }

        info!(
            owner = %owner.name,
            crate_name = %name,
            version = %version,
            size = created.files.first().map_or(0, |file| file.size),
            "Published crate"
        );
        Ok(created)
    }
}
