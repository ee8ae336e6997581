//! Yanking and unyanking versions

use super::PROPERTY_YANKED;
use crate::git::RepositoryHost;
use crate::registry::CargoRegistry;
use crate::store::PackageStore;
use crate::types::{Owner, User};
use crate::{RegistryError, RegistryResult};
use tracing::info;

impl<S, H> CargoRegistry<S, H>
where
    S: PackageStore,
    H: RepositoryHost,
{
    /// Set the yanked flag of a version and regenerate its package's index
    /// file. The flag stays changed if the index update fails.
    pub fn set_yanked(
        &self,
        doer: &User,
        owner: &Owner,
        name: &str,
        version: &str,
        yanked: bool,
    ) -> RegistryResult<()> {
        let package = self
            .store
            .find_package(&owner.name, name)?
            .ok_or_else(|| RegistryError::NotFound(format!("crate '{name}' not found")))?;
        let package_version = self
            .store
            .find_version(package.id, version)?
            .ok_or_else(|| {
                RegistryError::NotFound(format!("version {version} of crate '{name}' not found"))
            })?;

        if self
            .store
            .version_property(package_version.id, PROPERTY_YANKED)?
            .is_none()
        {
            return Err(RegistryError::Internal(format!(
                "{name} {version} has no {PROPERTY_YANKED} property"
            )));
        }

        self.store
            .set_version_property(package_version.id, PROPERTY_YANKED, &yanked.to_string())?;
        info!(owner = %owner.name, crate_name = %name, version = %version, yanked = yanked, "Updated yanked flag");

        self.index.upsert_package_index(doer, owner, package.id)
    }

    pub fn yank(&self, doer: &User, owner: &Owner, name: &str, version: &str) -> RegistryResult<()> {
        self.set_yanked(doer, owner, name, version, true)
    }

    pub fn unyank(&self, doer: &User, owner: &Owner, name: &str, version: &str) -> RegistryResult<()> {
        self.set_yanked(doer, owner, name, version, false)
    }
}
