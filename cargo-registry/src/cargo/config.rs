//! `config.json` of the index repository
//!
//! Tells `cargo` where to download crates and where the web API lives, and
//! whether requests need credentials.

use super::CONFIG_FILE_NAME;
use crate::git::{RepositoryHandle, RepositoryHost, StagingTree};
use crate::index_repo::RegistryIndexRepository;
use crate::store::PackageStore;
use crate::types::{Owner, User};
use crate::RegistryResult;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub dl: String,
    pub api: String,
    #[serde(rename = "auth-required")]
    pub auth_required: bool,
}

/// `app_url` is expected to end with a slash.
pub fn build_config(app_url: &str, owner_name: &str, auth_required: bool) -> IndexConfig {
    let api = format!("{app_url}api/packages/{owner_name}/cargo");
    IndexConfig {
        dl: format!("{api}/api/v1/crates"),
        api,
        auth_required,
    }
}

/// Credentials are needed unless the instance, the owner and the index
/// repository are all publicly readable.
pub fn auth_required(require_sign_in_view: bool, owner: &Owner, repository_private: bool) -> bool {
    require_sign_in_view || !owner.visibility.is_public() || repository_private
}

pub fn encode_config(config: &IndexConfig) -> RegistryResult<Vec<u8>> {
    let mut content = serde_json::to_vec(config)?;
    content.push(b'\n');
    Ok(content)
}

impl<S, H> RegistryIndexRepository<S, H>
where
    S: PackageStore,
    H: RepositoryHost,
{
    /// Rewrite `config.json`. Does nothing when the owner has no index
    /// repository.
    pub fn write_config(&self, doer: &User, owner: &Owner) -> RegistryResult<()> {
        self.locks().with_lock(&owner.name, || {
            match self.find_repository(owner)? {
                Some(repository) => self.write_config_locked(doer, owner, &repository),
                None => {
                    debug!(owner = %owner.name, "No cargo index repository, skipping config update");
                    Ok(())
                }
            }
        })
    }

    pub(crate) fn write_config_locked(
        &self,
        doer: &User,
        owner: &Owner,
        repository: &RepositoryHandle,
    ) -> RegistryResult<()> {
        let content = self.config_content(owner, repository)?;

        self.alter_repository_content(doer, repository, "Initialize Cargo Config", |staging| {
            staging.write_file(CONFIG_FILE_NAME, &content)
        })
    }

    /// Encoded `config.json` for the owner's index repository.
    pub(crate) fn config_content(
        &self,
        owner: &Owner,
        repository: &RepositoryHandle,
    ) -> RegistryResult<Vec<u8>> {
        let settings = self.settings();
        let config = build_config(
            &settings.app_url,
            &owner.name,
            auth_required(settings.require_sign_in_view, owner, repository.is_private),
        );
        encode_config(&config)
    }
}
