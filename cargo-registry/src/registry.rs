//! Registry facade wiring storage, the index repository and upload limits.

use crate::config::{Config, LimitsConfig};
use crate::git::{LocalRepositoryHost, RepositoryHost};
use crate::index_repo::{IndexSettings, RegistryIndexRepository};
use crate::store::{FsPackageStore, PackageStore};
use crate::RegistryResult;
use std::sync::Arc;

pub struct CargoRegistry<S, H> {
    pub(crate) store: Arc<S>,
    pub(crate) index: RegistryIndexRepository<S, H>,
    pub(crate) limits: LimitsConfig,
}

/// Registry backed by [`FsPackageStore`] and [`LocalRepositoryHost`].
pub type LocalCargoRegistry = CargoRegistry<FsPackageStore, LocalRepositoryHost>;

impl<S, H> CargoRegistry<S, H>
where
    S: PackageStore,
    H: RepositoryHost,
{
    pub fn new(store: Arc<S>, host: H, settings: IndexSettings, limits: LimitsConfig) -> Self {
        let index = RegistryIndexRepository::new(Arc::clone(&store), host, settings);
        Self {
            store,
            index,
            limits,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn index(&self) -> &RegistryIndexRepository<S, H> {
        &self.index
    }
}

impl LocalCargoRegistry {
    /// Open the on-disk registry described by `config`.
    pub fn open(config: &Config) -> RegistryResult<Self> {
        let store = FsPackageStore::open(&config.storage.data_dir)?
            .with_owner_quota(config.limits.max_owner_storage);

        let mut host = LocalRepositoryHost::new(config.repositories_path());
        if let Some(staging_dir) = &config.storage.staging_dir {
            host = host.with_staging_dir(staging_dir);
        }

        Ok(Self::new(
            Arc::new(store),
            host,
            IndexSettings::from_config(config),
            config.limits.clone(),
        ))
    }
}
