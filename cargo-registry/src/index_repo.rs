//! # Registry Index Repository
//!
//! Each owner has one backing git repository, `_cargo-index`, that `cargo`
//! reads the index from. Every change is a single commit built in a staging
//! tree and pushed to the default branch:
//!
//! 1. open a staging tree and check out the default branch, or start from an
//!    empty tree when the repository has no commits yet
//! 2. apply the mutation
//! 3. write the tree; an unchanged tree ends the operation
//! 4. commit as the acting user and push
//!
//! A failure at any step leaves the branch where it was. Mutations of the
//! same owner are serialized in-process; across processes the push refuses
//! non-fast-forward updates.

use crate::cargo::{encode_entries, entry_for, index_path, parse_entries, IndexVersionEntry};
use crate::cargo::{CONFIG_FILE_NAME, INDEX_REPOSITORY_NAME};
use crate::config::Config;
use crate::git::{GitError, RepositoryHandle, RepositoryHost, StagingTree};
use crate::locks::OwnerLocks;
use crate::store::{Package, PackageId, PackageStore};
use crate::types::{Owner, User};
use crate::{RegistryError, RegistryResult};
use std::sync::Arc;
use tracing::{debug, info};

/// Settings the index repository is maintained with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSettings {
    /// Base URL with a trailing slash
    pub app_url: String,
    pub default_branch: String,
    /// Privacy of newly created index repositories
    pub private: bool,
    pub require_sign_in_view: bool,
}

impl IndexSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            app_url: config.normalized_app_url(),
            default_branch: config.index.default_branch.clone(),
            private: config.index.private,
            require_sign_in_view: config.security.require_sign_in_view,
        }
    }
}

pub struct RegistryIndexRepository<S, H> {
    store: Arc<S>,
    host: H,
    settings: IndexSettings,
    locks: OwnerLocks,
}

impl<S, H> RegistryIndexRepository<S, H>
where
    S: PackageStore,
    H: RepositoryHost,
{
    pub fn new(store: Arc<S>, host: H, settings: IndexSettings) -> Self {
        Self {
            store,
            host,
            settings,
            locks: OwnerLocks::new(),
        }
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub(crate) fn locks(&self) -> &OwnerLocks {
        &self.locks
    }

    pub fn find_repository(&self, owner: &Owner) -> RegistryResult<Option<RepositoryHandle>> {
        Ok(self.host.find_repository(&owner.name, INDEX_REPOSITORY_NAME)?)
    }

    /// Locate or create the owner's index repository and (re)write its
    /// `config.json`.
    pub fn ensure_initialized(&self, doer: &User, owner: &Owner) -> RegistryResult<RepositoryHandle> {
        self.locks
            .with_lock(&owner.name, || self.ensure_initialized_locked(doer, owner))
    }

    fn ensure_initialized_locked(&self, doer: &User, owner: &Owner) -> RegistryResult<RepositoryHandle> {
        let repository = self.get_or_create_repository(owner)?;
        self.write_config_locked(doer, owner, &repository)?;
        Ok(repository)
    }

    fn get_or_create_repository(&self, owner: &Owner) -> RegistryResult<RepositoryHandle> {
        if let Some(repository) = self.find_repository(owner)? {
            return Ok(repository);
        }

        match self.host.create_repository(
            &owner.name,
            INDEX_REPOSITORY_NAME,
            &self.settings.default_branch,
            self.settings.private,
        ) {
            Ok(repository) => {
                info!(owner = %owner.name, path = %repository.path.display(), "Created cargo index repository");
                Ok(repository)
            }
            Err(GitError::RepositoryExists(_)) => self.find_repository(owner)?.ok_or_else(|| {
                RegistryError::Internal(format!(
                    "index repository of '{}' exists but cannot be opened",
                    owner.name
                ))
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Regenerate the whole index from storage in one commit.
    ///
    /// Every file except `config.json` is dropped and the index file of each
    /// package with at least one version is written again.
    pub fn rebuild_full_index(&self, doer: &User, owner: &Owner) -> RegistryResult<()> {
        self.locks.with_lock(&owner.name, || {
            let repository = self.ensure_initialized_locked(doer, owner)?;

            let mut files = Vec::new();
            for package in self.store.list_packages(&owner.name)? {
                if let Some(content) = self.package_index_content(&package)? {
                    files.push((index_path(&package.name)?, content));
                }
            }
            info!(owner = %owner.name, files = files.len(), "Rebuilding cargo index");

            self.alter_repository_content(doer, &repository, "Rebuild Cargo Index", |staging| {
                let stale: Vec<String> = staging
                    .list_files()?
                    .into_iter()
                    .filter(|path| path != CONFIG_FILE_NAME)
                    .collect();
                staging.remove_files(&stale)?;

                for (path, content) in &files {
                    staging.write_file(path, content)?;
                }
                Ok(())
            })
        })
    }

    /// Rewrite the index file of one package, or remove it when the package
    /// has no versions left. Does nothing when the owner has no index
    /// repository yet. A repository missing its `config.json` gets one in
    /// the same commit.
    pub fn upsert_package_index(
        &self,
        doer: &User,
        owner: &Owner,
        package_id: PackageId,
    ) -> RegistryResult<()> {
        self.locks.with_lock(&owner.name, || {
            let Some(repository) = self.find_repository(owner)? else {
                debug!(owner = %owner.name, package_id = package_id, "No cargo index repository, skipping index update");
                return Ok(());
            };

            let package = self.store.package_by_id(package_id)?.ok_or_else(|| {
                RegistryError::NotFound(format!("package {package_id} not found"))
            })?;

            let path = index_path(&package.name)?;
            let content = self.package_index_content(&package)?;
            let message = format!("Update {}", package.name);
            let config = self.config_content(owner, &repository)?;

            self.alter_repository_content(doer, &repository, &message, |staging| {
                if staging.read_file(CONFIG_FILE_NAME)?.is_none() {
                    staging.write_file(CONFIG_FILE_NAME, &config)?;
                }
                match &content {
                    Some(content) => staging.write_file(&path, content),
                    None => staging.remove_files(std::slice::from_ref(&path)),
                }
            })
        })
    }

    /// Entries of a package's index file as clients currently see them.
    /// `None` when there is no repository, branch or file.
    pub fn read_package_index(
        &self,
        owner: &Owner,
        name: &str,
    ) -> RegistryResult<Option<Vec<IndexVersionEntry>>> {
        let path = index_path(name)?;
        let Some(repository) = self.find_repository(owner)? else {
            return Ok(None);
        };

        let mut staging = self.host.open_staging(&repository)?;
        match staging.checkout(&repository.default_branch) {
            Ok(_) => {}
            Err(GitError::BranchNotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        staging
            .read_file(&path)?
            .map(|content| parse_entries(&content))
            .transpose()
    }

    fn package_index_content(&self, package: &Package) -> RegistryResult<Option<Vec<u8>>> {
        let entries = self
            .store
            .version_descriptors(package.id)?
            .iter()
            .map(entry_for)
            .collect::<RegistryResult<Vec<_>>>()?;
        encode_entries(entries)
    }

    /// Apply `mutate` to the default branch as one commit by `doer`.
    ///
    /// Callers hold the owner lock.
    pub(crate) fn alter_repository_content<F>(
        &self,
        doer: &User,
        repository: &RepositoryHandle,
        message: &str,
        mutate: F,
    ) -> RegistryResult<()>
    where
        F: FnOnce(&mut H::Staging) -> Result<(), GitError>,
    {
        let branch = &repository.default_branch;
        let mut staging = self.host.open_staging(repository)?;

        let parent = match staging.checkout(branch) {
            Ok(tip) => Some(tip),
            Err(GitError::BranchNotFound(_)) if repository.is_empty => {
                staging.init_empty()?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        mutate(&mut staging)?;

        let tree = staging.write_tree()?;
        if parent.is_some_and(|tip| tip.tree == tree) {
            debug!(owner = %repository.owner, message = %message, "Index unchanged, nothing to commit");
            return Ok(());
        }

        let commit = staging.commit(parent.map(|tip| tip.commit), tree, doer, message)?;
        staging.push(commit, branch)?;

        info!(
            owner = %repository.owner,
            commit = %commit,
            message = %message,
            "Pushed cargo index update"
        );
        Ok(())
    }
}
