//! Bare repositories on the local filesystem, driven through `git2`.
//!
//! Layout: `<root>/<owner>/<name>.git`, both path components lower-cased.
//! Staging happens in a temporary bare repository with an in-memory index;
//! it fetches the branch from the hosted repository and pushes the new
//! commit back like any other remote.

use super::{BranchTip, GitError, RepositoryHandle, RepositoryHost, StagingTree};
use crate::types::User;
use git2::{
    ErrorCode, Index, IndexEntry, IndexTime, Oid, PushOptions, RemoteCallbacks, Repository,
    RepositoryInitOptions, Signature,
};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Git config key recording repository privacy.
const PRIVATE_CONFIG_KEY: &str = "cargo-registry.private";

const REMOTE_NAME: &str = "origin";

const FILE_MODE: u32 = 0o100644;

#[derive(Debug, Clone)]
pub struct LocalRepositoryHost {
    root: PathBuf,
    staging_dir: Option<PathBuf>,
}

impl LocalRepositoryHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staging_dir: None,
        }
    }

    /// Create staging repositories under `dir` instead of the system
    /// temporary directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    /// Location of a hosted repository. Fails with [`GitError::InvalidPath`]
    /// unless both names are single plain path components.
    pub fn repository_path(&self, owner: &str, name: &str) -> Result<PathBuf, GitError> {
        let owner = path_component(owner)?;
        let name = path_component(name)?;
        Ok(self.root.join(owner).join(format!("{name}.git")))
    }

    fn handle(owner: &str, name: &str, path: &Path, repo: &Repository) -> Result<RepositoryHandle, GitError> {
        let head = repo.find_reference("HEAD")?;
        let default_branch = head
            .symbolic_target()
            .and_then(|target| target.strip_prefix("refs/heads/"))
            .ok_or_else(|| GitError::InvalidPath(format!("{}: HEAD is detached", path.display())))?
            .to_string();

        let is_private = match repo.config()?.get_bool(PRIVATE_CONFIG_KEY) {
            Ok(private) => private,
            Err(e) if e.code() == ErrorCode::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        Ok(RepositoryHandle {
            owner: owner.to_string(),
            name: name.to_string(),
            path: fs::canonicalize(path)?,
            default_branch,
            is_empty: has_no_branches(repo)?,
            is_private,
        })
    }
}

fn path_component(name: &str) -> Result<String, GitError> {
    let lower = name.to_lowercase();
    let mut components = Path::new(&lower).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) if !lower.contains(['/', '\\', '\0']) => Ok(lower),
        _ => Err(GitError::InvalidPath(format!("'{name}' is not a plain name"))),
    }
}

// `Repository::is_empty` only recognises an unborn `master` or
// `init.defaultBranch`, so look for branches directly.
fn has_no_branches(repo: &Repository) -> Result<bool, GitError> {
    Ok(repo.references_glob("refs/heads/*")?.next().is_none())
}

impl RepositoryHost for LocalRepositoryHost {
    type Staging = LocalStaging;

    fn find_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RepositoryHandle>, GitError> {
        let path = self.repository_path(owner, name)?;
        if !path.exists() {
            return Ok(None);
        }

        let repo = Repository::open_bare(&path)?;
        Self::handle(owner, name, &path, &repo).map(Some)
    }

    fn create_repository(
        &self,
        owner: &str,
        name: &str,
        default_branch: &str,
        private: bool,
    ) -> Result<RepositoryHandle, GitError> {
        let path = self.repository_path(owner, name)?;
        if path.exists() {
            return Err(GitError::RepositoryExists(format!("{owner}/{name}")));
        }

        let mut opts = RepositoryInitOptions::new();
        opts.bare(true)
            .mkpath(true)
            .no_reinit(true)
            .initial_head(default_branch);
        let repo = Repository::init_opts(&path, &opts).map_err(|e| {
            if e.code() == ErrorCode::Exists {
                GitError::RepositoryExists(format!("{owner}/{name}"))
            } else {
                GitError::Git2(e)
            }
        })?;
        repo.config()?.set_bool(PRIVATE_CONFIG_KEY, private)?;

        debug!(owner = %owner, repository = %name, path = %path.display(), "Created bare repository");
        Self::handle(owner, name, &path, &repo)
    }

    fn open_staging(&self, repository: &RepositoryHandle) -> Result<LocalStaging, GitError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("cargo-index-");
        let dir = match &self.staging_dir {
            Some(parent) => {
                fs::create_dir_all(parent)?;
                builder.tempdir_in(parent)?
            }
            None => builder.tempdir()?,
        };

        let url = repository
            .path
            .to_str()
            .ok_or_else(|| GitError::InvalidPath(repository.path.display().to_string()))?;

        let repo = Repository::init_bare(dir.path())?;
        repo.remote(REMOTE_NAME, url)?;

        Ok(LocalStaging {
            repo,
            index: Index::new()?,
            _dir: dir,
        })
    }
}

/// Staging area backed by a temporary bare repository.
pub struct LocalStaging {
    repo: Repository,
    index: Index,
    // Dropped last so the repository is closed before its directory goes.
    _dir: TempDir,
}

impl LocalStaging {
    fn entry(path: &str, id: Oid, size: usize) -> IndexEntry {
        IndexEntry {
            ctime: IndexTime::new(0, 0),
            mtime: IndexTime::new(0, 0),
            dev: 0,
            ino: 0,
            mode: FILE_MODE,
            uid: 0,
            gid: 0,
            file_size: u32::try_from(size).unwrap_or(u32::MAX),
            id,
            flags: 0,
            flags_extended: 0,
            path: path.as_bytes().to_vec(),
        }
    }
}

impl StagingTree for LocalStaging {
    fn checkout(&mut self, branch: &str) -> Result<BranchTip, GitError> {
        let mut remote = self.repo.find_remote(REMOTE_NAME)?;
        let refspec = format!("+refs/heads/*:refs/remotes/{REMOTE_NAME}/*");
        remote.fetch(&[refspec.as_str()], None, None)?;

        let tracking = format!("refs/remotes/{REMOTE_NAME}/{branch}");
        let reference = match self.repo.find_reference(&tracking) {
            Ok(reference) => reference,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(GitError::BranchNotFound(branch.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let commit = reference.peel_to_commit()?;
        let tree = commit.tree()?;
        self.index.read_tree(&tree)?;

        Ok(BranchTip {
            commit: commit.id(),
            tree: tree.id(),
        })
    }

    fn init_empty(&mut self) -> Result<(), GitError> {
        self.index.clear()?;
        Ok(())
    }

    fn list_files(&self) -> Result<Vec<String>, GitError> {
        Ok(self
            .index
            .iter()
            .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
            .collect())
    }

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        match self.index.get_path(Path::new(path), 0) {
            Some(entry) => Ok(Some(self.repo.find_blob(entry.id)?.content().to_vec())),
            None => Ok(None),
        }
    }

    fn remove_files(&mut self, paths: &[String]) -> Result<(), GitError> {
        for path in paths {
            let path = Path::new(path);
            if self.index.get_path(path, 0).is_some() {
                self.index.remove_path(path)?;
            }
        }
        Ok(())
    }

    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), GitError> {
        let id = self.repo.blob(content)?;
        self.index.add(&Self::entry(path, id, content.len()))?;
        Ok(())
    }

    fn write_tree(&mut self) -> Result<Oid, GitError> {
        Ok(self.index.write_tree_to(&self.repo)?)
    }

    fn commit(
        &mut self,
        parent: Option<Oid>,
        tree: Oid,
        author: &User,
        message: &str,
    ) -> Result<Oid, GitError> {
        let signature = Signature::now(&author.name, &author.email)?;
        let tree = self.repo.find_tree(tree)?;
        let parents = parent
            .map(|id| self.repo.find_commit(id))
            .transpose()?;
        let parents: Vec<_> = parents.iter().collect();

        Ok(self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parents)?)
    }

    fn push(&mut self, commit: Oid, branch: &str) -> Result<(), GitError> {
        let refname = format!("refs/heads/{branch}");
        self.repo
            .reference(&refname, commit, true, "stage index update")?;

        let mut rejection = None;
        {
            let mut callbacks = RemoteCallbacks::new();
            callbacks.push_update_reference(|reference, status| {
                if let Some(status) = status {
                    rejection = Some(format!("{reference}: {status}"));
                }
                Ok(())
            });

            let mut opts = PushOptions::new();
            opts.remote_callbacks(callbacks);

            let mut remote = self.repo.find_remote(REMOTE_NAME)?;
            let refspec = format!("{refname}:{refname}");
            if let Err(e) = remote.push(&[refspec.as_str()], Some(&mut opts)) {
                if e.code() == ErrorCode::NotFastForward {
                    return Err(GitError::PushRejected {
                        branch: branch.to_string(),
                        reason: e.message().to_string(),
                    });
                }
                return Err(e.into());
            }
        }

        match rejection {
            Some(reason) => Err(GitError::PushRejected {
                branch: branch.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}
