//! Git repository hosting seam.
//!
//! The index is maintained through two traits: [`RepositoryHost`] locates and
//! creates hosted repositories, and [`StagingTree`] is a throwaway working
//! area that checks out one branch, collects file changes and pushes a single
//! commit back.

use crate::types::User;
use git2::Oid;
use std::path::PathBuf;

pub mod local;

pub use local::{LocalRepositoryHost, LocalStaging};

#[derive(Debug, thiserror::Error)]
pub enum GitError {
    #[error("branch '{0}' does not exist")]
    BranchNotFound(String),

    #[error("push to '{branch}' was rejected: {reason}")]
    PushRejected { branch: String, reason: String },

    #[error("repository '{0}' already exists")]
    RepositoryExists(String),

    #[error("invalid repository path: {0}")]
    InvalidPath(String),

    #[error(transparent)]
    Git2(#[from] git2::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A hosted repository as seen at lookup time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    pub owner: String,
    pub name: String,
    pub path: PathBuf,
    pub default_branch: String,
    /// No commits yet
    pub is_empty: bool,
    pub is_private: bool,
}

/// Commit and tree at the head of a checked out branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchTip {
    pub commit: Oid,
    pub tree: Oid,
}

pub trait RepositoryHost {
    type Staging: StagingTree;

    fn find_repository(&self, owner: &str, name: &str)
        -> Result<Option<RepositoryHandle>, GitError>;

    /// Fails with [`GitError::RepositoryExists`] when the repository is
    /// already present.
    fn create_repository(
        &self,
        owner: &str,
        name: &str,
        default_branch: &str,
        private: bool,
    ) -> Result<RepositoryHandle, GitError>;

    fn open_staging(&self, repository: &RepositoryHandle) -> Result<Self::Staging, GitError>;
}

/// Scratch area for one mutation. Dropping it discards everything not
/// pushed.
pub trait StagingTree {
    /// Stage the tree of `branch`. Fails with [`GitError::BranchNotFound`]
    /// when the hosted repository has no such branch.
    fn checkout(&mut self, branch: &str) -> Result<BranchTip, GitError>;

    /// Start from an empty tree.
    fn init_empty(&mut self) -> Result<(), GitError>;

    fn list_files(&self) -> Result<Vec<String>, GitError>;

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, GitError>;

    /// Paths that are not staged are ignored.
    fn remove_files(&mut self, paths: &[String]) -> Result<(), GitError>;

    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), GitError>;

    fn write_tree(&mut self) -> Result<Oid, GitError>;

    fn commit(
        &mut self,
        parent: Option<Oid>,
        tree: Oid,
        author: &User,
        message: &str,
    ) -> Result<Oid, GitError>;

    /// Fast-forward `branch` on the hosted repository to `commit`.
    fn push(&mut self, commit: Oid, branch: &str) -> Result<(), GitError>;
}
