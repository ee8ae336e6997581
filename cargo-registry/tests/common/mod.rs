//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use cargo_registry::config::{Config, LimitsConfig};
use cargo_registry::git::{
    BranchTip, GitError, LocalRepositoryHost, LocalStaging, RepositoryHandle, RepositoryHost,
    StagingTree,
};
use cargo_registry::index_repo::IndexSettings;
use cargo_registry::store::FsPackageStore;
use cargo_registry::{CargoRegistry, LocalCargoRegistry, Owner, User};
use git2::{Oid, Repository};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

pub const APP_URL: &str = "https://git.example.com/";

pub struct TestSetup {
    pub temp_dir: TempDir,
    pub config: Config,
    pub registry: LocalCargoRegistry,
}

pub fn test_config(root: &Path) -> Config {
    let mut config = Config::default();
    config.server.app_url = APP_URL.to_string();
    config.storage.data_dir = root.join("data");
    config.storage.repositories_dir = Some(root.join("repos"));
    config.storage.staging_dir = Some(root.join("staging"));
    config
}

/// Point libgit2's system and global config lookups at an empty directory,
/// so results do not depend on the git configuration of the host.
pub fn isolate_git_config() {
    static EMPTY_CONFIG_DIR: OnceLock<TempDir> = OnceLock::new();
    EMPTY_CONFIG_DIR.get_or_init(|| {
        let dir = TempDir::new().unwrap();
        for level in [
            git2::ConfigLevel::ProgramData,
            git2::ConfigLevel::System,
            git2::ConfigLevel::XDG,
            git2::ConfigLevel::Global,
        ] {
            unsafe { git2::opts::set_search_path(level, dir.path()).unwrap() };
        }
        dir
    });
}

pub fn create_test_setup() -> TestSetup {
    isolate_git_config();
    let temp_dir = TempDir::new().unwrap();
    let config = test_config(temp_dir.path());
    let registry = LocalCargoRegistry::open(&config).unwrap();
    TestSetup {
        temp_dir,
        config,
        registry,
    }
}

pub fn doer() -> User {
    User::new("Index Bot", "bot@example.com")
}

pub fn owner() -> Owner {
    Owner::public("acme").unwrap()
}

/// Encode a `cargo publish` request body.
pub fn publish_payload(metadata: &Value, content: &[u8]) -> Vec<u8> {
    let metadata = serde_json::to_vec(metadata).unwrap();
    let mut body = Vec::new();
    body.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    body.extend_from_slice(&metadata);
    body.extend_from_slice(&(content.len() as u32).to_le_bytes());
    body.extend_from_slice(content);
    body
}

pub fn simple_payload(name: &str, version: &str, content: &[u8]) -> Vec<u8> {
    publish_payload(
        &json!({
            "name": name,
            "vers": version,
            "deps": [],
            "features": {},
            "authors": ["test@example.com"],
            "description": "Test crate",
            "license": "MIT"
        }),
        content,
    )
}

pub fn index_repository_path(setup: &TestSetup, owner: &str) -> PathBuf {
    setup
        .config
        .repositories_path()
        .join(owner)
        .join("_cargo-index.git")
}

pub fn head_commit(path: &Path) -> Option<Oid> {
    let repo = Repository::open_bare(path).ok()?;
    let reference = repo.find_reference("refs/heads/main").ok()?;
    reference.target()
}

pub fn commit_count(path: &Path) -> usize {
    let repo = Repository::open_bare(path).unwrap();
    let mut walk = repo.revwalk().unwrap();
    if walk.push_ref("refs/heads/main").is_err() {
        return 0;
    }
    walk.count()
}

pub fn head_message(path: &Path) -> String {
    let repo = Repository::open_bare(path).unwrap();
    let commit = repo
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_commit()
        .unwrap();
    commit.message().unwrap_or_default().to_string()
}

/// Files on the default branch, sorted.
pub fn tree_files(path: &Path) -> Vec<String> {
    let repo = Repository::open_bare(path).unwrap();
    let tree = repo
        .find_reference("refs/heads/main")
        .unwrap()
        .peel_to_tree()
        .unwrap();

    let mut files = Vec::new();
    tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
        if entry.kind() == Some(git2::ObjectType::Blob) {
            files.push(format!("{root}{}", entry.name().unwrap_or_default()));
        }
        git2::TreeWalkResult::Ok
    })
    .unwrap();
    files.sort();
    files
}

pub fn read_tree_file(path: &Path, file: &str) -> Option<String> {
    let repo = Repository::open_bare(path).unwrap();
    let tree = repo
        .find_reference("refs/heads/main")
        .ok()?
        .peel_to_tree()
        .unwrap();
    let entry = tree.get_path(Path::new(file)).ok()?;
    let blob = repo.find_blob(entry.id()).unwrap();
    Some(String::from_utf8(blob.content().to_vec()).unwrap())
}

/// Host whose pushes always fail, for exercising rollback paths.
pub struct RejectingHost {
    pub inner: LocalRepositoryHost,
}

pub struct RejectingStaging {
    inner: LocalStaging,
}

impl RepositoryHost for RejectingHost {
    type Staging = RejectingStaging;

    fn find_repository(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<RepositoryHandle>, GitError> {
        self.inner.find_repository(owner, name)
    }

    fn create_repository(
        &self,
        owner: &str,
        name: &str,
        default_branch: &str,
        private: bool,
    ) -> Result<RepositoryHandle, GitError> {
        self.inner
            .create_repository(owner, name, default_branch, private)
    }

    fn open_staging(&self, repository: &RepositoryHandle) -> Result<RejectingStaging, GitError> {
        Ok(RejectingStaging {
            inner: self.inner.open_staging(repository)?,
        })
    }
}

impl StagingTree for RejectingStaging {
    fn checkout(&mut self, branch: &str) -> Result<BranchTip, GitError> {
        self.inner.checkout(branch)
    }

    fn init_empty(&mut self) -> Result<(), GitError> {
        self.inner.init_empty()
    }

    fn list_files(&self) -> Result<Vec<String>, GitError> {
        self.inner.list_files()
    }

    fn read_file(&self, path: &str) -> Result<Option<Vec<u8>>, GitError> {
        self.inner.read_file(path)
    }

    fn remove_files(&mut self, paths: &[String]) -> Result<(), GitError> {
        self.inner.remove_files(paths)
    }

    fn write_file(&mut self, path: &str, content: &[u8]) -> Result<(), GitError> {
        self.inner.write_file(path, content)
    }

    fn write_tree(&mut self) -> Result<Oid, GitError> {
        self.inner.write_tree()
    }

    fn commit(
        &mut self,
        parent: Option<Oid>,
        tree: Oid,
        author: &User,
        message: &str,
    ) -> Result<Oid, GitError> {
        self.inner.commit(parent, tree, author, message)
    }

    fn push(&mut self, _commit: Oid, branch: &str) -> Result<(), GitError> {
        Err(GitError::PushRejected {
            branch: branch.to_string(),
            reason: "remote is read-only".to_string(),
        })
    }
}

/// Registry sharing `setup`'s storage and repositories but unable to push.
pub fn rejecting_registry(
    setup: &TestSetup,
) -> CargoRegistry<FsPackageStore, RejectingHost> {
    let store = FsPackageStore::open(&setup.config.storage.data_dir).unwrap();
    let host = RejectingHost {
        inner: LocalRepositoryHost::new(setup.config.repositories_path())
            .with_staging_dir(setup.temp_dir.path().join("staging")),
    };
    CargoRegistry::new(
        Arc::new(store),
        host,
        IndexSettings::from_config(&setup.config),
        LimitsConfig::default(),
    )
}
