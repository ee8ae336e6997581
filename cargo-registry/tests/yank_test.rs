//! Yank and unyank through storage and the index.

mod common;

use cargo_registry::cargo::{parse_entries, Metadata, PROPERTY_YANKED};
use cargo_registry::store::{NewPackageVersion, PackageStore};
use cargo_registry::RegistryError;
use common::*;
use serde_json::Value;
use std::collections::BTreeMap;

fn index_lines(setup: &TestSetup, path: &str) -> Vec<Value> {
    read_tree_file(&index_repository_path(setup, "acme"), path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn published(versions: &[&str]) -> TestSetup {
    let setup = create_test_setup();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();
    for version in versions {
        let body = simple_payload("demo", version, version.as_bytes());
        setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();
    }
    setup
}

#[test]
fn test_yank_flips_only_yanked_field() {
    let setup = published(&["1.0.0", "2.0.0"]);
    let before = index_lines(&setup, "de/mo/demo");

    setup.registry.yank(&doer(), &owner(), "demo", "1.0.0").unwrap();
    let after = index_lines(&setup, "de/mo/demo");

    assert_eq!(after.len(), 2);
    assert_eq!(after[0]["yanked"], true);
    assert_eq!(after[1], before[1]);

    let mut expected = before[0].clone();
    expected["yanked"] = Value::Bool(true);
    assert_eq!(after[0], expected);

    assert_eq!(
        head_message(&index_repository_path(&setup, "acme")),
        "Update demo"
    );
}

#[test]
fn test_unyank_restores_entry() {
    let setup = published(&["1.0.0"]);
    let original = read_tree_file(&index_repository_path(&setup, "acme"), "de/mo/demo").unwrap();

    setup.registry.yank(&doer(), &owner(), "demo", "1.0.0").unwrap();
    setup.registry.unyank(&doer(), &owner(), "demo", "1.0.0").unwrap();

    let restored = read_tree_file(&index_repository_path(&setup, "acme"), "de/mo/demo").unwrap();
    assert_eq!(restored, original);

    let entries = parse_entries(restored.as_bytes()).unwrap();
    assert!(!entries[0].yanked);
}

#[test]
fn test_yank_twice_adds_no_commit() {
    let setup = published(&["1.0.0"]);
    let repo = index_repository_path(&setup, "acme");

    setup.registry.yank(&doer(), &owner(), "demo", "1.0.0").unwrap();
    let count = commit_count(&repo);
    setup.registry.yank(&doer(), &owner(), "demo", "1.0.0").unwrap();
    assert_eq!(commit_count(&repo), count);
}

#[test]
fn test_yank_missing_version() {
    let setup = published(&["1.0.0"]);

    assert!(matches!(
        setup.registry.yank(&doer(), &owner(), "demo", "9.9.9"),
        Err(RegistryError::NotFound(_))
    ));
    assert!(matches!(
        setup.registry.yank(&doer(), &owner(), "missing", "1.0.0"),
        Err(RegistryError::NotFound(_))
    ));
}

#[test]
fn test_yank_without_property_is_internal_error() {
    let setup = published(&[]);
    let metadata = Metadata::default();
    let mut content: &[u8] = b"abc";

    setup
        .registry
        .store()
        .create_package_version(NewPackageVersion {
            owner: "acme",
            name: "legacy",
            version: "1.0.0",
            metadata: &metadata,
            properties: BTreeMap::new(),
            file_name: "legacy-1.0.0.crate".to_string(),
            sha256: cargo_registry::sha256_hash(b"abc"),
            size: 3,
            content: &mut content,
        })
        .unwrap();

    assert!(matches!(
        setup.registry.yank(&doer(), &owner(), "legacy", "1.0.0"),
        Err(RegistryError::Internal(_))
    ));

    let package = setup.registry.store().find_package("acme", "legacy").unwrap().unwrap();
    let version = setup.registry.store().find_version(package.id, "1.0.0").unwrap().unwrap();
    assert!(setup
        .registry
        .store()
        .version_property(version.id, PROPERTY_YANKED)
        .unwrap()
        .is_none());
}

#[test]
fn test_yank_keeps_flag_when_index_fails() {
    let setup = published(&["1.0.0"]);
    let rejecting = rejecting_registry(&setup);

    assert!(matches!(
        rejecting.yank(&doer(), &owner(), "demo", "1.0.0"),
        Err(RegistryError::Git(_))
    ));

    let package = setup.registry.store().find_package("acme", "demo").unwrap().unwrap();
    let version = setup.registry.store().find_version(package.id, "1.0.0").unwrap().unwrap();
    assert_eq!(
        setup
            .registry
            .store()
            .version_property(version.id, PROPERTY_YANKED)
            .unwrap()
            .as_deref(),
        Some("true")
    );
    assert_eq!(index_lines(&setup, "de/mo/demo")[0]["yanked"], false);
}
