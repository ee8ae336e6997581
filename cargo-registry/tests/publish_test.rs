//! End-to-end publish tests against on-disk storage and real git
//! repositories.

mod common;

use cargo_registry::cargo::{DependencyKind, DependencyName, PROPERTY_YANKED};
use cargo_registry::sha256_hash;
use cargo_registry::store::PackageStore;
use cargo_registry::RegistryError;
use common::*;
use serde_json::json;

#[test]
fn test_publish_writes_index_line() {
    let setup = create_test_setup();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();

    let body = publish_payload(
        &json!({
            "name": "foo",
            "vers": "1.0.0",
            "deps": [{
                "name": "bar",
                "version_req": "^1",
                "features": [],
                "optional": false,
                "default_features": true,
                "target": null,
                "kind": "normal",
                "registry": null,
                "explicit_name_in_toml": null
            }],
            "features": {}
        }),
        b"foo-crate",
    );
    let created = setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();
    assert_eq!(created.version.version, "1.0.0");
    assert_eq!(created.files[0].sha256, sha256_hash(b"foo-crate"));
    assert_eq!(created.files[0].name, "foo-1.0.0.crate");

    let repo = index_repository_path(&setup, "acme");
    let expected = format!(
        "{{\"name\":\"foo\",\"vers\":\"1.0.0\",\"deps\":[{{\"name\":\"bar\",\"req\":\"^1\",\"features\":[],\"optional\":false,\"default_features\":true,\"target\":null,\"kind\":\"normal\",\"registry\":null}}],\"cksum\":\"{}\",\"features\":{{}},\"yanked\":false}}\n",
        sha256_hash(b"foo-crate")
    );
    assert_eq!(read_tree_file(&repo, "3/f/foo").unwrap(), expected);
    assert_eq!(head_message(&repo), "Update foo");
    assert_eq!(tree_files(&repo), ["3/f/foo", "config.json"]);
}

#[test]
fn test_publish_renamed_dependency() {
    let setup = create_test_setup();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();

    let body = publish_payload(
        &json!({
            "name": "foo",
            "vers": "1.0.0",
            "deps": [{
                "name": "bar",
                "version_req": "^1",
                "kind": "build",
                "explicit_name_in_toml": "baz"
            }]
        }),
        b"x",
    );
    setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();

    let entries = setup
        .registry
        .index()
        .read_package_index(&owner(), "foo")
        .unwrap()
        .unwrap();
    let dep = &entries[0].deps[0];
    assert_eq!(
        dep.name,
        DependencyName::Renamed {
            alias: "baz".into(),
            package: "bar".into()
        }
    );
    assert_eq!(dep.kind, DependencyKind::Build);

    let raw = read_tree_file(&index_repository_path(&setup, "acme"), "3/f/foo").unwrap();
    assert!(raw.contains(r#""name":"baz""#));
    assert!(raw.contains(r#""package":"bar""#));
}

#[test]
fn test_many_versions_are_sorted() {
    let setup = create_test_setup();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();

    for version in ["1.10.0", "0.1.0", "1.2.0", "1.2.0-rc.1"] {
        let body = simple_payload("serde", version, version.as_bytes());
        setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();
    }

    let repo = index_repository_path(&setup, "acme");
    let content = read_tree_file(&repo, "se/rd/serde").unwrap();
    let versions: Vec<String> = content
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap()["vers"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(versions, ["0.1.0", "1.2.0-rc.1", "1.2.0", "1.10.0"]);
    assert!(content.ends_with('\n'));

    // config commit plus one per publish
    assert_eq!(commit_count(&repo), 5);
}

#[test]
fn test_duplicate_version_conflicts() {
    let setup = create_test_setup();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();

    let body = simple_payload("demo", "1.0.0", b"one");
    setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();
    let head = head_commit(&index_repository_path(&setup, "acme"));

    let body = simple_payload("Demo", "1.0.0", b"two");
    assert!(matches!(
        setup.registry.upload_package(&doer(), &owner(), &body[..]),
        Err(RegistryError::Conflict(_))
    ));
    assert_eq!(head_commit(&index_repository_path(&setup, "acme")), head);
}

#[test]
fn test_publish_rejects_invalid_input() {
    let setup = create_test_setup();

    let body = simple_payload("9lives", "1.0.0", b"x");
    assert!(matches!(
        setup.registry.upload_package(&doer(), &owner(), &body[..]),
        Err(RegistryError::InvalidName(_))
    ));

    let body = simple_payload("demo", "one", b"x");
    assert!(matches!(
        setup.registry.upload_package(&doer(), &owner(), &body[..]),
        Err(RegistryError::InvalidVersion(_))
    ));

    assert!(setup.registry.store().list_packages("acme").unwrap().is_empty());
}

#[test]
fn test_publish_rejects_short_content() {
    let setup = create_test_setup();
    let mut body = simple_payload("demo", "1.0.0", b"abcdef");
    body.truncate(body.len() - 2);

    assert!(matches!(
        setup.registry.upload_package(&doer(), &owner(), &body[..]),
        Err(RegistryError::UploadError(_))
    ));
    assert!(setup.registry.store().find_package("acme", "demo").unwrap().is_none());
}

#[test]
fn test_publish_rejects_trailing_bytes() {
    let setup = create_test_setup();
    let mut body = simple_payload("demo", "1.0.0", b"abc");
    body.extend_from_slice(b"junk");

    assert!(matches!(
        setup.registry.upload_package(&doer(), &owner(), &body[..]),
        Err(RegistryError::UploadError(_))
    ));
    assert!(setup.registry.store().find_package("acme", "demo").unwrap().is_none());
}

#[test]
fn test_publish_without_index_repository() {
    let setup = create_test_setup();

    let body = simple_payload("demo", "1.0.0", b"abc");
    let created = setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();

    assert!(!index_repository_path(&setup, "acme").exists());
    assert_eq!(
        setup
            .registry
            .store()
            .version_property(created.version.id, PROPERTY_YANKED)
            .unwrap()
            .as_deref(),
        Some("false")
    );
    assert!(setup
        .registry
        .index()
        .read_package_index(&owner(), "demo")
        .unwrap()
        .is_none());
}

#[test]
fn test_index_failure_rolls_back_version() {
    let setup = create_test_setup();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();
    let repo = index_repository_path(&setup, "acme");
    let head = head_commit(&repo);

    let rejecting = rejecting_registry(&setup);
    let body = simple_payload("demo", "1.0.0", b"abc");
    let result = rejecting.upload_package(&doer(), &owner(), &body[..]);

    assert!(matches!(result, Err(RegistryError::Git(_))));
    let package = setup.registry.store().find_package("acme", "demo").unwrap().unwrap();
    assert!(setup.registry.store().find_version(package.id, "1.0.0").unwrap().is_none());
    assert_eq!(head_commit(&repo), head);
    assert_eq!(tree_files(&repo), ["config.json"]);

    // the same version can be published once the index is writable again
    setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();
    assert_eq!(tree_files(&repo), ["config.json", "de/mo/demo"]);
}

#[test]
fn test_owners_are_isolated() {
    let setup = create_test_setup();
    let globex = cargo_registry::Owner::public("globex").unwrap();
    setup.registry.index().ensure_initialized(&doer(), &owner()).unwrap();
    setup.registry.index().ensure_initialized(&doer(), &globex).unwrap();

    let body = simple_payload("demo", "1.0.0", b"abc");
    setup.registry.upload_package(&doer(), &owner(), &body[..]).unwrap();

    assert!(read_tree_file(&index_repository_path(&setup, "acme"), "de/mo/demo").is_some());
    assert!(read_tree_file(&index_repository_path(&setup, "globex"), "de/mo/demo").is_none());
}
