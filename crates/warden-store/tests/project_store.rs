//! Versioned Project Store Tests
//!
//! Covers project creation, config reads and optimistic config writes.

use std::collections::HashSet;

use assert_matches::assert_matches;
use warden_config::{actions, GroupReference, PermissionKind};
use warden_store::{ProjectStore, RefLayout, StoreError};
use warden_testkit::{document, init_tracing, memory_store, project_name, rule, TempStore};

// ============================================================================
// Creation
// ============================================================================

#[test]
fn generated_names_are_distinct() {
    init_tracing();
    let store = memory_store();
    let names: HashSet<_> = (0..32)
        .map(|_| store.create_project(None).unwrap().into_name())
        .collect();
    assert_eq!(names.len(), 32);
    assert!(names.iter().all(|n| n.as_str().starts_with("project-")));
}

#[test]
fn specified_name_is_kept() {
    let store = memory_store();
    let handle = store.create_project(Some(project_name("somename"))).unwrap();
    assert_eq!(handle.name().as_str(), "somename");
    assert!(store.project_exists(handle.name()).unwrap());
}

#[test]
fn name_prefix_is_configurable() {
    let store = memory_store().with_name_prefix("team").unwrap();
    let name = store.create_project(None).unwrap().into_name();
    assert!(name.as_str().starts_with("team-"));
    assert!(memory_store().with_name_prefix("/bad").is_err());
}

#[test]
fn branches_list_head_then_config_ref() {
    let store = memory_store();
    let name = store.create_project(None).unwrap().into_name();
    assert_eq!(
        store.branches(&name).unwrap(),
        vec!["HEAD", "refs/meta/config", "refs/heads/master"]
    );
}

#[test]
fn custom_layout_is_used() {
    let layout = RefLayout {
        default_branch: "refs/heads/main".to_string(),
        config_ref: "refs/meta/acl".to_string(),
    };
    let store = memory_store().with_layout(layout).unwrap();
    let name = store.create_project(None).unwrap().into_name();
    assert_eq!(
        store.branches(&name).unwrap(),
        vec!["HEAD", "refs/meta/acl", "refs/heads/main"]
    );
}

// ============================================================================
// Reading
// ============================================================================

#[test]
fn new_project_has_empty_config_at_initial_revision() {
    let store = memory_store();
    let handle = store.create_project(None).unwrap();
    let config = store.read_config(handle.name()).unwrap();
    assert_eq!(config.revision(), Some(handle.config_revision()));
    assert!(config.document().is_empty());
    assert!(config.description().is_empty());
}

#[test]
fn missing_config_ref_reads_as_unconfigured() {
    let store = memory_store();
    let name = store.create_project(None).unwrap().into_name();
    assert!(store.delete_config_ref(&name).unwrap());

    let config = store.read_config(&name).unwrap();
    assert_eq!(config.name(), &name);
    assert!(config.revision().is_none());
    assert!(config.document().is_empty());
    assert_eq!(store.branches(&name).unwrap(), vec!["HEAD", "refs/heads/master"]);
}

#[test]
fn missing_project_is_not_found() {
    let store = memory_store();
    let err = store.read_config(&project_name("nope")).unwrap_err();
    assert_matches!(err, StoreError::ProjectNotFound { .. });
}

#[test]
fn malformed_document_is_reported_with_location() {
    let store = memory_store();
    let name = store.create_project(None).unwrap().into_name();
    let (base, _) = store.read_document(&name).unwrap();
    store
        .ref_store()
        .write_ref(&name, "refs/meta/config", base.as_ref(), b"[project]\n\tdescription = \"open\n".to_vec())
        .unwrap();

    let err = store.read_config(&name).unwrap_err();
    assert_matches!(err, StoreError::Document { ref_name, .. } if ref_name == "refs/meta/config");
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn write_config_advances_revision() {
    let store = memory_store();
    let handle = store.create_project(None).unwrap();
    let doc = document("[project]\n\tdescription = my fancy project\n");

    let revision = store
        .write_config(handle.name(), Some(handle.config_revision()), &doc)
        .unwrap();
    let config = store.read_config(handle.name()).unwrap();
    assert_eq!(config.revision(), Some(&revision));
    assert_eq!(config.description(), "my fancy project");
    assert_eq!(store.history(handle.name()).unwrap().len(), 2);
}

#[test]
fn stale_base_is_rejected() {
    let store = memory_store();
    let handle = store.create_project(None).unwrap();
    let base = *handle.config_revision();
    store
        .write_config(handle.name(), Some(&base), &document("[a]\n\tk = 1\n"))
        .unwrap();

    let err = store
        .write_config(handle.name(), Some(&base), &document("[a]\n\tk = 2\n"))
        .unwrap_err();
    assert_matches!(err, StoreError::StaleRevision { .. });
    assert_eq!(store.read_document(handle.name()).unwrap().1, document("[a]\n\tk = 1\n"));
}

#[test]
fn unset_base_creates_first_version() {
    let store = memory_store();
    let name = store.create_project(None).unwrap().into_name();
    store.delete_config_ref(&name).unwrap();

    let revision = store.write_config(&name, None, &document("[a]\n\tk = v\n")).unwrap();
    assert_eq!(store.history(&name).unwrap(), vec![revision]);
}

#[test]
fn save_project_config_round_trips_description_and_rules() {
    let store = memory_store();
    let name = store.create_project(None).unwrap().into_name();

    let mut config = store.read_config(&name).unwrap();
    config.set_description("described");
    config.permissions_mut().push(rule(
        PermissionKind::Deny,
        actions::PUSH,
        "refs/heads/*",
        GroupReference::anonymous_users(),
    ));
    let revision = store.save_project_config(&config).unwrap();

    let reread = store.read_config(&name).unwrap();
    assert_eq!(reread.revision(), Some(&revision));
    assert_eq!(reread.description(), "described");
    assert_eq!(reread.permissions(), config.permissions());

    // The config object is now stale.
    assert_matches!(store.save_project_config(&config), Err(StoreError::StaleRevision { .. }));
}

// ============================================================================
// Filesystem Backend
// ============================================================================

#[test]
fn filesystem_store_persists_across_instances() {
    let temp = TempStore::new();
    let name = {
        let store = temp.project_store();
        let handle = store.create_project(Some(project_name("team/app"))).unwrap();
        store
            .write_config(handle.name(), Some(handle.config_revision()), &document("[project]\n\tdescription = kept\n"))
            .unwrap();
        handle.into_name()
    };

    let reopened = ProjectStore::new(std::sync::Arc::new(
        warden_store::FilesystemRefStore::open(temp.dir.path()).unwrap(),
    ));
    assert_eq!(reopened.read_config(&name).unwrap().description(), "kept");
    assert_eq!(reopened.list_projects(Some("team/")).unwrap(), vec![name]);
    assert!(reopened.list_projects(Some("other")).unwrap().is_empty());
}

#[test]
fn nested_names_never_shadow_project_directories() {
    let temp = TempStore::new();
    let store = temp.project_store();
    assert!(warden_config::ProjectName::new("foo.git/bar").is_err());

    store.create_project(Some(project_name("foo/bar"))).unwrap();
    assert!(!store.project_exists(&project_name("foo")).unwrap());
    store.create_project(Some(project_name("foo"))).unwrap();

    assert_eq!(
        store.list_projects(None).unwrap(),
        vec![project_name("foo"), project_name("foo/bar")]
    );
}
