use std::fs;

use orgroot_core::config::load_config;
use orgroot_core::{MissingReferencePolicy, RedirectRow, RelationDirection, ResolveConfig, resolve};
use tempfile::TempDir;

#[test]
fn missing_file_yields_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let config = load_config(&dir.path().join("orgroot.toml")).expect("load");
    assert_eq!(config, ResolveConfig::default());
}

#[test]
fn file_values_are_applied() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("orgroot.toml");
    fs::write(
        &path,
        "on_missing_reference = \"drop_redirect\"\nrelated_parents = \"successors\"\n",
    )
    .expect("write config");

    let config = load_config(&path).expect("load");
    assert_eq!(config.on_missing_reference, MissingReferencePolicy::DropRedirect);
    assert_eq!(config.related_parents, RelationDirection::Successors);
}

#[test]
fn partial_file_keeps_other_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("orgroot.toml");
    fs::write(&path, "related_parents = \"successors\"\n").expect("write config");

    let config = load_config(&path).expect("load");
    assert_eq!(config.on_missing_reference, MissingReferencePolicy::Abort);
    assert_eq!(config.related_parents, RelationDirection::Successors);
}

#[test]
fn unknown_value_is_a_parse_error() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("orgroot.toml");
    fs::write(&path, "on_missing_reference = \"ignore\"\n").expect("write config");

    let err = load_config(&path).expect_err("should reject");
    assert!(err.to_string().contains("Failed to parse"));
}

#[test]
fn loaded_config_drives_the_pipeline() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("orgroot.toml");
    fs::write(&path, "on_missing_reference = \"drop_redirect\"\n").expect("write config");
    let config = load_config(&path).expect("load");

    let rows = [
        RedirectRow::redirecting("1", "one", false, "gone", "gone"),
        RedirectRow::terminal("2", "two", false),
    ];
    let resolution = resolve(&rows, &config).expect("dangling redirect dropped");
    assert_eq!(resolution.clusters.len(), 2);
}
