//! Configuration and root folder resolution tests
//!
//! Tests that touch SINGBIRDS_ROOT_FOLDER / SINGBIRDS_ROOT are marked
//! `#[serial]` so they never race on process environment.

use serial_test::serial;
use singbirds_common::config::{
    load_toml_config, write_toml_config, CompiledDefaults, RootFolderInitializer,
    RootFolderResolver, TomlConfig, ROOT_ENV, ROOT_FOLDER_ENV,
};
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ROOT_FOLDER_ENV);
    env::remove_var(ROOT_ENV);
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_env();

    let resolver = RootFolderResolver::new("test-module").with_config_path(None);
    let root_folder = resolver.resolve();

    assert_eq!(root_folder, CompiledDefaults::for_current_platform().root_folder);
}

#[test]
#[serial]
fn test_resolver_cli_arg_wins_over_env() {
    clear_env();
    env::set_var(ROOT_FOLDER_ENV, "/tmp/singbirds-env");

    let resolver = RootFolderResolver::new("test-module")
        .with_cli_arg(Some(PathBuf::from("/tmp/singbirds-cli")));

    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/singbirds-cli"));

    clear_env();
}

#[test]
#[serial]
fn test_resolver_root_folder_env_takes_precedence() {
    clear_env();
    env::set_var(ROOT_FOLDER_ENV, "/tmp/singbirds-priority-1");
    env::set_var(ROOT_ENV, "/tmp/singbirds-priority-2");

    let resolver = RootFolderResolver::new("test-module").with_config_path(None);
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/singbirds-priority-1"));

    clear_env();
}

#[test]
#[serial]
fn test_resolver_reads_toml_root_folder() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("singbirds-ai.toml");

    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/data/birds")),
        ..TomlConfig::default()
    };
    write_toml_config(&config, &toml_path).unwrap();

    let resolver = RootFolderResolver::new("singbirds-ai").with_config_path(Some(toml_path));
    assert_eq!(resolver.resolve(), PathBuf::from("/data/birds"));
}

#[test]
#[serial]
fn test_resolver_invalid_toml_falls_back_to_default() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("broken.toml");
    std::fs::write(&toml_path, "root_folder = ").unwrap();

    let resolver = RootFolderResolver::new("singbirds-ai").with_config_path(Some(toml_path));
    assert_eq!(resolver.resolve(), CompiledDefaults::for_current_platform().root_folder);
}

#[test]
fn test_toml_write_then_load_preserves_ingestion_section() {
    let temp_dir = TempDir::new().unwrap();
    let toml_path = temp_dir.path().join("nested").join("singbirds-ai.toml");

    let mut config = TomlConfig::default();
    config.ingestion.concurrency = 8;
    config.ingestion.batch_size = 3;
    config.embedding.seed = 7;
    write_toml_config(&config, &toml_path).unwrap();

    let loaded = load_toml_config(&toml_path).unwrap();
    assert_eq!(loaded.ingestion.concurrency, 8);
    assert_eq!(loaded.ingestion.batch_size, 3);
    assert_eq!(loaded.embedding.seed, 7);
}

#[test]
fn test_initializer_paths() {
    let root = PathBuf::from("/tmp/singbirds-test-root");
    let initializer = RootFolderInitializer::new(root.clone());

    assert_eq!(initializer.database_path(), root.join("singbirds.db"));
    assert_eq!(initializer.exports_path(), root.join("exports"));
}

#[test]
fn test_initializer_creates_directories_idempotently() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("root");
    let initializer = RootFolderInitializer::new(root.clone());

    initializer.ensure_directory_exists().unwrap();
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.exports_path().is_dir());
    assert!(!initializer.database_exists());
}
