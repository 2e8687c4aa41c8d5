//! Catalog and validator configuration files.

mod common;

use common::{fixture_path, follows, key, single_join};
use fragplan::{validate_plan, InMemoryCatalog, RelationCatalog, ValidatorConfig};

#[test]
fn yaml_catalog_matches_builder() {
    let loaded = InMemoryCatalog::load(fixture_path("catalog.yaml")).unwrap();
    assert_eq!(loaded, common::small_table_catalog());
    assert_eq!(loaded.schema_of(&key("smallTable")), Some(follows()));
    // Provenance text mentions `mallTable`; the catalog never does.
    assert_eq!(loaded.schema_of(&key("mallTable")), None);
}

#[test]
fn json_catalog_round_trips() {
    let catalog = common::small_table_catalog();
    let text = catalog.to_json_pretty().unwrap();
    assert_eq!(InMemoryCatalog::from_json(&text).unwrap(), catalog);
}

#[test]
fn config_file_fills_missing_keys_with_defaults() {
    let cfg = ValidatorConfig::load(fixture_path("validator.yaml")).unwrap();
    assert_eq!(cfg.known_workers, Some(vec![1, 2, 3, 4]));
    assert!(!cfg.check_append_schema);
    assert!(!cfg.parallel);
}

#[test]
fn config_file_drives_worker_checks() {
    let cfg = ValidatorConfig::load(fixture_path("validator.yaml")).unwrap();
    let plan = single_join();
    validate_plan(&plan, &common::small_table_catalog(), &cfg).unwrap();

    let strict = ValidatorConfig {
        known_workers: Some(vec![1, 2]),
        ..cfg
    };
    let report = validate_plan(&plan, &common::small_table_catalog(), &strict).unwrap_err();
    assert_eq!(common::codes(&report), vec!["UnknownWorker", "UnknownWorker"]);
}

#[test]
fn missing_files_are_io_errors() {
    assert!(matches!(
        InMemoryCatalog::load(fixture_path("absent.yaml")),
        Err(fragplan::Error::Io(_))
    ));
}
