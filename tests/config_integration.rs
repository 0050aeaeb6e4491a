//! Engine configuration: parsing, validation and its effect on templates.

use field_tracker::config::{
    is_supported_build, load_from_path, load_from_str, ConfigError, Provider, ValidationIssue,
};
use field_tracker::field::{Dataset, DatasetField};
use field_tracker::template::{export_template, extract_usermeta, TemplateDetails};
use field_tracker::{Orchestrator, TrackingStore};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const FULL: &str = r#"
[workers]
timeout_ms = 500
fields_threads = 2
tokenizer_threads = 3

[template]
provider = "vegaLite"
build = "1.9.0-beta.1"
supported = ">=1.2, <2"

[log]
filter = "field_tracker=debug"
"#;

#[test]
fn test_load_full_config() {
    let config = load_from_str(FULL).expect("Failed to parse config");

    assert_eq!(config.workers.timeout(), Duration::from_millis(500));
    assert_eq!(config.workers.fields_threads, 2);
    assert_eq!(config.workers.tokenizer_threads, 3);
    assert_eq!(config.template.provider, Provider::VegaLite);
    assert_eq!(config.template.build, "1.9.0-beta.1");
    assert_eq!(config.log.filter, "field_tracker=debug");
}

#[test]
fn test_load_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("field-tracker.toml");
    fs::write(&path, FULL).unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.template.supported, ">=1.2, <2");
}

#[test]
fn test_validation_collects_every_issue() {
    let toml = r#"
[workers]
timeout_ms = 0
tokenizer_threads = 0

[template]
build = ""
supported = "not a range"
"#;
    let err = load_from_str(toml).unwrap_err();
    let ConfigError::Validation { source, .. } = &err else {
        panic!("expected validation error, got {err}");
    };

    assert_eq!(source.issues.len(), 4);
    assert!(matches!(
        source.issues[0],
        ValidationIssue::OutOfRange {
            field: "workers.timeout_ms",
            ..
        }
    ));
    assert!(source
        .issues
        .iter()
        .any(|i| matches!(i, ValidationIssue::MissingField { field: "template.build" })));
    assert!(err.to_string().contains("template.supported"));
}

#[test]
fn test_unknown_provider_is_a_parse_error() {
    let err = load_from_str("[template]\nprovider = \"d3\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Toml { .. }));
}

#[test]
fn test_version_filtering() {
    assert!(is_supported_build("1.8.0", ">=1.0.0").unwrap());
    assert!(is_supported_build("1.8.0", "").unwrap());
    assert!(!is_supported_build("0.9.3", ">=1.0.0").unwrap());
    assert!(is_supported_build("1.2.3", "^1.2").unwrap());
    assert!(!is_supported_build("2.0.0", "^1.2").unwrap());
}

#[test]
fn test_invalid_build_version() {
    assert!(is_supported_build("one.two", ">=1.0.0").is_err());
}

#[test]
fn test_configured_build_and_provider_reach_usermeta() {
    let config = load_from_str(FULL).unwrap();
    let orchestrator = Orchestrator::new(&config.workers).unwrap();
    let mut store = TrackingStore::new(
        r#"{"encoding": {"x": {"field": "Sales"}}}"#,
        Dataset::new(vec![DatasetField::new("Sales")]),
    );
    orchestrator.run_remap_cycle(&mut store, false).unwrap();

    let template =
        export_template(&mut store, &TemplateDetails::default(), &config.template).unwrap();
    let (_, usermeta) = extract_usermeta(&template).unwrap();
    assert_eq!(usermeta.deneb.build, "1.9.0-beta.1");
    assert_eq!(usermeta.deneb.provider, Provider::VegaLite);
}
