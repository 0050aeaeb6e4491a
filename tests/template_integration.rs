//! Export a spec as a template, then import it against another dataset.

use field_tracker::config::{TemplateConfig, WorkersConfig};
use field_tracker::field::{Dataset, DatasetField, FieldDataType, FieldKind, FieldRole};
use field_tracker::template::{
    export_template, extract_usermeta, import_template, TemplateDetails, TemplateError,
    USERMETA_KEY,
};
use field_tracker::{tokenize_for_export, Orchestrator, TrackingStore};

const SPEC: &str = r#"{
  // revenue by territory
  "mark": "bar",
  "encoding": {
    "x": {"field": "Region"},
    "y": {"field": "Sales", "aggregate": "sum"}
  },
  "transform": [{"filter": "datum['Sales'] > 0"}]
}"#;

fn source_dataset() -> Dataset {
    Dataset::new(vec![
        DatasetField::new("Sales")
            .with_kind(FieldKind::Measure)
            .with_type(FieldDataType::Numeric),
        DatasetField::new("Region").with_kind(FieldKind::Column),
    ])
}

fn details() -> TemplateDetails {
    TemplateDetails {
        name: "Sales by region".into(),
        description: "Bar chart of summed sales".into(),
        author: "Analytics".into(),
    }
}

fn exported() -> String {
    let orchestrator = Orchestrator::new(&WorkersConfig::default()).unwrap();
    let mut store = TrackingStore::new(SPEC, source_dataset());
    orchestrator.run_remap_cycle(&mut store, false).unwrap();
    export_template(&mut store, &details(), &TemplateConfig::default()).unwrap()
}

#[test]
fn test_import_of_export_yields_tokenized_spec() {
    let orchestrator = Orchestrator::new(&WorkersConfig::default()).unwrap();
    let mut store = TrackingStore::new(SPEC, source_dataset());
    orchestrator.run_remap_cycle(&mut store, false).unwrap();
    let tokenized = tokenize_for_export(SPEC, store.tracked_fields(), &[]).spec;

    let template = export_template(&mut store, &details(), &TemplateConfig::default()).unwrap();
    let imported = import_template(&template, &TemplateConfig::default()).unwrap();

    assert_eq!(imported.spec, tokenized);
    assert!(imported.spec.starts_with("{\n  // revenue by territory"));
}

#[test]
fn test_usermeta_describes_each_placeholder() {
    let template = exported();
    let (_, usermeta) = extract_usermeta(&template).unwrap();

    assert_eq!(usermeta.information.name, "Sales by region");
    assert_eq!(usermeta.information.author, "Analytics");
    assert_eq!(usermeta.deneb.build, TemplateConfig::default().build);

    let entries: Vec<_> = usermeta
        .dataset
        .iter()
        .map(|e| (e.key.as_str(), e.name.as_str(), e.kind))
        .collect();
    assert_eq!(
        entries,
        vec![
            ("__0__", "Sales", FieldKind::Measure),
            ("__1__", "Region", FieldKind::Column),
        ]
    );
}

#[test]
fn test_each_export_gets_a_fresh_identity() {
    let (_, first) = extract_usermeta(&exported()).unwrap();
    let (_, second) = extract_usermeta(&exported()).unwrap();
    assert_ne!(first.information.uuid, second.information.uuid);
}

#[test]
fn test_imported_template_is_assigned_to_new_dataset() {
    let template = exported();
    let imported = import_template(&template, &TemplateConfig::default()).unwrap();

    let target = Dataset::new(vec![
        DatasetField::new("Revenue").with_kind(FieldKind::Measure),
        DatasetField::new("Territory").with_kind(FieldKind::Column),
    ]);
    let orchestrator = Orchestrator::new(&WorkersConfig::default()).unwrap();
    let mut store = TrackingStore::new("{}", target);
    store
        .load_template(imported.spec, imported.tracked_fields)
        .unwrap();

    let outcome = orchestrator.run_remap_cycle(&mut store, false).unwrap();
    assert_eq!(
        outcome.fields_requiring_mapping,
        vec!["__0__".to_string(), "__1__".to_string()]
    );

    store.assign_field("__0__", "Revenue").unwrap();
    store.assign_field("__1__", "Territory").unwrap();
    let outcome = orchestrator.run_remap_cycle(&mut store, false).unwrap();

    let expected = SPEC
        .replace("Sales", "Revenue")
        .replace("Region", "Territory");
    assert_eq!(outcome.editor_text.as_deref(), Some(expected.as_str()));
    assert!(outcome.fields_requiring_mapping.is_empty());
    assert_eq!(store.tracked_fields()["Revenue"].placeholder, "__0__");
    assert_eq!(store.tracked_fields()["Territory"].placeholder, "__1__");
    assert!(!store.spec().contains(USERMETA_KEY));
}

#[test]
fn test_drilldown_levels_survive_export_and_import() {
    const DRILLED: &str = r#"{
  "mark": "line",
  "encoding": {
    "x": {"field": "Year"},
    "y": {"field": "Sales"}
  }
}"#;
    let orchestrator = Orchestrator::new(&WorkersConfig::default()).unwrap();
    let source = Dataset::new(vec![
        DatasetField::new("Sales").with_kind(FieldKind::Measure),
        DatasetField::new("Year").with_role(FieldRole::Drilldown),
    ]);
    let mut store = TrackingStore::new(DRILLED, source);
    orchestrator.run_remap_cycle(&mut store, false).unwrap();
    let template = export_template(&mut store, &details(), &TemplateConfig::default()).unwrap();

    let imported = import_template(&template, &TemplateConfig::default()).unwrap();
    assert!(imported.spec.contains(r#""x": {"field": "__drilldown0__"}"#));
    assert!(imported.spec.contains(r#""y": {"field": "__0__"}"#));

    let target = Dataset::new(vec![
        DatasetField::new("Revenue").with_kind(FieldKind::Measure),
        DatasetField::new("Fiscal Quarter").with_role(FieldRole::Drilldown),
    ]);
    let mut store = TrackingStore::new("{}", target);
    store
        .load_template(imported.spec, imported.tracked_fields)
        .unwrap();
    let outcome = orchestrator.run_remap_cycle(&mut store, false).unwrap();
    assert_eq!(outcome.fields_requiring_mapping, vec!["__0__".to_string()]);

    store.assign_field("__0__", "Revenue").unwrap();
    orchestrator.run_remap_cycle(&mut store, false).unwrap();

    let expected = DRILLED
        .replace("Year", "Fiscal Quarter")
        .replace("Sales", "Revenue");
    assert_eq!(store.spec(), expected);
    assert!(!store.spec().contains("__drilldown0__"));
}

#[test]
fn test_build_outside_supported_range_is_rejected() {
    let template = exported();
    let config = TemplateConfig {
        supported: "<1.0.0".into(),
        ..TemplateConfig::default()
    };
    assert!(matches!(
        import_template(&template, &config),
        Err(TemplateError::UnsupportedBuild { .. })
    ));
}
