use std::sync::Arc;

use apicov_core::coverage::{Aggregator, CoverageStore, RecordError, RecordOutcome, Recorder};
use apicov_core::forest::ResourceForest;
use apicov_core::rules::{DisplayRules, IgnoredFields, RuleSet};
use apicov_core::schema::{Catalog, ResourceKey};
use serde_json::json;

const SMALL_LARGE: &str = r#"
resources:
  - { group: example.dev, version: v1, kind: Small }
  - { group: example.dev, version: v1, kind: Large }
types:
  - name: Small
    fields:
      - { name: a, type: string }
      - { name: b, type: string }
  - name: Large
    fields:
      - { name: w, type: string }
      - { name: x, type: string }
      - { name: y, type: int }
      - { name: z, type: "[]string" }
"#;

fn small() -> ResourceKey {
    ResourceKey::new("example.dev", "v1", "Small")
}

fn large() -> ResourceKey {
    ResourceKey::new("example.dev", "v1", "Large")
}

fn engine(catalog: &str, rules: RuleSet, ignored: IgnoredFields) -> (Recorder, Aggregator) {
    let catalog = Catalog::from_yaml(catalog).unwrap();
    let forest = ResourceForest::build(&catalog, &rules).unwrap();
    let store = Arc::new(CoverageStore::new(forest));
    (
        Recorder::new(store.clone()),
        Aggregator::new(store, ignored, rules.display),
    )
}

fn builtin_engine() -> (Recorder, Aggregator) {
    let catalog = Catalog::builtin().unwrap();
    let rules = RuleSet::builtin();
    let forest = ResourceForest::build(&catalog, &rules).unwrap();
    let store = Arc::new(CoverageStore::new(forest));
    (
        Recorder::new(store.clone()),
        Aggregator::new(store, IgnoredFields::default(), rules.display),
    )
}

#[test]
fn test_weighted_overall_percentage() {
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());

    recorder.record_value(&small(), &json!({"a": "1"})).unwrap();
    recorder
        .record_value(&large(), &json!({"w": "w", "x": "x", "y": 7}))
        .unwrap();

    let small_values = aggregator.coverage(&small()).unwrap().values;
    assert_eq!((small_values.covered_fields, small_values.total_fields), (1, 2));
    let large_values = aggregator.coverage(&large()).unwrap().values;
    assert_eq!((large_values.covered_fields, large_values.total_fields), (3, 4));

    let total = aggregator.total_coverage();
    assert_eq!(total.covered_fields, 4);
    assert_eq!(total.total_fields, 6);

    let percentages = aggregator.percentages_by_kind();
    assert_eq!(percentages.get("Small"), Some(50.0));
    assert_eq!(percentages.get("Large"), Some(75.0));
    let overall = percentages.overall().unwrap();
    assert!((overall - 66.67).abs() < 0.01, "overall was {}", overall);
}

#[test]
fn test_recording_twice_is_idempotent() {
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());
    let instance = json!({"w": "w", "z": ["one", "two"]});

    recorder.record_value(&large(), &instance).unwrap();
    let once = aggregator.coverage(&large()).unwrap();
    recorder.record_value(&large(), &instance).unwrap();
    let twice = aggregator.coverage(&large()).unwrap();

    assert_eq!(once, twice);
}

#[test]
fn test_coverage_is_monotonic_and_bounded() {
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());
    let instances = [
        json!({"w": "1"}),
        json!({}),
        json!({"x": "2", "z": []}),
        json!({"w": "1", "y": 3}),
        json!({"z": ["a"]}),
    ];

    let mut previous = aggregator.total_coverage();
    for instance in &instances {
        recorder.record_value(&large(), instance).unwrap();
        let current = aggregator.total_coverage();
        assert!(current.covered_fields >= previous.covered_fields);
        assert!(current.percent_coverage >= previous.percent_coverage);
        assert!((0.0..=100.0).contains(&current.percent_coverage));
        assert_eq!(current.total_fields, previous.total_fields);
        previous = current;
    }
    assert_eq!(aggregator.coverage(&large()).unwrap().values.percent_coverage, 100.0);
}

#[test]
fn test_empty_store_is_zero_percent() {
    let (_recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());
    let percentages = aggregator.percentages_by_kind();
    assert_eq!(percentages.resource_coverages.len(), 3);
    assert!(percentages.resource_coverages.values().all(|p| *p == 0.0));
}

#[test]
fn test_enumerated_domain_counts_each_value() {
    let catalog = r#"
resources:
  - { version: v1, kind: Dial }
types:
  - name: Dial
    fields:
      - { name: speed, type: string, values: [fast, slow, auto] }
"#;
    let (recorder, aggregator) = engine(catalog, RuleSet::default(), IgnoredFields::default());
    let key = ResourceKey::new("", "v1", "Dial");

    recorder.record_value(&key, &json!({"speed": "fast"})).unwrap();
    recorder.record_value(&key, &json!({"speed": "warp"})).unwrap();
    let coverage = aggregator.coverage(&key).unwrap();
    assert_eq!(coverage.values.covered_fields, 1);
    assert_eq!(coverage.values.total_fields, 3);

    let row = &coverage.types[0].fields[0];
    assert_eq!(row.observed, vec!["fast".to_string(), "warp".to_string()]);
    assert_eq!(
        row.expected,
        Some(vec!["auto".to_string(), "fast".to_string(), "slow".to_string()])
    );
}

#[test]
fn test_ignored_fields_leave_both_sides() {
    let ignored = IgnoredFields::from_paths(["Small.b"]);
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), ignored);

    recorder.record_value(&small(), &json!({"a": "1", "b": "2"})).unwrap();
    let coverage = aggregator.coverage(&small()).unwrap();
    assert_eq!(coverage.values.covered_fields, 1);
    assert_eq!(coverage.values.total_fields, 1);

    let rows = &coverage.types[0].fields;
    let b = rows.iter().find(|r| r.path == "Small.b").unwrap();
    assert!(b.ignored);
    assert_eq!((b.covered, b.total), (0, 0));
}

#[test]
fn test_shared_substructure_propagates_across_kinds() {
    let (recorder, aggregator) = builtin_engine();
    let deployment = ResourceKey::new("apps", "v1", "Deployment");
    let pod = ResourceKey::new("", "v1", "Pod");

    let before = aggregator.coverage(&pod).unwrap().values;
    recorder
        .record_value(
            &deployment,
            &json!({
                "metadata": {"name": "web"},
                "spec": {
                    "replicas": 2,
                    "template": {
                        "spec": {
                            "containers": [{"name": "app", "image": "nginx:1.25"}]
                        }
                    }
                }
            }),
        )
        .unwrap();
    let after = aggregator.coverage(&pod).unwrap();

    assert_eq!(after.values.total_fields, before.total_fields);
    assert!(after.values.covered_fields > before.covered_fields);

    let container = after
        .types
        .iter()
        .find(|t| t.type_name == "Container")
        .unwrap();
    let image = container
        .fields
        .iter()
        .find(|f| f.path == "Container.image")
        .unwrap();
    assert_eq!(image.observed, vec!["nginx:1.25".to_string()]);
}

#[test]
fn test_shared_types_are_reported_once_per_kind() {
    let (_recorder, aggregator) = builtin_engine();
    let coverage = aggregator.coverage_by_kind("Deployment").unwrap();
    let meta_sections = coverage
        .types
        .iter()
        .filter(|t| t.type_name == "ObjectMeta")
        .count();
    assert_eq!(meta_sections, 1);
    assert_eq!(coverage.types[0].type_name, "Deployment");
}

#[test]
fn test_display_rules_label_rows_without_changing_counts() {
    let (recorder, aggregator) = builtin_engine();
    let unlabeled = {
        let catalog = Catalog::builtin().unwrap();
        let rules = RuleSet::builtin();
        let forest = ResourceForest::build(&catalog, &rules).unwrap();
        Aggregator::new(
            Arc::new(CoverageStore::new(forest)),
            IgnoredFields::default(),
            DisplayRules::default(),
        )
    };

    recorder
        .record_value(
            &ResourceKey::new("", "v1", "ConfigMap"),
            &json!({"metadata": {"labels": {"app": "web"}}}),
        )
        .unwrap();
    let coverage = aggregator.coverage_by_kind("ConfigMap").unwrap();
    let meta = coverage
        .types
        .iter()
        .find(|t| t.type_name == "ObjectMeta")
        .unwrap();
    let labels = meta
        .fields
        .iter()
        .find(|f| f.path == "ObjectMeta.labels")
        .unwrap();
    assert_eq!(labels.label, "labels (any)");
    assert_eq!((labels.covered, labels.total), (1, 1));

    let plain = unlabeled.coverage_by_kind("ConfigMap").unwrap();
    assert_eq!(plain.values.total_fields, coverage.values.total_fields);
}

#[test]
fn test_managed_fields_are_never_counted() {
    let (recorder, aggregator) = builtin_engine();
    let outcome = recorder
        .record_value(
            &ResourceKey::new("", "v1", "ConfigMap"),
            &json!({"metadata": {"managedFields": [{"manager": "kubectl"}]}}),
        )
        .unwrap();
    assert_eq!(outcome, RecordOutcome::Recorded { leaves: 0 });

    let coverage = aggregator.coverage_by_kind("ConfigMap").unwrap();
    assert!(coverage
        .types
        .iter()
        .flat_map(|t| t.fields.iter())
        .all(|f| !f.path.starts_with("ObjectMeta.managedFields")));
}

#[test]
fn test_unregistered_key_is_a_no_op() {
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());
    let outcome = recorder
        .record(&ResourceKey::new("", "v1", "Pod"), b"{not json")
        .unwrap();
    assert_eq!(outcome, RecordOutcome::Unregistered);
    assert_eq!(aggregator.total_coverage().covered_fields, 0);
}

#[test]
fn test_decode_failure_is_scoped_to_one_instance() {
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());

    let result = recorder.record(&small(), b"{\"a\": ");
    assert!(matches!(result, Err(RecordError::Decode(_))));

    let result = recorder.record(&small(), br#"{"a": "ok", "b": 12}"#);
    assert!(matches!(result, Err(RecordError::Mismatch { ref path, .. }) if path == "Small.b"));
    assert_eq!(aggregator.total_coverage().covered_fields, 0);

    recorder.record(&small(), br#"{"a": "ok"}"#).unwrap();
    assert_eq!(aggregator.total_coverage().covered_fields, 1);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let (recorder, aggregator) = engine(SMALL_LARGE, RuleSet::default(), IgnoredFields::default());
    recorder
        .record_value(&small(), &json!({"a": "1", "extra": {"deep": true}}))
        .unwrap();
    assert_eq!(aggregator.coverage(&small()).unwrap().values.covered_fields, 1);
}

#[test]
fn test_absent_optional_does_not_lower_coverage() {
    let catalog = r#"
resources:
  - { version: v1, kind: Box }
types:
  - name: Box
    fields:
      - { name: size, type: "*int" }
      - { name: color, type: string }
"#;
    let (recorder, aggregator) = engine(catalog, RuleSet::default(), IgnoredFields::default());
    let key = ResourceKey::new("", "v1", "Box");

    recorder.record_value(&key, &json!({"color": "red"})).unwrap();
    let before = aggregator.coverage(&key).unwrap().values;
    recorder
        .record_value(&key, &json!({"size": null, "color": "blue"}))
        .unwrap();
    let after = aggregator.coverage(&key).unwrap().values;

    assert_eq!(before.total_fields, 2);
    assert_eq!(after.covered_fields, before.covered_fields);
}
