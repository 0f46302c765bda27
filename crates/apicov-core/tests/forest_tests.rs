use apicov_core::forest::{LeafMode, NodeKind, ResourceForest};
use apicov_core::rules::{Matcher, NodeRule, RuleSet};
use apicov_core::schema::{Catalog, ResourceKey, SchemaError};

fn builtin_forest() -> ResourceForest {
    let catalog = Catalog::builtin().unwrap();
    ResourceForest::build(&catalog, &RuleSet::builtin()).unwrap()
}

fn leaf_mode(forest: &ResourceForest, key: &ResourceKey, path: &[&str]) -> LeafMode {
    let id = forest.lookup(key, path).unwrap();
    match &forest.node(id).kind {
        NodeKind::Leaf { mode, .. } => mode.clone(),
        other => panic!("expected leaf at {:?}, found {:?}", path, other),
    }
}

#[test]
fn test_builtin_forest_registers_every_kind() {
    let catalog = Catalog::builtin().unwrap();
    let forest = ResourceForest::build(&catalog, &RuleSet::builtin()).unwrap();

    assert_eq!(forest.keys().count(), catalog.resources.len());
    assert_eq!(
        forest.resolve_kind("Deployment"),
        Some(&ResourceKey::new("apps", "v1", "Deployment"))
    );
    assert!(forest.resolve_kind("Gadget").is_none());
    assert!(forest.leaf_count() > 0);
}

#[test]
fn test_named_types_are_shared_across_kinds() {
    let forest = builtin_forest();
    let deployment = ResourceKey::new("apps", "v1", "Deployment");
    let pod = ResourceKey::new("", "v1", "Pod");

    let via_deployment = forest.lookup(&deployment, &["spec", "template", "spec"]).unwrap();
    let via_pod = forest.lookup(&pod, &["spec"]).unwrap();
    assert_eq!(via_deployment, via_pod);
    assert_eq!(forest.shared("PodSpec"), Some(via_pod));
}

#[test]
fn test_struct_fields_keep_declaration_order() {
    let forest = builtin_forest();
    let meta = forest.shared("ObjectMeta").unwrap();
    let names: Vec<&str> = forest.node(meta).field_names().collect();
    assert_eq!(&names[..3], &["name", "generateName", "namespace"]);
}

#[test]
fn test_node_rule_exclusion_omits_field() {
    let forest = builtin_forest();
    let meta = forest.shared("ObjectMeta").unwrap();
    assert!(!forest.node(meta).field_names().any(|name| name == "managedFields"));
    assert!(forest.shared("ManagedFieldsEntry").is_none());
}

#[test]
fn test_exclusion_by_type_identity() {
    let catalog = Catalog::builtin().unwrap();
    let mut rules = RuleSet::builtin();
    rules.node.push(NodeRule::exclude(Matcher::for_type("Probe")));
    let forest = ResourceForest::build(&catalog, &rules).unwrap();

    let container = forest.shared("Container").unwrap();
    let names: Vec<&str> = forest.node(container).field_names().collect();
    assert!(!names.contains(&"livenessProbe"));
    assert!(!names.contains(&"readinessProbe"));
    assert!(names.contains(&"image"));
}

#[test]
fn test_leaf_modes_follow_rules_and_schema() {
    let forest = builtin_forest();
    let deployment = ResourceKey::new("apps", "v1", "Deployment");
    let service = ResourceKey::new("", "v1", "Service");

    // boolean type rule
    let paused = leaf_mode(&forest, &deployment, &["spec", "paused"]);
    assert_eq!(
        paused,
        LeafMode::Enumerated(["true", "false"].iter().map(|s| s.to_string()).collect())
    );

    // schema-declared domain
    let LeafMode::Enumerated(domain) = leaf_mode(&forest, &service, &["spec", "type"]) else {
        panic!("service type should be enumerated");
    };
    assert!(domain.contains("NodePort"));
    assert_eq!(domain.len(), 4);

    // presence-only path rule
    assert_eq!(
        leaf_mode(&forest, &deployment, &["metadata", "name"]),
        LeafMode::Presence
    );

    // default
    assert_eq!(
        leaf_mode(&forest, &deployment, &["spec", "minReadySeconds"]),
        LeafMode::Values
    );
}

#[test]
fn test_recursive_type_builds() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Tree }
types:
  - name: Tree
    fields:
      - { name: label, type: string }
      - { name: children, type: "[]Tree" }
      - { name: parent, type: "*Tree" }
"#,
    )
    .unwrap();
    let forest = ResourceForest::build(&catalog, &RuleSet::default()).unwrap();
    let key = ResourceKey::new("", "v1", "Tree");

    let root = forest.root(&key).unwrap();
    assert_eq!(forest.lookup(&key, &["children"]), Some(root));
    assert_eq!(forest.lookup(&key, &["parent", "children"]), Some(root));
    assert_eq!(forest.reachable_leaves(root).len(), 1);
}

#[test]
fn test_polymorphic_node_from_one_of() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Holder }
types:
  - name: Holder
    fields:
      - { name: payload, type: Payload }
  - name: Payload
    oneOf: [A, B]
  - name: A
    fields:
      - { name: a, type: string }
  - name: B
    fields:
      - { name: b, type: string }
"#,
    )
    .unwrap();
    let forest = ResourceForest::build(&catalog, &RuleSet::default()).unwrap();
    let payload = forest.shared("Payload").unwrap();
    let NodeKind::Polymorphic { alternatives } = &forest.node(payload).kind else {
        panic!("Payload should be polymorphic");
    };
    assert_eq!(alternatives.len(), 2);
    assert_eq!(forest.reachable_leaves(payload).len(), 2);
}

#[test]
fn test_unknown_type_is_fatal() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Widget }
types:
  - name: Widget
    fields:
      - { name: part, type: "[]Gear" }
"#,
    )
    .unwrap();
    let result = ResourceForest::build(&catalog, &RuleSet::default());
    match result {
        Err(SchemaError::UnknownType {
            name,
            referenced_from,
        }) => {
            assert_eq!(name, "Gear");
            assert_eq!(referenced_from, "Widget.part");
        }
        other => panic!("expected unknown type, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_duplicate_kind_is_fatal() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { group: a.dev, version: v1, kind: Widget }
  - { group: b.dev, version: v1, kind: Widget }
types:
  - name: Widget
"#,
    )
    .unwrap();
    let result = ResourceForest::build(&catalog, &RuleSet::default());
    assert!(matches!(result, Err(SchemaError::DuplicateKind(kind)) if kind == "Widget"));
}

#[test]
fn test_duplicate_resource_is_fatal() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Widget }
  - { version: v1, kind: Widget }
types:
  - name: Widget
"#,
    )
    .unwrap();
    let result = ResourceForest::build(&catalog, &RuleSet::default());
    assert!(matches!(result, Err(SchemaError::DuplicateResource(_))));
}

#[test]
fn test_polymorphic_root_is_rejected() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Either }
types:
  - name: Either
    oneOf: [Left]
  - name: Left
"#,
    )
    .unwrap();
    let result = ResourceForest::build(&catalog, &RuleSet::default());
    assert!(matches!(result, Err(SchemaError::RootNotStruct(name)) if name == "Either"));
}

#[test]
fn test_self_referencing_polymorphic_type_is_rejected() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Holder }
types:
  - name: Holder
    fields:
      - { name: payload, type: Payload }
  - name: Payload
    oneOf: [Payload]
"#,
    )
    .unwrap();
    let result = ResourceForest::build(&catalog, &RuleSet::default());
    assert!(matches!(
        result,
        Err(SchemaError::NestedPolymorphic { name, alternative })
            if name == "Payload" && alternative == "Payload"
    ));
}

#[test]
fn test_mutually_polymorphic_types_are_rejected() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Holder }
types:
  - name: Holder
    fields:
      - { name: payload, type: A }
  - name: A
    oneOf: [B]
  - name: B
    oneOf: [A]
"#,
    )
    .unwrap();
    let result = ResourceForest::build(&catalog, &RuleSet::default());
    assert!(matches!(result, Err(SchemaError::NestedPolymorphic { .. })));
}

#[test]
fn test_polymorphic_alternative_from_rule_is_rejected() {
    let catalog = Catalog::from_yaml(
        r#"
resources:
  - { version: v1, kind: Holder }
types:
  - name: Holder
    fields:
      - { name: payload, type: Payload }
  - name: Payload
    oneOf: [A]
  - name: A
    fields:
      - { name: a, type: string }
"#,
    )
    .unwrap();
    let mut rules = RuleSet::default();
    rules
        .node
        .push(NodeRule::alternatives(Matcher::for_type("A"), &["Payload"]));
    let result = ResourceForest::build(&catalog, &rules);
    assert!(matches!(result, Err(SchemaError::NestedPolymorphic { .. })));
}

#[test]
fn test_builtin_catalog_covers_every_v1_group() {
    let forest = builtin_forest();
    for (group, kind) in [
        ("", "PersistentVolumeClaim"),
        ("", "Endpoints"),
        ("", "ResourceQuota"),
        ("apps", "DaemonSet"),
        ("apps", "ReplicaSet"),
        ("batch", "CronJob"),
        ("authentication.k8s.io", "TokenReview"),
        ("rbac.authorization.k8s.io", "RoleBinding"),
        ("networking.k8s.io", "NetworkPolicy"),
        ("networking.k8s.io", "Ingress"),
        ("scheduling.k8s.io", "PriorityClass"),
        ("storage.k8s.io", "StorageClass"),
    ] {
        let key = ResourceKey::new(group, "v1", kind);
        assert!(forest.contains(&key), "{} is not registered", key);
        assert_eq!(forest.resolve_kind(kind), Some(&key));
    }
    assert!(forest.resolve_kind("Event").is_none());
}

#[test]
fn test_cron_job_template_shares_job_spec() {
    let forest = builtin_forest();
    let cron = ResourceKey::new("batch", "v1", "CronJob");
    let job = ResourceKey::new("batch", "v1", "Job");
    let job_spec = forest.lookup(&job, &["spec"]);
    assert!(job_spec.is_some());
    assert_eq!(forest.lookup(&cron, &["spec", "jobTemplate", "spec"]), job_spec);
}
