//! Rules shipped for the built-in catalog.

use super::{
    DisplayRule, DisplayRules, FieldRule, FieldRules, Matcher, NodeRule, NodeRules, RuleSet,
};

/// Server-populated bookkeeping that tests cannot meaningfully exercise.
const EXCLUDED_PATHS: &[&str] = &["ObjectMeta.managedFields"];

/// Free-form positions whose distinct values are unbounded; only presence is
/// worth recording.
const PRESENCE_ONLY_PATHS: &[&str] = &[
    "ObjectMeta.name",
    "ObjectMeta.generateName",
    "ObjectMeta.namespace",
    "ObjectMeta.uid",
    "ObjectMeta.resourceVersion",
    "ObjectMeta.creationTimestamp",
    "ObjectMeta.deletionTimestamp",
    "ObjectMeta.labels",
    "ObjectMeta.annotations",
    "ConfigMap.data",
    "ConfigMap.binaryData",
    "Secret.data",
    "Secret.stringData",
    "OwnerReference.uid",
    "ControllerRevision.data",
    "TokenReviewSpec.token",
    "StorageClass.parameters",
    "CSIPersistentVolumeSource.volumeAttributes",
];

pub(super) fn rules() -> RuleSet {
    let mut node = NodeRules::default();
    for path in EXCLUDED_PATHS {
        node.push(NodeRule::exclude(Matcher::for_path(*path)));
    }

    let mut field = FieldRules::default();
    for path in PRESENCE_ONLY_PATHS {
        field.push(FieldRule::presence_only(Matcher::for_path(*path)));
    }
    field.push(FieldRule::enumerated(
        Matcher::for_type("boolean"),
        &["true", "false"],
    ));

    let display = DisplayRules::new(vec![
        DisplayRule::new(Matcher::for_path("ObjectMeta.labels"), "labels (any)"),
        DisplayRule::new(Matcher::for_path("ObjectMeta.annotations"), "annotations (any)"),
        DisplayRule::new(
            Matcher::for_path("ResourceRequirements.limits"),
            "limits (per resource)",
        ),
        DisplayRule::new(
            Matcher::for_path("ResourceRequirements.requests"),
            "requests (per resource)",
        ),
    ]);

    RuleSet {
        node,
        field,
        display,
    }
}
