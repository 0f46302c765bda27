use std::path::Path;

use k8s_openapi::api::admissionregistration::v1::{
    RuleWithOperations, ServiceReference, ValidatingWebhook, ValidatingWebhookConfiguration,
    WebhookClientConfig,
};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use k8s_openapi::ByteString;
use kube::api::PostParams;
use kube::Api;

use apicov_core::config::WebhookConfig;
use apicov_core::ResourceKey;

use super::{client, ClusterError};

/// DELETE carries no object, so there is nothing to cover.
const OPERATIONS: [&str; 3] = ["CREATE", "UPDATE", "CONNECT"];

/// Create (or replace) the ValidatingWebhookConfiguration routing every
/// registered kind to this webhook, owned by the component's Deployment.
pub async fn register_webhook(
    config: &WebhookConfig,
    kinds: &[ResourceKey],
    port: u16,
) -> Result<(), ClusterError> {
    let client = client().await?;

    let deployments: Api<Deployment> = Api::namespaced(client.clone(), &config.namespace);
    let deployment = deployments.get(&config.component).await.map_err(|e| {
        ClusterError::kube(
            format!("retrieve deployment {}/{}", config.namespace, config.component),
            e,
        )
    })?;
    let owner = controller_ref(&deployment, config)?;

    let ca_bundle = match &config.ca_bundle_file {
        Some(path) => Some(read_ca_bundle(Path::new(path))?),
        None => {
            tracing::warn!("no CA bundle configured, the API server will use its default trust");
            None
        }
    };

    let mut desired = webhook_configuration(config, kinds, port, owner, ca_bundle);

    let api: Api<ValidatingWebhookConfiguration> = Api::all(client);
    let params = PostParams::default();
    match api.create(&params, &desired).await {
        Ok(_) => {}
        Err(kube::Error::Api(ref err)) if err.code == 409 => {
            tracing::info!(name = %config.name, "webhook configuration exists, replacing");
            let existing = api
                .get(&config.name)
                .await
                .map_err(|e| ClusterError::kube("retrieve webhook configuration", e))?;
            desired.metadata.resource_version = existing.metadata.resource_version;
            api.replace(&config.name, &params, &desired)
                .await
                .map_err(|e| ClusterError::kube("replace webhook configuration", e))?;
        }
        Err(e) => return Err(ClusterError::kube("create webhook configuration", e)),
    }

    tracing::info!(
        name = %config.name,
        namespace = %config.namespace,
        deployment = %config.component,
        kinds = kinds.len(),
        "registered webhook"
    );
    Ok(())
}

/// The webhook configuration for `kinds`. Failures are ignored by the API
/// server so an unavailable webhook never blocks the cluster.
pub fn webhook_configuration(
    config: &WebhookConfig,
    kinds: &[ResourceKey],
    port: u16,
    owner: OwnerReference,
    ca_bundle: Option<Vec<u8>>,
) -> ValidatingWebhookConfiguration {
    ValidatingWebhookConfiguration {
        metadata: ObjectMeta {
            name: Some(config.name.clone()),
            owner_references: Some(vec![owner]),
            ..Default::default()
        },
        webhooks: Some(vec![ValidatingWebhook {
            name: config.name.clone(),
            rules: Some(validation_rules(kinds)),
            client_config: WebhookClientConfig {
                service: Some(ServiceReference {
                    namespace: config.namespace.clone(),
                    name: config.component.clone(),
                    path: Some("/".to_string()),
                    port: Some(i32::from(port)),
                }),
                ca_bundle: ca_bundle.map(ByteString),
                url: None,
            },
            failure_policy: Some("Ignore".to_string()),
            side_effects: "None".to_string(),
            admission_review_versions: vec!["v1".to_string(), "v1beta1".to_string()],
            ..Default::default()
        }]),
    }
}

/// One rule per kind, covering the resource and all of its subresources.
pub fn validation_rules(kinds: &[ResourceKey]) -> Vec<RuleWithOperations> {
    kinds
        .iter()
        .map(|key| {
            let plural = pluralize(&key.kind);
            RuleWithOperations {
                api_groups: Some(vec![key.group.clone()]),
                api_versions: Some(vec![key.version.clone()]),
                operations: Some(OPERATIONS.iter().map(|op| op.to_string()).collect()),
                resources: Some(vec![plural.clone(), format!("{}/*", plural)]),
                scope: None,
            }
        })
        .collect()
}

/// Lowercase English plural of a kind name, as used in resource paths.
pub fn pluralize(kind: &str) -> String {
    let lower = kind.to_lowercase();
    if lower.ends_with("endpoints") {
        return lower;
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{}ies", stem);
        }
    }
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{}es", lower);
    }
    format!("{}s", lower)
}

fn controller_ref(
    deployment: &Deployment,
    config: &WebhookConfig,
) -> Result<OwnerReference, ClusterError> {
    let uid = deployment
        .metadata
        .uid
        .clone()
        .ok_or_else(|| ClusterError::MissingUid {
            namespace: config.namespace.clone(),
            name: config.component.clone(),
        })?;
    Ok(OwnerReference {
        api_version: "apps/v1".to_string(),
        kind: "Deployment".to_string(),
        name: deployment
            .metadata
            .name
            .clone()
            .unwrap_or_else(|| config.component.clone()),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

fn read_ca_bundle(path: &Path) -> Result<Vec<u8>, ClusterError> {
    std::fs::read(path).map_err(|source| ClusterError::CaBundle {
        path: path.to_path_buf(),
        source,
    })
}
