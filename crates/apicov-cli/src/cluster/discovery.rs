use k8s_openapi::api::core::v1::{Node, Service};
use kube::api::ListParams;
use kube::Api;

use apicov_core::config::WebhookConfig;

use super::{client, ClusterError};

/// Look up the webhook's Service and turn it into an `https://host:port`
/// base URI.
pub async fn discover_webhook_uri(config: &WebhookConfig) -> Result<String, ClusterError> {
    let client = client().await?;

    let services: Api<Service> = Api::namespaced(client.clone(), &config.namespace);
    let service = services.get(&config.component).await.map_err(|e| {
        ClusterError::kube(
            format!("retrieve service {}/{}", config.namespace, config.component),
            e,
        )
    })?;

    let nodes = if service_type(&service) == Some("NodePort") {
        let nodes: Api<Node> = Api::all(client);
        nodes
            .list(&ListParams::default())
            .await
            .map_err(|e| ClusterError::kube("list nodes", e))?
            .items
    } else {
        Vec::new()
    };

    service_uri(&service, &nodes)
}

/// Base URI for a Service.
///
/// LoadBalancer services use the first ingress (IP, else hostname) and the
/// first service port. NodePort services use the first node's first address
/// and the first port's node port. Other types cannot be reached from
/// outside the cluster.
pub fn service_uri(service: &Service, nodes: &[Node]) -> Result<String, ClusterError> {
    let unreachable = |reason: String| ClusterError::Unreachable {
        namespace: service.metadata.namespace.clone().unwrap_or_default(),
        name: service.metadata.name.clone().unwrap_or_default(),
        reason,
    };

    let kind = service_type(service).unwrap_or("ClusterIP");
    let first_port = service
        .spec
        .as_ref()
        .and_then(|spec| spec.ports.as_ref())
        .and_then(|ports| ports.first());

    match kind {
        "LoadBalancer" => {
            let ingress = service
                .status
                .as_ref()
                .and_then(|status| status.load_balancer.as_ref())
                .and_then(|lb| lb.ingress.as_ref())
                .and_then(|ingress| ingress.first())
                .ok_or_else(|| unreachable("found zero ingress instances".to_string()))?;
            let host = ingress
                .ip
                .as_ref()
                .or(ingress.hostname.as_ref())
                .ok_or_else(|| unreachable("ingress has neither ip nor hostname".to_string()))?;
            let port = first_port
                .map(|p| p.port)
                .ok_or_else(|| unreachable("service has no ports".to_string()))?;
            Ok(format!("https://{}:{}", host, port))
        }
        "NodePort" => {
            let node = nodes
                .first()
                .ok_or_else(|| unreachable("found zero nodes".to_string()))?;
            let address = node
                .status
                .as_ref()
                .and_then(|status| status.addresses.as_ref())
                .and_then(|addresses| addresses.first())
                .ok_or_else(|| {
                    unreachable(format!(
                        "found zero addresses for node {}",
                        node.metadata.name.as_deref().unwrap_or_default()
                    ))
                })?;
            let port = first_port
                .and_then(|p| p.node_port)
                .ok_or_else(|| unreachable("service has no node port".to_string()))?;
            Ok(format!("https://{}:{}", address.address, port))
        }
        other => Err(unreachable(format!("unsupported service type {}", other))),
    }
}

fn service_type(service: &Service) -> Option<&str> {
    service.spec.as_ref().and_then(|spec| spec.type_.as_deref())
}
