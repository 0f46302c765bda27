//! Admission webhook and coverage query API.
//!
//! One process hosts both: the API server posts admission reviews to `/`,
//! and the collect client reads coverage back from the query endpoints.
//! Recording happens off the request path on a single worker fed by the
//! intake queue. The listener speaks HTTPS when a certificate and key are
//! configured.
//!
//! # Module Structure
//!
//! - `handlers` - HTTP route handlers
//! - `models` - query parameters and response bodies

mod handlers;
mod models;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::{JoinError, JoinHandle};
use axum_server::tls_rustls::RustlsConfig;
use tower_http::trace::TraceLayer;

use apicov_core::admission::spawn_recorder;
use apicov_core::config::{ServerConfig, TlsFiles};
use apicov_core::{Config, Engine, EngineError, IntakeQueue, ResourceKey};

use crate::cluster::{self, ClusterError};

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Server(#[source] std::io::Error),

    #[error(
        "Registering the webhook requires TLS: set server.tls_cert_file and server.tls_key_file"
    )]
    TlsRequired,

    #[error(
        "Failed to load TLS certificate {} and key {}: {source}",
        files.cert.display(),
        files.key.display()
    )]
    Tls {
        files: TlsFiles,
        #[source]
        source: std::io::Error,
    },

    #[error("Server task failed: {0}")]
    Task(#[from] JoinError),

    #[error("Webhook registration failed: {0}")]
    Registration(#[from] ClusterError),
}

// =============================================================================
// Application State
// =============================================================================

/// Shared application state for the server.
pub struct AppState {
    pub engine: Engine,
    /// Hand-off to the recorder worker.
    pub queue: IntakeQueue,
    pub started_at: DateTime<Utc>,
}

/// Build the router with every endpoint.
pub fn router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    Router::new()
        // Admission reviews from the API server
        .route("/", post(handlers::admit))
        // Query API
        .route("/resourcecoverage", get(handlers::resource_coverage))
        .route("/totalcoverage", get(handlers::total_coverage))
        .route(
            "/resourcepercentagecoverage",
            get(handlers::percentage_coverage),
        )
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// Server Entry Point
// =============================================================================

/// How long in-flight TLS connections get to finish after a shutdown signal.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Run the webhook until a shutdown signal arrives.
///
/// With `register`, the webhook configuration is created once the
/// registration delay has passed. A registration failure stops the server.
pub async fn run(config: Config, register: bool) -> Result<(), ServeError> {
    let tls = match tls_files(&config.server, register)? {
        Some(files) => Some(load_tls(files).await?),
        None => None,
    };
    let engine = Engine::from_config(&config.coverage)?;
    let kinds: Vec<ResourceKey> = engine.store.forest().keys().cloned().collect();

    let (queue, receiver) = IntakeQueue::new(
        config.intake.queue_capacity,
        config.intake.overflow,
        config.intake.block_timeout(),
    );
    let worker = spawn_recorder(engine.recorder.clone(), receiver);

    let state = Arc::new(AppState {
        engine,
        queue,
        started_at: Utc::now(),
    });
    let app = router(state, config.server.max_body_bytes);

    let address = config.server.socket_address();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| ServeError::Bind {
            address: address.clone(),
            source,
        })?;
    tracing::info!(
        address = %address,
        kinds = kinds.len(),
        overflow = ?config.intake.overflow,
        tls = tls.is_some(),
        "apicov webhook listening"
    );

    let mut server = match tls {
        Some(tls_config) => {
            let listener = listener.into_std().map_err(ServeError::Server)?;
            let handle = axum_server::Handle::new();
            tokio::spawn(shutdown_on_signal(handle.clone()));
            tokio::spawn(async move {
                axum_server::from_tcp_rustls(listener, tls_config)
                    .handle(handle)
                    .serve(app.into_make_service())
                    .await
            })
        }
        None => {
            tracing::warn!("serving plain HTTP; the API server only calls webhooks over HTTPS");
            tokio::spawn(async move {
                axum::serve(listener, app)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
            })
        }
    };

    if register {
        let webhook = config.webhook.clone();
        let port = config.server.port;
        tokio::select! {
            joined = &mut server => return finish(joined, worker).await,
            registered = async {
                tokio::time::sleep(webhook.registration_delay()).await;
                cluster::register_webhook(&webhook, &kinds, port).await
            } => registered?,
        }
    }

    finish(server.await, worker).await
}

async fn finish(
    joined: Result<std::io::Result<()>, JoinError>,
    worker: JoinHandle<()>,
) -> Result<(), ServeError> {
    joined?.map_err(ServeError::Server)?;
    // The router held the last queue sender; the worker drains and exits.
    tracing::info!("server stopped, draining intake queue");
    worker.await?;
    Ok(())
}

/// TLS material for the listener. The API server only calls webhooks over
/// HTTPS, so registering without it is refused.
fn tls_files(server: &ServerConfig, register: bool) -> Result<Option<TlsFiles>, ServeError> {
    let files = server.tls_files();
    if register && files.is_none() {
        return Err(ServeError::TlsRequired);
    }
    Ok(files)
}

async fn load_tls(files: TlsFiles) -> Result<RustlsConfig, ServeError> {
    // Another dependency may already have installed a provider.
    let _ = rustls::crypto::ring::default_provider().install_default();
    match RustlsConfig::from_pem_file(&files.cert, &files.key).await {
        Ok(config) => Ok(config),
        Err(source) => Err(ServeError::Tls { files, source }),
    }
}

async fn shutdown_on_signal(handle: axum_server::Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
