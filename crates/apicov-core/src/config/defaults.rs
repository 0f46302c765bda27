//! Default values for apicov configuration.
//!
//! All hardcoded defaults are centralized here for easy maintenance.

// ============================================================================
// Server Defaults
// ============================================================================

/// Default address the webhook server binds to.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

/// Default webhook server port.
pub const DEFAULT_PORT: u16 = 8443;

/// Maximum accepted admission review body (6 MiB, above the API server's own limit).
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

// ============================================================================
// Intake Defaults
// ============================================================================

/// Capacity of the intake queue between admission and the recorder.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// How long a full queue may hold up an admission response (milliseconds).
pub const DEFAULT_BLOCK_TIMEOUT_MS: u64 = 1000;

// ============================================================================
// Coverage Defaults
// ============================================================================

/// Environment variable naming the directory of bundled data files.
pub const KO_DATA_PATH_ENV: &str = "KO_DATA_PATH";

/// Default data directory when `KO_DATA_PATH` is not set.
pub const DEFAULT_DATA_DIR: &str = ".";

/// File name of the ignored-fields list inside the data directory.
pub const DEFAULT_IGNORED_FIELDS_FILE: &str = "ignoredfields.yaml";

// ============================================================================
// Webhook Defaults
// ============================================================================

/// Name of the ValidatingWebhookConfiguration and its webhook entry.
pub const DEFAULT_WEBHOOK_NAME: &str = "apicoverage-webhook.sigs.k8s.io";

/// Namespace the webhook component runs in.
pub const DEFAULT_NAMESPACE: &str = "k8s-api-coverage";

/// Name shared by the webhook's Deployment and Service.
pub const DEFAULT_COMPONENT: &str = "apicoverage-webhook";

/// Delay before registering, giving the server time to start listening.
pub const DEFAULT_REGISTRATION_DELAY_SECS: u64 = 2;

// ============================================================================
// Client Defaults
// ============================================================================

/// Environment variable naming the artifacts directory.
pub const ARTIFACTS_ENV: &str = "ARTIFACTS";

/// Default artifacts directory when `ARTIFACTS` is not set.
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Timeout for each query API request (seconds).
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Logging Defaults
// ============================================================================

/// Default log level filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";
