//! # HookBridge HTTP Service
//!
//! HTTP front for the webhook ingestion gateway.
//!
//! This crate wires the core pipeline to the network:
//! - `POST /webhook/{service}/{token}` — token-authenticated ingestion
//! - `GET /health`, `GET /` — liveness and banner
//! - `/api/...` — the administrative surface consumed by the external UI
//!
//! Ingestion prefers accepting a webhook over reflecting faults: once the
//! `(service, token)` pair resolves, extraction, rendering, and sink
//! failures all answer 200 with a descriptive body so the upstream service
//! does not retry, and the outcome lands in the payload log instead.

// Public modules
pub mod admin;
pub mod config;
pub mod retry;
pub mod sink;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use bytes::Bytes;
use hookbridge_core::{
    extract::extract, template, ConfigStore, PayloadLogger, PayloadRecord, ProcessingStatus,
    ServiceName, StoreError, Timestamp, Token, WebhookConfig,
};
use serde::Serialize;
use serde_json::Value;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

pub use config::{AppConfig, ConfigError};
pub use sink::{HttpSinkClient, SinkClient, SinkError};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Webhook configuration store
    pub store: Arc<ConfigStore>,

    /// Rotating per-service payload log
    pub payload_log: Arc<PayloadLogger>,

    /// Sink delivery client
    pub sink: Arc<dyn SinkClient>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: AppConfig,
        store: Arc<ConfigStore>,
        payload_log: Arc<PayloadLogger>,
        sink: Arc<dyn SinkClient>,
    ) -> Self {
        Self {
            config,
            store,
            payload_log,
            sink,
        }
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

/// Create HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let webhook_routes =
        Router::new().route("/webhook/{service}/{token}", post(handle_webhook));

    let health_routes = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(admin::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server with graceful shutdown
pub async fn start_server(state: AppState) -> Result<(), ServiceError> {
    let host: IpAddr =
        state
            .config
            .server
            .host
            .parse()
            .map_err(|_| ServiceError::Configuration(ConfigError::Invalid {
                message: format!("invalid bind host '{}'", state.config.server.host),
            }))?;
    let addr = SocketAddr::new(host, state.config.server.port);

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: addr.to_string(),
            message: e.to_string(),
        })?;

    info!("Starting HTTP server on {}", addr);

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to install Ctrl+C signal handler: {}", e);
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => error!("Failed to install SIGTERM signal handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
            },
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown");
            },
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServiceError::ServerFailed {
            message: e.to_string(),
        })?;

    info!("HTTP server shutdown complete");
    Ok(())
}

// ============================================================================
// Webhook Ingestion
// ============================================================================

/// Handle a token-authenticated webhook
///
/// Path components are lowercased on the service side before lookup; the
/// token is opaque and compared verbatim. An unknown `(service, token)` pair
/// answers 404 without echoing the token. Everything after resolution
/// answers 200: empty or non-JSON bodies are accepted and ignored, and
/// pipeline failures are described in the body and recorded in the payload
/// log rather than reflected as errors.
#[instrument(skip_all, fields(service = tracing::field::Empty))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    Path((service, token)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, IngestError> {
    let service = ServiceName::new(service.to_ascii_lowercase())
        .map_err(|_| IngestError::NotFound)?;
    tracing::Span::current().record("service", service.as_str());

    let token = Token::new(token).map_err(|_| IngestError::NotFound)?;

    let webhook_config = state
        .store
        .resolve(&service, &token)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => IngestError::NotFound,
            other => IngestError::Internal {
                message: other.to_string(),
            },
        })?;

    info!(content_length = body.len(), "Received webhook");

    // Lenient body handling: anything that is not a usable JSON payload is
    // accepted with an informational response and goes no further.
    if body.is_empty() {
        return Ok(Json(WebhookResponse::informational(
            "empty payload accepted and ignored",
        )));
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(_) => {
            return Ok(Json(WebhookResponse::informational(
                "non-JSON payload accepted and ignored",
            )));
        }
    };

    if payload_is_empty(&payload) {
        return Ok(Json(WebhookResponse::informational(
            "empty payload accepted and ignored",
        )));
    }

    let budget = Duration::from_secs(state.config.limits.processing_timeout_seconds);
    let outcome = tokio::time::timeout(
        budget,
        run_pipeline(&state, &webhook_config, &payload),
    )
    .await;

    let result = match outcome {
        Ok(result) => result,
        Err(_) => {
            warn!(
                budget_seconds = state.config.limits.processing_timeout_seconds,
                "Webhook processing exceeded its budget"
            );
            PipelineResult {
                status: ProcessingStatus::Failure,
                generated_message: None,
                response_message: "webhook accepted but processing exceeded its time budget"
                    .to_string(),
            }
        }
    };

    // The outcome is recorded outside the budget so a timeout still lands in
    // the payload log. Log failures never fail the request.
    let record = PayloadRecord {
        timestamp: Timestamp::now(),
        webhook_type: service.to_string(),
        payload,
        source_ip: client_ip(&headers),
        user_agent: client_user_agent(&headers),
        processing_status: result.status,
        generated_message: result.generated_message.clone(),
        content_length: Some(body.len() as u64),
    };
    if let Err(e) = state.payload_log.append(&service, &record).await {
        warn!(error = %e, "Failed to append payload log entry");
    }

    let status = match result.status {
        ProcessingStatus::Success => "success",
        ProcessingStatus::Failure => "error",
    };

    Ok(Json(WebhookResponse {
        status: status.to_string(),
        message: result.response_message,
        generated_message: result.generated_message,
        service_token: Some(webhook_config.key()),
    }))
}

/// Outcome of the extract → render → send pipeline
struct PipelineResult {
    status: ProcessingStatus,
    generated_message: Option<String>,
    response_message: String,
}

async fn run_pipeline(
    state: &AppState,
    webhook_config: &WebhookConfig,
    payload: &Value,
) -> PipelineResult {
    let failure = |response_message: String| PipelineResult {
        status: ProcessingStatus::Failure,
        generated_message: None,
        response_message,
    };

    // Stored configurations are validated at write time; a parse failure
    // here means the file was edited by hand.
    let patterns = match webhook_config.field_patterns() {
        Ok(patterns) => patterns,
        Err(e) => {
            error!(error = %e, "Stored fields expression failed to parse");
            return failure(format!("stored fields expression is invalid: {}", e));
        }
    };

    let values = extract(payload, &patterns);

    let rendered = match template::render(&webhook_config.template, &values) {
        Ok(rendered) => rendered,
        Err(e) => {
            error!(error = %e, "Stored template failed to render");
            return failure(format!("stored template is invalid: {}", e));
        }
    };

    let message = format!(
        "{}:{}:{}",
        webhook_config.service, webhook_config.token, rendered
    );
    let aligned_resource = webhook_config.alignment.aligned_resource();

    match state.sink.send(&message, &aligned_resource).await {
        Ok(()) => {
            info!("Webhook processed and forwarded to sink");
            PipelineResult {
                status: ProcessingStatus::Success,
                generated_message: Some(message),
                response_message: "webhook processed and forwarded to sink".to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, "Sink delivery failed");
            PipelineResult {
                status: ProcessingStatus::Failure,
                generated_message: Some(message),
                response_message: format!("webhook accepted but sink delivery failed: {}", e),
            }
        }
    }
}

/// Null, `{}`, and `[]` payloads are treated like an empty body
fn payload_is_empty(payload: &Value) -> bool {
    match payload {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Client address as reported by the front proxy
fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim().to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}

fn client_user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

// ============================================================================
// Health Handlers
// ============================================================================

/// Service banner
async fn handle_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "hookbridge is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Health check for load balancers and monitoring
#[instrument(skip(state))]
async fn handle_health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    match state.store.list().await {
        Ok(records) => {
            let webhook_types = records
                .iter()
                .map(|r| r.service.as_str())
                .collect::<std::collections::BTreeSet<_>>()
                .len();

            Ok(Json(HealthResponse {
                status: "healthy".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                webhook_types,
                timestamp: Timestamp::now(),
            }))
        }
        Err(e) => {
            error!(error = %e, "Health check failed to read configuration store");
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// Webhook ingestion response
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_token: Option<String>,
}

impl WebhookResponse {
    fn informational(message: &str) -> Self {
        Self {
            status: "success".to_string(),
            message: message.to_string(),
            generated_message: None,
            service_token: None,
        }
    }
}

/// Service banner response
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: String,
    pub version: String,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub webhook_types: usize,
    pub timestamp: Timestamp,
}

// ============================================================================
// Error Types
// ============================================================================

/// Ingestion errors that surface as HTTP statuses
///
/// Responses never echo the token.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Unknown service or token
    #[error("unknown webhook endpoint")]
    NotFound,

    /// Unexpected server-side failure before the pipeline started
    #[error("internal error")]
    Internal { message: String },
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound => (StatusCode::NOT_FOUND, "unknown webhook endpoint"),
            Self::Internal { message } => {
                error!(error = %message, "Webhook resolution failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message,
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("server failed: {message}")]
    ServerFailed { message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
