//! # Admin Surface
//!
//! JSON endpoints consumed by the external configuration UI. Thin
//! orchestration over the core store, extractor, renderer, token mint, and
//! payload log; unlike ingestion, administrative operations surface full
//! errors because the caller is an operator.

use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router,
};
use hookbridge_core::{
    extract::{extract, parse_patterns, ValueMap},
    template,
    token_mint::{self, MintError},
    Alignment, PatternError, PayloadRecord, ServiceName, StoreError, TemplateError, Token,
    ValidationError, WebhookConfig,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};

/// Payload analysis descends at most this many levels
const ANALYZE_MAX_DEPTH: usize = 3;

/// Keys inspected per object level during analysis
const ANALYZE_MAX_KEYS_PER_LEVEL: usize = 15;

/// Total fields reported by one analysis
const ANALYZE_MAX_FIELDS: usize = 20;

/// Default entry count for recent-payload queries
const DEFAULT_RECENT_LIMIT: usize = 10;

/// Admin routes, merged into the main router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/configs", get(list_configs))
        .route("/api/config/{service}/{token}", get(get_config))
        .route("/api/config/{service}/{token}", delete(delete_config))
        .route("/api/save-config", post(save_config))
        .route("/api/analyze-payload", post(analyze_payload))
        .route("/api/test-config", post(test_config))
        .route("/api/generate-token", get(generate_token))
        .route("/api/webhook-logs/types", get(list_log_types))
        .route("/api/webhook-logs/{service}/recent", get(recent_logs))
}

// ============================================================================
// Configuration CRUD
// ============================================================================

/// List all configuration records, tokens included
#[instrument(skip(state))]
async fn list_configs(
    State(state): State<AppState>,
) -> Result<Json<ConfigListResponse>, AdminError> {
    let records = state.store.list().await?;
    let configurations: Vec<ConfigSummary> = records.iter().map(ConfigSummary::from).collect();

    Ok(Json(ConfigListResponse {
        total_count: configurations.len(),
        configurations,
    }))
}

/// Fetch one configuration record
#[instrument(skip_all)]
async fn get_config(
    State(state): State<AppState>,
    Path((service, token)): Path<(String, String)>,
) -> Result<Json<ConfigSummary>, AdminError> {
    let (service, token) = parse_record_path(&service, &token)?;
    let record = state.store.resolve(&service, &token).await?;
    Ok(Json(ConfigSummary::from(&record)))
}

/// Create or update a configuration
///
/// A request carrying a token updates the existing record (the token is
/// preserved); a request without one mints a fresh token and creates.
#[instrument(skip(state, request), fields(service = %request.service))]
async fn save_config(
    State(state): State<AppState>,
    Json(request): Json<SaveConfigRequest>,
) -> Result<Json<SaveConfigResponse>, AdminError> {
    let service = ServiceName::new(request.service.to_ascii_lowercase())?;
    let alignment: Alignment = request.alignment.parse()?;

    let record = match request.token {
        Some(token) => {
            let token = Token::new(token)?;
            state
                .store
                .update(
                    &service,
                    &token,
                    alignment,
                    request.fields,
                    request.template,
                )
                .await?
        }
        None => {
            let token = token_mint::mint_unique(&state.store).await?;
            let record = WebhookConfig {
                service,
                token,
                alignment,
                fields: request.fields,
                template: request.template,
            };
            state.store.create(record.clone()).await?;
            record
        }
    };

    info!(service = %record.service, "Saved webhook configuration");

    Ok(Json(SaveConfigResponse {
        status: "success".to_string(),
        config: ConfigSummary::from(&record),
    }))
}

/// Delete a configuration
///
/// Deleting the last record for a service also removes that service's
/// payload-log directory.
#[instrument(skip_all)]
async fn delete_config(
    State(state): State<AppState>,
    Path((service, token)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, AdminError> {
    let (service, token) = parse_record_path(&service, &token)?;
    let deleted = state.store.delete(&service, &token).await?;

    if deleted.last_for_service {
        if let Err(e) = state.payload_log.remove_service(&service).await {
            warn!(service = %service, error = %e, "Failed to remove payload log directory");
        }
    }

    info!(service = %service, "Deleted webhook configuration");

    Ok(Json(StatusResponse {
        status: "success".to_string(),
        message: format!("configuration for service '{}' deleted", service),
    }))
}

// ============================================================================
// Analysis and Dry Runs
// ============================================================================

/// Discover extractable leaf paths in a sample payload
///
/// Purely advisory; no state changes.
#[instrument(skip(request))]
async fn analyze_payload(
    Json(request): Json<AnalyzePayloadRequest>,
) -> Json<AnalyzePayloadResponse> {
    let mut fields = Vec::new();
    discover_fields(&request.payload, "", "", 0, &mut fields);
    fields.truncate(ANALYZE_MAX_FIELDS);

    Json(AnalyzePayloadResponse {
        webhook_type: request.webhook_type,
        total_fields: fields.len(),
        fields,
    })
}

/// Run a configuration against a sample payload without persisting anything
#[instrument(skip(request))]
async fn test_config(
    Json(request): Json<TestConfigRequest>,
) -> Result<Json<TestConfigResponse>, AdminError> {
    let patterns = parse_patterns(&request.fields)?;
    template::validate(&request.template)?;

    let extracted = extract(&request.payload, &patterns);
    let generated_message = template::render(&request.template, &extracted)
        .map_err(AdminError::from)?;

    Ok(Json(TestConfigResponse {
        generated_message,
        extracted,
    }))
}

/// Mint a token validated for uniqueness but not yet bound
#[instrument(skip(state))]
async fn generate_token(
    State(state): State<AppState>,
) -> Result<Json<TokenResponse>, AdminError> {
    let token = token_mint::mint_unique(&state.store).await?;
    Ok(Json(TokenResponse {
        token: token.to_string(),
    }))
}

// ============================================================================
// Payload Log Queries
// ============================================================================

/// Services that currently have a payload-log directory
#[instrument(skip(state))]
async fn list_log_types(
    State(state): State<AppState>,
) -> Result<Json<LogTypesResponse>, AdminError> {
    let types = state
        .payload_log
        .service_dirs()
        .await
        .map_err(|e| AdminError::Internal {
            message: e.to_string(),
        })?;
    Ok(Json(LogTypesResponse { types }))
}

/// Recent payload records for a service, newest first
#[instrument(skip(state, params))]
async fn recent_logs(
    State(state): State<AppState>,
    Path(service): Path<String>,
    Query(params): Query<RecentParams>,
) -> Result<Json<RecentLogsResponse>, AdminError> {
    let service =
        ServiceName::new(service.to_ascii_lowercase()).map_err(|_| AdminError::NotFound)?;
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);

    let entries = state
        .payload_log
        .recent(&service, limit)
        .await
        .map_err(|e| AdminError::Internal {
            message: e.to_string(),
        })?;

    Ok(Json(RecentLogsResponse {
        service: service.to_string(),
        count: entries.len(),
        entries,
    }))
}

// ============================================================================
// Payload Analysis
// ============================================================================

/// Walk a payload collecting leaf fields only
///
/// Leaves are primitives and arrays of primitives; objects and arrays of
/// objects are containers to recurse into. For arrays the first element
/// stands in for the shape of the rest.
fn discover_fields(
    value: &Value,
    path: &str,
    pattern: &str,
    depth: usize,
    fields: &mut Vec<FieldInfo>,
) {
    if depth > ANALYZE_MAX_DEPTH || fields.len() >= ANALYZE_MAX_FIELDS {
        return;
    }

    let Value::Object(map) = value else {
        return;
    };

    for (key, child) in map.iter().take(ANALYZE_MAX_KEYS_PER_LEVEL) {
        if fields.len() >= ANALYZE_MAX_FIELDS {
            return;
        }

        let child_path = if path.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", path, key)
        };
        let child_pattern = if pattern.is_empty() {
            key.clone()
        } else {
            format!("{}{{{}}}", pattern, key)
        };

        if is_leaf_value(child) {
            fields.push(FieldInfo {
                path: child_path.clone(),
                pattern: child_pattern.clone(),
                field_type: field_type(child).to_string(),
                sample_value: sample_value(child),
                is_array: child.is_array(),
                array_length: child.as_array().map(|a| a.len()),
            });
        }

        match child {
            Value::Object(_) => {
                discover_fields(child, &child_path, &child_pattern, depth + 1, fields);
            }
            Value::Array(items) => {
                if let Some(first @ Value::Object(_)) = items.first() {
                    discover_fields(first, &child_path, &child_pattern, depth + 1, fields);
                }
            }
            _ => {}
        }
    }
}

fn is_leaf_value(value: &Value) -> bool {
    match value {
        Value::Object(_) => false,
        Value::Array(items) => match items.first() {
            Some(first) => !first.is_object() && !first.is_array(),
            None => true,
        },
        _ => true,
    }
}

fn field_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Sample for UI display, truncated for long strings and summarised for
/// containers
fn sample_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 100 => {
            Value::String(format!("{}...", s.chars().take(100).collect::<String>()))
        }
        Value::Array(items) => Value::String(format!("[{} items]", items.len())),
        Value::Object(map) => Value::String(format!("{{object with {} fields}}", map.len())),
        other => other.clone(),
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

/// Save-config request body
#[derive(Debug, Deserialize)]
pub struct SaveConfigRequest {
    pub service: String,
    pub fields: String,
    pub template: String,
    #[serde(default)]
    pub alignment: String,
    #[serde(default)]
    pub token: Option<String>,
}

/// One configuration record in API form
#[derive(Debug, Serialize)]
pub struct ConfigSummary {
    pub service: String,
    pub token: String,
    pub alignment: String,
    pub fields: String,
    pub template: String,
}

impl From<&WebhookConfig> for ConfigSummary {
    fn from(record: &WebhookConfig) -> Self {
        Self {
            service: record.service.to_string(),
            token: record.token.to_string(),
            alignment: record.alignment.to_string(),
            fields: record.fields.clone(),
            template: record.template.clone(),
        }
    }
}

/// Configuration list response
#[derive(Debug, Serialize)]
pub struct ConfigListResponse {
    pub configurations: Vec<ConfigSummary>,
    pub total_count: usize,
}

/// Save-config response
#[derive(Debug, Serialize)]
pub struct SaveConfigResponse {
    pub status: String,
    pub config: ConfigSummary,
}

/// Generic status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub message: String,
}

/// Analyze-payload request body
#[derive(Debug, Deserialize)]
pub struct AnalyzePayloadRequest {
    pub payload: Value,
    #[serde(default)]
    pub webhook_type: Option<String>,
}

/// One discovered field
#[derive(Debug, Serialize)]
pub struct FieldInfo {
    pub path: String,
    pub pattern: String,
    pub field_type: String,
    pub sample_value: Value,
    pub is_array: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_length: Option<usize>,
}

/// Analyze-payload response
#[derive(Debug, Serialize)]
pub struct AnalyzePayloadResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_type: Option<String>,
    pub total_fields: usize,
    pub fields: Vec<FieldInfo>,
}

/// Test-config request body
#[derive(Debug, Deserialize)]
pub struct TestConfigRequest {
    pub fields: String,
    pub template: String,
    pub payload: Value,
}

/// Test-config response
#[derive(Debug, Serialize)]
pub struct TestConfigResponse {
    pub generated_message: String,
    pub extracted: ValueMap,
}

/// Freshly minted token response
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Log-types response
#[derive(Debug, Serialize)]
pub struct LogTypesResponse {
    pub types: Vec<String>,
}

/// Recent-logs query parameters
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

/// Recent-logs response
#[derive(Debug, Serialize)]
pub struct RecentLogsResponse {
    pub service: String,
    pub count: usize,
    pub entries: Vec<PayloadRecord>,
}

// ============================================================================
// Errors
// ============================================================================

/// Admin surface errors with HTTP status mapping
///
/// Validation faults answer 400, token collisions 409, unknown records 404.
/// Messages never echo a token.
#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("configuration not found")]
    NotFound,

    #[error("token already bound to a configuration")]
    TokenCollision,

    #[error("invalid field pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("invalid template: {0}")]
    Template(#[from] TemplateError),

    #[error("invalid configuration: {message}")]
    BadConfig { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl From<StoreError> for AdminError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => Self::NotFound,
            StoreError::TokenCollision => Self::TokenCollision,
            StoreError::Pattern(e) => Self::Pattern(e),
            StoreError::Template(e) => Self::Template(e),
            StoreError::Config { message } => Self::BadConfig { message },
            StoreError::Io { message } => Self::Internal { message },
        }
    }
}

impl From<ValidationError> for AdminError {
    fn from(e: ValidationError) -> Self {
        Self::BadConfig {
            message: e.to_string(),
        }
    }
}

impl From<MintError> for AdminError {
    fn from(e: MintError) -> Self {
        match e {
            MintError::Store(e) => e.into(),
            MintError::Exhausted { .. } => Self::Internal {
                message: e.to_string(),
            },
        }
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::TokenCollision => StatusCode::CONFLICT,
            Self::Pattern(_) | Self::Template(_) | Self::BadConfig { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::Internal { message } => {
                tracing::error!(error = %message, "Admin operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

/// Parse `{service}/{token}` path components; malformed components map to
/// NotFound so nothing about the token space leaks
fn parse_record_path(service: &str, token: &str) -> Result<(ServiceName, Token), AdminError> {
    let service =
        ServiceName::new(service.to_ascii_lowercase()).map_err(|_| AdminError::NotFound)?;
    let token = Token::new(token).map_err(|_| AdminError::NotFound)?;
    Ok((service, token))
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
