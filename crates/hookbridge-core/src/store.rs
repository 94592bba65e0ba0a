//! # Configuration Store
//!
//! Owns the on-disk webhook configuration file and exposes the only
//! operations that touch it. Readers re-parse the file on every lookup, so a
//! rewrite is visible to the next request with no reload signal; writers
//! render the full file into a sibling temporary file and atomically rename
//! it over the target, so a reader sees either the pre-image or the
//! post-image, never a torn file. Every write is preceded by a timestamped
//! backup copy.
//!
//! ## File format
//!
//! ```text
//! [webhooks]
//! <service>_<token>|<alignment>|<fields>|<template>
//! ```
//!
//! Two legacy line forms are still read: `<service>_<token> = <fields>::<template>`
//! (no alignment) and `<service> = <fields>::<template>` (no token, assigned
//! the synthetic token `legacy`). Both normalise to the pipe form on the
//! first write.

use crate::extract::{parse_patterns, FieldPattern, PatternError};
use crate::template::{self, TemplateError};
use crate::{Alignment, ServiceName, Timestamp, Token};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

// ============================================================================
// Records
// ============================================================================

/// One webhook configuration
///
/// `(service, token)` uniquely identifies a record; the token is unique
/// across the whole store regardless of service.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookConfig {
    pub service: ServiceName,
    pub token: Token,
    pub alignment: Alignment,
    pub fields: String,
    pub template: String,
}

impl WebhookConfig {
    /// Record key in on-disk form (`<service>_<token>`)
    pub fn key(&self) -> String {
        format!("{}_{}", self.service, self.token)
    }

    /// Parse the stored fields expression
    pub fn field_patterns(&self) -> Result<Vec<FieldPattern>, PatternError> {
        parse_patterns(&self.fields)
    }

    /// Check fields and template parse under their mini-languages
    pub fn validate(&self) -> Result<(), StoreError> {
        parse_patterns(&self.fields)?;
        template::validate(&self.template)?;
        Ok(())
    }

    fn to_line(&self) -> String {
        format!(
            "{}|{}|{}|{}",
            self.key(),
            self.alignment,
            self.fields,
            self.template
        )
    }
}

/// Result of a successful delete
#[derive(Debug, Clone)]
pub struct DeletedRecord {
    pub record: WebhookConfig,
    /// True when no other record with the same service remains; the caller
    /// cascades the payload-log directory removal from this.
    pub last_for_service: bool,
}

// ============================================================================
// Errors
// ============================================================================

/// Error type for store operations
///
/// Messages never echo a token.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("configuration not found")]
    NotFound,

    #[error("token already bound to a configuration")]
    TokenCollision,

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("invalid field pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("invalid template: {0}")]
    Template(#[from] TemplateError),

    #[error("configuration store I/O failure: {message}")]
    Io { message: String },
}

// ============================================================================
// Store
// ============================================================================

/// File-backed configuration store
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    backup_dir: PathBuf,
}

impl ConfigStore {
    /// Create a store over a configuration file path
    ///
    /// The file does not need to exist yet; an absent file reads as an empty
    /// store and the first `create` materialises it.
    pub fn new(path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            backup_dir: backup_dir.into(),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up one record by service and token
    ///
    /// Re-reads the file, so a concurrent rewrite is visible immediately.
    pub async fn resolve(
        &self,
        service: &ServiceName,
        token: &Token,
    ) -> Result<WebhookConfig, StoreError> {
        let records = self.load().await?;
        records
            .into_iter()
            .find(|r| &r.service == service && &r.token == token)
            .ok_or(StoreError::NotFound)
    }

    /// All records, ordered by `(service, token)`
    pub async fn list(&self) -> Result<Vec<WebhookConfig>, StoreError> {
        let mut records = self.load().await?;
        records.sort_by(|a, b| (&a.service, &a.token).cmp(&(&b.service, &b.token)));
        Ok(records)
    }

    /// Insert a new record
    ///
    /// Fails with `TokenCollision` when the token is already bound anywhere
    /// in the store, or with a validation error when fields or template do
    /// not parse.
    pub async fn create(&self, record: WebhookConfig) -> Result<(), StoreError> {
        record.validate()?;

        let mut records = self.load().await?;
        if records.iter().any(|r| r.token == record.token) {
            return Err(StoreError::TokenCollision);
        }

        records.push(record);
        self.persist(&records).await
    }

    /// Replace the mutable parts of a record, preserving its token
    pub async fn update(
        &self,
        service: &ServiceName,
        token: &Token,
        alignment: Alignment,
        fields: String,
        template: String,
    ) -> Result<WebhookConfig, StoreError> {
        let mut records = self.load().await?;
        let position = records
            .iter()
            .position(|r| &r.service == service && &r.token == token)
            .ok_or(StoreError::NotFound)?;

        let updated = WebhookConfig {
            service: service.clone(),
            token: token.clone(),
            alignment,
            fields,
            template,
        };
        updated.validate()?;

        records[position] = updated.clone();
        self.persist(&records).await?;
        Ok(updated)
    }

    /// Remove a record
    ///
    /// The result reports whether the removed record was the last one for
    /// its service, so the caller can cascade payload-log cleanup.
    pub async fn delete(
        &self,
        service: &ServiceName,
        token: &Token,
    ) -> Result<DeletedRecord, StoreError> {
        let mut records = self.load().await?;
        let position = records
            .iter()
            .position(|r| &r.service == service && &r.token == token)
            .ok_or(StoreError::NotFound)?;

        let record = records.remove(position);
        let last_for_service = !records.iter().any(|r| &r.service == service);

        self.persist(&records).await?;
        Ok(DeletedRecord {
            record,
            last_for_service,
        })
    }

    /// True when any record carries the given token
    pub async fn token_exists(&self, token: &Token) -> Result<bool, StoreError> {
        let records = self.load().await?;
        Ok(records.iter().any(|r| &r.token == token))
    }

    // ------------------------------------------------------------------------
    // File handling
    // ------------------------------------------------------------------------

    async fn load(&self) -> Result<Vec<WebhookConfig>, StoreError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Io {
                    message: format!("failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        parse_store(&contents)
    }

    async fn persist(&self, records: &[WebhookConfig]) -> Result<(), StoreError> {
        self.backup_current().await?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Io {
                        message: format!("failed to create {}: {}", parent.display(), e),
                    })?;
            }
        }

        let mut contents = String::from("[webhooks]\n");
        for record in records {
            contents.push_str(&record.to_line());
            contents.push('\n');
        }

        // Tempfile-then-rename keeps concurrent readers on a whole image.
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to create {}: {}", temp_path.display(), e),
            })?;

        file.write_all(contents.as_bytes())
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to write {}: {}", temp_path.display(), e),
            })?;

        file.flush().await.map_err(|e| StoreError::Io {
            message: format!("failed to flush {}: {}", temp_path.display(), e),
        })?;
        drop(file);

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to replace {}: {}", self.path.display(), e),
            })?;

        debug!(records = records.len(), path = %self.path.display(), "Rewrote configuration file");
        Ok(())
    }

    async fn backup_current(&self) -> Result<(), StoreError> {
        match fs::metadata(&self.path).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(StoreError::Io {
                    message: format!("failed to stat {}: {}", self.path.display(), e),
                })
            }
        }

        fs::create_dir_all(&self.backup_dir)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to create {}: {}", self.backup_dir.display(), e),
            })?;

        let backup_name = format!("webhooks_{}.conf.bak", Timestamp::now().backup_stamp());
        let backup_path = self.backup_dir.join(backup_name);
        fs::copy(&self.path, &backup_path)
            .await
            .map_err(|e| StoreError::Io {
                message: format!("failed to back up to {}: {}", backup_path.display(), e),
            })?;

        Ok(())
    }
}

// ============================================================================
// File parsing
// ============================================================================

fn parse_store(contents: &str) -> Result<Vec<WebhookConfig>, StoreError> {
    let mut records = Vec::new();
    let mut in_webhooks = false;
    let mut saw_section = false;

    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            in_webhooks = line == "[webhooks]";
            saw_section = true;
            continue;
        }

        if !in_webhooks {
            if !saw_section {
                return Err(StoreError::Config {
                    message: format!("line {}: record outside [webhooks] section", index + 1),
                });
            }
            continue;
        }

        let record = parse_record_line(line, index + 1)?;
        if records
            .iter()
            .any(|r: &WebhookConfig| r.service == record.service && r.token == record.token)
        {
            return Err(StoreError::Config {
                message: format!(
                    "line {}: duplicate configuration key for service '{}'",
                    index + 1,
                    record.service
                ),
            });
        }
        records.push(record);
    }

    Ok(records)
}

fn parse_record_line(line: &str, line_no: usize) -> Result<WebhookConfig, StoreError> {
    let pipe = line.find('|');
    let equals = line.find('=');

    let is_pipe_form = match (pipe, equals) {
        (Some(p), Some(e)) => p < e,
        (Some(_), None) => true,
        (None, _) => false,
    };

    if is_pipe_form {
        let mut parts = line.splitn(4, '|');
        let key = parts.next().unwrap_or_default().trim();
        let (Some(alignment), Some(fields), Some(template)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(StoreError::Config {
                message: format!("line {}: expected key|alignment|fields|template", line_no),
            });
        };

        let (service, token) = parse_key(key, line_no)?;
        let alignment = Alignment::from_str(alignment.trim()).map_err(|e| StoreError::Config {
            message: format!("line {}: {}", line_no, e),
        })?;

        Ok(WebhookConfig {
            service,
            token,
            alignment,
            fields: fields.trim().to_string(),
            template: template.to_string(),
        })
    } else {
        // Legacy `key = fields::template` form; empty alignment.
        let Some((key, value)) = line.split_once('=') else {
            return Err(StoreError::Config {
                message: format!("line {}: unrecognised record line", line_no),
            });
        };

        let Some((fields, template)) = value.split_once("::") else {
            return Err(StoreError::Config {
                message: format!("line {}: legacy record is missing '::' separator", line_no),
            });
        };

        let (service, token) = parse_key(key.trim(), line_no)?;
        Ok(WebhookConfig {
            service,
            token,
            alignment: Alignment::None,
            fields: fields.trim().to_string(),
            template: template.trim_start().to_string(),
        })
    }
}

/// Split `<service>_<token>` keys; keys with no token suffix carry the
/// synthetic `legacy` token
fn parse_key(key: &str, line_no: usize) -> Result<(ServiceName, Token), StoreError> {
    if let Some((service, suffix)) = key.rsplit_once('_') {
        if let Ok(token) = Token::new(suffix) {
            let service = ServiceName::new(service).map_err(|e| StoreError::Config {
                message: format!("line {}: {}", line_no, e),
            })?;
            return Ok((service, token));
        }
    }

    let service = ServiceName::new(key).map_err(|e| StoreError::Config {
        message: format!("line {}: {}", line_no, e),
    })?;
    Ok((service, Token::legacy()))
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
