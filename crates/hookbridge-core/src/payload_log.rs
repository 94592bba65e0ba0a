//! # Payload Log
//!
//! Appends every received webhook payload, with request metadata and the
//! processing outcome, to a per-service rotating log file:
//!
//! ```text
//! <base>/<service>/payload.log       active file, one JSON object per line
//! <base>/<service>/payload.log.1     most recent rotated file
//! <base>/<service>/payload.log.N     oldest retained rotation
//! ```
//!
//! Directories are created on first write. When the active file grows past
//! the configured byte threshold the rotated files shift up by one, the
//! oldest is discarded, and the next append opens a fresh active file. One
//! async mutex per service covers the append and any rotation; nothing is
//! held across a request's other blocking points.

use crate::{ServiceName, Timestamp};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

// ============================================================================
// Records
// ============================================================================

/// Outcome of the processing pipeline for a received payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Success,
    Failure,
}

/// One payload-log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayloadRecord {
    pub timestamp: Timestamp,
    pub webhook_type: String,
    pub payload: Value,
    pub source_ip: String,
    pub user_agent: String,
    pub processing_status: ProcessingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

// ============================================================================
// Errors
// ============================================================================

/// Error type for payload-log operations
///
/// Callers on the webhook path log these and continue; a logging failure
/// never fails the request.
#[derive(Debug, thiserror::Error)]
pub enum PayloadLogError {
    #[error("payload log I/O failure: {message}")]
    Io { message: String },

    #[error("payload log serialization failure: {message}")]
    Serialization { message: String },
}

impl From<std::io::Error> for PayloadLogError {
    fn from(e: std::io::Error) -> Self {
        Self::Io {
            message: e.to_string(),
        }
    }
}

// ============================================================================
// Logger
// ============================================================================

/// Rotating per-service payload logger
#[derive(Debug)]
pub struct PayloadLogger {
    enabled: bool,
    base_dir: PathBuf,
    max_bytes: u64,
    backup_count: u32,
    file_name: String,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PayloadLogger {
    /// Create an enabled logger
    pub fn new(
        base_dir: impl Into<PathBuf>,
        max_bytes: u64,
        backup_count: u32,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            enabled: true,
            base_dir: base_dir.into(),
            max_bytes,
            backup_count,
            file_name: file_name.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Create a logger that drops every append and enumerates nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base_dir: PathBuf::new(),
            max_bytes: 0,
            backup_count: 0,
            file_name: String::new(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// True when payload logging is active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Append one record to the service's active log file
    ///
    /// Creates the service directory on demand and rotates afterwards when
    /// the active file has grown past the threshold.
    pub async fn append(
        &self,
        service: &ServiceName,
        record: &PayloadRecord,
    ) -> Result<(), PayloadLogError> {
        if !self.enabled {
            return Ok(());
        }

        let line =
            serde_json::to_string(record).map_err(|e| PayloadLogError::Serialization {
                message: e.to_string(),
            })?;

        let lock = self.service_lock(service.as_str()).await;
        let _guard = lock.lock().await;

        let service_dir = self.base_dir.join(service.as_str());
        fs::create_dir_all(&service_dir).await?;

        let active = service_dir.join(&self.file_name);
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&active)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        drop(file);

        let size = fs::metadata(&active).await?.len();
        if size > self.max_bytes {
            debug!(service = service.as_str(), size, "Rotating payload log");
            self.rotate(&service_dir).await?;
        }

        Ok(())
    }

    /// Shift `payload.log.N` → `payload.log.N+1`, discard the oldest, and
    /// retire the active file to `payload.log.1`
    async fn rotate(&self, service_dir: &PathBuf) -> Result<(), PayloadLogError> {
        let active = service_dir.join(&self.file_name);

        if self.backup_count == 0 {
            fs::remove_file(&active).await?;
            return Ok(());
        }

        let rotated = |n: u32| service_dir.join(format!("{}.{}", self.file_name, n));

        match fs::remove_file(rotated(self.backup_count)).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for n in (1..self.backup_count).rev() {
            match fs::rename(rotated(n), rotated(n + 1)).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        fs::rename(&active, rotated(1)).await?;
        Ok(())
    }

    /// Last `limit` entries for a service, newest first, spanning the active
    /// file and rotated siblings
    pub async fn recent(
        &self,
        service: &ServiceName,
        limit: usize,
    ) -> Result<Vec<PayloadRecord>, PayloadLogError> {
        if !self.enabled || limit == 0 {
            return Ok(Vec::new());
        }

        let service_dir = self.base_dir.join(service.as_str());
        let mut entries = Vec::new();

        // Active file first (newest), then rotations in ascending age.
        let mut files = vec![service_dir.join(&self.file_name)];
        for n in 1..=self.backup_count {
            files.push(service_dir.join(format!("{}.{}", self.file_name, n)));
        }

        for path in files {
            if entries.len() >= limit {
                break;
            }

            let contents = match fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            for line in contents.lines().rev() {
                if entries.len() >= limit {
                    break;
                }
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                // Lines that fail to parse are skipped, not fatal.
                if let Ok(record) = serde_json::from_str::<PayloadRecord>(line) {
                    entries.push(record);
                }
            }
        }

        Ok(entries)
    }

    /// Services that currently have a log directory, sorted
    pub async fn service_dirs(&self) -> Result<Vec<String>, PayloadLogError> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let mut read_dir = match fs::read_dir(&self.base_dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut services = Vec::new();
        while let Some(entry) = read_dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    services.push(name.to_string());
                }
            }
        }

        services.sort();
        Ok(services)
    }

    /// Remove a service's log directory and everything in it
    ///
    /// Called when the last configuration for a service is deleted. A
    /// directory that never existed is not an error.
    pub async fn remove_service(&self, service: &ServiceName) -> Result<(), PayloadLogError> {
        if !self.enabled {
            return Ok(());
        }

        let lock = self.service_lock(service.as_str()).await;
        let _guard = lock.lock().await;

        let service_dir = self.base_dir.join(service.as_str());
        match fs::remove_dir_all(&service_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn service_lock(&self, service: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
#[path = "payload_log_tests.rs"]
mod tests;
