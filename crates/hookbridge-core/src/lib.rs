//! # HookBridge Core
//!
//! Core business logic for the HookBridge webhook ingestion gateway.
//!
//! This crate contains the domain logic for receiving third-party webhooks:
//! parsing field-pattern expressions, extracting values from arbitrary JSON
//! payloads, rendering message templates, managing the on-disk configuration
//! store, minting authentication tokens, and keeping the rotating per-service
//! payload log.
//!
//! ## Architecture
//!
//! The core owns no HTTP or network concerns. Every operation is expressed
//! over plain values so the HTTP service crate can orchestrate the pipeline
//! (resolve → extract → render → log → send) without the core depending on
//! the transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Webhook source identifier (`github`, `stripe`, ...)
///
/// Lowercase by construction; multiple configurations may share one service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceName(String);

impl ServiceName {
    /// Create new service name with validation
    ///
    /// # Validation Rules
    /// - Must be non-empty
    /// - Must contain only lowercase alphanumerics, underscores, and hyphens
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();

        if name.is_empty() {
            return Err(ValidationError::Required {
                field: "service".to_string(),
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidCharacters {
                field: "service".to_string(),
                invalid_chars: "only [a-z0-9_-] allowed".to_string(),
            });
        }

        Ok(Self(name))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServiceName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Opaque webhook authentication token
///
/// Either a 32-character alphanumeric string minted by the token mint, or the
/// literal `legacy` carried by configurations migrated from the token-less
/// line format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token(String);

/// Length of minted tokens
pub const TOKEN_LENGTH: usize = 32;

/// Synthetic token assigned to legacy token-less configuration lines
pub const LEGACY_TOKEN: &str = "legacy";

impl Token {
    /// Create new token with validation
    ///
    /// # Validation Rules
    /// - Exactly 32 alphanumeric characters, or the literal `legacy`
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value == LEGACY_TOKEN {
            return Ok(Self(value));
        }

        if value.len() != TOKEN_LENGTH {
            return Err(ValidationError::InvalidFormat {
                field: "token".to_string(),
                message: format!("must be exactly {} characters", TOKEN_LENGTH),
            });
        }

        if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidCharacters {
                field: "token".to_string(),
                invalid_chars: "only [A-Za-z0-9] allowed".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Construct the synthetic legacy token
    pub fn legacy() -> Self {
        Self(LEGACY_TOKEN.to_string())
    }

    /// True when this is the synthetic legacy token
    pub fn is_legacy(&self) -> bool {
        self.0 == LEGACY_TOKEN
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    // Internal constructor for freshly generated values that are alnum by
    // construction.
    pub(crate) fn from_generated(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Token {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

// ============================================================================
// Routing Alignment
// ============================================================================

/// Downstream routing hint attached to a configuration
///
/// Rendered into the `aligned_resource` path of every sink message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// No explicit alignment; routes to the default organization
    None,
    /// Align to an organization by numeric id
    Org(u64),
    /// Align to a device by numeric id
    Device(u64),
}

impl Alignment {
    /// Resource path sent to the sink
    pub fn aligned_resource(&self) -> String {
        match self {
            Self::None => "/api/organization/0".to_string(),
            Self::Org(id) => format!("/api/organization/{}", id),
            Self::Device(id) => format!("/api/device/{}", id),
        }
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Org(id) => write!(f, "org:{}", id),
            Self::Device(id) => write!(f, "device:{}", id),
        }
    }
}

impl FromStr for Alignment {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::None);
        }

        let invalid = || ValidationError::InvalidFormat {
            field: "alignment".to_string(),
            message: "must be empty, 'org:<id>', or 'device:<id>'".to_string(),
        };

        let (kind, id) = s.split_once(':').ok_or_else(invalid)?;
        let id = id.parse::<u64>().map_err(|_| invalid())?;

        match kind {
            "org" => Ok(Self::Org(id)),
            "device" => Ok(Self::Device(id)),
            _ => Err(invalid()),
        }
    }
}

// ============================================================================
// Time
// ============================================================================

/// UTC timestamp serialised as RFC-3339
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create timestamp for current moment
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Convert to RFC3339 string
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Compact stamp used in backup file names (`YYYYMMDD_HHMMSS`)
    pub fn backup_stamp(&self) -> String {
        self.0.format("%Y%m%d_%H%M%S").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum ValidationError {
    #[error("field '{field}' is required")]
    Required { field: String },

    #[error("field '{field}' has invalid format: {message}")]
    InvalidFormat { field: String, message: String },

    #[error("field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

// ============================================================================
// Module declarations
// ============================================================================

/// Field-pattern parsing and JSON value extraction
pub mod extract;

/// Rotating per-service payload log
pub mod payload_log;

/// On-disk webhook configuration store
pub mod store;

/// Message template rendering
pub mod template;

/// Webhook token generation
pub mod token_mint;

// Re-export key types for convenience
pub use extract::{extract, parse_patterns, Extracted, FieldPattern, PatternError, ValueMap};
pub use payload_log::{PayloadLogError, PayloadLogger, PayloadRecord, ProcessingStatus};
pub use store::{ConfigStore, DeletedRecord, StoreError, WebhookConfig};
pub use template::TemplateError;
pub use token_mint::MintError;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
