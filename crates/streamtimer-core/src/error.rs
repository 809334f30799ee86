//! Core error types for streamtimer-core.
//!
//! This module defines the error hierarchy using thiserror. Sub-errors
//! for storage and the Twitch boundary convert into [`CoreError`] via
//! `#[from]` so call sites can use `?` throughout.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for streamtimer-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Twitch auth errors
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// The accumulator's command channel is closed (tenant shut down).
    #[error("Timer for tenant '{tenant_id}' is shut down")]
    TimerClosed { tenant_id: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to resolve or create the data directory
    #[error("Failed to prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to load a persisted document
    #[error("Failed to load {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save a persisted document
    #[error("Failed to save {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to append to the emergency event log
    #[error("Failed to append to emergency log {path}: {message}")]
    AppendFailed { path: PathBuf, message: String },

    /// Failed to archive the emergency event log after recovery
    #[error("Failed to archive emergency log {path}: {source}")]
    ArchiveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Twitch boundary errors.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Authorization failed
    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    /// Token exchange failed
    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    /// Token validation failed
    #[error("Token validation failed: {0}")]
    ValidationFailed(String),

    /// Invalid callback
    #[error("Invalid OAuth callback: {0}")]
    InvalidCallback(String),

    /// Not authenticated
    #[error("Tenant '{tenant_id}' is not authenticated with Twitch")]
    NotAuthenticated { tenant_id: String },

    /// Credentials not configured
    #[error("Twitch client credentials are not configured")]
    CredentialsNotConfigured,
}

impl From<Box<dyn std::error::Error + Send + Sync>> for CoreError {
    fn from(err: Box<dyn std::error::Error + Send + Sync>) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
