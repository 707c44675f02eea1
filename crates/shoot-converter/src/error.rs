//! Converter errors

use thiserror::Error;

/// Errors raised while building or patching a Shoot.
#[derive(Debug, Error)]
pub enum ConverterError {
    /// Provider type has no mapping
    #[error("unsupported provider type: {0}")]
    UnsupportedProvider(String),

    /// Runtime lacks a value the Shoot needs
    #[error("missing field: {0}")]
    MissingField(String),

    /// Runtime carries a value the Shoot cannot accept
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// JSON serialization error while building provider configs
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised by the audit-log data source.
#[derive(Debug, Error)]
pub enum AuditLogError {
    #[error("cannot read audit log tenant config {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("cannot parse audit log tenant config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no audit log tenant configured for provider {0}")]
    ProviderNotFound(String),

    #[error("no audit log tenant configured for provider {provider} in region {region}")]
    RegionNotFound { provider: String, region: String },

    #[error("invalid audit log tenant data: {0}")]
    Invalid(String),
}

/// Errors raised by the maintenance-window source.
#[derive(Debug, Error)]
pub enum MaintenanceError {
    #[error("cannot read maintenance window map {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("cannot parse maintenance window map: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no maintenance window defined for region {0}")]
    RegionNotFound(String),
}
