//! Controller-specific error types.
//!
//! Backend failures are mostly absorbed into Runtime conditions; what
//! reaches the watcher is what could not be recorded.

use gardener_client::GardenerError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the Runtime Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Gardener API error
    #[error("Gardener error: {0}")]
    Gardener(#[from] GardenerError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconciliation exceeded its deadline
    #[error("Reconciliation of {0} timed out")]
    Timeout(String),

    /// Metrics registry error
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    /// Metrics/probe server failed
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
