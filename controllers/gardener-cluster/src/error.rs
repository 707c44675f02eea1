//! Controller-specific error types.

use gardener_client::GardenerError;
use kube::Error as KubeError;
use thiserror::Error;

/// Errors that can occur in the GardenerCluster Controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Gardener API error
    #[error("Gardener error: {0}")]
    Gardener(#[from] GardenerError),

    /// More than one secret carries the cluster's identity label
    #[error("Ambiguous kubeconfig secret: {0}")]
    AmbiguousSecret(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reconciliation exceeded its deadline
    #[error("Reconciliation of {0} timed out")]
    Timeout(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    Watch(String),
}
