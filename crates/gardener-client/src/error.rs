//! Gardener client errors

use thiserror::Error;

/// Errors that can occur when talking to the Gardener API.
#[derive(Debug, Error)]
pub enum GardenerError {
    /// Transport or API error not covered by a more specific variant
    #[error("Kubernetes error: {0}")]
    Kube(kube::Error),

    /// Requested object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Optimistic concurrency rejection (stale resourceVersion or name clash)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Gardener answered with an unusable payload
    #[error("Gardener API error: {0}")]
    Api(String),

    /// Client could not be configured (kubeconfig unreadable, ...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GardenerError {
    /// Whether the error is a typed not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GardenerError::NotFound(_))
    }
}

impl From<kube::Error> for GardenerError {
    fn from(e: kube::Error) -> Self {
        match &e {
            kube::Error::Api(response) if response.code == 404 => {
                GardenerError::NotFound(response.message.clone())
            }
            kube::Error::Api(response) if response.code == 409 => {
                GardenerError::Conflict(response.message.clone())
            }
            _ => GardenerError::Kube(e),
        }
    }
}
