//! CRD validation errors

use thiserror::Error;

/// Errors raised while validating custom resources.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrdError {
    /// One or more required labels are absent
    #[error("missing required labels: {}", .0.join(", "))]
    MissingLabels(Vec<String>),
}
