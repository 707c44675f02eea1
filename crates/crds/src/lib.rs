//! Infrastructure Manager CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the runtime and
//! gardener-cluster controllers.

pub mod conditions;
pub mod error;
pub mod gardener_cluster;
pub mod runtime;

pub use conditions::*;
pub use error::CrdError;
pub use gardener_cluster::*;
pub use runtime::*;
