//! Gardener API Client
//!
//! Typed access to Gardener `Shoot` and `Seed` resources and to the
//! `adminkubeconfig` subresource.
//!
//! # Example
//!
//! ```no_run
//! use gardener_client::{GardenerClient, GardenerClientTrait};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GardenerClient::from_kubeconfig("/gardener/kubeconfig/kubeconfig", "kyma-dev").await?;
//! let shoot = client.get_shoot("c-1a2b3c").await?;
//! println!("{:?}", shoot.last_operation());
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod gardener_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::GardenerClient;
pub use error::GardenerError;
pub use models::*;
pub use gardener_trait::GardenerClientTrait;
#[cfg(feature = "test-util")]
pub use mock::{MockGardenerClient, MockOperation, now_timestamp};
