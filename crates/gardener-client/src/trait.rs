//! GardenerClient trait for mocking
//!
//! Abstracts the Gardener API so reconcilers can run against
//! [`MockGardenerClient`](crate::MockGardenerClient) in unit tests.

use crate::error::GardenerError;
use crate::models::{Seed, Shoot};
use std::time::Duration;

/// Operations the controllers need from Gardener.
///
/// All async methods must be `Send` to work with Tokio's work-stealing runtime.
#[async_trait::async_trait]
pub trait GardenerClientTrait: Send + Sync {
    /// Project namespace (`garden-<project>`) Shoots live in
    fn namespace(&self) -> &str;

    /// Fetch a Shoot by name. Absence is reported as [`GardenerError::NotFound`].
    async fn get_shoot(&self, name: &str) -> Result<Shoot, GardenerError>;

    /// Create a Shoot in the project namespace.
    async fn create_shoot(&self, shoot: &Shoot) -> Result<Shoot, GardenerError>;

    /// Replace a Shoot. The object's `resourceVersion` is used for optimistic
    /// concurrency; a stale version yields [`GardenerError::Conflict`].
    async fn update_shoot(&self, shoot: &Shoot) -> Result<Shoot, GardenerError>;

    /// Set a single annotation on a Shoot (merge patch).
    async fn annotate_shoot(&self, name: &str, key: &str, value: &str) -> Result<(), GardenerError>;

    /// Request deletion of a Shoot.
    async fn delete_shoot(&self, name: &str) -> Result<(), GardenerError>;

    /// List all seeds visible to the client.
    async fn list_seeds(&self) -> Result<Vec<Seed>, GardenerError>;

    /// Issue a short-lived admin kubeconfig for a Shoot.
    async fn request_admin_kubeconfig(&self, shoot_name: &str, expiration: Duration) -> Result<String, GardenerError>;
}
