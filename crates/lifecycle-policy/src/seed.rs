//! Seed availability
//!
//! A Runtime with `enforceSeedLocation` may only be scheduled on a seed of
//! the same provider in the same region.

use gardener_client::{GardenerClientTrait, GardenerError};
use tracing::debug;

/// Result of a seed lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SeedAvailability {
    /// A usable seed exists in the requested region
    pub available: bool,

    /// Regions with a usable seed for the provider, sorted
    pub regions: Vec<String>,
}

/// Looks for a usable seed of `provider_type` in `region`.
///
/// A lookup failure is returned as an error; "no seed" is a normal result.
pub async fn seed_available(
    client: &dyn GardenerClientTrait,
    provider_type: &str,
    region: &str,
) -> Result<SeedAvailability, GardenerError> {
    let seeds = client.list_seeds().await?;

    let mut regions: Vec<String> = seeds
        .iter()
        .filter(|s| s.spec.provider.type_.eq_ignore_ascii_case(provider_type) && s.is_usable())
        .map(|s| s.spec.provider.region.clone())
        .collect();
    regions.sort();
    regions.dedup();

    let available = regions.iter().any(|r| r == region);
    debug!(
        "Seed lookup for {}/{}: available={}, regions={:?}",
        provider_type, region, available, regions
    );

    Ok(SeedAvailability { available, regions })
}
