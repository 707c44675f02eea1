//! Lifecycle Policy
//!
//! Decision functions shared by the controllers. Apart from the seed lookup
//! they are pure and take the current time as an argument.

pub mod drift;
pub mod rotation;
pub mod seed;

pub use drift::spec_drift;
pub use rotation::{ROTATION_THRESHOLD, rotation_due, time_until_rotation};
pub use seed::{SeedAvailability, seed_available};
