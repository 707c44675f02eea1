//! Spec drift between a Runtime and its Shoot

use crds::Runtime;
use gardener_client::Shoot;

/// Whether the Runtime changed since its Shoot was last built.
///
/// Compares the Runtime generation with the one recorded on the Shoot. A
/// Shoot without the annotation counts as built from generation 0.
pub fn spec_drift(runtime: &Runtime, shoot: &Shoot) -> bool {
    let desired = runtime.metadata.generation.unwrap_or(0);
    let applied = shoot.runtime_generation().unwrap_or(0);
    desired > applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use gardener_client::{RUNTIME_GENERATION_ANNOTATION, ShootSpec, annotations};

    fn runtime_at(generation: i64) -> Runtime {
        let mut runtime = Runtime::new("runtime-1", Default::default());
        runtime.metadata.generation = Some(generation);
        runtime
    }

    fn shoot_at(generation: Option<&str>) -> Shoot {
        let mut shoot = Shoot::new("c-1", ShootSpec::default());
        if let Some(generation) = generation {
            shoot.metadata.annotations = Some(annotations(&[(RUNTIME_GENERATION_ANNOTATION, generation)]));
        }
        shoot
    }

    #[test]
    fn test_same_generation_is_not_drift() {
        assert!(!spec_drift(&runtime_at(4), &shoot_at(Some("4"))));
    }

    #[test]
    fn test_newer_runtime_is_drift() {
        assert!(spec_drift(&runtime_at(5), &shoot_at(Some("4"))));
    }

    #[test]
    fn test_missing_annotation_is_drift() {
        assert!(spec_drift(&runtime_at(1), &shoot_at(None)));
        assert!(spec_drift(&runtime_at(1), &shoot_at(Some("not-a-number"))));
    }
}
