//! Shoot extenders
//!
//! An extender mutates one aspect of a Shoot from a Runtime. The converter
//! runs a fixed, ordered list of them and stops at the first error.

pub mod annotations;
pub mod auditlogs;
pub mod control_plane;
pub mod exposure_class;
pub mod extensions;
pub mod kubernetes;
pub mod maintenance;
pub mod networking;
pub mod provider;

use crate::error::ConverterError;
use crds::Runtime;
use gardener_client::{Extension, NamedResourceReference, Shoot};

/// One pipeline step.
pub type Extender = Box<dyn Fn(&Runtime, &mut Shoot) -> Result<(), ConverterError> + Send + Sync>;

/// Replaces the extension with the same type in place, or appends it.
pub fn upsert_extension(extensions: &mut Vec<Extension>, extension: Extension) {
    match extensions.iter_mut().find(|e| e.type_ == extension.type_) {
        Some(existing) => *existing = extension,
        None => extensions.push(extension),
    }
}

/// Replaces the resource reference with the same name in place, or appends it.
pub fn upsert_resource(resources: &mut Vec<NamedResourceReference>, resource: NamedResourceReference) {
    match resources.iter_mut().find(|r| r.name == resource.name) {
        Some(existing) => *existing = resource,
        None => resources.push(resource),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ext(type_: &str, disabled: bool) -> Extension {
        Extension {
            type_: type_.to_string(),
            provider_config: None,
            disabled: Some(disabled),
        }
    }

    #[test]
    fn upsert_keeps_position_of_existing_extension() {
        let mut extensions = vec![ext("a", false), ext("b", false), ext("c", false)];
        upsert_extension(&mut extensions, ext("b", true));

        assert_eq!(extensions.len(), 3);
        assert_eq!(extensions[1].type_, "b");
        assert_eq!(extensions[1].disabled, Some(true));
    }

    #[test]
    fn upsert_appends_unknown_extension() {
        let mut extensions = vec![ext("a", false)];
        upsert_extension(&mut extensions, ext("z", false));
        assert_eq!(extensions.iter().map(|e| e.type_.as_str()).collect::<Vec<_>>(), vec!["a", "z"]);
    }
}
