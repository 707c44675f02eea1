//! Shoot metadata: labels and annotations derived from the Runtime.

use crate::error::ConverterError;
use crds::{LABEL_GLOBAL_ACCOUNT_ID, LABEL_RUNTIME_ID, LABEL_SUBACCOUNT_ID, Runtime};
use gardener_client::{RUNTIME_GENERATION_ANNOTATION, Shoot};
use std::collections::BTreeMap;

pub const LICENCE_TYPE_ANNOTATION: &str = "kcp.provisioner.kyma-project.io/licence-type";
pub const RUNTIME_ID_ANNOTATION: &str = "infrastructuremanager.kyma-project.io/runtime-id";

/// Records the Runtime generation, runtime id and licence type.
///
/// Only keys owned here are written; other annotations survive a patch.
pub fn extend_with_annotations(runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    let annotations = shoot.metadata.annotations.get_or_insert_with(BTreeMap::new);

    annotations.insert(
        RUNTIME_GENERATION_ANNOTATION.to_string(),
        runtime.metadata.generation.unwrap_or(0).to_string(),
    );

    if let Some(runtime_id) = runtime.metadata.labels.as_ref().and_then(|l| l.get(LABEL_RUNTIME_ID)) {
        annotations.insert(RUNTIME_ID_ANNOTATION.to_string(), runtime_id.clone());
    }

    if let Some(licence) = &runtime.spec.shoot.licence_type {
        annotations.insert(LICENCE_TYPE_ANNOTATION.to_string(), licence.clone());
    }

    Ok(())
}

/// Account labels Gardener uses for cost attribution.
pub fn extend_with_labels(runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    let Some(source) = runtime.metadata.labels.as_ref() else {
        return Ok(());
    };
    let labels = shoot.metadata.labels.get_or_insert_with(BTreeMap::new);

    for (runtime_label, shoot_label) in [(LABEL_GLOBAL_ACCOUNT_ID, "account"), (LABEL_SUBACCOUNT_ID, "subaccount")] {
        if let Some(value) = source.get(runtime_label) {
            labels.insert(shoot_label.to_string(), value.clone());
        }
    }
    Ok(())
}
