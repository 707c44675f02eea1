//! Exposure class, required only by some providers.

use crate::error::ConverterError;
use crate::provider::ProviderType;
use crds::Runtime;
use gardener_client::Shoot;

pub fn extend_with_exposure_class(runtime: &Runtime, shoot: &mut Shoot) -> Result<(), ConverterError> {
    let provider: ProviderType = runtime.spec.shoot.provider.type_.parse()?;
    if let Some(class) = provider.exposure_class_name() {
        shoot.spec.exposure_class_name = Some(class.to_string());
    }
    Ok(())
}
