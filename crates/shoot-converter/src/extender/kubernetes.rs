//! Kubernetes version and API server OIDC settings.

use super::Extender;
use crate::config::KubernetesDefaults;
use crate::error::ConverterError;
use crds::{OidcConfig, Runtime};
use gardener_client::{KubeApiServerConfig, Shoot, ShootOidcConfig};

pub fn extend_with_kubernetes(defaults: &KubernetesDefaults) -> Extender {
    let default_version = defaults.default_version.clone();

    Box::new(move |runtime: &Runtime, shoot: &mut Shoot| -> Result<(), ConverterError> {
        let kubernetes = &runtime.spec.shoot.kubernetes;
        shoot.spec.kubernetes.version = kubernetes
            .version
            .clone()
            .unwrap_or_else(|| default_version.clone());
        shoot.spec.kubernetes.enable_static_token_kubeconfig = Some(false);

        // audit config on the same struct belongs to the auditlog extender
        let api_server = shoot
            .spec
            .kubernetes
            .kube_api_server
            .get_or_insert_with(KubeApiServerConfig::default);
        api_server.oidc_config = kubernetes.kube_api_server.oidc_config.as_ref().map(to_shoot_oidc);
        Ok(())
    })
}

// CA bundle and additional OIDC issuers are not carried over.
fn to_shoot_oidc(oidc: &OidcConfig) -> ShootOidcConfig {
    ShootOidcConfig {
        ca_bundle: None,
        client_id: oidc.client_id.clone(),
        groups_claim: oidc.groups_claim.clone(),
        issuer_url: oidc.issuer_url.clone(),
        signing_algs: oidc.signing_algs.clone(),
        username_claim: oidc.username_claim.clone(),
        username_prefix: oidc.username_prefix.clone(),
    }
}
