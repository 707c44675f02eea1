//! Kubernetes resource watchers.
//!
//! Runtimes are watched with `kube_runtime::Controller`, which handles
//! reconnection, retries and per-object serialization. Every reconcile call is
//! bounded by the configured timeout.

use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crds::Runtime;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{
    Controller, watcher,
    controller::{Action, Config as ControllerConfig},
};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

type ReconcileFuture = Pin<Box<dyn Future<Output = Result<Action, ControllerError>> + Send>>;

/// Generic watcher helper around `kube_runtime::Controller`.
///
/// `reconcile_fn` runs under `timeout`; an expired call is reported as
/// [`ControllerError::Timeout`] and handled by the error policy.
async fn watch_resource<K, F>(
    api: Api<K>,
    reconciler: Arc<Reconciler>,
    reconcile_fn: F,
    resource_name: &'static str,
    concurrency: u16,
    timeout: Duration,
) -> Result<(), ControllerError>
where
    K: kube::Resource + Clone + Send + Sync + 'static + std::fmt::Debug + serde::de::DeserializeOwned,
    K::DynamicType: Default + std::cmp::Eq + std::hash::Hash + Clone + std::fmt::Debug + Unpin,
    F: Fn(Arc<Reconciler>, Arc<K>) -> ReconcileFuture + Send + Sync + Clone + 'static,
{
    info!("Starting {} watcher", resource_name);

    let error_policy = move |obj: Arc<K>, error: &ControllerError, ctx: Arc<Reconciler>| {
        error!(
            "Reconciliation error for {} {}: {}",
            resource_name,
            obj.meta().name.as_deref().unwrap_or_default(),
            error
        );
        Action::requeue(ctx.requeue_after)
    };

    let reconcile = move |obj: Arc<K>, ctx: Arc<Reconciler>| {
        let reconcile_fn = reconcile_fn.clone();
        async move {
            let name = obj.meta().name.clone().unwrap_or_default();
            debug!("Reconciling {} {}", resource_name, name);

            match tokio::time::timeout(timeout, reconcile_fn(ctx, obj)).await {
                Ok(result) => result,
                Err(_) => Err(ControllerError::Timeout(format!("{resource_name} {name} after {timeout:?}"))),
            }
        }
    };

    // Debounce batches bursts of status writes into one reconcile
    let controller_config = ControllerConfig::default()
        .debounce(Duration::from_secs(1))
        .concurrency(concurrency);

    Controller::new(api, watcher::Config::default())
        .with_config(controller_config)
        .run(reconcile, error_policy, reconciler)
        .for_each(|res| async move {
            if let Err(e) = res {
                error!("Controller error for {}: {}", resource_name, e);
            }
        })
        .await;

    Ok(())
}

/// Watches Runtime resources.
pub struct Watcher {
    reconciler: Arc<Reconciler>,
    runtime_api: Api<Runtime>,
    concurrency: u16,
    timeout: Duration,
}

impl Watcher {
    pub fn new(reconciler: Arc<Reconciler>, runtime_api: Api<Runtime>, concurrency: u16, timeout: Duration) -> Self {
        Self {
            reconciler,
            runtime_api,
            concurrency,
            timeout,
        }
    }

    pub async fn watch_runtimes(&self) -> Result<(), ControllerError> {
        watch_resource(
            self.runtime_api.clone(),
            self.reconciler.clone(),
            |reconciler, resource| Box::pin(async move { reconciler.reconcile_runtime(&resource).await }),
            "Runtime",
            self.concurrency,
            self.timeout,
        )
        .await
    }
}
