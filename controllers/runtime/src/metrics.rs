//! Prometheus metrics
//!
//! The reconciler only sees the [`Metrics`] trait; the Prometheus-backed
//! implementation owns its registry and is also served on `/metrics`.

use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use std::fmt::{self, Debug};

/// Outcome of one reconcile invocation, used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileResult {
    /// Will be checked again after a delay
    Requeue,
    /// Nothing left to do until the Runtime changes
    Done,
    /// Returned an error to the watcher
    Error,
}

impl ReconcileResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileResult::Requeue => "requeue",
            ReconcileResult::Done => "done",
            ReconcileResult::Error => "error",
        }
    }
}

pub trait Metrics: Send + Sync {
    /// The state machine gave up on a Runtime until it changes.
    fn fsm_stop(&self);

    fn reconciliation(&self, result: ReconcileResult);
}

pub struct PrometheusMetrics {
    registry: Registry,
    fsm_stop_total: IntCounter,
    reconciliations_total: IntCounterVec,
}

impl Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("PrometheusMetrics")
    }
}

impl PrometheusMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let fsm_stop_total = IntCounter::with_opts(Opts::new(
            "im_runtime_fsm_stop_total",
            "Number of times the runtime state machine stopped on a terminal error",
        ))?;
        registry.register(Box::new(fsm_stop_total.clone()))?;

        let reconciliations_total = IntCounterVec::new(
            Opts::new("im_runtime_reconciliations_total", "Runtime reconciliations by result"),
            &["result"],
        )?;
        registry.register(Box::new(reconciliations_total.clone()))?;

        Ok(Self {
            registry,
            fsm_stop_total,
            reconciliations_total,
        })
    }

    pub fn encode_as_text(&self) -> Result<Vec<u8>, prometheus::Error> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::with_capacity(4096);
        encoder.encode(self.registry.gather().as_slice(), &mut buffer)?;
        Ok(buffer)
    }
}

impl Metrics for PrometheusMetrics {
    fn fsm_stop(&self) {
        self.fsm_stop_total.inc();
    }

    fn reconciliation(&self, result: ReconcileResult) {
        self.reconciliations_total.with_label_values(&[result.as_str()]).inc();
    }
}
