//! Status conditions
//!
//! Typed conditions shared by the Runtime and GardenerCluster CRDs.
//! Conditions are keyed by their `type`; a status never carries two
//! conditions with the same type.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Tri-state condition status, serialized the Kubernetes way.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq)]
pub enum ConditionStatus {
    /// Condition holds
    True,

    /// Condition does not hold
    False,

    /// Outcome not known yet
    #[default]
    Unknown,
}

/// A single status condition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Condition type (e.g. "Provisioned", "KubeconfigManagement")
    #[serde(rename = "type")]
    pub type_: String,

    /// Condition status
    pub status: ConditionStatus,

    /// Machine-readable reason in CamelCase
    pub reason: String,

    /// Human-readable message
    #[serde(default)]
    pub message: String,

    /// Last time the status of this condition changed
    pub last_transition_time: DateTime<Utc>,

    /// Generation of the object this condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl Condition {
    /// Builds a condition stamped with the current time.
    pub fn new(
        type_: impl Into<String>,
        status: ConditionStatus,
        reason: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_: type_.into(),
            status,
            reason: reason.into(),
            message: message.into(),
            last_transition_time: Utc::now(),
            observed_generation: None,
        }
    }

    /// Sets the observed generation.
    #[must_use]
    pub fn with_generation(mut self, generation: Option<i64>) -> Self {
        self.observed_generation = generation;
        self
    }
}

/// Inserts `condition` or replaces the existing condition of the same type.
///
/// When the status does not change, the previous `lastTransitionTime` is kept
/// so that only real transitions move the timestamp.
pub fn upsert_condition(conditions: &mut Vec<Condition>, mut condition: Condition) {
    match conditions.iter_mut().find(|c| c.type_ == condition.type_) {
        Some(existing) => {
            if existing.status == condition.status {
                condition.last_transition_time = existing.last_transition_time;
            }
            *existing = condition;
        }
        None => conditions.push(condition),
    }
}

/// Looks up a condition by type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn upsert_appends_new_type() {
        let mut conditions = Vec::new();
        upsert_condition(&mut conditions, Condition::new("Provisioned", ConditionStatus::Unknown, "ShootCreationPending", "Shoot is pending"));
        upsert_condition(&mut conditions, Condition::new("AuditLogConfigured", ConditionStatus::True, "AuditLogConfigured", ""));

        assert_eq!(conditions.len(), 2);
        assert_eq!(conditions[0].type_, "Provisioned");
        assert_eq!(conditions[1].type_, "AuditLogConfigured");
    }

    #[test]
    fn upsert_replaces_same_type() {
        let mut conditions = Vec::new();
        upsert_condition(&mut conditions, Condition::new("Provisioned", ConditionStatus::Unknown, "ShootCreationPending", "Shoot is pending"));
        upsert_condition(&mut conditions, Condition::new("Provisioned", ConditionStatus::True, "Ready", "Runtime is ready"));

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::True);
        assert_eq!(conditions[0].reason, "Ready");
    }

    #[test]
    fn upsert_keeps_transition_time_when_status_unchanged() {
        let mut original = Condition::new("Provisioned", ConditionStatus::Unknown, "ShootCreationPending", "");
        original.last_transition_time = Utc::now() - Duration::hours(1);
        let first_seen = original.last_transition_time;
        let mut conditions = vec![original];

        upsert_condition(&mut conditions, Condition::new("Provisioned", ConditionStatus::Unknown, "ShootCreationPending", "still pending"));
        assert_eq!(conditions[0].last_transition_time, first_seen);
        assert_eq!(conditions[0].message, "still pending");

        upsert_condition(&mut conditions, Condition::new("Provisioned", ConditionStatus::True, "Ready", ""));
        assert!(conditions[0].last_transition_time > first_seen);
    }

    #[test]
    fn status_serializes_kubernetes_style() {
        let condition = Condition::new("KubeconfigManagement", ConditionStatus::False, "FailedToGetSecret", "boom");
        let json = serde_json::to_value(&condition).unwrap();
        assert_eq!(json["type"], "KubeconfigManagement");
        assert_eq!(json["status"], "False");
        assert!(json.get("lastTransitionTime").is_some());
        assert!(json.get("observedGeneration").is_none());
    }
}
