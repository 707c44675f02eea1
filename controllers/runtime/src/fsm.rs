//! Runtime state machine
//!
//! [`select`] maps the observed Runtime and Shoot to the next [`Step`]. It
//! is pure; the reconciler executes the step. Nothing about the machine's
//! position is persisted, so the same observation always yields the same
//! step.

use crds::Runtime;
use gardener_client::{LastOperationState, LastOperationType, Shoot};
use lifecycle_policy::spec_drift;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Runtime lacks required labels
    Invalid(Vec<String>),
    /// Finalizer must be in place before a Shoot exists
    AddFinalizer,
    CreateShoot,
    /// Gardener is still working on the Shoot
    AwaitOperation {
        operation: LastOperationType,
        state: LastOperationState,
        description: String,
    },
    /// Gardener gave up on the last operation
    OperationFailed {
        operation: LastOperationType,
        description: String,
    },
    /// Runtime changed since the Shoot was built
    PatchShoot,
    /// Last operation succeeded; check audit logs and report readiness
    ConfirmReady,
    DeleteShoot,
    /// Shoot already carries a deletion timestamp
    AwaitDeletion,
    RemoveFinalizer,
    /// Runtime is going away and nothing is left to clean up
    Finished,
}

pub fn select(runtime: &Runtime, shoot: Option<&Shoot>) -> Step {
    if runtime.is_deleting() {
        return select_deletion(runtime, shoot);
    }

    if let Err(crds::CrdError::MissingLabels(missing)) = runtime.validate_required_labels() {
        return Step::Invalid(missing);
    }

    if !runtime.has_finalizer() {
        return Step::AddFinalizer;
    }

    let Some(shoot) = shoot else {
        return Step::CreateShoot;
    };

    // a changed Runtime is pushed even while an operation is still running
    if spec_drift(runtime, shoot) {
        return Step::PatchShoot;
    }

    let Some(last_operation) = shoot.last_operation() else {
        return Step::AwaitOperation {
            operation: LastOperationType::Create,
            state: LastOperationState::Pending,
            description: String::new(),
        };
    };

    match last_operation.state {
        LastOperationState::Succeeded => Step::ConfirmReady,
        LastOperationState::Failed | LastOperationState::Aborted => Step::OperationFailed {
            operation: last_operation.type_,
            description: last_operation.description.clone(),
        },
        state => Step::AwaitOperation {
            operation: last_operation.type_,
            state,
            description: last_operation.description.clone(),
        },
    }
}

fn select_deletion(runtime: &Runtime, shoot: Option<&Shoot>) -> Step {
    let Some(shoot) = shoot else {
        return if runtime.has_finalizer() {
            Step::RemoveFinalizer
        } else {
            Step::Finished
        };
    };

    if !shoot.is_deleting() {
        return Step::DeleteShoot;
    }

    match shoot.last_operation() {
        Some(op) if op.type_ == LastOperationType::Delete && op.state == LastOperationState::Failed => {
            Step::OperationFailed {
                operation: op.type_,
                description: op.description.clone(),
            }
        }
        _ => Step::AwaitDeletion,
    }
}
