//! Ties the engine, urgency calculator, and history log into one
//! deployable surface: a deterministic clock, the in-memory
//! collaborator contracts, change propagation, the evaluation
//! scheduler, the governance state machine, and the command/query API
//! a caller actually drives.

#![deny(unsafe_code)]

pub mod clock;
pub mod collaborators;
pub mod commands;
pub mod governance;
pub mod propagation;
pub mod scheduler;

pub use clock::{process_clock, set_process_clock, Clock, SystemClock, VirtualClock};
pub use collaborators::{
    Actor, AssumptionConflict, ConflictDetector, DecisionConflict, Identity, InMemoryStore, Notification,
    NotificationKind, Notifier, Role, Severity, Store,
};
pub use governance::{EditGate, ProposedChanges};
pub use propagation::{mark_dirty, propagate, ChangeEvent};
pub use scheduler::{evaluate_one, is_due, run_tick, select_batch, SchedulerConfig};

#[cfg(test)]
mod tests {
    use super::*;
    use commands::{create_decision, CreateDecisionInput};
    use decivue_core::ids::{AssumptionId, DecisionId, OrganizationId, UserId};
    use decivue_engine::EngineConfig;
    use decivue_history::TriggeredBy;
    use serde_json::Value as JsonValue;

    struct NoConflicts;
    impl ConflictDetector for NoConflicts {
        fn assumption_conflicts(&self, _assumption_id: AssumptionId) -> Vec<AssumptionConflict> {
            Vec::new()
        }
        fn decision_conflicts(&self, _decision_id: DecisionId) -> Vec<DecisionConflict> {
            Vec::new()
        }
    }

    /// End-to-end: create a decision through the command surface, run a
    /// scheduler tick, and confirm the whole pipeline advanced state and
    /// left a readable timeline.
    #[test]
    fn create_then_schedule_produces_a_readable_timeline() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let actor = Actor { user_id: UserId::new(), role: Role::Lead, organization_id: org };

        let outcome = create_decision(
            &store,
            &actor,
            CreateDecisionInput {
                title: "adopt vendor x".into(),
                description: "desc".into(),
                category: None,
                parameters: JsonValue::Null,
                expiry_date: None,
                governance_mode: false,
            },
            1_000,
        );
        let decivue_core::outcomes::DomainOutcome::Ok(decision) = outcome else { panic!("expected ok") };
        assert!(decision.needs_evaluation);

        let engine_cfg = EngineConfig::default();
        let evaluated = scheduler::evaluate_one(&store, &NoConflicts, org, decision.id, 2_000, &engine_cfg, TriggeredBy::Automatic);
        assert!(evaluated.is_some());

        let timeline = commands::get_change_timeline(&store, decision.id);
        assert!(!timeline.is_empty());
    }
}
