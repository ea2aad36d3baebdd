//! Propagation Coordinator: given a change event, mark every decision
//! whose evaluation inputs may have changed as needing re-evaluation.
//! Marking is idempotent and fans out at most one hop per call; deeper
//! propagation happens through the affected decisions' own subsequent
//! evaluations.

use crate::collaborators::Store;
use decivue_core::ids::{AssumptionId, ConstraintId, DecisionId, OrganizationId};
use decivue_core::model::Lifecycle;

/// A change that may require re-evaluating some set of decisions.
#[derive(Debug, Clone, Copy)]
pub enum ChangeEvent {
    /// An assumption's status or scope changed.
    AssumptionChanged { organization_id: OrganizationId, assumption_id: AssumptionId, is_universal: bool },
    /// A constraint's definition changed.
    ConstraintChanged { constraint_id: ConstraintId },
    /// A dependency edge was added or removed.
    DependencyEdgeChanged { source: DecisionId },
    /// A dependency target's lifecycle or health changed.
    DependencyTargetChanged { target: DecisionId },
}

/// Mark `decision_id` dirty, unless it is Retired (Retired decisions are
/// never dirtied). Returns whether the flag actually flipped, which lets
/// callers observe idempotency but never changes behavior based on it.
pub fn mark_dirty(store: &dyn Store, organization_id: OrganizationId, decision_id: DecisionId) -> bool {
    let Some(mut decision) = store.get_decision(organization_id, decision_id) else {
        return false;
    };
    if decision.lifecycle == Lifecycle::Retired {
        return false;
    }
    let changed = !decision.needs_evaluation;
    decision.needs_evaluation = true;
    store.put_decision(decision);
    changed
}

/// Apply a change event's fan-out rule, dirtying every decision the spec
/// says must be re-evaluated as a result.
pub fn propagate(store: &dyn Store, event: ChangeEvent) {
    match event {
        ChangeEvent::AssumptionChanged { organization_id, assumption_id, is_universal } => {
            if is_universal {
                for decision in store.list_decisions(organization_id) {
                    mark_dirty(store, organization_id, decision.id);
                }
            } else {
                for decision in store.list_decisions(organization_id) {
                    let linked = store.assumptions_for_decision(organization_id, decision.id);
                    if linked.iter().any(|a| a.id == assumption_id) {
                        mark_dirty(store, organization_id, decision.id);
                    }
                }
            }
        }
        ChangeEvent::ConstraintChanged { constraint_id } => {
            // Constraints are not organization-scoped in this lookup;
            // every decision in every org that links the constraint is
            // dirtied. A real Store would index this directly instead
            // of scanning.
            if let Some(constraint) = store.get_constraint(constraint_id) {
                for decision in store.list_decisions(constraint.organization_id) {
                    if store.constraints_for_decision(decision.id).iter().any(|c| c.id == constraint_id) {
                        mark_dirty(store, constraint.organization_id, decision.id);
                    }
                }
            }
        }
        ChangeEvent::DependencyEdgeChanged { source } => {
            if let Some(decision) = store.find_decision(source) {
                mark_dirty(store, decision.organization_id, decision.id);
            }
        }
        ChangeEvent::DependencyTargetChanged { target } => {
            for source in store.dependents_of(target) {
                if let Some(decision) = store.find_decision(source) {
                    mark_dirty(store, decision.organization_id, decision.id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemoryStore;
    use decivue_core::ids::{OrganizationId, UserId};
    use decivue_core::model::{Assumption, AssumptionScope, AssumptionStatus, Decision};

    #[test]
    fn universal_assumption_change_dirties_every_decision_in_org() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d1 = Decision::new(org, UserId::new(), "a", "a", 0);
        d1.needs_evaluation = false;
        let mut d2 = Decision::new(org, UserId::new(), "b", "b", 0);
        d2.needs_evaluation = false;
        store.put_decision(d1.clone());
        store.put_decision(d2.clone());

        let assumption = Assumption {
            id: AssumptionId::new(),
            organization_id: org,
            description: "a".into(),
            status: AssumptionStatus::Broken,
            scope: AssumptionScope::Universal,
        };
        store.put_assumption(assumption.clone());

        propagate(
            &store,
            ChangeEvent::AssumptionChanged { organization_id: org, assumption_id: assumption.id, is_universal: true },
        );

        assert!(store.get_decision(org, d1.id).unwrap().needs_evaluation);
        assert!(store.get_decision(org, d2.id).unwrap().needs_evaluation);
    }

    #[test]
    fn mark_dirty_is_idempotent() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "a", "a", 0);
        d.needs_evaluation = false;
        store.put_decision(d.clone());

        let first = mark_dirty(&store, org, d.id);
        let second = mark_dirty(&store, org, d.id);
        assert!(first);
        assert!(!second);
        assert!(store.get_decision(org, d.id).unwrap().needs_evaluation);
    }

    #[test]
    fn retired_decisions_are_never_dirtied() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "a", "a", 0);
        d.lifecycle = Lifecycle::Retired;
        d.needs_evaluation = false;
        store.put_decision(d.clone());

        mark_dirty(&store, org, d.id);
        assert!(!store.get_decision(org, d.id).unwrap().needs_evaluation);
    }
}
