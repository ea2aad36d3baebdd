//! The external collaborator contracts the core consumes: a
//! transactional Store, actor resolution, user-visible notification
//! delivery, and conflict detection. Only `Store` ships an in-memory
//! reference implementation here; the other three are interfaces a real
//! deployment supplies.

use decivue_core::ids::{AssumptionId, ConstraintId, DecisionId, GovernanceAuditEntryId, OrganizationId, UserId};
use decivue_core::model::{Assumption, Constraint, Decision};
use decivue_history::{DecisionRelationChange, DecisionReview, DecisionVersion, EvaluationHistory, GovernanceAuditEntry};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// A team member's standing, which gates what `can_edit` allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Lead,
    Member,
}

/// The caller of a command, as resolved by `Identity`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
    pub organization_id: OrganizationId,
}

/// Resolves the current caller. A real deployment backs this with
/// session/auth state; the core never inspects credentials itself.
pub trait Identity: Send + Sync {
    fn current_actor(&self) -> Actor;
}

/// Notification severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// The kind of user-visible event a state transition produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    AssumptionConflict,
    DecisionConflict,
    HealthDegraded,
    LifecycleChanged,
    NeedsReview,
    AssumptionBroken,
    DependencyBroken,
    GovernanceEvent,
}

/// A typed, user-facing notification request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub severity: Severity,
    pub decision_id: DecisionId,
    pub message: String,
}

/// Delivers notifications. The core only asks a Notifier to surface an
/// event; delivery mechanics (email, chat, webhook) are out of scope.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// An unresolved-or-resolved conflict record about an assumption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssumptionConflict {
    pub id: u64,
    pub assumption_id: AssumptionId,
    pub resolved: bool,
}

/// An unresolved-or-resolved conflict record about a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionConflict {
    pub id: u64,
    pub decision_id: DecisionId,
    pub resolved: bool,
}

/// Produces assumption/decision conflict records. The core only ever
/// reads resolved/unresolved status from what this returns; it never
/// decides what counts as a conflict.
pub trait ConflictDetector: Send + Sync {
    fn assumption_conflicts(&self, assumption_id: AssumptionId) -> Vec<AssumptionConflict>;
    fn decision_conflicts(&self, decision_id: DecisionId) -> Vec<DecisionConflict>;
}

/// CRUD plus the org-scoped history tables, with atomic multi-write for
/// (version snapshot + decision field update). A real deployment backs
/// this with a database; [`InMemoryStore`] is the reference
/// implementation used by tests.
pub trait Store: Send + Sync {
    fn get_decision(&self, organization_id: OrganizationId, id: DecisionId) -> Option<Decision>;
    /// Fetch a decision by id alone, without checking the caller's
    /// organization. Used by propagation and scheduling paths that only
    /// have a `DecisionId` (e.g. from a dependency edge); command
    /// handlers that act on behalf of an actor must still use
    /// `get_decision` to enforce tenant isolation.
    fn find_decision(&self, id: DecisionId) -> Option<Decision>;
    fn put_decision(&self, decision: Decision);
    fn list_decisions(&self, organization_id: OrganizationId) -> Vec<Decision>;

    fn get_assumption(&self, id: AssumptionId) -> Option<Assumption>;
    fn put_assumption(&self, assumption: Assumption);
    /// Assumptions applicable to `decision_id`: every Universal
    /// assumption in its organization, plus every DecisionSpecific
    /// assumption explicitly linked to it.
    fn assumptions_for_decision(&self, organization_id: OrganizationId, decision_id: DecisionId) -> Vec<Assumption>;
    fn link_assumption(&self, decision_id: DecisionId, assumption_id: AssumptionId) -> bool;
    fn unlink_assumption(&self, decision_id: DecisionId, assumption_id: AssumptionId) -> bool;

    fn get_constraint(&self, id: ConstraintId) -> Option<Constraint>;
    fn put_constraint(&self, constraint: Constraint);
    fn constraints_for_decision(&self, decision_id: DecisionId) -> Vec<Constraint>;
    fn link_constraint(&self, decision_id: DecisionId, constraint_id: ConstraintId) -> bool;
    fn unlink_constraint(&self, decision_id: DecisionId, constraint_id: ConstraintId) -> bool;

    /// Targets `source` depends on.
    fn dependencies_of(&self, source: DecisionId) -> Vec<DecisionId>;
    /// Sources that depend on `target` (one-hop reverse edges).
    fn dependents_of(&self, target: DecisionId) -> Vec<DecisionId>;
    fn add_dependency(&self, source: DecisionId, target: DecisionId) -> bool;
    fn remove_dependency(&self, source: DecisionId, target: DecisionId) -> bool;

    fn next_version_number(&self, decision_id: DecisionId) -> u64;
    fn append_version(&self, version: DecisionVersion);
    fn version_history(&self, decision_id: DecisionId) -> Vec<DecisionVersion>;

    fn append_relation_change(&self, change: DecisionRelationChange);
    fn relation_history(&self, decision_id: DecisionId) -> Vec<DecisionRelationChange>;

    fn append_review(&self, review: DecisionReview);
    fn review_history(&self, decision_id: DecisionId) -> Vec<DecisionReview>;

    fn append_evaluation_history(&self, record: EvaluationHistory);
    fn evaluation_history(&self, decision_id: DecisionId) -> Vec<EvaluationHistory>;

    fn append_governance_audit_entry(&self, entry: GovernanceAuditEntry);
    fn get_governance_audit_entry(&self, id: GovernanceAuditEntryId) -> Option<GovernanceAuditEntry>;
    fn put_governance_audit_entry(&self, entry: GovernanceAuditEntry);
    fn open_edit_requests(&self, decision_id: DecisionId) -> Vec<GovernanceAuditEntry>;
}

#[derive(Default)]
struct StoreState {
    decisions: HashMap<DecisionId, Decision>,
    assumptions: HashMap<AssumptionId, Assumption>,
    decision_assumption_links: HashMap<DecisionId, HashSet<AssumptionId>>,
    constraints: HashMap<ConstraintId, Constraint>,
    decision_constraint_links: HashMap<DecisionId, HashSet<ConstraintId>>,
    dependency_edges: HashMap<DecisionId, HashSet<DecisionId>>,
    version_counters: HashMap<DecisionId, u64>,
    versions: HashMap<DecisionId, Vec<DecisionVersion>>,
    relation_changes: HashMap<DecisionId, Vec<DecisionRelationChange>>,
    reviews: HashMap<DecisionId, Vec<DecisionReview>>,
    evaluation_history: HashMap<DecisionId, Vec<EvaluationHistory>>,
    governance_audit_entries: HashMap<GovernanceAuditEntryId, GovernanceAuditEntry>,
}

/// An in-memory [`Store`] used by tests and the examples in this crate.
/// Not persistent; guarded by a single mutex since it only ever backs
/// single-process test scenarios.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for InMemoryStore {
    fn get_decision(&self, organization_id: OrganizationId, id: DecisionId) -> Option<Decision> {
        let state = self.state.lock().unwrap();
        state.decisions.get(&id).filter(|d| d.organization_id == organization_id).cloned()
    }

    fn find_decision(&self, id: DecisionId) -> Option<Decision> {
        self.state.lock().unwrap().decisions.get(&id).cloned()
    }

    fn put_decision(&self, decision: Decision) {
        let mut state = self.state.lock().unwrap();
        state.decisions.insert(decision.id, decision);
    }

    fn list_decisions(&self, organization_id: OrganizationId) -> Vec<Decision> {
        let state = self.state.lock().unwrap();
        state.decisions.values().filter(|d| d.organization_id == organization_id).cloned().collect()
    }

    fn get_assumption(&self, id: AssumptionId) -> Option<Assumption> {
        self.state.lock().unwrap().assumptions.get(&id).cloned()
    }

    fn put_assumption(&self, assumption: Assumption) {
        self.state.lock().unwrap().assumptions.insert(assumption.id, assumption);
    }

    fn assumptions_for_decision(&self, organization_id: OrganizationId, decision_id: DecisionId) -> Vec<Assumption> {
        let state = self.state.lock().unwrap();
        let linked = state.decision_assumption_links.get(&decision_id).cloned().unwrap_or_default();
        state
            .assumptions
            .values()
            .filter(|a| {
                a.organization_id == organization_id
                    && (a.scope == decivue_core::model::AssumptionScope::Universal || linked.contains(&a.id))
            })
            .cloned()
            .collect()
    }

    fn link_assumption(&self, decision_id: DecisionId, assumption_id: AssumptionId) -> bool {
        let mut state = self.state.lock().unwrap();
        state.decision_assumption_links.entry(decision_id).or_default().insert(assumption_id)
    }

    fn unlink_assumption(&self, decision_id: DecisionId, assumption_id: AssumptionId) -> bool {
        let mut state = self.state.lock().unwrap();
        state
            .decision_assumption_links
            .get_mut(&decision_id)
            .map(|set| set.remove(&assumption_id))
            .unwrap_or(false)
    }

    fn get_constraint(&self, id: ConstraintId) -> Option<Constraint> {
        self.state.lock().unwrap().constraints.get(&id).cloned()
    }

    fn put_constraint(&self, constraint: Constraint) {
        self.state.lock().unwrap().constraints.insert(constraint.id, constraint);
    }

    fn constraints_for_decision(&self, decision_id: DecisionId) -> Vec<Constraint> {
        let state = self.state.lock().unwrap();
        let linked = state.decision_constraint_links.get(&decision_id).cloned().unwrap_or_default();
        state.constraints.values().filter(|c| linked.contains(&c.id)).cloned().collect()
    }

    fn link_constraint(&self, decision_id: DecisionId, constraint_id: ConstraintId) -> bool {
        let mut state = self.state.lock().unwrap();
        state.decision_constraint_links.entry(decision_id).or_default().insert(constraint_id)
    }

    fn unlink_constraint(&self, decision_id: DecisionId, constraint_id: ConstraintId) -> bool {
        let mut state = self.state.lock().unwrap();
        state
            .decision_constraint_links
            .get_mut(&decision_id)
            .map(|set| set.remove(&constraint_id))
            .unwrap_or(false)
    }

    fn dependencies_of(&self, source: DecisionId) -> Vec<DecisionId> {
        let state = self.state.lock().unwrap();
        state.dependency_edges.get(&source).map(|s| s.iter().copied().collect()).unwrap_or_default()
    }

    fn dependents_of(&self, target: DecisionId) -> Vec<DecisionId> {
        let state = self.state.lock().unwrap();
        state
            .dependency_edges
            .iter()
            .filter(|(_, targets)| targets.contains(&target))
            .map(|(source, _)| *source)
            .collect()
    }

    fn add_dependency(&self, source: DecisionId, target: DecisionId) -> bool {
        let mut state = self.state.lock().unwrap();
        state.dependency_edges.entry(source).or_default().insert(target)
    }

    fn remove_dependency(&self, source: DecisionId, target: DecisionId) -> bool {
        let mut state = self.state.lock().unwrap();
        state.dependency_edges.get_mut(&source).map(|s| s.remove(&target)).unwrap_or(false)
    }

    fn next_version_number(&self, decision_id: DecisionId) -> u64 {
        let mut state = self.state.lock().unwrap();
        let counter = state.version_counters.entry(decision_id).or_insert(0);
        *counter += 1;
        *counter
    }

    fn append_version(&self, version: DecisionVersion) {
        let mut state = self.state.lock().unwrap();
        state.versions.entry(version.decision_id).or_default().push(version);
    }

    fn version_history(&self, decision_id: DecisionId) -> Vec<DecisionVersion> {
        self.state.lock().unwrap().versions.get(&decision_id).cloned().unwrap_or_default()
    }

    fn append_relation_change(&self, change: DecisionRelationChange) {
        let mut state = self.state.lock().unwrap();
        state.relation_changes.entry(change.decision_id).or_default().push(change);
    }

    fn relation_history(&self, decision_id: DecisionId) -> Vec<DecisionRelationChange> {
        self.state.lock().unwrap().relation_changes.get(&decision_id).cloned().unwrap_or_default()
    }

    fn append_review(&self, review: DecisionReview) {
        let mut state = self.state.lock().unwrap();
        state.reviews.entry(review.decision_id).or_default().push(review);
    }

    fn review_history(&self, decision_id: DecisionId) -> Vec<DecisionReview> {
        self.state.lock().unwrap().reviews.get(&decision_id).cloned().unwrap_or_default()
    }

    fn append_evaluation_history(&self, record: EvaluationHistory) {
        let mut state = self.state.lock().unwrap();
        state.evaluation_history.entry(record.decision_id).or_default().push(record);
    }

    fn evaluation_history(&self, decision_id: DecisionId) -> Vec<EvaluationHistory> {
        self.state.lock().unwrap().evaluation_history.get(&decision_id).cloned().unwrap_or_default()
    }

    fn append_governance_audit_entry(&self, entry: GovernanceAuditEntry) {
        self.state.lock().unwrap().governance_audit_entries.insert(entry.id, entry);
    }

    fn get_governance_audit_entry(&self, id: GovernanceAuditEntryId) -> Option<GovernanceAuditEntry> {
        self.state.lock().unwrap().governance_audit_entries.get(&id).cloned()
    }

    fn put_governance_audit_entry(&self, entry: GovernanceAuditEntry) {
        self.state.lock().unwrap().governance_audit_entries.insert(entry.id, entry);
    }

    fn open_edit_requests(&self, decision_id: DecisionId) -> Vec<GovernanceAuditEntry> {
        self.state
            .lock()
            .unwrap()
            .governance_audit_entries
            .values()
            .filter(|e| e.decision_id == decision_id && e.resolved_at.is_none())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decivue_core::ids::{OrganizationId, UserId};
    use decivue_core::model::Decision;

    #[test]
    fn put_and_get_decision_round_trips() {
        let store = InMemoryStore::new();
        let d = Decision::new(OrganizationId::new(), UserId::new(), "t", "d", 0);
        let org = d.organization_id;
        let id = d.id;
        store.put_decision(d);
        assert!(store.get_decision(org, id).is_some());
    }

    #[test]
    fn get_decision_is_org_scoped() {
        let store = InMemoryStore::new();
        let d = Decision::new(OrganizationId::new(), UserId::new(), "t", "d", 0);
        let id = d.id;
        store.put_decision(d);
        assert!(store.get_decision(OrganizationId::new(), id).is_none());
    }

    #[test]
    fn version_numbers_are_dense_and_monotonic() {
        let store = InMemoryStore::new();
        let decision_id = DecisionId::new();
        assert_eq!(store.next_version_number(decision_id), 1);
        assert_eq!(store.next_version_number(decision_id), 2);
        assert_eq!(store.next_version_number(decision_id), 3);
    }

    #[test]
    fn link_assumption_is_idempotent() {
        let store = InMemoryStore::new();
        let decision_id = DecisionId::new();
        let assumption_id = AssumptionId::new();
        assert!(store.link_assumption(decision_id, assumption_id));
        assert!(!store.link_assumption(decision_id, assumption_id));
    }
}
