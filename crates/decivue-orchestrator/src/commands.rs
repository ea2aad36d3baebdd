//! The command/query surface: the only entry points a deployment calls.
//! Every mutating command resolves the caller through `Identity`, checks
//! governance via [`crate::governance::can_edit`], applies the change,
//! and appends the corresponding history row, all through a
//! [`Store`]. Nothing here touches a clock directly; `now` always comes
//! from the caller.

use crate::collaborators::{Actor, ConflictDetector, Role, Store};
use crate::governance::{self, EditGate};
use crate::propagation::{self, ChangeEvent};
use crate::scheduler::{self, SchedulerConfig};
use decivue_core::ids::{AssumptionId, ConstraintId, DecisionId, OrganizationId, UserId};
use decivue_core::model::{
    Assumption, AssumptionScope, AssumptionStatus, Constraint, Decision, GovernanceTier, Lifecycle,
};
use decivue_core::outcomes::DomainOutcome;
use decivue_core::time::Timestamp;
use decivue_engine::EngineConfig;
use decivue_history::{
    ChangeType, DecisionRelationChange, DecisionReview, DecisionSnapshot, DecisionVersion, FieldDelta,
    RelationAction, RelationType, ReviewOutcome, ReviewType, TriggeredBy,
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

fn locked_outcome<T>(decision: &Decision) -> DomainOutcome<T> {
    DomainOutcome::Locked { locked_by: decision.locked_by.map(|u| u.0.to_string()).unwrap_or_default() }
}

/// Apply a gate result that doesn't need to open an edit request
/// (justification/lock checks only). `RequireApproval` is handled by the
/// caller, since it needs `eligible_approvers` to open a real request.
fn gate_to_outcome<T>(gate: EditGate, decision: &Decision) -> Option<DomainOutcome<T>> {
    match gate {
        EditGate::Allow | EditGate::RequireApproval => None,
        EditGate::RequireJustification => Some(DomainOutcome::RequiresJustification),
        EditGate::Deny => Some(locked_outcome(decision)),
    }
}

fn snapshot_of(decision: &Decision) -> DecisionSnapshot {
    DecisionSnapshot { title: decision.title.clone(), description: decision.description.clone(), category: decision.category.clone() }
}

fn append_version(
    store: &dyn Store,
    decision: &Decision,
    change_type: ChangeType,
    change_summary: impl Into<String>,
    changed_fields: BTreeMap<String, FieldDelta>,
    reviewer_comment: Option<String>,
    now: Timestamp,
) {
    let version_number = store.next_version_number(decision.id);
    store.append_version(DecisionVersion {
        decision_id: decision.id,
        version_number,
        snapshot: snapshot_of(decision),
        change_type,
        change_summary: change_summary.into(),
        changed_fields,
        reviewer_comment,
        metadata: JsonValue::Null,
        recorded_at: now,
    });
}

/// Fields accepted by `CreateDecision`.
#[derive(Debug, Clone)]
pub struct CreateDecisionInput {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
    pub parameters: JsonValue,
    pub expiry_date: Option<Timestamp>,
    pub governance_mode: bool,
}

pub fn create_decision(store: &dyn Store, actor: &Actor, input: CreateDecisionInput, now: Timestamp) -> DomainOutcome<Decision> {
    let mut decision = Decision::new(actor.organization_id, actor.user_id, &input.title, &input.description, now);
    decision.category = input.category;
    decision.parameters = input.parameters;
    decision.expiry_date = input.expiry_date;
    decision.governance_mode = input.governance_mode;
    store.put_decision(decision.clone());
    append_version(store, &decision, ChangeType::Created, "decision created", BTreeMap::new(), None, now);
    DomainOutcome::Ok(decision)
}

/// Fields `UpdateDecision` may change; unset fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateDecisionInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<Option<String>>,
    pub parameters: Option<JsonValue>,
    pub expiry_date: Option<Option<Timestamp>>,
    pub justification: Option<String>,
}

pub fn update_decision(
    store: &dyn Store,
    actor: &Actor,
    decision_id: DecisionId,
    input: UpdateDecisionInput,
    eligible_approvers: &[UserId],
    now: Timestamp,
) -> DomainOutcome<Decision> {
    let Some(mut decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if decision.lifecycle == Lifecycle::Retired {
        return DomainOutcome::TerminalState;
    }

    let gate = governance::can_edit(store, &decision, actor, input.justification.as_deref());
    if let Some(outcome) = gate_to_outcome(gate, &decision) {
        return outcome;
    }
    if gate == EditGate::RequireApproval {
        let proposed = ProposedChanges { title: input.title, description: input.description, category: input.category.flatten() };
        return match governance::request_edit(store, &decision, actor, input.justification, proposed, eligible_approvers, now) {
            DomainOutcome::Ok(audit_entry_id) => DomainOutcome::RequiresApproval { audit_entry_id },
            DomainOutcome::Forbidden { reason } => DomainOutcome::Forbidden { reason },
            DomainOutcome::Conflict { reason } => DomainOutcome::Conflict { reason },
            DomainOutcome::NotFound => DomainOutcome::NotFound,
            _ => DomainOutcome::Conflict { reason: "unexpected edit-request state".to_string() },
        };
    }

    let mut changed_fields = BTreeMap::new();
    if let Some(title) = input.title {
        if title != decision.title {
            changed_fields.insert("title".to_string(), FieldDelta { old: decision.title.clone().into(), new: title.clone().into() });
            decision.title = title;
        }
    }
    if let Some(description) = input.description {
        if description != decision.description {
            changed_fields.insert(
                "description".to_string(),
                FieldDelta { old: decision.description.clone().into(), new: description.clone().into() },
            );
            decision.description = description;
        }
    }
    if let Some(category) = input.category {
        if category != decision.category {
            changed_fields.insert(
                "category".to_string(),
                FieldDelta {
                    old: decision.category.clone().map_or(JsonValue::Null, Into::into),
                    new: category.clone().map_or(JsonValue::Null, Into::into),
                },
            );
            decision.category = category;
        }
    }
    if let Some(parameters) = input.parameters {
        if parameters != decision.parameters {
            changed_fields.insert("parameters".to_string(), FieldDelta { old: decision.parameters.clone(), new: parameters.clone() });
            decision.parameters = parameters;
        }
    }
    if let Some(expiry_date) = input.expiry_date {
        if expiry_date != decision.expiry_date {
            changed_fields.insert(
                "expiry_date".to_string(),
                FieldDelta {
                    old: decision.expiry_date.map_or(JsonValue::Null, Into::into),
                    new: expiry_date.map_or(JsonValue::Null, Into::into),
                },
            );
            decision.expiry_date = expiry_date;
        }
    }

    if changed_fields.is_empty() {
        return DomainOutcome::Ok(decision);
    }

    decision.needs_evaluation = true;
    store.put_decision(decision.clone());
    append_version(store, &decision, ChangeType::FieldUpdated, "decision fields updated", changed_fields, None, now);
    DomainOutcome::Ok(decision)
}

fn record_relation_change(
    store: &dyn Store,
    decision_id: DecisionId,
    relation_type: RelationType,
    relation_id: String,
    action: RelationAction,
    now: Timestamp,
) {
    store.append_relation_change(DecisionRelationChange { decision_id, relation_type, relation_id, action, reason: None, recorded_at: now });
}

pub fn link_assumption(store: &dyn Store, actor: &Actor, decision_id: DecisionId, assumption_id: AssumptionId, now: Timestamp) -> DomainOutcome<()> {
    let Some(decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if decision.lifecycle == Lifecycle::Retired {
        return DomainOutcome::TerminalState;
    }
    if store.get_assumption(assumption_id).is_none() {
        return DomainOutcome::NotFound;
    }
    if store.link_assumption(decision_id, assumption_id) {
        record_relation_change(store, decision_id, RelationType::Assumption, assumption_id.0.to_string(), RelationAction::Linked, now);
        propagation::mark_dirty(store, actor.organization_id, decision_id);
    }
    DomainOutcome::Ok(())
}

pub fn unlink_assumption(store: &dyn Store, actor: &Actor, decision_id: DecisionId, assumption_id: AssumptionId, now: Timestamp) -> DomainOutcome<()> {
    let Some(decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if decision.lifecycle == Lifecycle::Retired {
        return DomainOutcome::TerminalState;
    }
    if store.unlink_assumption(decision_id, assumption_id) {
        record_relation_change(store, decision_id, RelationType::Assumption, assumption_id.0.to_string(), RelationAction::Unlinked, now);
        propagation::mark_dirty(store, actor.organization_id, decision_id);
    }
    DomainOutcome::Ok(())
}

pub fn link_constraint(store: &dyn Store, actor: &Actor, decision_id: DecisionId, constraint_id: ConstraintId, now: Timestamp) -> DomainOutcome<()> {
    let Some(decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if decision.lifecycle == Lifecycle::Retired {
        return DomainOutcome::TerminalState;
    }
    if store.get_constraint(constraint_id).is_none() {
        return DomainOutcome::NotFound;
    }
    if store.link_constraint(decision_id, constraint_id) {
        record_relation_change(store, decision_id, RelationType::Constraint, constraint_id.0.to_string(), RelationAction::Linked, now);
        propagation::mark_dirty(store, actor.organization_id, decision_id);
    }
    DomainOutcome::Ok(())
}

pub fn unlink_constraint(store: &dyn Store, actor: &Actor, decision_id: DecisionId, constraint_id: ConstraintId, now: Timestamp) -> DomainOutcome<()> {
    let Some(decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if decision.lifecycle == Lifecycle::Retired {
        return DomainOutcome::TerminalState;
    }
    if store.unlink_constraint(decision_id, constraint_id) {
        record_relation_change(store, decision_id, RelationType::Constraint, constraint_id.0.to_string(), RelationAction::Unlinked, now);
        propagation::mark_dirty(store, actor.organization_id, decision_id);
    }
    DomainOutcome::Ok(())
}

/// Would adding `source -> target` create a cycle, given the existing
/// dependency graph? Walks forward from `target`; a path back to
/// `source` means the new edge closes a cycle.
fn creates_cycle(store: &dyn Store, source: DecisionId, target: DecisionId) -> bool {
    let mut stack = vec![target];
    let mut seen = std::collections::HashSet::new();
    while let Some(node) = stack.pop() {
        if node == source {
            return true;
        }
        if !seen.insert(node) {
            continue;
        }
        stack.extend(store.dependencies_of(node));
    }
    false
}

pub fn link_dependency(store: &dyn Store, actor: &Actor, source: DecisionId, target: DecisionId, now: Timestamp) -> DomainOutcome<()> {
    let Some(source_decision) = store.get_decision(actor.organization_id, source) else {
        return DomainOutcome::NotFound;
    };
    if store.find_decision(target).is_none() {
        return DomainOutcome::NotFound;
    }
    if source == target || creates_cycle(store, source, target) {
        return DomainOutcome::CyclicDependency;
    }
    if store.add_dependency(source, target) {
        record_relation_change(store, source, RelationType::Dependency, target.0.to_string(), RelationAction::Linked, now);
        propagation::mark_dirty(store, source_decision.organization_id, source);
    }
    DomainOutcome::Ok(())
}

pub fn unlink_dependency(store: &dyn Store, actor: &Actor, source: DecisionId, target: DecisionId, now: Timestamp) -> DomainOutcome<()> {
    let Some(source_decision) = store.get_decision(actor.organization_id, source) else {
        return DomainOutcome::NotFound;
    };
    if store.remove_dependency(source, target) {
        record_relation_change(store, source, RelationType::Dependency, target.0.to_string(), RelationAction::Unlinked, now);
        propagation::mark_dirty(store, source_decision.organization_id, source);
    }
    DomainOutcome::Ok(())
}

pub fn set_assumption_status(
    store: &dyn Store,
    actor: &Actor,
    assumption_id: AssumptionId,
    status: AssumptionStatus,
) -> DomainOutcome<Assumption> {
    let Some(mut assumption) = store.get_assumption(assumption_id) else {
        return DomainOutcome::NotFound;
    };
    if assumption.organization_id != actor.organization_id {
        return DomainOutcome::NotFound;
    }
    if assumption.status == status {
        return DomainOutcome::Ok(assumption);
    }
    assumption.status = status;
    store.put_assumption(assumption.clone());
    propagation::propagate(
        store,
        ChangeEvent::AssumptionChanged {
            organization_id: assumption.organization_id,
            assumption_id: assumption.id,
            is_universal: assumption.scope == AssumptionScope::Universal,
        },
    );
    DomainOutcome::Ok(assumption)
}

/// Fields a `ReviewDecision` call records.
#[derive(Debug, Clone)]
pub struct ReviewDecisionInput {
    pub review_type: ReviewType,
    pub comment: Option<String>,
    pub outcome: ReviewOutcome,
    pub deferral_reason: Option<String>,
}

/// Review a decision: always advances `last_reviewed_at` (invariant 5),
/// always re-runs the engine so `post_lifecycle`/`post_health` reflect
/// the state right after the review.
pub fn review_decision(
    store: &dyn Store,
    conflict_detector: &dyn ConflictDetector,
    actor: &Actor,
    decision_id: DecisionId,
    input: ReviewDecisionInput,
    engine_cfg: &EngineConfig,
    now: Timestamp,
) -> DomainOutcome<DecisionReview> {
    let Some(before) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if before.lifecycle == Lifecycle::Retired {
        return DomainOutcome::TerminalState;
    }
    let pre_lifecycle = before.lifecycle;
    let pre_health = before.health_signal;

    scheduler::evaluate_one(store, conflict_detector, actor.organization_id, decision_id, now, engine_cfg, TriggeredBy::ManualReview);

    let mut after = store.get_decision(actor.organization_id, decision_id).unwrap_or(before);
    after.last_reviewed_at = now;
    after.consecutive_deferrals = if input.outcome == ReviewOutcome::Deferred { after.consecutive_deferrals + 1 } else { 0 };
    store.put_decision(after.clone());

    let review = DecisionReview {
        decision_id,
        reviewer: actor.user_id,
        review_type: input.review_type,
        comment: input.comment,
        pre_lifecycle,
        pre_health,
        post_lifecycle: after.lifecycle,
        post_health: after.health_signal,
        outcome: input.outcome,
        deferral_reason: input.deferral_reason,
        next_review_date: after.next_review_date,
        recorded_at: now,
    };
    store.append_review(review.clone());
    append_version(store, &after, ChangeType::ManualReview, "manual review recorded", BTreeMap::new(), review.comment.clone(), now);
    DomainOutcome::Ok(review)
}

pub fn mark_for_evaluation(store: &dyn Store, actor: &Actor, decision_id: DecisionId) -> DomainOutcome<()> {
    if store.get_decision(actor.organization_id, decision_id).is_none() {
        return DomainOutcome::NotFound;
    }
    if propagation::mark_dirty(store, actor.organization_id, decision_id) {
        DomainOutcome::Ok(())
    } else {
        match store.get_decision(actor.organization_id, decision_id) {
            Some(d) if d.lifecycle == Lifecycle::Retired => DomainOutcome::TerminalState,
            _ => DomainOutcome::Ok(()),
        }
    }
}

/// Run one scheduler tick for the actor's organization and return how
/// many decisions were evaluated.
pub fn run_evaluation_batch(
    store: &dyn Store,
    conflict_detector: &dyn ConflictDetector,
    actor: &Actor,
    now: Timestamp,
    engine_cfg: &EngineConfig,
    scheduler_cfg: &SchedulerConfig,
) -> usize {
    let token = tokio_util::sync::CancellationToken::new();
    scheduler::run_tick(store, conflict_detector, actor.organization_id, now, engine_cfg, scheduler_cfg, &token)
}

/// Fields a `RequestEdit` call proposes to change, pending approval.
pub use crate::governance::ProposedChanges;

pub fn request_edit(
    store: &dyn Store,
    actor: &Actor,
    decision_id: DecisionId,
    justification: Option<String>,
    proposed_changes: ProposedChanges,
    eligible_approvers: &[UserId],
    now: Timestamp,
) -> DomainOutcome<decivue_core::ids::GovernanceAuditEntryId> {
    let Some(decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    governance::request_edit(store, &decision, actor, justification, proposed_changes, eligible_approvers, now)
}

pub fn resolve_edit(
    store: &dyn Store,
    actor: &Actor,
    audit_entry_id: decivue_core::ids::GovernanceAuditEntryId,
    decision_id: DecisionId,
    approved: bool,
    proposed_changes: ProposedChanges,
    now: Timestamp,
) -> DomainOutcome<Decision> {
    let resolved = governance::resolve(store, audit_entry_id, actor, approved, now);
    if !matches!(resolved, DomainOutcome::Ok(())) {
        return match resolved {
            DomainOutcome::NotFound => DomainOutcome::NotFound,
            DomainOutcome::Forbidden { reason } => DomainOutcome::Forbidden { reason },
            DomainOutcome::Conflict { reason } => DomainOutcome::Conflict { reason },
            _ => DomainOutcome::Conflict { reason: "unexpected resolution state".to_string() },
        };
    }

    let Some(mut decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if !approved {
        return DomainOutcome::Ok(decision);
    }

    let mut changed_fields = BTreeMap::new();
    if let Some(title) = proposed_changes.title {
        if title != decision.title {
            changed_fields.insert("title".to_string(), FieldDelta { old: decision.title.clone().into(), new: title.clone().into() });
            decision.title = title;
        }
    }
    if let Some(description) = proposed_changes.description {
        if description != decision.description {
            changed_fields.insert(
                "description".to_string(),
                FieldDelta { old: decision.description.clone().into(), new: description.clone().into() },
            );
            decision.description = description;
        }
    }
    if let Some(category) = proposed_changes.category {
        changed_fields.insert(
            "category".to_string(),
            FieldDelta { old: decision.category.clone().map_or(JsonValue::Null, Into::into), new: category.clone().into() },
        );
        decision.category = Some(category);
    }

    decision.needs_evaluation = true;
    store.put_decision(decision.clone());
    append_version(store, &decision, ChangeType::EditApproved, "edit request approved", changed_fields, None, now);
    DomainOutcome::Ok(decision)
}

pub fn lock_decision(store: &dyn Store, actor: &Actor, decision_id: DecisionId, now: Timestamp) -> DomainOutcome<Decision> {
    let Some(mut decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    match governance::lock(store, &mut decision, actor, now) {
        DomainOutcome::Ok(()) => {
            store.put_decision(decision.clone());
            append_version(store, &decision, ChangeType::GovernanceLock, "decision locked", BTreeMap::new(), None, now);
            DomainOutcome::Ok(decision)
        }
        DomainOutcome::Forbidden { reason } => DomainOutcome::Forbidden { reason },
        _ => DomainOutcome::Conflict { reason: "unexpected lock state".to_string() },
    }
}

pub fn unlock_decision(store: &dyn Store, actor: &Actor, decision_id: DecisionId, now: Timestamp) -> DomainOutcome<Decision> {
    let Some(mut decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    match governance::unlock(store, &mut decision, actor, now) {
        DomainOutcome::Ok(()) => {
            store.put_decision(decision.clone());
            append_version(store, &decision, ChangeType::GovernanceUnlock, "decision unlocked", BTreeMap::new(), None, now);
            DomainOutcome::Ok(decision)
        }
        DomainOutcome::Forbidden { reason } => DomainOutcome::Forbidden { reason },
        _ => DomainOutcome::Conflict { reason: "unexpected unlock state".to_string() },
    }
}

/// Governance fields `UpdateGovernanceSettings` may change.
#[derive(Debug, Clone, Default)]
pub struct GovernanceSettingsInput {
    pub governance_mode: Option<bool>,
    pub governance_tier: Option<GovernanceTier>,
    pub requires_second_reviewer: Option<bool>,
    pub edit_justification_required: Option<bool>,
}

pub fn update_governance_settings(
    store: &dyn Store,
    actor: &Actor,
    decision_id: DecisionId,
    input: GovernanceSettingsInput,
    now: Timestamp,
) -> DomainOutcome<Decision> {
    if actor.role != Role::Lead {
        return DomainOutcome::Forbidden { reason: "only a lead may change governance settings".to_string() };
    }
    let Some(mut decision) = store.get_decision(actor.organization_id, decision_id) else {
        return DomainOutcome::NotFound;
    };
    if let Some(v) = input.governance_mode {
        decision.governance_mode = v;
    }
    if let Some(v) = input.governance_tier {
        decision.governance_tier = v;
    }
    if let Some(v) = input.requires_second_reviewer {
        decision.requires_second_reviewer = v;
    }
    if let Some(v) = input.edit_justification_required {
        decision.edit_justification_required = v;
    }
    store.put_decision(decision.clone());
    DomainOutcome::Ok(decision)
}

// --- Queries -----------------------------------------------------------

pub fn get_decision(store: &dyn Store, actor: &Actor, decision_id: DecisionId) -> DomainOutcome<Decision> {
    store.get_decision(actor.organization_id, decision_id).map_or(DomainOutcome::NotFound, DomainOutcome::Ok)
}

pub fn get_version_history(store: &dyn Store, decision_id: DecisionId) -> Vec<DecisionVersion> {
    store.version_history(decision_id)
}

pub fn get_relation_history(store: &dyn Store, decision_id: DecisionId) -> Vec<DecisionRelationChange> {
    store.relation_history(decision_id)
}

pub fn get_health_history(store: &dyn Store, decision_id: DecisionId) -> Vec<decivue_history::EvaluationHistory> {
    store.evaluation_history(decision_id)
}

pub fn get_change_timeline(store: &dyn Store, decision_id: DecisionId) -> Vec<decivue_history::TimelineEntry> {
    decivue_history::merge_timeline(
        &store.version_history(decision_id),
        &store.review_history(decision_id),
        &store.relation_history(decision_id),
        &store.evaluation_history(decision_id),
    )
}

pub fn get_decisions_needing_evaluation(store: &dyn Store, organization_id: OrganizationId, now: Timestamp, cfg: &SchedulerConfig) -> Vec<Decision> {
    scheduler::select_batch(store, organization_id, now, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemoryStore;

    fn actor(org: OrganizationId) -> Actor {
        Actor { user_id: UserId::new(), role: Role::Lead, organization_id: org }
    }

    #[test]
    fn create_decision_writes_initial_version() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let a = actor(org);
        let input = CreateDecisionInput {
            title: "t".into(),
            description: "d".into(),
            category: None,
            parameters: JsonValue::Null,
            expiry_date: None,
            governance_mode: false,
        };
        let outcome = create_decision(&store, &a, input, 0);
        let DomainOutcome::Ok(decision) = outcome else { panic!("expected ok") };
        assert_eq!(store.version_history(decision.id).len(), 1);
    }

    #[test]
    fn update_decision_on_retired_is_terminal() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let a = actor(org);
        let mut d = Decision::new(org, a.user_id, "t", "d", 0);
        d.lifecycle = Lifecycle::Retired;
        store.put_decision(d.clone());

        let outcome = update_decision(&store, &a, d.id, UpdateDecisionInput { title: Some("x".into()), ..Default::default() }, &[], 1);
        assert!(matches!(outcome, DomainOutcome::TerminalState));
    }

    #[test]
    fn link_dependency_rejects_a_cycle() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let a = actor(org);
        let d1 = Decision::new(org, a.user_id, "a", "a", 0);
        let d2 = Decision::new(org, a.user_id, "b", "b", 0);
        store.put_decision(d1.clone());
        store.put_decision(d2.clone());

        assert!(matches!(link_dependency(&store, &a, d1.id, d2.id, 0), DomainOutcome::Ok(())));
        assert!(matches!(link_dependency(&store, &a, d2.id, d1.id, 0), DomainOutcome::CyclicDependency));
    }

    #[test]
    fn set_assumption_status_propagates_universal_change() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let a = actor(org);
        let d = Decision::new(org, a.user_id, "a", "a", 0);
        store.put_decision(d.clone());
        let assumption = Assumption {
            id: AssumptionId::new(),
            organization_id: org,
            description: "x".into(),
            status: AssumptionStatus::Valid,
            scope: AssumptionScope::Universal,
        };
        store.put_assumption(assumption.clone());

        let _ = set_assumption_status(&store, &a, assumption.id, AssumptionStatus::Broken);
        assert!(store.get_decision(org, d.id).unwrap().needs_evaluation);
    }

    #[test]
    fn mark_for_evaluation_on_unknown_decision_is_not_found() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let a = actor(org);
        assert!(matches!(mark_for_evaluation(&store, &a, DecisionId::new()), DomainOutcome::NotFound));
    }

    #[test]
    fn get_decision_returns_not_found_across_organizations() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let a = actor(OrganizationId::new());
        let d = Decision::new(org, UserId::new(), "t", "d", 0);
        store.put_decision(d.clone());
        assert!(matches!(get_decision(&store, &a, d.id), DomainOutcome::NotFound));
    }
}
