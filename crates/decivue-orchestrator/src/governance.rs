//! Governance state machine: edit permission gating, the edit-approval
//! workflow, lock/unlock, and conflict-driven tier auto-escalation.

use crate::collaborators::{Actor, ConflictDetector, Notification, NotificationKind, Notifier, Role, Severity, Store};
use decivue_core::ids::{DecisionId, GovernanceAuditEntryId, UserId};
use decivue_core::model::{Decision, GovernanceTier};
use decivue_core::outcomes::DomainOutcome;
use decivue_core::time::Timestamp;
use decivue_history::{GovernanceAction, GovernanceAuditEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

const JUSTIFICATION_MIN_LEN: usize = 10;

/// What an edit attempt must do before the fields are actually applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditGate {
    Allow,
    RequireJustification,
    RequireApproval,
    Deny,
}

/// Decide what an edit attempt must satisfy before it is allowed to
/// apply, per the decision's governance fields and the actor's role.
#[must_use]
pub fn can_edit(store: &dyn Store, decision: &Decision, actor: &Actor, justification: Option<&str>) -> EditGate {
    if let Some(locked_by) = decision.locked_by {
        if locked_by != actor.user_id && actor.role != Role::Lead {
            return EditGate::Deny;
        }
    }

    if !decision.governance_mode {
        return EditGate::Allow;
    }

    let justification_len = justification.map(str::len).unwrap_or(0);

    match actor.role {
        Role::Lead => {
            if decision.governance_tier == GovernanceTier::Critical && justification_len < JUSTIFICATION_MIN_LEN {
                return EditGate::RequireJustification;
            }
            let has_open_request = !store.open_edit_requests(decision.id).is_empty();
            if decision.governance_tier == GovernanceTier::Critical
                && decision.requires_second_reviewer
                && has_open_request
            {
                return EditGate::RequireApproval;
            }
            EditGate::Allow
        }
        Role::Member => {
            let needs_justification = decision.edit_justification_required || decision.requires_second_reviewer;
            if needs_justification && justification_len < JUSTIFICATION_MIN_LEN {
                return EditGate::RequireJustification;
            }
            if decision.requires_second_reviewer {
                return EditGate::RequireApproval;
            }
            EditGate::Allow
        }
    }
}

/// Fields an edit-approval request proposes to change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposedChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
}

/// Create an `editRequested` audit entry. Forbidden if the requester
/// would be the only possible approver for the decision.
pub fn request_edit(
    store: &dyn Store,
    decision: &Decision,
    requester: &Actor,
    justification: Option<String>,
    proposed_changes: ProposedChanges,
    eligible_approvers: &[UserId],
    now: Timestamp,
) -> DomainOutcome<GovernanceAuditEntryId> {
    let has_other_approver = eligible_approvers.iter().any(|id| *id != requester.user_id);
    if !has_other_approver {
        return DomainOutcome::Forbidden {
            reason: "requester would be the only possible approver".to_string(),
        };
    }

    let entry = GovernanceAuditEntry {
        id: GovernanceAuditEntryId::new(),
        decision_id: decision.id,
        action: GovernanceAction::EditRequested,
        requester: requester.user_id,
        approver: None,
        justification,
        previous_state: Some(decision_snapshot_json(decision)),
        new_state: Some(serde_json::to_value(&proposed_changes).unwrap_or(JsonValue::Null)),
        created_at: now,
        resolved_at: None,
    };
    let id = entry.id;
    store.append_governance_audit_entry(entry);
    DomainOutcome::Ok(id)
}

/// Resolve a pending edit-approval request. On approval, the caller is
/// responsible for applying `ProposedChanges` and appending the
/// resulting `DecisionVersion`/`DecisionRelationChange` rows atomically;
/// this function only settles the audit trail.
pub fn resolve(
    store: &dyn Store,
    audit_entry_id: GovernanceAuditEntryId,
    approver: &Actor,
    approved: bool,
    now: Timestamp,
) -> DomainOutcome<()> {
    let Some(mut entry) = store.get_governance_audit_entry(audit_entry_id) else {
        return DomainOutcome::NotFound;
    };
    if entry.resolved_at.is_some() {
        return DomainOutcome::Conflict { reason: "audit entry already resolved".to_string() };
    }
    if approver.role != Role::Lead {
        return DomainOutcome::Forbidden { reason: "only a lead may resolve an edit request".to_string() };
    }

    entry.action = if approved { GovernanceAction::EditApproved } else { GovernanceAction::EditRejected };
    entry.approver = Some(approver.user_id);
    entry.resolved_at = Some(now);
    store.put_governance_audit_entry(entry);
    DomainOutcome::Ok(())
}

/// Lock a decision. Only leads in the decision's organization may lock.
pub fn lock(
    store: &dyn Store,
    decision: &mut Decision,
    actor: &Actor,
    now: Timestamp,
) -> DomainOutcome<()> {
    if actor.role != Role::Lead || actor.organization_id != decision.organization_id {
        return DomainOutcome::Forbidden { reason: "only a lead in the same organization may lock".to_string() };
    }
    decision.locked_at = Some(now);
    decision.locked_by = Some(actor.user_id);
    let entry = GovernanceAuditEntry {
        id: GovernanceAuditEntryId::new(),
        decision_id: decision.id,
        action: GovernanceAction::DecisionLocked,
        requester: actor.user_id,
        approver: None,
        justification: None,
        previous_state: None,
        new_state: None,
        created_at: now,
        resolved_at: Some(now),
    };
    store.append_governance_audit_entry(entry);
    DomainOutcome::Ok(())
}

/// Unlock a decision. Only leads in the decision's organization may
/// unlock.
pub fn unlock(
    store: &dyn Store,
    decision: &mut Decision,
    actor: &Actor,
    now: Timestamp,
) -> DomainOutcome<()> {
    if actor.role != Role::Lead || actor.organization_id != decision.organization_id {
        return DomainOutcome::Forbidden { reason: "only a lead in the same organization may unlock".to_string() };
    }
    decision.locked_at = None;
    decision.locked_by = None;
    let entry = GovernanceAuditEntry {
        id: GovernanceAuditEntryId::new(),
        decision_id: decision.id,
        action: GovernanceAction::DecisionUnlocked,
        requester: actor.user_id,
        approver: None,
        justification: None,
        previous_state: None,
        new_state: None,
        created_at: now,
        resolved_at: Some(now),
    };
    store.append_governance_audit_entry(entry);
    DomainOutcome::Ok(())
}

/// Re-derive `governance_tier` from the current count of unresolved
/// assumption and decision conflicts touching `decision`. Returns the
/// new tier and whether it escalated upward (callers should notify on
/// escalation).
pub fn reescalate_tier(
    decision: &mut Decision,
    conflict_detector: &dyn ConflictDetector,
    linked_assumption_ids: &[decivue_core::ids::AssumptionId],
) -> bool {
    let unresolved_assumption_conflicts: usize = linked_assumption_ids
        .iter()
        .map(|id| conflict_detector.assumption_conflicts(*id).into_iter().filter(|c| !c.resolved).count())
        .sum();
    let unresolved_decision_conflicts =
        conflict_detector.decision_conflicts(decision.id).into_iter().filter(|c| !c.resolved).count();

    let n = unresolved_assumption_conflicts + unresolved_decision_conflicts;
    let new_tier = if n >= 5 {
        GovernanceTier::Critical
    } else if n >= 2 {
        GovernanceTier::HighImpact
    } else {
        GovernanceTier::Standard
    };

    let escalated = new_tier > decision.governance_tier;
    decision.governance_tier = new_tier;
    escalated
}

/// Notify on an upward tier escalation, per the spec's requirement that
/// escalation emits a notification request.
pub fn notify_escalation(notifier: &dyn Notifier, decision: &Decision) {
    notifier.notify(Notification {
        kind: NotificationKind::GovernanceEvent,
        severity: Severity::Warning,
        decision_id: decision.id,
        message: format!("governance tier escalated to {:?}", decision.governance_tier),
    });
}

fn decision_snapshot_json(decision: &Decision) -> JsonValue {
    serde_json::json!({
        "title": decision.title,
        "description": decision.description,
        "category": decision.category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::InMemoryStore;
    use decivue_core::ids::OrganizationId;
    use decivue_core::model::Decision;

    fn actor(role: Role, org: OrganizationId) -> Actor {
        Actor { user_id: UserId::new(), role, organization_id: org }
    }

    #[test]
    fn non_governed_decision_always_allows_edit() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let d = Decision::new(org, UserId::new(), "t", "d", 0);
        let a = actor(Role::Member, org);
        assert_eq!(can_edit(&store, &d, &a, None), EditGate::Allow);
    }

    #[test]
    fn member_needs_justification_when_required() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "t", "d", 0);
        d.governance_mode = true;
        d.edit_justification_required = true;
        let a = actor(Role::Member, org);
        assert_eq!(can_edit(&store, &d, &a, Some("short")), EditGate::RequireJustification);
        assert_eq!(can_edit(&store, &d, &a, Some("a sufficiently long justification")), EditGate::Allow);
    }

    #[test]
    fn member_needs_approval_when_second_reviewer_required() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "t", "d", 0);
        d.governance_mode = true;
        d.requires_second_reviewer = true;
        let a = actor(Role::Member, org);
        assert_eq!(can_edit(&store, &d, &a, None), EditGate::RequireJustification);
        assert_eq!(can_edit(&store, &d, &a, Some("a sufficiently long justification")), EditGate::RequireApproval);
    }

    #[test]
    fn locked_by_another_user_denies_non_leads() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "t", "d", 0);
        d.locked_by = Some(UserId::new());
        let member = actor(Role::Member, org);
        assert_eq!(can_edit(&store, &d, &member, None), EditGate::Deny);
        let lead = actor(Role::Lead, org);
        assert_eq!(can_edit(&store, &d, &lead, None), EditGate::Allow);
    }

    #[test]
    fn critical_tier_lead_needs_justification() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "t", "d", 0);
        d.governance_mode = true;
        d.governance_tier = GovernanceTier::Critical;
        let lead = actor(Role::Lead, org);
        assert_eq!(can_edit(&store, &d, &lead, Some("x")), EditGate::RequireJustification);
        assert_eq!(can_edit(&store, &d, &lead, Some("a sufficiently long justification")), EditGate::Allow);
    }

    #[test]
    fn critical_tier_lead_needs_approval_only_with_an_open_request() {
        let store = InMemoryStore::new();
        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "t", "d", 0);
        d.governance_mode = true;
        d.governance_tier = GovernanceTier::Critical;
        d.requires_second_reviewer = true;
        let lead = actor(Role::Lead, org);
        let justified = Some("a sufficiently long justification");

        assert_eq!(can_edit(&store, &d, &lead, justified), EditGate::Allow);

        store.append_governance_audit_entry(GovernanceAuditEntry {
            id: GovernanceAuditEntryId::new(),
            decision_id: d.id,
            action: GovernanceAction::EditRequested,
            requester: UserId::new(),
            approver: None,
            justification: None,
            previous_state: None,
            new_state: None,
            created_at: 0,
            resolved_at: None,
        });
        assert_eq!(can_edit(&store, &d, &lead, justified), EditGate::RequireApproval);
    }

    #[test]
    fn tier_escalates_from_conflict_counts() {
        struct FixedConflicts(usize, usize);
        impl ConflictDetector for FixedConflicts {
            fn assumption_conflicts(
                &self,
                _assumption_id: decivue_core::ids::AssumptionId,
            ) -> Vec<crate::collaborators::AssumptionConflict> {
                (0..self.0)
                    .map(|i| crate::collaborators::AssumptionConflict {
                        id: i as u64,
                        assumption_id: decivue_core::ids::AssumptionId::new(),
                        resolved: false,
                    })
                    .collect()
            }
            fn decision_conflicts(
                &self,
                decision_id: DecisionId,
            ) -> Vec<crate::collaborators::DecisionConflict> {
                (0..self.1)
                    .map(|i| crate::collaborators::DecisionConflict { id: i as u64, decision_id, resolved: false })
                    .collect()
            }
        }

        let org = OrganizationId::new();
        let mut d = Decision::new(org, UserId::new(), "t", "d", 0);
        let detector = FixedConflicts(3, 2);
        let escalated = reescalate_tier(&mut d, &detector, &[decivue_core::ids::AssumptionId::new()]);
        assert!(escalated);
        assert_eq!(d.governance_tier, GovernanceTier::Critical);
    }
}
