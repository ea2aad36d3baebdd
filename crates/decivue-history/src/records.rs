//! The five append-only record types. Each carries enough of a snapshot
//! to explain itself without joining back to live decision state.

use decivue_core::ids::{DecisionId, GovernanceAuditEntryId, UserId};
use decivue_core::model::{InvalidatedReason, Lifecycle};
use decivue_core::time::Timestamp;
use decivue_engine::trace::EvaluationTrace;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// What prompted an evaluation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggeredBy {
    Automatic,
    ManualReview,
    AssumptionChange,
    ConstraintChange,
    DependencyChange,
    TimeTick,
}

/// One engine run's effect on a decision, written iff the engine reports
/// `changes_detected`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationHistory {
    pub decision_id: DecisionId,
    pub old_lifecycle: Lifecycle,
    pub new_lifecycle: Lifecycle,
    pub old_health: i32,
    pub new_health: i32,
    pub invalidated_reason: Option<InvalidatedReason>,
    pub trace: EvaluationTrace,
    pub triggered_by: TriggeredBy,
    pub evaluated_at: Timestamp,
}

/// What kind of change a [`DecisionVersion`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    FieldUpdated,
    LifecycleChanged,
    ManualReview,
    AssumptionConflictResolved,
    DecisionConflictResolved,
    RelationAdded,
    RelationRemoved,
    Retirement,
    Deprecation,
    GovernanceLock,
    GovernanceUnlock,
    EditRequested,
    EditApproved,
    EditRejected,
}

/// The before/after value of one changed field, recorded by field name in
/// a [`DecisionVersion`]'s `changed_fields` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDelta {
    pub old: JsonValue,
    pub new: JsonValue,
}

/// A full snapshot of a decision's editable fields at one version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSnapshot {
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

/// One entry in a decision's append-only version history. Version 1 with
/// `change_type = Created` is written at insertion time and never
/// mutated afterward; every later edit appends a new version rather than
/// rewriting a prior one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionVersion {
    pub decision_id: DecisionId,
    pub version_number: u64,
    pub snapshot: DecisionSnapshot,
    pub change_type: ChangeType,
    pub change_summary: String,
    pub changed_fields: BTreeMap<String, FieldDelta>,
    pub reviewer_comment: Option<String>,
    pub metadata: JsonValue,
    pub recorded_at: Timestamp,
}

/// What kind of entity a [`DecisionRelationChange`] concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Assumption,
    Constraint,
    Dependency,
}

/// Whether a relation was attached or detached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationAction {
    Linked,
    Unlinked,
}

/// A link or unlink of an assumption, constraint, or dependency edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRelationChange {
    pub decision_id: DecisionId,
    pub relation_type: RelationType,
    /// The related entity's id, rendered as text: the three relation
    /// kinds carry distinct id types, and this record only needs to
    /// display and filter by it, never dereference it.
    pub relation_id: String,
    pub action: RelationAction,
    pub reason: Option<String>,
    pub recorded_at: Timestamp,
}

/// What kind of human review produced a [`DecisionReview`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    Routine,
    ConflictResolution,
    ExpiryCheck,
    Manual,
}

/// The reviewer's disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    Reaffirmed,
    Revised,
    Escalated,
    Deferred,
}

/// A human review of a decision. `lastReviewedAt` advances only through
/// one of these (invariant 5).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionReview {
    pub decision_id: DecisionId,
    pub reviewer: UserId,
    pub review_type: ReviewType,
    pub comment: Option<String>,
    pub pre_lifecycle: Lifecycle,
    pub pre_health: i32,
    pub post_lifecycle: Lifecycle,
    pub post_health: i32,
    pub outcome: ReviewOutcome,
    pub deferral_reason: Option<String>,
    pub next_review_date: Option<Timestamp>,
    pub recorded_at: Timestamp,
}

/// The governance action a [`GovernanceAuditEntry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GovernanceAction {
    EditRequested,
    EditApproved,
    EditRejected,
    SecondReviewRequested,
    SecondReviewApproved,
    DecisionLocked,
    DecisionUnlocked,
}

/// A governance workflow event: an edit request, its resolution, or a
/// lock/unlock. Unresolved `EditRequested`/`SecondReviewRequested`
/// entries are what `RequiresApproval` points back to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceAuditEntry {
    pub id: GovernanceAuditEntryId,
    pub decision_id: DecisionId,
    pub action: GovernanceAction,
    pub requester: UserId,
    pub approver: Option<UserId>,
    /// Required for critical-tier actions; validated by the governance
    /// state machine before this entry is ever constructed.
    pub justification: Option<String>,
    pub previous_state: Option<JsonValue>,
    pub new_state: Option<JsonValue>,
    pub created_at: Timestamp,
    pub resolved_at: Option<Timestamp>,
}
