//! Core data model for the decision-state engine: identifiers, the
//! decision/assumption/constraint/dependency entities, and the typed
//! outcomes the command surface returns.

#![deny(unsafe_code)]

pub mod ids {
    //! Identifier types and a monotonic counter for locally-assigned ids.

    use serde::{Deserialize, Serialize};
    use std::fmt;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    static NEXT_ID: AtomicU64 = AtomicU64::new(1);

    /// Generate a new monotonic identifier (starts at 1). Used for version
    /// numbers and history sequence numbers, not for entity identity.
    pub fn next_monotonic_id() -> u64 {
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    }

    /// Milliseconds since the Unix epoch, read from the system clock.
    ///
    /// Callers that need a deterministic or replayable notion of "now"
    /// should go through `decivue_orchestrator::clock::Clock` instead;
    /// this free function exists for call sites (id generation, log
    /// timestamps) that only need a wall-clock stamp.
    pub fn system_now_ms() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_millis() as u64
    }

    macro_rules! uuid_id {
        ($name:ident) => {
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            pub struct $name(pub Uuid);

            impl $name {
                /// Generate a fresh random identifier.
                #[must_use]
                pub fn new() -> Self {
                    Self(Uuid::new_v4())
                }
            }

            impl Default for $name {
                fn default() -> Self {
                    Self::new()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        };
    }

    uuid_id!(DecisionId);
    uuid_id!(AssumptionId);
    uuid_id!(ConstraintId);
    uuid_id!(OrganizationId);
    uuid_id!(UserId);
    uuid_id!(GovernanceAuditEntryId);

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn monotonic_increments() {
            let a = next_monotonic_id();
            let b = next_monotonic_id();
            assert!(b > a);
        }

        #[test]
        fn decision_ids_are_distinct() {
            assert_ne!(DecisionId::new(), DecisionId::new());
        }
    }
}

pub mod time {
    //! Millisecond timestamps and day-granularity arithmetic shared by the
    //! engine and urgency calculator.

    /// Milliseconds since the Unix epoch. Signed so that differences
    /// (e.g. `now - expiry_date`) stay well-defined even when `now`
    /// precedes the other timestamp.
    pub type Timestamp = i64;

    /// Milliseconds in one day, used throughout the decay and expiry math.
    pub const MS_PER_DAY: i64 = 86_400_000;

    /// Whole days elapsed from `from` to `to` (may be negative). Truncates
    /// toward zero fractional days, consistent with the spec's `floor`
    /// wording for non-negative spans.
    #[must_use]
    pub fn days_between(from: Timestamp, to: Timestamp) -> i64 {
        (to - from) / MS_PER_DAY
    }

    /// Floor-division by `MS_PER_DAY`, used for decay math that must only
    /// ever move in one direction (spec's `floor(x/30 days)`).
    #[must_use]
    pub fn floor_days(ms: i64) -> i64 {
        ms.div_euclid(MS_PER_DAY)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn days_between_is_symmetric_sign() {
            assert_eq!(days_between(0, MS_PER_DAY * 5), 5);
            assert_eq!(days_between(MS_PER_DAY * 5, 0), -5);
        }

        #[test]
        fn floor_days_truncates() {
            assert_eq!(floor_days(MS_PER_DAY * 3 + 1), 3);
            assert_eq!(floor_days(-1), -1);
        }
    }
}

pub mod model {
    //! The decision, assumption, constraint and dependency entities.

    use crate::ids::{AssumptionId, ConstraintId, DecisionId, OrganizationId, UserId};
    use crate::time::Timestamp;
    use serde::{Deserialize, Serialize};
    use serde_json::Value as JsonValue;
    use std::collections::BTreeMap;

    /// Categorical lifecycle state of a decision.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum Lifecycle {
        Stable,
        UnderReview,
        AtRisk,
        Invalidated,
        Retired,
    }

    /// Why a decision was invalidated. Required whenever `lifecycle ==
    /// Invalidated` (invariant 1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum InvalidatedReason {
        ConstraintViolation,
        BrokenAssumptions,
        Expired,
        Manual,
    }

    /// Validity state of an assumption.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AssumptionStatus {
        Valid,
        Shaky,
        Broken,
    }

    /// Whether an assumption applies to every decision in its organization
    /// or only to decisions it is explicitly linked to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AssumptionScope {
        Universal,
        DecisionSpecific,
    }

    /// Category of constraint a decision must honor.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum ConstraintType {
        Legal,
        Budget,
        Policy,
        Technical,
        Compliance,
        Other,
    }

    /// Governance escalation tier, auto-derived from unresolved conflict
    /// counts (see the governance state machine).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum GovernanceTier {
        Standard,
        HighImpact,
        Critical,
    }

    /// An assumption an organization's decisions may depend on.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Assumption {
        pub id: AssumptionId,
        pub organization_id: OrganizationId,
        pub description: String,
        pub status: AssumptionStatus,
        pub scope: AssumptionScope,
    }

    /// A constraint a decision must honor. `validation` is an opaque
    /// descriptor (predicate AST serialized as JSON); only
    /// `decivue-engine`'s constraint validator interprets it.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Constraint {
        pub id: ConstraintId,
        pub organization_id: OrganizationId,
        pub name: String,
        pub description: String,
        pub constraint_type: ConstraintType,
        pub validation: Option<JsonValue>,
        pub is_immutable: bool,
    }

    /// A directed dependency edge: `source` depends on `target`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct DependencyEdge {
        pub source: DecisionId,
        pub target: DecisionId,
    }

    /// A long-lived organizational decision and everything the engine and
    /// scheduler need about it.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Decision {
        pub id: DecisionId,
        pub organization_id: OrganizationId,
        pub creator: UserId,
        pub title: String,
        pub description: String,
        pub category: Option<String>,
        #[serde(default)]
        pub parameters: JsonValue,

        pub lifecycle: Lifecycle,
        /// Internal-only health signal in `[0, 100]`. Never surfaced as
        /// authoritative (invariant 2).
        pub health_signal: i32,
        pub invalidated_reason: Option<InvalidatedReason>,

        pub created_at: Timestamp,
        /// Advances only via an explicit `DecisionReview` (invariant 5).
        pub last_reviewed_at: Timestamp,
        pub last_evaluated_at: Option<Timestamp>,
        pub needs_evaluation: bool,
        pub expiry_date: Option<Timestamp>,

        pub governance_mode: bool,
        pub governance_tier: GovernanceTier,
        pub requires_second_reviewer: bool,
        pub edit_justification_required: bool,
        pub locked_at: Option<Timestamp>,
        pub locked_by: Option<UserId>,

        pub review_urgency_score: i32,
        pub next_review_date: Option<Timestamp>,
        pub review_frequency_days: u32,
        pub consecutive_deferrals: u32,
        pub urgency_factors: BTreeMap<String, i32>,
    }

    impl Decision {
        /// Construct a brand-new decision at creation time: Stable,
        /// health 100, not locked, standard governance tier, never
        /// reviewed (so `last_reviewed_at == created_at`).
        #[must_use]
        pub fn new(
            organization_id: OrganizationId,
            creator: UserId,
            title: impl Into<String>,
            description: impl Into<String>,
            created_at: Timestamp,
        ) -> Self {
            Self {
                id: DecisionId::new(),
                organization_id,
                creator,
                title: title.into(),
                description: description.into(),
                category: None,
                parameters: JsonValue::Object(serde_json::Map::new()),
                lifecycle: Lifecycle::Stable,
                health_signal: 100,
                invalidated_reason: None,
                created_at,
                last_reviewed_at: created_at,
                last_evaluated_at: None,
                needs_evaluation: true,
                expiry_date: None,
                governance_mode: false,
                governance_tier: GovernanceTier::Standard,
                requires_second_reviewer: false,
                edit_justification_required: false,
                locked_at: None,
                locked_by: None,
                review_urgency_score: 50,
                next_review_date: None,
                review_frequency_days: 30,
                consecutive_deferrals: 0,
                urgency_factors: BTreeMap::new(),
            }
        }

        /// True once the engine will no longer evaluate this decision.
        #[must_use]
        pub fn is_terminal(&self) -> bool {
            matches!(self.lifecycle, Lifecycle::Retired)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::ids::{OrganizationId, UserId};

        #[test]
        fn new_decision_defaults() {
            let d = Decision::new(OrganizationId::new(), UserId::new(), "Adopt Rust", "why", 1_000);
            assert_eq!(d.lifecycle, Lifecycle::Stable);
            assert_eq!(d.health_signal, 100);
            assert!(d.needs_evaluation);
            assert_eq!(d.last_reviewed_at, d.created_at);
        }
    }
}

pub mod outcomes {
    //! The closed set of non-exceptional results the command surface
    //! returns (spec §6/§7, domain-failure class).

    use crate::ids::GovernanceAuditEntryId;
    use serde::{Deserialize, Serialize};

    /// Result of a command that may be denied, deferred to governance, or
    /// rejected for a structural reason, without ever throwing.
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum DomainOutcome<T> {
        Ok(T),
        NotFound,
        Forbidden { reason: String },
        Locked { locked_by: String },
        RequiresApproval { audit_entry_id: GovernanceAuditEntryId },
        RequiresJustification,
        CyclicDependency,
        TerminalState,
        Conflict { reason: String },
    }

    impl<T> DomainOutcome<T> {
        #[must_use]
        pub fn is_ok(&self) -> bool {
            matches!(self, DomainOutcome::Ok(_))
        }

        /// Short machine-readable tag, stable for logging/metrics keys.
        #[must_use]
        pub fn tag(&self) -> &'static str {
            match self {
                DomainOutcome::Ok(_) => "ok",
                DomainOutcome::NotFound => "not_found",
                DomainOutcome::Forbidden { .. } => "forbidden",
                DomainOutcome::Locked { .. } => "locked",
                DomainOutcome::RequiresApproval { .. } => "requires_approval",
                DomainOutcome::RequiresJustification => "requires_justification",
                DomainOutcome::CyclicDependency => "cyclic_dependency",
                DomainOutcome::TerminalState => "terminal_state",
                DomainOutcome::Conflict { .. } => "conflict",
            }
        }
    }

}
