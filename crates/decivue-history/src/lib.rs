//! Append-only decision history: version snapshots, relation changes,
//! reviews, and evaluation deltas, plus the timeline aggregator that
//! merges all four streams for a decision into one explanation feed.

#![deny(unsafe_code)]

pub mod log;
pub mod records;
pub mod timeline;

pub use log::{HistoryError, HistoryLog};
pub use records::{
    ChangeType, DecisionRelationChange, DecisionReview, DecisionVersion, EvaluationHistory,
    FieldDelta, GovernanceAction, GovernanceAuditEntry, RelationAction, RelationType, ReviewOutcome,
    ReviewType, TriggeredBy,
};
pub use timeline::{merge_timeline, TimelineEntry};
