//! Merges the four history streams for a decision into one
//! time-ordered feed.

use crate::records::{DecisionRelationChange, DecisionReview, DecisionVersion, EvaluationHistory};
use decivue_core::time::Timestamp;
use serde::{Deserialize, Serialize};

/// One merged timeline entry, tagged with its source stream so callers
/// can render each kind differently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TimelineEntry {
    Version(DecisionVersion),
    Review(DecisionReview),
    Relation(DecisionRelationChange),
    Evaluation(EvaluationHistory),
}

impl TimelineEntry {
    fn event_time(&self) -> Timestamp {
        match self {
            Self::Version(v) => v.recorded_at,
            Self::Review(r) => r.recorded_at,
            Self::Relation(r) => r.recorded_at,
            Self::Evaluation(e) => e.evaluated_at,
        }
    }
}

/// Merge the four per-decision history streams into one feed, sorted by
/// event time descending (most recent first). Entries with equal
/// timestamps keep a stable, deterministic order: versions, then
/// reviews, then relation changes, then evaluations.
#[must_use]
pub fn merge_timeline(
    versions: &[DecisionVersion],
    reviews: &[DecisionReview],
    relations: &[DecisionRelationChange],
    evaluations: &[EvaluationHistory],
) -> Vec<TimelineEntry> {
    let mut entries: Vec<TimelineEntry> = Vec::with_capacity(
        versions.len() + reviews.len() + relations.len() + evaluations.len(),
    );
    entries.extend(versions.iter().cloned().map(TimelineEntry::Version));
    entries.extend(reviews.iter().cloned().map(TimelineEntry::Review));
    entries.extend(relations.iter().cloned().map(TimelineEntry::Relation));
    entries.extend(evaluations.iter().cloned().map(TimelineEntry::Evaluation));

    entries.sort_by(|a, b| b.event_time().cmp(&a.event_time()));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ChangeType, DecisionSnapshot};
    use decivue_core::ids::DecisionId;
    use std::collections::BTreeMap;

    fn version(decision_id: DecisionId, at: Timestamp) -> DecisionVersion {
        DecisionVersion {
            decision_id,
            version_number: 1,
            snapshot: DecisionSnapshot { title: "t".into(), description: "d".into(), category: None },
            change_type: ChangeType::Created,
            change_summary: "created".into(),
            changed_fields: BTreeMap::new(),
            reviewer_comment: None,
            metadata: serde_json::Value::Null,
            recorded_at: at,
        }
    }

    #[test]
    fn merges_in_descending_time_order() {
        let d = DecisionId::new();
        let v1 = version(d, 100);
        let v2 = version(d, 300);
        let merged = merge_timeline(&[v1, v2], &[], &[], &[]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].event_time(), 300);
        assert_eq!(merged[1].event_time(), 100);
    }

    #[test]
    fn empty_streams_merge_to_empty_timeline() {
        assert!(merge_timeline(&[], &[], &[], &[]).is_empty());
    }
}
