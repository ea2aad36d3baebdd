//! Adaptive review urgency scoring.
//!
//! [`compute`] is a pure function, in the same spirit as
//! `decivue_engine::evaluate`: decision context in, a score in
//! `[0, 100]`, a next review date, and a factor breakdown out. No I/O,
//! no clock reads — callers pass `now` explicitly.

#![deny(unsafe_code)]

use decivue_core::model::{Decision, Lifecycle};
use decivue_core::time::{floor_days, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const BASE_SCORE: i32 = 50;

/// Counts of unresolved conflicts relevant to a decision's urgency.
/// Collected by the caller from the Store; the calculator itself never
/// queries conflict records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictCounts {
    /// Unresolved conflicts against the decision itself.
    pub decision_conflicts: u32,
    /// Unresolved conflicts against assumptions linked to the decision.
    pub assumption_conflicts: u32,
}

/// Everything [`compute`] needs for one decision.
#[derive(Debug, Clone, Copy)]
pub struct UrgencyInput<'a> {
    pub decision: &'a Decision,
    pub conflicts: ConflictCounts,
    pub now: Timestamp,
}

/// The calculator's verdict for one decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrgencyOutput {
    pub score: i32,
    pub review_frequency_days: u32,
    pub next_review_date: Timestamp,
    pub factors: BTreeMap<String, i32>,
}

/// Score a decision's review urgency from a base of 50, clamped to
/// `[0, 100]` after all additive factors are applied.
#[must_use]
pub fn compute(input: &UrgencyInput<'_>) -> UrgencyOutput {
    let d = input.decision;
    let mut factors = BTreeMap::new();

    let lifecycle_risk = match d.lifecycle {
        Lifecycle::Invalidated => 25,
        Lifecycle::AtRisk => 20,
        Lifecycle::UnderReview => 10,
        Lifecycle::Retired => -50,
        Lifecycle::Stable => 0,
    };
    if lifecycle_risk != 0 {
        factors.insert("lifecycle_risk".to_string(), lifecycle_risk);
    }

    let low_health = if d.health_signal < 30 {
        20
    } else if d.health_signal < 50 {
        10
    } else {
        0
    };
    if low_health != 0 {
        factors.insert("low_health".to_string(), low_health);
    }

    let days_since_review = floor_days(input.now - d.last_reviewed_at);
    let aging = if days_since_review > 180 {
        15
    } else if days_since_review > 90 {
        8
    } else {
        0
    };
    if aging != 0 {
        factors.insert("aging_since_review".to_string(), aging);
    }

    let expiry_proximity = d.expiry_date.map_or(0, |expiry| {
        let days_to_expiry = floor_days(expiry - input.now);
        if days_to_expiry < 7 {
            15
        } else if days_to_expiry < 30 {
            10
        } else if days_to_expiry < 60 {
            5
        } else {
            0
        }
    });
    if expiry_proximity != 0 {
        factors.insert("expiry_proximity".to_string(), expiry_proximity);
    }

    let decision_conflicts = if input.conflicts.decision_conflicts > 2 {
        15
    } else if input.conflicts.decision_conflicts > 0 {
        8
    } else {
        0
    };
    if decision_conflicts != 0 {
        factors.insert("decision_conflicts".to_string(), decision_conflicts);
    }

    let assumption_conflicts = if input.conflicts.assumption_conflicts > 1 {
        10
    } else if input.conflicts.assumption_conflicts > 0 {
        5
    } else {
        0
    };
    if assumption_conflicts != 0 {
        factors.insert("assumption_conflicts".to_string(), assumption_conflicts);
    }

    let needs_evaluation = if d.needs_evaluation { 10 } else { 0 };
    if needs_evaluation != 0 {
        factors.insert("needs_evaluation".to_string(), needs_evaluation);
    }

    let review_neglect = if d.consecutive_deferrals >= 3 {
        20
    } else if d.consecutive_deferrals == 2 {
        10
    } else if d.consecutive_deferrals == 1 {
        5
    } else {
        0
    };
    if review_neglect != 0 {
        factors.insert("review_neglect".to_string(), review_neglect);
    }

    let raw = BASE_SCORE
        + lifecycle_risk
        + low_health
        + aging
        + expiry_proximity
        + decision_conflicts
        + assumption_conflicts
        + needs_evaluation
        + review_neglect;
    let score = raw.clamp(0, 100);

    let review_frequency_days: u32 = if score >= 80 {
        7
    } else if score >= 60 {
        30
    } else if score >= 40 {
        60
    } else {
        90
    };
    let next_review_date = input.now + i64::from(review_frequency_days) * decivue_core::time::MS_PER_DAY;

    UrgencyOutput { score, review_frequency_days, next_review_date, factors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use decivue_core::ids::{OrganizationId, UserId};
    use decivue_core::time::MS_PER_DAY;

    fn base_decision(now: i64) -> Decision {
        Decision::new(OrganizationId::new(), UserId::new(), "D", "desc", now)
    }

    #[test]
    fn fresh_stable_decision_scores_base() {
        let now = 10 * MS_PER_DAY;
        let d = base_decision(now);
        let input = UrgencyInput { decision: &d, conflicts: ConflictCounts::default(), now };
        let out = compute(&input);
        assert_eq!(out.score, 50);
        assert_eq!(out.review_frequency_days, 60);
        assert!(out.factors.is_empty());
    }

    #[test]
    fn invalidated_decision_scores_higher() {
        let now = 10 * MS_PER_DAY;
        let mut d = base_decision(now);
        d.lifecycle = Lifecycle::Invalidated;
        let input = UrgencyInput { decision: &d, conflicts: ConflictCounts::default(), now };
        let out = compute(&input);
        assert_eq!(out.score, 75);
        assert_eq!(out.factors.get("lifecycle_risk"), Some(&25));
    }

    #[test]
    fn retired_decision_scores_lower_and_clamps_to_zero() {
        let now = 10 * MS_PER_DAY;
        let mut d = base_decision(now);
        d.lifecycle = Lifecycle::Retired;
        let input = UrgencyInput { decision: &d, conflicts: ConflictCounts::default(), now };
        let out = compute(&input);
        assert_eq!(out.score, 0);
        assert_eq!(out.review_frequency_days, 90);
    }

    #[test]
    fn expiry_within_thirty_days_adds_ten() {
        let now = 100 * MS_PER_DAY;
        let mut d = base_decision(now);
        d.expiry_date = Some(now + 20 * MS_PER_DAY);
        let input = UrgencyInput { decision: &d, conflicts: ConflictCounts::default(), now };
        let out = compute(&input);
        assert_eq!(out.factors.get("expiry_proximity"), Some(&10));
        assert_eq!(out.score, 60);
    }

    #[test]
    fn review_neglect_scales_with_consecutive_deferrals() {
        let now = 10 * MS_PER_DAY;
        let mut d = base_decision(now);
        d.consecutive_deferrals = 3;
        let input = UrgencyInput { decision: &d, conflicts: ConflictCounts::default(), now };
        let out = compute(&input);
        assert_eq!(out.factors.get("review_neglect"), Some(&20));
        assert_eq!(out.score, 70);
    }

    #[test]
    fn unresolved_conflicts_add_points() {
        let now = 10 * MS_PER_DAY;
        let d = base_decision(now);
        let conflicts = ConflictCounts { decision_conflicts: 3, assumption_conflicts: 2 };
        let input = UrgencyInput { decision: &d, conflicts, now };
        let out = compute(&input);
        assert_eq!(out.factors.get("decision_conflicts"), Some(&15));
        assert_eq!(out.factors.get("assumption_conflicts"), Some(&10));
    }

    #[test]
    fn score_never_leaves_bounds() {
        let now = 10 * MS_PER_DAY;
        let mut d = base_decision(now);
        d.lifecycle = Lifecycle::Invalidated;
        d.health_signal = 0;
        d.consecutive_deferrals = 5;
        d.needs_evaluation = true;
        let conflicts = ConflictCounts { decision_conflicts: 10, assumption_conflicts: 10 };
        let input = UrgencyInput { decision: &d, conflicts, now };
        let out = compute(&input);
        assert!(out.score <= 100);
    }
}
