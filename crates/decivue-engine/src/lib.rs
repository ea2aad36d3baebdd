//! Deterministic decision evaluation pipeline.
//!
//! [`evaluate`] is a pure function: decision + assumptions + constraints +
//! dependency snapshots + a timestamp in, a new lifecycle/health/trace out.
//! It performs no I/O and uses no clock or randomness other than the
//! `now` it is given, so identical inputs always produce identical
//! outputs (see the `determinism` property tests below).

#![deny(unsafe_code)]

pub mod config;
pub mod predicate;
pub mod trace;

use decivue_core::model::{
    Assumption, AssumptionScope, AssumptionStatus, Constraint, Decision, InvalidatedReason,
    Lifecycle,
};
use decivue_core::time::{floor_days, Timestamp};
use serde::{Deserialize, Serialize};

pub use config::EngineConfig;
pub use trace::{EvaluationStep, EvaluationTrace};

/// A dependency's current state, as seen by the engine. The engine never
/// reads or mutates the dependency itself; only its lifecycle and health
/// feed into the ceiling computed in Phase 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySnapshot {
    pub decision_id: decivue_core::ids::DecisionId,
    pub lifecycle: Lifecycle,
    pub health_signal: i32,
}

/// Everything the engine needs for one evaluation, assembled by the
/// orchestrator from the Store before each tick.
#[derive(Debug, Clone)]
pub struct EvaluationInput<'a> {
    pub decision: &'a Decision,
    pub assumptions: &'a [Assumption],
    pub constraints: &'a [Constraint],
    pub dependencies: &'a [DependencySnapshot],
    pub now: Timestamp,
}

/// The engine's verdict for one evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutput {
    pub lifecycle: Lifecycle,
    pub health_signal: i32,
    pub invalidated_reason: Option<InvalidatedReason>,
    pub trace: EvaluationTrace,
    /// True if lifecycle, health, or invalidated_reason differ from the
    /// decision's state going in. The scheduler only writes an
    /// `EvaluationHistory` record when this is true.
    pub changes_detected: bool,
}

/// A hard failure carries the terminal lifecycle/reason pair it forces;
/// once set, no later phase may alter lifecycle or health.
type HardFailure = (Lifecycle, Option<InvalidatedReason>);

/// Run the fixed evaluation pipeline: constraint validation, dependency
/// propagation, assumption check, expiry-based retirement, time/expiry
/// decay, and lifecycle determination, in that order.
#[must_use]
pub fn evaluate(input: &EvaluationInput<'_>, cfg: &EngineConfig) -> EvaluationOutput {
    let mut trace = EvaluationTrace::new();

    // Invariant 3: Retired is terminal for the engine. Defensive check —
    // the scheduler is expected to never hand the engine a retired
    // decision, but evaluate() must not violate the invariant if it is
    // called directly.
    if input.decision.lifecycle == Lifecycle::Retired {
        trace.push(EvaluationStep::skip(
            "terminal_retired",
            input.now,
            "decision is already retired; engine does not re-evaluate terminal decisions",
        ));
        return EvaluationOutput {
            lifecycle: Lifecycle::Retired,
            health_signal: input.decision.health_signal,
            invalidated_reason: input.decision.invalidated_reason,
            trace,
            changes_detected: false,
        };
    }

    // Invariant 4: re-evaluating an Invalidated decision gives it a
    // clean slate. Health always starts fresh at 100 for every
    // evaluation; Phase 2's "no dependencies -> 100" default makes this
    // the general rule rather than a special case.
    let mut health: i32 = 100;
    let mut hard_failure: Option<HardFailure> = None;

    phase1_constraint_validation(input, &mut health, &mut hard_failure, &mut trace);
    phase2_dependency_propagation(input, &mut health, hard_failure, &mut trace);
    phase3_assumption_check(input, cfg, &mut health, &mut hard_failure, &mut trace);
    phase4_expiry_retirement(input, cfg, &mut hard_failure, &mut trace);
    phase5_time_decay(input, &mut health, hard_failure, &mut trace);
    let (lifecycle, invalidated_reason) = phase6_lifecycle_determination(health, hard_failure, input.now, &mut trace);

    let changes_detected = lifecycle != input.decision.lifecycle
        || health != input.decision.health_signal
        || invalidated_reason != input.decision.invalidated_reason;

    EvaluationOutput { lifecycle, health_signal: health, invalidated_reason, trace, changes_detected }
}

fn phase1_constraint_validation(
    input: &EvaluationInput<'_>,
    health: &mut i32,
    hard_failure: &mut Option<HardFailure>,
    trace: &mut EvaluationTrace,
) {
    if hard_failure.is_some() {
        trace.push(EvaluationStep::skip("constraint_check", input.now, "skipped: prior phase already terminal"));
        return;
    }
    let mut violations = Vec::new();
    for constraint in input.constraints {
        if let Some(descriptor) = &constraint.validation {
            match predicate::evaluate_descriptor(descriptor, &input.decision.parameters) {
                Ok(true) => {}
                Ok(false) => violations.push(predicate::Violation::from_descriptor(constraint, descriptor)),
                Err(e) => violations.push(predicate::Violation {
                    constraint_id: constraint.id,
                    constraint_name: constraint.name.clone(),
                    detail: format!("malformed predicate: {e}"),
                }),
            }
        }
    }

    if violations.is_empty() {
        trace.push(EvaluationStep::pass(
            "constraint_check",
            input.now,
            format!("{} constraint(s) validated", input.constraints.len()),
        ));
    } else {
        *health = 0;
        *hard_failure = Some((Lifecycle::Invalidated, Some(InvalidatedReason::ConstraintViolation)));
        trace.push(EvaluationStep::fail_with_metadata(
            "constraint_check",
            input.now,
            format!("{} constraint violation(s)", violations.len()),
            serde_json::to_value(&violations).unwrap_or(serde_json::Value::Null),
        ));
    }
}

fn phase2_dependency_propagation(
    input: &EvaluationInput<'_>,
    health: &mut i32,
    hard_failure: Option<HardFailure>,
    trace: &mut EvaluationTrace,
) {
    if hard_failure.is_some() {
        trace.push(EvaluationStep::skip("dependency_propagation", input.now, "skipped: prior phase already terminal"));
        return;
    }
    let ceiling = if input.dependencies.is_empty() {
        100
    } else {
        input.dependencies.iter().map(|d| d.health_signal).min().unwrap_or(100)
    };
    *health = (*health).min(ceiling);
    trace.push(EvaluationStep::pass(
        "dependency_propagation",
        input.now,
        format!("{} dependenc(y/ies); ceiling={ceiling}", input.dependencies.len()),
    ));
}

fn phase3_assumption_check(
    input: &EvaluationInput<'_>,
    cfg: &EngineConfig,
    health: &mut i32,
    hard_failure: &mut Option<HardFailure>,
    trace: &mut EvaluationTrace,
) {
    if hard_failure.is_some() {
        trace.push(EvaluationStep::skip("assumption_check", input.now, "skipped: prior phase already terminal"));
        return;
    }

    let universal_broken = input
        .assumptions
        .iter()
        .any(|a| a.scope == AssumptionScope::Universal && a.status == AssumptionStatus::Broken);

    let decision_specific: Vec<&Assumption> =
        input.assumptions.iter().filter(|a| a.scope == AssumptionScope::DecisionSpecific).collect();
    let broken_specific = decision_specific.iter().filter(|a| a.status == AssumptionStatus::Broken).count();
    let shaky_specific = decision_specific.iter().filter(|a| a.status == AssumptionStatus::Shaky).count();
    let total_specific = decision_specific.len();

    let proportion = if total_specific == 0 { 0.0 } else { broken_specific as f64 / total_specific as f64 };
    let penalty = (proportion * f64::from(cfg.proportional_penalty_ceiling)).floor() as i32;
    let hard_fail_specific = total_specific > 0 && proportion >= cfg.hard_fail_threshold;

    // Universal-broken wins the tie-break when both rules would fire.
    if universal_broken {
        *health = 0;
        *hard_failure = Some((Lifecycle::Invalidated, Some(InvalidatedReason::BrokenAssumptions)));
        trace.push(EvaluationStep::fail("assumption_check", input.now, "a universal assumption is broken"));
        return;
    }

    if hard_fail_specific {
        *health = 0;
        *hard_failure = Some((Lifecycle::Invalidated, Some(InvalidatedReason::BrokenAssumptions)));
        trace.push(EvaluationStep::fail(
            "assumption_check",
            input.now,
            format!(
                "{broken_specific}/{total_specific} decision-specific assumptions broken (>= {:.0}%)",
                cfg.hard_fail_threshold * 100.0
            ),
        ));
        return;
    }

    *health = (*health - penalty).max(0);
    trace.push(EvaluationStep::pass(
        "assumption_check",
        input.now,
        format!("{broken_specific}/{total_specific} broken, {shaky_specific} shaky; penalty={penalty}"),
    ));
}

fn phase4_expiry_retirement(
    input: &EvaluationInput<'_>,
    cfg: &EngineConfig,
    hard_failure: &mut Option<HardFailure>,
    trace: &mut EvaluationTrace,
) {
    if hard_failure.is_some() {
        trace.push(EvaluationStep::skip("expiry_retirement", input.now, "skipped: prior phase already terminal"));
        return;
    }
    let Some(expiry) = input.decision.expiry_date else {
        trace.push(EvaluationStep::pass("expiry_retirement", input.now, "no expiry date set"));
        return;
    };
    let overdue_days = floor_days(input.now - expiry);
    if overdue_days > cfg.expiry_retirement_grace_days {
        *hard_failure = Some((Lifecycle::Retired, Some(InvalidatedReason::Expired)));
        trace.push(EvaluationStep::fail(
            "expiry_retirement",
            input.now,
            format!(
                "expired {overdue_days} days ago, past the {}-day grace window",
                cfg.expiry_retirement_grace_days
            ),
        ));
    } else {
        trace.push(EvaluationStep::pass(
            "expiry_retirement",
            input.now,
            format!("within grace window ({overdue_days} days past expiry, if any)"),
        ));
    }
}

fn phase5_time_decay(
    input: &EvaluationInput<'_>,
    health: &mut i32,
    hard_failure: Option<HardFailure>,
    trace: &mut EvaluationTrace,
) {
    if hard_failure.is_some() {
        trace.push(EvaluationStep::skip("time_decay", input.now, "skipped: prior phase already terminal"));
        return;
    }

    let decay: i64 = if let Some(expiry) = input.decision.expiry_date {
        let days_to_expiry = floor_days(expiry - input.now);
        if days_to_expiry > 90 {
            0
        } else if days_to_expiry > 30 {
            let elapsed_past_90 = 90 - days_to_expiry;
            elapsed_past_90 / 15
        } else if days_to_expiry > 0 {
            let elapsed_in_critical = 30 - days_to_expiry;
            4 + elapsed_in_critical / 5
        } else {
            let overdue_days = -days_to_expiry;
            10 + overdue_days
        }
    } else {
        let days_since_review = floor_days(input.now - input.decision.last_reviewed_at).max(0);
        days_since_review / 30
    };

    *health = (*health - decay as i32).max(0);
    trace.push(EvaluationStep::pass("time_decay", input.now, format!("decay={decay}")));
}

fn phase6_lifecycle_determination(
    health: i32,
    hard_failure: Option<HardFailure>,
    now: Timestamp,
    trace: &mut EvaluationTrace,
) -> (Lifecycle, Option<InvalidatedReason>) {
    if let Some((lifecycle, reason)) = hard_failure {
        trace.push(EvaluationStep::pass(
            "lifecycle_determination",
            now,
            format!("terminal state carried forward: {lifecycle:?}"),
        ));
        return (lifecycle, reason);
    }
    let lifecycle = if health >= 80 {
        Lifecycle::Stable
    } else if health >= 60 {
        Lifecycle::UnderReview
    } else {
        // 40-59 and below 40 both map to AtRisk; health alone never invalidates.
        Lifecycle::AtRisk
    };
    trace.push(EvaluationStep::pass(
        "lifecycle_determination",
        now,
        format!("health={health} -> {lifecycle:?}"),
    ));
    (lifecycle, None)
}


#[cfg(test)]
mod properties {
    use super::*;
    use decivue_core::ids::{OrganizationId, UserId};
    use decivue_core::model::Decision;
    use proptest::prelude::*;

    fn arb_decision() -> impl Strategy<Value = Decision> {
        (0i64..1_000_000, any::<bool>()).prop_map(|(created_at, has_expiry)| {
            let mut d = Decision::new(OrganizationId::new(), UserId::new(), "t", "d", created_at);
            if has_expiry {
                d.expiry_date = Some(created_at + 10_000_000);
            }
            d
        })
    }

    proptest! {
        #[test]
        fn determinism_holds_for_arbitrary_decisions(d in arb_decision(), now in 0i64..2_000_000) {
            let input = EvaluationInput { decision: &d, assumptions: &[], constraints: &[], dependencies: &[], now };
            let cfg = EngineConfig::default();
            let a = evaluate(&input, &cfg);
            let b = evaluate(&input, &cfg);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn health_always_in_bounds(d in arb_decision(), now in 0i64..2_000_000) {
            let input = EvaluationInput { decision: &d, assumptions: &[], constraints: &[], dependencies: &[], now };
            let out = evaluate(&input, &EngineConfig::default());
            prop_assert!(out.health_signal >= 0 && out.health_signal <= 100);
        }

        #[test]
        fn no_false_invalidation_without_hard_triggers(now in 0i64..2_000_000) {
            // No constraints, no broken assumptions, no expiry at all: the
            // engine must never invalidate on health/time decay alone.
            let d = Decision::new(OrganizationId::new(), UserId::new(), "t", "d", 0);
            let input = EvaluationInput { decision: &d, assumptions: &[], constraints: &[], dependencies: &[], now };
            let out = evaluate(&input, &EngineConfig::default());
            prop_assert_ne!(out.lifecycle, decivue_core::model::Lifecycle::Invalidated);
        }
    }
}
