//! The cooperative evaluation scheduler: picks decisions whose inputs
//! may be stale, runs them through the engine, and applies the
//! post-evaluation side effects (history, dirty-bit clearing,
//! propagation, urgency recompute).

use crate::collaborators::{ConflictDetector, Store};
use crate::propagation::{self, ChangeEvent};
use decivue_core::ids::{DecisionId, OrganizationId};
use decivue_core::model::{Decision, Lifecycle};
use decivue_core::time::{floor_days, Timestamp, MS_PER_DAY};
use decivue_engine::{evaluate, DependencySnapshot, EngineConfig, EvaluationInput};
use decivue_history::{EvaluationHistory, TriggeredBy};
use decivue_urgency::{compute as compute_urgency, ConflictCounts, UrgencyInput};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default staleness threshold: a decision not evaluated in this long is
/// selected for re-evaluation even with no other trigger.
pub const DEFAULT_STALENESS_THRESHOLD_MS: Timestamp = MS_PER_DAY;
/// Window around `expiry_date` within which a decision is selected if it
/// has not been evaluated in the last 24h.
pub const EXPIRY_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub staleness_threshold_ms: Timestamp,
    pub expiry_window_days: i64,
    pub batch_size: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { staleness_threshold_ms: DEFAULT_STALENESS_THRESHOLD_MS, expiry_window_days: EXPIRY_WINDOW_DAYS, batch_size: 50 }
    }
}

/// Tally unresolved conflicts touching `decision_id` and the assumptions
/// linked to it, for the urgency calculator's conflict factors.
fn conflict_counts(
    store: &dyn Store,
    conflict_detector: &dyn ConflictDetector,
    organization_id: OrganizationId,
    decision_id: DecisionId,
) -> ConflictCounts {
    let assumption_conflicts: usize = store
        .assumptions_for_decision(organization_id, decision_id)
        .iter()
        .map(|a| conflict_detector.assumption_conflicts(a.id).into_iter().filter(|c| !c.resolved).count())
        .sum();
    let decision_conflicts =
        conflict_detector.decision_conflicts(decision_id).into_iter().filter(|c| !c.resolved).count();
    ConflictCounts { decision_conflicts: decision_conflicts as u32, assumption_conflicts: assumption_conflicts as u32 }
}

/// Whether `decision` should be selected for (re-)evaluation at `now`,
/// per the four trigger rules. Retired decisions are never selected.
#[must_use]
pub fn is_due(decision: &Decision, now: Timestamp, cfg: &SchedulerConfig) -> bool {
    if decision.lifecycle == Lifecycle::Retired {
        return false;
    }
    if decision.needs_evaluation {
        return true;
    }
    let Some(last_evaluated_at) = decision.last_evaluated_at else {
        return true;
    };
    if now - last_evaluated_at > cfg.staleness_threshold_ms {
        return true;
    }
    if let Some(expiry_date) = decision.expiry_date {
        let days_to_expiry = floor_days(expiry_date - now);
        let within_window = days_to_expiry.abs() <= cfg.expiry_window_days;
        let evaluated_recently = now - last_evaluated_at <= MS_PER_DAY;
        if within_window && !evaluated_recently {
            return true;
        }
    }
    false
}

/// Select and order every due decision in `organization_id`, capped at
/// `cfg.batch_size`. Ordering: `review_urgency_score` descending, then
/// `last_evaluated_at` ascending (never-evaluated first), then `id` as a
/// final deterministic tiebreak.
#[must_use]
pub fn select_batch(store: &dyn Store, organization_id: OrganizationId, now: Timestamp, cfg: &SchedulerConfig) -> Vec<Decision> {
    let mut due: Vec<Decision> = store.list_decisions(organization_id).into_iter().filter(|d| is_due(d, now, cfg)).collect();

    due.sort_by(|a, b| {
        b.review_urgency_score
            .cmp(&a.review_urgency_score)
            .then_with(|| a.last_evaluated_at.unwrap_or(Timestamp::MIN).cmp(&b.last_evaluated_at.unwrap_or(Timestamp::MIN)))
            .then_with(|| a.id.0.cmp(&b.id.0))
    });
    due.truncate(cfg.batch_size);
    due
}

fn dependency_snapshots(store: &dyn Store, decision_id: DecisionId) -> Vec<DependencySnapshot> {
    store
        .dependencies_of(decision_id)
        .into_iter()
        .filter_map(|target| store.find_decision(target))
        .map(|d| DependencySnapshot { decision_id: d.id, lifecycle: d.lifecycle, health_signal: d.health_signal })
        .collect()
}

/// Evaluate one decision and apply all post-evaluation side effects.
/// Returns the engine's verdict, or `None` if the decision no longer
/// exists or has since become Retired.
pub fn evaluate_one(
    store: &dyn Store,
    conflict_detector: &dyn ConflictDetector,
    organization_id: OrganizationId,
    decision_id: DecisionId,
    now: Timestamp,
    engine_cfg: &EngineConfig,
    triggered_by: TriggeredBy,
) -> Option<decivue_engine::EvaluationOutput> {
    let mut decision = store.get_decision(organization_id, decision_id)?;
    if decision.lifecycle == Lifecycle::Retired {
        return None;
    }

    let assumptions = store.assumptions_for_decision(organization_id, decision_id);
    let constraints = store.constraints_for_decision(decision_id);
    let dependencies = dependency_snapshots(store, decision_id);

    let input = EvaluationInput { decision: &decision, assumptions: &assumptions, constraints: &constraints, dependencies: &dependencies, now };
    let output = evaluate(&input, engine_cfg);

    if output.changes_detected {
        store.append_evaluation_history(EvaluationHistory {
            decision_id,
            old_lifecycle: decision.lifecycle,
            new_lifecycle: output.lifecycle,
            old_health: decision.health_signal,
            new_health: output.health_signal,
            invalidated_reason: output.invalidated_reason,
            trace: output.trace.clone(),
            triggered_by,
            evaluated_at: now,
        });
    }

    let old_lifecycle = decision.lifecycle;
    decision.lifecycle = output.lifecycle;
    decision.health_signal = output.health_signal;
    decision.invalidated_reason = output.invalidated_reason;
    decision.needs_evaluation = false;
    decision.last_evaluated_at = Some(now);
    store.put_decision(decision.clone());

    if old_lifecycle != output.lifecycle {
        propagation::propagate(store, ChangeEvent::DependencyTargetChanged { target: decision_id });
    }

    let conflicts = conflict_counts(store, conflict_detector, organization_id, decision_id);
    let urgency = compute_urgency(&UrgencyInput { decision: &decision, conflicts, now });
    decision.review_urgency_score = urgency.score;
    decision.review_frequency_days = urgency.review_frequency_days;
    decision.next_review_date = Some(urgency.next_review_date);
    decision.urgency_factors = urgency.factors;
    store.put_decision(decision);

    debug!(?decision_id, lifecycle = ?output.lifecycle, health = output.health_signal, "evaluated decision");

    Some(output)
}

/// Run one scheduler tick over `organization_id`: select a batch of due
/// decisions and evaluate each in order. Cooperative with
/// `cancellation`: checked between decisions, so a tick started mid-batch
/// still completes the decision already in flight.
pub fn run_tick(
    store: &dyn Store,
    conflict_detector: &dyn ConflictDetector,
    organization_id: OrganizationId,
    now: Timestamp,
    engine_cfg: &EngineConfig,
    scheduler_cfg: &SchedulerConfig,
    cancellation: &CancellationToken,
) -> usize {
    let batch = select_batch(store, organization_id, now, scheduler_cfg);
    let mut evaluated = 0;
    for decision in batch {
        if cancellation.is_cancelled() {
            break;
        }
        if evaluate_one(store, conflict_detector, organization_id, decision.id, now, engine_cfg, TriggeredBy::Automatic).is_some() {
            evaluated += 1;
        }
    }
    info!(organization_id = %organization_id.0, evaluated, "scheduler tick complete");
    evaluated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{AssumptionConflict, DecisionConflict, InMemoryStore};
    use decivue_core::ids::{AssumptionId, UserId};

    fn fresh(store: &InMemoryStore, org: OrganizationId) -> Decision {
        let d = Decision::new(org, UserId::new(), "t", "d", 0);
        store.put_decision(d.clone());
        d
    }

    struct NoConflicts;
    impl ConflictDetector for NoConflicts {
        fn assumption_conflicts(&self, _assumption_id: AssumptionId) -> Vec<AssumptionConflict> {
            Vec::new()
        }
        fn decision_conflicts(&self, _decision_id: DecisionId) -> Vec<DecisionConflict> {
            Vec::new()
        }
    }

    #[test]
    fn freshly_created_decision_is_due_by_default() {
        let cfg = SchedulerConfig::default();
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let d = fresh(&store, org);
        assert!(is_due(&d, 0, &cfg));
    }

    #[test]
    fn clean_recently_evaluated_decision_is_not_due() {
        let cfg = SchedulerConfig::default();
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let mut d = fresh(&store, org);
        d.needs_evaluation = false;
        d.last_evaluated_at = Some(1_000);
        assert!(!is_due(&d, 1_000 + MS_PER_DAY / 2, &cfg));
    }

    #[test]
    fn stale_decision_becomes_due() {
        let cfg = SchedulerConfig::default();
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let mut d = fresh(&store, org);
        d.needs_evaluation = false;
        d.last_evaluated_at = Some(0);
        assert!(is_due(&d, MS_PER_DAY + 1, &cfg));
    }

    #[test]
    fn expiry_window_triggers_without_recent_evaluation() {
        let cfg = SchedulerConfig::default();
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let mut d = fresh(&store, org);
        d.needs_evaluation = false;
        d.last_evaluated_at = Some(0);
        d.expiry_date = Some(10 * MS_PER_DAY);
        assert!(is_due(&d, 9 * MS_PER_DAY, &cfg));
    }

    #[test]
    fn retired_decision_is_never_due() {
        let cfg = SchedulerConfig::default();
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let mut d = fresh(&store, org);
        d.lifecycle = Lifecycle::Retired;
        d.needs_evaluation = true;
        assert!(!is_due(&d, 0, &cfg));
    }

    #[test]
    fn batch_orders_by_urgency_desc_then_last_evaluated_asc() {
        let cfg = SchedulerConfig::default();
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let mut low = fresh(&store, org);
        low.review_urgency_score = 20;
        store.put_decision(low.clone());
        let mut high = fresh(&store, org);
        high.review_urgency_score = 90;
        store.put_decision(high.clone());

        let batch = select_batch(&store, org, 0, &cfg);
        assert_eq!(batch[0].id, high.id);
        assert_eq!(batch[1].id, low.id);
    }

    #[test]
    fn evaluate_one_clears_needs_evaluation_and_stamps_last_evaluated_at() {
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let d = fresh(&store, org);
        let engine_cfg = EngineConfig::default();

        evaluate_one(&store, &NoConflicts, org, d.id, 1_000, &engine_cfg, TriggeredBy::Automatic);

        let after = store.get_decision(org, d.id).unwrap();
        assert!(!after.needs_evaluation);
        assert_eq!(after.last_evaluated_at, Some(1_000));
    }

    #[test]
    fn evaluate_one_writes_history_only_when_changed() {
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let d = fresh(&store, org);
        let engine_cfg = EngineConfig::default();

        evaluate_one(&store, &NoConflicts, org, d.id, 1_000, &engine_cfg, TriggeredBy::Automatic);
        // a freshly created Stable decision with no triggers evaluates to
        // the same lifecycle/health it started with, so no history row.
        assert!(store.evaluation_history(d.id).is_empty());
    }

    #[test]
    fn evaluate_one_never_touches_a_retired_decision() {
        let org = OrganizationId::new();
        let store = InMemoryStore::new();
        let mut d = fresh(&store, org);
        d.lifecycle = Lifecycle::Retired;
        store.put_decision(d.clone());
        let engine_cfg = EngineConfig::default();

        let out = evaluate_one(&store, &NoConflicts, org, d.id, 1_000, &engine_cfg, TriggeredBy::Automatic);
        assert!(out.is_none());
    }
}
