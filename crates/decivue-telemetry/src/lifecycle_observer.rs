//! Observers notified whenever the scheduler applies an evaluation that
//! changed a decision's lifecycle or health. The engine and scheduler
//! never call these directly; the caller wires an observer in around
//! `scheduler::evaluate_one`'s output.

use decivue_core::ids::DecisionId;
use decivue_core::model::{InvalidatedReason, Lifecycle};

/// One decision's lifecycle/health delta from a single evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTransition {
    pub decision_id: DecisionId,
    pub old_lifecycle: Lifecycle,
    pub new_lifecycle: Lifecycle,
    pub old_health: i32,
    pub new_health: i32,
    pub invalidated_reason: Option<InvalidatedReason>,
}

impl LifecycleTransition {
    #[must_use]
    pub fn health_degraded(&self) -> bool {
        self.new_health < self.old_health
    }

    #[must_use]
    pub fn lifecycle_changed(&self) -> bool {
        self.old_lifecycle != self.new_lifecycle
    }
}

/// Receives lifecycle transitions as they happen. A deployment backs
/// this with logging, metrics, or both.
pub trait LifecycleObserver: Send + Sync {
    fn on_transition(&self, transition: &LifecycleTransition);
}

/// Logs every transition as a structured tracing event; degradations and
/// lifecycle changes are logged at `warn`, everything else at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLifecycleObserver;

impl LifecycleObserver for TracingLifecycleObserver {
    fn on_transition(&self, transition: &LifecycleTransition) {
        if transition.lifecycle_changed() || transition.health_degraded() {
            tracing::warn!(
                decision_id = %transition.decision_id.0,
                old_lifecycle = ?transition.old_lifecycle,
                new_lifecycle = ?transition.new_lifecycle,
                old_health = transition.old_health,
                new_health = transition.new_health,
                invalidated_reason = ?transition.invalidated_reason,
                "decision lifecycle transition"
            );
        } else {
            tracing::debug!(
                decision_id = %transition.decision_id.0,
                health = transition.new_health,
                "decision re-evaluated with no material change"
            );
        }
    }
}

#[cfg(feature = "otel")]
mod otel_observer {
    use super::{LifecycleObserver, LifecycleTransition};
    use once_cell::sync::OnceCell;
    use opentelemetry::global;
    use opentelemetry::metrics::{Counter, Meter};
    use opentelemetry::KeyValue;

    struct Instruments {
        transitions: Counter<u64>,
    }

    static INSTR: OnceCell<Instruments> = OnceCell::new();

    fn ensure_instruments() -> &'static Instruments {
        INSTR.get_or_init(|| {
            let meter: Meter = global::meter("decivue.lifecycle");
            let transitions = meter
                .u64_counter("decivue.lifecycle.transitions")
                .with_description("Decision lifecycle transitions observed by the scheduler")
                .init();
            Instruments { transitions }
        })
    }

    /// OTel-backed observer counting lifecycle transitions by
    /// `(old, new)` pair.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct OtelLifecycleObserver;

    impl LifecycleObserver for OtelLifecycleObserver {
        fn on_transition(&self, transition: &LifecycleTransition) {
            let inst = ensure_instruments();
            let attrs = [
                KeyValue::new("old_lifecycle", format!("{:?}", transition.old_lifecycle)),
                KeyValue::new("new_lifecycle", format!("{:?}", transition.new_lifecycle)),
                KeyValue::new("degraded", transition.health_degraded()),
            ];
            inst.transitions.add(1, &attrs);
        }
    }
}

#[cfg(feature = "otel")]
pub use otel_observer::OtelLifecycleObserver;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_degradation_and_lifecycle_change() {
        let t = LifecycleTransition {
            decision_id: DecisionId::new(),
            old_lifecycle: Lifecycle::Stable,
            new_lifecycle: Lifecycle::AtRisk,
            old_health: 90,
            new_health: 55,
            invalidated_reason: None,
        };
        assert!(t.health_degraded());
        assert!(t.lifecycle_changed());
    }

    #[test]
    fn tracing_observer_does_not_panic() {
        let t = LifecycleTransition {
            decision_id: DecisionId::new(),
            old_lifecycle: Lifecycle::Stable,
            new_lifecycle: Lifecycle::Stable,
            old_health: 100,
            new_health: 100,
            invalidated_reason: None,
        };
        TracingLifecycleObserver.on_transition(&t);
    }
}
