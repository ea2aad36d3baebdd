//! Tunable engine constants. All fields have spec-mandated defaults;
//! callers (notably tests) can override them to probe edge cases without
//! touching the pipeline itself.

use serde::{Deserialize, Serialize};

/// Tunable thresholds for the evaluation pipeline. Defaults match the
/// values named throughout the phase descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum health points the assumption-check phase may deduct via
    /// the proportional penalty, before any hard-fail threshold fires.
    pub proportional_penalty_ceiling: i32,
    /// Fraction of decision-specific assumptions broken (`0.0..=1.0`) at
    /// or above which the assumption-check phase hard-fails instead of
    /// just applying a proportional penalty.
    pub hard_fail_threshold: f64,
    /// Days past `expiry_date` a decision may remain un-retired.
    pub expiry_retirement_grace_days: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            proportional_penalty_ceiling: 60,
            hard_fail_threshold: 0.70,
            expiry_retirement_grace_days: 30,
        }
    }
}
