//! The ordered record of what each pipeline phase did, returned alongside
//! every [`crate::EvaluationOutput`] so callers can explain a verdict
//! without re-running the pipeline.

use decivue_core::time::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// One phase's contribution to an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationStep {
    pub step_name: &'static str,
    pub passed: bool,
    pub detail: String,
    pub timestamp: Timestamp,
    pub metadata: Option<JsonValue>,
}

impl EvaluationStep {
    #[must_use]
    pub fn pass(step_name: &'static str, timestamp: Timestamp, detail: impl Into<String>) -> Self {
        Self { step_name, passed: true, detail: detail.into(), timestamp, metadata: None }
    }

    #[must_use]
    pub fn fail(step_name: &'static str, timestamp: Timestamp, detail: impl Into<String>) -> Self {
        Self { step_name, passed: false, detail: detail.into(), timestamp, metadata: None }
    }

    #[must_use]
    pub fn fail_with_metadata(
        step_name: &'static str,
        timestamp: Timestamp,
        detail: impl Into<String>,
        metadata: JsonValue,
    ) -> Self {
        Self { step_name, passed: false, detail: detail.into(), timestamp, metadata: Some(metadata) }
    }

    /// A phase that did not run because an earlier phase already reached
    /// a terminal state. Recorded as passed (it is not itself a
    /// failure), so that only the phase that actually determined the
    /// outcome is flagged `passed: false`.
    #[must_use]
    pub fn skip(step_name: &'static str, timestamp: Timestamp, detail: impl Into<String>) -> Self {
        Self { step_name, passed: true, detail: detail.into(), timestamp, metadata: None }
    }
}

/// The ordered sequence of steps an evaluation produced, one per pipeline
/// phase, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTrace {
    pub steps: Vec<EvaluationStep>,
}

impl EvaluationTrace {
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn push(&mut self, step: EvaluationStep) {
        self.steps.push(step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_appends_in_order() {
        let mut trace = EvaluationTrace::new();
        trace.push(EvaluationStep::pass("a", 0, "ok"));
        trace.push(EvaluationStep::fail("b", 0, "bad"));
        assert_eq!(trace.steps[0].step_name, "a");
        assert_eq!(trace.steps[1].step_name, "b");
        assert!(!trace.steps[1].passed);
    }
}
