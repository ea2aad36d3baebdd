//! The constraint validator's predicate mini-language.
//!
//! A constraint's `validation` field is an opaque JSON descriptor of the
//! shape `{"path": "<dotted path into decision.parameters>", "op": "<=" |
//! ">=" | "==" | "in" | "between" | "matches", ...}`. This module is the
//! only place that descriptor is given meaning.

use decivue_core::ids::ConstraintId;
use decivue_core::model::Constraint;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Something wrong with a predicate descriptor itself (not a failed
/// check — a malformed one). Treated as a constraint violation by the
/// caller, fail-closed.
#[derive(Debug, Clone, PartialEq)]
pub enum PredicateError {
    MissingField(&'static str),
    UnknownOperator(String),
    PathNotFound(String),
    TypeMismatch { expected: &'static str, path: String },
    InvalidRegex(String),
}

impl fmt::Display for PredicateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(name) => write!(f, "missing field `{name}`"),
            Self::UnknownOperator(op) => write!(f, "unknown operator `{op}`"),
            Self::PathNotFound(path) => write!(f, "path `{path}` not found"),
            Self::TypeMismatch { expected, path } => write!(f, "expected {expected} at `{path}`"),
            Self::InvalidRegex(pattern) => write!(f, "invalid regex `{pattern}`"),
        }
    }
}

impl std::error::Error for PredicateError {}

/// A single parsed predicate: a dotted path and the check applied to the
/// value found there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub path: String,
    #[serde(flatten)]
    pub check: Check,
}

/// The comparison a predicate applies to the resolved value. Internally
/// tagged on the descriptor's `op` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum Check {
    #[serde(rename = "<=")]
    Le { value: JsonValue },
    #[serde(rename = ">=")]
    Ge { value: JsonValue },
    #[serde(rename = "==")]
    Eq { value: JsonValue },
    #[serde(rename = "in")]
    In { value: Vec<JsonValue> },
    #[serde(rename = "between")]
    Between { min: JsonValue, max: JsonValue },
    #[serde(rename = "matches")]
    Matches { value: String },
}

/// Resolve a dotted path (`"a.b.c"`) into a JSON document. Array
/// segments are not supported; only object member access.
fn resolve_path<'a>(root: &'a JsonValue, path: &str) -> Option<&'a JsonValue> {
    let mut current = root;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn as_f64(v: &JsonValue, path: &str) -> Result<f64, PredicateError> {
    v.as_f64().ok_or_else(|| PredicateError::TypeMismatch { expected: "number", path: path.to_string() })
}

/// Evaluate a raw JSON descriptor against `parameters`, returning whether
/// the predicate holds. Any structural problem with the descriptor
/// itself (missing fields, unknown operator, unresolvable path) is
/// reported as an error rather than silently treated as false, so the
/// caller can fail closed and surface the malformed rule.
pub fn evaluate_descriptor(descriptor: &JsonValue, parameters: &JsonValue) -> Result<bool, PredicateError> {
    let predicate: Predicate = serde_json::from_value(descriptor.clone())
        .map_err(|_| PredicateError::UnknownOperator(descriptor.to_string()))?;
    evaluate(&predicate, parameters)
}

/// Evaluate an already-parsed predicate against `parameters`.
pub fn evaluate(predicate: &Predicate, parameters: &JsonValue) -> Result<bool, PredicateError> {
    let actual = resolve_path(parameters, &predicate.path)
        .ok_or_else(|| PredicateError::PathNotFound(predicate.path.clone()))?;

    match &predicate.check {
        Check::Le { value } => Ok(as_f64(actual, &predicate.path)? <= as_f64(value, &predicate.path)?),
        Check::Ge { value } => Ok(as_f64(actual, &predicate.path)? >= as_f64(value, &predicate.path)?),
        Check::Eq { value } => Ok(actual == value),
        Check::In { value } => Ok(value.contains(actual)),
        Check::Between { min, max } => {
            let a = as_f64(actual, &predicate.path)?;
            Ok(a >= as_f64(min, &predicate.path)? && a <= as_f64(max, &predicate.path)?)
        }
        Check::Matches { value } => {
            let text = actual
                .as_str()
                .ok_or_else(|| PredicateError::TypeMismatch { expected: "string", path: predicate.path.clone() })?;
            let re = regex::Regex::new(value).map_err(|_| PredicateError::InvalidRegex(value.clone()))?;
            Ok(re.is_match(text))
        }
    }
}

/// A single failed (or malformed) predicate, attributed to the
/// constraint that declared it. Carried in the engine's trace metadata
/// so a rejected decision's evaluation is explainable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub constraint_id: ConstraintId,
    pub constraint_name: String,
    pub detail: String,
}

impl Violation {
    #[must_use]
    pub fn from_descriptor(constraint: &Constraint, descriptor: &JsonValue) -> Self {
        Self {
            constraint_id: constraint.id,
            constraint_name: constraint.name.clone(),
            detail: format!("predicate failed: {descriptor}"),
        }
    }
}
