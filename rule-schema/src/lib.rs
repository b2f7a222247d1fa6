//! Wire schema for rule definitions submitted through the admin surface.
//!
//! Mirrors the shape of a rule in the bundled rule base but is
//! independent of `inference-engine`'s in-memory `Rule` type: this is
//! what arrives over the wire, before it has been checked for the
//! invariants the core requires (non-empty actions, known rule kind, no
//! self-contradicting action list).

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const RULE_SCHEMA_V1: &str = "rule.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionV1 {
    pub fact: String,
    /// Informational only — the evaluator conjoins all conditions within
    /// a rule regardless of this tag. Kept so OR-branches can be modeled
    /// as separate rules while still documenting intent on the wire.
    pub connector: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionV1 {
    pub fact: String,
    pub value: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRuleV1 {
    pub schema: String,
    pub id: u32,
    pub name: String,
    pub tag: String,
    pub kind: String,
    pub conditions: Vec<ConditionV1>,
    pub actions: Vec<ActionV1>,
    pub enabled: bool,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("unsupported schema '{0}'")]
    UnsupportedSchema(String),
    #[error("name is required")]
    MissingName,
    #[error("rule must have at least one action")]
    NoActions,
    #[error("invalid rule kind '{0}', expected 'initial' or 'intermediate'")]
    InvalidKind(String),
    #[error("condition fact name must not be empty")]
    EmptyConditionFact,
    #[error("action fact name must not be empty")]
    EmptyActionFact,
    #[error("action list assigns conflicting values to fact '{0}'")]
    ConflictingActions(String),
}

pub fn validate_rule_v1(rule: &CanonicalRuleV1) -> Result<(), SchemaError> {
    if rule.schema != RULE_SCHEMA_V1 {
        return Err(SchemaError::UnsupportedSchema(rule.schema.clone()));
    }
    if rule.name.trim().is_empty() {
        return Err(SchemaError::MissingName);
    }
    match rule.kind.as_str() {
        "initial" | "intermediate" => {}
        other => return Err(SchemaError::InvalidKind(other.to_string())),
    }
    if rule.actions.is_empty() {
        return Err(SchemaError::NoActions);
    }
    for cond in &rule.conditions {
        if cond.fact.trim().is_empty() {
            return Err(SchemaError::EmptyConditionFact);
        }
    }
    for action in &rule.actions {
        if action.fact.trim().is_empty() {
            return Err(SchemaError::EmptyActionFact);
        }
    }
    for i in 0..rule.actions.len() {
        for j in (i + 1)..rule.actions.len() {
            let a = &rule.actions[i];
            let b = &rule.actions[j];
            if a.fact == b.fact && a.value != b.value {
                return Err(SchemaError::ConflictingActions(a.fact.clone()));
            }
        }
    }
    Ok(())
}
