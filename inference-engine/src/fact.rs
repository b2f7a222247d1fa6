//! Facts are plain string names — the engine is propositional, not
//! first-order.

use crate::error::CoreError;

pub type FactName = String;

/// The tri-state answer accepted at the dialogue layer. Storage is always
/// boolean; `Unknown` never reaches working memory directly (see
/// `driver::process_answer`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    Unknown,
}

impl Answer {
    pub fn parse(token: &str) -> Result<Self, CoreError> {
        match token {
            "yes" => Ok(Answer::Yes),
            "no" => Ok(Answer::No),
            "unknown" => Ok(Answer::Unknown),
            other => Err(CoreError::BadInput(other.to_string())),
        }
    }
}
