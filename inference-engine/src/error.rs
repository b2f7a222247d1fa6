use thiserror::Error;

/// Typed error surface for the inference core.
///
/// `Internal` is reserved for violated internal invariants — conditions
/// the core asserts itself rather than ones a caller can trigger through
/// valid input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("session {0} not found")]
    SessionNotFound(String),
    #[error("rule {0} not found")]
    RuleNotFound(u32),
    #[error("unrecognized answer token '{0}', expected yes/no/unknown")]
    BadInput(String),
    #[error("rule {rule_id} edit conflict: expected version {expected}, found {actual}")]
    Conflict {
        rule_id: u32,
        expected: u32,
        actual: u32,
    },
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
