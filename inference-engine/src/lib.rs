//! Backward-chaining propositional inference core: an immutable rule
//! base with derivation indices, a fixpoint evaluator, a
//! question-selecting driver, cascade invalidation, history/undo, and a
//! static rule validator, wrapped in a concurrent session store.

pub mod audit;
pub mod bundled;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod fact;
pub mod rete_adapter;
pub mod rule;
pub mod session;
pub mod validator;
pub mod working_memory;

pub use driver::{AnswerOutcome, GoalSpec, PriorityTier};
pub use error::{CoreError, CoreResult};
pub use fact::{Answer, FactName};
pub use rule::{Action, Condition, Rule, RuleBase, RuleEdit, RuleKind};
pub use session::{Session, SessionId, SessionStore};
pub use validator::{Finding, Severity, ValidationReport};
pub use working_memory::{RuleStatus, WorkingMemory, WorkingMemoryState};
