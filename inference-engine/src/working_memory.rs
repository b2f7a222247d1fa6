//! Per-session mutable state: the working memory of one dialogue.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::fact::{Answer, FactName};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleStatus {
    NotEvaluated,
    Evaluating,
    Fired,
    Failed,
    Skipped,
}

/// The six fields snapshotted before every answer, plus the
/// `history` stack itself which is not part of its own snapshot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingMemoryState {
    pub findings: BTreeMap<FactName, bool>,
    pub hypotheses: BTreeMap<FactName, bool>,
    pub rule_status: BTreeMap<u32, RuleStatus>,
    pub conflict_set: BTreeSet<u32>,
    pub skipped_facts: BTreeSet<FactName>,
    pub asked_derivable_facts: BTreeSet<FactName>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub fact: FactName,
    pub answer_token: String,
    pub snapshot: WorkingMemoryState,
}

#[derive(Clone, Debug, Default)]
pub struct WorkingMemory {
    pub state: WorkingMemoryState,
    pub history: Vec<HistoryEntry>,
}

impl WorkingMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, rule_id: u32) -> RuleStatus {
        self.state
            .rule_status
            .get(&rule_id)
            .copied()
            .unwrap_or(RuleStatus::NotEvaluated)
    }

    /// A fact's current value, if known, regardless of which map it
    /// lives in — callers should never need to check both maps manually.
    pub fn value_of(&self, fact: &str) -> Option<bool> {
        self.state
            .findings
            .get(fact)
            .or_else(|| self.state.hypotheses.get(fact))
            .copied()
    }

    pub fn is_known(&self, fact: &str) -> bool {
        self.value_of(fact).is_some() || self.state.skipped_facts.contains(fact)
    }

    /// Pushes a deep snapshot of the pre-answer state onto `history`.
    /// Must be called before the answer is stored.
    pub fn push_history(&mut self, fact: &str, answer: Answer) {
        let token = match answer {
            Answer::Yes => "yes",
            Answer::No => "no",
            Answer::Unknown => "unknown",
        };
        self.history.push(HistoryEntry {
            fact: fact.to_string(),
            answer_token: token.to_string(),
            snapshot: self.state.clone(),
        });
    }

    /// Restores the state preceding the most recent answer and shrinks
    /// `history` by one. Returns `false` ("nothing to undo") if the
    /// stack was empty.
    pub fn undo(&mut self) -> bool {
        match self.history.pop() {
            Some(entry) => {
                self.state = entry.snapshot;
                true
            }
            None => false,
        }
    }
}
