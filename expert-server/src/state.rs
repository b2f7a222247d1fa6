//! Shared application state: the canonical (admin-editable) rule base
//! and the session registry sessions are started against.

use std::sync::Mutex;

use inference_engine::{GoalSpec, RuleBase, SessionStore};

pub struct AppState {
    pub sessions: SessionStore,
    pub rule_base: Mutex<RuleBase>,
    pub goals: Vec<GoalSpec>,
}

impl AppState {
    pub fn new(rule_base: RuleBase, goals: Vec<GoalSpec>) -> Self {
        Self {
            sessions: SessionStore::new(),
            rule_base: Mutex::new(rule_base),
            goals,
        }
    }

    fn goal_facts(&self) -> Vec<String> {
        self.goals.iter().map(|g| g.fact.clone()).collect()
    }

    pub fn validate_current(&self) -> inference_engine::ValidationReport {
        let base = self.rule_base.lock().expect("rule base mutex poisoned");
        inference_engine::validator::validate(&base, &self.goal_facts())
    }
}
