//! The session handle and the concurrent session registry: the store
//! must support safe concurrent access, and concurrent requests against
//! the same session id must be serialized.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;

use crate::audit::AuditEvent;
use crate::driver::{self, AnswerOutcome, GoalSpec};
use crate::error::{CoreError, CoreResult};
use crate::fact::{Answer, FactName};
use crate::rule::RuleBase;
use crate::working_memory::{RuleStatus, WorkingMemory, WorkingMemoryState};

pub type SessionId = String;

pub struct Session {
    pub rule_base: Arc<RuleBase>,
    pub goals: Vec<GoalSpec>,
    pub memory: WorkingMemory,
}

/// `DashMap` gives lock-free access across sessions; the per-session
/// `Mutex` serializes concurrent requests against the same session id,
/// the two halves of the concurrency contract.
pub struct SessionStore {
    sessions: DashMap<SessionId, Mutex<Session>>,
    next_id: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn start(&self, rule_base: Arc<RuleBase>, goals: Vec<GoalSpec>) -> (SessionId, Option<FactName>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session_id = format!("sess-{id}");
        let memory = WorkingMemory::new();
        let first_question = driver::next_question(&rule_base, &goals, &memory);

        self.sessions.insert(
            session_id.clone(),
            Mutex::new(Session {
                rule_base,
                goals,
                memory,
            }),
        );
        tracing::info!(session = %session_id, "session started");
        (session_id, first_question)
    }

    pub fn answer(
        &self,
        id: &str,
        fact: &str,
        answer_token: &str,
    ) -> CoreResult<(AnswerOutcome, Vec<AuditEvent>)> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        let mut session = entry.lock().expect("session mutex poisoned");

        let answer = Answer::parse(answer_token)?;
        let outcome = driver::process_answer(&session.rule_base, &session.goals, &mut session.memory, fact, answer);
        let events = outcome_to_audit(&outcome, fact, answer);
        tracing::debug!(session = id, fact, fired = outcome.fired_rules.len(), "answer processed");
        Ok((outcome, events))
    }

    pub fn undo(&self, id: &str) -> CoreResult<(Option<FactName>, bool)> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        let mut session = entry.lock().expect("session mutex poisoned");

        let could_undo = session.memory.undo();
        let next_question = driver::next_question(&session.rule_base, &session.goals, &session.memory);
        tracing::debug!(session = id, could_undo, "undo processed");
        Ok((next_question, could_undo))
    }

    pub fn rules_view(&self, id: &str) -> CoreResult<BTreeMap<u32, RuleStatus>> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        let session = entry.lock().expect("session mutex poisoned");
        Ok(session.memory.state.rule_status.clone())
    }

    pub fn working_memory_view(&self, id: &str) -> CoreResult<WorkingMemoryState> {
        let entry = self
            .sessions
            .get(id)
            .ok_or_else(|| CoreError::SessionNotFound(id.to_string()))?;
        let session = entry.lock().expect("session mutex poisoned");
        Ok(session.memory.state.clone())
    }

    pub fn discard(&self, id: &str) {
        self.sessions.remove(id);
    }
}

fn outcome_to_audit(outcome: &AnswerOutcome, fact: &str, answer: Answer) -> Vec<AuditEvent> {
    let mut events = Vec::new();
    match answer {
        Answer::Yes => events.push(AuditEvent::FactAsserted {
            fact: fact.to_string(),
            value: true,
        }),
        Answer::No => events.push(AuditEvent::FactRetracted {
            fact: fact.to_string(),
        }),
        Answer::Unknown => {}
    }
    for rule_id in &outcome.fired_rules {
        events.push(AuditEvent::RuleFired { rule_id: *rule_id });
    }
    for rule_id in &outcome.newly_skipped {
        events.push(AuditEvent::RuleSkipped { rule_id: *rule_id });
    }
    if let Some(goal_map) = &outcome.terminal {
        events.push(AuditEvent::Resolved {
            goal_map: goal_map.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::PriorityTier;
    use crate::rule::{Action, Condition, Rule, RuleKind};

    fn single_rule_base() -> Arc<RuleBase> {
        Arc::new(RuleBase::from_rules(vec![Rule {
            id: 1,
            name: "r1".into(),
            tag: "T".into(),
            kind: RuleKind::Initial,
            conditions: vec![Condition::new("shared_nationality")],
            actions: vec![Action::new("e_visa_ok", true)],
            enabled: true,
            version: 1,
        }]))
    }

    #[test]
    fn unknown_session_id_reports_not_found() {
        let store = SessionStore::new();
        let err = store.answer("missing", "x", "yes").unwrap_err();
        assert_eq!(err, CoreError::SessionNotFound("missing".into()));
    }

    #[test]
    fn start_answer_undo_roundtrip() {
        let store = SessionStore::new();
        let base = single_rule_base();
        let goals = vec![GoalSpec::new("e_visa_ok", PriorityTier::High)];
        let (id, first_question) = store.start(base, goals);
        assert_eq!(first_question, Some("shared_nationality".to_string()));

        let (outcome, events) = store.answer(&id, "shared_nationality", "yes").expect("answer");
        assert_eq!(outcome.fired_rules, vec![1]);
        assert!(events.iter().any(|e| matches!(e, AuditEvent::RuleFired { rule_id: 1 })));
        assert_eq!(outcome.terminal, Some(BTreeMap::from([("e_visa_ok".to_string(), true)])));

        let (next_question_after_undo, could_undo) = store.undo(&id).expect("undo");
        assert!(could_undo);
        assert_eq!(next_question_after_undo, Some("shared_nationality".to_string()));

        let memory = store.working_memory_view(&id).expect("memory view");
        assert!(memory.findings.is_empty());
    }

    #[test]
    fn answering_no_emits_rule_skipped_audit_events() {
        let store = SessionStore::new();
        let base = single_rule_base();
        let goals = vec![GoalSpec::new("e_visa_ok", PriorityTier::High)];
        let (id, _) = store.start(base, goals);

        let (outcome, events) = store.answer(&id, "shared_nationality", "no").expect("answer");
        assert_eq!(outcome.newly_skipped, vec![1]);
        assert!(events.iter().any(|e| matches!(e, AuditEvent::RuleSkipped { rule_id: 1 })));
    }

    #[test]
    fn undo_with_empty_history_reports_false() {
        let store = SessionStore::new();
        let base = single_rule_base();
        let goals = vec![GoalSpec::new("e_visa_ok", PriorityTier::High)];
        let (id, _) = store.start(base, goals);
        let (_, could_undo) = store.undo(&id).expect("undo");
        assert!(!could_undo);
    }
}
