//! Backward-chaining question selection and answer processing.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::evaluator;
use crate::fact::{Answer, FactName};
use crate::rule::RuleBase;
use crate::working_memory::{RuleStatus, WorkingMemory};

/// The configurable priority-group mapping. The group-to-tier mapping
/// is configuration; the default in the bundled rule base ranks E-visa
/// above L-visa above B-visa goals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorityTier {
    High,
    Middle,
    Low,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GoalSpec {
    pub fact: FactName,
    pub priority: PriorityTier,
}

impl GoalSpec {
    pub fn new(fact: impl Into<FactName>, priority: PriorityTier) -> Self {
        Self {
            fact: fact.into(),
            priority,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub fired_rules: Vec<u32>,
    pub newly_skipped: Vec<u32>,
    pub newly_derived: Vec<(FactName, bool)>,
    pub next_question: Option<FactName>,
    pub terminal: Option<BTreeMap<FactName, bool>>,
    pub detail_questions_needed: bool,
    pub detail_questions: Vec<FactName>,
}

/// Backward DFS from `goal` through `deriving_rules`, following the
/// minimum-condition-count rule at each derivable step (ties broken by
/// lowest rule id). Includes both basic leaves and derivable
/// intermediates visited along the way.
fn facts_for_goal(base: &RuleBase, goal: &str, visited: &mut HashSet<FactName>) -> HashSet<FactName> {
    let mut out = HashSet::new();
    if !visited.insert(goal.to_string()) {
        return out;
    }
    out.insert(goal.to_string());

    if !base.is_derivable(goal) {
        return out;
    }

    let rules = base.deriving_rules(goal);
    if let Some(chosen) = rules.iter().min_by_key(|r| (r.conditions.len(), r.id)) {
        for cond in &chosen.conditions {
            out.extend(facts_for_goal(base, &cond.fact, visited));
        }
    }
    out
}

fn tier_bonus(tier: PriorityTier) -> i32 {
    match tier {
        PriorityTier::High => 50,
        PriorityTier::Middle => 30,
        PriorityTier::Low => 10,
    }
}

/// Selects the next question to ask, or `None` if the dialogue is
/// complete.
pub fn next_question(base: &RuleBase, goals: &[GoalSpec], wm: &WorkingMemory) -> Option<FactName> {
    let mut goal_sets: Vec<(&GoalSpec, HashSet<FactName>)> = Vec::new();
    for goal in goals {
        if wm.value_of(&goal.fact).is_some() {
            continue;
        }
        let mut visited = HashSet::new();
        goal_sets.push((goal, facts_for_goal(base, &goal.fact, &mut visited)));
    }

    let mut pool: HashSet<FactName> = HashSet::new();
    for (_, set) in &goal_sets {
        pool.extend(set.iter().cloned());
    }
    pool.retain(|f| wm.value_of(f).is_none() && !wm.state.skipped_facts.contains(f));

    if pool.is_empty() {
        return None;
    }

    let mut best: Option<(i32, FactName)> = None;
    for f in pool {
        let mut best_tier_bonus = 0i32;
        let mut share_count = 0i32;
        for (goal, set) in &goal_sets {
            if set.contains(&f) {
                share_count += 1;
                best_tier_bonus = best_tier_bonus.max(tier_bonus(goal.priority));
            }
        }

        let mut score = best_tier_bonus + 10 * share_count;
        score += if base.is_derivable(&f) { 50 } else { 30 };
        if f.len() <= 30 {
            score += 30;
        }

        best = match best {
            None => Some((score, f)),
            Some((best_score, best_fact)) => {
                if score > best_score || (score == best_score && f < best_fact) {
                    Some((score, f))
                } else {
                    Some((best_score, best_fact))
                }
            }
        };
    }

    best.map(|(_, f)| f)
}

fn goal_map(goals: &[GoalSpec], wm: &WorkingMemory) -> BTreeMap<FactName, bool> {
    goals
        .iter()
        .map(|g| (g.fact.clone(), wm.value_of(&g.fact).unwrap_or(false)))
        .collect()
}

/// Processes one `(fact, answer)` pair end to end: snapshot, store,
/// cascade, evaluate to fixpoint, pick the next question.
pub fn process_answer(
    base: &RuleBase,
    goals: &[GoalSpec],
    wm: &mut WorkingMemory,
    fact: &str,
    answer: Answer,
) -> AnswerOutcome {
    if answer == Answer::Unknown && base.is_derivable(fact) {
        let mut details: BTreeSet<FactName> = BTreeSet::new();
        for rule in base.deriving_rules(fact) {
            for cond in &rule.conditions {
                if base.is_derivable(&cond.fact) {
                    continue;
                }
                if wm.is_known(&cond.fact) {
                    continue;
                }
                details.insert(cond.fact.clone());
            }
        }
        tracing::debug!(fact, "derivable fact answered unknown, asking detail questions");
        return AnswerOutcome {
            next_question: next_question(base, goals, wm),
            detail_questions_needed: true,
            detail_questions: details.into_iter().collect(),
            ..Default::default()
        };
    }

    let stored_value = matches!(answer, Answer::Yes);

    wm.push_history(fact, answer);

    let before_hypotheses: HashSet<FactName> = wm.state.hypotheses.keys().cloned().collect();
    let before_conflict: HashSet<u32> = wm.state.conflict_set.clone();
    let before_skipped: HashSet<u32> = wm
        .state
        .rule_status
        .iter()
        .filter(|(_, status)| **status == RuleStatus::Skipped)
        .map(|(id, _)| *id)
        .collect();

    if base.is_derivable(fact) {
        wm.state.hypotheses.insert(fact.to_string(), stored_value);
        wm.state.asked_derivable_facts.insert(fact.to_string());
        if stored_value {
            for rule in base.deriving_rules(fact) {
                for cond in &rule.conditions {
                    if !base.is_derivable(&cond.fact) {
                        wm.state.skipped_facts.insert(cond.fact.clone());
                    }
                }
            }
        }
    } else {
        wm.state.findings.insert(fact.to_string(), stored_value);
    }

    if !stored_value {
        evaluator::cascade_invalidate(wm, base, fact);
    }
    evaluator::evaluate_to_fixpoint(wm, base);

    let mut fired_rules: Vec<u32> = wm
        .state
        .conflict_set
        .difference(&before_conflict)
        .copied()
        .collect();
    fired_rules.sort_unstable();

    let mut newly_skipped: Vec<u32> = wm
        .state
        .rule_status
        .iter()
        .filter(|(id, status)| **status == RuleStatus::Skipped && !before_skipped.contains(*id))
        .map(|(id, _)| *id)
        .collect();
    newly_skipped.sort_unstable();

    let newly_derived: Vec<(FactName, bool)> = wm
        .state
        .hypotheses
        .iter()
        .filter(|(k, _)| !before_hypotheses.contains(*k))
        .map(|(k, v)| (k.clone(), *v))
        .collect();

    let next_q = next_question(base, goals, wm);
    let terminal = next_q.is_none().then(|| goal_map(goals, wm));

    AnswerOutcome {
        fired_rules,
        newly_skipped,
        newly_derived,
        next_question: next_q,
        terminal,
        detail_questions_needed: false,
        detail_questions: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Action, Condition, Rule, RuleKind};

    fn rule(id: u32, conditions: &[&str], action: (&str, bool)) -> Rule {
        Rule {
            id,
            name: format!("r{id}"),
            tag: "T".into(),
            kind: RuleKind::Intermediate,
            conditions: conditions.iter().map(|c| Condition::new(*c)).collect(),
            actions: vec![Action::new(action.0, action.1)],
            enabled: true,
            version: 1,
        }
    }

    #[test]
    fn next_question_prefers_high_priority_goal() {
        let base = RuleBase::from_rules(vec![
            rule(1, &["goal_a_leaf"], ("goal_a", true)),
            rule(2, &["goal_b_leaf"], ("goal_b", true)),
        ]);
        let goals = vec![
            GoalSpec::new("goal_a", PriorityTier::High),
            GoalSpec::new("goal_b", PriorityTier::Low),
        ];
        let wm = WorkingMemory::new();
        let question = next_question(&base, &goals, &wm);
        assert_eq!(question, Some("goal_a".to_string()));
    }

    #[test]
    fn next_question_returns_none_once_pool_is_exhausted() {
        let base = RuleBase::from_rules(vec![rule(1, &["leaf"], ("goal", true))]);
        let goals = vec![GoalSpec::new("goal", PriorityTier::High)];
        let mut wm = WorkingMemory::new();
        wm.state.hypotheses.insert("goal".into(), true);
        assert_eq!(next_question(&base, &goals, &wm), None);
    }

    #[test]
    fn unknown_on_derivable_fact_returns_detail_questions_without_storing() {
        let base = RuleBase::from_rules(vec![
            rule(3, &["leaf_a"], ("company_conditions", true)),
            rule(4, &["leaf_b"], ("company_conditions", true)),
        ]);
        let goals = vec![GoalSpec::new("company_conditions", PriorityTier::High)];
        let mut wm = WorkingMemory::new();

        let outcome = process_answer(&base, &goals, &mut wm, "company_conditions", Answer::Unknown);

        assert!(outcome.detail_questions_needed);
        assert_eq!(outcome.detail_questions, vec!["leaf_a".to_string(), "leaf_b".to_string()]);
        assert!(wm.value_of("company_conditions").is_none());
        assert!(wm.history.is_empty());
    }

    #[test]
    fn yes_on_derivable_fact_skips_its_alternative_basic_conditions() {
        let base = RuleBase::from_rules(vec![
            rule(4, &["equipment_over_300k"], ("company_meets_e_investment", true)),
            rule(5, &["acquired_over_300k"], ("company_meets_e_investment", true)),
        ]);
        let goals = vec![GoalSpec::new("company_meets_e_investment", PriorityTier::High)];
        let mut wm = WorkingMemory::new();

        let outcome = process_answer(
            &base,
            &goals,
            &mut wm,
            "company_meets_e_investment",
            Answer::Yes,
        );

        assert_eq!(wm.value_of("company_meets_e_investment"), Some(true));
        assert!(wm.state.skipped_facts.contains("equipment_over_300k"));
        assert!(wm.state.skipped_facts.contains("acquired_over_300k"));
        assert_eq!(outcome.next_question, None);
        assert_eq!(
            outcome.terminal,
            Some(BTreeMap::from([("company_meets_e_investment".to_string(), true)]))
        );
    }

    #[test]
    fn no_on_basic_condition_cascades_and_produces_false_terminal() {
        let base = RuleBase::from_rules(vec![rule(1, &["shared_nationality"], ("e_visa_ok", true))]);
        let goals = vec![GoalSpec::new("e_visa_ok", PriorityTier::High)];
        let mut wm = WorkingMemory::new();

        let outcome = process_answer(&base, &goals, &mut wm, "shared_nationality", Answer::No);

        assert_eq!(outcome.terminal, Some(BTreeMap::from([("e_visa_ok".to_string(), false)])));
    }
}
