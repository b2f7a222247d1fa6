//! Forward sweep to fixpoint and cascade invalidation.

use std::collections::{HashSet, VecDeque};

use crate::fact::FactName;
use crate::rule::{Rule, RuleBase};
use crate::working_memory::{RuleStatus, WorkingMemory};

enum ConditionState {
    AllSatisfied,
    Violated { remaining_unknown: Vec<FactName> },
    Incomplete,
}

fn condition_state(wm: &WorkingMemory, rule: &Rule) -> ConditionState {
    let mut violated = false;
    let mut remaining_unknown = Vec::new();

    for cond in &rule.conditions {
        if wm.state.skipped_facts.contains(&cond.fact) {
            continue;
        }
        match wm.value_of(&cond.fact) {
            Some(true) => {}
            Some(false) => violated = true,
            None => remaining_unknown.push(cond.fact.clone()),
        }
    }

    if violated {
        ConditionState::Violated { remaining_unknown }
    } else if !remaining_unknown.is_empty() {
        ConditionState::Incomplete
    } else {
        ConditionState::AllSatisfied
    }
}

/// Runs every enabled, not-yet-settled rule to fixpoint: a sweep fires or
/// skips every rule it can, and repeats as long as the previous sweep
/// made progress (hypothesis keys only grow, so this always terminates).
pub fn evaluate_to_fixpoint(wm: &mut WorkingMemory, base: &RuleBase) {
    loop {
        let mut progressed = false;
        let mut ids: Vec<u32> = base.enabled_rules().map(|r| r.id).collect();
        ids.sort_unstable();

        for id in ids {
            if matches!(wm.status(id), RuleStatus::Fired | RuleStatus::Skipped) {
                continue;
            }
            let rule = base.rule(id).expect("enabled rule id is in the rule base");

            match condition_state(wm, rule) {
                ConditionState::AllSatisfied => {
                    for action in &rule.actions {
                        wm.state.hypotheses.insert(action.fact.clone(), action.value);
                    }
                    wm.state.rule_status.insert(id, RuleStatus::Fired);
                    wm.state.conflict_set.insert(id);
                    tracing::trace!(rule = id, "rule fired");
                    progressed = true;
                }
                ConditionState::Violated { remaining_unknown } => {
                    wm.state.rule_status.insert(id, RuleStatus::Skipped);
                    for fact in remaining_unknown {
                        wm.state.skipped_facts.insert(fact);
                    }
                    tracing::trace!(rule = id, "rule skipped (violated condition)");
                    progressed = true;
                }
                ConditionState::Incomplete => {}
            }
        }

        if !progressed {
            break;
        }
    }
}

/// Propagates falsity from `fact` through every rule that conditions on
/// it, and recurses into any hypothesis those rules concluded.
/// Uses an explicit worklist rather than recursion, per the design
/// notes on cyclic rule graphs.
pub fn cascade_invalidate(wm: &mut WorkingMemory, base: &RuleBase, fact: &str) {
    let mut worklist: VecDeque<FactName> = VecDeque::new();
    let mut visited: HashSet<FactName> = HashSet::new();
    worklist.push_back(fact.to_string());

    while let Some(f) = worklist.pop_front() {
        if !visited.insert(f.clone()) {
            continue;
        }

        let mut dependents: Vec<u32> = base.dependent_rules(&f).iter().map(|r| r.id).collect();
        dependents.sort_unstable();

        for rule_id in dependents {
            if matches!(wm.status(rule_id), RuleStatus::Fired | RuleStatus::Skipped) {
                continue;
            }
            wm.state.rule_status.insert(rule_id, RuleStatus::Skipped);
            tracing::debug!(rule = rule_id, fact = %f, "rule skipped by cascade");

            let rule = base.rule(rule_id).expect("dependent rule id is in the rule base");
            for action in &rule.actions {
                if wm.state.hypotheses.contains_key(&action.fact) {
                    wm.state.hypotheses.insert(action.fact.clone(), false);
                    worklist.push_back(action.fact.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::{Action, Condition, RuleKind};

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
    fn fires_when_all_conditions_true() {
        let base = RuleBase::from_rules(vec![rule(1, &["a"], ("b", true))]);
        let mut wm = WorkingMemory::new();
        wm.state.findings.insert("a".into(), true);

        evaluate_to_fixpoint(&mut wm, &base);

        assert_eq!(wm.status(1), RuleStatus::Fired);
        assert_eq!(wm.state.hypotheses.get("b"), Some(&true));
        assert!(wm.state.conflict_set.contains(&1));
    }

    #[test]
    fn cascades_across_two_hops() {
        let base = RuleBase::from_rules(vec![
            rule(1, &["a"], ("b", true)),
            rule(2, &["b"], ("c", true)),
        ]);
        let mut wm = WorkingMemory::new();
        wm.state.findings.insert("a".into(), true);
        evaluate_to_fixpoint(&mut wm, &base);
        assert_eq!(wm.state.hypotheses.get("c"), Some(&true));

        // "a" later becomes false (e.g. undo-then-reanswer at the driver level).
        wm.state.findings.insert("a".into(), false);
        cascade_invalidate(&mut wm, &base, "a");

        assert_eq!(wm.status(1), RuleStatus::Skipped);
        assert_eq!(wm.status(2), RuleStatus::Skipped);
        assert_eq!(wm.state.hypotheses.get("b"), Some(&false));
        assert_eq!(wm.state.hypotheses.get("c"), Some(&false));
    }

    #[test]
    fn skipped_rule_adds_remaining_conditions_to_skipped_facts() {
        let base = RuleBase::from_rules(vec![rule(1, &["a", "b"], ("c", true))]);
        let mut wm = WorkingMemory::new();
        wm.state.findings.insert("a".into(), false);

        evaluate_to_fixpoint(&mut wm, &base);

        assert_eq!(wm.status(1), RuleStatus::Skipped);
        assert!(wm.state.skipped_facts.contains("b"));
    }

    #[test]
    fn trivially_skipped_condition_still_allows_firing() {
        let base = RuleBase::from_rules(vec![rule(1, &["a", "b"], ("c", true))]);
        let mut wm = WorkingMemory::new();
        wm.state.findings.insert("a".into(), true);
        wm.state.skipped_facts.insert("b".into());

        evaluate_to_fixpoint(&mut wm, &base);

        assert_eq!(wm.status(1), RuleStatus::Fired);
        assert_eq!(wm.state.hypotheses.get("c"), Some(&true));
    }
}
