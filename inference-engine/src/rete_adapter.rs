//! Concrete implementation of the `rete` crate's generic vocabulary over
//! this engine's propositional facts.
//!
//! `FixpointEngine` does not maintain persistent alpha/beta matching
//! state — `on_assert`/`on_retract` are thin wrappers around the real
//! fixpoint evaluator (`crate::evaluator`) that diff the resulting
//! hypothesis map to report newly (in)activated rule matches. This is a
//! deliberate simplification: the domain's rule count is small enough
//! that a full forward sweep per assertion is cheap, and reusing the
//! real evaluator means this adapter can never drift from the engine's
//! actual firing semantics.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use expert_effects::{Effect, Effectful};

use crate::evaluator;
use crate::fact::FactName;
use crate::rule::RuleBase;
use crate::working_memory::{RuleStatus, WorkingMemory};
use rete::{Condition, Fact, ReteNetwork, Rule as ReteRule, RuleMatch};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PropFact {
    pub name: FactName,
    pub value: bool,
}

impl Fact for PropFact {
    type Id = FactName;

    fn id(&self) -> &FactName {
        &self.name
    }

    // Propositional facts carry no timestamp of their own; the adapter
    // stamps assertion time at the call site instead (see `on_assert`).
    fn timestamp(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Matches a `PropFact` whose value is `true` — the only condition shape
/// this propositional engine has: conditions are conjoined, and a
/// condition is satisfied only by a known-true fact.
pub struct MustBeTrue(pub FactName);

impl Condition<PropFact> for MustBeTrue {
    type Bindings = ();

    fn matches(&self, fact: &PropFact) -> Option<()> {
        (fact.name == self.0 && fact.value).then_some(())
    }

    fn description(&self) -> &str {
        "fact must be true"
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HypothesisAction {
    pub fact: FactName,
    pub value: bool,
}

impl Effectful for HypothesisAction {
    fn effect(&self) -> Effect {
        Effect::Mutate
    }
}

pub struct RuleAdapter {
    pub id: String,
    pub priority: i32,
    conditions: Vec<Box<dyn Condition<PropFact, Bindings = ()>>>,
    actions: Vec<HypothesisAction>,
}

impl RuleAdapter {
    pub fn from_rule(rule: &crate::rule::Rule) -> Self {
        Self {
            id: rule.id.to_string(),
            // Lower rule ids win ties in the evaluator's own sweep;
            // mirror that here so `AscendingIdStrategy` agrees with it.
            priority: -(rule.id as i32),
            conditions: rule
                .conditions
                .iter()
                .map(|c| Box::new(MustBeTrue(c.fact.clone())) as Box<dyn Condition<PropFact, Bindings = ()>>)
                .collect(),
            actions: rule
                .actions
                .iter()
                .map(|a| HypothesisAction {
                    fact: a.fact.clone(),
                    value: a.value,
                })
                .collect(),
        }
    }
}

impl ReteRule for RuleAdapter {
    type Fact = PropFact;
    type Action = HypothesisAction;
    type Bindings = ();

    fn id(&self) -> &str {
        &self.id
    }

    fn conditions(&self) -> &[Box<dyn Condition<PropFact, Bindings = ()>>] {
        &self.conditions
    }

    fn actions(&self, _bindings: &()) -> Vec<HypothesisAction> {
        self.actions.clone()
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn description(&self) -> &str {
        "propositional rule"
    }
}

/// Selects the match whose underlying rule has the lowest id, matching
/// the evaluator's ascending-id tie-break.
pub struct AscendingIdStrategy;

impl rete::ConflictStrategy<RuleAdapter> for AscendingIdStrategy {
    fn select(&self, matches: &[RuleMatch<RuleAdapter>]) -> Option<&RuleMatch<RuleAdapter>> {
        matches.iter().max_by_key(|m| m.rule.priority())
    }
}

pub struct FixpointEngine {
    base: RuleBase,
    memory: WorkingMemory,
    activated: Vec<RuleMatch<RuleAdapter>>,
}

impl FixpointEngine {
    pub fn new(base: RuleBase) -> Self {
        Self {
            base,
            memory: WorkingMemory::new(),
            activated: Vec::new(),
        }
    }

    fn rule_match(&self, rule_id: u32, fact_id: &FactName, ts: DateTime<Utc>) -> Option<RuleMatch<RuleAdapter>> {
        let rule = self.base.rule(rule_id)?;
        Some(RuleMatch {
            rule: RuleAdapter::from_rule(rule),
            bindings: (),
            matched_facts: vec![fact_id.clone()],
            timestamp: ts,
        })
    }
}

impl ReteNetwork<PropFact, RuleAdapter> for FixpointEngine {
    fn add_rule(&mut self, _rule: RuleAdapter) {
        // Rule bodies live in `self.base`, not in the adapter's own
        // storage — edits go through `RuleBase::apply_edit`, not
        // through this generic trait surface.
    }

    fn remove_rule(&mut self, _rule_id: &str) -> Option<RuleAdapter> {
        None
    }

    fn on_assert(&mut self, fact: &PropFact) -> Vec<RuleMatch<RuleAdapter>> {
        let before_fired: std::collections::HashSet<u32> = self.memory.state.conflict_set.clone();

        if self.base.is_derivable(&fact.name) {
            self.memory.state.hypotheses.insert(fact.name.clone(), fact.value);
        } else {
            self.memory.state.findings.insert(fact.name.clone(), fact.value);
        }
        evaluator::evaluate_to_fixpoint(&mut self.memory, &self.base);

        let ts = Utc::now();
        let mut newly_fired: Vec<u32> = self
            .memory
            .state
            .conflict_set
            .difference(&before_fired)
            .copied()
            .collect();
        newly_fired.sort_unstable();

        let new_matches: Vec<RuleMatch<RuleAdapter>> = newly_fired
            .iter()
            .filter_map(|id| self.rule_match(*id, &fact.name, ts))
            .collect();
        let for_activated: Vec<RuleMatch<RuleAdapter>> = newly_fired
            .iter()
            .filter_map(|id| self.rule_match(*id, &fact.name, ts))
            .collect();
        self.activated.extend(for_activated);
        new_matches
    }

    fn on_retract(&mut self, fact_id: &FactName) -> Vec<RuleMatch<RuleAdapter>> {
        let before_status: HashMap<u32, RuleStatus> = self.memory.state.rule_status.clone();
        self.memory.state.findings.remove(fact_id);
        self.memory.state.hypotheses.insert(fact_id.clone(), false);
        evaluator::cascade_invalidate(&mut self.memory, &self.base, fact_id);

        let ts = Utc::now();
        let mut invalidated = Vec::new();
        for (rule_id, status) in &self.memory.state.rule_status {
            if *status == RuleStatus::Skipped && before_status.get(rule_id) != Some(&RuleStatus::Skipped) {
                if let Some(m) = self.rule_match(*rule_id, fact_id, ts) {
                    invalidated.push(m);
                }
            }
        }
        invalidated
    }

    fn activated(&self) -> &[RuleMatch<RuleAdapter>] {
        &self.activated
    }
}
