//! Immutable (per-version) representation of a rule base: the rules
//! themselves plus the two indices every other component reads from
//! (`deriving_rules`, `dependent_rules`).

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::fact::FactName;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub fact: FactName,
    pub connector: String,
}

impl Condition {
    pub fn new(fact: impl Into<FactName>) -> Self {
        Self {
            fact: fact.into(),
            connector: "and".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub fact: FactName,
    pub value: bool,
}

impl Action {
    pub fn new(fact: impl Into<FactName>, value: bool) -> Self {
        Self {
            fact: fact.into(),
            value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Initial,
    Intermediate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: u32,
    pub name: String,
    pub tag: String,
    pub kind: RuleKind,
    pub conditions: Vec<Condition>,
    pub actions: Vec<Action>,
    pub enabled: bool,
    pub version: u32,
}

impl Rule {
    pub fn condition_facts(&self) -> impl Iterator<Item = &FactName> {
        self.conditions.iter().map(|c| &c.fact)
    }

    pub fn action_facts(&self) -> impl Iterator<Item = &FactName> {
        self.actions.iter().map(|a| &a.fact)
    }
}

/// A pending change to the rule base, applied through optimistic
/// concurrency on the target rule's `version`.
#[derive(Clone, Debug)]
pub enum RuleEdit {
    Create(Rule),
    Update(Rule),
    Delete(u32),
    SetEnabled { id: u32, enabled: bool },
}

#[derive(Clone, Debug)]
pub struct RuleBase {
    rules: BTreeMap<u32, Rule>,
    deriving_rules: HashMap<FactName, Vec<u32>>,
    dependent_rules: HashMap<FactName, Vec<u32>>,
}

impl RuleBase {
    pub fn from_rules(rules: Vec<Rule>) -> Self {
        let mut base = RuleBase {
            rules: rules.into_iter().map(|r| (r.id, r)).collect(),
            deriving_rules: HashMap::new(),
            dependent_rules: HashMap::new(),
        };
        base.rebuild_indices();
        base
    }

    pub fn load_json(path: &std::path::Path) -> CoreResult<Self> {
        let bytes = std::fs::read(path)
            .map_err(|e| CoreError::Internal(format!("reading rule base: {e}")))?;
        let rules: Vec<Rule> = serde_json::from_slice(&bytes)
            .map_err(|e| CoreError::Internal(format!("parsing rule base: {e}")))?;
        Ok(Self::from_rules(rules))
    }

    fn rebuild_indices(&mut self) {
        self.deriving_rules.clear();
        self.dependent_rules.clear();
        for rule in self.rules.values() {
            for fact in rule.action_facts() {
                self.deriving_rules
                    .entry(fact.clone())
                    .or_default()
                    .push(rule.id);
            }
            for fact in rule.condition_facts() {
                self.dependent_rules
                    .entry(fact.clone())
                    .or_default()
                    .push(rule.id);
            }
        }
        for ids in self.deriving_rules.values_mut() {
            ids.sort_unstable();
        }
        for ids in self.dependent_rules.values_mut() {
            ids.sort_unstable();
        }
    }

    pub fn rule(&self, id: u32) -> Option<&Rule> {
        self.rules.get(&id)
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values()
    }

    pub fn enabled_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.values().filter(|r| r.enabled)
    }

    /// Rules in `deriving_rules[fact]`, restricted to enabled ones — the
    /// form the evaluator and driver actually consult.
    pub fn deriving_rules(&self, fact: &str) -> Vec<&Rule> {
        self.deriving_rules
            .get(fact)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rules.get(id))
            .filter(|r| r.enabled)
            .collect()
    }

    /// Same as `deriving_rules` but includes disabled rules — needed by
    /// the unreachability check, which must see disabled rules to
    /// detect that *all* of them are disabled.
    pub fn deriving_rules_all(&self, fact: &str) -> Vec<&Rule> {
        self.deriving_rules
            .get(fact)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rules.get(id))
            .collect()
    }

    pub fn dependent_rules(&self, fact: &str) -> Vec<&Rule> {
        self.dependent_rules
            .get(fact)
            .into_iter()
            .flatten()
            .filter_map(|id| self.rules.get(id))
            .filter(|r| r.enabled)
            .collect()
    }

    pub fn is_derivable(&self, fact: &str) -> bool {
        self.deriving_rules.contains_key(fact)
    }

    /// All fact names mentioned anywhere in the rule base, as conditions
    /// or actions.
    pub fn all_facts(&self) -> impl Iterator<Item = &FactName> {
        self.deriving_rules.keys().chain(self.dependent_rules.keys())
    }

    pub fn apply_edit(&mut self, edit: RuleEdit, expected_version: u32) -> CoreResult<u32> {
        match edit {
            RuleEdit::Create(mut rule) => {
                if self.rules.contains_key(&rule.id) {
                    return Err(CoreError::Conflict {
                        rule_id: rule.id,
                        expected: expected_version,
                        actual: self.rules[&rule.id].version,
                    });
                }
                rule.version = 1;
                self.rules.insert(rule.id, rule);
                self.rebuild_indices();
                Ok(1)
            }
            RuleEdit::Update(mut rule) => {
                let id = rule.id;
                let current = self.rules.get(&id).ok_or(CoreError::RuleNotFound(id))?;
                self.check_version(id, current.version, expected_version)?;
                let new_version = expected_version + 1;
                rule.version = new_version;
                self.rules.insert(id, rule);
                self.rebuild_indices();
                Ok(new_version)
            }
            RuleEdit::SetEnabled { id, enabled } => {
                let current = self.rules.get(&id).ok_or(CoreError::RuleNotFound(id))?;
                self.check_version(id, current.version, expected_version)?;
                let new_version = expected_version + 1;
                let mut rule = current.clone();
                rule.enabled = enabled;
                rule.version = new_version;
                self.rules.insert(id, rule);
                self.rebuild_indices();
                Ok(new_version)
            }
            RuleEdit::Delete(id) => {
                let current = self.rules.get(&id).ok_or(CoreError::RuleNotFound(id))?;
                self.check_version(id, current.version, expected_version)?;
                self.rules.remove(&id);
                self.rebuild_indices();
                Ok(expected_version + 1)
            }
        }
    }

    fn check_version(&self, rule_id: u32, actual: u32, expected: u32) -> CoreResult<()> {
        if actual != expected {
            return Err(CoreError::Conflict {
                rule_id,
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Clones the base with `candidate` substituted in by id (inserted if
    /// new), for the validator's "what-if" check. Never mutates `self`.
    pub fn provisional_with(&self, candidate: Rule) -> RuleBase {
        let mut rules: Vec<Rule> = self.rules.values().cloned().collect();
        rules.retain(|r| r.id != candidate.id);
        rules.push(candidate);
        RuleBase::from_rules(rules)
    }
}
