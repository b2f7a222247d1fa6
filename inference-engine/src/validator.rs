//! Static analysis over a rule base: contradictions, unreachable
//! rules, cycles, orphans. Pure functions of `RuleBase`; no working
//! memory involved.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::fact::FactName;
use crate::rule::{Rule, RuleBase};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub findings: Vec<Finding>,
}

impl ValidationReport {
    pub fn has_blocking(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::High)
    }
}

fn check_contradictions(base: &RuleBase) -> Vec<Finding> {
    let mut findings = Vec::new();
    let facts: BTreeSet<FactName> = base.all_facts().cloned().collect();

    for fact in facts {
        let rules = base.deriving_rules_all(&fact);
        for i in 0..rules.len() {
            for j in (i + 1)..rules.len() {
                let (a, b) = (rules[i], rules[j]);
                let cond_a: BTreeSet<&FactName> = a.condition_facts().collect();
                let cond_b: BTreeSet<&FactName> = b.condition_facts().collect();
                if cond_a != cond_b {
                    continue;
                }
                let val_a = a.actions.iter().find(|act| act.fact == fact).map(|act| act.value);
                let val_b = b.actions.iter().find(|act| act.fact == fact).map(|act| act.value);
                if let (Some(va), Some(vb)) = (val_a, val_b) {
                    if va != vb {
                        findings.push(Finding {
                            severity: Severity::High,
                            message: format!(
                                "rules {} and {} derive '{}' from identical conditions but assign conflicting values",
                                a.id, b.id, fact
                            ),
                        });
                    }
                }
            }
        }
    }
    findings
}

fn check_unreachable(base: &RuleBase) -> Vec<Finding> {
    let mut findings = Vec::new();
    for rule in base.rules() {
        for fact in rule.condition_facts() {
            if !base.is_derivable(fact) {
                continue;
            }
            let deriving = base.deriving_rules_all(fact);
            if !deriving.is_empty() && deriving.iter().all(|r| !r.enabled) {
                findings.push(Finding {
                    severity: Severity::Medium,
                    message: format!(
                        "rule {} is unreachable: condition '{}' is derivable but every rule that derives it is disabled",
                        rule.id, fact
                    ),
                });
                break;
            }
        }
    }
    findings
}

type Graph = HashMap<FactName, Vec<(FactName, u32)>>;

fn build_graph(base: &RuleBase) -> Graph {
    let mut graph: Graph = HashMap::new();
    for rule in base.rules() {
        for cond_fact in rule.condition_facts() {
            for action_fact in rule.action_facts() {
                graph
                    .entry(cond_fact.clone())
                    .or_default()
                    .push((action_fact.clone(), rule.id));
            }
        }
    }
    graph
}

#[allow(clippy::too_many_arguments)]
fn dfs_cycles(
    node: &FactName,
    graph: &Graph,
    stack: &mut Vec<FactName>,
    on_stack: &mut HashSet<FactName>,
    visited: &mut HashSet<FactName>,
    findings: &mut Vec<Finding>,
    reported: &mut HashSet<Vec<FactName>>,
) {
    stack.push(node.clone());
    on_stack.insert(node.clone());
    visited.insert(node.clone());

    if let Some(edges) = graph.get(node) {
        for (next, rule_id) in edges {
            if on_stack.contains(next) {
                if let Some(pos) = stack.iter().position(|f| f == next) {
                    let cycle_facts: Vec<FactName> = stack[pos..].to_vec();
                    let mut canonical = cycle_facts.clone();
                    canonical.sort();
                    if reported.insert(canonical) {
                        findings.push(Finding {
                            severity: Severity::High,
                            message: format!(
                                "circular reference through facts {cycle_facts:?}, closed by rule {rule_id}"
                            ),
                        });
                    }
                }
            } else if !visited.contains(next) {
                dfs_cycles(next, graph, stack, on_stack, visited, findings, reported);
            }
        }
    }

    stack.pop();
    on_stack.remove(node);
}

fn check_cycles(base: &RuleBase) -> Vec<Finding> {
    let graph = build_graph(base);
    let mut findings = Vec::new();
    let mut visited: HashSet<FactName> = HashSet::new();
    let mut reported: HashSet<Vec<FactName>> = HashSet::new();

    let mut nodes: BTreeSet<FactName> = graph.keys().cloned().collect();
    nodes.extend(graph.values().flatten().map(|(f, _)| f.clone()));

    for node in &nodes {
        if visited.contains(node) {
            continue;
        }
        let mut stack = Vec::new();
        let mut on_stack = HashSet::new();
        dfs_cycles(node, &graph, &mut stack, &mut on_stack, &mut visited, &mut findings, &mut reported);
    }
    findings
}

fn check_orphans(base: &RuleBase, goals: &[FactName]) -> Vec<Finding> {
    let mut findings = Vec::new();
    let action_facts: BTreeSet<FactName> = base.rules().flat_map(|r| r.action_facts().cloned()).collect();
    let condition_facts: BTreeSet<FactName> = base.rules().flat_map(|r| r.condition_facts().cloned()).collect();

    for fact in action_facts {
        if condition_facts.contains(&fact) || goals.contains(&fact) {
            continue;
        }
        findings.push(Finding {
            severity: Severity::Low,
            message: format!("fact '{fact}' is only ever concluded, never used as a condition, and is not a goal"),
        });
    }
    findings
}

pub fn validate(base: &RuleBase, goals: &[FactName]) -> ValidationReport {
    let mut findings = Vec::new();
    findings.extend(check_contradictions(base));
    findings.extend(check_unreachable(base));
    findings.extend(check_cycles(base));
    findings.extend(check_orphans(base, goals));
    ValidationReport { findings }
}

/// Provisionally substitutes `candidate` into the rule base, reruns the
/// four checks, and returns the report without mutating `base`.
pub fn test_rule_modification(base: &RuleBase, candidate: Rule, goals: &[FactName]) -> ValidationReport {
    let provisional = base.provisional_with(candidate);
    validate(&provisional, goals)
}
