//! Side-effect descriptors the core hands back to its caller for
//! optional persistence. The core takes no dependency on a store;
//! `expert-server` decides what to do with these.

use serde::{Deserialize, Serialize};

use crate::fact::FactName;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    FactAsserted { fact: FactName, value: bool },
    FactRetracted { fact: FactName },
    RuleFired { rule_id: u32 },
    RuleSkipped { rule_id: u32 },
    Resolved { goal_map: Vec<(FactName, bool)> },
}
