//! Converts the wire rule schema into the core's in-memory `Rule`.

use inference_engine::{Action, Condition, CoreError, Rule, RuleKind};
use rule_schema::{validate_rule_v1, CanonicalRuleV1};

pub fn rule_from_wire(wire: CanonicalRuleV1) -> Result<Rule, CoreError> {
    validate_rule_v1(&wire).map_err(|e| CoreError::BadInput(e.to_string()))?;

    let kind = match wire.kind.as_str() {
        "initial" => RuleKind::Initial,
        "intermediate" => RuleKind::Intermediate,
        other => return Err(CoreError::BadInput(format!("unknown rule kind '{other}'"))),
    };

    Ok(Rule {
        id: wire.id,
        name: wire.name,
        tag: wire.tag,
        kind,
        conditions: wire.conditions.into_iter().map(|c| Condition::new(c.fact)).collect(),
        actions: wire.actions.into_iter().map(|a| Action::new(a.fact, a.value)).collect(),
        enabled: wire.enabled,
        version: 0,
    })
}
