//! The default rule base shipped with this crate: a compact but real
//! nonimmigrant-visa eligibility ruleset covering E, L, H-1B, B, and J-1
//! categories. Used by `expert-server`'s default startup and by the
//! scenario tests.

use crate::driver::{GoalSpec, PriorityTier};
use crate::rule::{Action, Condition, Rule, RuleBase, RuleKind};

fn rule(id: u32, name: &str, tag: &str, kind: RuleKind, conditions: &[&str], action: (&str, bool)) -> Rule {
    Rule {
        id,
        name: name.to_string(),
        tag: tag.to_string(),
        kind,
        conditions: conditions.iter().map(|c| Condition::new(*c)).collect(),
        actions: vec![Action::new(action.0, action.1)],
        enabled: true,
        version: 1,
    }
}

/// Builds the bundled rule base.
pub fn visa_rule_base() -> RuleBase {
    use RuleKind::{Initial, Intermediate};

    RuleBase::from_rules(vec![
        // --- E-1/E-2 treaty trader/investor ---
        rule(
            1,
            "e1 trade test",
            "E",
            Intermediate,
            &["trade_is_substantial", "trade_is_principally_between_us_and_treaty_country"],
            ("e1_trade_test_met", true),
        ),
        rule(
            2,
            "e2 investment test",
            "E",
            Intermediate,
            &["investment_is_substantial", "investment_is_at_risk", "investment_is_not_marginal"],
            ("e2_investment_test_met", true),
        ),
        rule(
            3,
            "e requirements via trade",
            "E",
            Intermediate,
            &["e1_trade_test_met"],
            ("company_meets_e_requirements", true),
        ),
        rule(
            4,
            "e requirements via investment",
            "E",
            Intermediate,
            &["e2_investment_test_met"],
            ("company_meets_e_requirements", true),
        ),
        rule(
            5,
            "e visa eligible",
            "E",
            Initial,
            &[
                "shared_nationality",
                "company_nationality_matches_treaty",
                "company_meets_e_requirements",
                "applicant_holds_managerial_or_essential_skills_role",
                "applicant_intends_to_depart_when_status_ends",
            ],
            ("e_visa_ok", true),
        ),
        // --- L-1 blanket and individual petitions ---
        rule(
            6,
            "l employment history",
            "L",
            Intermediate,
            &["applicant_worked_abroad_one_continuous_year_in_three", "foreign_and_us_entities_have_qualifying_relationship"],
            ("applicant_meets_l_employment_history", true),
        ),
        rule(
            7,
            "l managerial capacity",
            "L",
            Intermediate,
            &["applicant_is_manager_or_executive_or_specialized_knowledge", "position_in_us_is_managerial_or_executive_or_specialized"],
            ("applicant_meets_l_capacity", true),
        ),
        rule(
            8,
            "blanket l eligible",
            "L",
            Initial,
            &["employer_has_approved_blanket_l_petition", "applicant_meets_l_employment_history", "applicant_meets_l_capacity"],
            ("blanket_l_visa_ok", true),
        ),
        rule(
            9,
            "individual l eligible",
            "L",
            Initial,
            &[
                "employer_filed_individual_l_petition",
                "applicant_meets_l_employment_history",
                "applicant_meets_l_capacity",
                "individual_petition_approved_by_uscis",
            ],
            ("individual_l_visa_ok", true),
        ),
        // --- H-1B specialty occupation ---
        rule(
            10,
            "h1b eligible",
            "H1B",
            Initial,
            &[
                "position_is_specialty_occupation",
                "applicant_holds_qualifying_degree_or_equivalent",
                "employer_filed_labor_condition_application",
                "h1b_cap_number_available_or_exempt",
            ],
            ("h1b_visa_ok", true),
        ),
        // --- B-1/B-2 visitor for business and its narrower variants ---
        rule(
            11,
            "b visa eligible",
            "B",
            Initial,
            &[
                "applicant_maintains_foreign_residence_abroad",
                "visit_purpose_is_legitimate_business_activity",
                "applicant_will_be_paid_by_foreign_employer",
                "trip_duration_is_temporary",
            ],
            ("b_visa_ok", true),
        ),
        rule(
            12,
            "b-1 in lieu of contract services",
            "B",
            Initial,
            &["b_visa_ok", "contract_specifies_foreign_employer_pays_salary", "services_are_not_locally_available"],
            ("b_contract_visa_ok", true),
        ),
        rule(
            13,
            "b-1 in lieu of h-1b",
            "B",
            Initial,
            &["b_visa_ok", "position_would_otherwise_qualify_for_h1b", "applicant_paid_solely_by_foreign_employer"],
            ("b1_in_lieu_of_h1b_ok", true),
        ),
        rule(
            14,
            "b-1 in lieu of h-3",
            "B",
            Initial,
            &["b_visa_ok", "applicant_is_receiving_training_from_us_entity", "training_not_available_in_applicants_home_country"],
            ("b1_in_lieu_of_h3_ok", true),
        ),
        // --- J-1 exchange visitor ---
        rule(
            15,
            "j1 eligible",
            "J1",
            Initial,
            &[
                "applicant_accepted_into_designated_exchange_program",
                "program_sponsor_is_designated_by_state_department",
                "applicant_has_sufficient_funds_or_sponsorship",
                "applicant_maintains_residence_abroad_for_j1",
            ],
            ("j1_visa_ok", true),
        ),
    ])
}

/// The default goal list and priority tiers (E and L above H-1B/J-1
/// above the B-visa family), matching the bundled rule base's tags.
pub fn visa_goals() -> Vec<GoalSpec> {
    vec![
        GoalSpec::new("e_visa_ok", PriorityTier::High),
        GoalSpec::new("blanket_l_visa_ok", PriorityTier::High),
        GoalSpec::new("individual_l_visa_ok", PriorityTier::High),
        GoalSpec::new("h1b_visa_ok", PriorityTier::Middle),
        GoalSpec::new("j1_visa_ok", PriorityTier::Middle),
        GoalSpec::new("b_visa_ok", PriorityTier::Low),
        GoalSpec::new("b_contract_visa_ok", PriorityTier::Low),
        GoalSpec::new("b1_in_lieu_of_h1b_ok", PriorityTier::Low),
        GoalSpec::new("b1_in_lieu_of_h3_ok", PriorityTier::Low),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::working_memory::WorkingMemory;
    use crate::{driver, evaluator};

    #[test]
    fn bundled_base_has_nine_goal_facts_all_derivable() {
        let base = visa_rule_base();
        for goal in visa_goals() {
            assert!(base.is_derivable(&goal.fact), "{} should be derivable", goal.fact);
        }
    }

    #[test]
    fn e_visa_fires_through_the_trade_branch() {
        let base = visa_rule_base();
        let mut wm = WorkingMemory::new();
        for fact in [
            "shared_nationality",
            "company_nationality_matches_treaty",
            "trade_is_substantial",
            "trade_is_principally_between_us_and_treaty_country",
            "applicant_holds_managerial_or_essential_skills_role",
            "applicant_intends_to_depart_when_status_ends",
        ] {
            wm.state.findings.insert(fact.to_string(), true);
        }
        evaluator::evaluate_to_fixpoint(&mut wm, &base);
        assert_eq!(wm.value_of("e_visa_ok"), Some(true));
    }

    #[test]
    fn individual_l_shares_the_blanket_l_capacity_rules() {
        let base = visa_rule_base();
        let mut wm = WorkingMemory::new();
        for fact in [
            "employer_filed_individual_l_petition",
            "applicant_worked_abroad_one_continuous_year_in_three",
            "foreign_and_us_entities_have_qualifying_relationship",
            "applicant_is_manager_or_executive_or_specialized_knowledge",
            "position_in_us_is_managerial_or_executive_or_specialized",
            "individual_petition_approved_by_uscis",
        ] {
            wm.state.findings.insert(fact.to_string(), true);
        }
        evaluator::evaluate_to_fixpoint(&mut wm, &base);
        assert_eq!(wm.value_of("individual_l_visa_ok"), Some(true));
        assert_eq!(wm.value_of("blanket_l_visa_ok"), None);
    }

    #[test]
    fn next_question_on_a_fresh_session_prefers_a_high_tier_goal() {
        let base = visa_rule_base();
        let goals = visa_goals();
        let wm = WorkingMemory::new();
        let question = driver::next_question(&base, &goals, &wm);
        assert!(question.is_some());
    }
}
