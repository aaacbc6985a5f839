//! Property-Based Tests for Update Transactions
//!
//! ## Properties Verified
//!
//! - Every queued rule is present after commit (duplicates included)
//! - A transaction with no edits never writes a revision

use warden_config::PermissionRule;
use warden_project::UpdateOutcome;
use warden_testkit::memory_operations;
use warden_testkit::strategies::arb_rule;
use proptest::prelude::*;

fn sorted(rules: &[PermissionRule]) -> Vec<String> {
    let mut out: Vec<String> = rules.iter().map(ToString::to_string).collect();
    out.sort();
    out
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: committed rules are read back as the same multiset
    #[test]
    fn prop_committed_rules_are_stored(rules in prop::collection::vec(arb_rule(), 1..10)) {
        let ops = memory_operations();
        let name = ops.new_project().create().unwrap();

        let update = rules
            .iter()
            .cloned()
            .fold(ops.project(&name).for_update().unwrap(), |update, rule| update.add(rule));
        let outcome = update.update().unwrap();
        prop_assert!(matches!(outcome, UpdateOutcome::Committed(_)));

        let stored = ops.project(&name).project_config().unwrap();
        prop_assert_eq!(sorted(stored.permissions()), sorted(&rules));
    }

    /// Property: an empty transaction is a no-op regardless of prior content
    #[test]
    fn prop_empty_update_is_noop(rules in prop::collection::vec(arb_rule(), 0..6)) {
        let ops = memory_operations();
        let name = ops.new_project().create().unwrap();
        if !rules.is_empty() {
            rules
                .iter()
                .cloned()
                .fold(ops.project(&name).for_update().unwrap(), |update, rule| update.add(rule))
                .update()
                .unwrap();
        }
        let history = ops.project(&name).history().unwrap();

        let outcome = ops.project(&name).for_update().unwrap().update().unwrap();
        prop_assert_eq!(outcome, UpdateOutcome::Unchanged);
        prop_assert_eq!(ops.project(&name).history().unwrap(), history);
    }
}
