//! Property test strategies for Warden types
//!
//! Documents are generated through the public mutation API, so every
//! generated document is one the engine could have produced itself.

use proptest::prelude::*;

// Re-export proptest for convenience
pub use proptest;

use warden_config::{
    actions, ConfigDocument, GroupReference, PermissionKind, PermissionRule, ProjectName,
};

use crate::fixtures::rule;

/// Section names: alphanumerics, `-` and `.`
pub fn arb_section_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.-]{0,8}"
}

/// Key names: a letter followed by alphanumerics and `-`
pub fn arb_key_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9-]{0,10}"
}

/// Subsection names, including characters that need escaping
pub fn arb_subsection_name() -> impl Strategy<Value = String> {
    "[ -~]{0,16}"
}

/// Values, including whitespace, comment characters, quotes and newlines
pub fn arb_value() -> impl Strategy<Value = String> {
    "[ -~\t\n]{0,24}"
}

/// Valid project names such as `team/app-3`
pub fn arb_project_name() -> impl Strategy<Value = ProjectName> {
    prop::collection::vec("[a-z][a-z0-9_-]{0,7}", 1..4)
        .prop_map(|parts| ProjectName::new(parts.join("/")).unwrap())
}

/// Group references, mixing well-known and arbitrary ids
pub fn arb_group() -> impl Strategy<Value = GroupReference> {
    prop_oneof![
        Just(GroupReference::registered_users()),
        Just(GroupReference::project_owners()),
        Just(GroupReference::anonymous_users()),
        "[a-z][a-z0-9:-]{0,12}".prop_map(GroupReference::new),
    ]
}

/// Well-known access actions
pub fn arb_action() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        actions::ABANDON,
        actions::CREATE,
        actions::DELETE,
        actions::FORGE_AUTHOR,
        actions::OWNER,
        actions::PUSH,
        actions::READ,
        actions::SUBMIT,
    ])
}

/// Reference patterns
pub fn arb_ref_pattern() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("refs/*".to_string()),
        Just("refs/heads/*".to_string()),
        "refs/[a-z]{1,6}(/[a-z*]{1,6}){0,2}",
    ]
}

/// Valid permission rules of every kind, with and without force
pub fn arb_rule() -> impl Strategy<Value = PermissionRule> {
    (
        prop_oneof![
            Just(PermissionKind::Allow),
            Just(PermissionKind::Deny),
            Just(PermissionKind::Block),
        ],
        arb_action(),
        arb_ref_pattern(),
        arb_group(),
        any::<bool>(),
    )
        .prop_map(|(kind, action, ref_pattern, group, force)| {
            let base = rule(kind, action, &ref_pattern, group);
            if force && base.is_allow() {
                PermissionRule::allow(action)
                    .ref_pattern(ref_pattern)
                    .group(base.group().clone())
                    .force(true)
                    .build()
                    .unwrap()
            } else {
                base
            }
        })
}

/// Arbitrary documents built entry by entry
pub fn arb_document() -> impl Strategy<Value = ConfigDocument> {
    prop::collection::vec(
        (
            arb_section_name(),
            prop::option::of(arb_subsection_name()),
            arb_key_name(),
            arb_value(),
        ),
        0..24,
    )
    .prop_map(|entries| {
        let mut doc = ConfigDocument::new();
        for (section, subsection, key, value) in entries {
            doc.add_value(&section, subsection.as_deref(), &key, value);
        }
        doc
    })
}

/// Documents holding only access rules
pub fn arb_rules_document() -> impl Strategy<Value = (Vec<PermissionRule>, ConfigDocument)> {
    prop::collection::vec(arb_rule(), 0..12).prop_map(|rules| {
        let mut doc = ConfigDocument::new();
        for rule in &rules {
            rule.append_to(&mut doc);
        }
        (rules, doc)
    })
}
