//! Property-Based Tests for the Configuration Document Model
//!
//! ## Properties Verified
//!
//! - Serialization round-trips: parse(to_text(d)) = d
//! - Serialization is canonical: to_text(parse(to_text(d))) = to_text(d)
//! - Rule entries round-trip through their stored form
//! - Rebuilding an unedited configuration leaves the document unchanged,
//!   down to the spacing of hand-written rule values

use warden_config::{permission::rules_from_document, ConfigDocument, PermissionRule, ProjectConfig};
use warden_testkit::project_name;
use warden_testkit::strategies::{arb_document, arb_rule, arb_rules_document, arb_value};
use proptest::prelude::*;

// ============================================================================
// Document Round-Trip Properties
// ============================================================================

proptest! {
    /// Property: parsing the serialized form restores the document
    #[test]
    fn prop_document_round_trips(doc in arb_document()) {
        let text = doc.to_text();
        let parsed = ConfigDocument::parse(&text).unwrap();
        prop_assert_eq!(&parsed, &doc, "text was:\n{}", text);
    }

    /// Property: re-serializing a parsed document is byte-identical
    #[test]
    fn prop_serialization_is_canonical(doc in arb_document()) {
        let bytes = doc.to_bytes();
        let reparsed = ConfigDocument::from_bytes(&bytes).unwrap();
        prop_assert_eq!(reparsed.to_bytes(), bytes);
    }

    /// Property: any value survives a single-entry document
    #[test]
    fn prop_value_survives(value in arb_value()) {
        let mut doc = ConfigDocument::new();
        doc.add_value("plugin", Some("x"), "setting", value.clone());
        let parsed = ConfigDocument::parse(&doc.to_text()).unwrap();
        prop_assert_eq!(parsed.value("plugin", Some("x"), "setting"), Some(value.as_str()));
    }
}

// ============================================================================
// Permission Rule Properties
// ============================================================================

proptest! {
    /// Property: a rule's stored entry parses back to the same rule
    #[test]
    fn prop_rule_entry_round_trips(rule in arb_rule()) {
        let (subsection, key, value) = rule.to_entry();
        let parsed = PermissionRule::from_entry(subsection, key, &value).unwrap();
        prop_assert_eq!(parsed, rule);
    }

    /// Property: rules appended to a document are read back as the same multiset
    #[test]
    fn prop_rules_read_back((rules, doc) in arb_rules_document()) {
        let text = doc.to_text();
        let reparsed = ConfigDocument::parse(&text).unwrap();
        let mut read: Vec<String> = rules_from_document(&reparsed)
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect();
        let mut written: Vec<String> = rules.iter().map(ToString::to_string).collect();
        read.sort();
        written.sort();
        prop_assert_eq!(read, written);
    }

    /// Property: an unedited configuration rebuilds its own document
    #[test]
    fn prop_unedited_config_is_stable((_rules, doc) in arb_rules_document()) {
        let config = ProjectConfig::from_document(project_name("p"), None, doc.clone()).unwrap();
        prop_assert_eq!(config.to_document().to_text(), doc.to_text());
    }

    /// Property: an unedited configuration keeps hand-written text, including
    /// empty headers, empty descriptions and irregular spacing in rule values
    #[test]
    fn prop_unedited_config_keeps_stored_text(
        header in prop_oneof![
            Just(""),
            Just("[project]\n"),
            Just("[project]\n\tdescription =\n"),
            Just("[project]\n\tdescription = d\n"),
        ],
        rules in prop::collection::vec((arb_rule(), 1..4usize), 0..8),
    ) {
        let mut text = header.to_string();
        for (rule, spacing) in &rules {
            let (ref_pattern, action, value) = rule.to_entry();
            let value: Vec<&str> = value.split_whitespace().collect();
            text.push_str(&format!(
                "[access \"{ref_pattern}\"]\n\t{action} = {}\n",
                value.join(&" ".repeat(*spacing))
            ));
        }
        let doc = ConfigDocument::parse(&text).unwrap();
        let config = ProjectConfig::from_document(project_name("p"), None, doc.clone()).unwrap();
        prop_assert_eq!(config.to_document().to_text(), doc.to_text());
    }
}
