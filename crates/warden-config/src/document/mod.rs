//! Section / subsection / key / multi-value configuration documents.
//!
//! A [`ConfigDocument`] is the in-memory form of the INI-like text stored on a
//! project's config reference:
//!
//! ```text
//! [project]
//! 	description = my fancy project
//! [access "refs/foo"]
//! 	abandon = group global:Registered-Users
//! 	abandon = deny group global:Registered-Users
//! ```
//!
//! Every level keeps first-seen order and a key keeps all of its values in
//! order; nothing is ever de-duplicated. Sections the engine does not
//! understand are carried through a load-modify-save cycle untouched.

mod parse;
mod write;

use indexmap::IndexMap;

use crate::errors::ConfigError;

type Entries = IndexMap<String, Vec<String>>;
type Subsections = IndexMap<Option<String>, Entries>;

/// Ordered, multi-valued configuration document.
#[derive(Debug, Clone, Default)]
pub struct ConfigDocument {
    sections: IndexMap<String, Subsections>,
}

// `IndexMap` equality ignores order; documents compare in order at every level.
impl PartialEq for ConfigDocument {
    fn eq(&self, other: &Self) -> bool {
        self.sections.len() == other.sections.len()
            && self.sections.iter().zip(&other.sections).all(
                |((a_name, a_subs), (b_name, b_subs))| {
                    a_name == b_name
                        && a_subs.len() == b_subs.len()
                        && a_subs.iter().zip(b_subs).all(
                            |((a_sub, a_entries), (b_sub, b_entries))| {
                                a_sub == b_sub && a_entries.iter().eq(b_entries.iter())
                            },
                        )
                },
            )
    }
}

impl Eq for ConfigDocument {}

impl ConfigDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse document text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        parse::parse_document(text)
    }

    /// Parse a UTF-8 encoded document.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::parse(text),
            Err(err) => {
                let line = bytes[..err.valid_up_to()]
                    .iter()
                    .filter(|b| **b == b'\n')
                    .count()
                    + 1;
                Err(ConfigError::malformed_document(line, "document is not valid UTF-8"))
            }
        }
    }

    /// Render the document as text.
    ///
    /// For any document produced by [`ConfigDocument::parse`] the output
    /// parses back to an equal document.
    pub fn to_text(&self) -> String {
        write::write_document(self)
    }

    /// Render the document as UTF-8 bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_text().into_bytes()
    }

    /// True when the document has no sections at all.
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section names in first-seen order.
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Named subsections of `section` in first-seen order.
    pub fn subsections(&self, section: &str) -> Vec<&str> {
        self.sections
            .get(section)
            .map(|subs| subs.keys().filter_map(|sub| sub.as_deref()).collect())
            .unwrap_or_default()
    }

    /// Keys present under `section`/`subsection` in first-seen order.
    pub fn keys(&self, section: &str, subsection: Option<&str>) -> Vec<&str> {
        self.entries_of(section, subsection)
            .map(|entries| entries.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// All values of `key`, in order. Empty when absent.
    pub fn values(&self, section: &str, subsection: Option<&str>, key: &str) -> &[String] {
        self.entries_of(section, subsection)
            .and_then(|entries| entries.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Last value of `key`, if any.
    pub fn value(&self, section: &str, subsection: Option<&str>, key: &str) -> Option<&str> {
        self.values(section, subsection, key)
            .last()
            .map(String::as_str)
    }

    /// Every `(key, value)` pair under `section`/`subsection`, grouped by key
    /// in first-seen key order.
    pub fn entries(&self, section: &str, subsection: Option<&str>) -> Vec<(&str, &str)> {
        self.entries_of(section, subsection)
            .map(|entries| {
                entries
                    .iter()
                    .flat_map(|(key, values)| {
                        values.iter().map(move |value| (key.as_str(), value.as_str()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Replace all values of `key`. An empty sequence removes the key.
    pub fn set_values<I, V>(&mut self, section: &str, subsection: Option<&str>, key: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        let values: Vec<String> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            self.unset(section, subsection, key);
            return;
        }
        self.entries_mut(section, subsection)
            .insert(key.to_string(), values);
    }

    /// Append one value to `key`, keeping existing values.
    pub fn add_value(
        &mut self,
        section: &str,
        subsection: Option<&str>,
        key: &str,
        value: impl Into<String>,
    ) {
        self.entries_mut(section, subsection)
            .entry(key.to_string())
            .or_default()
            .push(value.into());
    }

    /// Remove `key` and return its values. A subsection or section emptied by
    /// the removal is removed as well; headers that were already empty stay.
    pub fn unset(&mut self, section: &str, subsection: Option<&str>, key: &str) -> Vec<String> {
        let sub_key = subsection.map(str::to_string);
        let Some(subs) = self.sections.get_mut(section) else {
            return Vec::new();
        };
        let Some(entries) = subs.get_mut(&sub_key) else {
            return Vec::new();
        };
        let Some(removed) = entries.shift_remove(key) else {
            return Vec::new();
        };
        if entries.is_empty() {
            subs.shift_remove(&sub_key);
        }
        if subs.is_empty() {
            self.sections.shift_remove(section);
        }
        removed
    }

    /// Remove a whole subsection (or the bare section body for `None`).
    pub fn remove_subsection(&mut self, section: &str, subsection: Option<&str>) -> bool {
        let Some(subs) = self.sections.get_mut(section) else {
            return false;
        };
        let removed = subs.shift_remove(&subsection.map(str::to_string)).is_some();
        if subs.is_empty() {
            self.sections.shift_remove(section);
        }
        removed
    }

    /// Remove a section with all of its subsections.
    pub fn remove_section(&mut self, section: &str) -> bool {
        self.sections.shift_remove(section).is_some()
    }

    fn entries_of(&self, section: &str, subsection: Option<&str>) -> Option<&Entries> {
        self.sections
            .get(section)
            .and_then(|subs| subs.get(&subsection.map(str::to_string)))
    }

    fn entries_mut(&mut self, section: &str, subsection: Option<&str>) -> &mut Entries {
        self.sections
            .entry(section.to_string())
            .or_default()
            .entry(subsection.map(str::to_string))
            .or_default()
    }

    pub(crate) fn ensure_subsection(&mut self, section: &str, subsection: Option<&str>) {
        self.entries_mut(section, subsection);
    }

    pub(crate) fn iter_sections(&self) -> impl Iterator<Item = (&str, &Subsections)> {
        self.sections.iter().map(|(name, subs)| (name.as_str(), subs))
    }
}

/// True if `name` is usable as a section name.
pub fn is_valid_section_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
}

/// True if `name` is usable as a key name.
pub fn is_valid_key_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}
