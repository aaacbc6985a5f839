//! Text writer for configuration documents.

use std::fmt::Write as _;

use super::ConfigDocument;

pub(super) fn write_document(doc: &ConfigDocument) -> String {
    let mut out = String::new();
    for (section, subsections) in doc.iter_sections() {
        for (subsection, entries) in subsections {
            match subsection {
                Some(sub) => {
                    let _ = writeln!(out, "[{section} \"{}\"]", escape_subsection(sub));
                }
                None => {
                    let _ = writeln!(out, "[{section}]");
                }
            }
            for (key, values) in entries {
                for value in values {
                    if value.is_empty() {
                        let _ = writeln!(out, "\t{key} =");
                    } else {
                        let _ = writeln!(out, "\t{key} = {}", escape_value(value));
                    }
                }
            }
        }
    }
    out
}

fn escape_subsection(sub: &str) -> String {
    let mut out = String::with_capacity(sub.len());
    for c in sub.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn needs_quotes(value: &str) -> bool {
    value.starts_with(' ')
        || value.ends_with(' ')
        || value
            .chars()
            .any(|c| c == '#' || c == ';' || (c.is_control() && !matches!(c, '\n' | '\t' | '\u{8}')))
}

fn escape_value(value: &str) -> String {
    let quote = needs_quotes(value);
    let mut out = String::with_capacity(value.len() + 2);
    if quote {
        out.push('"');
    }
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            c => out.push(c),
        }
    }
    if quote {
        out.push('"');
    }
    out
}
