//! Text parser for configuration documents.

use std::iter::Peekable;
use std::str::Chars;

use super::{is_valid_key_name, is_valid_section_name, ConfigDocument};
use crate::errors::ConfigError;

pub(super) fn parse_document(text: &str) -> Result<ConfigDocument, ConfigError> {
    Parser::new(text).run()
}

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    line: usize,
    doc: ConfigDocument,
    current: Option<(String, Option<String>)>,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars().peekable(),
            line: 1,
            doc: ConfigDocument::new(),
            current: None,
        }
    }

    fn run(mut self) -> Result<ConfigDocument, ConfigError> {
        loop {
            self.skip_blank();
            match self.chars.peek().copied() {
                None => return Ok(self.doc),
                Some('#' | ';') => self.skip_line(),
                Some('[') => {
                    self.chars.next();
                    self.header()?;
                }
                Some(_) => self.entry()?,
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::malformed_document(self.line, message)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_blank(&mut self) {
        while let Some(c) = self.chars.peek().copied() {
            if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn skip_inline_space(&mut self) {
        while matches!(self.chars.peek(), Some(' ' | '\t')) {
            self.chars.next();
        }
    }

    fn skip_line(&mut self) {
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Consume the rest of a line that may only hold whitespace or a comment.
    fn finish_line(&mut self, what: &str) -> Result<(), ConfigError> {
        self.skip_inline_space();
        match self.chars.peek().copied() {
            None => Ok(()),
            Some('\n') => {
                self.bump();
                Ok(())
            }
            Some('\r') => {
                self.chars.next();
                match self.bump() {
                    None | Some('\n') => Ok(()),
                    Some(_) => Err(self.error(format!("stray carriage return after {what}"))),
                }
            }
            Some('#' | ';') => {
                self.skip_line();
                Ok(())
            }
            Some(c) => Err(self.error(format!("unexpected {c:?} after {what}"))),
        }
    }

    fn header(&mut self) -> Result<(), ConfigError> {
        let mut name = String::new();
        while let Some(c) = self.chars.peek().copied() {
            if c == ']' || c == ' ' || c == '\t' || c == '\n' {
                break;
            }
            name.push(c);
            self.chars.next();
        }
        if !is_valid_section_name(&name) {
            return Err(self.error(format!("invalid section name {name:?}")));
        }

        self.skip_inline_space();
        let subsection = match self.chars.next() {
            Some(']') => None,
            Some('"') => {
                let sub = self.quoted_subsection()?;
                if self.chars.next() != Some(']') {
                    return Err(self.error("expected ']' after subsection name"));
                }
                Some(sub)
            }
            _ => return Err(self.error(format!("malformed header for section {name:?}"))),
        };

        self.doc.ensure_subsection(&name, subsection.as_deref());
        self.current = Some((name, subsection));
        self.finish_line("section header")
    }

    fn quoted_subsection(&mut self) -> Result<String, ConfigError> {
        let mut sub = String::new();
        loop {
            match self.chars.next() {
                None | Some('\n') => return Err(self.error("unterminated subsection name")),
                Some('"') => return Ok(sub),
                Some('\\') => match self.chars.next() {
                    Some(c @ ('\\' | '"')) => sub.push(c),
                    Some(c) => {
                        return Err(self.error(format!("unknown escape \\{c} in subsection name")))
                    }
                    None => return Err(self.error("unterminated subsection name")),
                },
                Some(c) => sub.push(c),
            }
        }
    }

    fn entry(&mut self) -> Result<(), ConfigError> {
        let Some((section, subsection)) = self.current.clone() else {
            return Err(self.error("key outside of a section"));
        };

        let mut key = String::new();
        while let Some(c) = self.chars.peek().copied() {
            if c.is_ascii_alphanumeric() || c == '-' {
                key.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if !is_valid_key_name(&key) {
            let found = self.chars.peek().copied();
            return Err(self.error(match found {
                Some(c) if key.is_empty() => format!("unexpected {c:?} where a key was expected"),
                _ => format!("invalid key name {key:?}"),
            }));
        }

        self.skip_inline_space();
        let value = match self.chars.peek().copied() {
            Some('=') => {
                self.chars.next();
                self.value()?
            }
            None | Some('\n' | '\r' | '#' | ';') => {
                self.finish_line("key")?;
                String::new()
            }
            Some(c) => return Err(self.error(format!("expected '=' after key {key:?}, found {c:?}"))),
        };

        self.doc.add_value(&section, subsection.as_deref(), &key, value);
        Ok(())
    }

    fn value(&mut self) -> Result<String, ConfigError> {
        self.skip_inline_space();
        let mut value = String::new();
        // Length of `value` up to the last character that is not trailing
        // unquoted whitespace.
        let mut kept = 0;
        let mut quoted = false;

        loop {
            let Some(c) = self.chars.next() else {
                if quoted {
                    return Err(self.error("unterminated quoted value"));
                }
                break;
            };
            match c {
                '\n' => {
                    if quoted {
                        return Err(self.error("newline inside quoted value"));
                    }
                    self.line += 1;
                    break;
                }
                '\r' if !quoted && self.chars.peek() == Some(&'\n') => {
                    self.bump();
                    break;
                }
                '"' => quoted = !quoted,
                '#' | ';' if !quoted => {
                    self.skip_line();
                    break;
                }
                '\\' => {
                    let escaped = match self.chars.next() {
                        Some('\n') => {
                            self.line += 1;
                            continue;
                        }
                        Some('\r') if self.chars.peek() == Some(&'\n') => {
                            self.bump();
                            continue;
                        }
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('b') => '\u{8}',
                        Some(c @ ('\\' | '"')) => c,
                        Some(c) => return Err(self.error(format!("unknown escape \\{c} in value"))),
                        None => return Err(self.error("dangling escape at end of input")),
                    };
                    value.push(escaped);
                    kept = value.len();
                }
                ' ' | '\t' if !quoted => value.push(c),
                c => {
                    value.push(c);
                    kept = value.len();
                }
            }
        }

        value.truncate(kept);
        Ok(value)
    }
}
