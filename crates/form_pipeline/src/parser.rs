//! Field parser
//!
//! Turns OCR lines from a service-order form into a [`Record`]:
//! - `Key: Value` lines start a field (split on the first colon)
//! - lines without a colon continue the most recent field
//! - an identifier-looking line before any field becomes the ID field
//!
//! Values are then cleaned with the configured [`Corrections`].

use crate::config::{Correction, ParserConfig};
use crate::types::Record;
use tracing::{debug, warn};

/// Ordered table of OCR misreadings and their fixes
#[derive(Debug, Clone, Default)]
pub struct Corrections {
    entries: Vec<Correction>,
}

impl Corrections {
    pub fn new(entries: Vec<Correction>) -> Self {
        Self { entries }
    }

    /// Rewrite `value` with every correction
    ///
    /// The first pass applies the whole table once. Later passes repeat the
    /// corrections whose replacement does not contain their own pattern
    /// until nothing changes, so a removal that exposes a new misreading
    /// (`Dal...o`) is still fixed. A self-containing entry such as
    /// `Dat` -> `Date` is applied exactly once. The result is trimmed.
    pub fn apply(&self, value: &str) -> String {
        let mut current = self.apply_pass(value, true);
        let max_passes = self.entries.len() + 1;

        for _ in 0..max_passes {
            let next = self.apply_pass(&current, false);
            if next == current {
                return next.trim().to_string();
            }
            current = next;
        }

        warn!(value, "Corrections did not settle; table may contain a cycle");
        current.trim().to_string()
    }

    fn apply_pass(&self, value: &str, first: bool) -> String {
        self.entries
            .iter()
            .filter(|c| !c.from.is_empty())
            .filter(|c| first || !c.is_self_containing())
            .fold(value.to_string(), |acc, c| acc.replace(&c.from, &c.to))
    }
}

/// Line-oriented parser for key-value forms
#[derive(Debug, Clone)]
pub struct FieldParser {
    id_field: String,
    ignored_symbols: Vec<String>,
    corrections: Corrections,
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

impl FieldParser {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            id_field: config.id_field.clone(),
            ignored_symbols: config.ignored_symbols.clone(),
            corrections: Corrections::new(config.corrections.clone()),
        }
    }

    fn clean_line(&self, line: &str) -> String {
        let mut line = line.to_string();
        for symbol in self.ignored_symbols.iter().filter(|s| !s.is_empty()) {
            line = line.replace(symbol.as_str(), "");
        }
        line.trim().to_string()
    }

    /// Parse OCR output lines into a record
    ///
    /// Never fails; unrecognizable input gives an empty or partial record.
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> Record {
        let mut record = Record::new();
        let mut current: Option<String> = None;

        for raw in lines {
            let line = self.clean_line(raw.as_ref());
            if line.is_empty() {
                continue;
            }

            if let Some((key, value)) = split_field(&line) {
                record.insert(key, value);
                current = Some(key.to_string());
                continue;
            }

            if let Some(value) = current.as_deref().and_then(|key| record.get_mut(key)) {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(&line);
            } else if looks_like_identifier(&line) && !record.contains(&self.id_field) {
                debug!(id = %line, "Bare identifier line");
                record.insert(self.id_field.as_str(), line);
            }
        }

        record.map_values(|v| self.corrections.apply(v));
        record
    }

    /// Parse raw OCR text
    pub fn parse_text(&self, text: &str) -> Record {
        let lines: Vec<&str> = text.lines().collect();
        self.parse(&lines)
    }
}

/// Split on the first colon; lines with an empty key are not fields
fn split_field(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// A line carrying only an ID, date or number
///
/// Either no letters at all (`01/01/24`, `4711`) or a single token that
/// contains a digit (`SO-1234`).
fn looks_like_identifier(line: &str) -> bool {
    let no_letters = !line.chars().any(char::is_alphabetic);
    let single_token = !line.chars().any(char::is_whitespace);
    let has_digit = line.chars().any(|c| c.is_ascii_digit());
    no_letters || (single_token && has_digit)
}
