//! Diagnostics for damaged lines in stored payloads.
//!
//! A payload read back from the store is decoded line by line. A line that
//! cannot be turned into a record is skipped and described by a [`Warning`];
//! the caller decides whether what survived is still usable.
//!
//! # Examples
//!
//! ```
//! use trellis_store::warning::{Damage, Warning};
//!
//! let warning = Warning::new(5, Damage::NotARecord("EOF while parsing".to_string()));
//! assert_eq!(warning.kind(), "not_a_record");
//! assert_eq!(warning.to_string(), "line 5: not a record: EOF while parsing");
//! ```

use std::fmt;

/// What was wrong with a skipped line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Damage {
    /// The line is not valid UTF-8 (typically a torn or binary write).
    NotUtf8,

    /// The line is text but does not deserialize as a record; carries the
    /// parser's message.
    NotARecord(String),
}

/// A skipped line and the reason it was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// 1-based physical line number in the payload
    pub line_number: usize,

    /// Why the line was skipped
    pub damage: Damage,
}

impl Warning {
    /// Describe a skipped line.
    #[must_use]
    pub fn new(line_number: usize, damage: Damage) -> Self {
        Self {
            line_number,
            damage,
        }
    }

    /// Stable identifier of the damage, for structured log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.damage {
            Damage::NotUtf8 => "not_utf8",
            Damage::NotARecord(_) => "not_a_record",
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.damage {
            Damage::NotUtf8 => write!(f, "line {}: not valid UTF-8", self.line_number),
            Damage::NotARecord(reason) => {
                write!(f, "line {}: not a record: {reason}", self.line_number)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_line_and_damage() {
        assert_eq!(
            Warning::new(42, Damage::NotUtf8).to_string(),
            "line 42: not valid UTF-8"
        );
        assert_eq!(
            Warning::new(3, Damage::NotARecord("missing field `hash`".to_string())).to_string(),
            "line 3: not a record: missing field `hash`"
        );
    }

    #[test]
    fn kind_is_stable_per_damage() {
        assert_eq!(Warning::new(1, Damage::NotUtf8).kind(), "not_utf8");
        assert_eq!(
            Warning::new(1, Damage::NotARecord(String::new())).kind(),
            "not_a_record"
        );
    }
}
