// Positions and relation rules.

use std::fmt;

/// Identifies one atomic rule occurrence in an expression.
///
/// Positions are 1-based and assigned left to right while parsing; the
/// endmarker appended after the whole expression always gets the last one.
pub type Position = u32;

/// Reserved input symbol of the endmarker rule.
pub const END_MARKER: char = '!';

/// A single `<input,output>` pair on one input character.
///
/// `input` is `None` for an atom written with an empty input tape (`<,>`).
/// Two rules compare equal when both tapes match; identity of an occurrence
/// is its [`Position`], never the rule value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub input: Option<char>,
    pub output: String,
}

impl Rule {
    pub fn new(input: Option<char>, output: impl Into<String>) -> Self {
        Self {
            input,
            output: output.into(),
        }
    }

    /// The rule appended after the whole expression to mark acceptance.
    pub fn end_marker() -> Self {
        Self {
            input: Some(END_MARKER),
            output: String::new(),
        }
    }

    /// True when the rule consumes nothing and emits nothing.
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.output.is_empty()
    }

    /// Check both tapes at once.
    pub fn matches(&self, input: char, output: &str) -> bool {
        self.input == Some(input) && self.output == output
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.input {
            Some(c) => write!(f, "<{c},{}>", self.output),
            None => write!(f, "<,{}>", self.output),
        }
    }
}
