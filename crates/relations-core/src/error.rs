// Parse errors for regular-relation expressions.

/// A hard failure while parsing an expression.
///
/// Offsets count characters (not bytes) from the start of the source.
/// Parsing is all-or-nothing: no metadata is produced alongside an error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unterminated atom starting at offset {start}: expected `{expected}` before end of input")]
    UnterminatedAtom { start: usize, expected: char },
    #[error("atom starting at offset {start} closes before its `,` separator")]
    MissingSeparator { start: usize },
    #[error("unmatched `)` at offset {offset}")]
    UnmatchedClose { offset: usize },
    #[error("unclosed `(` at offset {offset}")]
    UnclosedOpen { offset: usize },
    #[error("operator `{operator}` at offset {offset} is missing an operand")]
    MissingOperand { operator: char, offset: usize },
    #[error("expected an operator between operands before offset {offset}")]
    MissingOperator { offset: usize },
    #[error("unexpected character {found:?} at offset {offset}")]
    UnexpectedChar { found: char, offset: usize },
    #[error("empty expression")]
    Empty,
}
