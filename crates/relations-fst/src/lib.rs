//! Regular-relation compiler.
//!
//! This crate turns a regular-relation expression such as
//! `<abc,xyz>+<acc,qwe>` into a subsequential transducer: a deterministic
//! machine with at most one transition per symbol per state, which defers
//! ambiguous output until it can be decided.
//!
//! # Architecture
//!
//! - [`metadata`] -- Expression parser computing nullable/first/last/follow
//! - [`automaton`] -- Position automaton whose states are position sets
//! - [`subsequential`] -- Output-deferred deterministic transducer and queries
//! - [`config`] -- Construction limits
//!
//! ```
//! let sfst = relations_fst::compile("<abc,xyz>+<acc,qwe>").unwrap();
//! let result = relations_fst::Transducer::transduce(&sfst, "acc");
//! assert!(result.matched);
//! assert_eq!(result.outputs, ["qwe"]);
//! ```

use std::fmt;
use std::io::Read;

pub mod automaton;
pub mod config;
pub mod metadata;
pub mod subsequential;

pub use automaton::PositionAutomaton;
pub use config::BuildConfig;
pub use metadata::Metadata;
pub use relations_core::{ParseError, Position, PositionSet, Rule};
pub use subsequential::SubsequentialTransducer;

/// Construction stage, reported when a state limit is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Automaton,
    Subsequential,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Automaton => "position automaton",
            Stage::Subsequential => "subsequential transducer",
        })
    }
}

/// Error type for compiling an expression.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to read expression: {0}")]
    Io(#[from] std::io::Error),
    #[error("{stage} exceeded the limit of {limit} states")]
    TooManyStates { stage: Stage, limit: usize },
}

/// Result of running an input string through a transducer.
///
/// `outputs` is empty whenever `matched` is false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transduction {
    pub outputs: Vec<String>,
    pub matched: bool,
}

impl Transduction {
    /// The input is outside the domain of the relation.
    pub fn no_match() -> Self {
        Self::default()
    }

    pub fn matched(outputs: Vec<String>) -> Self {
        Self {
            outputs,
            matched: true,
        }
    }
}

/// Query interface shared by the position automaton and the subsequential
/// transducer built from it.
///
/// Both answer the same question; the automaton explores every path in
/// parallel while the subsequential transducer follows a single one.
pub trait Transducer {
    /// Transduce `input` into every output the relation pairs it with.
    fn transduce(&self, input: &str) -> Transduction;
}

/// Compile an expression with the default (unbounded) configuration.
pub fn compile(source: &str) -> Result<SubsequentialTransducer, CompileError> {
    compile_with(source, &BuildConfig::default())
}

/// Compile an expression: parse, build the position automaton, then
/// subsequentialize it.
pub fn compile_with(
    source: &str,
    config: &BuildConfig,
) -> Result<SubsequentialTransducer, CompileError> {
    let meta = Metadata::parse(source)?;
    let automaton = PositionAutomaton::build(&meta, config)?;
    SubsequentialTransducer::build(&automaton, config)
}

/// Read a whole expression from `reader` and compile it.
pub fn compile_reader(
    mut reader: impl Read,
    config: &BuildConfig,
) -> Result<SubsequentialTransducer, CompileError> {
    let mut source = String::new();
    reader.read_to_string(&mut source)?;
    compile_with(&source, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_and_transduce() {
        let sfst = compile("<abc,xyz>+<acc,qwe>").unwrap();
        assert_eq!(
            sfst.transduce("abc"),
            Transduction::matched(vec!["xyz".to_string()])
        );
        assert_eq!(
            sfst.transduce("acc"),
            Transduction::matched(vec!["qwe".to_string()])
        );
        assert_eq!(sfst.transduce("abx"), Transduction::no_match());
    }

    #[test]
    fn compile_reports_parse_errors() {
        let err = compile("<abc,xyz").unwrap_err();
        assert!(matches!(
            err,
            CompileError::Parse(ParseError::UnterminatedAtom { .. })
        ));
    }

    #[test]
    fn compile_from_reader() {
        let source = std::io::Cursor::new("<a,b>+<a,c>");
        let sfst = compile_reader(source, &BuildConfig::default()).unwrap();
        assert_eq!(sfst.transduce("a").outputs, ["b", "c"]);
    }

    #[test]
    fn reader_errors_surface_as_io() {
        let invalid_utf8: &[u8] = &[b'<', 0xFF, b',', b'>'];
        let err = compile_reader(invalid_utf8, &BuildConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::Io(_)));
    }

    #[test]
    fn state_limit_is_enforced() {
        let config = BuildConfig::new().with_max_states(2);
        let err = compile_with("<abcdef,x>", &config).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TooManyStates {
                stage: Stage::Automaton,
                limit: 2
            }
        ));
        assert_eq!(
            err.to_string(),
            "position automaton exceeded the limit of 2 states"
        );
    }

    #[test]
    fn compiled_transducer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SubsequentialTransducer>();
        assert_send_sync::<PositionAutomaton>();
    }
}
