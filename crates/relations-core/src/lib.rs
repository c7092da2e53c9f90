//! Shared types for the regular-relation transducer compiler.
//!
//! - [`set`] -- Position sets with a stable bucketing hash
//! - [`rule`] -- Positions and `<input,output>` rules
//! - [`error`] -- Parse errors reported by the expression parser

pub mod error;
pub mod rule;
pub mod set;

pub use error::ParseError;
pub use rule::{END_MARKER, Position, Rule};
pub use set::PositionSet;
