// Construction configuration shared by the automaton and subsequential builders.

/// Options for compiling an expression.
///
/// The default configuration is unbounded: every reachable state is built.
/// Setting [`max_states`](Self::max_states) turns a runaway construction
/// (for example a relation that is not subsequential, whose pending outputs
/// grow without bound) into a [`CompileError::TooManyStates`] instead of
/// exhausting memory.
///
/// [`CompileError::TooManyStates`]: crate::CompileError::TooManyStates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Maximum number of states per construction stage.
    pub max_states: Option<usize>,
}

impl BuildConfig {
    /// Create an unbounded configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit each construction stage to at most `limit` states.
    pub fn with_max_states(mut self, limit: usize) -> Self {
        self.max_states = Some(limit);
        self
    }

    /// Whether a stage holding `count` states has gone past the limit.
    #[inline]
    pub(crate) fn exceeded(&self, count: usize) -> bool {
        self.max_states.is_some_and(|limit| count > limit)
    }
}
