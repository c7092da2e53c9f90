// Subsequential transducer: construction by longest-common-prefix factoring
// over configurations of the position automaton, and the query walk.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use hashbrown::HashMap;

use crate::automaton::{PositionAutomaton, StateId};
use crate::config::BuildConfig;
use crate::{CompileError, Stage, Transducer, Transduction};

/// Index of a state in a [`SubsequentialTransducer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SStateId(pub u32);

impl SStateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An automaton state paired with output that has been read but not yet
/// emitted.
///
/// The derived ordering (automaton state, then pending output) is the
/// canonical order of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    pub state: StateId,
    pub pending: String,
}

/// The single transition of an S-state on one symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub target: SStateId,
    /// Output emitted when taking the transition: the longest common prefix
    /// of everything reachable on this symbol.
    pub output: String,
}

/// A state of the subsequential transducer.
#[derive(Debug, Clone)]
pub struct SState {
    /// Canonical configuration this state stands for.
    configuration: Vec<Pair>,
    transitions: HashMap<char, Transition>,
    is_final: bool,
    /// Suffixes appended to the emitted output when input ends here.
    final_outputs: Vec<String>,
}

impl SState {
    pub fn configuration(&self) -> &[Pair] {
        &self.configuration
    }

    pub fn transition(&self, symbol: char) -> Option<&Transition> {
        self.transitions.get(&symbol)
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Transitions in ascending symbol order.
    pub fn transitions(&self) -> Vec<(char, &Transition)> {
        let mut transitions: Vec<_> = self.transitions.iter().map(|(&c, t)| (c, t)).collect();
        transitions.sort_unstable_by_key(|&(c, _)| c);
        transitions
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn final_outputs(&self) -> &[String] {
        &self.final_outputs
    }
}

/// Deterministic transducer with deferred output.
///
/// Every state has at most one transition per input symbol, so a query is a
/// single walk with no backtracking. The structure is immutable once built
/// and can be shared between threads.
#[derive(Debug, Clone)]
pub struct SubsequentialTransducer {
    states: Vec<SState>,
}

impl SubsequentialTransducer {
    /// Subsequentialize a position automaton.
    ///
    /// Worklist over configurations starting from `[(start, "")]`. For each
    /// input symbol the candidates `pending ++ edge output` are collected,
    /// their longest common prefix becomes the emitted output, and the
    /// stripped remainders form the target configuration. Configurations are
    /// canonicalized (sorted, duplicates removed) and deduplicated through a
    /// hash map.
    pub fn build(automaton: &PositionAutomaton, config: &BuildConfig) -> Result<Self, CompileError> {
        let mut builder = Builder {
            config,
            states: Vec::new(),
            index: HashMap::new(),
            queue: VecDeque::new(),
        };
        builder.intern(vec![Pair {
            state: automaton.start(),
            pending: String::new(),
        }])?;

        while let Some(id) = builder.queue.pop_front() {
            let configuration = std::mem::take(&mut builder.states[id.index()].configuration);

            let final_outputs: Vec<String> = configuration
                .iter()
                .filter(|pair| automaton.state(pair.state).is_final())
                .map(|pair| pair.pending.clone())
                .collect();
            if !final_outputs.is_empty() {
                let state = &mut builder.states[id.index()];
                state.is_final = true;
                state.final_outputs.extend(final_outputs);
            }

            let mut by_symbol: BTreeMap<char, Vec<&Pair>> = BTreeMap::new();
            for pair in &configuration {
                for symbol in automaton.state(pair.state).symbols() {
                    by_symbol.entry(symbol).or_default().push(pair);
                }
            }

            for (symbol, pairs) in by_symbol {
                let mut candidates: Vec<Pair> = Vec::new();
                for pair in pairs {
                    for edge in automaton.state(pair.state).edges(symbol) {
                        let mut pending = String::with_capacity(pair.pending.len() + edge.output.len());
                        pending.push_str(&pair.pending);
                        pending.push_str(&edge.output);
                        candidates.push(Pair {
                            state: edge.target,
                            pending,
                        });
                    }
                }

                let output =
                    longest_common_prefix(candidates.iter().map(|c| c.pending.as_str())).to_string();
                for candidate in &mut candidates {
                    candidate.pending.drain(..output.len());
                }
                candidates.sort_unstable();
                candidates.dedup();

                let target = builder.intern(candidates)?;
                builder.states[id.index()]
                    .transitions
                    .insert(symbol, Transition { target, output });
            }

            builder.states[id.index()].configuration = configuration;
        }

        log::debug!("subsequential transducer: {} states", builder.states.len());

        Ok(Self {
            states: builder.states,
        })
    }

    pub fn start(&self) -> SStateId {
        SStateId(0)
    }

    pub fn state(&self, id: SStateId) -> &SState {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (SStateId, &SState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (SStateId(i as u32), s))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Consume `input` from the start state.
    ///
    /// Returns the state reached and the output emitted on the way, or `None`
    /// as soon as a symbol has no transition.
    pub fn walk(&self, input: &str) -> Option<(SStateId, String)> {
        let mut id = self.start();
        let mut emitted = String::new();
        for symbol in input.chars() {
            let transition = self.state(id).transition(symbol)?;
            emitted.push_str(&transition.output);
            id = transition.target;
        }
        Some((id, emitted))
    }

    /// Transduce `input` into all of its outputs.
    ///
    /// Outputs follow the order of the final state's stored suffixes, which
    /// is the canonical order of its configuration.
    pub fn transduce(&self, input: &str) -> Transduction {
        let Some((id, emitted)) = self.walk(input) else {
            return Transduction::no_match();
        };
        let state = self.state(id);
        if !state.is_final {
            return Transduction::no_match();
        }
        Transduction::matched(
            state
                .final_outputs
                .iter()
                .map(|suffix| format!("{emitted}{suffix}"))
                .collect(),
        )
    }
}

impl Transducer for SubsequentialTransducer {
    fn transduce(&self, input: &str) -> Transduction {
        SubsequentialTransducer::transduce(self, input)
    }
}

impl fmt::Display for SubsequentialTransducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.states() {
            write!(f, "s{} [", id.0)?;
            for (i, pair) in state.configuration.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "(q{}, {:?})", pair.state.0, pair.pending)?;
            }
            f.write_str("]")?;
            if state.is_final {
                write!(f, " final {:?}", state.final_outputs)?;
            }
            writeln!(f)?;
            for (symbol, transition) in state.transitions() {
                writeln!(
                    f,
                    "    {symbol} -> s{} / {:?}",
                    transition.target.0, transition.output
                )?;
            }
        }
        Ok(())
    }
}

/// Longest common prefix of `strings`, compared character by character.
///
/// The prefix of an empty list is the empty string.
pub fn longest_common_prefix<'a>(strings: impl IntoIterator<Item = &'a str>) -> &'a str {
    let mut strings = strings.into_iter();
    let Some(first) = strings.next() else {
        return "";
    };
    let mut len = first.len();
    for s in strings {
        len = first[..len]
            .chars()
            .zip(s.chars())
            .take_while(|(a, b)| a == b)
            .map(|(a, _)| a.len_utf8())
            .sum();
        if len == 0 {
            break;
        }
    }
    &first[..len]
}

struct Builder<'a> {
    config: &'a BuildConfig,
    states: Vec<SState>,
    /// Canonical configuration to S-state.
    index: HashMap<Vec<Pair>, SStateId>,
    queue: VecDeque<SStateId>,
}

impl Builder<'_> {
    /// Return the S-state for a canonical configuration, creating and
    /// enqueueing it if new.
    fn intern(&mut self, configuration: Vec<Pair>) -> Result<SStateId, CompileError> {
        if let Some(&id) = self.index.get(&configuration) {
            return Ok(id);
        }
        if self.config.exceeded(self.states.len() + 1) {
            return Err(CompileError::TooManyStates {
                stage: Stage::Subsequential,
                limit: self.config.max_states.unwrap_or_default(),
            });
        }

        let id = SStateId(self.states.len() as u32);
        log::trace!("s-state s{} with {} pairs", id.0, configuration.len());

        self.index.insert(configuration.clone(), id);
        self.states.push(SState {
            configuration,
            transitions: HashMap::new(),
            is_final: false,
            final_outputs: Vec::new(),
        });
        self.queue.push_back(id);
        Ok(id)
    }
}
