// Position automaton: the non-deterministic intermediate transducer whose
// states are sets of positions.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use hashbrown::HashMap;
use hashbrown::hash_map::Entry;
use relations_core::{PositionSet, Rule};

use crate::config::BuildConfig;
use crate::metadata::Metadata;
use crate::{CompileError, Stage, Transducer, Transduction};

/// Index of a state in a [`PositionAutomaton`].
///
/// Ids follow discovery order, so they are stable for a given expression
/// but carry no meaning of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StateId(pub u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One outgoing transition: consuming the symbol emits `output` and moves to
/// `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub target: StateId,
    pub output: String,
}

/// A position-automaton state.
#[derive(Debug, Clone)]
pub struct State {
    positions: PositionSet,
    is_final: bool,
    /// Per input symbol, edges in discovery order. Rules sharing a symbol
    /// but not an output each keep their own edge.
    transitions: BTreeMap<char, Vec<Edge>>,
}

impl State {
    pub fn positions(&self) -> &PositionSet {
        &self.positions
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Edges leaving on `symbol` (empty if there are none).
    pub fn edges(&self, symbol: char) -> &[Edge] {
        self.transitions
            .get(&symbol)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Symbols with at least one edge, in ascending order.
    pub fn symbols(&self) -> impl Iterator<Item = char> + '_ {
        self.transitions.keys().copied()
    }

    /// All edges grouped by symbol, in ascending symbol order.
    pub fn transitions(&self) -> impl Iterator<Item = (char, &[Edge])> + '_ {
        self.transitions.iter().map(|(&c, e)| (c, e.as_slice()))
    }
}

/// Transducer whose states are the position sets reachable from the root
/// first set.
#[derive(Debug, Clone)]
pub struct PositionAutomaton {
    states: Vec<State>,
}

impl PositionAutomaton {
    /// Build the automaton by worklist discovery from `meta.root_first()`.
    ///
    /// For every state, positions are grouped by their rule value; each group
    /// with a non-empty union of followers yields one edge to the state for
    /// that union. Rules with an empty input tape never yield an edge.
    pub fn build(meta: &Metadata, config: &BuildConfig) -> Result<Self, CompileError> {
        let mut builder = Builder {
            meta,
            config,
            states: Vec::new(),
            index: HashMap::new(),
            queue: VecDeque::new(),
        };
        builder.intern(meta.root_first().clone())?;

        while let Some(id) = builder.queue.pop_front() {
            let positions = builder.states[id.index()].positions.clone();

            // Group by rule value in order of first appearance.
            let mut groups: Vec<(&Rule, PositionSet)> = Vec::new();
            let mut group_of: HashMap<&Rule, usize> = HashMap::new();
            for p in positions.iter() {
                let Some(rule) = meta.rule(p) else { continue };
                if rule.input.is_none() {
                    continue;
                }
                match group_of.entry(rule) {
                    Entry::Occupied(e) => {
                        let group = &mut groups[*e.get()].1;
                        *group = group.union(meta.follow(p));
                    }
                    Entry::Vacant(e) => {
                        e.insert(groups.len());
                        let follow = meta.follow(p).cloned().unwrap_or_default();
                        groups.push((rule, follow));
                    }
                }
            }

            for (rule, follow) in groups {
                let Some(symbol) = rule.input else { continue };
                if follow.is_empty() {
                    continue;
                }
                let target = builder.intern(follow)?;
                builder.states[id.index()]
                    .transitions
                    .entry(symbol)
                    .or_default()
                    .push(Edge {
                        target,
                        output: rule.output.clone(),
                    });
            }
        }

        log::debug!("position automaton: {} states", builder.states.len());

        Ok(Self {
            states: builder.states,
        })
    }

    /// The state built from the root first set.
    pub fn start(&self) -> StateId {
        StateId(0)
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id.index()]
    }

    pub fn states(&self) -> impl Iterator<Item = (StateId, &State)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateId(i as u32), s))
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// Look up the state for a position set.
    pub fn find(&self, positions: &PositionSet) -> Option<StateId> {
        self.states
            .iter()
            .position(|s| s.positions.equal(positions))
            .map(|i| StateId(i as u32))
    }

    /// Follow the first edge on each symbol of `input`.
    ///
    /// Handy for inspecting a path when every symbol has a single edge.
    pub fn walk(&self, input: &str) -> Option<StateId> {
        input.chars().try_fold(self.start(), |id, c| {
            self.state(id).edges(c).first().map(|e| e.target)
        })
    }
}

impl Transducer for PositionAutomaton {
    /// Simulate every path at once, tracking `(state, output so far)` pairs.
    fn transduce(&self, input: &str) -> Transduction {
        let mut current = vec![(self.start(), String::new())];

        for c in input.chars() {
            let mut next = Vec::new();
            for (id, output) in &current {
                for edge in self.state(*id).edges(c) {
                    next.push((edge.target, format!("{output}{}", edge.output)));
                }
            }
            if next.is_empty() {
                return Transduction::no_match();
            }
            next.sort();
            next.dedup();
            current = next;
        }

        let outputs: Vec<String> = current
            .into_iter()
            .filter(|(id, _)| self.state(*id).is_final)
            .map(|(_, output)| output)
            .collect();
        if outputs.is_empty() {
            Transduction::no_match()
        } else {
            Transduction::matched(outputs)
        }
    }
}

impl fmt::Display for PositionAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, state) in self.states() {
            write!(f, "q{} {}", id.0, state.positions)?;
            if state.is_final {
                write!(f, " final")?;
            }
            writeln!(f)?;
            for (symbol, edges) in state.transitions() {
                for edge in edges {
                    writeln!(f, "    {symbol} -> q{} / {:?}", edge.target.0, edge.output)?;
                }
            }
        }
        Ok(())
    }
}

struct Builder<'a> {
    meta: &'a Metadata,
    config: &'a BuildConfig,
    states: Vec<State>,
    /// Position set to state. Hashing buckets by the set's rolling hash and
    /// confirms hits with set equality.
    index: HashMap<PositionSet, StateId>,
    queue: VecDeque<StateId>,
}

impl Builder<'_> {
    /// Return the state for `positions`, creating and enqueueing it if new.
    fn intern(&mut self, positions: PositionSet) -> Result<StateId, CompileError> {
        if let Some(&id) = self.index.get(&positions) {
            return Ok(id);
        }
        if self.config.exceeded(self.states.len() + 1) {
            return Err(CompileError::TooManyStates {
                stage: Stage::Automaton,
                limit: self.config.max_states.unwrap_or_default(),
            });
        }

        let id = StateId(self.states.len() as u32);
        let is_final = positions.contains(self.meta.final_position());
        log::trace!("automaton state q{} = {positions}", id.0);

        self.index.insert(positions.clone(), id);
        self.states.push(State {
            positions,
            is_final,
            transitions: BTreeMap::new(),
        });
        self.queue.push_back(id);
        Ok(id)
    }
}
