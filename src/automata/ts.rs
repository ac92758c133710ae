//! The abstract transition-system interface and its explicit implementations.
//!
//! Every automaton in the crate is queried through [`TransitionSystem`]:
//! the translator output and hand-built automata use the explicit
//! deterministic and nondeterministic implementations below, while products,
//! model adapters and configuration systems implement the trait on top of
//! other systems and materialise their transitions lazily.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// A transition from a source state to a target state under a label.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Transition<Q, L> {
    source: Q,
    label: L,
    target: Q,
}

impl<Q, L> Transition<Q, L> {
    pub fn new(source: Q, label: L, target: Q) -> Self {
        Self {
            source,
            label,
            target,
        }
    }

    pub fn source(&self) -> &Q {
        &self.source
    }

    pub fn label(&self) -> &L {
        &self.label
    }

    pub fn target(&self) -> &Q {
        &self.target
    }
}

/// A directed graph of states and labelled transitions.
///
/// Implementations may materialise their transitions lazily, so successor
/// iteration is the primary access path and must not assume the state space
/// has been enumerated beforehand. Removing states or transitions is not
/// supported by any implementation in this crate.
pub trait TransitionSystem {
    type State: Clone + Eq + Hash;
    type Label: Clone;

    /// Returns whether the state belongs to this system.
    fn has_state(&self, state: &Self::State) -> bool;

    /// Iterates over the states of this system.
    ///
    /// For lazily materialised systems this iteration is anchored at the
    /// initial state and may be expensive; prefer successor iteration.
    fn states<'a>(&'a self) -> Box<dyn Iterator<Item = Self::State> + 'a>;

    /// Iterates over the outgoing transitions of a state.
    fn successors<'a>(
        &'a self,
        state: &Self::State,
    ) -> Box<dyn Iterator<Item = Transition<Self::State, Self::Label>> + 'a>;

    /// Iterates over the outgoing transitions of a state that carry the
    /// given label.
    fn successors_on<'a>(
        &'a self,
        state: &Self::State,
        label: &Self::Label,
    ) -> Box<dyn Iterator<Item = Transition<Self::State, Self::Label>> + 'a>
    where
        Self::Label: PartialEq,
    {
        let label = label.clone();
        Box::new(self.successors(state).filter(move |t| *t.label() == label))
    }

    /// Renders a state for output.
    fn display_state(&self, state: &Self::State) -> String;

    /// Renders a label for output.
    fn display_label(&self, label: &Self::Label) -> String;
}

/// An explicit transition system allowing several successors per source
/// state and label.
pub struct NondeterministicTransitionSystem<Q, L> {
    order: Vec<Q>,
    graph: HashMap<Q, Vec<(L, Q)>>,
}

impl<Q: Clone + Eq + Hash, L: Clone> Default for NondeterministicTransitionSystem<Q, L> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            graph: HashMap::new(),
        }
    }
}

impl<Q: Clone + Eq + Hash, L: Clone> NondeterministicTransitionSystem<Q, L> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a state; adding a known state is a no-op.
    pub fn add_state(&mut self, state: Q) {
        if !self.graph.contains_key(&state) {
            self.order.push(state.clone());
            self.graph.insert(state, Vec::new());
        }
    }

    /// Adds a transition between two known states and returns it.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint has not been added.
    pub fn add_transition(&mut self, source: &Q, label: L, target: &Q) -> Transition<Q, L> {
        assert!(
            self.graph.contains_key(source) && self.graph.contains_key(target),
            "transition endpoints must be states of the system"
        );
        self.graph
            .get_mut(source)
            .unwrap()
            .push((label.clone(), target.clone()));
        Transition::new(source.clone(), label, target.clone())
    }

    pub fn num_states(&self) -> usize {
        self.order.len()
    }

    pub fn num_transitions(&self) -> usize {
        self.graph.values().map(Vec::len).sum()
    }
}

impl<Q, L> TransitionSystem for NondeterministicTransitionSystem<Q, L>
where
    Q: Clone + Eq + Hash + fmt::Display,
    L: Clone + fmt::Display,
{
    type State = Q;
    type Label = L;

    fn has_state(&self, state: &Q) -> bool {
        self.graph.contains_key(state)
    }

    fn states<'a>(&'a self) -> Box<dyn Iterator<Item = Q> + 'a> {
        Box::new(self.order.iter().cloned())
    }

    fn successors<'a>(&'a self, state: &Q) -> Box<dyn Iterator<Item = Transition<Q, L>> + 'a> {
        let source = state.clone();
        match self.graph.get(state) {
            Some(edges) => Box::new(
                edges
                    .iter()
                    .map(move |(label, target)| {
                        Transition::new(source.clone(), label.clone(), target.clone())
                    }),
            ),
            None => Box::new(std::iter::empty()),
        }
    }

    fn display_state(&self, state: &Q) -> String {
        state.to_string()
    }

    fn display_label(&self, label: &L) -> String {
        label.to_string()
    }
}

/// An explicit transition system with at most one successor per source state
/// and label.
pub struct DeterministicTransitionSystem<Q, L> {
    inner: NondeterministicTransitionSystem<Q, L>,
}

impl<Q: Clone + Eq + Hash, L: Clone + PartialEq> Default for DeterministicTransitionSystem<Q, L> {
    fn default() -> Self {
        Self {
            inner: NondeterministicTransitionSystem::new(),
        }
    }
}

impl<Q: Clone + Eq + Hash, L: Clone + PartialEq> DeterministicTransitionSystem<Q, L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&mut self, state: Q) {
        self.inner.add_state(state);
    }

    /// Adds a transition between two known states and returns it.
    ///
    /// # Panics
    ///
    /// Panics if either endpoint is unknown, or if the source already has a
    /// successor under the same label.
    pub fn add_transition(&mut self, source: &Q, label: L, target: &Q) -> Transition<Q, L> {
        let duplicate = self
            .inner
            .graph
            .get(source)
            .map_or(false, |edges| edges.iter().any(|(l, _)| *l == label));
        assert!(!duplicate, "deterministic system already has this label");
        self.inner.add_transition(source, label, target)
    }

    /// Returns the unique successor transition under the label, if any.
    pub fn successor(&self, source: &Q, label: &L) -> Option<Transition<Q, L>> {
        self.inner.graph.get(source).and_then(|edges| {
            edges.iter().find(|(l, _)| l == label).map(|(l, target)| {
                Transition::new(source.clone(), l.clone(), target.clone())
            })
        })
    }

    pub fn num_states(&self) -> usize {
        self.inner.num_states()
    }
}

impl<Q, L> TransitionSystem for DeterministicTransitionSystem<Q, L>
where
    Q: Clone + Eq + Hash + fmt::Display,
    L: Clone + PartialEq + fmt::Display,
{
    type State = Q;
    type Label = L;

    fn has_state(&self, state: &Q) -> bool {
        self.inner.has_state(state)
    }

    fn states<'a>(&'a self) -> Box<dyn Iterator<Item = Q> + 'a> {
        self.inner.states()
    }

    fn successors<'a>(&'a self, state: &Q) -> Box<dyn Iterator<Item = Transition<Q, L>> + 'a> {
        self.inner.successors(state)
    }

    fn display_state(&self, state: &Q) -> String {
        self.inner.display_state(state)
    }

    fn display_label(&self, label: &L) -> String {
        self.inner.display_label(label)
    }
}
