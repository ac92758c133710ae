//! The model-automaton contract and its adapter into a counter automaton.
//!
//! The model is a generalized Büchi automaton supplied by the caller through
//! the [`BuchiAutomaton`] trait: an initial state, successor iteration with
//! BDD conditions and acceptance marks, and hashable states. The adapter
//! wraps such a model as a read-only counter automaton with zero counters
//! whose acceptance sets mirror the model's.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::hash::Hash;

use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet, BddVariableSetBuilder};
use fixedbitset::FixedBitSet;
use log::warn;

use super::counter::{CounterAutomaton, CounterLabel};
use super::ts::{Transition, TransitionSystem};

/// The dictionary of atomic propositions, backed by a BDD variable set.
///
/// The dictionary must outlive every automaton built over it.
pub struct AtomicPropositions {
    vars: BddVariableSet,
    index: HashMap<String, BddVariable>,
}

impl AtomicPropositions {
    /// Registers the given proposition names. Re-registration of a name is
    /// reported as a warning and ignored.
    pub fn new<S: AsRef<str>>(names: &[S]) -> Self {
        let mut builder = BddVariableSetBuilder::new();
        let mut index = HashMap::new();
        for name in names {
            let name = name.as_ref();
            if index.contains_key(name) {
                warn!("proposition {} registered twice, ignoring", name);
                continue;
            }
            let var = builder.make_variable(name);
            index.insert(name.to_owned(), var);
        }
        Self {
            vars: builder.build(),
            index,
        }
    }

    /// The underlying BDD variable set.
    pub fn variable_set(&self) -> &BddVariableSet {
        &self.vars
    }

    /// Looks up a registered proposition.
    pub fn variable(&self, name: &str) -> Option<BddVariable> {
        self.index.get(name).copied()
    }

    /// Returns whether all the given names are registered.
    pub fn contains_all<'a, I: IntoIterator<Item = &'a str>>(&self, names: I) -> bool {
        names.into_iter().all(|n| self.index.contains_key(n))
    }

    /// Builds a condition from a boolean expression over the registered
    /// propositions, e.g. `"a & !b"`.
    pub fn condition(&self, expression: &str) -> Bdd {
        self.vars.eval_expression_string(expression)
    }

    /// The condition satisfied by every letter.
    pub fn top(&self) -> Bdd {
        self.vars.mk_true()
    }

    /// The unsatisfiable condition.
    pub fn bottom(&self) -> Bdd {
        self.vars.mk_false()
    }

    /// A positive or negative literal over a registered proposition.
    pub fn literal(&self, var: BddVariable, positive: bool) -> Bdd {
        self.vars.mk_literal(var, positive)
    }

    /// Renders a condition as a boolean expression.
    pub fn display_condition(&self, condition: &Bdd) -> String {
        if condition.is_true() {
            "true".to_owned()
        } else if condition.is_false() {
            "false".to_owned()
        } else {
            condition.to_boolean_expression(&self.vars).to_string()
        }
    }
}

/// One outgoing edge of a model state.
#[derive(Debug, Clone)]
pub struct BuchiEdge<Q> {
    /// The BDD condition under which the edge is taken.
    pub condition: Bdd,
    /// The acceptance sets the edge belongs to.
    pub acceptance: FixedBitSet,
    /// The target state.
    pub target: Q,
}

/// The contract required from an externally supplied model automaton.
///
/// Only successor iteration and state hashing are required; the model is
/// never modified.
pub trait BuchiAutomaton {
    type State: Clone + Eq + Hash;

    /// The state in which every run starts.
    fn initial_state(&self) -> Self::State;

    /// The number of acceptance sets of the generalized Büchi condition.
    fn num_acceptance_sets(&self) -> usize;

    /// The dictionary interpreting edge conditions.
    fn propositions(&self) -> &AtomicPropositions;

    /// Iterates over the outgoing edges of a state.
    fn successors<'a>(&'a self, state: &Self::State)
        -> Box<dyn Iterator<Item = BuchiEdge<Self::State>> + 'a>;

    /// Renders a state for output.
    fn display_state(&self, state: &Self::State) -> String;
}

/// An explicit model automaton for callers and tests.
pub struct ExplicitBuchi {
    props: AtomicPropositions,
    names: Vec<String>,
    edges: Vec<Vec<BuchiEdge<usize>>>,
    initial: usize,
    num_acceptance_sets: usize,
}

impl ExplicitBuchi {
    pub fn new(props: AtomicPropositions, num_acceptance_sets: usize) -> Self {
        Self {
            props,
            names: Vec::new(),
            edges: Vec::new(),
            initial: 0,
            num_acceptance_sets,
        }
    }

    /// Adds a state and returns its index. The first state added is the
    /// initial state unless [`Self::set_initial_state`] is called.
    pub fn add_state(&mut self, name: &str) -> usize {
        self.names.push(name.to_owned());
        self.edges.push(Vec::new());
        self.names.len() - 1
    }

    pub fn set_initial_state(&mut self, state: usize) {
        assert!(state < self.names.len());
        self.initial = state;
    }

    /// Adds an edge with a condition given as a boolean expression and the
    /// acceptance sets it belongs to.
    pub fn add_edge(&mut self, source: usize, expression: &str, acceptance: &[usize], target: usize) {
        let condition = self.props.condition(expression);
        self.add_edge_with(source, condition, acceptance, target);
    }

    /// Adds an edge with an explicit BDD condition.
    pub fn add_edge_with(
        &mut self,
        source: usize,
        condition: Bdd,
        acceptance: &[usize],
        target: usize,
    ) {
        assert!(source < self.names.len() && target < self.names.len());
        let mut marks = FixedBitSet::with_capacity(self.num_acceptance_sets);
        for &set in acceptance {
            assert!(set < self.num_acceptance_sets);
            marks.insert(set);
        }
        self.edges[source].push(BuchiEdge {
            condition,
            acceptance: marks,
            target,
        });
    }
}

impl BuchiAutomaton for ExplicitBuchi {
    type State = usize;

    fn initial_state(&self) -> usize {
        self.initial
    }

    fn num_acceptance_sets(&self) -> usize {
        self.num_acceptance_sets
    }

    fn propositions(&self) -> &AtomicPropositions {
        &self.props
    }

    fn successors<'a>(&'a self, state: &usize) -> Box<dyn Iterator<Item = BuchiEdge<usize>> + 'a> {
        Box::new(self.edges[*state].iter().cloned())
    }

    fn display_state(&self, state: &usize) -> String {
        self.names[*state].clone()
    }
}

/// A model automaton seen as the transition system of a zero-counter
/// counter automaton.
///
/// The adapter is read-only; it has no way to add states or transitions.
pub struct ModelAdapter<'m, M> {
    model: &'m M,
}

impl<'m, M: BuchiAutomaton> ModelAdapter<'m, M> {
    pub fn new(model: &'m M) -> Self {
        Self { model }
    }

    fn edge_label(&self, edge: &BuchiEdge<M::State>) -> CounterLabel<Bdd> {
        let mut acceptance = edge.acceptance.clone();
        acceptance.grow(self.model.num_acceptance_sets());
        CounterLabel::new(edge.condition.clone(), Vec::new(), acceptance)
    }
}

impl<'m, M: BuchiAutomaton> TransitionSystem for ModelAdapter<'m, M> {
    type State = M::State;
    type Label = CounterLabel<Bdd>;

    /// Membership cannot be tested without walking the model, so every
    /// state is assumed to belong to it.
    fn has_state(&self, _state: &M::State) -> bool {
        true
    }

    fn states<'a>(&'a self) -> Box<dyn Iterator<Item = M::State> + 'a> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.model.initial_state()];
        while let Some(state) = stack.pop() {
            if !seen.insert(state.clone()) {
                continue;
            }
            order.push(state.clone());
            for edge in self.model.successors(&state) {
                stack.push(edge.target);
            }
        }
        Box::new(order.into_iter())
    }

    fn successors<'a>(
        &'a self,
        state: &M::State,
    ) -> Box<dyn Iterator<Item = Transition<M::State, CounterLabel<Bdd>>> + 'a> {
        let source = state.clone();
        Box::new(self.model.successors(state).map(move |edge| {
            let label = self.edge_label(&edge);
            Transition::new(source.clone(), label, edge.target)
        }))
    }

    fn display_state(&self, state: &M::State) -> String {
        self.model.display_state(state)
    }

    fn display_label(&self, label: &CounterLabel<Bdd>) -> String {
        let mut out = self
            .model
            .propositions()
            .display_condition(label.letter());
        let marks: Vec<_> = label.acceptance().ones().collect();
        if !marks.is_empty() {
            let _ = write!(out, " {:?}", marks);
        }
        out
    }
}

/// Wraps a model automaton as a counter automaton with zero counters whose
/// acceptance sets mirror the model's.
pub fn model_automaton<M: BuchiAutomaton>(model: &M) -> CounterAutomaton<Bdd, ModelAdapter<'_, M>> {
    let mut automaton =
        CounterAutomaton::new(0, model.num_acceptance_sets(), ModelAdapter::new(model));
    automaton.set_initial_state(model.initial_state());
    automaton
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_model() -> ExplicitBuchi {
        let props = AtomicPropositions::new(&["a", "b"]);
        let mut model = ExplicitBuchi::new(props, 1);
        let s0 = model.add_state("s0");
        let s1 = model.add_state("s1");
        model.add_edge(s0, "a & !b", &[], s1);
        model.add_edge(s1, "b", &[0], s1);
        model
    }

    #[test]
    fn explicit_models_iterate_their_edges() {
        let model = two_state_model();
        assert_eq!(model.initial_state(), 0);
        let edges: Vec<_> = model.successors(&0).collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, 1);
        assert!(!edges[0].condition.is_false());
        let loop_edges: Vec<_> = model.successors(&1).collect();
        assert!(loop_edges[0].acceptance.contains(0));
    }

    #[test]
    fn the_adapter_mirrors_the_model_without_counters() {
        let model = two_state_model();
        let automaton = model_automaton(&model);
        assert_eq!(automaton.num_counters(), 0);
        assert_eq!(automaton.num_acceptance_sets(), 1);
        assert_eq!(automaton.initial_state(), Some(&0));

        let transitions: Vec<_> = automaton.ts().successors(&0).collect();
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].label().num_counters(), 0);
        assert_eq!(automaton.ts().states().count(), 2);
    }
}
