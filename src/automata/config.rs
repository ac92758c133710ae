//! Configuration automata: the on-the-fly lifting of a counter automaton to
//! the space of (state, current value, counter values) triples.

use std::collections::HashSet;
use std::fmt;

use super::counter::{CounterAutomaton, CounterLabel, CounterOps};
use super::ts::{Transition, TransitionSystem};

/// The value carried along a run, possibly not yet bounded by any check.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Value {
    /// No check has fired yet, or no bound exists.
    Infinite,
    /// The minimum over the checks fired so far.
    Finite(u32),
}

impl Value {
    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite(_))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Self::Infinite, Self::Infinite) => Ordering::Equal,
            (Self::Infinite, Self::Finite(_)) => Ordering::Greater,
            (Self::Finite(_), Self::Infinite) => Ordering::Less,
            (Self::Finite(a), Self::Finite(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Infinite => write!(f, "inf"),
            Self::Finite(v) => write!(f, "{}", v),
        }
    }
}

/// A configuration of a counter automaton: the automaton state, the current
/// value of the run and the current counter values.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Configuration<Q> {
    state: Q,
    value: Value,
    counters: Vec<u32>,
}

impl<Q> Configuration<Q> {
    pub fn state(&self) -> &Q {
        &self.state
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn is_bounded(&self) -> bool {
        self.value.is_finite()
    }

    pub fn counters(&self) -> &[u32] {
        &self.counters
    }
}

/// Applies the operation lists of one transition to a configuration,
/// returning the successor value and counter values.
///
/// Counters are treated independently and in index order; within one counter
/// the list order is respected, and a compound operation applies increment,
/// then check, then reset. Increments saturate at `cap` when one is given;
/// saturation keeps every comparison below the cap exact.
pub(crate) fn apply_operations(
    value: Value,
    counters: &[u32],
    operations: &[impl AsRef<[CounterOps]>],
    cap: Option<u32>,
) -> (Value, Vec<u32>) {
    let mut next = counters.to_vec();
    let mut value = value;
    for (i, ops) in operations.iter().enumerate() {
        for &op in ops.as_ref() {
            if op.contains(CounterOps::INCREMENT) {
                let bumped = next[i].saturating_add(1);
                next[i] = match cap {
                    Some(cap) => bumped.min(cap),
                    None => bumped,
                };
            }
            if op.contains(CounterOps::CHECK) {
                value = match value {
                    Value::Infinite => Value::Finite(next[i]),
                    Value::Finite(v) => Value::Finite(v.min(next[i])),
                };
            }
            if op.contains(CounterOps::RESET) {
                next[i] = 0;
            }
        }
    }
    (value, next)
}

/// The configuration automaton of a counter automaton.
///
/// Transitions are computed on demand from the underlying automaton; the
/// configuration space is unbounded in general and is never materialised
/// eagerly. A saturation cap bounds the counter values reachable during a
/// search.
pub struct ConfigurationAutomaton<'a, S, T: TransitionSystem<Label = CounterLabel<S>>> {
    automaton: &'a CounterAutomaton<S, T>,
    cap: Option<u32>,
}

impl<'a, S: Clone, T: TransitionSystem<Label = CounterLabel<S>>> ConfigurationAutomaton<'a, S, T> {
    pub fn new(automaton: &'a CounterAutomaton<S, T>) -> Self {
        Self {
            automaton,
            cap: None,
        }
    }

    /// Saturates counter values at `cap`; values at the cap compare above
    /// any bound below it, which is all a bounded search needs.
    pub fn with_cap(automaton: &'a CounterAutomaton<S, T>, cap: u32) -> Self {
        Self {
            automaton,
            cap: Some(cap),
        }
    }

    pub fn automaton(&self) -> &CounterAutomaton<S, T> {
        self.automaton
    }

    pub fn num_counters(&self) -> usize {
        self.automaton.num_counters()
    }

    pub fn num_acceptance_sets(&self) -> usize {
        self.automaton.num_acceptance_sets()
    }

    /// The configuration `(q, ∞, 0…0)`.
    pub fn default_config(&self, state: T::State) -> Configuration<T::State> {
        Configuration {
            state,
            value: Value::Infinite,
            counters: vec![0; self.automaton.num_counters()],
        }
    }

    /// The default configuration of the automaton's initial state.
    ///
    /// # Panics
    ///
    /// Panics if no initial state has been set.
    pub fn initial_configuration(&self) -> Configuration<T::State> {
        let initial = self
            .automaton
            .initial_state()
            .expect("configuration automaton needs an initial state")
            .clone();
        self.default_config(initial)
    }

    /// The successor configuration under one transition label.
    pub fn apply(
        &self,
        config: &Configuration<T::State>,
        label: &CounterLabel<S>,
        target: T::State,
    ) -> Configuration<T::State> {
        assert_eq!(
            label.num_counters(),
            self.automaton.num_counters(),
            "label does not match the automaton's counters"
        );
        let (value, counters) =
            apply_operations(config.value, &config.counters, label.operations(), self.cap);
        if config.is_bounded() {
            assert!(
                value.is_finite() && value <= config.value,
                "configuration value must decrease monotonically"
            );
        }
        Configuration {
            state: target,
            value,
            counters,
        }
    }
}

impl<'a, S, T> TransitionSystem for ConfigurationAutomaton<'a, S, T>
where
    S: Clone,
    T: TransitionSystem<Label = CounterLabel<S>>,
{
    type State = Configuration<T::State>;
    type Label = CounterLabel<S>;

    fn has_state(&self, state: &Self::State) -> bool {
        self.automaton.ts().has_state(&state.state)
            && state.counters.len() == self.automaton.num_counters()
    }

    /// Depth-first enumeration anchored at the initial configuration. Only
    /// terminates when the reachable configuration space is finite, which a
    /// saturation cap guarantees.
    fn states<'b>(&'b self) -> Box<dyn Iterator<Item = Self::State> + 'b> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.initial_configuration()];
        while let Some(config) = stack.pop() {
            if !seen.insert(config.clone()) {
                continue;
            }
            for transition in self.successors(&config) {
                stack.push(transition.target().clone());
            }
            order.push(config);
        }
        Box::new(order.into_iter())
    }

    fn successors<'b>(
        &'b self,
        state: &Self::State,
    ) -> Box<dyn Iterator<Item = Transition<Self::State, Self::Label>> + 'b> {
        let source = state.clone();
        Box::new(
            self.automaton
                .ts()
                .successors(&state.state)
                .map(move |transition| {
                    let target =
                        self.apply(&source, transition.label(), transition.target().clone());
                    Transition::new(source.clone(), transition.label().clone(), target)
                }),
        )
    }

    fn display_state(&self, state: &Self::State) -> String {
        let counters: Vec<String> = state.counters.iter().map(u32::to_string).collect();
        format!(
            "({}, |{}|, [{}])",
            self.automaton.ts().display_state(&state.state),
            state.value,
            counters.join(",")
        )
    }

    fn display_label(&self, label: &Self::Label) -> String {
        self.automaton.ts().display_label(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::counter::CounterOpSeq;
    use crate::automata::ts::NondeterministicTransitionSystem;
    use fixedbitset::FixedBitSet;
    use tinyvec::tiny_vec;

    #[test]
    fn operations_apply_in_list_order() {
        // increment, then a compound check and reset on the same counter
        let ops: Vec<CounterOpSeq> = vec![tiny_vec![
            CounterOps::INCREMENT,
            CounterOps::CHECK | CounterOps::RESET
        ]];
        let (value, counters) = apply_operations(Value::Infinite, &[2], &ops, None);
        assert_eq!(value, Value::Finite(3));
        assert_eq!(counters, vec![0]);
    }

    #[test]
    fn compound_operations_increment_before_checking() {
        let ops: Vec<CounterOpSeq> = vec![tiny_vec![CounterOps::INCREMENT | CounterOps::CHECK]];
        let (value, counters) = apply_operations(Value::Finite(10), &[4], &ops, None);
        assert_eq!(value, Value::Finite(5));
        assert_eq!(counters, vec![5]);
    }

    #[test]
    fn checks_keep_the_minimum_across_counters() {
        let ops: Vec<CounterOpSeq> = vec![
            tiny_vec![_ => CounterOps::CHECK],
            tiny_vec![_ => CounterOps::CHECK],
        ];
        let (value, _) = apply_operations(Value::Infinite, &[7, 3], &ops, None);
        assert_eq!(value, Value::Finite(3));
    }

    #[test]
    fn increments_saturate_at_the_cap() {
        let ops: Vec<CounterOpSeq> = vec![tiny_vec![_ => CounterOps::INCREMENT]];
        let (_, counters) = apply_operations(Value::Infinite, &[5], &ops, Some(5));
        assert_eq!(counters, vec![5]);
    }

    fn counting_automaton() -> CounterAutomaton<
        char,
        NondeterministicTransitionSystem<&'static str, CounterLabel<char>>,
    > {
        let mut ts = NondeterministicTransitionSystem::new();
        ts.add_state("q");
        ts.add_state("t");
        let inc = CounterLabel::new(
            'a',
            vec![tiny_vec![_ => CounterOps::INCREMENT]],
            FixedBitSet::with_capacity(0),
        );
        let check = CounterLabel::new(
            'b',
            vec![tiny_vec![CounterOps::CHECK | CounterOps::RESET]],
            FixedBitSet::with_capacity(0),
        );
        ts.add_transition(&"q", inc, &"q");
        ts.add_transition(&"q", check, &"t");
        let mut automaton = CounterAutomaton::new(1, 0, ts);
        automaton.set_initial_state("q");
        automaton
    }

    #[test]
    fn successor_configurations_are_computed_on_the_fly() {
        let automaton = counting_automaton();
        let cfg = ConfigurationAutomaton::new(&automaton);
        let initial = cfg.initial_configuration();
        assert_eq!(initial.value(), Value::Infinite);
        assert_eq!(initial.counters(), &[0]);

        let successors: Vec<_> = cfg.successors(&initial).collect();
        assert_eq!(successors.len(), 2);
        let looped = successors
            .iter()
            .find(|t| t.target().state() == &"q")
            .unwrap();
        assert_eq!(looped.target().counters(), &[1]);
        assert_eq!(looped.target().value(), Value::Infinite);

        let checked = successors
            .iter()
            .find(|t| t.target().state() == &"t")
            .unwrap();
        assert_eq!(checked.target().value(), Value::Finite(0));
        assert_eq!(checked.target().counters(), &[0]);
    }

    #[test]
    fn bounded_values_stay_monotone() {
        let automaton = counting_automaton();
        let cfg = ConfigurationAutomaton::new(&automaton);
        let mut config = cfg.initial_configuration();
        // three increments, then the check binds the value
        for _ in 0..3 {
            config = cfg
                .successors(&config)
                .find(|t| t.target().state() == &"q")
                .unwrap()
                .target()
                .clone();
        }
        config = cfg
            .successors(&config)
            .find(|t| t.target().state() == &"t")
            .unwrap()
            .target()
            .clone();
        assert_eq!(config.value(), Value::Finite(3));
    }

    #[test]
    fn capped_state_spaces_are_finite() {
        let automaton = counting_automaton();
        let cfg = ConfigurationAutomaton::with_cap(&automaton, 2);
        // configurations: (q, inf, 0..2), (t, 0..2, 0)
        assert_eq!(cfg.states().count(), 6);
    }
}
