//! Counter automata: transition systems whose labels carry a letter,
//! counter operations and acceptance-set memberships.

use std::fmt;

use bitflags::bitflags;
use fixedbitset::FixedBitSet;
use tinyvec::TinyVec;

use super::ts::{Transition, TransitionSystem};

bitflags! {
    /// An operation on a single counter.
    ///
    /// Flag values compose by bitwise or into compound operations; a
    /// compound operation applies its parts in the order increment, check,
    /// reset.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CounterOps: u8 {
        const INCREMENT = 1;
        const CHECK = 2;
        const RESET = 4;
    }
}

impl Default for CounterOps {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for CounterOps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.contains(Self::INCREMENT) {
            write!(f, "i")?;
        }
        if self.contains(Self::CHECK) {
            write!(f, "c")?;
        }
        if self.contains(Self::RESET) {
            write!(f, "r")?;
        }
        Ok(())
    }
}

/// The ordered list of operations applied to one counter on one transition.
pub type CounterOpSeq = TinyVec<[CounterOps; 2]>;

/// The label of a counter-automaton transition: a letter, one operation list
/// per counter, and the acceptance sets the transition belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterLabel<S> {
    letter: S,
    operations: Vec<CounterOpSeq>,
    acceptance: FixedBitSet,
}

impl<S> CounterLabel<S> {
    /// Builds a label; the operations vector must have one entry per counter
    /// of the owning automaton.
    pub fn new(letter: S, operations: Vec<CounterOpSeq>, acceptance: FixedBitSet) -> Self {
        Self {
            letter,
            operations,
            acceptance,
        }
    }

    pub fn letter(&self) -> &S {
        &self.letter
    }

    pub fn num_counters(&self) -> usize {
        self.operations.len()
    }

    /// The operation list of one counter, applied in list order.
    pub fn counter_operations(&self, counter: usize) -> &CounterOpSeq {
        &self.operations[counter]
    }

    pub fn operations(&self) -> &[CounterOpSeq] {
        &self.operations
    }

    /// Appends an operation at the end of a counter's list.
    pub fn add_counter_operation(&mut self, counter: usize, operation: CounterOps) {
        self.operations[counter].push(operation);
    }

    pub fn acceptance(&self) -> &FixedBitSet {
        &self.acceptance
    }

    pub fn in_acceptance_set(&self, set: usize) -> bool {
        self.acceptance.contains(set)
    }
}

impl<S: fmt::Display> fmt::Display for CounterLabel<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        if !self.operations.is_empty() {
            write!(f, ":[")?;
            for (i, ops) in self.operations.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "(")?;
                for (j, op) in ops.iter().enumerate() {
                    if j > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", op)?;
                }
                write!(f, ")")?;
            }
            write!(f, "]")?;
        }
        let marks: Vec<_> = self.acceptance.ones().collect();
        if !marks.is_empty() {
            write!(f, " {{")?;
            for (i, set) in marks.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", set)?;
            }
            write!(f, "}}")?;
        }
        Ok(())
    }
}

/// An automaton with counters over an arbitrary transition system.
///
/// The number of counters and of acceptance sets is fixed at creation. The
/// initial state is optional and can be set once the state exists. Next to
/// the acceptance bits on labels, transitions can be registered in explicit
/// acceptance families; both views must agree.
pub struct CounterAutomaton<S, T: TransitionSystem<Label = CounterLabel<S>>> {
    ts: T,
    num_counters: usize,
    initial: Option<T::State>,
    acceptance: Vec<Vec<Transition<T::State, CounterLabel<S>>>>,
}

impl<S: Clone, T: TransitionSystem<Label = CounterLabel<S>>> CounterAutomaton<S, T> {
    pub fn new(num_counters: usize, num_acceptance_sets: usize, ts: T) -> Self {
        Self {
            ts,
            num_counters,
            initial: None,
            acceptance: vec![Vec::new(); num_acceptance_sets],
        }
    }

    pub fn num_counters(&self) -> usize {
        self.num_counters
    }

    pub fn num_acceptance_sets(&self) -> usize {
        self.acceptance.len()
    }

    pub fn ts(&self) -> &T {
        &self.ts
    }

    pub fn ts_mut(&mut self) -> &mut T {
        &mut self.ts
    }

    /// Sets the initial state.
    ///
    /// # Panics
    ///
    /// Panics if the state is not part of the transition system.
    pub fn set_initial_state(&mut self, state: T::State) {
        assert!(
            self.ts.has_state(&state),
            "initial state must be a state of the system"
        );
        self.initial = Some(state);
    }

    pub fn initial_state(&self) -> Option<&T::State> {
        self.initial.as_ref()
    }

    /// Builds a label without counter operations or acceptance marks.
    pub fn make_label(&self, letter: S) -> CounterLabel<S> {
        CounterLabel::new(
            letter,
            vec![CounterOpSeq::default(); self.num_counters],
            FixedBitSet::with_capacity(self.num_acceptance_sets()),
        )
    }

    /// Builds a label with the given operations and acceptance marks.
    ///
    /// # Panics
    ///
    /// Panics if the operations vector does not have one entry per counter.
    pub fn make_label_with(
        &self,
        letter: S,
        operations: Vec<CounterOpSeq>,
        acceptance: FixedBitSet,
    ) -> CounterLabel<S> {
        assert_eq!(
            operations.len(),
            self.num_counters,
            "one operation list per counter required"
        );
        let mut acceptance = acceptance;
        acceptance.grow(self.num_acceptance_sets());
        CounterLabel::new(letter, operations, acceptance)
    }

    /// Registers a transition into an explicit acceptance family.
    pub fn add_acceptance_transition(
        &mut self,
        set: usize,
        transition: Transition<T::State, CounterLabel<S>>,
    ) {
        debug_assert!(
            transition.label().in_acceptance_set(set),
            "acceptance family and label acceptance must agree"
        );
        self.acceptance[set].push(transition);
    }

    /// The transitions registered in an acceptance family.
    pub fn acceptance_transitions(&self, set: usize) -> &[Transition<T::State, CounterLabel<S>>] {
        &self.acceptance[set]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::ts::NondeterministicTransitionSystem;
    use tinyvec::tiny_vec;

    type Ts = NondeterministicTransitionSystem<&'static str, CounterLabel<char>>;

    #[test]
    fn counter_operations_compose_as_flags() {
        let compound = CounterOps::INCREMENT | CounterOps::CHECK;
        assert!(compound.contains(CounterOps::INCREMENT));
        assert!(compound.contains(CounterOps::CHECK));
        assert!(!compound.contains(CounterOps::RESET));
        assert_eq!(compound.bits(), 3);
        assert_eq!(compound.to_string(), "ic");
    }

    #[test]
    fn labels_know_their_counters_and_acceptance() {
        let mut ts = Ts::new();
        ts.add_state("q");
        let automaton = CounterAutomaton::new(2, 3, ts);

        let mut label = automaton.make_label('a');
        assert_eq!(label.num_counters(), 2);
        label.add_counter_operation(1, CounterOps::RESET);
        assert_eq!(
            label.counter_operations(1).as_slice(),
            &[CounterOps::RESET]
        );
        assert!(!label.in_acceptance_set(0));
    }

    #[test]
    #[should_panic]
    fn mismatched_operation_vectors_are_rejected() {
        let mut ts = Ts::new();
        ts.add_state("q");
        let automaton = CounterAutomaton::new(2, 0, ts);
        automaton.make_label_with('a', vec![tiny_vec![_ => CounterOps::INCREMENT]], FixedBitSet::new());
    }

    #[test]
    fn acceptance_families_accept_marked_transitions() {
        let mut ts = Ts::new();
        ts.add_state("p");
        ts.add_state("q");
        let mut automaton = CounterAutomaton::new(0, 1, ts);

        let mut acc = FixedBitSet::with_capacity(1);
        acc.insert(0);
        let label = automaton.make_label_with('a', vec![], acc);
        let transition = automaton.ts_mut().add_transition(&"p", label, &"q");
        automaton.add_acceptance_transition(0, transition);
        assert_eq!(automaton.acceptance_transitions(0).len(), 1);
        automaton.set_initial_state("p");
        assert_eq!(automaton.initial_state(), Some(&"p"));
    }
}
