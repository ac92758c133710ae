//! Couvreur-style search for the extremal values of accepting runs of a
//! configuration automaton.
//!
//! The depth-first search keeps a stack of open strongly connected
//! components (`root`) and a parallel stack of the acceptance marks on the
//! tree edges between them (`arc`). Reaching a configuration of an open
//! component merges every component above it and accumulates their
//! acceptance marks; a component whose marks cover every acceptance set is
//! accepting, and all configurations of one component share a single value.

use std::collections::HashMap;

use fixedbitset::FixedBitSet;
use log::debug;

use super::config::{Configuration, ConfigurationAutomaton, Value};
use super::counter::CounterLabel;
use super::ts::TransitionSystem;

/// Computes the supremum of values over accepting runs, up to a bound.
pub struct SupremumFinder<'a, 'b, S, T: TransitionSystem<Label = CounterLabel<S>>> {
    automaton: &'a ConfigurationAutomaton<'b, S, T>,
}

impl<'a, 'b, S, T> SupremumFinder<'a, 'b, S, T>
where
    S: Clone,
    T: TransitionSystem<Label = CounterLabel<S>>,
{
    pub fn new(automaton: &'a ConfigurationAutomaton<'b, S, T>) -> Self {
        Self { automaton }
    }

    /// Returns the greatest value among accepting components, or
    /// [`Value::Infinite`] as soon as an accepting component holds an
    /// unbounded configuration or one whose value exceeds `bound`.
    ///
    /// The supremum over no accepting component at all is 0. Components
    /// whose value cannot improve on the current candidate are not explored
    /// at all; along a run values only decrease, so such components never
    /// hide a greater value.
    pub fn find_supremum(&self, bound: u32) -> Value {
        couvreur(self.automaton, bound, Mode::Supremum)
    }
}

/// Computes the infimum of values over accepting runs, up to a bound.
pub struct InfimumFinder<'a, 'b, S, T: TransitionSystem<Label = CounterLabel<S>>> {
    automaton: &'a ConfigurationAutomaton<'b, S, T>,
}

impl<'a, 'b, S, T> InfimumFinder<'a, 'b, S, T>
where
    S: Clone,
    T: TransitionSystem<Label = CounterLabel<S>>,
{
    pub fn new(automaton: &'a ConfigurationAutomaton<'b, S, T>) -> Self {
        Self { automaton }
    }

    /// Returns the least value among accepting components, or
    /// [`Value::Infinite`] when no accepting component has a bounded value
    /// within `bound`.
    ///
    /// Unlike the supremum search, successors with a high value cannot be
    /// skipped: values still decrease along the run, so a high value now
    /// may turn into the least value later. The search returns as soon as a
    /// zero-valued accepting component is found.
    pub fn find_infimum(&self, bound: u32) -> Value {
        couvreur(self.automaton, bound, Mode::Infimum)
    }
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Mode {
    Supremum,
    Infimum,
}

/// An open strongly connected component on the search stack.
struct RootEntry<C> {
    index: i64,
    conditions: FixedBitSet,
    rem: Vec<C>,
}

impl<C> RootEntry<C> {
    fn new(index: i64, num_sets: usize) -> Self {
        Self {
            index,
            conditions: FixedBitSet::with_capacity(num_sets),
            rem: Vec::new(),
        }
    }
}

fn couvreur<S, T>(
    automaton: &ConfigurationAutomaton<'_, S, T>,
    bound: u32,
    mode: Mode,
) -> Value
where
    S: Clone,
    T: TransitionSystem<Label = CounterLabel<S>>,
{
    let num_counters = automaton.num_counters();
    let num_sets = automaton.num_acceptance_sets();

    // the candidate value: sup ∅ is 0, inf ∅ is unbounded
    let mut best: Option<u32> = match mode {
        Mode::Supremum => Some(0),
        Mode::Infimum => None,
    };

    let mut h: HashMap<Configuration<T::State>, i64> = HashMap::new();
    let mut root: Vec<RootEntry<Configuration<T::State>>> = Vec::new();
    let mut arc: Vec<FixedBitSet> = Vec::new();
    let mut todo = Vec::new();
    let mut num: i64 = 1;
    let mut shortcuts: usize = 0;

    let initial = automaton.initial_configuration();
    h.insert(initial.clone(), num);
    root.push(RootEntry::new(num, num_sets));
    arc.push(FixedBitSet::with_capacity(num_sets));
    todo.push((initial.clone(), automaton.successors(&initial)));

    loop {
        debug_assert_eq!(root.len(), arc.len());
        let next = match todo.last_mut() {
            None => break,
            Some((_, iter)) => iter.next(),
        };

        let transition = match next {
            Some(transition) => transition,
            None => {
                // all successors explored, backtrack
                let (current, _) = todo.pop().unwrap();
                let index = h[&current];
                let top = root.last_mut().unwrap();
                top.rem.push(current);
                if top.index == index {
                    arc.pop();
                    let closed = root.pop().unwrap();
                    for config in closed.rem {
                        *h.get_mut(&config).unwrap() = -1;
                    }
                }
                continue;
            }
        };

        let dest = transition.target().clone();
        let acc = transition.label().acceptance().clone();

        // a component that cannot improve on the candidate is not worth
        // exploring; this is only sound for the supremum search
        if mode == Mode::Supremum && dest.is_bounded() {
            if let (Value::Finite(v), Some(max_val)) = (dest.value(), best) {
                if v <= max_val {
                    shortcuts += 1;
                    continue;
                }
            }
        }

        if !h.contains_key(&dest) {
            num += 1;
            h.insert(dest.clone(), num);
            root.push(RootEntry::new(num, num_sets));
            arc.push(acc);
            let successors = automaton.successors(&dest);
            todo.push((dest, successors));
            continue;
        }

        let dest_index = h[&dest];
        if dest_index == -1 {
            // a dead component
            continue;
        }

        // the destination belongs to an open component; merge every
        // component with a greater index into it
        let mut merged = acc;
        let mut rem = Vec::new();
        while root.last().map_or(false, |top| top.index > dest_index) {
            let closed = root.pop().unwrap();
            let edge = arc.pop().unwrap();
            merged.union_with(&closed.conditions);
            merged.union_with(&edge);
            rem.extend(closed.rem);
        }
        let top = root.last_mut().expect("the merge target is on the stack");
        top.conditions.union_with(&merged);
        top.rem.extend(rem);

        if top.conditions.count_ones(..) == num_sets {
            // an accepting component; without counters no check can ever
            // fire, and every run has value 0
            let value = if num_counters == 0 {
                Value::Finite(0)
            } else {
                dest.value()
            };
            debug!("accepting component of value {} (bound {})", value, bound);
            match mode {
                Mode::Supremum => match value {
                    Value::Infinite => {
                        debug!("took {} shortcuts", shortcuts);
                        return Value::Infinite;
                    }
                    Value::Finite(v) if v > bound => {
                        debug!("took {} shortcuts", shortcuts);
                        return Value::Infinite;
                    }
                    Value::Finite(v) => {
                        best = Some(best.map_or(v, |b| b.max(v)));
                    }
                },
                Mode::Infimum => {
                    if let Value::Finite(v) = value {
                        if v <= bound {
                            best = Some(best.map_or(v, |b| b.min(v)));
                            if v == 0 {
                                return Value::Finite(0);
                            }
                        }
                    }
                }
            }
        }
    }

    debug!("took {} shortcuts", shortcuts);
    match best {
        Some(v) => {
            debug_assert!(v <= bound);
            Value::Finite(v)
        }
        None => Value::Infinite,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::counter::{CounterAutomaton, CounterOpSeq, CounterOps};
    use crate::automata::ts::NondeterministicTransitionSystem;

    type Ts = NondeterministicTransitionSystem<&'static str, CounterLabel<char>>;
    type Automaton = CounterAutomaton<char, Ts>;

    struct Builder {
        ts: Ts,
        num_counters: usize,
        num_sets: usize,
    }

    impl Builder {
        fn new(num_counters: usize, num_sets: usize, states: &[&'static str]) -> Self {
            let mut ts = Ts::new();
            for &state in states {
                ts.add_state(state);
            }
            Self {
                ts,
                num_counters,
                num_sets,
            }
        }

        fn edge(
            &mut self,
            source: &'static str,
            letter: char,
            ops: &[(usize, CounterOps)],
            acc: &[usize],
            target: &'static str,
        ) -> &mut Self {
            let mut operations = vec![CounterOpSeq::default(); self.num_counters];
            for &(counter, op) in ops {
                operations[counter].push(op);
            }
            let mut marks = FixedBitSet::with_capacity(self.num_sets);
            for &set in acc {
                marks.insert(set);
            }
            let label = CounterLabel::new(letter, operations, marks);
            self.ts.add_transition(&source, label, &target);
            self
        }

        fn build(self, initial: &'static str) -> Automaton {
            let mut automaton = CounterAutomaton::new(self.num_counters, self.num_sets, self.ts);
            automaton.set_initial_state(initial);
            automaton
        }
    }

    #[test]
    fn an_accepting_loop_without_counters_has_value_zero() {
        let mut builder = Builder::new(0, 1, &["q"]);
        builder.edge("q", 'a', &[], &[0], "q");
        let automaton = builder.build("q");

        let cfg = ConfigurationAutomaton::with_cap(&automaton, 9);
        assert_eq!(SupremumFinder::new(&cfg).find_supremum(8), Value::Finite(0));
        assert_eq!(InfimumFinder::new(&cfg).find_infimum(8), Value::Finite(0));
    }

    #[test]
    fn a_non_accepting_loop_contributes_nothing() {
        let mut builder = Builder::new(0, 1, &["q"]);
        builder.edge("q", 'a', &[], &[], "q");
        let automaton = builder.build("q");

        let cfg = ConfigurationAutomaton::with_cap(&automaton, 9);
        assert_eq!(SupremumFinder::new(&cfg).find_supremum(8), Value::Finite(0));
        assert_eq!(InfimumFinder::new(&cfg).find_infimum(8), Value::Infinite);
    }

    /// A chain of two increments, a checking discharge and an accepting
    /// loop: every accepting run has value 2.
    fn forced_count() -> Automaton {
        let mut builder = Builder::new(1, 1, &["s0", "s1", "s2", "t"]);
        builder
            .edge("s0", 'a', &[(0, CounterOps::INCREMENT)], &[], "s1")
            .edge("s1", 'a', &[(0, CounterOps::INCREMENT)], &[], "s2")
            .edge(
                "s2",
                'b',
                &[(0, CounterOps::CHECK | CounterOps::RESET)],
                &[0],
                "t",
            )
            .edge("t", 'c', &[], &[0], "t");
        builder.build("s0")
    }

    #[test]
    fn forced_counts_are_reported_exactly() {
        let automaton = forced_count();

        let cfg = ConfigurationAutomaton::with_cap(&automaton, 6);
        assert_eq!(SupremumFinder::new(&cfg).find_supremum(5), Value::Finite(2));
        assert_eq!(InfimumFinder::new(&cfg).find_infimum(5), Value::Finite(2));

        let tight = ConfigurationAutomaton::with_cap(&automaton, 2);
        assert_eq!(SupremumFinder::new(&tight).find_supremum(1), Value::Infinite);
        assert_eq!(InfimumFinder::new(&tight).find_infimum(1), Value::Infinite);
    }

    /// Unbounded postponement: the counter can grow forever without a
    /// check, so some accepting component holds an unbounded configuration.
    #[test]
    fn unbounded_accepting_components_are_infinite_for_the_supremum() {
        let mut builder = Builder::new(1, 0, &["q", "t"]);
        builder
            .edge("q", 'a', &[(0, CounterOps::INCREMENT)], &[], "q")
            .edge(
                "q",
                'b',
                &[(0, CounterOps::CHECK | CounterOps::RESET)],
                &[],
                "t",
            )
            .edge("t", 'c', &[], &[], "t");
        let automaton = builder.build("q");

        let cfg = ConfigurationAutomaton::with_cap(&automaton, 4);
        assert_eq!(SupremumFinder::new(&cfg).find_supremum(3), Value::Infinite);
        // the infimum is reached by checking immediately
        assert_eq!(InfimumFinder::new(&cfg).find_infimum(3), Value::Finite(0));
    }

    #[test]
    fn the_extremum_ranges_over_all_accepting_components() {
        // two discharging branches checking 1 and 3
        let mut builder = Builder::new(1, 1, &["q", "p1", "p3", "p3s", "t1", "t3"]);
        builder
            .edge("q", 'a', &[(0, CounterOps::INCREMENT)], &[], "p1")
            .edge(
                "p1",
                'b',
                &[(0, CounterOps::CHECK | CounterOps::RESET)],
                &[0],
                "t1",
            )
            .edge("t1", 'c', &[], &[0], "t1")
            .edge("q", 'a', &[(0, CounterOps::INCREMENT)], &[], "p3")
            .edge("p3", 'a', &[(0, CounterOps::INCREMENT)], &[], "p3s")
            .edge(
                "p3s",
                'b',
                &[(0, CounterOps::INCREMENT | CounterOps::CHECK | CounterOps::RESET)],
                &[0],
                "t3",
            )
            .edge("t3", 'c', &[], &[0], "t3");
        let automaton = builder.build("q");

        let cfg = ConfigurationAutomaton::with_cap(&automaton, 9);
        assert_eq!(SupremumFinder::new(&cfg).find_supremum(8), Value::Finite(3));
        assert_eq!(InfimumFinder::new(&cfg).find_infimum(8), Value::Finite(1));
    }
}
