//! Products of transition systems and of counter automata.

use biodivine_lib_bdd::Bdd;
use fixedbitset::FixedBitSet;

use super::buchi::AtomicPropositions;
use super::counter::{CounterAutomaton, CounterLabel};
use super::translator::Letter;
use super::ts::{Transition, TransitionSystem};

/// Combines and splits the labels of a product.
///
/// `build` combined with `lhs` and `rhs` are inverses of each other;
/// `matches` decides which pairs of component transitions give rise to a
/// product transition at all.
pub trait LabelProduct<A, B> {
    type Output: Clone;

    fn matches(&self, lhs: &A, rhs: &B) -> bool;
    fn build(&self, lhs: &A, rhs: &B) -> Self::Output;
    fn lhs(&self, label: &Self::Output) -> A;
    fn rhs(&self, label: &Self::Output) -> B;
}

/// Combines and splits the letters of a counter-automaton product.
pub trait LetterProduct<A, B> {
    type Output: Clone;

    fn matches(&self, lhs: &A, rhs: &B) -> bool;
    fn build(&self, lhs: &A, rhs: &B) -> Self::Output;
    fn lhs(&self, letter: &Self::Output) -> A;
    fn rhs(&self, letter: &Self::Output) -> B;
}

/// The pointwise product of two transition systems.
///
/// The product does not own its operands; its state space is the cartesian
/// product and a transition exists for every matching pair of component
/// transitions.
pub struct ProductTransitionSystem<'l, 'r, L, R, H> {
    lhs: &'l L,
    rhs: &'r R,
    helper: H,
}

impl<'l, 'r, L, R, H> ProductTransitionSystem<'l, 'r, L, R, H> {
    pub fn new(lhs: &'l L, rhs: &'r R, helper: H) -> Self {
        Self { lhs, rhs, helper }
    }
}

impl<'l, 'r, L, R, H> TransitionSystem for ProductTransitionSystem<'l, 'r, L, R, H>
where
    L: TransitionSystem,
    R: TransitionSystem,
    H: LabelProduct<L::Label, R::Label>,
{
    type State = (L::State, R::State);
    type Label = H::Output;

    fn has_state(&self, state: &Self::State) -> bool {
        self.lhs.has_state(&state.0) && self.rhs.has_state(&state.1)
    }

    fn states<'a>(&'a self) -> Box<dyn Iterator<Item = Self::State> + 'a> {
        let right: Vec<R::State> = self.rhs.states().collect();
        Box::new(self.lhs.states().flat_map(move |p| {
            let p = p.clone();
            right
                .clone()
                .into_iter()
                .map(move |q| (p.clone(), q))
        }))
    }

    fn successors<'a>(
        &'a self,
        state: &Self::State,
    ) -> Box<dyn Iterator<Item = Transition<Self::State, Self::Label>> + 'a> {
        let (p, q) = state.clone();
        let right: Vec<_> = self.rhs.successors(&q).collect();
        let mut transitions = Vec::new();
        for lt in self.lhs.successors(&p) {
            for rt in &right {
                if self.helper.matches(lt.label(), rt.label()) {
                    transitions.push(Transition::new(
                        (p.clone(), q.clone()),
                        self.helper.build(lt.label(), rt.label()),
                        (lt.target().clone(), rt.target().clone()),
                    ));
                }
            }
        }
        Box::new(transitions.into_iter())
    }

    fn display_state(&self, state: &Self::State) -> String {
        format!(
            "({}, {})",
            self.lhs.display_state(&state.0),
            self.rhs.display_state(&state.1)
        )
    }

    fn display_label(&self, label: &Self::Label) -> String {
        format!(
            "{} / {}",
            self.lhs.display_label(&self.helper.lhs(label)),
            self.rhs.display_label(&self.helper.rhs(label))
        )
    }
}

/// The label product of two counter automata: letters combine through an
/// inner letter product, operation vectors are concatenated, and the
/// right-hand acceptance indices are shifted past the left operand's sets.
pub struct CounterLabelProduct<P> {
    letters: P,
    counter_offset: usize,
    acceptance_offset: usize,
}

impl<P> CounterLabelProduct<P> {
    pub fn new(letters: P, counter_offset: usize, acceptance_offset: usize) -> Self {
        Self {
            letters,
            counter_offset,
            acceptance_offset,
        }
    }
}

impl<A, B, P> LabelProduct<CounterLabel<A>, CounterLabel<B>> for CounterLabelProduct<P>
where
    A: Clone,
    B: Clone,
    P: LetterProduct<A, B>,
{
    type Output = CounterLabel<P::Output>;

    fn matches(&self, lhs: &CounterLabel<A>, rhs: &CounterLabel<B>) -> bool {
        self.letters.matches(lhs.letter(), rhs.letter())
    }

    fn build(&self, lhs: &CounterLabel<A>, rhs: &CounterLabel<B>) -> Self::Output {
        debug_assert_eq!(lhs.num_counters(), self.counter_offset);
        let mut operations = Vec::with_capacity(lhs.num_counters() + rhs.num_counters());
        operations.extend_from_slice(lhs.operations());
        operations.extend_from_slice(rhs.operations());

        let total = self.acceptance_offset + rhs.acceptance().len();
        let mut acceptance = lhs.acceptance().clone();
        acceptance.grow(total);
        for set in rhs.acceptance().ones() {
            acceptance.insert(self.acceptance_offset + set);
        }

        CounterLabel::new(
            self.letters.build(lhs.letter(), rhs.letter()),
            operations,
            acceptance,
        )
    }

    fn lhs(&self, label: &Self::Output) -> CounterLabel<A> {
        let operations = label.operations()[..self.counter_offset].to_vec();
        let mut acceptance = FixedBitSet::with_capacity(self.acceptance_offset);
        for set in label.acceptance().ones().filter(|&s| s < self.acceptance_offset) {
            acceptance.insert(set);
        }
        CounterLabel::new(self.letters.lhs(label.letter()), operations, acceptance)
    }

    fn rhs(&self, label: &Self::Output) -> CounterLabel<B> {
        let operations = label.operations()[self.counter_offset..].to_vec();
        let total = label.acceptance().len();
        let mut acceptance =
            FixedBitSet::with_capacity(total.saturating_sub(self.acceptance_offset));
        for set in label.acceptance().ones().filter(|&s| s >= self.acceptance_offset) {
            acceptance.insert(set - self.acceptance_offset);
        }
        CounterLabel::new(self.letters.rhs(label.letter()), operations, acceptance)
    }
}

/// Letters of a formula automaton paired with BDD conditions of a model
/// automaton; a pair matches when the conjunction is satisfiable.
pub struct SymbolicLetters<'d> {
    props: &'d AtomicPropositions,
}

impl<'d> SymbolicLetters<'d> {
    pub fn new(props: &'d AtomicPropositions) -> Self {
        Self { props }
    }
}

impl LetterProduct<Letter, Bdd> for SymbolicLetters<'_> {
    type Output = (Letter, Bdd);

    fn matches(&self, lhs: &Letter, rhs: &Bdd) -> bool {
        !lhs.condition(self.props).and(rhs).is_false()
    }

    fn build(&self, lhs: &Letter, rhs: &Bdd) -> Self::Output {
        (lhs.clone(), rhs.clone())
    }

    fn lhs(&self, letter: &Self::Output) -> Letter {
        letter.0.clone()
    }

    fn rhs(&self, letter: &Self::Output) -> Bdd {
        letter.1.clone()
    }
}

/// The product of two counter automata. Counters of the right operand come
/// after those of the left, and its acceptance sets are shifted by the left
/// operand's count.
///
/// # Panics
///
/// Panics if either operand has no initial state.
pub fn product_automaton<'l, 'r, SL, SR, TL, TR, P>(
    lhs: &'l CounterAutomaton<SL, TL>,
    rhs: &'r CounterAutomaton<SR, TR>,
    letters: P,
) -> CounterAutomaton<P::Output, ProductTransitionSystem<'l, 'r, TL, TR, CounterLabelProduct<P>>>
where
    SL: Clone,
    SR: Clone,
    TL: TransitionSystem<Label = CounterLabel<SL>>,
    TR: TransitionSystem<Label = CounterLabel<SR>>,
    P: LetterProduct<SL, SR>,
{
    let helper = CounterLabelProduct::new(letters, lhs.num_counters(), lhs.num_acceptance_sets());
    let ts = ProductTransitionSystem::new(lhs.ts(), rhs.ts(), helper);
    let mut automaton = CounterAutomaton::new(
        lhs.num_counters() + rhs.num_counters(),
        lhs.num_acceptance_sets() + rhs.num_acceptance_sets(),
        ts,
    );
    let initial = (
        lhs.initial_state()
            .expect("product operands need initial states")
            .clone(),
        rhs.initial_state()
            .expect("product operands need initial states")
            .clone(),
    );
    automaton.set_initial_state(initial);
    automaton
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::counter::{CounterOpSeq, CounterOps};
    use crate::automata::ts::NondeterministicTransitionSystem;

    /// Letters paired without any compatibility constraint.
    struct FreePairs;

    impl LetterProduct<char, char> for FreePairs {
        type Output = (char, char);

        fn matches(&self, _: &char, _: &char) -> bool {
            true
        }

        fn build(&self, lhs: &char, rhs: &char) -> Self::Output {
            (*lhs, *rhs)
        }

        fn lhs(&self, letter: &Self::Output) -> char {
            letter.0
        }

        fn rhs(&self, letter: &Self::Output) -> char {
            letter.1
        }
    }

    fn label(
        letter: char,
        counters: usize,
        ops: &[(usize, CounterOps)],
        sets: usize,
        acc: &[usize],
    ) -> CounterLabel<char> {
        let mut operations = vec![CounterOpSeq::default(); counters];
        for &(counter, op) in ops {
            operations[counter].push(op);
        }
        let mut marks = FixedBitSet::with_capacity(sets);
        for &set in acc {
            marks.insert(set);
        }
        CounterLabel::new(letter, operations, marks)
    }

    #[test]
    fn counter_labels_concatenate_and_shift() {
        let helper = CounterLabelProduct::new(FreePairs, 1, 2);
        let left = label('a', 1, &[(0, CounterOps::INCREMENT)], 2, &[1]);
        let right = label('b', 2, &[(1, CounterOps::RESET)], 1, &[0]);

        let combined = helper.build(&left, &right);
        assert_eq!(combined.num_counters(), 3);
        assert_eq!(
            combined.counter_operations(0).as_slice(),
            &[CounterOps::INCREMENT]
        );
        assert!(combined.counter_operations(1).is_empty());
        assert_eq!(combined.counter_operations(2).as_slice(), &[CounterOps::RESET]);
        assert!(combined.in_acceptance_set(1));
        assert!(combined.in_acceptance_set(2));
        assert!(!combined.in_acceptance_set(0));

        assert_eq!(helper.lhs(&combined), left);
        assert_eq!(helper.rhs(&combined), right);
    }

    #[test]
    fn products_pair_matching_transitions() {
        let mut left_ts = NondeterministicTransitionSystem::new();
        left_ts.add_state("p");
        left_ts.add_state("q");
        left_ts.add_transition(&"p", label('a', 0, &[], 1, &[0]), &"q");
        left_ts.add_transition(&"p", label('b', 0, &[], 1, &[]), &"p");
        let mut left = CounterAutomaton::new(0, 1, left_ts);
        left.set_initial_state("p");

        let mut right_ts = NondeterministicTransitionSystem::new();
        right_ts.add_state("m");
        right_ts.add_transition(&"m", label('x', 1, &[(0, CounterOps::INCREMENT)], 0, &[]), &"m");
        let mut right = CounterAutomaton::new(1, 0, right_ts);
        right.set_initial_state("m");

        let product = product_automaton(&left, &right, FreePairs);
        assert_eq!(product.num_counters(), 1);
        assert_eq!(product.num_acceptance_sets(), 1);
        assert_eq!(product.initial_state(), Some(&("p", "m")));

        let transitions: Vec<_> = product.ts().successors(&("p", "m")).collect();
        assert_eq!(transitions.len(), 2);
        for t in &transitions {
            assert_eq!(t.label().num_counters(), 1);
        }
    }

    #[test]
    fn symbolic_letters_filter_incompatible_pairs() {
        let props = AtomicPropositions::new(&["a", "b"]);
        let letters = SymbolicLetters::new(&props);

        let a_letter = Letter::from_literals(vec![("a".to_owned(), true)]).unwrap();
        let cond = props.condition("a & !b");
        assert!(letters.matches(&a_letter, &cond));

        let not_a = Letter::from_literals(vec![("a".to_owned(), false)]).unwrap();
        assert!(!letters.matches(&not_a, &cond));

        let top = Letter::top();
        assert!(letters.matches(&top, &cond));
        assert!(!letters.matches(&top, &props.bottom()));
    }
}
