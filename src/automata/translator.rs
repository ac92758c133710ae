//! Tableau-style translation from CLTL formulas to counter automata.
//!
//! The translator reduces pseudo-nodes (sets of subformulas, kept sorted by
//! height) through epsilon steps until only literals and next-guarded
//! obligations remain, then fires actual transitions consuming the literals.
//! Cost operators introduce counters whose actions ride on the epsilon
//! steps; folding an epsilon path into the subsequent firing yields the
//! letter transitions of the final automaton.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use fixedbitset::FixedBitSet;
use log::{debug, info, warn};

use crate::logic::{BinaryOp, FormulaFactory, FormulaId, NaryOp, Term, UnaryOp};

use super::buchi::AtomicPropositions;
use super::counter::{CounterAutomaton, CounterLabel, CounterOpSeq, CounterOps};
use super::ts::NondeterministicTransitionSystem;

/// A conjunction of proposition literals, consumed by one transition.
///
/// The empty letter is satisfied by every valuation. Letters that would be
/// unsatisfiable are never constructed; see [`Letter::from_literals`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Letter {
    literals: Vec<(String, bool)>,
}

impl Letter {
    /// The letter satisfied by every valuation.
    pub fn top() -> Self {
        Self::default()
    }

    /// Builds a letter from literals, or `None` when the conjunction is
    /// unsatisfiable (it contains a proposition in both polarities).
    pub fn from_literals<I: IntoIterator<Item = (String, bool)>>(literals: I) -> Option<Self> {
        let mut collected: Vec<(String, bool)> = Vec::new();
        for (name, positive) in literals {
            match collected.iter().find(|(n, _)| *n == name) {
                Some((_, p)) if *p != positive => return None,
                Some(_) => {}
                None => collected.push((name, positive)),
            }
        }
        collected.sort();
        Some(Self {
            literals: collected,
        })
    }

    pub fn literals(&self) -> &[(String, bool)] {
        &self.literals
    }

    pub fn is_top(&self) -> bool {
        self.literals.is_empty()
    }

    /// Folds the conjuncts into a BDD over the registered propositions.
    /// Unregistered propositions make the letter unsatisfiable and are
    /// reported as a warning.
    pub fn condition(&self, props: &AtomicPropositions) -> biodivine_lib_bdd::Bdd {
        let mut bdd = props.top();
        for (name, positive) in &self.literals {
            match props.variable(name) {
                Some(var) => bdd = bdd.and(&props.literal(var, *positive)),
                None => {
                    warn!("proposition {} is not registered in the dictionary", name);
                    return props.bottom();
                }
            }
        }
        bdd
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.literals.is_empty() {
            return write!(f, "true");
        }
        for (i, (name, positive)) in self.literals.iter().enumerate() {
            if i > 0 {
                write!(f, " & ")?;
            }
            if !positive {
                write!(f, "!")?;
            }
            write!(f, "{}", name)?;
        }
        Ok(())
    }
}

/// The transition system type of a translated automaton. States are the
/// rendered pseudo-nodes.
pub type TranslatedTs = NondeterministicTransitionSystem<String, CounterLabel<Letter>>;

/// The counter automaton produced by the translator.
pub type TranslatedAutomaton = CounterAutomaton<Letter, TranslatedTs>;

type NodeId = usize;

/// A pseudo-node: subformulas sorted by height (ties by identity), plus the
/// reduction flag.
struct Node {
    terms: Vec<FormulaId>,
    reduced: bool,
}

/// An epsilon step between pseudo-nodes.
struct EpsEdge {
    target: NodeId,
    ops: Vec<(usize, CounterOps)>,
    postponed: Option<FormulaId>,
}

/// The firing of a fully reduced pseudo-node: the letter built from its
/// literals (`None` when unsatisfiable) and the node of next-obligations.
struct FireEdge {
    letter: Option<Letter>,
    successor: NodeId,
}

/// Translates CLTL formulas into counter automata.
pub struct CltlTranslator<'f> {
    factory: &'f mut FormulaFactory,
    formula: FormulaId,
    nodes: Vec<Node>,
    index: HashMap<Vec<FormulaId>, NodeId>,
    eps: Vec<Vec<EpsEdge>>,
    fire: Vec<Option<FireEdge>>,
    to_reduce: Vec<NodeId>,
    pending: HashSet<NodeId>,
    to_fire: Vec<NodeId>,
    counters: Vec<FormulaId>,
    counter_index: HashMap<FormulaId, usize>,
    acceptance: Vec<FormulaId>,
    acceptance_index: HashMap<FormulaId, usize>,
}

/// Translates the formula into a counter automaton.
pub fn translate(factory: &mut FormulaFactory, formula: FormulaId) -> TranslatedAutomaton {
    CltlTranslator::new(factory, formula).build_automaton()
}

impl<'f> CltlTranslator<'f> {
    pub fn new(factory: &'f mut FormulaFactory, formula: FormulaId) -> Self {
        let formula = factory.to_nnf(formula);
        Self {
            factory,
            formula,
            nodes: Vec::new(),
            index: HashMap::new(),
            eps: Vec::new(),
            fire: Vec::new(),
            to_reduce: Vec::new(),
            pending: HashSet::new(),
            to_fire: Vec::new(),
            counters: Vec::new(),
            counter_index: HashMap::new(),
            acceptance: Vec::new(),
            acceptance_index: HashMap::new(),
        }
    }

    /// Runs the reduce and fire phases to completion and consolidates the
    /// pseudo-node system into a counter automaton.
    pub fn build_automaton(mut self) -> TranslatedAutomaton {
        let initial = self.build_node(vec![self.formula]);
        self.enqueue_reduction(initial);
        while !self.to_reduce.is_empty() || !self.to_fire.is_empty() {
            self.process_reduce();
            self.process_fire();
        }
        debug!(
            "tableau finished: {} pseudo-nodes, {} counters, {} acceptance sets",
            self.nodes.len(),
            self.counters.len(),
            self.acceptance.len()
        );
        self.consolidate(initial)
    }

    /// Returns the node for the given terms, creating it if necessary.
    /// Terms are deduplicated and kept sorted by height, ties by identity.
    fn build_node(&mut self, mut terms: Vec<FormulaId>) -> NodeId {
        terms.sort_unstable_by_key(|&t| (self.factory.height(t), t));
        terms.dedup();
        if let Some(&id) = self.index.get(&terms) {
            return id;
        }
        let id = self.nodes.len();
        self.index.insert(terms.clone(), id);
        self.nodes.push(Node {
            terms,
            reduced: false,
        });
        self.eps.push(Vec::new());
        self.fire.push(None);
        id
    }

    fn counter_for(&mut self, formula: FormulaId) -> usize {
        if let Some(&k) = self.counter_index.get(&formula) {
            return k;
        }
        let k = self.counters.len();
        self.counters.push(formula);
        self.counter_index.insert(formula, k);
        k
    }

    fn acceptance_for(&mut self, formula: FormulaId) -> usize {
        if let Some(&i) = self.acceptance_index.get(&formula) {
            return i;
        }
        let i = self.acceptance.len();
        self.acceptance.push(formula);
        self.acceptance_index.insert(formula, i);
        i
    }

    fn enqueue_reduction(&mut self, node: NodeId) {
        if !self.nodes[node].reduced && self.pending.insert(node) {
            self.to_reduce.push(node);
        }
    }

    fn process_reduce(&mut self) {
        while let Some(node) = self.to_reduce.pop() {
            self.pending.remove(&node);
            if self.nodes[node].reduced {
                warn!("pseudo-node {} reduced twice", self.node_name(node));
                continue;
            }
            self.nodes[node].reduced = true;

            let successors = self.build_epsilon_successors(node);
            if successors.is_empty() {
                self.to_fire.push(node);
            } else {
                for succ in successors {
                    self.enqueue_reduction(succ);
                }
            }
        }
    }

    /// Reduces the reducible term of greatest height (the last such term of
    /// the sorted list) and returns the epsilon successors, or nothing when
    /// the node only holds literals and next-guarded obligations.
    fn build_epsilon_successors(&mut self, node: NodeId) -> Vec<NodeId> {
        let terms = self.nodes[node].terms.clone();
        let picked = terms.iter().rposition(|&t| {
            matches!(
                self.factory.term(t),
                Term::Binary(_, _, _) | Term::Nary(_, _)
            )
        });
        let position = match picked {
            Some(position) => position,
            None => return Vec::new(),
        };
        let formula = terms[position];
        let mut leftover = terms;
        leftover.remove(position);

        match self.factory.term(formula).clone() {
            Term::Nary(NaryOp::Or, children) => children
                .into_iter()
                .map(|child| {
                    let mut terms = leftover.clone();
                    terms.push(child);
                    self.epsilon(node, terms, vec![], None)
                })
                .collect(),
            Term::Nary(NaryOp::And, children) => {
                let mut terms = leftover;
                terms.extend(children);
                vec![self.epsilon(node, terms, vec![], None)]
            }
            Term::Binary(BinaryOp::Until, left, right) => {
                self.acceptance_for(formula);
                let mut now = leftover.clone();
                now.push(right);
                let first = self.epsilon(node, now, vec![], None);

                let next = self.factory.next(formula);
                let mut later = leftover;
                later.push(left);
                later.push(next);
                let second = self.epsilon(node, later, vec![], Some(formula));
                vec![first, second]
            }
            Term::Binary(BinaryOp::Release, left, right) => {
                let mut now = leftover.clone();
                now.push(left);
                now.push(right);
                let first = self.epsilon(node, now, vec![], None);

                let next = self.factory.next(formula);
                let mut later = leftover;
                later.push(right);
                later.push(next);
                let second = self.epsilon(node, later, vec![], None);
                vec![first, second]
            }
            Term::Binary(BinaryOp::CostUntil, left, right) => {
                self.acceptance_for(formula);
                let counter = self.counter_for(formula);
                let mut now = leftover.clone();
                now.push(right);
                let first = self.epsilon(
                    node,
                    now,
                    vec![(counter, CounterOps::CHECK | CounterOps::RESET)],
                    None,
                );

                let next = self.factory.next(formula);
                let mut later = leftover;
                later.push(left);
                later.push(next);
                let second = self.epsilon(
                    node,
                    later,
                    vec![(counter, CounterOps::INCREMENT)],
                    Some(formula),
                );
                vec![first, second]
            }
            Term::Binary(BinaryOp::CostRelease, left, right) => {
                let counter = self.counter_for(formula);
                let mut now = leftover.clone();
                now.push(left);
                now.push(right);
                let first = self.epsilon(
                    node,
                    now,
                    vec![(counter, CounterOps::CHECK | CounterOps::RESET)],
                    None,
                );

                let next = self.factory.next(formula);
                let mut later = leftover;
                later.push(right);
                later.push(next);
                let second =
                    self.epsilon(node, later, vec![(counter, CounterOps::INCREMENT)], None);
                vec![first, second]
            }
            _ => unreachable!("only binary and n-ary operators are reducible"),
        }
    }

    fn epsilon(
        &mut self,
        source: NodeId,
        terms: Vec<FormulaId>,
        ops: Vec<(usize, CounterOps)>,
        postponed: Option<FormulaId>,
    ) -> NodeId {
        let target = self.build_node(terms);
        self.eps[source].push(EpsEdge {
            target,
            ops,
            postponed,
        });
        target
    }

    fn process_fire(&mut self) {
        while let Some(node) = self.to_fire.pop() {
            if self.fire[node].is_some() {
                continue;
            }
            let mut literals = Vec::new();
            let mut obligations = Vec::new();
            let mut satisfiable = true;
            for &term in &self.nodes[node].terms {
                match self.factory.term(term) {
                    Term::Unary(UnaryOp::Next, operand) => obligations.push(*operand),
                    Term::Atomic(name) => literals.push((name.clone(), true)),
                    Term::Constant(true) => {}
                    Term::Constant(false) => satisfiable = false,
                    Term::Unary(UnaryOp::Not, operand) => match self.factory.term(*operand) {
                        Term::Atomic(name) => literals.push((name.clone(), false)),
                        _ => unreachable!("negation below literals after NNF"),
                    },
                    _ => unreachable!("reducible term survived the reduce phase"),
                }
            }
            let letter = if satisfiable {
                Letter::from_literals(literals)
            } else {
                None
            };
            let successor = self.build_node(obligations);
            self.fire[node] = Some(FireEdge { letter, successor });
            self.enqueue_reduction(successor);
        }
    }

    fn node_name(&self, node: NodeId) -> String {
        let mut out = String::from("{");
        for (i, &term) in self.nodes[node].terms.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&self.factory.display(term).to_string());
        }
        out.push('}');
        out
    }

    /// Collects every epsilon path from the node to a fully reduced
    /// pseudo-node, folding counter actions in path order and accumulating
    /// the postponed formulas.
    fn epsilon_paths(&self, node: NodeId) -> Vec<EpsPath> {
        let mut paths = Vec::new();
        let mut current = EpsPath {
            target: node,
            ops: Vec::new(),
            postponed: HashSet::new(),
        };
        self.collect_paths(node, &mut current, &mut paths);
        paths
    }

    fn collect_paths(&self, node: NodeId, current: &mut EpsPath, paths: &mut Vec<EpsPath>) {
        if self.eps[node].is_empty() {
            let mut done = current.clone();
            done.target = node;
            paths.push(done);
            return;
        }
        for edge in &self.eps[node] {
            let ops_len = current.ops.len();
            current.ops.extend_from_slice(&edge.ops);
            let newly_postponed = edge
                .postponed
                .filter(|f| current.postponed.insert(*f));
            self.collect_paths(edge.target, current, paths);
            current.ops.truncate(ops_len);
            if let Some(f) = newly_postponed {
                current.postponed.remove(&f);
            }
        }
    }

    /// Builds the counter automaton over the consolidated pseudo-nodes: the
    /// initial node and every firing successor become states, and each
    /// epsilon path combined with its terminal firing becomes a transition.
    fn consolidate(self, initial: NodeId) -> TranslatedAutomaton {
        let num_counters = self.counters.len();
        let num_acceptance_sets = self.acceptance.len();
        let mut ts = TranslatedTs::new();
        let mut registrations = Vec::new();

        let mut queue = VecDeque::new();
        let mut enqueued = HashSet::new();
        ts.add_state(self.node_name(initial));
        queue.push_back(initial);
        enqueued.insert(initial);

        while let Some(node) = queue.pop_front() {
            let source_name = self.node_name(node);
            for path in self.epsilon_paths(node) {
                let fire = self.fire[path.target]
                    .as_ref()
                    .expect("reduced pseudo-node was never fired");
                let letter = match &fire.letter {
                    Some(letter) => letter.clone(),
                    None => continue,
                };

                let mut operations = vec![CounterOpSeq::default(); num_counters];
                for &(counter, op) in &path.ops {
                    operations[counter].push(op);
                }
                let mut acceptance = FixedBitSet::with_capacity(num_acceptance_sets);
                for (set, formula) in self.acceptance.iter().enumerate() {
                    if !path.postponed.contains(formula) {
                        acceptance.insert(set);
                    }
                }

                let successor = fire.successor;
                let successor_name = self.node_name(successor);
                if enqueued.insert(successor) {
                    ts.add_state(successor_name.clone());
                    queue.push_back(successor);
                }
                let sets: Vec<usize> = acceptance.ones().collect();
                let label = CounterLabel::new(letter, operations, acceptance);
                let transition = ts.add_transition(&source_name, label, &successor_name);
                for set in sets {
                    registrations.push((set, transition.clone()));
                }
            }
        }

        info!(
            "translated automaton: {} states, {} transitions, {} counters, {} acceptance sets",
            ts.num_states(),
            ts.num_transitions(),
            num_counters,
            num_acceptance_sets
        );

        let mut automaton = CounterAutomaton::new(num_counters, num_acceptance_sets, ts);
        for (set, transition) in registrations {
            automaton.add_acceptance_transition(set, transition);
        }
        automaton.set_initial_state(self.node_name(initial));
        automaton
    }
}

#[derive(Clone)]
struct EpsPath {
    target: NodeId,
    ops: Vec<(usize, CounterOps)>,
    postponed: HashSet<FormulaId>,
}
