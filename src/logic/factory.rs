//! The hash-consing formula factory.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use super::formula::{BinaryOp, FormulaId, NaryOp, Term, UnaryOp};
use crate::Error;

/// Cached facts about an allocated term.
struct TermEntry {
    term: Term,
    height: u32,
    propositional: bool,
    nnf: bool,
    infltl: bool,
    supltl: bool,
}

/// The single owner of all terms of a formula algebra.
///
/// Every constructor searches the index for a syntactically equal term and
/// hands out the existing id when one is found, so id equality is syntactic
/// equality. Conjunction and disjunction children are flattened and sorted,
/// which makes the commutative equality of `a && b` and `b && a` structural.
///
/// Terms live as long as the factory; dropping the factory drops the whole
/// arena at once. Formulas are acyclic, so no cycle handling is needed.
#[derive(Default)]
pub struct FormulaFactory {
    entries: Vec<TermEntry>,
    index: HashMap<Term, FormulaId>,
}

impl FormulaFactory {
    /// Creates an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of distinct live terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no term has been allocated yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn intern(&mut self, term: Term) -> FormulaId {
        if let Some(&id) = self.index.get(&term) {
            return id;
        }
        let (height, propositional, nnf, infltl, supltl) = match &term {
            Term::Atomic(_) | Term::Constant(_) => (1, true, true, true, true),
            Term::Unary(op, x) => {
                let e = self.entry(*x);
                let nnf = match op {
                    UnaryOp::Not => {
                        matches!(e.term, Term::Atomic(_) | Term::Constant(_))
                    }
                    UnaryOp::Next => e.nnf,
                };
                (e.height + 1, e.propositional && *op == UnaryOp::Not, nnf, e.infltl, e.supltl)
            }
            Term::Binary(op, l, r) => {
                let (le, re) = (self.entry(*l), self.entry(*r));
                let infltl = le.infltl && re.infltl && *op != BinaryOp::CostRelease;
                let supltl = le.supltl && re.supltl && *op != BinaryOp::CostUntil;
                (
                    le.height.max(re.height) + 1,
                    false,
                    le.nnf && re.nnf,
                    infltl,
                    supltl,
                )
            }
            Term::Nary(_, children) => {
                let mut height = 0;
                let mut propositional = true;
                let mut nnf = true;
                let mut infltl = true;
                let mut supltl = true;
                for &c in children {
                    let e = self.entry(c);
                    height = height.max(e.height);
                    propositional &= e.propositional;
                    nnf &= e.nnf;
                    infltl &= e.infltl;
                    supltl &= e.supltl;
                }
                (height + 1, propositional, nnf, infltl, supltl)
            }
        };
        let id = FormulaId(self.entries.len() as u32);
        self.entries.push(TermEntry {
            term: term.clone(),
            height,
            propositional,
            nnf,
            infltl,
            supltl,
        });
        self.index.insert(term, id);
        id
    }

    /// Returns the term behind an id.
    pub fn term(&self, id: FormulaId) -> &Term {
        &self.entry(id).term
    }

    /// Returns the height of a term: 1 for atoms and constants, otherwise
    /// one more than the highest operand.
    pub fn height(&self, id: FormulaId) -> u32 {
        self.entry(id).height
    }

    /// Returns whether the term contains no temporal operator.
    pub fn is_propositional(&self, id: FormulaId) -> bool {
        self.entry(id).propositional
    }

    /// Returns whether negation occurs on atoms and constants only.
    pub fn is_nnf(&self, id: FormulaId) -> bool {
        self.entry(id).nnf
    }

    /// Returns whether the term is in CLTL[≤], i.e. free of cost release.
    pub fn is_infltl(&self, id: FormulaId) -> bool {
        self.entry(id).infltl
    }

    /// Returns whether the term is in CLTL[>], i.e. free of cost until.
    pub fn is_supltl(&self, id: FormulaId) -> bool {
        self.entry(id).supltl
    }

    /// Returns whether the term contains no cost operator at all.
    pub fn is_ltl(&self, id: FormulaId) -> bool {
        self.entry(id).infltl && self.entry(id).supltl
    }

    pub fn atomic(&mut self, name: &str) -> FormulaId {
        self.intern(Term::Atomic(name.to_owned()))
    }

    pub fn constant(&mut self, value: bool) -> FormulaId {
        self.intern(Term::Constant(value))
    }

    /// Applies an arbitrary unary connective.
    pub fn unary(&mut self, op: UnaryOp, f: FormulaId) -> FormulaId {
        self.intern(Term::Unary(op, f))
    }

    /// Applies an arbitrary binary temporal connective.
    pub fn binary(&mut self, op: BinaryOp, l: FormulaId, r: FormulaId) -> FormulaId {
        self.intern(Term::Binary(op, l, r))
    }

    pub fn not(&mut self, f: FormulaId) -> FormulaId {
        self.intern(Term::Unary(UnaryOp::Not, f))
    }

    pub fn next(&mut self, f: FormulaId) -> FormulaId {
        self.intern(Term::Unary(UnaryOp::Next, f))
    }

    pub fn until(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        self.intern(Term::Binary(BinaryOp::Until, l, r))
    }

    pub fn release(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        self.intern(Term::Binary(BinaryOp::Release, l, r))
    }

    pub fn cost_until(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        self.intern(Term::Binary(BinaryOp::CostUntil, l, r))
    }

    pub fn cost_release(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        self.intern(Term::Binary(BinaryOp::CostRelease, l, r))
    }

    pub fn and(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        self.nary(NaryOp::And, vec![l, r])
    }

    pub fn or(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        self.nary(NaryOp::Or, vec![l, r])
    }

    /// Builds a conjunction or disjunction from the given children,
    /// flattening nested applications of the same operator and sorting the
    /// result so that equal multisets of children share one term.
    pub fn nary(&mut self, op: NaryOp, children: Vec<FormulaId>) -> FormulaId {
        let mut flat = Vec::with_capacity(children.len());
        for c in children {
            match self.term(c) {
                Term::Nary(inner, grandchildren) if *inner == op => {
                    flat.extend_from_slice(grandchildren);
                }
                _ => flat.push(c),
            }
        }
        flat.sort_unstable();
        match flat.len() {
            0 => self.constant(op == NaryOp::And),
            1 => flat[0],
            _ => self.intern(Term::Nary(op, flat)),
        }
    }

    /// `l -> r`, as `!l || r`.
    pub fn imply(&mut self, l: FormulaId, r: FormulaId) -> FormulaId {
        let nl = self.not(l);
        self.or(nl, r)
    }

    /// `F f`, as `true U f`.
    pub fn finally(&mut self, f: FormulaId) -> FormulaId {
        let t = self.constant(true);
        self.until(t, f)
    }

    /// `G f`, as `false R f`.
    pub fn globally(&mut self, f: FormulaId) -> FormulaId {
        let b = self.constant(false);
        self.release(b, f)
    }

    /// `FN f`, as `false UN f`.
    pub fn cost_finally(&mut self, f: FormulaId) -> FormulaId {
        let b = self.constant(false);
        self.cost_until(b, f)
    }

    /// `GN f`, as `true RN f`.
    pub fn cost_globally(&mut self, f: FormulaId) -> FormulaId {
        let t = self.constant(true);
        self.cost_release(t, f)
    }

    /// Returns an equivalent formula in negation normal form, with negation
    /// pushed down to atoms and constants by the standard dualities.
    pub fn to_nnf(&mut self, id: FormulaId) -> FormulaId {
        match self.term(id).clone() {
            Term::Atomic(_) | Term::Constant(_) => id,
            Term::Unary(UnaryOp::Not, x) => self.negate_nnf(x),
            Term::Unary(UnaryOp::Next, x) => {
                let x = self.to_nnf(x);
                self.next(x)
            }
            Term::Binary(op, l, r) => {
                let l = self.to_nnf(l);
                let r = self.to_nnf(r);
                self.intern(Term::Binary(op, l, r))
            }
            Term::Nary(op, children) => {
                let children = children.into_iter().map(|c| self.to_nnf(c)).collect();
                self.nary(op, children)
            }
        }
    }

    /// Normal form of the negation of `id`.
    fn negate_nnf(&mut self, id: FormulaId) -> FormulaId {
        match self.term(id).clone() {
            Term::Atomic(_) => self.not(id),
            Term::Constant(value) => self.constant(!value),
            Term::Unary(UnaryOp::Not, x) => self.to_nnf(x),
            Term::Unary(UnaryOp::Next, x) => {
                let x = self.negate_nnf(x);
                self.next(x)
            }
            Term::Binary(op, l, r) => {
                let l = self.negate_nnf(l);
                let r = self.negate_nnf(r);
                let dual = match op {
                    BinaryOp::Until => BinaryOp::Release,
                    BinaryOp::Release => BinaryOp::Until,
                    BinaryOp::CostUntil => BinaryOp::CostRelease,
                    BinaryOp::CostRelease => BinaryOp::CostUntil,
                };
                self.intern(Term::Binary(dual, l, r))
            }
            Term::Nary(op, children) => {
                let children = children.into_iter().map(|c| self.negate_nnf(c)).collect();
                let dual = match op {
                    NaryOp::And => NaryOp::Or,
                    NaryOp::Or => NaryOp::And,
                };
                self.nary(dual, children)
            }
        }
    }

    /// Returns an equivalent formula in disjunctive normal form.
    ///
    /// The formula is first normalised to NNF, then conjunction is
    /// distributed over disjunction. Temporal subterms are treated as opaque
    /// leaves and not rewritten.
    pub fn to_dnf(&mut self, id: FormulaId) -> FormulaId {
        let nnf = self.to_nnf(id);
        let clauses = self.dnf_clauses(nnf);
        let disjuncts = clauses
            .into_iter()
            .map(|clause| self.nary(NaryOp::And, clause))
            .collect();
        self.nary(NaryOp::Or, disjuncts)
    }

    fn dnf_clauses(&mut self, id: FormulaId) -> Vec<Vec<FormulaId>> {
        match self.term(id).clone() {
            Term::Nary(NaryOp::Or, children) => children
                .into_iter()
                .flat_map(|c| self.dnf_clauses(c))
                .collect(),
            Term::Nary(NaryOp::And, children) => {
                let mut clauses: Vec<Vec<FormulaId>> = vec![vec![]];
                for c in children {
                    let child_clauses = self.dnf_clauses(c);
                    let mut next = Vec::with_capacity(clauses.len() * child_clauses.len());
                    for prefix in &clauses {
                        for suffix in &child_clauses {
                            let mut clause = prefix.clone();
                            clause.extend_from_slice(suffix);
                            next.push(clause);
                        }
                    }
                    clauses = next;
                }
                clauses
            }
            _ => vec![vec![id]],
        }
    }

    /// Collects the names of all atomic propositions of the formula.
    pub fn atoms(&self, id: FormulaId) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        self.collect_atoms(id, &mut set);
        set
    }

    fn collect_atoms(&self, id: FormulaId, set: &mut BTreeSet<String>) {
        match self.term(id) {
            Term::Atomic(name) => {
                set.insert(name.clone());
            }
            Term::Constant(_) => {}
            Term::Unary(_, x) => self.collect_atoms(*x, set),
            Term::Binary(_, l, r) => {
                self.collect_atoms(*l, set);
                self.collect_atoms(*r, set);
            }
            Term::Nary(_, children) => {
                for &c in children {
                    self.collect_atoms(c, set);
                }
            }
        }
    }

    /// Renders the formula in the plain LTL text representation understood
    /// by external LTL tooling.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedCostOperator`] if the formula contains a
    /// cost operator, which has no plain LTL counterpart.
    pub fn to_ltl(&self, id: FormulaId) -> Result<String, Error> {
        let mut out = String::new();
        self.write_ltl(id, &mut out)?;
        Ok(out)
    }

    fn write_ltl(&self, id: FormulaId, out: &mut String) -> Result<(), Error> {
        match self.term(id) {
            Term::Atomic(name) => out.push_str(name),
            Term::Constant(true) => out.push_str("true"),
            Term::Constant(false) => out.push_str("false"),
            Term::Unary(op, x) => {
                out.push_str(&op.to_string());
                out.push('(');
                self.write_ltl(*x, out)?;
                out.push(')');
            }
            Term::Binary(op @ (BinaryOp::Until | BinaryOp::Release), l, r) => {
                out.push('(');
                self.write_ltl(*l, out)?;
                out.push_str(&format!(") {} (", op));
                self.write_ltl(*r, out)?;
                out.push(')');
            }
            Term::Binary(_, _, _) => return Err(Error::UnsupportedCostOperator),
            Term::Nary(op, children) => {
                for (i, &c) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(&format!(" {} ", op));
                    }
                    out.push('(');
                    self.write_ltl(c, out)?;
                    out.push(')');
                }
            }
        }
        Ok(())
    }

    /// Returns a displayable view of the formula.
    pub fn display(&self, id: FormulaId) -> FormulaDisplay<'_> {
        FormulaDisplay { factory: self, id }
    }
}

impl FormulaFactory {
    fn entry(&self, id: FormulaId) -> &TermEntry {
        &self.entries[id.index()]
    }
}

/// Displays a formula in the concrete CLTL syntax.
pub struct FormulaDisplay<'f> {
    factory: &'f FormulaFactory,
    id: FormulaId,
}

impl fmt::Display for FormulaDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.factory.fmt_term(self.id, f)
    }
}

impl FormulaFactory {
    fn fmt_term(&self, id: FormulaId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term(id) {
            Term::Atomic(name) => write!(f, "{}", name),
            Term::Constant(true) => write!(f, "true"),
            Term::Constant(false) => write!(f, "false"),
            Term::Unary(op, x) => {
                write!(f, "{}(", op)?;
                self.fmt_term(*x, f)?;
                write!(f, ")")
            }
            Term::Binary(op, l, r) => {
                write!(f, "(")?;
                self.fmt_term(*l, f)?;
                write!(f, ") {} (", op)?;
                self.fmt_term(*r, f)?;
                write!(f, ")")
            }
            Term::Nary(op, children) => {
                for (i, &c) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    write!(f, "(")?;
                    self.fmt_term(c, f)?;
                    write!(f, ")")?;
                }
                Ok(())
            }
        }
    }
}
