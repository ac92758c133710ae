//! Terms of the Cost LTL formula algebra.

use std::fmt;

/// The identity of a term inside its [`FormulaFactory`](super::FormulaFactory).
///
/// Ids are only meaningful together with the factory that allocated them.
/// Since the factory hash-conses its terms, two ids are equal if and only if
/// the terms they denote are syntactically equal (up to commutativity of
/// conjunction and disjunction).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormulaId(pub(crate) u32);

impl FormulaId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A unary connective.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    /// Negation.
    Not,
    /// The temporal next operator.
    Next,
}

/// A binary temporal connective.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    /// The until operator.
    Until,
    /// The release operator.
    Release,
    /// The cost variant of until, written `UN`.
    CostUntil,
    /// The cost variant of release, written `RN`.
    CostRelease,
}

/// A commutative n-ary connective.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum NaryOp {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Not => write!(f, "!"),
            Self::Next => write!(f, "X"),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Until => write!(f, "U"),
            Self::Release => write!(f, "R"),
            Self::CostUntil => write!(f, "UN"),
            Self::CostRelease => write!(f, "RN"),
        }
    }
}

impl fmt::Display for NaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "&&"),
            Self::Or => write!(f, "||"),
        }
    }
}

/// A term of the formula algebra.
///
/// N-ary children are flattened and sorted by id, so that the multiset
/// equality of conjunctions and disjunctions collapses to plain structural
/// equality of the child vectors.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Term {
    /// An atomic proposition with its name.
    Atomic(String),
    /// A boolean constant.
    Constant(bool),
    /// A unary connective applied to a term.
    Unary(UnaryOp, FormulaId),
    /// A binary temporal connective applied to two terms.
    Binary(BinaryOp, FormulaId, FormulaId),
    /// A commutative connective applied to two or more terms.
    Nary(NaryOp, Vec<FormulaId>),
}
