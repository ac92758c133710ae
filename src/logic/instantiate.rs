//! Instantiation of cost operators at a fixed bound.
//!
//! Instantiating a CLTL formula at a natural number n yields a pure LTL
//! formula that holds on a word exactly when the cost formula holds with
//! bound n. The inf variant handles CLTL[≤] (cost until only), the sup
//! variant CLTL[>] (cost release only); each refuses the other fragment.

use super::factory::FormulaFactory;
use super::formula::{BinaryOp, FormulaId, Term};
use crate::Error;

/// Instantiates a CLTL[≤] formula at bound `n`.
///
/// Cost until is unrolled by
/// `(a UN b)[0] = a[0] U b[0]` and
/// `(a UN b)[n] = (a[n] || X((a UN b)[n-1])) U b[n]`.
///
/// # Errors
///
/// Returns [`Error::Domain`] if the formula is not in CLTL[≤].
pub fn instantiate_inf(
    factory: &mut FormulaFactory,
    formula: FormulaId,
    n: u32,
) -> Result<FormulaId, Error> {
    if !factory.is_infltl(formula) {
        return Err(Error::Domain(
            "inf instantiation applies to CLTL[<=] formulas only".to_owned(),
        ));
    }
    instantiate(factory, formula, n, Variant::Inf)
}

/// Instantiates a CLTL[>] formula at bound `n`.
///
/// Cost release is unrolled by
/// `(a RN b)[0] = a[0] R b[0]` and
/// `(a RN b)[n] = (a[n] && X((a RN b)[n-1])) R b[n]`.
///
/// # Errors
///
/// Returns [`Error::Domain`] if the formula is not in CLTL[>].
pub fn instantiate_sup(
    factory: &mut FormulaFactory,
    formula: FormulaId,
    n: u32,
) -> Result<FormulaId, Error> {
    if !factory.is_supltl(formula) {
        return Err(Error::Domain(
            "sup instantiation applies to CLTL[>] formulas only".to_owned(),
        ));
    }
    instantiate(factory, formula, n, Variant::Sup)
}

#[derive(Copy, Clone, Eq, PartialEq)]
enum Variant {
    Inf,
    Sup,
}

fn instantiate(
    factory: &mut FormulaFactory,
    formula: FormulaId,
    n: u32,
    variant: Variant,
) -> Result<FormulaId, Error> {
    match factory.term(formula).clone() {
        Term::Atomic(_) | Term::Constant(_) => Ok(formula),
        Term::Unary(op, x) => {
            let x = instantiate(factory, x, n, variant)?;
            Ok(factory.unary(op, x))
        }
        Term::Nary(op, children) => {
            let children = children
                .into_iter()
                .map(|c| instantiate(factory, c, n, variant))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(factory.nary(op, children))
        }
        Term::Binary(op @ (BinaryOp::Until | BinaryOp::Release), l, r) => {
            let l = instantiate(factory, l, n, variant)?;
            let r = instantiate(factory, r, n, variant)?;
            Ok(factory.binary(op, l, r))
        }
        Term::Binary(BinaryOp::CostUntil, l, r) => {
            if variant != Variant::Inf {
                return Err(Error::UnsupportedCostOperator);
            }
            let l = instantiate(factory, l, n, variant)?;
            let r = instantiate(factory, r, n, variant)?;
            if n == 0 {
                Ok(factory.until(l, r))
            } else {
                let unrolled = instantiate(factory, formula, n - 1, variant)?;
                let next = factory.next(unrolled);
                let left = factory.or(l, next);
                Ok(factory.until(left, r))
            }
        }
        Term::Binary(BinaryOp::CostRelease, l, r) => {
            if variant != Variant::Sup {
                return Err(Error::UnsupportedCostOperator);
            }
            let l = instantiate(factory, l, n, variant)?;
            let r = instantiate(factory, r, n, variant)?;
            if n == 0 {
                Ok(factory.release(l, r))
            } else {
                let unrolled = instantiate(factory, formula, n - 1, variant)?;
                let next = factory.next(unrolled);
                let left = factory.and(l, next);
                Ok(factory.release(left, r))
            }
        }
    }
}
