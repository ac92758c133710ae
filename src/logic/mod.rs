//! The Cost LTL formula algebra: terms, factory, parser and instantiator.

mod factory;
mod formula;
pub mod instantiate;
pub mod parser;

pub use factory::{FormulaDisplay, FormulaFactory};
pub use formula::{BinaryOp, FormulaId, NaryOp, Term, UnaryOp};
