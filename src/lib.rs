//! Costa library crate for translating Cost LTL formulas into counter
//! automata and computing cost bounds of properties over Büchi models.
//!
//! The pipeline: a CLTL formula is translated into a counter automaton by a
//! tableau construction; the caller's model is wrapped as a counter
//! automaton without counters; their product is lifted on the fly into a
//! configuration automaton; and a Couvreur-style search over its strongly
//! connected components computes the extremal value of accepting runs up to
//! a caller-supplied bound.

pub mod automata;
pub mod logic;
pub mod options;

use std::fmt::{self, Display};

use log::{debug, info};

use automata::buchi::{model_automaton, BuchiAutomaton};
use automata::config::ConfigurationAutomaton;
use automata::product::{product_automaton, SymbolicLetters};
use automata::search::{InfimumFinder, SupremumFinder};

pub use automata::buchi::{AtomicPropositions, BuchiEdge, ExplicitBuchi};
pub use automata::config::Value;
pub use automata::translator::translate;
pub use logic::parser::ParseError;
pub use logic::{FormulaFactory, FormulaId};

/// The errors surfaced by the formula algebra and the pipeline.
#[derive(Debug)]
pub enum Error {
    /// The CLTL input string is malformed.
    Parse(ParseError),
    /// A cost operator reached a context that only supports plain LTL.
    UnsupportedCostOperator,
    /// An operation was applied outside its expected fragment.
    Domain(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "parse error: {}", error),
            Self::UnsupportedCostOperator => {
                write!(f, "cost operators have no plain LTL counterpart")
            }
            Self::Domain(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ParseError> for Error {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

/// Parses a CLTL formula into the factory.
///
/// # Errors
///
/// Returns [`Error::Parse`] when the input is malformed.
pub fn parse(input: &str, factory: &mut FormulaFactory) -> Result<FormulaId, Error> {
    Ok(logic::parser::parse_formula(input, factory)?)
}

/// Computes the cost bound of a CLTL formula over a model, up to `bound`.
///
/// For a CLTL[≤] formula the result is the least value over accepting runs
/// of the product (the least cost at which the model has a trace satisfying
/// the formula); for a CLTL[>] formula it is the greatest. Plain LTL
/// formulas belong to both fragments and are treated as CLTL[≤].
/// [`Value::Infinite`] means no bound up to `bound` suffices.
///
/// # Errors
///
/// Returns [`Error::Domain`] if the formula mixes both cost operators, or
/// if one of its propositions is not registered in the model's dictionary.
pub fn compute_bound<M: BuchiAutomaton>(
    factory: &mut FormulaFactory,
    formula: FormulaId,
    model: &M,
    bound: u32,
) -> Result<Value, Error> {
    let atoms = factory.atoms(formula);
    if !model
        .propositions()
        .contains_all(atoms.iter().map(String::as_str))
    {
        return Err(Error::Domain(
            "the formula uses propositions missing from the model dictionary".to_owned(),
        ));
    }
    let inf = factory.is_infltl(formula);
    if !inf && !factory.is_supltl(formula) {
        return Err(Error::Domain(
            "the formula mixes cost until and cost release".to_owned(),
        ));
    }

    debug!("translating {}", factory.display(formula));
    let formula_automaton = translate(factory, formula);
    let wrapped_model = model_automaton(model);
    let letters = SymbolicLetters::new(model.propositions());
    let product = product_automaton(&formula_automaton, &wrapped_model, letters);

    // saturating the counters just above the bound keeps the reachable
    // configuration space finite without disturbing any comparison
    let configurations = ConfigurationAutomaton::with_cap(&product, bound.saturating_add(1));
    let value = if inf {
        InfimumFinder::new(&configurations).find_infimum(bound)
    } else {
        SupremumFinder::new(&configurations).find_supremum(bound)
    };
    info!("cost bound over the model: {}", value);
    Ok(value)
}
