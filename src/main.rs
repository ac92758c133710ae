//! Costa binary crate.

use std::io::{self, Write};

use clap::Parser;
use fs_err as fs;

use costa::automata::dot::write_dot;
use costa::automata::translator::CltlTranslator;
use costa::logic::instantiate::{instantiate_inf, instantiate_sup};
use costa::options::{CliOptions, TraceLevel};
use costa::FormulaFactory;

fn main() {
    if let Err(error) = costa_main() {
        // discard the result as we cannot further propagate a write error
        let _ = writeln!(io::stderr(), "Error: {}", error);
        std::process::exit(1);
    }
}

/// Initialize the logging framework with the given trace level.
///
/// # Errors
///
/// Returns an error if the logging framework has already been initialized.
fn initialize_logging(level: TraceLevel) -> io::Result<()> {
    env_logger::builder()
        .filter(None, level.into())
        .format_timestamp_millis()
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e))
}

/// Main function that parses the options, translates the formula and writes
/// the requested outputs.
fn costa_main() -> Result<(), Box<dyn std::error::Error>> {
    let options = CliOptions::parse();
    initialize_logging(options.trace_level)?;

    let mut factory = FormulaFactory::new();
    let formula = costa::parse(&options.formula, &mut factory)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "input: {}", factory.display(formula))?;
    let nnf = factory.to_nnf(formula);
    writeln!(out, "nnf:   {}", factory.display(nnf))?;
    let dnf = factory.to_dnf(formula);
    writeln!(out, "dnf:   {}", factory.display(dnf))?;

    if let Some(bound) = options.instantiate {
        let instantiated = if factory.is_infltl(formula) {
            instantiate_inf(&mut factory, formula, bound)?
        } else {
            instantiate_sup(&mut factory, formula, bound)?
        };
        writeln!(out, "ltl[{}]: {}", bound, factory.to_ltl(instantiated)?)?;
    }

    let automaton = CltlTranslator::new(&mut factory, formula).build_automaton();
    if let Some(path) = &options.output_file {
        let file = fs::File::create(path)?;
        write_dot(file, &automaton)?;
        writeln!(out, "automaton written to {}", path)?;
    }
    Ok(())
}
