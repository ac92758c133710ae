//! Options for the command line interface.

use std::fmt;

use clap::{Parser, ValueEnum};

/// The trace level / verbosity for the logging framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TraceLevel {
    /// Turn logging off.
    Off,
    /// Only print errors.
    Error,
    /// Print errors and warnings.
    Warn,
    /// Print errors, warnings and useful information.
    Info,
    /// Print errors, warnings, useful and debug information.
    Debug,
    /// Print all information, including very verbose output.
    Trace,
}

impl Default for TraceLevel {
    fn default() -> Self {
        Self::Error
    }
}

impl fmt::Display for TraceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        };
        write!(f, "{}", name)
    }
}

impl From<TraceLevel> for log::LevelFilter {
    fn from(level: TraceLevel) -> Self {
        match level {
            TraceLevel::Off => Self::Off,
            TraceLevel::Error => Self::Error,
            TraceLevel::Warn => Self::Warn,
            TraceLevel::Info => Self::Info,
            TraceLevel::Debug => Self::Debug,
            TraceLevel::Trace => Self::Trace,
        }
    }
}

/// The options of the command-line interface.
#[derive(Debug, Clone, Parser)]
#[command(version, about = "Translate Cost LTL formulas into counter automata")]
pub struct CliOptions {
    /// The CLTL formula to translate.
    #[arg(short = 'f', long = "formula")]
    pub formula: String,

    /// Write the translated counter automaton to the given file in DOT
    /// format.
    #[arg(short = 'o', long = "output-file")]
    pub output_file: Option<String>,

    /// Print the pure LTL instantiation of the formula at the given bound.
    #[arg(short = 'n', long = "instantiate", value_name = "BOUND")]
    pub instantiate: Option<u32>,

    /// Trace level.
    #[arg(
        short = 't',
        long = "trace",
        value_enum,
        default_value_t = TraceLevel::default(),
        value_name = "trace-level"
    )]
    pub trace_level: TraceLevel,
}
