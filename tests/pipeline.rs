//! End-to-end tests: formulas are parsed, translated to counter automata,
//! composed with explicit models and searched for their cost bound.

use std::io::Read;

use costa::automata::dot::write_dot;
use costa::{
    compute_bound, translate, AtomicPropositions, ExplicitBuchi, FormulaFactory, Value,
};

/// Parses the formula, runs the pipeline over the model and checks the
/// computed bound.
fn verify_bound(formula: &str, model: &ExplicitBuchi, bound: u32, expected: Value) {
    let mut factory = FormulaFactory::new();
    let parsed = costa::parse(formula, &mut factory).unwrap();
    let value = compute_bound(&mut factory, parsed, model, bound).unwrap();
    assert_eq!(value, expected, "bound of {} over the model", formula);
}

/// A one-state model on which `a` holds forever and `b` never does.
fn always_a() -> ExplicitBuchi {
    let props = AtomicPropositions::new(&["a", "b"]);
    let mut model = ExplicitBuchi::new(props, 1);
    let s = model.add_state("s");
    model.add_edge(s, "a & !b", &[0], s);
    model
}

/// A lasso on which `a` holds for `k` steps, then `b` forever.
fn a_for_k_steps_then_b(k: usize) -> ExplicitBuchi {
    let props = AtomicPropositions::new(&["a", "b"]);
    let mut model = ExplicitBuchi::new(props, 1);
    let states: Vec<_> = (0..=k)
        .map(|i| model.add_state(&format!("m{}", i)))
        .collect();
    for i in 0..k {
        model.add_edge(states[i], "a & !b", &[], states[i + 1]);
    }
    model.add_edge(states[k], "b & !a", &[0], states[k]);
    model
}

/// A lasso on which `b` holds for `m` steps, then never again.
fn b_for_m_steps(m: usize) -> ExplicitBuchi {
    let props = AtomicPropositions::new(&["b"]);
    let mut model = ExplicitBuchi::new(props, 1);
    let states: Vec<_> = (0..=m)
        .map(|i| model.add_state(&format!("s{}", i)))
        .collect();
    for i in 0..m {
        model.add_edge(states[i], "b", &[], states[i + 1]);
    }
    model.add_edge(states[m], "!b", &[0], states[m]);
    model
}

#[test]
fn an_eventuality_that_holds_immediately_costs_nothing() {
    verify_bound("F a", &always_a(), 8, Value::Finite(0));
}

#[test]
fn the_translated_eventuality_has_no_counters() {
    let mut factory = FormulaFactory::new();
    let formula = costa::parse("F a", &mut factory).unwrap();
    let automaton = translate(&mut factory, formula);
    assert_eq!(automaton.num_counters(), 0);
}

#[test]
fn cost_until_counts_the_postponements() {
    let model = a_for_k_steps_then_b(3);
    verify_bound("a UN b", &model, 5, Value::Finite(3));
    verify_bound("a UN b", &model, 3, Value::Finite(3));
}

#[test]
fn cost_until_beyond_the_bound_is_infinite() {
    let model = a_for_k_steps_then_b(3);
    verify_bound("a UN b", &model, 2, Value::Infinite);
}

#[test]
fn an_unsatisfiable_eventuality_has_no_accepting_run() {
    let model = always_a();
    verify_bound("G (a -> F b)", &model, 8, Value::Infinite);
    verify_bound("G (a -> FN b)", &model, 8, Value::Infinite);
}

#[test]
fn a_satisfied_response_property_costs_nothing() {
    let props = AtomicPropositions::new(&["a", "b"]);
    let mut model = ExplicitBuchi::new(props, 1);
    let s = model.add_state("s");
    model.add_edge(s, "a & b", &[0], s);
    verify_bound("G (a -> F b)", &model, 8, Value::Finite(0));
}

#[test]
fn cost_globally_reports_how_long_the_argument_is_sustained() {
    let model = b_for_m_steps(4);
    // the argument can be sustained for at most three steps before the
    // release must be discharged
    verify_bound("GN b", &model, 10, Value::Finite(3));
    verify_bound("GN b", &model, 2, Value::Infinite);
}

#[test]
fn cost_globally_over_a_perpetual_argument_is_unbounded() {
    let props = AtomicPropositions::new(&["b"]);
    let mut model = ExplicitBuchi::new(props, 1);
    let s = model.add_state("s");
    model.add_edge(s, "b", &[0], s);
    verify_bound("GN b", &model, 6, Value::Infinite);
}

#[test]
fn mixed_cost_fragments_are_rejected() {
    let mut factory = FormulaFactory::new();
    let formula = costa::parse("(a UN b) && (a RN b)", &mut factory).unwrap();
    let model = always_a();
    assert!(compute_bound(&mut factory, formula, &model, 4).is_err());
}

#[test]
fn unregistered_propositions_are_rejected() {
    let mut factory = FormulaFactory::new();
    let formula = costa::parse("F c", &mut factory).unwrap();
    let model = always_a();
    assert!(compute_bound(&mut factory, formula, &model, 4).is_err());
}

#[test]
fn the_automaton_can_be_exported_to_a_dot_file() {
    let mut factory = FormulaFactory::new();
    let formula = costa::parse("X p", &mut factory).unwrap();
    let automaton = translate(&mut factory, formula);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write_dot(&mut file, &automaton).unwrap();

    let mut text = String::new();
    let mut reopened = file.reopen().unwrap();
    reopened.read_to_string(&mut text).unwrap();
    assert!(text.starts_with("digraph G {"));
    assert!(text.contains("[label=\"p\"]"));
    assert!(text.trim_end().ends_with('}'));
}
