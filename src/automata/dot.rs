//! Graphviz export of counter automata.

use std::collections::{HashMap, VecDeque};
use std::io;

use super::counter::{CounterAutomaton, CounterLabel};
use super::ts::TransitionSystem;

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Writes the automaton in Graphviz syntax. Numeric ids are allocated in
/// breadth-first visit order from the initial state.
///
/// # Panics
///
/// Panics if the automaton has no initial state.
///
/// # Errors
///
/// Returns an error when writing to the underlying writer fails.
pub fn write_dot<W, S, T>(mut writer: W, automaton: &CounterAutomaton<S, T>) -> io::Result<()>
where
    W: io::Write,
    S: Clone,
    T: TransitionSystem<Label = CounterLabel<S>>,
{
    let ts = automaton.ts();
    let initial = automaton
        .initial_state()
        .expect("dot export needs an initial state")
        .clone();

    writeln!(writer, "digraph G {{")?;
    let mut ids: HashMap<T::State, usize> = HashMap::new();
    let mut queue = VecDeque::new();
    ids.insert(initial.clone(), 0);
    writeln!(writer, "  0 [label=\"{}\"];", escape(&ts.display_state(&initial)))?;
    queue.push_back(initial);

    while let Some(state) = queue.pop_front() {
        let source = ids[&state];
        for transition in ts.successors(&state) {
            let target = transition.target().clone();
            let next_id = ids.len();
            let target_id = match ids.get(&target) {
                Some(&id) => id,
                None => {
                    ids.insert(target.clone(), next_id);
                    writeln!(
                        writer,
                        "  {} [label=\"{}\"];",
                        next_id,
                        escape(&ts.display_state(&target))
                    )?;
                    queue.push_back(target);
                    next_id
                }
            };
            writeln!(
                writer,
                "  {} -> {} [label=\"{}\"];",
                source,
                target_id,
                escape(&ts.display_label(transition.label()))
            )?;
        }
    }
    writeln!(writer, "}}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::translator::translate;
    use crate::logic::parser::parse_formula;
    use crate::logic::FormulaFactory;

    #[test]
    fn next_exports_a_transition_on_its_proposition() {
        let mut factory = FormulaFactory::new();
        let formula = parse_formula("X p", &mut factory).unwrap();
        let automaton = translate(&mut factory, formula);

        let mut out = Vec::new();
        write_dot(&mut out, &automaton).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with("digraph G {"));
        assert!(text.trim_end().ends_with('}'));
        assert!(text.contains("[label=\"p\"]"));
        assert_eq!(text.matches("->").count(), 3);
        assert!(text.contains("0 [label="));
    }

    #[test]
    fn quotes_in_labels_are_escaped() {
        assert_eq!(escape("a \"b\""), "a \\\"b\\\"");
    }
}
