use tracing::debug;

use crate::automaton::{Automaton, Transition};

/// Generates a random complete Mealy machine with `size` states named `0`, `1`, ... and the
/// start state `0`. For each state and each of the `symbols` input symbols `i0`, `i1`, ...,
/// a transition to a uniformly drawn target state is added, whose output is drawn uniformly
/// from `o0`, `o1`, ... up to `outputs` symbols. At least one output symbol is used.
///
/// Note that depending on the drawn transitions, some states may be unreachable from the
/// start state.
pub fn generate_random_mealy(symbols: usize, outputs: usize, size: usize) -> Automaton {
    let mut automaton = Automaton::new();
    automaton.add_states((0..size).map(|q| q.to_string()));

    for q in 0..size {
        for sym in 0..symbols {
            let target = fastrand::usize(..size);
            let output = fastrand::usize(..outputs.max(1));
            automaton.add_transition(Transition::new(
                q.to_string(),
                target.to_string(),
                format!("i{sym}"),
                format!("o{output}"),
            ));
        }
    }

    automaton.set_start_state("0");
    debug!("generated random automaton with {size} states and {symbols} symbols");
    automaton
}
