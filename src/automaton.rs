use std::{fmt::Display, sync::Arc};

use itertools::Itertools;
use owo_colors::OwoColorize;
use tracing::{debug, trace};

use crate::{
    grid::{Grid, GridError},
    math::{Bijection, Set},
    report::{Report, TracingReport},
    Show,
};

mod transition;
pub use transition::Transition;

/// Computes shortest sequences of edges over a square grid, see [`routes::shortest_sequences`].
pub mod routes;

/// A route is a sequence of consecutive transitions.
pub type Route = Vec<Arc<Transition>>;

/// A Mealy-style automaton that has been learned from black-box testing. It consists of named
/// states which are connected by [`Transition`]s, each of which carries an input and an output
/// symbol. Between two states there can be any number of parallel transitions.
///
/// States are assigned dense indices in the order in which they are first seen, and the
/// transitions are stored in a square [`Grid`] where cell `(i, j)` holds the transitions
/// from state `i` to state `j`. A cell is either absent or holds a non-empty list.
/// States and transitions are never removed, except through [`Self::filter_transitions`].
///
/// Transitions are stored behind an [`Arc`]. Cloning an automaton copies the grid but shares
/// the transitions themselves, and so do the routes returned by the queries.
#[derive(Clone, Default)]
pub struct Automaton {
    grid: Grid<Vec<Arc<Transition>>>,
    states: Bijection<String, usize>,
    start: usize,
    alphabet: Set<String>,
    routes: Option<Grid<Route>>,
}

impl Automaton {
    /// Creates an empty automaton.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an automaton from the given transitions, adding their endpoints as states.
    pub fn from_transitions<I, T>(transitions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<Transition>>,
    {
        let mut automaton = Self::new();
        automaton.add_transitions(transitions);
        automaton
    }

    /// Builds an automaton that first receives the given `states` (in that order) and then the
    /// given `transitions`.
    pub fn with_states<S, I, T>(states: S, transitions: I) -> Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
        I: IntoIterator<Item = T>,
        T: Into<Arc<Transition>>,
    {
        let mut automaton = Self::new();
        automaton.add_states(states).add_transitions(transitions);
        automaton
    }

    /// Returns the index of the state with the given `name`, adding the state first if it
    /// does not exist yet. A new state receives the next free index and the grid grows by
    /// one row and one column.
    pub fn ensure_state(&mut self, name: &str) -> usize {
        if let Some(idx) = self.states.get_by_left(name) {
            return *idx;
        }
        let idx = self.states.len();
        self.states.insert(name.to_string(), idx);
        self.grid.grow(1);
        trace!("added state {name} with index {idx}");
        idx
    }

    /// Adds the state with the given `name` if it does not exist yet.
    pub fn add_state(&mut self, name: &str) -> &mut Self {
        self.ensure_state(name);
        self
    }

    /// Adds all given states, see [`Self::add_state`].
    pub fn add_states<S>(&mut self, states: S) -> &mut Self
    where
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        for state in states {
            self.ensure_state(state.as_ref());
        }
        self
    }

    /// Adds a transition, creating its source and target states if necessary and recording
    /// its input symbol in the alphabet. The transition is appended to the list of transitions
    /// between its endpoints.
    pub fn add_transition<T: Into<Arc<Transition>>>(&mut self, transition: T) -> &mut Self {
        let transition = transition.into();
        let from = self.ensure_state(transition.from());
        let to = self.ensure_state(transition.to());
        if let Some(symbol) = transition.alphabet_symbol() {
            self.alphabet.insert(symbol);
        }

        match self.grid.get_mut(from, to) {
            Ok(Some(list)) => list.push(transition),
            _ => {
                self.grid.set(vec![transition], from, to);
            }
        }
        self
    }

    /// Adds all given transitions, see [`Self::add_transition`].
    pub fn add_transitions<I, T>(&mut self, transitions: I) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<Transition>>,
    {
        for transition in transitions {
            self.add_transition(transition);
        }
        self
    }

    /// Makes the state with the given name the start state. Does nothing if no such state exists.
    pub fn set_start_state(&mut self, name: &str) -> &mut Self {
        if let Some(idx) = self.states.get_by_left(name) {
            self.start = *idx;
        }
        self
    }

    /// Index of the start state, which is the state with index `0` unless another one was
    /// set. Gives `None` if there are no states.
    pub fn start_index(&self) -> Option<usize> {
        self.states.contains_right(&self.start).then_some(self.start)
    }

    /// Name of the start state, see [`Self::start_index`].
    pub fn start_state(&self) -> Option<&str> {
        self.state_name(self.start)
    }

    /// Returns true if a state with the given name exists.
    pub fn has_state(&self, name: &str) -> bool {
        self.states.contains_left(name)
    }

    /// Gives the index of the state with the given name.
    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.get_by_left(name).copied()
    }

    /// Gives the name of the state with the given index.
    pub fn state_name(&self, idx: usize) -> Option<&str> {
        self.states.get_by_right(&idx).map(|name| name.as_str())
    }

    /// Iterates over the names of all states, ordered by their index.
    pub fn states(&self) -> impl Iterator<Item = &str> + '_ {
        (0..self.size()).filter_map(move |idx| self.state_name(idx))
    }

    /// Number of states.
    pub fn size(&self) -> usize {
        self.states.len()
    }

    /// Returns true if the automaton has no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// The set of distinct input symbols of all transitions that were ever added.
    pub fn alphabet(&self) -> &Set<String> {
        &self.alphabet
    }

    /// The underlying grid of transition lists, indexed by state indices.
    pub fn grid(&self) -> &Grid<Vec<Arc<Transition>>> {
        &self.grid
    }

    /// All transitions from `from` to `to`. Gives `None` if either state is unknown or if there
    /// is no transition between them.
    pub fn transitions(&self, from: &str, to: &str) -> Option<&[Arc<Transition>]> {
        let (from, to) = (self.state_index(from)?, self.state_index(to)?);
        self.grid
            .get(from, to)
            .ok()
            .flatten()
            .map(|list| list.as_slice())
    }

    fn outgoing(&self, idx: usize) -> impl Iterator<Item = &Arc<Transition>> + '_ {
        self.grid
            .row(idx)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .flat_map(|list| list.iter())
    }

    /// The first transition leaving `from` whose raw label equals `label`.
    pub fn transition(&self, from: &str, label: &str) -> Option<&Arc<Transition>> {
        let from = self.state_index(from)?;
        self.outgoing(from).find(|t| t.label() == Some(label))
    }

    /// The state that is reached when taking the transition returned by [`Self::transition`].
    pub fn successor(&self, from: &str, label: &str) -> Option<&str> {
        self.transition(from, label).map(|t| t.to())
    }

    /// All transitions leaving `state`, ordered by target index. Gives `None` if the state is
    /// unknown or has no outgoing transitions.
    pub fn transitions_from(&self, state: &str) -> Option<Route> {
        let idx = self.state_index(state)?;
        let out = self.outgoing(idx).cloned().collect_vec();
        (!out.is_empty()).then_some(out)
    }

    /// Every transition of the automaton. The grid is traversed column by column, so
    /// transitions are ordered by target index first, then by source index and finally in
    /// the order in which they were added.
    pub fn all_transitions(&self) -> Route {
        self.grid
            .flatten()
            .flatten()
            .flat_map(|list| list.iter().cloned())
            .collect()
    }

    /// Simulates the automaton on a sequence of input symbols, see [`Self::path_from_inputs_with`].
    /// Problems are reported through [`TracingReport`].
    pub fn path_from_inputs<I>(&self, inputs: I) -> Option<Route>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.path_from_inputs_with(inputs, &TracingReport)
    }

    /// Simulates the automaton on a sequence of input symbols, starting in the start state.
    /// For each input, the first transition leaving the current state with a matching input is
    /// taken and the current state moves to its target. An input without a matching transition
    /// is skipped and the current state stays the same.
    ///
    /// If there is no start state (i.e. the automaton is empty), this is reported to `reporter`
    /// and `None` is returned.
    pub fn path_from_inputs_with<I, R>(&self, inputs: I, reporter: &R) -> Option<Route>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        R: Report + ?Sized,
    {
        let Some(mut current) = self.start_index() else {
            reporter.report("start state not set");
            return None;
        };

        let mut path = vec![];
        for input in inputs {
            let input = input.as_ref();
            match self.outgoing(current).find(|t| t.input() == Some(input)) {
                Some(t) => {
                    path.push(Arc::clone(t));
                    current = self.state_index(t.to()).unwrap_or(current);
                }
                None => trace!(
                    "no transition on {input} from {}, skipping",
                    self.state_name(current).unwrap_or_default()
                ),
            }
        }
        Some(path)
    }

    /// Computes a shortest route between every pair of states and caches the result, see
    /// [`routes::shortest_sequences`] for the algorithm. Cell `(i, j)` of the returned grid
    /// holds the route from state `i` to state `j`.
    ///
    /// The cache is not invalidated when the automaton changes, so this should be called again
    /// after adding transitions.
    pub fn compute_routes(&mut self) -> Result<&Grid<Route>, GridError> {
        let routes = routes::shortest_sequences(&self.grid)?;
        debug!(
            "computed {} routes between {} states",
            routes.cells().count(),
            self.size()
        );
        Ok(&*self.routes.insert(routes))
    }

    /// The routes computed by the last call to [`Self::compute_routes`], if any.
    pub fn routes(&self) -> Option<&Grid<Route>> {
        self.routes.as_ref()
    }

    /// A shortest route from `from` to `to`, taken from the cached routes. If no routes were
    /// computed yet, [`Self::compute_routes`] is called first.
    ///
    /// Gives `Ok(None)` if one of the states is unknown or `to` is not reachable from `from`.
    /// If states were added after the routes were computed, reading them may fail with
    /// [`GridError::OutOfRange`].
    pub fn shortest_route(&mut self, from: &str, to: &str) -> Result<Option<Route>, GridError> {
        let (Some(from), Some(to)) = (self.state_index(from), self.state_index(to)) else {
            return Ok(None);
        };
        if self.routes.is_none() {
            self.compute_routes()?;
        }
        match &self.routes {
            Some(routes) => Ok(routes.get(from, to)?.cloned()),
            None => Ok(None),
        }
    }

    /// Removes every transition that does not satisfy `pred`. Cells that are left without
    /// transitions become absent. States and the alphabet are kept.
    pub fn filter_transitions<F: FnMut(&Transition) -> bool>(&mut self, mut pred: F) -> &mut Self {
        for list in self.grid.values_mut() {
            list.retain(|t| pred(t));
        }
        self.grid.retain(|list| !list.is_empty());
        self
    }

    /// Works like [`Self::filter_transitions`] but on a copy, leaving `self` unchanged.
    pub fn filtered<F: FnMut(&Transition) -> bool>(&self, pred: F) -> Self {
        let mut out = self.clone();
        out.filter_transitions(pred);
        out
    }

    /// Returns a table with one row per state, listing the labels of the transitions to each
    /// other state. The start state is highlighted.
    pub fn transition_table(&self) -> String {
        let mut builder = tabled::builder::Builder::default();
        builder.push_record(
            std::iter::once("State".to_string()).chain(self.states().map(String::from)),
        );
        for (idx, name) in self.states().enumerate() {
            let mut row = vec![if Some(idx) == self.start_index() {
                name.bold().to_string()
            } else {
                name.to_string()
            }];
            for target in 0..self.size() {
                row.push(match self.grid.get(idx, target) {
                    Ok(Some(list)) => list.iter().map(|t| t.display_label()).join(", "),
                    _ => "-".to_string(),
                });
            }
            builder.push_record(row);
        }
        builder
            .build()
            .with(tabled::settings::Style::rounded())
            .to_string()
    }
}

impl std::fmt::Debug for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Automaton with {} states, starting in {}",
            self.size(),
            self.start_state().unwrap_or("-")
        )?;
        write!(f, "{}", self.transition_table())
    }
}

impl Display for Automaton {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.grid)
    }
}

impl Show for Automaton {
    fn show(&self) -> String {
        self.grid.show()
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::BTreeSet};

    use super::*;

    /// A chain `0 -> 1 -> 2` together with a reset back to `0` from every state.
    pub(crate) fn reset_chain() -> Automaton {
        let mut automaton = Automaton::from_transitions([
            Transition::new("0", "1", "a", "x"),
            Transition::new("1", "2", "a", "y"),
            Transition::new("0", "0", "r", "ok"),
            Transition::new("1", "0", "r", "ok"),
            Transition::new("2", "0", "r", "ok"),
        ]);
        automaton.set_start_state("0");
        automaton
    }

    fn edges(route: &[Arc<Transition>]) -> Vec<(&str, &str)> {
        route.iter().map(|t| (t.from(), t.to())).collect()
    }

    #[test]
    fn states_are_indexed_once() {
        let mut automaton = Automaton::new();
        assert_eq!(automaton.ensure_state("q"), 0);
        assert_eq!(automaton.ensure_state("p"), 1);
        assert_eq!(automaton.ensure_state("q"), 0);
        assert_eq!(automaton.size(), 2);
        assert_eq!(automaton.grid().row_count(), 2);
        assert_eq!(automaton.grid().column_count(), 2);
        automaton.add_states(["p", "r"]);
        assert_eq!(automaton.size(), 3);
        assert_eq!(automaton.states().collect_vec(), vec!["q", "p", "r"]);
        assert_eq!(automaton.state_name(2), Some("r"));
        assert!(automaton.has_state("r"));
        assert!(!automaton.has_state("s"));
    }

    #[test]
    fn adding_transitions_adds_states() {
        let mut automaton = Automaton::new();
        let t = Transition::new("a", "b", "in", "out");
        automaton.add_transition(t.clone());
        assert_eq!(automaton.size(), 2);
        let between = automaton.transitions("a", "b").unwrap();
        assert_eq!(between.len(), 1);
        assert_eq!(*between[0], t);

        automaton.add_transition(Transition::new("b", "c", "in", "out"));
        assert_eq!(automaton.size(), 3);
        assert!(automaton.transitions("a", "c").is_none());
        assert!(automaton.transitions("a", "nope").is_none());

        automaton.add_transition(Transition::new("a", "b", "other", "out"));
        assert_eq!(automaton.transitions("a", "b").unwrap().len(), 2);
        assert_eq!(
            automaton.alphabet().iter().cloned().collect::<BTreeSet<_>>(),
            BTreeSet::from(["in".to_string(), "other".to_string()])
        );
    }

    #[test]
    fn all_transitions_in_column_major_order() {
        let transitions = [
            Transition::new("0", "1", "a", "x"),
            Transition::new("1", "0", "b", "y"),
            Transition::new("1", "1", "c", "z"),
            Transition::new("0", "0", "d", "w"),
        ];
        let automaton = Automaton::from_transitions(transitions.clone());
        let all = automaton.all_transitions();
        assert_eq!(all.len(), 4);
        assert_eq!(
            all.iter().map(|t| t.input().unwrap()).collect_vec(),
            vec!["d", "b", "a", "c"]
        );
        for t in &transitions {
            assert!(all.iter().any(|u| **u == *t));
        }
    }

    #[test]
    fn lookup_by_label() {
        let automaton = reset_chain();
        assert_eq!(
            automaton.transition("1", "r / ok").map(|t| t.to()),
            Some("0")
        );
        assert_eq!(automaton.successor("0", "a / x"), Some("1"));
        assert_eq!(automaton.successor("0", "a / y"), None);
        assert_eq!(automaton.transitions_from("0").map(|ts| ts.len()), Some(2));
        let mut lonely = Automaton::new();
        lonely.add_state("alone");
        assert!(lonely.transitions_from("alone").is_none());
        assert!(lonely.transitions_from("missing").is_none());
    }

    #[test]
    fn start_state_defaults_to_first() {
        let mut automaton = Automaton::new();
        assert_eq!(automaton.start_state(), None);
        assert_eq!(automaton.start_index(), None);
        automaton.add_states(["a", "b"]);
        assert_eq!(automaton.start_state(), Some("a"));
        automaton.set_start_state("b");
        assert_eq!(automaton.start_state(), Some("b"));
        automaton.set_start_state("unknown");
        assert_eq!(automaton.start_state(), Some("b"));
    }

    #[test_log::test]
    fn shortest_route_through_chain() {
        let mut automaton = Automaton::from_transitions([
            Transition::new("A", "B", "a", "x"),
            Transition::new("B", "C", "b", "y"),
        ]);
        let route = automaton.shortest_route("A", "C").unwrap().unwrap();
        assert_eq!(edges(&route), vec![("A", "B"), ("B", "C")]);
        assert!(automaton.routes().is_some());
        assert_eq!(automaton.shortest_route("C", "A"), Ok(None));
        assert_eq!(automaton.shortest_route("A", "Z"), Ok(None));
    }

    #[test_log::test]
    fn routes_are_cached_until_recomputed() {
        let mut automaton = reset_chain();
        let route = automaton.shortest_route("0", "2").unwrap().unwrap();
        assert_eq!(route.len(), 2);

        automaton.add_transition(Transition::new("0", "2", "jump", "z"));
        assert_eq!(automaton.shortest_route("0", "2").unwrap().unwrap().len(), 2);

        automaton.compute_routes().unwrap();
        assert_eq!(
            edges(&automaton.shortest_route("0", "2").unwrap().unwrap()),
            vec![("0", "2")]
        );

        automaton.add_transition(Transition::new("2", "3", "a", "w"));
        assert!(matches!(
            automaton.shortest_route("0", "3"),
            Err(GridError::OutOfRange { .. })
        ));
    }

    #[test]
    fn routes_share_transitions() {
        let mut automaton = reset_chain();
        let route = automaton.shortest_route("2", "1").unwrap().unwrap();
        assert_eq!(edges(&route), vec![("2", "0"), ("0", "1")]);
        let stored = &automaton.transitions("0", "1").unwrap()[0];
        assert!(Arc::ptr_eq(&route[1], stored));
    }

    #[test]
    fn path_follows_first_matching_transition() {
        let automaton = reset_chain();
        let path = automaton.path_from_inputs(["a", "a", "r"]).unwrap();
        assert_eq!(edges(&path), vec![("0", "1"), ("1", "2"), ("2", "0")]);
        assert_eq!(
            path.iter().map(|t| t.output().unwrap()).collect_vec(),
            vec!["x", "y", "ok"]
        );
    }

    #[test]
    fn path_skips_unknown_inputs() {
        let automaton = reset_chain();
        let path = automaton.path_from_inputs(["a", "nope", "a"]).unwrap();
        assert_eq!(edges(&path), vec![("0", "1"), ("1", "2")]);
        assert_eq!(automaton.path_from_inputs(Vec::<String>::new()), Some(vec![]));
    }

    #[test]
    fn path_without_start_state_is_reported() {
        let messages = RefCell::new(vec![]);
        let collect = |msg: &str| messages.borrow_mut().push(msg.to_string());
        let automaton = Automaton::new();
        assert!(automaton.path_from_inputs_with(["a", "b"], &collect).is_none());
        assert_eq!(messages.borrow().len(), 1);
    }

    #[test]
    fn filtering_removes_transitions_and_empty_cells() {
        let automaton = reset_chain();
        let without_resets = automaton.filtered(|t| t.input() != Some("r"));
        assert_eq!(without_resets.size(), 3);
        assert!(without_resets.transitions("1", "0").is_none());
        assert_eq!(without_resets.all_transitions().len(), 2);
        assert_eq!(automaton.all_transitions().len(), 5);

        let mut automaton = automaton;
        automaton.filter_transitions(|t| t.output() == Some("ok"));
        assert_eq!(automaton.all_transitions().len(), 3);
        assert!(automaton.transitions("0", "1").is_none());
    }

    #[test]
    fn clone_shares_transition_instances() {
        let automaton = reset_chain();
        let mut copy = automaton.clone();
        copy.add_transition(Transition::new("2", "3", "b", "q"));
        assert_eq!(automaton.size(), 3);
        assert_eq!(copy.size(), 4);
        let original = &automaton.transitions("0", "1").unwrap()[0];
        let copied = &copy.transitions("0", "1").unwrap()[0];
        assert!(Arc::ptr_eq(original, copied));
        copied.record_call();
        assert_eq!(original.calls(), 1);
    }

    #[test]
    fn automaton_can_be_shared_behind_a_lock() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Automaton>();
        assert_send_sync::<Route>();

        let automaton = Arc::new(std::sync::Mutex::new(reset_chain()));
        let worker = {
            let automaton = Arc::clone(&automaton);
            std::thread::spawn(move || {
                let mut automaton = automaton.lock().unwrap();
                automaton.add_transition(Transition::new("2", "3", "b", "q"));
                automaton.shortest_route("0", "3").unwrap().map(|route| route.len())
            })
        };
        assert_eq!(worker.join().unwrap(), Some(3));
        assert_eq!(automaton.lock().unwrap().size(), 4);
    }

    #[test]
    fn table_lists_labels() {
        let table = reset_chain().transition_table();
        assert!(table.contains("a / x"));
        assert!(table.contains("r / ok"));
        assert!(table.contains("State"));
    }
}
