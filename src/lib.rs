//! Library for working with Mealy machines that were learned from black-box testing, with the
//! goal of generating test sequences and checking conformance against the learned model.
//!
//! An [`Automaton`] consists of named states which are connected by [`Transition`]s. Each
//! transition carries a label of the form `input / output`, and there can be arbitrarily many
//! parallel transitions between two states. Internally, the transitions are stored in a square
//! [`Grid`], where the cell at `(i, j)` holds all transitions from the state with index `i` to
//! the state with index `j`. The grid grows automatically whenever a new state is added.
//!
//! The most important operations on an automaton are
//! - [`Automaton::shortest_route`], which returns a shortest sequence of transitions between
//!   two states. All such routes are computed at once with a variant of the Floyd-Warshall
//!   algorithm that propagates the sequences themselves instead of numeric distances, see
//!   [`automaton::routes::shortest_sequences`].
//! - [`Automaton::path_from_inputs`], which runs a sequence of input symbols from the start
//!   state and returns the transitions that are taken.
//!
//! Automata are loaded from and written to the DOT format that is produced by LearnLib, see
//! the [`dot`] module.
//!
//! ```
//! use mealy_routes::prelude::*;
//!
//! let dot = r#"digraph g {
//!     s0 -> s1 [label="login / OK"];
//!     s1 -> s2 [label="upload / OK"];
//!     s2 -> s0 [label="logout / OK"];
//! __start0 -> s0;
//! }"#;
//! let mut automaton = Automaton::try_from_dot(dot).unwrap();
//! let route = automaton.shortest_route("0", "2").unwrap().unwrap();
//! assert_eq!(route.iter().map(|t| t.input().unwrap()).collect::<Vec<_>>(), ["login", "upload"]);
//! ```
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// The prelude is supposed to make using this package easier. Including everything, i.e.
/// `use mealy_routes::prelude::*;` should be enough to use the package.
pub mod prelude {
    pub use super::{
        automaton::{Automaton, Route, Transition},
        dot::{load_automaton, load_automaton_with, save_automaton, LoadError},
        grid::{Grid, GridError},
        math,
        report::{Report, TracingReport},
        Show,
    };
}

/// This module contains some definitions of mathematical objects which are used throughout the crate and
/// do not really fit to the top level.
pub mod math;

/// Defines the growable two-dimensional [`Grid`] that stores the transitions of an automaton.
pub mod grid;
pub use grid::{Grid, GridError};

/// Defines automata, their transitions and the computation of shortest routes.
pub mod automaton;
pub use automaton::{Automaton, Route, Transition};

pub mod dot;

/// Diagnostics that are emitted by the library.
pub mod report;
pub use report::{Report, TracingReport};

/// Implements the generation of random automata.
#[cfg(feature = "random")]
pub mod random;

use std::sync::Arc;

use itertools::Itertools;

/// Helper trait which can be used to display states, transitions and such.
pub trait Show {
    /// Returns a human readable representation of `self`. For a transition that is its label,
    /// for a collection of transitions the labels of its elements. This is mainly used for
    /// printing grids and for debugging purposes.
    fn show(&self) -> String;
}

impl Show for usize {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl Show for String {
    fn show(&self) -> String {
        self.clone()
    }
}

impl Show for str {
    fn show(&self) -> String {
        self.to_string()
    }
}

impl<S: Show> Show for Vec<S> {
    fn show(&self) -> String {
        format!("[{}]", self.iter().map(|x| x.show()).join(", "))
    }
}

impl<S: Show + ?Sized> Show for Arc<S> {
    fn show(&self) -> String {
        S::show(self)
    }
}

impl<S: Show + ?Sized> Show for &S {
    fn show(&self) -> String {
        S::show(*self)
    }
}
