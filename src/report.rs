/// Sink for diagnostic messages that the library emits when it encounters recoverable
/// problems, for example a missing start state or a malformed line in a DOT file.
///
/// Every closure taking a `&str` is a `Report`, which makes it easy to collect messages:
/// ```
/// use std::cell::RefCell;
/// use mealy_routes::prelude::*;
///
/// let messages = RefCell::new(vec![]);
/// let collect = |msg: &str| messages.borrow_mut().push(msg.to_string());
/// assert!(Automaton::new().path_from_inputs_with(["a"], &collect).is_none());
/// assert_eq!(messages.borrow().len(), 1);
/// ```
pub trait Report {
    /// Emits the given message.
    fn report(&self, message: &str);
}

/// The default [`Report`], which forwards every message to [`tracing::error!`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct TracingReport;

impl Report for TracingReport {
    fn report(&self, message: &str) {
        tracing::error!("{message}");
    }
}

impl<F: Fn(&str)> Report for F {
    fn report(&self, message: &str) {
        self(message)
    }
}
