use std::{
    fmt::Display,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use crate::Show;

/// A labeled edge between two named states of an [`crate::Automaton`].
///
/// The label of a transition in a learned Mealy machine has the shape `input / output`. When a
/// transition is created from a raw label that contains a `/`, the trimmed parts before and
/// after the first `/` become the input and output symbols. Otherwise both stay unset and only
/// the raw label is known.
///
/// Apart from the usage counters, a transition never changes after construction. The counters
/// are only used to annotate transitions with trace information and are ignored by equality.
/// They are atomic, so a transition can be shared between threads.
pub struct Transition {
    from: String,
    to: String,
    input: Option<String>,
    output: Option<String>,
    label: Option<String>,
    used: AtomicBool,
    calls: AtomicUsize,
}

impl Transition {
    /// Creates a transition from its input and output symbol, the raw label is
    /// `"<input> / <output>"`.
    pub fn new<S, T, I, O>(from: S, to: T, input: I, output: O) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        I: Into<String>,
        O: Into<String>,
    {
        let (input, output) = (input.into(), output.into());
        let label = format!("{input} / {output}");
        Self::from_parts(from, to, Some(input), Some(output), Some(label))
    }

    /// Creates a transition from a raw label, which is split into input and output if it
    /// contains a `/`.
    pub fn labeled<S, T, L>(from: S, to: T, label: L) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        L: Into<String>,
    {
        let label = label.into();
        let (input, output) = match label.split_once('/') {
            Some((input, output)) => (
                Some(input.trim().to_string()),
                Some(output.trim().to_string()),
            ),
            None => (None, None),
        };
        Self::from_parts(from, to, input, output, Some(label))
    }

    /// Creates a transition that only knows its input and output but carries no raw label.
    pub fn unlabeled<S, T, I, O>(from: S, to: T, input: I, output: O) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        I: Into<String>,
        O: Into<String>,
    {
        Self::from_parts(from, to, Some(input.into()), Some(output.into()), None)
    }

    fn from_parts<S: Into<String>, T: Into<String>>(
        from: S,
        to: T,
        input: Option<String>,
        output: Option<String>,
        label: Option<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            input,
            output,
            label,
            used: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    /// Name of the source state.
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Name of the target state.
    pub fn to(&self) -> &str {
        &self.to
    }

    /// The input symbol, if known.
    pub fn input(&self) -> Option<&str> {
        self.input.as_deref()
    }

    /// The output symbol, if known.
    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    /// The raw label, if one was given.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The raw label, or `"<input> / <output>"` if there is none.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => label.clone(),
            None => format!(
                "{} / {}",
                self.input.as_deref().unwrap_or_default(),
                self.output.as_deref().unwrap_or_default()
            ),
        }
    }

    /// The symbol that is recorded in the alphabet of an automaton: the input if known,
    /// otherwise the trimmed part of the raw label before the first `/`.
    pub(crate) fn alphabet_symbol(&self) -> Option<String> {
        match (&self.input, &self.label) {
            (Some(input), _) => Some(input.clone()),
            (None, Some(label)) => label.split('/').next().map(|s| s.trim().to_string()),
            (None, None) => None,
        }
    }

    /// Marks the transition as taken.
    pub fn mark_used(&self) {
        self.used.store(true, Ordering::Relaxed);
    }

    /// Returns true if the transition was marked as taken or has recorded calls.
    pub fn is_used(&self) -> bool {
        self.used.load(Ordering::Relaxed) || self.calls() > 0
    }

    /// Increments the call counter and marks the transition as taken.
    pub fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.used.store(true, Ordering::Relaxed);
    }

    /// Number of recorded calls.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// Clears all usage information.
    pub fn reset_usage(&self) {
        self.used.store(false, Ordering::Relaxed);
        self.calls.store(0, Ordering::Relaxed);
    }
}

impl Clone for Transition {
    fn clone(&self) -> Self {
        Self {
            from: self.from.clone(),
            to: self.to.clone(),
            input: self.input.clone(),
            output: self.output.clone(),
            label: self.label.clone(),
            used: AtomicBool::new(self.used.load(Ordering::Relaxed)),
            calls: AtomicUsize::new(self.calls()),
        }
    }
}

impl PartialEq for Transition {
    fn eq(&self, other: &Self) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.input == other.input
            && self.output == other.output
            && self.label == other.label
    }
}

impl Eq for Transition {}

impl std::hash::Hash for Transition {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.from.hash(state);
        self.to.hash(state);
        self.input.hash(state);
        self.output.hash(state);
        self.label.hash(state);
    }
}

impl std::fmt::Debug for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} --{}--> {})", self.from, self.display_label(), self.to)
    }
}

impl Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_label())
    }
}

impl Show for Transition {
    fn show(&self) -> String {
        self.display_label()
    }
}
