//! Reading and writing automata in the DOT format, as it is produced by LearnLib for learned
//! Mealy machines. A typical file looks like
//! ```text
//! digraph g {
//! __start0 [label="" shape="none"];
//!     s0 [shape="circle" label="0"];
//!     s1 [shape="circle" label="1"];
//!     s0 -> s1 [label="a / x"];
//!     s1 -> s0 [label="b / y"];
//! __start0 -> s0;
//! }
//! ```
//! Edge statements and the edge leaving the start marker carry the structure. A state is named
//! by the label of its declaration if there is one, otherwise by its identifier without the
//! one-letter prefix. All other lines are ignored when loading.

use std::{
    fmt::Display,
    io::{BufRead, Write},
};

use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, trace};

use crate::{
    automaton::{Automaton, Transition},
    math::Map,
    report::{Report, TracingReport},
};

/// Separates source and target of an edge statement.
pub const ARROW: &str = "->";
/// Lines containing this token (and an [`ARROW`]) determine the start state.
pub const START_MARKER: &str = "__start";
/// The invisible node from which the edge to the start state leaves.
pub const START_NODE: &str = "__start0";
/// Name of the graph that is written.
pub const GRAPH_NAME: &str = "g";
/// Shape of the nodes that represent states.
pub const STATE_SHAPE: &str = "circle";

/// Errors that can occur while loading an automaton.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A line contains an arrow but could not be parsed as an edge statement.
    #[error("could not extract transition from line {line}: \"{content}\"")]
    MalformedEdge {
        /// One-based number of the offending line.
        line: usize,
        /// The offending line.
        content: String,
    },
    /// Reading from the source failed.
    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Enum that abstracts attributes of a node in the DOT format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DotStateAttribute {
    /// The label of a node
    Label(String),
    /// The shape of a node
    Shape(String),
}

impl Display for DotStateAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DotStateAttribute::Label(s) => write!(f, "label=\"{}\"", escape_dot_string(s)),
            DotStateAttribute::Shape(s) => write!(f, "shape=\"{s}\""),
        }
    }
}

/// Enum that abstracts attributes of an edge in the DOT format.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DotTransitionAttribute {
    /// The label of an edge
    Label(String),
}

impl Display for DotTransitionAttribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DotTransitionAttribute::Label(lbl) => {
                write!(f, "label=\"{}\"", escape_dot_string(lbl))
            }
        }
    }
}

/// Escapes backslashes and double quotes so that `content` can be placed in a quoted string.
fn escape_dot_string(content: &str) -> String {
    content.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Reads a quoted string whose opening quote was already consumed, up to the first unescaped
/// closing quote. Escaped quotes and backslashes are unescaped, other escapes are kept as is.
fn parse_quoted(content: &str) -> Option<String> {
    let mut unescaped = String::new();
    let mut chars = content.chars();
    while let Some(chr) = chars.next() {
        match chr {
            '"' => return Some(unescaped),
            '\\' => match chars.next()? {
                c @ ('"' | '\\') => unescaped.push(c),
                c => {
                    unescaped.push('\\');
                    unescaped.push(c);
                }
            },
            c => unescaped.push(c),
        }
    }
    None
}

/// Extracts the value of the first quoted string after the word `label`.
fn parse_label_attribute(attributes: &str) -> Option<String> {
    let (_, label) = attributes.split_once("label")?;
    let (_, quoted) = label.split_once('"')?;
    parse_quoted(quoted)
}

/// Extracts the key of a state from an identifier like `s12`, `"s12"` or `s12;`, which is
/// everything after the one-letter prefix. Purely numeric keys lose their leading zeros, so
/// `s012` and `s12` denote the same state.
fn parse_state_ident(ident: &str) -> Option<String> {
    let ident = ident.trim().trim_end_matches(';').trim_end();
    let ident = ident
        .strip_prefix('"')
        .and_then(|quoted| quoted.strip_suffix('"'))
        .unwrap_or(ident);

    let mut chars = ident.chars();
    if !chars.next()?.is_alphabetic() {
        return None;
    }
    let key = chars.as_str();
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    if key.chars().all(|c| c.is_ascii_digit()) {
        let trimmed = key.trim_start_matches('0');
        Some(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
    } else {
        Some(key.to_string())
    }
}

/// An edge statement with the keys of its endpoints, which are resolved to state names once
/// all declarations are known.
struct DotEdge {
    from: String,
    to: String,
    input: String,
    output: String,
}

/// Parses a line of the shape `s0 -> s1 [label="input / output"];`.
fn parse_edge_line(line: &str) -> Option<DotEdge> {
    let (source, rest) = line.split_once(ARROW)?;
    let from = parse_state_ident(source)?;
    let (target, attributes) = rest.split_once('[')?;
    let to = parse_state_ident(target)?;

    let label = parse_label_attribute(attributes)?;
    let (input, output) = label.split_once('/')?;

    Some(DotEdge {
        from,
        to,
        input: input.trim().to_string(),
        output: output.trim().to_string(),
    })
}

/// Parses a state declaration like `s0 [shape="circle" label="idle"];` into the key of the
/// state and its name.
fn parse_declaration_line(line: &str) -> Option<(String, String)> {
    let (ident, attributes) = line.split_once('[')?;
    let key = parse_state_ident(ident)?;
    let name = parse_label_attribute(attributes)?;
    (!name.is_empty()).then_some((key, name))
}

/// Parses a line of the shape `__start0 -> s0;` and returns the key of the start state.
fn parse_start_line(line: &str) -> Option<String> {
    let (_, target) = line.split_once(ARROW)?;
    let target = target.split('[').next().unwrap_or(target);
    parse_state_ident(target)
}

/// The part of a statement before its attribute list, labels may contain arrows.
fn statement_head(line: &str) -> &str {
    line.split('[').next().unwrap_or(line)
}

/// Loads an automaton from the given source, see [`load_automaton_with`].
/// Malformed lines are reported through [`TracingReport`].
pub fn load_automaton<R: BufRead>(read: R) -> Result<Automaton, LoadError> {
    load_automaton_with(read, &TracingReport)
}

/// Loads an automaton in the DOT format from `read`, line by line.
///
/// Every line that contains an [`ARROW`] before its attribute list is either the start line
/// (if it also contains the [`START_MARKER`] there) or an edge statement, from which a [`Transition`] is built. Other lines
/// only matter if they declare a state with a label, which then becomes the name of that
/// state. Transitions are added and the start state is bound after all lines were read.
///
/// The first line that contains an arrow but cannot be parsed is reported to `reporter` and
/// aborts the whole load with [`LoadError::MalformedEdge`].
pub fn load_automaton_with<R, P>(read: R, reporter: &P) -> Result<Automaton, LoadError>
where
    R: BufRead,
    P: Report + ?Sized,
{
    let mut names: Map<String, String> = Map::default();
    let mut edges = Vec::new();
    let mut start = None;

    for (number, line) in read.lines().enumerate() {
        let line = line?;
        let head = statement_head(&line);
        if !head.contains(ARROW) {
            if let Some((key, name)) = parse_declaration_line(&line) {
                trace!("state {key} is named {name}");
                names.insert(key, name);
            }
            continue;
        }

        let parsed = if head.contains(START_MARKER) {
            parse_start_line(&line).map(|key| {
                trace!("found start state {key}");
                start = Some(key);
            })
        } else {
            parse_edge_line(&line).map(|edge| edges.push(edge))
        };

        if parsed.is_none() {
            reporter.report(&format!("could not extract transition from: \"{line}\""));
            return Err(LoadError::MalformedEdge {
                line: number + 1,
                content: line,
            });
        }
    }

    let resolve = |key: String| names.get(&key).cloned().unwrap_or(key);
    let mut automaton = Automaton::new();
    for edge in edges {
        automaton.add_transition(Transition::new(
            resolve(edge.from),
            resolve(edge.to),
            edge.input,
            edge.output,
        ));
    }
    if let Some(start) = start {
        automaton.set_start_state(&resolve(start));
    }
    debug!(
        "loaded automaton with {} states and {} input symbols",
        automaton.size(),
        automaton.alphabet().len()
    );
    Ok(automaton)
}

/// Writes the DOT representation of `automaton` to `write`.
pub fn save_automaton<W: Write>(automaton: &Automaton, mut write: W) -> std::io::Result<()> {
    write.write_all(automaton.dot_representation().as_bytes())?;
    write.flush()
}

impl Automaton {
    /// Loads an automaton from a buffered reader, see [`load_automaton`].
    pub fn try_from_read<R: BufRead>(read: R) -> Result<Self, LoadError> {
        load_automaton(read)
    }

    /// Loads an automaton from a string, see [`load_automaton`].
    pub fn try_from_dot(dot: &str) -> Result<Self, LoadError> {
        load_automaton(dot.as_bytes())
    }

    /// Compute the graphviz representation, for more information on the DOT format,
    /// see the [graphviz documentation](https://graphviz.org/doc/info/lang.html).
    ///
    /// Every state is declared with the identifier `s<index>` and its name as label. Edges
    /// are labeled with the raw label of the transition, or `input / output` if there is
    /// none. Quotes and backslashes in labels are escaped. The last statement is the edge
    /// from the start marker to the start state.
    pub fn dot_representation(&self) -> String {
        let header = [
            format!("digraph {GRAPH_NAME} {{"),
            format!(
                "{START_NODE} [{} {}];",
                DotStateAttribute::Label(String::new()),
                DotStateAttribute::Shape("none".into())
            ),
        ];

        let states = self.states().enumerate().map(|(idx, name)| {
            format!(
                "    s{idx} [{} {}];",
                DotStateAttribute::Shape(STATE_SHAPE.into()),
                DotStateAttribute::Label(name.to_string())
            )
        });

        let transitions = self.grid().cells().flat_map(|(from, to, list)| {
            list.iter().map(move |t| {
                format!(
                    "    s{from} {ARROW} s{to} [{}];",
                    DotTransitionAttribute::Label(t.display_label())
                )
            })
        });

        let start = self
            .start_index()
            .map(|idx| format!("{START_NODE} {ARROW} s{idx};"));

        header
            .into_iter()
            .chain(states)
            .chain(transitions)
            .chain(start)
            .chain(std::iter::once("}".to_string()))
            .join("\n")
            + "\n"
    }

    /// Renders the automaton visually (as PNG) by piping its DOT representation into
    /// the `dot` executable and returns the bytes of the rendered image. This method is
    /// only available on the `graphviz` crate feature.
    #[cfg(feature = "graphviz")]
    pub fn render(&self) -> Result<Vec<u8>, std::io::Error> {
        use std::{io::Read, process::Stdio};

        let dot = self.dot_representation();
        trace!("writing dot representation\n{}", dot);

        let mut child = std::process::Command::new("dot")
            .arg("-Tpng")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot.as_bytes())?;
        }

        let mut output = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout.read_to_end(&mut output)?;
        }

        let status = child.wait()?;
        if !status.success() {
            tracing::error!("dot process exited with status: {status}");
            return Err(std::io::Error::other(format!(
                "dot process exited with status: {status}"
            )));
        }

        Ok(output)
    }

    /// Attempts to render the automaton to a PNG file with the given filename. This method
    /// is only available on the `graphviz` crate feature and makes use of temporary files.
    #[cfg(feature = "graphviz")]
    pub fn render_to_file_name(&self, filename: &str) -> Result<(), std::io::Error> {
        trace!("Outputting dot and rendering to png");
        let mut tempfile = tempfile::NamedTempFile::new()?;
        save_automaton(self, &mut tempfile)?;

        let status = std::process::Command::new("dot")
            .arg("-Tpng")
            .arg("-o")
            .arg(filename)
            .arg(tempfile.path())
            .status()?;
        if status.success() {
            Ok(())
        } else {
            Err(std::io::Error::other(format!(
                "dot process exited with status: {status}"
            )))
        }
    }
}
