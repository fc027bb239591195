//! Reader for the DOT-like dataflow format used by HLS benchmark suites.
//!
//! ```text
//! digraph G {
//!     a [label = add];
//!     b [label = mul];
//!     a -> b [name = 0];
//! }
//! ```

use thiserror::Error;

use crate::config::GraphConfig;
use crate::graph::{build_graph, DependencyGraph, GraphError};

/// Errors raised while reading a dataflow description.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("line {line}: vertex has no label attribute: {text}")]
    MissingLabel { line: usize, text: String },
    #[error("line {line}: malformed vertex: {text}")]
    MalformedVertex { line: usize, text: String },
    #[error("line {line}: malformed edge: {text}")]
    MalformedEdge { line: usize, text: String },
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Vertices and edges as they appeared in the input.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DotGraph {
    pub name: Option<String>,
    /// `(name, kind)` pairs in input order
    pub vertices: Vec<(String, String)>,
    pub edges: Vec<(String, String)>,
}

impl DotGraph {
    /// Build a dependency graph from the parsed description.
    pub fn build(&self, config: GraphConfig) -> Result<DependencyGraph, ParseError> {
        Ok(build_graph(&self.vertices, &self.edges, config)?)
    }
}

fn is_identifier(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '$'))
}

fn unquote(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Value of `key` in an attribute list such as `label = add, color = red`.
fn attribute<'a>(attrs: &'a str, key: &str) -> Option<&'a str> {
    attrs.split(',').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k.trim() == key).then(|| unquote(v))
    })
}

/// Split `body [attrs]` into its body and the text inside the brackets.
fn split_attributes(text: &str) -> Option<(&str, Option<&str>)> {
    match text.split_once('[') {
        Some((body, rest)) => {
            let (attrs, _) = rest.split_once(']')?;
            Some((body.trim(), Some(attrs)))
        }
        None => Some((text.trim(), None)),
    }
}

/// Parse a dataflow description.
///
/// Header, brace, comment and default-attribute lines are skipped. A line
/// containing `->` is an edge; any other statement is a vertex and must carry
/// a `label` naming its operation kind.
pub fn parse_dot(text: &str) -> Result<DotGraph, ParseError> {
    let mut graph = DotGraph::default();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let stmt = raw.trim();
        if stmt.is_empty() || stmt.starts_with("//") || stmt.starts_with('#') {
            continue;
        }
        if stmt == "{" || stmt == "}" {
            continue;
        }
        if ["node", "edge", "graph"]
            .iter()
            .any(|kw| stmt.strip_prefix(kw).map_or(false, |r| r.trim_start().starts_with('[')))
        {
            continue;
        }
        if let Some(header) = stmt
            .strip_prefix("digraph")
            .filter(|r| r.starts_with([' ', '{']))
        {
            let name = header.trim().trim_end_matches('{').trim();
            if !name.is_empty() {
                graph.name = Some(unquote(name).to_string());
            }
            continue;
        }

        let stmt = stmt.trim_end_matches(';').trim();

        if let Some((from, rest)) = stmt.split_once("->") {
            let malformed = || ParseError::MalformedEdge {
                line,
                text: raw.trim().to_string(),
            };
            let (to, _) = split_attributes(rest).ok_or_else(malformed)?;
            let from = unquote(from);
            let to = unquote(to);
            if !is_identifier(from) || !is_identifier(to) {
                return Err(malformed());
            }
            graph.edges.push((from.to_string(), to.to_string()));
            continue;
        }

        let malformed = || ParseError::MalformedVertex {
            line,
            text: raw.trim().to_string(),
        };
        let (name, attrs) = split_attributes(stmt).ok_or_else(malformed)?;
        let name = unquote(name);
        if !is_identifier(name) {
            return Err(malformed());
        }
        let kind = attrs
            .and_then(|a| attribute(a, "label"))
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ParseError::MissingLabel {
                line,
                text: raw.trim().to_string(),
            })?;
        graph.vertices.push((name.to_string(), kind.to_string()));
    }

    Ok(graph)
}
