//! GML, the declarative scenario markup.
//!
//! A document is a tree of tagged bodies (`[side] … [/side]`) whose children
//! are nested bodies and `key=value` attribute lines. The tree is the wire
//! format for everything the engine loads and persists; the script bridge
//! carries the same shape across the Lua boundary.
//!
//! Parsing is a pure function from text to tree. A separate preprocessor
//! pass strips `#define … #enddef` macro blocks, `{…}` macro invocations and
//! `#` comments before the grammar ever sees the text.

mod parser;
mod preprocess;

pub use parser::{parse, parse_attr, parse_config};
pub use preprocess::preprocess;

use std::fmt;

/// A `key=value` attribute line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute key.
    pub key: String,
    /// Attribute value, with quoting already resolved.
    pub value: String,
}

/// A tagged body: `[name]` children `[/name]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    /// Tag name, with any `+` merge marker stripped.
    pub name: String,
    /// Child nodes in document order.
    pub children: Vec<Node>,
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested tagged body.
    Body(Body),
    /// An attribute line.
    Attribute(Attribute),
}

/// A document: a list of top-level nodes.
pub type Config = Vec<Node>;

impl Attribute {
    /// Create an attribute from anything stringly.
    #[must_use]
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Body {
    /// Create an empty body with the given tag name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    // Quoted segments cannot contain a double quote and angle segments
    // cannot contain `>>`, so each quote is emitted as its own angle
    // segment between quoted runs; the parser concatenates them back.
    if !value.contains('"') {
        return write!(f, "\"{value}\"");
    }
    for (i, part) in value.split('"').enumerate() {
        if i > 0 {
            write!(f, "<<\">>")?;
        }
        if !part.is_empty() {
            write!(f, "\"{part}\"")?;
        }
    }
    Ok(())
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, indent: usize) -> fmt::Result {
    match node {
        Node::Body(body) => write_body(f, body, indent),
        Node::Attribute(attr) => {
            write!(f, "{:indent$}{}=", "", attr.key)?;
            write_value(f, &attr.value)?;
            writeln!(f)
        }
    }
}

fn write_body(f: &mut fmt::Formatter<'_>, body: &Body, indent: usize) -> fmt::Result {
    writeln!(f, "{:indent$}[{}]", "", body.name)?;
    for child in &body.children {
        write_node(f, child, indent + 4)?;
    }
    writeln!(f, "{:indent$}[/{}]", "", body.name)
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=", self.key)?;
        write_value(f, &self.value)?;
        writeln!(f)
    }
}

impl fmt::Display for Body {
    /// Writes the body back out as parseable markup. Whitespace is not
    /// preserved from the original text, but reparsing the output yields an
    /// equal tree.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_body(f, self, 0)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_node(f, self, 0)
    }
}
