//! In-memory Graphviz graph description and its DOT serialization.
//!
//! The model is deliberately small: one directed root graph holding
//! attributes, subgraphs (clusters when their id starts with `cluster`),
//! top-level nodes and edges. Attribute values are always written quoted.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::template::value::format_number;

/// An attribute value.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrValue(String);

impl AttrValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue(value)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue(format_number(value))
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue(value.to_string())
    }
}

/// Ordered attribute list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes(IndexMap<String, AttrValue>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(AttrValue::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// A node statement. Nodes without attributes are references to a node
/// declared elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub attributes: Attributes,
}

impl Node {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: Attributes::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

/// A subgraph, rendered as a cluster when its id starts with `cluster`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subgraph {
    pub id: String,
    pub attributes: Attributes,
    pub nodes: Vec<Node>,
}

impl Subgraph {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            attributes: Attributes::new(),
            nodes: Vec::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.attributes.set(key, value);
        self
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn is_cluster(&self) -> bool {
        self.id.starts_with("cluster")
    }
}

/// A directed graph description.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    name: String,
    attributes: Attributes,
    subgraphs: IndexMap<String, Subgraph>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl Graph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Attributes::new(),
            subgraphs: IndexMap::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set(&mut self, key: &str, value: impl Into<AttrValue>) -> &mut Self {
        self.attributes.set(key, value);
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// Get the subgraph with `id`, creating it at the end when missing.
    pub fn add_subgraph(&mut self, id: &str) -> &mut Subgraph {
        self.subgraphs
            .entry(id.to_string())
            .or_insert_with(|| Subgraph::new(id))
    }

    pub fn subgraph(&self, id: &str) -> Option<&Subgraph> {
        self.subgraphs.get(id)
    }

    pub fn subgraph_mut(&mut self, id: &str) -> Option<&mut Subgraph> {
        self.subgraphs.get_mut(id)
    }

    pub fn subgraphs(&self) -> impl Iterator<Item = &Subgraph> {
        self.subgraphs.values()
    }

    pub fn add_node(&mut self, node: Node) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Every node with attributes, in declaration order, including those
    /// declared inside subgraphs.
    pub fn declared_nodes(&self) -> impl Iterator<Item = &Node> {
        self.subgraphs
            .values()
            .flat_map(|subgraph| subgraph.nodes.iter())
            .chain(self.nodes.iter())
            .filter(|node| !node.attributes.is_empty())
    }

    pub fn add_edge(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Serialize to DOT text.
    pub fn to_dot(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "digraph {} {{", quote(&self.name));
        write_attribute_statements(&mut out, &self.attributes, 1);

        for subgraph in self.subgraphs.values() {
            let _ = writeln!(out, "  subgraph {} {{", quote(&subgraph.id));
            write_attribute_statements(&mut out, &subgraph.attributes, 2);
            for node in &subgraph.nodes {
                write_node(&mut out, node, 2);
            }
            out.push_str("  }\n");
        }
        for node in &self.nodes {
            write_node(&mut out, node, 1);
        }
        for edge in &self.edges {
            let _ = writeln!(out, "  {} -> {};", quote(&edge.from), quote(&edge.to));
        }
        out.push_str("}\n");
        out
    }
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_attribute_statements(out: &mut String, attributes: &Attributes, depth: usize) {
    for (key, value) in attributes.iter() {
        indent(out, depth);
        let _ = writeln!(out, "{}={};", quote(key), quote(value));
    }
}

fn write_node(out: &mut String, node: &Node, depth: usize) {
    indent(out, depth);
    out.push_str(&quote(&node.id));
    if !node.attributes.is_empty() {
        out.push_str(" [");
        for (i, (key, value)) in node.attributes.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "{}={}", quote(key), quote(value));
        }
        out.push(']');
    }
    out.push_str(";\n");
}

/// Quote a DOT identifier or value. Newlines become the `\n` centered line
/// break escape.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => {},
            other => out.push(other),
        }
    }
    out.push('"');
    out
}
