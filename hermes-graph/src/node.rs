//! Graph primitives
//!
//! Typed nodes and edges plus their builders. Type tags are closed
//! enumerations; parsing from unknown strings is lenient so rows written by
//! newer versions never poison a read path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kinds of graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    File,
    Module,
    Function,
    Struct,
    Impl,
    Trait,
    Enum,
    Concept,
    Document,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Module => "module",
            Self::Function => "function",
            Self::Struct => "struct",
            Self::Impl => "impl",
            Self::Trait => "trait",
            Self::Enum => "enum",
            Self::Concept => "concept",
            Self::Document => "document",
        }
    }

    /// Lenient parse; unknown tags become `Concept`.
    pub fn parse(s: &str) -> Self {
        match s {
            "file" => Self::File,
            "module" => Self::Module,
            "function" => Self::Function,
            "struct" => Self::Struct,
            "impl" => Self::Impl,
            "trait" => Self::Trait,
            "enum" => Self::Enum,
            "document" => Self::Document,
            _ => Self::Concept,
        }
    }
}

/// Kinds of graph edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeType {
    Calls,
    Imports,
    Implements,
    DependsOn,
    Contains,
    Documents,
}

impl EdgeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calls => "calls",
            Self::Imports => "imports",
            Self::Implements => "implements",
            Self::DependsOn => "depends_on",
            Self::Contains => "contains",
            Self::Documents => "documents",
        }
    }

    /// Lenient parse; unknown tags become `DependsOn`.
    pub fn parse(s: &str) -> Self {
        match s {
            "calls" => Self::Calls,
            "imports" => Self::Imports,
            "implements" => Self::Implements,
            "contains" => Self::Contains,
            "documents" => Self::Documents,
            _ => Self::DependsOn,
        }
    }
}

/// A node in the knowledge graph
///
/// When `file_path` is absent the node is a synthetic concept with no
/// fetchable content; a line range is only meaningful alongside a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub node_type: NodeType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_line: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
}

impl Node {
    /// Create a new builder with a fresh id scoped to `project_id`
    pub fn builder(project_id: &str) -> NodeBuilder {
        NodeBuilder::new(project_id)
    }
}

/// A directed, weighted edge between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub project_id: String,
    pub source_id: String,
    pub target_id: String,
    pub edge_type: EdgeType,
    pub weight: f64,
}

impl Edge {
    /// Create a new builder with a fresh id scoped to `project_id`
    pub fn builder(project_id: &str) -> EdgeBuilder {
        EdgeBuilder::new(project_id)
    }
}

/// Builder for [`Node`] with fluent API
#[derive(Debug)]
pub struct NodeBuilder {
    node: Node,
}

impl NodeBuilder {
    fn new(project_id: &str) -> Self {
        Self {
            node: Node {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                name: String::new(),
                node_type: NodeType::Concept,
                file_path: None,
                start_line: None,
                end_line: None,
                summary: None,
                content_hash: None,
            },
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.node.name = name.into();
        self
    }

    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node.node_type = node_type;
        self
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.node.file_path = Some(path.into());
        self
    }

    pub fn lines(mut self, start: i64, end: i64) -> Self {
        self.node.start_line = Some(start);
        self.node.end_line = Some(end);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.node.summary = Some(summary.into());
        self
    }

    pub fn content_hash(mut self, hash: impl Into<String>) -> Self {
        self.node.content_hash = Some(hash.into());
        self
    }

    pub fn build(self) -> Node {
        self.node
    }
}

/// Builder for [`Edge`] with fluent API
#[derive(Debug)]
pub struct EdgeBuilder {
    edge: Edge,
}

impl EdgeBuilder {
    fn new(project_id: &str) -> Self {
        Self {
            edge: Edge {
                id: Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                source_id: String::new(),
                target_id: String::new(),
                edge_type: EdgeType::DependsOn,
                weight: 1.0,
            },
        }
    }

    pub fn source(mut self, source_id: impl Into<String>) -> Self {
        self.edge.source_id = source_id.into();
        self
    }

    pub fn target(mut self, target_id: impl Into<String>) -> Self {
        self.edge.target_id = target_id.into();
        self
    }

    pub fn edge_type(mut self, edge_type: EdgeType) -> Self {
        self.edge.edge_type = edge_type;
        self
    }

    pub fn weight(mut self, weight: f64) -> Self {
        self.edge.weight = weight;
        self
    }

    pub fn build(self) -> Edge {
        self.edge
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_builder_generates_unique_ids() {
        let a = Node::builder("p").name("a").build();
        let b = Node::builder("p").name("b").build();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_node_builder_sets_fields() {
        let node = Node::builder("proj")
            .name("fetch_rates")
            .node_type(NodeType::Function)
            .file_path("src/rates.rs")
            .lines(10, 42)
            .summary("function: fetch_rates")
            .content_hash("abc")
            .build();

        assert_eq!(node.project_id, "proj");
        assert_eq!(node.name, "fetch_rates");
        assert_eq!(node.node_type, NodeType::Function);
        assert_eq!(node.file_path.as_deref(), Some("src/rates.rs"));
        assert_eq!(node.start_line, Some(10));
        assert_eq!(node.end_line, Some(42));
        assert_eq!(node.content_hash.as_deref(), Some("abc"));
    }

    #[test]
    fn test_edge_builder_defaults() {
        let edge = Edge::builder("proj").source("a").target("b").build();
        assert_eq!(edge.edge_type, EdgeType::DependsOn);
        assert_eq!(edge.weight, 1.0);
    }

    #[test]
    fn test_node_type_round_trip() {
        for tag in [
            "file", "module", "function", "struct", "impl", "trait", "enum", "concept",
            "document",
        ] {
            assert_eq!(NodeType::parse(tag).as_str(), tag);
        }
    }

    #[test]
    fn test_unknown_node_type_falls_back_to_concept() {
        assert_eq!(NodeType::parse("widget"), NodeType::Concept);
    }

    #[test]
    fn test_unknown_edge_type_falls_back_to_depends_on() {
        assert_eq!(EdgeType::parse("mystery"), EdgeType::DependsOn);
    }

    #[test]
    fn test_node_serialization_uses_snake_case_tags() {
        let node = Node::builder("p")
            .name("n")
            .node_type(NodeType::Struct)
            .build();
        let json = serde_json::to_string(&node).unwrap();
        assert!(json.contains("\"struct\""));
    }
}
