//! Serde document format for circuit models.
//!
//! A model document carries the authoritative node/edge graph and an
//! optional cached pre-order expression tree. The cache is never trusted:
//! [`ModelDocument::into_model`] always rebuilds the tree from topology
//! and, on mismatch, keeps the rebuilt tree.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ModelError, ModelResult};

use super::element::{CircuitElement, ElementKind, Parameter};
use super::graph::{Edge, ModelGraph, Node, NodeKind};
use super::tree::ParsedTree;

/// Wire form of one graph node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentNode {
    /// Node id, unique within the document.
    pub id: u32,
    /// Element kind code, or `begin-parallel` / `end-parallel`.
    pub kind: String,
    /// User-assigned element name. Junctions carry none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Branch count, junction nodes only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branches: Option<u32>,
    /// Ordered parameter list, element nodes only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
}

/// Wire form of one directed edge
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DocumentEdge {
    /// Source node id.
    pub left: u32,
    /// Target node id.
    pub right: u32,
    /// Slot on the source side.
    #[serde(default)]
    pub left_slot: u32,
    /// Slot on the target side.
    #[serde(default)]
    pub right_slot: u32,
}

/// A complete circuit model document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Model name.
    pub name: String,
    /// Graph nodes (authoritative).
    pub nodes: Vec<DocumentNode>,
    /// Graph edges (authoritative).
    pub edges: Vec<DocumentEdge>,
    /// Cached pre-order expression, non-authoritative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parsed_tree: Option<ParsedTree>,
}

/// A validated circuit model: the graph plus its reconstructed tree
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitModel {
    name: String,
    graph: ModelGraph,
    tree: ParsedTree,
}

impl ModelDocument {
    /// Parse a document from JSON text.
    pub fn from_json(text: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the document to JSON text.
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate the document and reconstruct its expression tree.
    ///
    /// The graph is always rebuilt from nodes/edges; a cached tree that
    /// disagrees is discarded with a warning, not an error.
    pub fn into_model(self) -> ModelResult<CircuitModel> {
        let graph = self.graph()?;
        let tree = graph.build()?;

        if let Some(cached) = &self.parsed_tree {
            if *cached != tree {
                warn!(
                    model = %self.name,
                    "cached parsed tree disagrees with graph, using rebuilt tree"
                );
            }
        }

        Ok(CircuitModel {
            name: self.name,
            graph,
            tree,
        })
    }

    // Decode wire nodes into typed graph nodes, validating elements.
    fn graph(&self) -> ModelResult<ModelGraph> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for doc_node in &self.nodes {
            let kind = match doc_node.kind.as_str() {
                "begin-parallel" => NodeKind::BeginParallel {
                    branches: doc_node.branches.ok_or_else(|| ModelError::Parse {
                        message: format!("junction node {} has no branch count", doc_node.id),
                    })?,
                },
                "end-parallel" => NodeKind::EndParallel {
                    branches: doc_node.branches.ok_or_else(|| ModelError::Parse {
                        message: format!("junction node {} has no branch count", doc_node.id),
                    })?,
                },
                code => {
                    let kind = ElementKind::from_code(code)?;
                    let name = doc_node
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("node-{}", doc_node.id));
                    NodeKind::Element(CircuitElement::new(
                        kind,
                        name,
                        doc_node.parameters.clone(),
                    )?)
                }
            };
            if matches!(
                kind,
                NodeKind::BeginParallel { .. } | NodeKind::EndParallel { .. }
            ) && !doc_node.parameters.is_empty()
            {
                return Err(ModelError::Parse {
                    message: format!("junction node {} carries parameters", doc_node.id),
                });
            }
            nodes.push(Node {
                id: doc_node.id,
                kind,
            });
        }
        let edges = self
            .edges
            .iter()
            .map(|e| Edge {
                left: e.left,
                right: e.right,
                left_slot: e.left_slot,
                right_slot: e.right_slot,
            })
            .collect();
        Ok(ModelGraph::from_parts(nodes, edges))
    }

    /// Build a document from a model, including the pre-order cache.
    pub fn from_model(model: &CircuitModel) -> Self {
        let graph = model.tree().to_graph();
        let nodes = graph
            .nodes()
            .iter()
            .map(|node| match &node.kind {
                NodeKind::Element(element) => DocumentNode {
                    id: node.id,
                    kind: element.kind().code().to_string(),
                    name: Some(element.name().to_string()),
                    branches: None,
                    parameters: element.parameters().to_vec(),
                },
                NodeKind::BeginParallel { branches } => DocumentNode {
                    id: node.id,
                    kind: "begin-parallel".to_string(),
                    name: None,
                    branches: Some(*branches),
                    parameters: Vec::new(),
                },
                NodeKind::EndParallel { branches } => DocumentNode {
                    id: node.id,
                    kind: "end-parallel".to_string(),
                    name: None,
                    branches: Some(*branches),
                    parameters: Vec::new(),
                },
            })
            .collect();
        let edges = graph
            .edges()
            .iter()
            .map(|e| DocumentEdge {
                left: e.left,
                right: e.right,
                left_slot: e.left_slot,
                right_slot: e.right_slot,
            })
            .collect();
        Self {
            name: model.name().to_string(),
            nodes,
            edges,
            parsed_tree: Some(model.tree().clone()),
        }
    }
}

impl CircuitModel {
    /// Assemble a model directly from a tree (used for built-in models).
    pub fn from_tree(name: impl Into<String>, tree: ParsedTree) -> Self {
        let graph = tree.to_graph();
        Self {
            name: name.into(),
            graph,
            tree,
        }
    }

    /// Model name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The authoritative node/edge graph.
    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    /// The reconstructed expression tree.
    pub fn tree(&self) -> &ParsedTree {
        &self.tree
    }

    /// Leaf elements in canonical order.
    pub fn elements(&self) -> Vec<&CircuitElement> {
        self.tree.elements()
    }

    /// Look up an element by its user-assigned name.
    pub fn element(&self, name: &str) -> Option<&CircuitElement> {
        self.elements().into_iter().find(|e| e.name() == name)
    }

    /// Serialize to the upload document form (JSON bytes).
    pub fn to_document_bytes(&self) -> ModelResult<Vec<u8>> {
        Ok(ModelDocument::from_model(self).to_json()?.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rc_document(parsed_tree: Option<ParsedTree>) -> ModelDocument {
        ModelDocument {
            name: "rc".to_string(),
            nodes: vec![
                DocumentNode {
                    id: 0,
                    kind: "resistor".to_string(),
                    name: Some("R0".to_string()),
                    branches: None,
                    parameters: vec![Parameter {
                        index: 0,
                        value: 100.0,
                        fixed: false,
                    }],
                },
                DocumentNode {
                    id: 1,
                    kind: "capacitor".to_string(),
                    name: Some("C0".to_string()),
                    branches: None,
                    parameters: vec![Parameter {
                        index: 0,
                        value: 1e-6,
                        fixed: true,
                    }],
                },
            ],
            edges: vec![DocumentEdge {
                left: 0,
                right: 1,
                left_slot: 0,
                right_slot: 0,
            }],
            parsed_tree,
        }
    }

    #[test]
    fn test_document_round_trip_json() {
        let document = rc_document(None);
        let json = document.to_json().unwrap();
        let parsed = ModelDocument::from_json(&json).unwrap();
        assert_eq!(parsed.nodes.len(), 2);
        assert_eq!(parsed.edges.len(), 1);
    }

    #[test]
    fn test_into_model_rebuilds_tree() {
        let model = rc_document(None).into_model().unwrap();
        assert_eq!(model.tree().to_string(), "Serial[R0, C0]");
        assert_eq!(model.element("C0").unwrap().is_fixed(0), Some(true));
    }

    #[test]
    fn test_divergent_cache_is_discarded() {
        let wrong_cache = ParsedTree::Element(
            CircuitElement::new(
                ElementKind::Inductor,
                "L9",
                vec![Parameter {
                    index: 0,
                    value: 1.0,
                    fixed: false,
                }],
            )
            .unwrap(),
        );
        let model = rc_document(Some(wrong_cache)).into_model().unwrap();
        // Rebuilt tree wins over the cache.
        assert_eq!(model.tree().to_string(), "Serial[R0, C0]");
    }

    #[test]
    fn test_unknown_kind_in_document() {
        let mut document = rc_document(None);
        document.nodes[0].kind = "memristor".to_string();
        assert!(matches!(
            document.into_model(),
            Err(ModelError::UnknownKind { .. })
        ));
    }

    #[test]
    fn test_junction_with_parameters_rejected() {
        let mut document = rc_document(None);
        document.nodes[0].kind = "begin-parallel".to_string();
        document.nodes[0].branches = Some(2);
        let err = document.into_model().expect_err("junction with parameters");
        assert!(err.to_string().contains("carries parameters"));
    }

    #[test]
    fn test_from_model_keeps_preorder_cache() {
        let model = rc_document(None).into_model().unwrap();
        let document = ModelDocument::from_model(&model);
        assert!(document.parsed_tree.is_some());
        let rebuilt = document.into_model().unwrap();
        assert_eq!(rebuilt.tree(), model.tree());
    }
}
