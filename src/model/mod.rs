//! Equivalent-circuit model: elements, graph topology, expression tree,
//! and the serde document format.

mod document;
mod element;
mod graph;
mod tree;

pub use document::{CircuitModel, DocumentEdge, DocumentNode, ModelDocument};
pub use element::{CircuitElement, ElementKind, Parameter, ParameterSpec};
pub use graph::{Edge, ModelGraph, Node, NodeKind};
pub use tree::ParsedTree;
