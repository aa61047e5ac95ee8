//! The canonical nested serial/parallel expression tree.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::element::CircuitElement;
use crate::model::graph::{Edge, ModelGraph, Node, NodeKind};

/// Nested serial/parallel composition reconstructed from a circuit graph.
///
/// Structural equality (`PartialEq`) compares nesting, leaf identity and
/// order, which is the invariant the graph rebuild guarantees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParsedTree {
    /// Ordered serial composition.
    Serial(Vec<ParsedTree>),
    /// Parallel branches, indexed by branch slot.
    Parallel(Vec<ParsedTree>),
    /// A single circuit element.
    Element(CircuitElement),
}

impl ParsedTree {
    /// All leaf elements in canonical (pre-order) traversal order.
    pub fn elements(&self) -> Vec<&CircuitElement> {
        let mut out = Vec::new();
        self.collect_elements(&mut out);
        out
    }

    fn collect_elements<'a>(&'a self, out: &mut Vec<&'a CircuitElement>) {
        match self {
            ParsedTree::Element(element) => out.push(element),
            ParsedTree::Serial(items) | ParsedTree::Parallel(items) => {
                for item in items {
                    item.collect_elements(out);
                }
            }
        }
    }

    /// Serialize the tree back into a node/edge graph.
    ///
    /// Node ids are assigned by a deterministic pre-order walk; each
    /// `Parallel` emits a `BeginParallel`/`EndParallel` pair with matching
    /// branch count, and each `Serial` step a slot-0 edge. Rebuilding the
    /// returned graph yields a structurally identical tree.
    pub fn to_graph(&self) -> ModelGraph {
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        self.emit(&mut nodes, &mut edges);
        ModelGraph::from_parts(nodes, edges)
    }

    // Returns the (head, tail) node ids of the emitted subgraph.
    fn emit(&self, nodes: &mut Vec<Node>, edges: &mut Vec<Edge>) -> (u32, u32) {
        match self {
            ParsedTree::Element(element) => {
                let id = nodes.len() as u32;
                nodes.push(Node {
                    id,
                    kind: NodeKind::Element(element.clone()),
                });
                (id, id)
            }
            ParsedTree::Serial(items) => {
                let mut head = None;
                let mut prev_tail: Option<u32> = None;
                for item in items {
                    let (item_head, item_tail) = item.emit(nodes, edges);
                    if head.is_none() {
                        head = Some(item_head);
                    }
                    if let Some(tail) = prev_tail {
                        edges.push(Edge {
                            left: tail,
                            right: item_head,
                            left_slot: 0,
                            right_slot: 0,
                        });
                    }
                    prev_tail = Some(item_tail);
                }
                // A Serial is never empty by construction.
                (head.unwrap_or(0), prev_tail.unwrap_or(0))
            }
            ParsedTree::Parallel(branches) => {
                let branch_count = branches.len() as u32;
                let begin = nodes.len() as u32;
                nodes.push(Node {
                    id: begin,
                    kind: NodeKind::BeginParallel {
                        branches: branch_count,
                    },
                });
                let mut terminations = Vec::with_capacity(branches.len());
                for (slot, branch) in branches.iter().enumerate() {
                    let (branch_head, branch_tail) = branch.emit(nodes, edges);
                    edges.push(Edge {
                        left: begin,
                        right: branch_head,
                        left_slot: slot as u32,
                        right_slot: 0,
                    });
                    terminations.push((branch_tail, slot as u32));
                }
                let end = nodes.len() as u32;
                nodes.push(Node {
                    id: end,
                    kind: NodeKind::EndParallel {
                        branches: branch_count,
                    },
                });
                for (branch_tail, slot) in terminations {
                    edges.push(Edge {
                        left: branch_tail,
                        right: end,
                        left_slot: 0,
                        right_slot: slot,
                    });
                }
                (begin, end)
            }
        }
    }
}

impl fmt::Display for ParsedTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedTree::Element(element) => write!(f, "{}", element.name()),
            ParsedTree::Serial(items) => {
                write!(f, "Serial[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            ParsedTree::Parallel(branches) => {
                write!(f, "Parallel[")?;
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{branch}")?;
                }
                write!(f, "]")
            }
        }
    }
}
