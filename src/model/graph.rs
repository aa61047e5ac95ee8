//! Circuit graph topology and canonical tree reconstruction.
//!
//! The graph owns element nodes plus virtual `BeginParallel`/`EndParallel`
//! junction nodes and directed edges between them. [`ModelGraph::build`]
//! reconstructs the nested serial/parallel expression tree purely from the
//! topology by iterative contraction: no recursion, all traversal operates
//! on integer node ids in a flat arena.

use std::collections::{BTreeMap, HashSet};

use crate::error::{ModelError, ModelResult};
use crate::model::tree::ParsedTree;

use super::element::CircuitElement;

/// What a graph node is: an element leaf or a virtual parallel junction
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Leaf carrying a validated circuit element.
    Element(CircuitElement),
    /// Opens a parallel group with `branches` branches.
    BeginParallel {
        /// Branch count, at least 2.
        branches: u32,
    },
    /// Closes the parallel group opened by the matching begin node.
    EndParallel {
        /// Branch count, must equal the matching begin node's.
        branches: u32,
    },
}

/// One node of the circuit graph
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node id, unique within the graph.
    pub id: u32,
    /// Element payload or junction marker.
    pub kind: NodeKind,
}

/// Directed edge between two nodes.
///
/// Slot 0 is a simple serial connection point. On a `BeginParallel` node
/// the outgoing slots `0..branches-1` select the branch; on the matching
/// `EndParallel` node the incoming slot carries the same branch index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// Source node id.
    pub left: u32,
    /// Target node id.
    pub right: u32,
    /// Slot on the source side.
    pub left_slot: u32,
    /// Slot on the target side.
    pub right_slot: u32,
}

/// The full node/edge topology of an equivalent-circuit model
#[derive(Debug, Clone, PartialEq)]
pub struct ModelGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

// Working copy of a node during contraction. Plain nodes wrap the subtree
// accumulated so far; junctions wait for their parallel group to close.
#[derive(Debug, Clone)]
enum WorkNode {
    Plain(ParsedTree),
    Begin { branches: u32 },
    End { branches: u32 },
}

impl ModelGraph {
    /// Build a graph from already consistent parts (used by serialization).
    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// The graph nodes.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The graph edges.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Reconstruct the canonical serial/parallel expression tree.
    ///
    /// Applies serial and parallel contraction until a single node remains;
    /// the result is independent of edge declaration order. Fails with a
    /// parse error on dangling edges, malformed junctions, cycles, or
    /// disconnected components.
    pub fn build(&self) -> ModelResult<ParsedTree> {
        self.validate()?;

        let mut work: BTreeMap<u32, WorkNode> = self
            .nodes
            .iter()
            .map(|node| {
                let entry = match &node.kind {
                    NodeKind::Element(element) => {
                        WorkNode::Plain(ParsedTree::Element(element.clone()))
                    }
                    NodeKind::BeginParallel { branches } => WorkNode::Begin {
                        branches: *branches,
                    },
                    NodeKind::EndParallel { branches } => WorkNode::End {
                        branches: *branches,
                    },
                };
                (node.id, entry)
            })
            .collect();
        let mut edges = self.edges.clone();
        let mut next_id = self.nodes.iter().map(|n| n.id).max().unwrap_or(0) + 1;

        loop {
            if Self::contract_serial(&mut work, &mut edges, &mut next_id) {
                continue;
            }
            if Self::contract_parallel(&mut work, &mut edges, &mut next_id)? {
                continue;
            }
            break;
        }

        // Cycles survive contraction as self-edges on the merged node, so a
        // fully reduced graph has exactly one node and no edges left.
        if work.len() != 1 || !edges.is_empty() {
            return Err(ModelError::Parse {
                message: format!(
                    "graph is not reducible to a single root ({} nodes, {} edges remain)",
                    work.len(),
                    edges.len()
                ),
            });
        }
        match work.into_values().next() {
            Some(WorkNode::Plain(tree)) => Ok(tree),
            _ => Err(ModelError::Parse {
                message: "graph reduces to an unmatched parallel junction".to_string(),
            }),
        }
    }

    // Merge one slot-0/slot-0 edge between two plain nodes. Returns true
    // when a contraction happened.
    fn contract_serial(
        work: &mut BTreeMap<u32, WorkNode>,
        edges: &mut Vec<Edge>,
        next_id: &mut u32,
    ) -> bool {
        let mut candidates: Vec<Edge> = edges
            .iter()
            .copied()
            .filter(|edge| {
                edge.left != edge.right
                    && edge.left_slot == 0
                    && edge.right_slot == 0
                    && matches!(work.get(&edge.left), Some(WorkNode::Plain(_)))
                    && matches!(work.get(&edge.right), Some(WorkNode::Plain(_)))
            })
            .collect();
        candidates.sort_unstable_by_key(|edge| (edge.left, edge.right));

        let Some(edge) = candidates.first().copied() else {
            return false;
        };

        let left_tree = match work.remove(&edge.left) {
            Some(WorkNode::Plain(tree)) => tree,
            _ => unreachable!("candidate filter checked plain"),
        };
        let right_tree = match work.remove(&edge.right) {
            Some(WorkNode::Plain(tree)) => tree,
            _ => unreachable!("candidate filter checked plain"),
        };

        let merged = *next_id;
        *next_id += 1;
        work.insert(merged, WorkNode::Plain(serial_concat(left_tree, right_tree)));

        edges.retain(|e| *e != edge);
        for e in edges.iter_mut() {
            if e.left == edge.left || e.left == edge.right {
                e.left = merged;
            }
            if e.right == edge.left || e.right == edge.right {
                e.right = merged;
            }
        }
        true
    }

    // Collapse one fully reduced parallel group: a begin junction whose
    // every branch slot leads through a single plain node to the same end
    // junction at the identical slot. Returns true when a collapse happened.
    fn contract_parallel(
        work: &mut BTreeMap<u32, WorkNode>,
        edges: &mut Vec<Edge>,
        next_id: &mut u32,
    ) -> ModelResult<bool> {
        let begin_ids: Vec<(u32, u32)> = work
            .iter()
            .filter_map(|(id, node)| match node {
                WorkNode::Begin { branches } => Some((*id, *branches)),
                _ => None,
            })
            .collect();

        'begins: for (begin_id, branches) in begin_ids {
            let mut branch_nodes: Vec<Option<u32>> = vec![None; branches as usize];
            let mut end_id: Option<u32> = None;

            for edge in edges.iter() {
                if edge.left != begin_id {
                    continue;
                }
                let slot = edge.left_slot as usize;
                let Some(WorkNode::Plain(_)) = work.get(&edge.right) else {
                    // Branch head still contains an unreduced junction.
                    continue 'begins;
                };
                branch_nodes[slot] = Some(edge.right);
            }
            if branch_nodes.iter().any(Option::is_none) {
                continue;
            }

            // Each branch must terminate on one shared end junction at the
            // slot it departed from.
            for (slot, branch) in branch_nodes.iter().enumerate() {
                let branch = branch.unwrap_or_default();
                let outgoing: Vec<&Edge> =
                    edges.iter().filter(|e| e.left == branch).collect();
                let [termination] = outgoing.as_slice() else {
                    continue 'begins;
                };
                if termination.left_slot != 0 || termination.right_slot != slot as u32 {
                    continue 'begins;
                }
                match work.get(&termination.right) {
                    Some(WorkNode::End {
                        branches: end_branches,
                    }) if *end_branches == branches => {}
                    _ => continue 'begins,
                }
                match end_id {
                    None => end_id = Some(termination.right),
                    Some(existing) if existing == termination.right => {}
                    Some(existing) => {
                        return Err(ModelError::Parse {
                            message: format!(
                                "parallel group at node {begin_id} terminates on \
                                 junctions {existing} and {}",
                                termination.right
                            ),
                        })
                    }
                }
            }
            let Some(end_id) = end_id else { continue };

            let ordered: Vec<u32> = branch_nodes.into_iter().flatten().collect();
            let distinct: HashSet<u32> = ordered.iter().copied().collect();
            if distinct.len() != ordered.len() {
                return Err(ModelError::Parse {
                    message: format!(
                        "parallel group at node {begin_id} shares a node between branches"
                    ),
                });
            }

            let mut subtrees = Vec::with_capacity(ordered.len());
            for id in &ordered {
                match work.remove(id) {
                    Some(WorkNode::Plain(tree)) => subtrees.push(tree),
                    _ => unreachable!("branch nodes checked plain"),
                }
            }
            work.remove(&begin_id);
            work.remove(&end_id);

            let merged = *next_id;
            *next_id += 1;
            work.insert(merged, WorkNode::Plain(ParsedTree::Parallel(subtrees)));

            // Drop the group-internal edges, rewire the serial context.
            edges.retain(|e| {
                !(e.left == begin_id || e.right == end_id || distinct.contains(&e.left))
            });
            for e in edges.iter_mut() {
                if e.right == begin_id {
                    e.right = merged;
                }
                if e.left == end_id {
                    e.left = merged;
                }
            }
            return Ok(true);
        }
        Ok(false)
    }

    // Structural validation ahead of contraction: id uniqueness, dangling
    // edges, junction slot coverage, serial degree limits.
    fn validate(&self) -> ModelResult<()> {
        if self.nodes.is_empty() {
            return Err(ModelError::Parse {
                message: "graph has no nodes".to_string(),
            });
        }

        let mut ids = HashSet::new();
        for node in &self.nodes {
            if !ids.insert(node.id) {
                return Err(ModelError::Parse {
                    message: format!("duplicate node id {}", node.id),
                });
            }
        }
        for edge in &self.edges {
            for endpoint in [edge.left, edge.right] {
                if !ids.contains(&endpoint) {
                    return Err(ModelError::Parse {
                        message: format!("dangling edge references unknown node {endpoint}"),
                    });
                }
            }
        }

        for node in &self.nodes {
            let outgoing: Vec<&Edge> = self.edges.iter().filter(|e| e.left == node.id).collect();
            let incoming: Vec<&Edge> = self.edges.iter().filter(|e| e.right == node.id).collect();
            match &node.kind {
                NodeKind::Element(_) => {
                    if outgoing.len() > 1 || incoming.len() > 1 {
                        return Err(ModelError::Parse {
                            message: format!("element node {} has branching edges", node.id),
                        });
                    }
                    if outgoing.iter().any(|e| e.left_slot != 0)
                        || incoming.iter().any(|e| e.right_slot != 0)
                    {
                        return Err(ModelError::Parse {
                            message: format!(
                                "element node {} connected on a non-zero slot",
                                node.id
                            ),
                        });
                    }
                }
                NodeKind::BeginParallel { branches } => {
                    Self::check_junction(node.id, *branches, &outgoing, &incoming, true)?;
                }
                NodeKind::EndParallel { branches } => {
                    Self::check_junction(node.id, *branches, &incoming, &outgoing, false)?;
                }
            }
        }
        Ok(())
    }

    // `branch_side` carries the branch edges, `serial_side` the at-most-one
    // slot-0 attachment to the surrounding serial context.
    fn check_junction(
        id: u32,
        branches: u32,
        branch_side: &[&Edge],
        serial_side: &[&Edge],
        is_begin: bool,
    ) -> ModelResult<()> {
        if branches < 2 {
            return Err(ModelError::Parse {
                message: format!("junction node {id} declares branch count {branches}"),
            });
        }
        let mut slots: Vec<u32> = branch_side
            .iter()
            .map(|e| if is_begin { e.left_slot } else { e.right_slot })
            .collect();
        slots.sort_unstable();
        let expected: Vec<u32> = (0..branches).collect();
        if slots != expected {
            return Err(ModelError::Parse {
                message: format!(
                    "junction node {id} branch slots {slots:?} do not cover 0..{branches}"
                ),
            });
        }
        if serial_side.len() > 1 {
            return Err(ModelError::Parse {
                message: format!("junction node {id} has multiple serial attachments"),
            });
        }
        if let Some(edge) = serial_side.first() {
            let slot = if is_begin { edge.right_slot } else { edge.left_slot };
            if slot != 0 {
                return Err(ModelError::Parse {
                    message: format!("junction node {id} serial attachment on slot {slot}"),
                });
            }
        }
        Ok(())
    }
}

// Serial composition flattens nested serials so that chains contracted in
// any order produce the same flat list.
fn serial_concat(left: ParsedTree, right: ParsedTree) -> ParsedTree {
    let mut items = match left {
        ParsedTree::Serial(items) => items,
        other => vec![other],
    };
    match right {
        ParsedTree::Serial(mut tail) => items.append(&mut tail),
        other => items.push(other),
    }
    ParsedTree::Serial(items)
}
