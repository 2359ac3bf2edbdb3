//! Property-based test generators using proptest.
//!
//! Graphs are generated as edge lists over numbered nodes so that cycles,
//! self-loops and diamonds all show up.

use crate::fixtures::EntityGraph;
use proptest::prelude::*;

/// Node id for an index.
pub fn node_id(index: usize) -> String {
    format!("n{index}")
}

/// Shape of a random passenger graph.
#[derive(Debug, Clone)]
pub struct GraphSpec {
    /// Number of nodes, ids `n0..n{nodes-1}`.
    pub nodes: usize,
    /// Passenger edges by node index.
    pub edges: Vec<(usize, usize)>,
}

impl GraphSpec {
    /// Builds the graph.
    pub fn build(&self) -> EntityGraph {
        let mut graph = EntityGraph::new();
        for index in 0..self.nodes {
            graph.node(&node_id(index));
        }
        for &(from, to) in &self.edges {
            graph.edge(&node_id(from), &node_id(to));
        }
        graph
    }
}

/// Strategy for graphs with `1..=max_nodes` nodes.
pub fn entity_graph_strategy(max_nodes: usize) -> impl Strategy<Value = GraphSpec> {
    (1..=max_nodes.max(1)).prop_flat_map(|nodes| {
        prop::collection::vec((0..nodes, 0..nodes), 0..nodes * 2)
            .prop_map(move |edges| GraphSpec { nodes, edges })
    })
}

/// One step against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOp {
    /// Send the node with this index.
    Send(usize),
    /// Send the node only if the client tracks it.
    SendIfTracking(usize),
    /// Bump the node's version.
    Touch(usize),
    /// Delete the node on the client.
    Delete(usize),
    /// Pop the pending batch.
    Pop,
    /// Forget everything the client holds.
    ForgetAll,
}

/// Strategy for a single session step over `nodes` nodes.
pub fn session_op_strategy(nodes: usize) -> impl Strategy<Value = SessionOp> {
    let nodes = nodes.max(1);
    prop_oneof![
        4 => (0..nodes).prop_map(SessionOp::Send),
        2 => (0..nodes).prop_map(SessionOp::SendIfTracking),
        3 => (0..nodes).prop_map(SessionOp::Touch),
        1 => (0..nodes).prop_map(SessionOp::Delete),
        2 => Just(SessionOp::Pop),
        1 => Just(SessionOp::ForgetAll),
    ]
}

/// Strategy for a sequence of session steps.
pub fn session_ops_strategy(
    nodes: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<SessionOp>> {
    prop::collection::vec(session_op_strategy(nodes), 0..max_ops)
}
