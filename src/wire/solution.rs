// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The graph solution (spec §3 "Node-connection record", §4.7).

use serde::{Deserialize, Serialize};

use super::edge::Edge;

/// Per-node post-solve connection data: this node's incoming and outgoing
/// edges, each carrying its resolved `instances` count.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeConnections {
    pub node_index: u32,
    pub incoming: Vec<Edge>,
    pub outgoing: Vec<Edge>,
}

/// Fixed-width header row for one node's entry in the solution block; the
/// variable-length incoming/outgoing arrays follow separately on the wire
/// (spec §4.7), each prefixed by the counts recorded here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct SolutionHeader {
    pub node_index: u32,
    pub n_incoming: u32,
    pub n_outgoing: u32,
}

impl SolutionHeader {
    pub(crate) fn of(connections: &NodeConnections) -> Self {
        SolutionHeader {
            node_index: connections.node_index,
            n_incoming: connections.incoming.len() as u32,
            n_outgoing: connections.outgoing.len() as u32,
        }
    }
}
