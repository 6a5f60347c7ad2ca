// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The message block, the vehicle that circulates among tools (spec §3).

use super::edge::Edge;
use super::node::Node;
use super::solution::NodeConnections;
use super::types::{DispatcherTag, StateFlag};

/// The circulating negotiation state.
///
/// `edges` is populated while `state == Negotiation`; `solution` is
/// populated once `state == SolutionShare`. The two are never both
/// meaningful at once, mirroring the wire layout of spec §4.2 where the
/// edge array and the solution block occupy the same trailing position.
#[derive(Debug, Clone)]
pub struct MessageBlock {
    pub version: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub initiator_pid: i32,
    pub state: StateFlag,
    pub serial_no: u64,
    pub dispatcher: Option<DispatcherTag>,
    pub solution: Option<Vec<NodeConnections>>,
}

/// Wire protocol version. Bumped on any incompatible change to the record
/// layouts in this module.
pub const PROTOCOL_VERSION: u32 = 1;

impl MessageBlock {
    /// A fresh block created by an initiating tool (spec §4.5 "Initial state
    /// selection").
    pub fn new_initial(initiator_pid: i32) -> Self {
        MessageBlock {
            version: PROTOCOL_VERSION,
            nodes: Vec::new(),
            edges: Vec::new(),
            initiator_pid,
            state: StateFlag::Negotiation,
            serial_no: 0,
            dispatcher: None,
            solution: None,
        }
    }

    pub fn find_node_by_pid(&self, pid: i32) -> Option<&Node> {
        self.nodes.iter().find(|n| n.pid == pid)
    }

    pub fn find_edge(&self, from: u32, to: u32) -> Option<&Edge> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }
}
