// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Node/edge registry (spec §4.3): on every arrival, make sure this tool and
//! its edge to the dispatcher are present in the circulating block.

use crate::error::NegotiationError;
use crate::wire::{Capacity, Edge, FdSide, MessageBlock, Node};

/// This tool's own declared identity, supplied once at [`crate::negotiate`]
/// entry and reused on every arrival to self-register.
#[derive(Debug, Clone)]
pub struct SelfDescriptor {
    pub pid: i32,
    pub name: String,
    pub requires_channels: Capacity,
    pub provides_channels: Capacity,
    pub sgsh_in: bool,
    pub sgsh_out: bool,
}

/// Ensures `self_descriptor`'s node is present in `block`, returning its
/// graph index. Mutates and bumps `serial_no` only if the node was missing.
fn ensure_self_node(block: &mut MessageBlock, self_descriptor: &SelfDescriptor) -> (u32, bool) {
    if let Some(existing) = block.find_node_by_pid(self_descriptor.pid) {
        return (existing.index, false);
    }
    let index = block.nodes.len() as u32;
    block.nodes.push(Node {
        pid: self_descriptor.pid,
        index,
        name: self_descriptor.name.clone(),
        requires_channels: self_descriptor.requires_channels,
        provides_channels: self_descriptor.provides_channels,
        sgsh_in: self_descriptor.sgsh_in,
        sgsh_out: self_descriptor.sgsh_out,
    });
    block.serial_no += 1;
    (index, true)
}

/// Infers the directed edge between the dispatcher and this tool from the
/// side the block arrived on, asserting the activity flags spec §4.3
/// requires (self.sgsh_out gates an incoming-on-stdin arrival, self.sgsh_in
/// gates an incoming-on-stdout arrival).
fn infer_edge(
    self_index: u32,
    self_descriptor: &SelfDescriptor,
    dispatcher_index: u32,
    arrival_side: FdSide,
) -> Result<(u32, u32), NegotiationError> {
    match arrival_side {
        FdSide::Stdin => {
            if !self_descriptor.sgsh_out {
                return Err(NegotiationError::ProtocolStructure(
                    "block arrived on stdin but this tool's stdout is not sgsh-active".into(),
                ));
            }
            Ok((self_index, dispatcher_index))
        }
        FdSide::Stdout => {
            if !self_descriptor.sgsh_in {
                return Err(NegotiationError::ProtocolStructure(
                    "block arrived on stdout but this tool's stdin is not sgsh-active".into(),
                ));
            }
            Ok((dispatcher_index, self_index))
        }
    }
}

/// Inserts this tool's node and the edge to the dispatcher, if either is
/// missing. Returns whether anything changed (spec §4.3's "modified" flag).
///
/// `None` for `arrival_side`/dispatcher means this block was just created
/// locally (no arrival yet) and only self-registration applies.
pub fn register_arrival(
    block: &mut MessageBlock,
    self_descriptor: &SelfDescriptor,
    arrival: Option<(u32, FdSide)>,
) -> Result<bool, NegotiationError> {
    let (self_index, node_modified) = ensure_self_node(block, self_descriptor);

    let Some((dispatcher_index, arrival_side)) = arrival else {
        return Ok(node_modified);
    };
    if dispatcher_index as usize >= block.nodes.len() {
        return Err(NegotiationError::ProtocolStructure(format!(
            "dispatcher index {dispatcher_index} absent from the graph"
        )));
    }
    if dispatcher_index == self_index {
        return Ok(node_modified);
    }

    let (from, to) = infer_edge(self_index, self_descriptor, dispatcher_index, arrival_side)?;
    if block.find_edge(from, to).is_some() {
        return Ok(node_modified);
    }
    block.edges.push(Edge::new(from, to));
    block.serial_no += 1;
    Ok(true)
}
