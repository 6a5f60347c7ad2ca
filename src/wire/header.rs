// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The fixed-size scalar header that opens every message block on the wire
//! (spec §4.2, item 1).

use serde::{Deserialize, Serialize};

use super::message::MessageBlock;
use super::types::{DispatcherTag, FdSide, StateFlag};
use crate::error::NegotiationError;

const NO_DISPATCHER: i32 = -1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub(crate) struct WireHeader {
    pub version: u32,
    pub n_nodes: u32,
    pub n_edges: u32,
    pub initiator_pid: i32,
    pub state_flag: StateFlag,
    pub serial_no: u64,
    pub dispatcher_index: i32,
    pub dispatcher_side: u8,
}

impl WireHeader {
    pub(crate) fn template() -> Self {
        WireHeader {
            version: 0,
            n_nodes: 0,
            n_edges: 0,
            initiator_pid: 0,
            state_flag: StateFlag::Negotiation,
            serial_no: 0,
            dispatcher_index: NO_DISPATCHER,
            dispatcher_side: 0,
        }
    }

    pub(crate) fn from_block(block: &MessageBlock) -> Self {
        let (dispatcher_index, dispatcher_side) = match block.dispatcher {
            Some(tag) => (tag.index as i32, side_to_wire(tag.fd_direction)),
            None => (NO_DISPATCHER, 0),
        };
        let n_edges = match block.state {
            StateFlag::Negotiation => block.edges.len() as u32,
            _ => 0,
        };
        WireHeader {
            version: block.version,
            n_nodes: block.nodes.len() as u32,
            n_edges,
            initiator_pid: block.initiator_pid,
            state_flag: block.state,
            serial_no: block.serial_no,
            dispatcher_index,
            dispatcher_side,
        }
    }

    pub(crate) fn dispatcher(&self) -> Result<Option<DispatcherTag>, NegotiationError> {
        if self.dispatcher_index < 0 {
            return Ok(None);
        }
        let fd_direction = side_from_wire(self.dispatcher_side).ok_or_else(|| {
            NegotiationError::ProtocolStructure(format!(
                "header names unknown dispatcher side {}",
                self.dispatcher_side
            ))
        })?;
        Ok(Some(DispatcherTag {
            index: self.dispatcher_index as u32,
            fd_direction,
        }))
    }
}

fn side_to_wire(side: FdSide) -> u8 {
    match side {
        FdSide::Stdin => 0,
        FdSide::Stdout => 1,
    }
}

fn side_from_wire(raw: u8) -> Option<FdSide> {
    match raw {
        0 => Some(FdSide::Stdin),
        1 => Some(FdSide::Stdout),
        _ => None,
    }
}
