// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The node record (spec §3 "Node").

use serde::{Deserialize, Serialize};

use super::fixed_name;
use super::types::Capacity;

/// One tool instance in the pipeline graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub pid: i32,
    pub index: u32,
    pub name: String,
    pub requires_channels: Capacity,
    pub provides_channels: Capacity,
    pub sgsh_in: bool,
    pub sgsh_out: bool,
}

impl Node {
    pub(crate) fn to_wire(&self) -> WireNode {
        WireNode {
            pid: self.pid,
            index: self.index,
            name: self.name.clone(),
            requires_channels: self.requires_channels.to_wire(),
            provides_channels: self.provides_channels.to_wire(),
            sgsh_in: self.sgsh_in as u8,
            sgsh_out: self.sgsh_out as u8,
        }
    }

    pub(crate) fn from_wire(wire: WireNode) -> Self {
        Node {
            pid: wire.pid,
            index: wire.index,
            name: wire.name,
            requires_channels: Capacity::from_wire(wire.requires_channels),
            provides_channels: Capacity::from_wire(wire.provides_channels),
            sgsh_in: wire.sgsh_in != 0,
            sgsh_out: wire.sgsh_out != 0,
        }
    }
}

/// Fixed-width on-the-wire shape of [`Node`]. Every field is either a plain
/// integer or the packed name array, so `bincode::serialized_size` of any two
/// instances is identical regardless of capacity or name content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct WireNode {
    pid: i32,
    index: u32,
    #[serde(with = "fixed_name")]
    name: String,
    requires_channels: i64,
    provides_channels: i64,
    sgsh_in: u8,
    sgsh_out: u8,
}

impl WireNode {
    /// A representative instance used only to measure the constant wire
    /// size of a node record; field values are otherwise irrelevant.
    pub(crate) fn template() -> Self {
        WireNode {
            pid: 0,
            index: 0,
            name: String::new(),
            requires_channels: 0,
            provides_channels: 0,
            sgsh_in: 0,
            sgsh_out: 0,
        }
    }
}
