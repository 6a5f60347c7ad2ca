// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The edge record (spec §3 "Edge").

use serde::{Deserialize, Serialize};

/// A directed connection between two nodes, identified by graph index.
///
/// Already constant-width (three plain integers), so unlike [`super::node::Node`]
/// it needs no wire/domain split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    /// Number of parallel pipes realizing this connection. Zero until the
    /// solver runs (spec §3: "filled in only after the solver runs").
    pub instances: u32,
}

impl Edge {
    pub fn new(from: u32, to: u32) -> Self {
        Edge {
            from,
            to,
            instances: 0,
        }
    }

    pub fn endpoints(&self) -> (u32, u32) {
        (self.from, self.to)
    }
}
