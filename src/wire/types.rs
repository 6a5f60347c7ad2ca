// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Scalar wire types shared by the header, node, and edge records (spec §3).

use serde::{Deserialize, Serialize};

/// Bound on a node's human-readable name, matching the original's `char name[100]`.
pub const NODE_NAME_LEN: usize = 100;

/// Default instance count handed to a flexible edge when both its capacity
/// and its peer's are not enough to pin down a number on their own (spec §4.6,
/// resolved Open Question — see DESIGN.md).
pub const DEFAULT_FLEXIBLE_QUANTUM: u32 = 5;

const UNLIMITED_SENTINEL: i64 = -1;

/// A node's declared capacity on one side (input or output).
///
/// Encoded on the wire as a plain `i64` with `-1` meaning "unlimited" so that
/// every node record has the same byte size regardless of which variant is
/// in play; see [`Capacity::to_wire`]/[`Capacity::from_wire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capacity {
    Fixed(u32),
    Unlimited,
}

impl Capacity {
    pub(crate) fn to_wire(self) -> i64 {
        match self {
            Capacity::Fixed(n) => i64::from(n),
            Capacity::Unlimited => UNLIMITED_SENTINEL,
        }
    }

    pub(crate) fn from_wire(raw: i64) -> Self {
        if raw < 0 {
            Capacity::Unlimited
        } else {
            Capacity::Fixed(raw as u32)
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Capacity::Unlimited)
    }
}

/// Which of a tool's two standard channels a block arrived on or was sent on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FdSide {
    Stdin,
    Stdout,
}

impl FdSide {
    pub fn opposite(self) -> Self {
        match self {
            FdSide::Stdin => FdSide::Stdout,
            FdSide::Stdout => FdSide::Stdin,
        }
    }
}

/// The message block's protocol state (spec §3, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateFlag {
    Negotiation,
    NegotiationEnd,
    SolutionShare,
    Error,
}

/// Records the graph index and side of the tool that most recently forwarded
/// a block (spec §3 "Dispatcher tag").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherTag {
    pub index: u32,
    pub fd_direction: FdSide,
}
