// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! The error taxonomy of the negotiation protocol (spec §7).
//!
//! Every fallible operation in this crate returns a tagged [`NegotiationError`]
//! rather than a sentinel integer code plus `errno`, the way the original
//! sgsh negotiation core did.

use std::io;

/// A failure in reading or writing the circulating message block.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("short read: expected {expected} bytes, got {got}")]
    ShortRead { expected: usize, got: usize },

    #[error("message of {actual} bytes exceeds the {limit} byte buffer")]
    Oversize { limit: usize, actual: usize },

    #[error("failed to encode/decode wire message: {0}")]
    Codec(#[from] bincode::Error),

    #[error("failed to pass file descriptors: {0}")]
    FdTransfer(io::Error),
}

/// The taxonomy of fatal errors a negotiation can end in (spec §7).
///
/// No variant here is retried; the state machine in [`crate::round`] maps
/// every one of these to the `ERROR` state flag and unwinds.
#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    /// Read/write failure, short read, or oversized message.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The dispatcher index named in an arriving block is absent from the
    /// graph, or the direction it claims is inconsistent with this tool's
    /// `sgsh_in`/`sgsh_out` flags.
    #[error("protocol structure error: {0}")]
    ProtocolStructure(String),

    /// The constraint solver could not satisfy a node's declared capacity.
    #[error("infeasible graph: {0}")]
    Infeasible(String),

    /// A required environment variable was missing or non-numeric.
    #[error("environment error: {0}")]
    Environment(String),
}

impl From<io::Error> for NegotiationError {
    fn from(e: io::Error) -> Self {
        NegotiationError::Transport(TransportError::Io(e))
    }
}

pub type Result<T> = std::result::Result<T, NegotiationError>;
