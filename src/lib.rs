// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Peer-to-peer I/O negotiation for cooperating `sgsh` pipeline tools.
//!
//! Every participating tool calls [`negotiate`] once, after the shell has
//! wired its standard input and standard output to its pipeline neighbors
//! and set the `SGSH_IN`/`SGSH_OUT` environment variables. The call blocks
//! until this tool's place in the shared pipe graph is settled, returning
//! the file descriptors it should read from and write to thereafter.

mod broadcast;
mod competition;
mod env;
mod error;
mod graph;
mod platform;
mod receiver;
mod round;
mod session;
mod solver;
mod wire;

pub use error::{NegotiationError, TransportError};
pub use round::NegotiationOutcome;
pub use wire::Capacity;

use session::NegotiationSession;

/// Runs the negotiation protocol for one tool to completion.
///
/// `tool_name` is used only for diagnostics; tools are identified on the
/// wire by pid. `channels_required`/`channels_provided` are this tool's own
/// declared input/output capacity (spec §4.1, §4.3).
pub fn negotiate(
    tool_name: &str,
    channels_required: Capacity,
    channels_provided: Capacity,
) -> Result<NegotiationOutcome, NegotiationError> {
    let activity = env::bootstrap()?;
    tracing::debug!(tool_name, ?channels_required, ?channels_provided, "starting negotiation");
    let session = NegotiationSession::new(tool_name, channels_required, channels_provided, activity)?;
    session.run()
}
