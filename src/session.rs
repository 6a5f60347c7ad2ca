// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! [`NegotiationSession`]: the one piece of mutable state a call to
//! [`crate::negotiate`] owns, replacing the original's process-wide globals
//! (spec §9 "Global mutable state").

use crate::env::SgshActivity;
use crate::error::NegotiationError;
use crate::graph::SelfDescriptor;
use crate::platform::PeerChannels;
use crate::round::{self, NegotiationOutcome};
use crate::wire::Capacity;

/// Everything one negotiation needs beyond what lives on the stack of
/// [`round::run`]: this tool's declared identity and its two standard
/// channels. Created fresh per call, dropped when it returns.
pub struct NegotiationSession {
    descriptor: SelfDescriptor,
    peer: PeerChannels,
}

impl NegotiationSession {
    pub fn new(
        tool_name: &str,
        requires_channels: Capacity,
        provides_channels: Capacity,
        activity: SgshActivity,
    ) -> Result<Self, NegotiationError> {
        let peer = PeerChannels::new(activity)?;
        let descriptor = SelfDescriptor {
            pid: std::process::id() as i32,
            name: tool_name.to_string(),
            requires_channels,
            provides_channels,
            sgsh_in: activity.sgsh_in,
            sgsh_out: activity.sgsh_out,
        };
        Ok(NegotiationSession { descriptor, peer })
    }

    pub fn run(mut self) -> Result<NegotiationOutcome, NegotiationError> {
        round::run(self.descriptor.clone(), &mut self.peer)
    }
}
