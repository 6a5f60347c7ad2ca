// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Solution broadcaster (spec §4.7): allocates pipes for this tool's
//! outgoing edges and hands their read ends to the shell's pre-bound control
//! sockets, one ancillary message per instance.

use std::os::unix::io::{AsRawFd, OwnedFd};

use nix::unistd;

use crate::error::{NegotiationError, TransportError};
use crate::platform::{outgoing_descriptor, DescriptorSequence};
use crate::wire::Edge;

/// Creates one pipe per instance of every outgoing edge, sends each read end
/// on the next descriptor of the shell's round-robin convention, and returns
/// the write ends this tool retains (spec §3 "Ownership": "the sender closes
/// the read end after queueing it as ancillary data and retains only the
/// write end").
pub fn send_outgoing(outgoing: &[Edge]) -> Result<Vec<OwnedFd>, NegotiationError> {
    let mut sequence = DescriptorSequence::new();
    let mut write_ends = Vec::new();

    for edge in outgoing {
        for _ in 0..edge.instances {
            let (read_end, write_end) = unistd::pipe().map_err(|e| {
                NegotiationError::Transport(TransportError::Io(std::io::Error::from(e)))
            })?;
            let control_fd = sequence
                .next()
                .expect("descriptor sequence never terminates");
            // SAFETY: control_fd names a control socket the shell pre-bound
            // for exactly this purpose, in the agreed round-robin order.
            let control = unsafe { outgoing_descriptor(control_fd) };
            let send_result = control.send_fd(read_end.as_raw_fd());
            drop(read_end);
            send_result.map_err(|e| NegotiationError::Transport(TransportError::FdTransfer(e)))?;
            write_ends.push(write_end);
        }
    }

    Ok(write_ends)
}
