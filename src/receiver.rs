// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! FD receiver (spec §4.8): collects the pipe read ends destined for this
//! tool from the same round-robin descriptor sequence the sender used.

use std::os::unix::io::OwnedFd;

use crate::error::NegotiationError;
use crate::platform::{outgoing_descriptor, DescriptorSequence};
use crate::wire::Edge;

/// Receives one descriptor per instance of every incoming edge, in the same
/// descriptor order the sender enumerated them (spec §4.8).
pub fn receive_incoming(incoming: &[Edge]) -> Result<Vec<OwnedFd>, NegotiationError> {
    let mut sequence = DescriptorSequence::new();
    let mut read_ends = Vec::new();

    for edge in incoming {
        for _ in 0..edge.instances {
            let control_fd = sequence
                .next()
                .expect("descriptor sequence never terminates");
            // SAFETY: control_fd names a control socket the shell pre-bound
            // for exactly this purpose, in the agreed round-robin order.
            let control = unsafe { outgoing_descriptor(control_fd) };
            let fd = control
                .recv_fd()
                .map_err(|e| NegotiationError::Transport(crate::error::TransportError::FdTransfer(e)))?;
            read_ends.push(fd);
        }
    }

    Ok(read_ends)
}
