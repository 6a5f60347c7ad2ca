// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Concrete I/O: the two standard byte channels and the ancillary
//! descriptor-passing sockets (spec §4.2, §4.7, §4.8, §5).

mod channel;
mod fd_channel;

pub use channel::Channel;
pub use fd_channel::{DescriptorSequence, FdChannel};

use std::io;
use std::os::unix::io::RawFd;

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};

use crate::env::SgshActivity;
use crate::error::{NegotiationError, TransportError};
use crate::wire::{AlternatingChannels, FdSide};

/// The tool's two standard channels, narrowed to the ones the shell marked
/// sgsh-active (spec §4.2: "Only sides that are sgsh-active for this tool
/// are attempted", a deliberate narrowing of the original documented in
/// DESIGN.md).
pub struct PeerChannels {
    stdin: Option<Channel>,
    stdout: Option<Channel>,
}

impl PeerChannels {
    pub fn new(activity: SgshActivity) -> io::Result<Self> {
        let stdin = if activity.sgsh_in {
            let c = Channel::stdin();
            c.set_nonblocking(true)?;
            Some(c)
        } else {
            None
        };
        let stdout = if activity.sgsh_out {
            let c = Channel::stdout();
            c.set_nonblocking(true)?;
            Some(c)
        } else {
            None
        };
        Ok(PeerChannels { stdin, stdout })
    }

    fn channel(&self, side: FdSide) -> Option<&Channel> {
        match side {
            FdSide::Stdin => self.stdin.as_ref(),
            FdSide::Stdout => self.stdout.as_ref(),
        }
    }

    /// Blocks (via `poll`) until at least one active side is readable, then
    /// returns the sides currently ready. Actually draining a ready side is
    /// still governed by the non-blocking alternating-read loop of
    /// [`AlternatingChannels::read_chunk`] (spec §9: readiness polling
    /// governs *when* to read, not how much).
    fn wait_readable(&self) -> Result<(), NegotiationError> {
        let mut fds = Vec::with_capacity(2);
        if let Some(c) = &self.stdin {
            fds.push(PollFd::new(
                unsafe { std::os::fd::BorrowedFd::borrow_raw(c.as_raw_fd()) },
                PollFlags::POLLIN,
            ));
        }
        if let Some(c) = &self.stdout {
            fds.push(PollFd::new(
                unsafe { std::os::fd::BorrowedFd::borrow_raw(c.as_raw_fd()) },
                PollFlags::POLLIN,
            ));
        }
        if fds.is_empty() {
            return Err(NegotiationError::ProtocolStructure(
                "neither standard channel is sgsh-active".into(),
            ));
        }
        loop {
            match poll(&mut fds, PollTimeout::NONE) {
                Ok(_) => return Ok(()),
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    return Err(NegotiationError::Transport(TransportError::Io(
                        io::Error::from(e),
                    )))
                }
            }
        }
    }
}

impl AlternatingChannels for PeerChannels {
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<FdSide, NegotiationError> {
        let mut filled = 0;
        // Once a side has delivered the first byte of this chunk, every
        // remaining byte of it must come from that same side: two tools
        // racing to initiate (spec §4.4/§9) can each have data ready on the
        // other candidate, and splicing their bytes into one chunk would
        // silently corrupt the message block instead of surfacing spec
        // §4.2's short-read failure.
        let mut locked_side: Option<FdSide> = None;
        loop {
            self.wait_readable()?;
            let candidates: &[FdSide] = match locked_side {
                Some(side) => std::slice::from_ref(&side),
                None => &[FdSide::Stdin, FdSide::Stdout],
            };
            let mut progressed = false;
            for &candidate in candidates {
                let Some(channel) = self.channel(candidate) else {
                    continue;
                };
                match channel.try_read(&mut buf[filled..]) {
                    Ok(0) if filled < buf.len() => continue,
                    Ok(n) => {
                        filled += n;
                        locked_side = Some(candidate);
                        progressed = true;
                        if filled == buf.len() {
                            return Ok(candidate);
                        }
                        break;
                    }
                    Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                    Err(e) => {
                        return Err(NegotiationError::Transport(TransportError::Io(e)));
                    }
                }
            }
            if !progressed {
                // Readiness said at least one side had data, but the read
                // came back empty or blocked on both; try again.
                continue;
            }
        }
    }

    fn write_chunk(&mut self, side: FdSide, buf: &[u8]) -> Result<(), NegotiationError> {
        let channel = self.channel(side).ok_or_else(|| {
            NegotiationError::ProtocolStructure(format!(
                "attempted to write on inactive side {side:?}"
            ))
        })?;
        channel
            .write_all(buf)
            .map_err(|e| NegotiationError::Transport(TransportError::Io(e)))
    }

    fn is_active(&self, side: FdSide) -> bool {
        match side {
            FdSide::Stdin => self.stdin.is_some(),
            FdSide::Stdout => self.stdout.is_some(),
        }
    }
}

/// Opens the pre-bound outgoing control sockets the shell set up for
/// ancillary descriptor passing, in the round-robin order of spec §4.7.
///
/// # Safety
/// Each descriptor handed out by the sequence must name a socket the shell
/// pre-bound for this purpose.
pub unsafe fn outgoing_descriptor(fd: RawFd) -> FdChannel {
    FdChannel::from_raw_fd(fd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn pipe() -> (RawFd, RawFd) {
        let mut fds = [0 as RawFd; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe(2) failed: {}", io::Error::last_os_error());
        (fds[0], fds[1])
    }

    fn nonblocking(fd: RawFd) -> Channel {
        let channel = Channel::from_raw_fd(fd);
        channel.set_nonblocking(true).unwrap();
        channel
    }

    /// A real two-pipe stand-in for the standard channels, built without
    /// touching the test process's own stdin/stdout.
    fn rigged_peer() -> (PeerChannels, Channel, Channel) {
        let (stdin_read, stdin_write) = pipe();
        let (stdout_read, stdout_write) = pipe();
        let peer = PeerChannels {
            stdin: Some(nonblocking(stdin_read)),
            stdout: Some(nonblocking(stdout_read)),
        };
        (peer, nonblocking(stdin_write), nonblocking(stdout_write))
    }

    /// A full, unrelated chunk sits ready on stdout from the very first
    /// poll (the "two tools racing to initiate" scenario of spec §4.4/§9),
    /// while stdin only has a partial fragment of the chunk actually being
    /// assembled. `read_chunk` must finish assembling from stdin alone
    /// rather than splicing in stdout's bytes.
    #[test]
    fn read_chunk_does_not_splice_bytes_across_sides() {
        let (mut peer, stdin_write, stdout_write) = rigged_peer();

        stdout_write.write_all(&[0xAAu8; 8]).unwrap();
        stdin_write.write_all(&[1, 2, 3]).unwrap();

        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            stdin_write.write_all(&[4, 5, 6, 7, 8]).unwrap();
        });

        let mut buf = [0u8; 8];
        let side = peer.read_chunk(&mut buf).unwrap();
        writer.join().unwrap();

        assert_eq!(side, FdSide::Stdin);
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 8]);

        // The unrelated stdout chunk must still be sitting there untouched.
        let mut leftover = [0u8; 8];
        let n = peer
            .channel(FdSide::Stdout)
            .unwrap()
            .try_read(&mut leftover)
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(leftover, [0xAAu8; 8]);
    }

    #[test]
    fn read_chunk_reads_a_single_complete_side_normally() {
        let (mut peer, stdin_write, _stdout_write) = rigged_peer();
        stdin_write.write_all(&[9, 8, 7, 6]).unwrap();

        let mut buf = [0u8; 4];
        let side = peer.read_chunk(&mut buf).unwrap();
        assert_eq!(side, FdSide::Stdin);
        assert_eq!(buf, [9, 8, 7, 6]);
    }
}
