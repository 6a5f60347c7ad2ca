// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! Ancillary file-descriptor transfer over the shell's pre-bound socket
//! descriptors (spec §4.7, §4.8).

use std::io;
use std::os::unix::io::{FromRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use sendfd::{RecvWithFd, SendWithFd};

/// The round-robin socket descriptor convention of spec §4.7: "the k-th
/// descriptor sent uses index 1, 3, 4, 5, 6, ... — descriptor 0 and
/// descriptor 2 are avoided". Taken verbatim from the original's
/// `get_next_sd()`.
pub struct DescriptorSequence {
    next: RawFd,
}

impl DescriptorSequence {
    pub fn new() -> Self {
        DescriptorSequence { next: 1 }
    }
}

impl Default for DescriptorSequence {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for DescriptorSequence {
    type Item = RawFd;

    fn next(&mut self) -> Option<RawFd> {
        let fd = self.next;
        self.next = if fd == 1 { 3 } else { fd + 1 };
        Some(fd)
    }
}

/// One pre-bound control socket, used to pass exactly one pipe end as
/// ancillary data before being closed.
pub struct FdChannel {
    socket: UnixStream,
}

impl FdChannel {
    /// Opens the pre-bound descriptor `fd` as a control socket.
    ///
    /// # Safety
    /// `fd` must name a socket descriptor the shell pre-bound for this
    /// purpose and not otherwise in use by this process.
    pub unsafe fn from_raw_fd(fd: RawFd) -> Self {
        FdChannel {
            socket: UnixStream::from_raw_fd(fd),
        }
    }

    /// Sends `fd` as ancillary data with a single marker byte payload.
    pub fn send_fd(&self, fd: RawFd) -> io::Result<()> {
        let n = self.socket.send_with_fd(&[0u8], &[fd])?;
        if n == 0 {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "control socket accepted no bytes while passing a descriptor",
            ));
        }
        Ok(())
    }

    /// Receives one descriptor, blocking until it arrives.
    pub fn recv_fd(&self) -> io::Result<OwnedFd> {
        let mut payload = [0u8; 1];
        let mut fds = [0 as RawFd; 1];
        let (n, fd_count) = self.socket.recv_with_fd(&mut payload, &mut fds)?;
        if n == 0 || fd_count == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "control socket closed before a descriptor arrived",
            ));
        }
        // SAFETY: fds[0] is a freshly received, uniquely owned descriptor.
        Ok(unsafe { OwnedFd::from_raw_fd(fds[0]) })
    }
}
