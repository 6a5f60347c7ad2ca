// Licensed under the Apache License, Version 2.0. See LICENSE for details.

//! A non-blocking byte channel over one of the tool's two standard
//! descriptors (spec §4.2, §5).
//!
//! Unlike the fd-passing sockets in [`super::fd_channel`], the message block
//! itself travels as plain bytes over whatever the shell wired to stdin/
//! stdout — a pipe, in the common case, not necessarily a socket — so this
//! wraps raw `read`/`write` syscalls rather than `sendfd`'s `SCM_RIGHTS`
//! machinery.

use std::io;
use std::os::unix::io::RawFd;

use libc::{STDIN_FILENO, STDOUT_FILENO};

/// One of the tool's two standard descriptors, opened for the duration of
/// negotiation. Does not own or close `fd` on drop: closing descriptor 0 or
/// 1 out from under the process is not this crate's business (spec's "OUT OF
/// SCOPE": the shell and the tool's own business logic own their lifecycle).
#[derive(Debug)]
pub struct Channel {
    fd: RawFd,
}

impl Channel {
    pub fn stdin() -> Self {
        Channel { fd: STDIN_FILENO }
    }

    pub fn stdout() -> Self {
        Channel { fd: STDOUT_FILENO }
    }

    /// Wraps an arbitrary descriptor. Used by tests to stand in for a
    /// standard descriptor with a real pipe, so the non-blocking read/write
    /// paths can be exercised without touching the test process's own
    /// stdin/stdout.
    #[cfg(test)]
    pub(crate) fn from_raw_fd(fd: RawFd) -> Self {
        Channel { fd }
    }

    pub fn set_nonblocking(&self, nonblocking: bool) -> io::Result<()> {
        // SAFETY: fd is a valid, open standard descriptor for the lifetime
        // of the process; fcntl with F_GETFL/F_SETFL never takes ownership.
        let flags = unsafe { libc::fcntl(self.fd, libc::F_GETFL) };
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let flags = if nonblocking {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        let rc = unsafe { libc::fcntl(self.fd, libc::F_SETFL, flags) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// One `read(2)` attempt. `Ok(0)` is EOF; `WouldBlock` means the other
    /// side should be tried next (spec §4.2).
    pub fn try_read(&self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: buf is valid for buf.len() writable bytes for the
        // duration of the call.
        let n = unsafe { libc::read(self.fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    /// Writes `buf` in full, retrying short writes, `EINTR`, and a
    /// `WouldBlock` from a full pipe buffer (this descriptor is
    /// non-blocking; a stalled forwarding write is an ordinary suspension
    /// point, not a fatal error — spec §5).
    pub fn write_all(&self, mut buf: &[u8]) -> io::Result<()> {
        while !buf.is_empty() {
            // SAFETY: buf is valid for buf.len() readable bytes.
            let n = unsafe {
                libc::write(self.fd, buf.as_ptr() as *const libc::c_void, buf.len())
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                match err.kind() {
                    io::ErrorKind::Interrupted => continue,
                    io::ErrorKind::WouldBlock => {
                        self.wait_writable()?;
                        continue;
                    }
                    _ => return Err(err),
                }
            }
            buf = &buf[n as usize..];
        }
        Ok(())
    }

    /// Blocks until this descriptor is ready for writing.
    fn wait_writable(&self) -> io::Result<()> {
        let mut pfd = libc::pollfd {
            fd: self.fd,
            events: libc::POLLOUT,
            revents: 0,
        };
        loop {
            // SAFETY: pfd is one well-formed pollfd, valid for the call.
            let rc = unsafe { libc::poll(&mut pfd, 1, -1) };
            if rc < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            return Ok(());
        }
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.fd
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn pipe() -> (Channel, Channel) {
        let mut fds = [0 as RawFd; 2];
        let rc = unsafe { libc::pipe(fds.as_mut_ptr()) };
        assert_eq!(rc, 0, "pipe(2) failed: {}", io::Error::last_os_error());
        (Channel::from_raw_fd(fds[0]), Channel::from_raw_fd(fds[1]))
    }

    #[test]
    fn try_read_reports_would_block_on_an_empty_nonblocking_pipe() {
        let (read_end, _write_end) = pipe();
        read_end.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 4];
        let err = read_end.try_read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn write_all_then_try_read_round_trips_a_small_payload() {
        let (read_end, write_end) = pipe();
        write_end.write_all(b"hello").unwrap();
        let mut buf = [0u8; 5];
        let mut filled = 0;
        while filled < buf.len() {
            filled += read_end.try_read(&mut buf[filled..]).unwrap();
        }
        assert_eq!(&buf, b"hello");
    }

    /// A write past the kernel pipe buffer's capacity must block (via
    /// `wait_writable`'s `POLLOUT` wait) rather than fail, and must resume
    /// once a reader drains the pipe.
    #[test]
    fn write_all_waits_out_a_full_pipe_buffer() {
        let (read_end, write_end) = pipe();
        write_end.set_nonblocking(true).unwrap();
        let payload = vec![7u8; 256 * 1024];
        let expected = payload.clone();

        let writer = thread::spawn(move || write_end.write_all(&payload).unwrap());
        thread::sleep(Duration::from_millis(20));

        let mut received = Vec::with_capacity(expected.len());
        let mut buf = [0u8; 4096];
        while received.len() < expected.len() {
            match read_end.try_read(&mut buf) {
                Ok(0) => break,
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(5));
                }
                Err(e) => panic!("unexpected read error: {e}"),
            }
        }
        writer.join().unwrap();
        assert_eq!(received, expected);
    }
}
