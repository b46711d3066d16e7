//! Non-blocking socket driver
//!
//! Owns one TCP stream. Each [`Connection::poll_line`] call does a
//! zero-timeout readiness check, flushes as much of the write queue as the
//! socket accepts and reads at most once, handing back at most one complete
//! line. Any fatal condition closes the socket and leaves the connection
//! permanently invalid.

use std::io::{ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::{AsFd, AsRawFd};

use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{self, AddressFamily, SockFlag, SockType, SockaddrStorage};
use tracing::{debug, error, info, trace, warn};

use crate::error::{ClientError, Result};

/// Longest accepted line, newline included
pub const MAX_LINE_LEN: usize = 2048;

const READ_CHUNK: usize = 4096;

// ═══════════════════════════════════════════════════════════════════════════════
// Line buffer
// ═══════════════════════════════════════════════════════════════════════════════

/// Accumulates raw bytes and yields newline-terminated lines.
///
/// A line that grows past [`MAX_LINE_LEN`] without a newline is thrown away
/// up to and including its eventual newline.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes held that are not yet part of a complete line
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Next complete line, newline included, decoded lossily
    pub fn next_line(&mut self) -> Option<String> {
        loop {
            match self.buf.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    let line: Vec<u8> = self.buf.drain(..=idx).collect();
                    if self.discarding {
                        self.discarding = false;
                        continue;
                    }
                    if line.len() > MAX_LINE_LEN {
                        warn!(len = line.len(), "oversized line discarded");
                        continue;
                    }
                    return Some(String::from_utf8_lossy(&line).into_owned());
                }
                None => {
                    if self.buf.len() > MAX_LINE_LEN {
                        if !self.discarding {
                            warn!(len = self.buf.len(), "oversized line discarded");
                        }
                        self.buf.clear();
                        self.discarding = true;
                    }
                    return None;
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Connection
// ═══════════════════════════════════════════════════════════════════════════════

pub struct Connection {
    /// `None` once invalidated
    stream: Option<TcpStream>,
    hostname: String,
    port: u16,
    write_buf: Vec<u8>,
    lines: LineBuffer,
    last_error: Option<String>,
}

impl Connection {
    /// Resolve `host`, bind an ephemeral local port, connect, then switch
    /// the socket to non-blocking mode.
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        let remote = resolve(host, port)?;
        debug!("Resolved {}:{} to {}", host, port, remote);

        let (family, local) = match remote.ip() {
            IpAddr::V4(_) => (AddressFamily::Inet, SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 0)),
            IpAddr::V6(_) => (AddressFamily::Inet6, SocketAddr::new(Ipv6Addr::UNSPECIFIED.into(), 0)),
        };

        let fd = socket::socket(family, SockType::Stream, SockFlag::empty(), None)
            .map_err(|e| ClientError::Socket(e.to_string()))?;
        socket::bind(fd.as_raw_fd(), &SockaddrStorage::from(local))
            .map_err(|e| ClientError::Bind(e.to_string()))?;
        socket::connect(fd.as_raw_fd(), &SockaddrStorage::from(remote))
            .map_err(|e| ClientError::Connect(e.to_string()))?;

        let stream = TcpStream::from(fd);
        stream
            .set_nonblocking(true)
            .map_err(|e| ClientError::Socket(e.to_string()))?;

        info!("Connected to {}:{}", host, port);

        Ok(Self {
            stream: Some(stream),
            hostname: host.to_string(),
            port,
            write_buf: Vec::new(),
            lines: LineBuffer::new(),
            last_error: None,
        })
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_valid(&self) -> bool {
        self.stream.is_some()
    }

    /// Bytes queued but not yet written
    pub fn pending_write(&self) -> usize {
        self.write_buf.len()
    }

    /// Message describing the most recent failure
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fail with `NotConnected` once invalidated
    pub fn ensure_valid(&mut self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self.fail(ClientError::NotConnected))
        }
    }

    /// Queue bytes for the next poll
    pub fn send(&mut self, data: &[u8]) -> Result<()> {
        self.ensure_valid()?;
        self.write_buf.extend_from_slice(data);
        trace!(queued = self.write_buf.len(), "send");
        Ok(())
    }

    /// Close the socket and invalidate, recording `err`. Returns `err`.
    pub fn invalidate(&mut self, err: ClientError) -> ClientError {
        self.fail(err)
    }

    /// Caller-initiated close
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            info!("Disconnected from {}:{}", self.hostname, self.port);
        }
    }

    fn fail(&mut self, err: ClientError) -> ClientError {
        if self.stream.take().is_some() {
            error!("Connection to {}:{} lost: {}", self.hostname, self.port, err);
        }
        self.last_error = Some(err.to_string());
        err
    }

    /// One non-blocking step: returns the next complete line, if any.
    pub fn poll_line(&mut self) -> Result<Option<String>> {
        match self.step() {
            Ok(line) => Ok(line),
            Err(err) => Err(self.fail(err)),
        }
    }

    fn step(&mut self) -> Result<Option<String>> {
        let stream = self.stream.as_mut().ok_or(ClientError::NotConnected)?;

        let ready = match readiness(stream) {
            Ok(flags) => flags,
            Err(Errno::EINTR) => return Ok(None),
            Err(e) => return Err(ClientError::ExceptionalCondition(e.to_string())),
        };

        if ready.intersects(PollFlags::POLLPRI | PollFlags::POLLERR | PollFlags::POLLNVAL) {
            let reason = stream
                .take_error()
                .ok()
                .flatten()
                .map(|e| e.to_string())
                .unwrap_or_else(|| format!("{:?}", ready));
            return Err(ClientError::ExceptionalCondition(reason));
        }

        if !self.write_buf.is_empty() && ready.contains(PollFlags::POLLOUT) {
            match stream.write(&self.write_buf) {
                Ok(0) => return Err(ClientError::Write("socket accepted no data".to_string())),
                Ok(n) => {
                    self.write_buf.drain(..n);
                    trace!(written = n, pending = self.write_buf.len(), "flushed");
                }
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {}
                Err(e) => return Err(ClientError::Write(e.to_string())),
            }
        }

        // drain what is already buffered before touching the socket again
        if let Some(line) = self.lines.next_line() {
            return Ok(Some(line));
        }

        if !ready.intersects(PollFlags::POLLIN | PollFlags::POLLHUP) {
            return Ok(None);
        }

        let mut chunk = [0u8; READ_CHUNK];
        match stream.read(&mut chunk) {
            Ok(0) => Err(ClientError::EndOfStream),
            Ok(n) => {
                self.lines.extend(&chunk[..n]);
                Ok(self.lines.next_line())
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => Ok(None),
            Err(e) => Err(ClientError::Read(e.to_string())),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Zero-timeout readiness check for read, write and exceptional conditions
fn readiness(stream: &TcpStream) -> nix::Result<PollFlags> {
    let mut fds = [PollFd::new(
        stream.as_fd(),
        PollFlags::POLLIN | PollFlags::POLLOUT | PollFlags::POLLPRI,
    )];
    poll(&mut fds, PollTimeout::ZERO)?;
    Ok(fds[0].revents().unwrap_or(PollFlags::empty()))
}

/// First IPv4 address for `host`, else the first address of any family
fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    let resolution = |reason: String| ClientError::Resolution {
        host: host.to_string(),
        reason,
    };
    let addrs: Vec<SocketAddr> = (host, port)
        .to_socket_addrs()
        .map_err(|e| resolution(e.to_string()))?
        .collect();
    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| resolution("no addresses".to_string()))
}
