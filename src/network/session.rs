//! Controller Session
//!
//! Owns the TCP connection to one controller and runs requests over it.
//!
//! ## State Machine
//! ```text
//!              connect()                          request
//! Disconnected ───────────► Connecting ──► Connected ───────────► AwaitingResponse
//!    ▲    ▲     connect failed  │           │   ▲                       │
//!    │    └─────────────────────┘           │   └───── any outcome ─────┤
//!    │              Connection error        │                           │
//!    └──────────────────────────────────────┼───────────────────────────┘
//!                                           │ close() (from any state)
//!                                           ▼
//!                                         Closed
//! ```
//!
//! `Connecting` covers the blocking TCP handshake. The lifecycle lock is not
//! held across it, so `close()` returns immediately and the handshake's
//! stream is dropped once it completes.
//!
//! The protocol has no request identifier, so at most one request may be
//! unresolved on the wire. A call made while another is awaiting its
//! response fails with `SessionBusy` instead of interleaving writes.

use std::io::{self, Read};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{RackError, Result};
use crate::protocol::{decode_status_at, write_command, CommandFrame, StatusFrame, STATUS_FRAME_LEN};

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    AwaitingResponse,
    Closed,
}

/// State guarded together with the transition it describes
struct Lifecycle {
    state: SessionState,

    /// Second handle on the socket, used by `close()` to unblock a pending read
    interrupt: Option<TcpStream>,

    peer_addr: Option<SocketAddr>,
}

/// A request/response session with one mobile-racking controller
///
/// ## Concurrency Model: one outstanding request
///
/// - `lifecycle` is locked only for state transitions, never across I/O
/// - `link` is held for the duration of a request; only the caller that moved
///   the state to `AwaitingResponse` touches it
/// - `close()` never waits for `link`: it shuts the socket down through the
///   interrupt handle and the in-flight request releases the stream
pub struct MobileRackingSession {
    /// Session configuration
    config: Config,

    lifecycle: Mutex<Lifecycle>,

    /// The connection itself
    link: Mutex<Option<TcpStream>>,

    /// Stale bytes dropped before commands, over the session lifetime
    discarded: AtomicU64,
}

impl MobileRackingSession {
    /// Create a disconnected session
    pub fn new(config: Config) -> Self {
        Self {
            config,
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Disconnected,
                interrupt: None,
                peer_addr: None,
            }),
            link: Mutex::new(None),
            discarded: AtomicU64::new(0),
        }
    }

    /// Create a session and connect it
    pub fn open(config: Config) -> Result<Self> {
        let session = Self::new(config);
        session.connect()?;
        Ok(session)
    }

    /// Connect to the configured address
    ///
    /// No-op when already connected; `SessionBusy` while another connect or
    /// a request is in progress. On failure the session returns to
    /// `Disconnected` and may be connected again later.
    pub fn connect(&self) -> Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        let state = lifecycle.state;
        match state {
            SessionState::Closed => return Err(RackError::SessionClosed),
            SessionState::Connecting | SessionState::AwaitingResponse => {
                return Err(RackError::SessionBusy)
            }
            SessionState::Connected => return Ok(()),
            SessionState::Disconnected => {}
        }
        lifecycle.state = SessionState::Connecting;
        drop(lifecycle);

        // Handshake runs unlocked
        let opened = open_stream(&self.config).and_then(|stream| {
            // Second handle for close() to shut down a pending read
            let interrupt = stream
                .try_clone()
                .map_err(|e| RackError::connection("clone socket", e))?;
            Ok((stream, interrupt))
        });

        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == SessionState::Closed {
            // close() won the race; the new stream is dropped here
            return Err(RackError::SessionClosed);
        }
        match opened {
            Ok((stream, interrupt)) => {
                lifecycle.peer_addr = stream.peer_addr().ok();
                lifecycle.interrupt = Some(interrupt);
                *self.link.lock() = Some(stream);
                lifecycle.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                lifecycle.state = SessionState::Disconnected;
                Err(e)
            }
        }
    }

    /// Request the controller status (`0, 2`)
    pub fn request_status(&self) -> Result<StatusFrame> {
        self.request_status_until(self.default_deadline())
    }

    /// Request the controller status, waiting for the answer until `deadline`
    pub fn request_status_until(&self, deadline: Instant) -> Result<StatusFrame> {
        self.exchange(CommandFrame::status_request(), deadline)
    }

    /// Open an aisle (`aisle, 1`) and return the status the controller answers with
    ///
    /// The aisle number is checked before any I/O.
    pub fn open_aisle(&self, aisle: u16) -> Result<StatusFrame> {
        self.open_aisle_until(aisle, self.default_deadline())
    }

    /// Open an aisle, waiting for the answer until `deadline`
    pub fn open_aisle_until(&self, aisle: u16, deadline: Instant) -> Result<StatusFrame> {
        let command = CommandFrame::open_aisle(aisle)?;
        self.exchange(command, deadline)
    }

    /// Release the connection
    ///
    /// Idempotent and callable from any state or thread. A request blocked on
    /// its response is woken and fails with `SessionClosed`.
    pub fn close(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if lifecycle.state == SessionState::Closed {
            return;
        }
        lifecycle.state = SessionState::Closed;
        lifecycle.peer_addr = None;
        if let Some(interrupt) = lifecycle.interrupt.take() {
            let _ = interrupt.shutdown(Shutdown::Both);
        }
        drop(lifecycle);

        // Busy link means a request is in flight; it drops the stream itself
        if let Some(mut link) = self.link.try_lock() {
            link.take();
        }
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle.lock().state
    }

    /// Address of the connected controller
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.lifecycle.lock().peer_addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Total stale bytes discarded before commands
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    fn default_deadline(&self) -> Instant {
        Instant::now() + self.config.response_timeout()
    }

    /// Send one command and wait for its status frame
    fn exchange(&self, command: CommandFrame, deadline: Instant) -> Result<StatusFrame> {
        let mut flight = InFlight::begin(self)?;

        // Nothing goes on the wire once the deadline has passed
        if deadline <= Instant::now() {
            return Err(RackError::Timeout {
                waited: Duration::ZERO,
            });
        }

        let mut link = self.link.lock();
        let result = match link.as_mut() {
            Some(stream) => self.transact(stream, &command, deadline),
            None => Err(RackError::NotConnected),
        };
        if matches!(result, Err(RackError::Connection { .. } | RackError::NotConnected)) {
            link.take();
            flight.outcome = SessionState::Disconnected;
        }
        drop(link);

        match result {
            Ok((frame, captured_at)) => decode_status_at(&frame, &self.config.layout, captured_at),
            // Shutdown by close() surfaces as EOF or a socket error
            Err(_) if self.state() == SessionState::Closed => Err(RackError::SessionClosed),
            Err(e) => Err(e),
        }
    }

    fn transact(
        &self,
        stream: &mut TcpStream,
        command: &CommandFrame,
        deadline: Instant,
    ) -> Result<([u8; STATUS_FRAME_LEN], SystemTime)> {
        if self.config.discard_stale_input {
            let stale = discard_stale(stream)?;
            self.discarded.fetch_add(stale as u64, Ordering::Relaxed);
        }

        write_command(stream, command)?;
        let frame = read_frame(stream, deadline)?;
        Ok((frame, SystemTime::now()))
    }
}

impl Drop for MobileRackingSession {
    fn drop(&mut self) {
        self.close();
    }
}

// =============================================================================
// In-flight guard
// =============================================================================

/// Holds the session in `AwaitingResponse` and restores it on every exit path
struct InFlight<'a> {
    session: &'a MobileRackingSession,

    /// State to return to when the request ends
    outcome: SessionState,
}

impl<'a> InFlight<'a> {
    fn begin(session: &'a MobileRackingSession) -> Result<Self> {
        let mut lifecycle = session.lifecycle.lock();
        let state = lifecycle.state;
        match state {
            SessionState::Connected => {
                lifecycle.state = SessionState::AwaitingResponse;
                Ok(Self {
                    session,
                    outcome: SessionState::Connected,
                })
            }
            SessionState::AwaitingResponse => Err(RackError::SessionBusy),
            SessionState::Disconnected | SessionState::Connecting => Err(RackError::NotConnected),
            SessionState::Closed => Err(RackError::SessionClosed),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut lifecycle = self.session.lifecycle.lock();
        let state = lifecycle.state;
        match state {
            SessionState::AwaitingResponse => {
                lifecycle.state = self.outcome;
                if self.outcome == SessionState::Disconnected {
                    lifecycle.interrupt = None;
                    lifecycle.peer_addr = None;
                }
            }
            SessionState::Closed => {
                drop(lifecycle);
                self.session.link.lock().take();
            }
            _ => {}
        }
    }
}

// =============================================================================
// Socket helpers
// =============================================================================

/// Resolve and connect, trying every resolved address in turn
fn open_stream(config: &Config) -> Result<TcpStream> {
    let addrs = config
        .addr
        .to_socket_addrs()
        .map_err(|e| RackError::connection("resolve address", e))?;

    // Reported when resolution yields nothing to try
    let mut last_err = io::Error::new(
        io::ErrorKind::AddrNotAvailable,
        format!("{} resolved to no addresses", config.addr),
    );

    for addr in addrs {
        match TcpStream::connect_timeout(&addr, config.connect_timeout()) {
            Ok(stream) => {
                // Commands are 4 bytes; Nagle would hold them back
                stream
                    .set_nodelay(config.nodelay)
                    .map_err(|e| RackError::connection("set nodelay", e))?;

                // A stalled peer must not block a command write forever
                stream
                    .set_write_timeout(config.write_timeout())
                    .map_err(|e| RackError::connection("set write timeout", e))?;
                return Ok(stream);
            }
            Err(e) => last_err = e,
        }
    }

    Err(RackError::connection("connect", last_err))
}

/// Drain whatever is already buffered on the socket without blocking
///
/// Returns the number of bytes dropped. EOF is left for the next read to report.
fn discard_stale(stream: &mut TcpStream) -> Result<usize> {
    stream
        .set_nonblocking(true)
        .map_err(|e| RackError::connection("set nonblocking", e))?;

    // Never block here: only bytes already buffered count as stale
    let mut scratch = [0u8; 64];
    let mut discarded = 0;
    let outcome = loop {
        match stream.read(&mut scratch) {
            Ok(0) => break Ok(discarded),
            Ok(n) => discarded += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break Ok(discarded),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => break Err(RackError::connection("discard stale input", e)),
        }
    };

    stream
        .set_nonblocking(false)
        .map_err(|e| RackError::connection("set blocking", e))?;
    outcome
}

/// Accumulate exactly one status frame, or fail at `deadline`
fn read_frame(stream: &mut TcpStream, deadline: Instant) -> Result<[u8; STATUS_FRAME_LEN]> {
    let started = Instant::now();
    let mut frame = [0u8; STATUS_FRAME_LEN];
    let mut filled = 0;

    while filled < STATUS_FRAME_LEN {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RackError::Timeout {
                waited: started.elapsed(),
            });
        }
        // Each read waits at most until the overall deadline
        stream
            .set_read_timeout(Some(remaining))
            .map_err(|e| RackError::connection("set read timeout", e))?;

        match stream.read(&mut frame[filled..]) {
            Ok(0) => {
                return Err(RackError::ShortFrame {
                    received: filled,
                    expected: STATUS_FRAME_LEN,
                })
            }
            Ok(n) => filled += n,
            // WouldBlock on Unix, TimedOut on Windows; the deadline check decides
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
                ) =>
            {
                continue
            }
            Err(e) => return Err(RackError::connection("read status", e)),
        }
    }

    Ok(frame)
}
