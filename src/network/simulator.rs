//! Controller Simulator
//!
//! An in-process stand-in for a mobile-racking controller: accepts TCP
//! connections, reads 4-byte commands and answers each with a 20-byte status
//! frame. Used by the integration tests and the `rackwire-sim` binary.
//!
//! The answer can be bent through [`Behavior`] to reproduce silent, slow or
//! truncating controllers.

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};

use crate::error::{RackError, Result};
use crate::protocol::{
    read_command, write_status, encode_status, CommandFrame, Field, FieldLayout, Operation,
    STATUS_WORD_COUNT,
};

/// Poll interval of the non-blocking accept loop
const ACCEPT_POLL: Duration = Duration::from_millis(10);

/// How the simulator answers a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// Full status frame
    Respond,

    /// Read commands, never answer
    Silent,

    /// Write the first `n` bytes of the frame, then close the connection
    Truncate(usize),

    /// Answer after a pause
    Delay(Duration),
}

/// State shared between the accept loop, connection threads and handles
struct Shared {
    layout: FieldLayout,
    words: RwLock<[u16; STATUS_WORD_COUNT]>,
    behavior: RwLock<Behavior>,
    commands: Mutex<Vec<CommandFrame>>,
    last_opened_aisle: Mutex<Option<u16>>,
    /// Live connections by accept order, for shutdown
    peers: Mutex<HashMap<usize, TcpStream>>,
    accepted: AtomicUsize,
    running: AtomicBool,
}

/// A simulated controller bound to a local address
pub struct Simulator {
    listener: TcpListener,
    shared: Arc<Shared>,
}

impl Simulator {
    /// Bind the listener; `layout` is used by [`SimulatorHandle::set_field`]
    pub fn bind(addr: &str, layout: FieldLayout) -> Result<Self> {
        let listener = TcpListener::bind(addr).map_err(|e| RackError::connection("bind", e))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| RackError::connection("set nonblocking", e))?;

        tracing::info!(
            "Controller simulator listening on {} (layout '{}')",
            listener.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            layout.name
        );

        Ok(Self {
            listener,
            shared: Arc::new(Shared {
                layout,
                words: RwLock::new([0; STATUS_WORD_COUNT]),
                behavior: RwLock::new(Behavior::Respond),
                commands: Mutex::new(Vec::new()),
                last_opened_aisle: Mutex::new(None),
                peers: Mutex::new(HashMap::new()),
                accepted: AtomicUsize::new(0),
                running: AtomicBool::new(true),
            }),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .map_err(|e| RackError::connection("local address", e))
    }

    /// A handle for inspecting and steering the simulator
    pub fn handle(&self) -> Result<SimulatorHandle> {
        Ok(SimulatorHandle {
            addr: self.local_addr()?,
            shared: Arc::clone(&self.shared),
            thread: None,
        })
    }

    /// Run the accept loop in a background thread
    pub fn spawn(self) -> Result<SimulatorHandle> {
        let mut handle = self.handle()?;
        handle.thread = Some(thread::spawn(move || {
            if let Err(e) = self.run() {
                tracing::error!("Simulator stopped: {}", e);
            }
        }));
        Ok(handle)
    }

    /// Accept connections until shut down (blocking)
    ///
    /// Each connection is served on its own thread.
    pub fn run(self) -> Result<()> {
        while self.shared.running.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    // One bad socket must not stop the listener
                    if let Err(e) = self.serve(stream, peer) {
                        tracing::warn!("Failed to serve {}: {}", peer, e);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(RackError::connection("accept", e)),
            }
        }
        Ok(())
    }

    fn serve(&self, stream: TcpStream, peer: SocketAddr) -> Result<()> {
        // Accepted sockets inherit non-blocking mode on some platforms
        stream
            .set_nonblocking(false)
            .map_err(|e| RackError::connection("set blocking", e))?;

        // Status frames go out as soon as they are written
        stream
            .set_nodelay(true)
            .map_err(|e| RackError::connection("set nodelay", e))?;

        // Clone kept so shutdown() can close a connection blocked in read
        let registered = stream
            .try_clone()
            .map_err(|e| RackError::connection("clone socket", e))?;

        let id = self.shared.accepted.fetch_add(1, Ordering::SeqCst);
        self.shared.peers.lock().insert(id, registered);

        let shared = Arc::clone(&self.shared);
        thread::spawn(move || {
            let mut connection = ControllerConnection {
                stream,
                peer,
                shared: Arc::clone(&shared),
            };
            if let Err(e) = connection.handle() {
                tracing::warn!("Connection {} ended with error: {}", peer, e);
            }
            // Release the registered clone along with the connection
            shared.peers.lock().remove(&id);
        });
        Ok(())
    }
}

// =============================================================================
// Connection handling
// =============================================================================

struct ControllerConnection {
    stream: TcpStream,
    peer: SocketAddr,
    shared: Arc<Shared>,
}

impl ControllerConnection {
    /// Serve commands until the client disconnects
    fn handle(&mut self) -> Result<()> {
        tracing::debug!("Client {} connected", self.peer);

        loop {
            let command = match read_command(&mut self.stream) {
                Ok(command) => command,
                Err(RackError::Connection { ref source, .. })
                    if matches!(
                        source.kind(),
                        io::ErrorKind::UnexpectedEof
                            | io::ErrorKind::ConnectionReset
                            | io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("Client {} disconnected", self.peer);
                    return Ok(());
                }
                Err(e) => return Err(e),
            };

            tracing::trace!("Command from {}: {:?}", self.peer, command.operation());
            self.shared.commands.lock().push(command);
            match command.operation() {
                Operation::RequestStatus => {}
                Operation::OpenAisle(aisle) => {
                    tracing::info!("Client {} opened aisle {}", self.peer, aisle);
                    *self.shared.last_opened_aisle.lock() = Some(aisle);
                }
                Operation::Unknown { param1, param2 } => {
                    tracing::warn!("Unknown command ({}, {}) from {}", param1, param2, self.peer);
                }
            }

            let words = *self.shared.words.read();
            let behavior = *self.shared.behavior.read();
            match behavior {
                Behavior::Respond => write_status(&mut self.stream, &words)?,
                Behavior::Silent => {}
                Behavior::Delay(pause) => {
                    thread::sleep(pause);
                    write_status(&mut self.stream, &words)?;
                }
                Behavior::Truncate(n) => {
                    let frame = encode_status(&words);
                    let n = n.min(frame.len());
                    self.stream
                        .write_all(&frame[..n])
                        .map_err(|e| RackError::connection("write partial status", e))?;
                    tracing::debug!("Truncated frame to {} bytes, closing {}", n, self.peer);
                    let _ = self.stream.shutdown(Shutdown::Both);
                    return Ok(());
                }
            }
        }
    }
}

// =============================================================================
// Handle
// =============================================================================

/// Controls a simulator from outside its threads
pub struct SimulatorHandle {
    addr: SocketAddr,
    shared: Arc<Shared>,
    thread: Option<JoinHandle<()>>,
}

impl SimulatorHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Replace all status words
    pub fn set_words(&self, words: [u16; STATUS_WORD_COUNT]) {
        *self.shared.words.write() = words;
    }

    pub fn words(&self) -> [u16; STATUS_WORD_COUNT] {
        *self.shared.words.read()
    }

    /// Set the word behind `field` in the simulator's layout
    pub fn set_field(&self, field: Field, value: u16) -> Result<()> {
        let index = self.shared.layout.index_of(field).ok_or_else(|| {
            RackError::Config(format!(
                "layout '{}' does not map {}",
                self.shared.layout.name,
                field.name()
            ))
        })?;
        self.shared.words.write()[index] = value;
        Ok(())
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.shared.behavior.write() = behavior;
    }

    /// Every command received so far, in arrival order
    pub fn commands(&self) -> Vec<CommandFrame> {
        self.shared.commands.lock().clone()
    }

    pub fn last_opened_aisle(&self) -> Option<u16> {
        *self.shared.last_opened_aisle.lock()
    }

    /// Number of connections accepted so far
    pub fn accepted(&self) -> usize {
        self.shared.accepted.load(Ordering::SeqCst)
    }

    /// Number of connections still being served
    pub fn open_connections(&self) -> usize {
        self.shared.peers.lock().len()
    }

    /// Stop accepting and close every open connection
    pub fn shutdown(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        for (_, peer) in self.shared.peers.lock().drain() {
            let _ = peer.shutdown(Shutdown::Both);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for SimulatorHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}
