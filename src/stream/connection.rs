//! Stream client connections

use bytes::Bytes;
use parking_lot::Mutex;
use std::io;
use std::net::SocketAddr;

/// Registry key of a stream client
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Writable endpoint behind a [`ClientConnection`].
///
/// Implementations must never block: a write that cannot be accepted right
/// away returns an error (typically `WouldBlock`) or a short count.
pub trait FrameSink: Send + Sync {
    /// Whether the peer is still believed to be connected
    fn is_connected(&self) -> bool;

    /// Offer a complete payload; returns how many bytes were accepted
    fn try_write(&self, payload: &Bytes) -> io::Result<usize>;

    /// Push accepted bytes towards the peer
    fn flush(&self) -> io::Result<()> {
        Ok(())
    }

    /// Tear the endpoint down
    fn close(&self) -> io::Result<()>;
}

impl<S: FrameSink + ?Sized> FrameSink for std::sync::Arc<S> {
    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    fn try_write(&self, payload: &Bytes) -> io::Result<usize> {
        (**self).try_write(payload)
    }

    fn flush(&self) -> io::Result<()> {
        (**self).flush()
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }
}

/// Per-connection lifecycle. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Accepted, not yet registered
    Open,
    /// Registered and receiving frames
    Streaming,
    /// Removal decided; no further writes
    Closing,
    /// Teardown finished
    Closed,
}

/// Result of offering one payload to a connection
#[derive(Debug)]
pub enum Delivery {
    /// Full payload accepted and flushed
    Sent,
    /// Peer no longer connected; nothing was written
    Disconnected,
    /// Fewer bytes accepted than offered
    Partial { written: usize, expected: usize },
    /// Write or flush failed outright
    Failed(io::Error),
    /// Connection is not streaming (already being removed)
    Skipped,
}

impl Delivery {
    /// Whether the connection must be removed after this pass
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Delivery::Disconnected | Delivery::Partial { .. } | Delivery::Failed(_)
        )
    }
}

/// A stream subscriber: a sink plus the peer it talks to
pub struct ClientConnection {
    id: ConnectionId,
    peer: SocketAddr,
    state: Mutex<ConnectionState>,
    sink: Box<dyn FrameSink>,
}

impl ClientConnection {
    pub fn new(id: ConnectionId, peer: SocketAddr, sink: Box<dyn FrameSink>) -> Self {
        Self {
            id,
            peer,
            state: Mutex::new(ConnectionState::Open),
            sink,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.sink.is_connected()
    }

    /// `Open -> Streaming`. Returns false if the connection is past `Open`.
    pub(crate) fn begin_streaming(&self) -> bool {
        let mut state = self.state.lock();
        if *state == ConnectionState::Open {
            *state = ConnectionState::Streaming;
            true
        } else {
            false
        }
    }

    /// Offer a payload.
    ///
    /// The state lock is held across the write, so once [`close`](Self::close)
    /// has moved the connection to `Closing` no write can start.
    pub fn deliver(&self, payload: &Bytes) -> Delivery {
        let state = self.state.lock();
        if *state != ConnectionState::Streaming {
            return Delivery::Skipped;
        }
        if !self.sink.is_connected() {
            return Delivery::Disconnected;
        }

        match self.sink.try_write(payload) {
            Ok(written) if written < payload.len() => Delivery::Partial {
                written,
                expected: payload.len(),
            },
            Ok(_) => match self.sink.flush() {
                Ok(()) => Delivery::Sent,
                Err(e) => Delivery::Failed(e),
            },
            Err(e) => Delivery::Failed(e),
        }
    }

    /// Move to `Closing`, close the sink, then mark `Closed`.
    ///
    /// Only the first call tears the sink down; later calls return `Ok(false)`.
    pub fn close(&self) -> io::Result<bool> {
        {
            let mut state = self.state.lock();
            match *state {
                ConnectionState::Open | ConnectionState::Streaming => {
                    *state = ConnectionState::Closing;
                }
                ConnectionState::Closing | ConnectionState::Closed => return Ok(false),
            }
        }

        let result = self.sink.close();
        *self.state.lock() = ConnectionState::Closed;
        result.map(|()| true)
    }
}

impl std::fmt::Debug for ClientConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConnection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state())
            .finish()
    }
}
