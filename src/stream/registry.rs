//! Set of connections currently subscribed to the stream

use super::connection::{ClientConnection, ConnectionId};
use crate::events::{EventBus, ServerEvent};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Tracks stream subscribers.
///
/// Members are kept in registration order (ids are allocated monotonically).
/// The map lock is only held for structural changes and for copying a
/// snapshot; connections are written and closed outside of it.
///
/// [`close_all`](Self::close_all) also shuts the door: later `add` calls are
/// refused until [`reopen`](Self::reopen).
#[derive(Debug)]
pub struct ConnectionRegistry {
    members: Mutex<BTreeMap<ConnectionId, Arc<ClientConnection>>>,
    // Only read or written with `members` locked
    accepting: AtomicBool,
    next_id: AtomicU64,
    events: EventBus,
}

impl ConnectionRegistry {
    pub fn new(events: EventBus) -> Self {
        Self {
            members: Mutex::new(BTreeMap::new()),
            accepting: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            events,
        }
    }

    /// Allocate an id for a connection about to be created
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a connection and move it to `Streaming`.
    ///
    /// Returns false (and changes nothing) if it is already registered or
    /// has already started closing. While the registry is shut, the
    /// connection is closed instead and false is returned.
    pub fn add(&self, connection: Arc<ClientConnection>) -> bool {
        let peer = connection.peer();
        let count = {
            let mut members = self.members.lock();
            if !self.accepting.load(Ordering::Relaxed) {
                drop(members);
                tracing::debug!("Refusing stream client {}: shutting down", peer);
                if let Err(e) = connection.close() {
                    tracing::warn!("Error closing refused client {}: {}", peer, e);
                }
                return false;
            }
            if members.contains_key(&connection.id()) || !connection.begin_streaming() {
                return false;
            }
            members.insert(connection.id(), connection);
            members.len()
        };

        tracing::info!("Stream client connected: {} ({} active)", peer, count);
        self.events.emit(ServerEvent::ClientConnected { peer });
        true
    }

    /// Unregister and close a connection.
    ///
    /// Safe to call repeatedly or concurrently; only the call that actually
    /// takes the connection out of the set closes it. Returns whether this
    /// call removed it.
    pub fn remove(&self, id: ConnectionId) -> bool {
        let removed = self.members.lock().remove(&id);
        match removed {
            Some(connection) => {
                self.teardown(&connection);
                true
            }
            None => false,
        }
    }

    /// Current members, in registration order
    pub fn snapshot(&self) -> Vec<Arc<ClientConnection>> {
        self.members.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Remove and close every member and refuse new ones until
    /// [`reopen`](Self::reopen). Close failures are logged and skipped.
    pub fn close_all(&self) -> usize {
        let drained = {
            let mut members = self.members.lock();
            self.accepting.store(false, Ordering::Relaxed);
            std::mem::take(&mut *members)
        };
        let count = drained.len();
        for connection in drained.into_values() {
            self.teardown(&connection);
        }
        count
    }

    /// Accept registrations again after [`close_all`](Self::close_all)
    pub fn reopen(&self) {
        let _members = self.members.lock();
        self.accepting.store(true, Ordering::Relaxed);
    }

    pub fn is_accepting(&self) -> bool {
        let _members = self.members.lock();
        self.accepting.load(Ordering::Relaxed)
    }

    fn teardown(&self, connection: &ClientConnection) {
        let peer = connection.peer();
        match connection.close() {
            Ok(_) => tracing::info!("Stream client disconnected: {}", peer),
            Err(e) => tracing::warn!("Error closing stream client {}: {}", peer, e),
        }
        self.events.emit(ServerEvent::ClientDisconnected { peer });
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(EventBus::default())
    }
}
