use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;

use parking_lot::Mutex;

/// Protocol phase of one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Waiting for the SSLRequest.
    StartUp,
    /// SSL declined; waiting for the startup packet.
    NoSslAcknowledged,
    /// Handshake complete; serving queries.
    ReadyForQuery,
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPhase::StartUp => f.write_str("StartUp"),
            ConnectionPhase::NoSslAcknowledged => f.write_str("NoSSLAcknowledged"),
            ConnectionPhase::ReadyForQuery => f.write_str("ReadyForQuery"),
        }
    }
}

/// A registry of live client connections.
///
/// An entry is created on accept, advanced by the handshake, and removed
/// when the socket closes for any reason.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    // pid -> entry
    connections: Mutex<HashMap<i32, ConnectionEntry>>,
}

#[derive(Debug, Clone, Copy)]
struct ConnectionEntry {
    peer: SocketAddr,
    phase: ConnectionPhase,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a freshly accepted connection in [`ConnectionPhase::StartUp`].
    pub fn register(&self, pid: i32, peer: SocketAddr) {
        self.connections.lock().insert(
            pid,
            ConnectionEntry {
                peer,
                phase: ConnectionPhase::StartUp,
            },
        );
    }

    /// Records a phase transition. Unknown pids are ignored.
    pub fn set_phase(&self, pid: i32, phase: ConnectionPhase) {
        if let Some(entry) = self.connections.lock().get_mut(&pid) {
            entry.phase = phase;
        }
    }

    pub fn phase(&self, pid: i32) -> Option<ConnectionPhase> {
        self.connections.lock().get(&pid).map(|e| e.phase)
    }

    pub fn peer(&self, pid: i32) -> Option<SocketAddr> {
        self.connections.lock().get(&pid).map(|e| e.peer)
    }

    /// Unregisters a connection when it terminates.
    pub fn unregister(&self, pid: i32) {
        self.connections.lock().remove(&pid);
    }

    /// Returns the number of live connections.
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
