use crate::protocol::ProtocolError;
use crate::server::ConnectionPhase;

/// Connection error types.
///
/// Every variant is fatal for the connection it occurred on and for no other.
#[derive(Debug)]
pub enum ConnectionError {
    Io(std::io::Error),
    Protocol(ProtocolError),
    /// A startup-phase message that the current phase does not accept.
    UnexpectedStartupMessage { phase: ConnectionPhase },
    /// The client closed the socket before the handshake finished.
    ClosedDuringHandshake { phase: ConnectionPhase },
}

impl std::fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionError::Io(e) => write!(f, "I/O error: {}", e),
            ConnectionError::Protocol(e) => write!(f, "Protocol error: {}", e),
            ConnectionError::UnexpectedStartupMessage { phase } => {
                write!(f, "unexpected startup message in phase {}", phase)
            }
            ConnectionError::ClosedDuringHandshake { phase } => {
                write!(f, "connection closed in phase {}", phase)
            }
        }
    }
}

impl std::error::Error for ConnectionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectionError::Io(e) => Some(e),
            ConnectionError::Protocol(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConnectionError {
    fn from(e: std::io::Error) -> Self {
        ConnectionError::Io(e)
    }
}

impl From<ProtocolError> for ConnectionError {
    fn from(e: ProtocolError) -> Self {
        ConnectionError::Protocol(e)
    }
}
