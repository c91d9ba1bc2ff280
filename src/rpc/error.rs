//! RPC errors.

use std::fmt;
use std::io;

use crate::error::ErrorKind;

/// Errors raised while issuing or serving an RPC call.
#[derive(Debug)]
pub enum RpcError {
    /// Connecting, reading, or writing the socket failed.
    Io(io::Error),

    /// A frame payload could not be encoded or decoded.
    Codec(bincode::Error),

    /// A frame exceeds the maximum frame size.
    FrameTooLarge(usize),

    /// The peer closed the connection before replying.
    ConnectionClosed,

    /// The peer replied with a response for a different call.
    UnexpectedResponse { expected: &'static str },

    /// The peer handled the call and reported a failure.
    Remote(String),
}

impl RpcError {
    /// Every RPC failure is an internal error from the caller's point of view.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Internal
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Io(e) => write!(f, "rpc I/O error: {}", e),
            RpcError::Codec(e) => write!(f, "rpc codec error: {}", e),
            RpcError::FrameTooLarge(size) => {
                write!(f, "rpc frame too large: {} bytes", size)
            }
            RpcError::ConnectionClosed => write!(f, "peer closed the connection"),
            RpcError::UnexpectedResponse { expected } => {
                write!(f, "unexpected response to {} call", expected)
            }
            RpcError::Remote(message) => write!(f, "peer error: {}", message),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RpcError::Io(e) => Some(e),
            RpcError::Codec(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        RpcError::Io(e)
    }
}

impl From<bincode::Error> for RpcError {
    fn from(e: bincode::Error) -> Self {
        RpcError::Codec(e)
    }
}
