//! Registry errors.

use std::fmt;

use crate::error::ErrorKind;
use crate::rpc::RpcError;

#[derive(Debug)]
pub enum RegistryError {
    /// A descriptor without an rpc address cannot be routed to.
    MissingRpcAddress,

    /// The Register call to the bootstrap peer failed.
    JoinFailed { peer: String, source: RpcError },

    /// The bootstrap peer answered but refused the registration.
    JoinRejected { peer: String },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::MissingRpcAddress => ErrorKind::InvalidArgument,
            RegistryError::JoinFailed { .. } | RegistryError::JoinRejected { .. } => {
                ErrorKind::Internal
            }
        }
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::MissingRpcAddress => {
                write!(f, "node descriptor has no rpc address")
            }
            RegistryError::JoinFailed { peer, source } => {
                write!(f, "failed to join peer {}: {}", peer, source)
            }
            RegistryError::JoinRejected { peer } => {
                write!(f, "peer {} rejected the registration", peer)
            }
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RegistryError::JoinFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
