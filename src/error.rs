//! Crate-wide error classification.
//!
//! Every module keeps its own error enum; this module only provides the
//! coarse [`ErrorKind`] that those enums report through their `kind()`
//! methods, so callers can branch on the category without matching
//! module-specific variants.

use std::fmt;

/// Category of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A table, partition, or node is absent.
    NotFound,
    /// A table with the same name already exists.
    AlreadyExists,
    /// Malformed input, ambiguous/absent node match, or unsupported statement shape.
    InvalidArgument,
    /// Valid request that this system does not support.
    Unimplemented,
    /// Storage or remote-call failure.
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyExists => "already exists",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::Unimplemented => "unimplemented",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
