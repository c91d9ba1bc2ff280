//! Key-value storage errors.

/// Key-value storage errors.
#[derive(Debug)]
pub enum KvError {
    /// I/O error from the underlying file system.
    Io(std::io::Error),

    /// A log record could not be encoded or decoded.
    Codec(bincode::Error),

    /// Data corruption detected in the middle of the log.
    Corrupted(String),

    /// An earlier write could not be undone, so the log refuses further
    /// writes until it is reopened.
    Failed,
}

impl std::fmt::Display for KvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KvError::Io(e) => write!(f, "I/O error: {}", e),
            KvError::Codec(e) => write!(f, "record encoding error: {}", e),
            KvError::Corrupted(msg) => write!(f, "data corruption: {}", msg),
            KvError::Failed => f.write_str("log is unusable after a failed write"),
        }
    }
}

impl std::error::Error for KvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KvError::Io(e) => Some(e),
            KvError::Codec(e) => Some(e),
            KvError::Corrupted(_) | KvError::Failed => None,
        }
    }
}

impl From<std::io::Error> for KvError {
    fn from(e: std::io::Error) -> Self {
        KvError::Io(e)
    }
}

impl From<bincode::Error> for KvError {
    fn from(e: bincode::Error) -> Self {
        KvError::Codec(e)
    }
}
