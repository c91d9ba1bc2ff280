/// Protocol parsing errors
#[derive(Debug)]
pub enum ProtocolError {
    InvalidMessage,
    MessageTooLarge(usize),
    InvalidUtf8(std::string::FromUtf8Error),
    UnknownMessageType(u8),
    /// The first startup packet did not carry the SSLRequest length.
    UnexpectedStartupLength(i32),
    Io(std::io::Error),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::InvalidMessage => write!(f, "invalid message"),
            ProtocolError::MessageTooLarge(len) => write!(f, "message too large: {} bytes", len),
            ProtocolError::InvalidUtf8(e) => write!(f, "invalid UTF-8: {}", e),
            ProtocolError::UnknownMessageType(t) => {
                write!(f, "unknown message type: 0x{:02x}", t)
            }
            ProtocolError::UnexpectedStartupLength(len) => {
                write!(f, "expected SSLRequest of 8 bytes, got length {}", len)
            }
            ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for ProtocolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProtocolError::InvalidUtf8(e) => Some(e),
            ProtocolError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::Io(e)
    }
}
