use bytes::{Buf, BufMut, BytesMut};

use crate::protocol::ProtocolError;

/// Maximum message size in bytes (16 MB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Read a null-terminated string from a BytesMut buffer.
/// Returns the string (without the null terminator) if successful.
///
/// The null byte is searched for within a bounded prefix of the buffer so
/// that a peer cannot make us scan unbounded input.
pub fn get_cstring(src: &mut BytesMut) -> Result<String, ProtocolError> {
    const MAX_CSTRING_LENGTH: usize = 64 * 1024;

    let Some(null_pos) = src.iter().take(MAX_CSTRING_LENGTH).position(|&b| b == 0) else {
        return Err(ProtocolError::InvalidMessage);
    };

    let bytes = src.split_to(null_pos);
    src.advance(1);
    String::from_utf8(bytes.to_vec()).map_err(ProtocolError::InvalidUtf8)
}

/// Write a null-terminated string to a BytesMut buffer.
pub fn put_cstring(dst: &mut BytesMut, s: &str) {
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
}

/// Codec for the query phase of the protocol.
/// Encodes BackendMessage (in backend.rs) and decodes FrontendMessage (in frontend.rs).
#[derive(Debug)]
pub struct PostgresCodec {
    pub(crate) max_message_size: usize,
}

impl PostgresCodec {
    /// Creates a new PostgresCodec with the default maximum message size.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}

impl Default for PostgresCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Codec for the negotiation and startup phase of the protocol.
/// Decodes StartupMessage and encodes the handshake replies.
///
/// The first packet must be an 8-byte SSLRequest; any other length word is
/// rejected before the body is read.
#[derive(Debug)]
pub struct StartupCodec {
    pub(crate) max_message_size: usize,
    /// Set once the first packet has been decoded.
    pub(crate) negotiated: bool,
}

impl StartupCodec {
    /// Creates a new StartupCodec with the default maximum message size.
    pub fn new() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            negotiated: false,
        }
    }

    /// Transitions to query phase codec after successful startup.
    pub fn ready(self) -> PostgresCodec {
        PostgresCodec {
            max_message_size: self.max_message_size,
        }
    }
}

impl Default for StartupCodec {
    fn default() -> Self {
        Self::new()
    }
}
