use bytes::{Buf, BytesMut};
use std::collections::HashMap;
use tokio_util::codec::Decoder;

use crate::protocol::codec::{PostgresCodec, StartupCodec, get_cstring};
use crate::protocol::error::ProtocolError;

/// SSLRequest magic number
pub const SSL_REQUEST_CODE: i32 = (1234 << 16) | 5679; // 80877103

/// Length of an SSLRequest packet, including the length word itself.
pub const SSL_REQUEST_LENGTH: usize = 8;

/// Messages sent by the frontend (client) during the startup phase.
#[derive(Debug)]
pub enum StartupMessage {
    /// SSLRequest - exactly `{8, 80877103}`
    SslRequest,
    /// StartupMessage - protocol version followed by key/value parameters.
    ///
    /// Any length-prefixed packet that is not an exact SSLRequest decodes to
    /// this variant; the connection decides whether it is acceptable in its
    /// current state.
    Startup {
        protocol_version: i32,
        parameters: StartupParameters,
    },
}

impl StartupMessage {
    /// Decodes a startup message from the buffer.
    /// The buffer should contain exactly one complete message.
    fn decode(src: &mut BytesMut) -> Result<Self, ProtocolError> {
        let len = src.get_i32() as usize;
        let code = src.get_i32();

        if len == SSL_REQUEST_LENGTH && code == SSL_REQUEST_CODE {
            return Ok(StartupMessage::SslRequest);
        }

        let parameters = StartupParameters::decode(src)?;
        Ok(StartupMessage::Startup {
            protocol_version: code,
            parameters,
        })
    }
}

/// Startup parameters from the client
#[derive(Debug, Clone, Default)]
pub struct StartupParameters {
    pub user: Option<String>,
    pub database: Option<String>,
    pub application_name: Option<String>,
    pub other: HashMap<String, String>,
}

impl StartupParameters {
    /// Decodes startup parameters from the message buffer.
    ///
    /// Parameters are extracted but not validated; a missing terminator at
    /// the end of the packet is tolerated.
    fn decode(src: &mut BytesMut) -> Result<Self, ProtocolError> {
        let mut params = StartupParameters::default();

        while !src.is_empty() {
            let name = get_cstring(src)?;

            // Empty name signals end of parameters
            if name.is_empty() {
                break;
            }

            let value = get_cstring(src)?;

            match name.as_str() {
                "user" => params.user = Some(value),
                "database" => params.database = Some(value),
                "application_name" => params.application_name = Some(value),
                _ => {
                    params.other.insert(name, value);
                }
            }
        }

        Ok(params)
    }
}

impl Decoder for StartupCodec {
    type Item = StartupMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            return Ok(None);
        }

        // Peek at the length (don't consume yet)
        let len = i32::from_be_bytes([src[0], src[1], src[2], src[3]]);
        if !self.negotiated && len != SSL_REQUEST_LENGTH as i32 {
            return Err(ProtocolError::UnexpectedStartupLength(len));
        }
        if len < 8 {
            return Err(ProtocolError::InvalidMessage);
        }
        let len = len as usize;
        if len > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge(len));
        }

        // Wait for complete message
        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let mut msg_buf = src.split_to(len);
        let msg = StartupMessage::decode(&mut msg_buf)?;
        self.negotiated = true;
        Ok(Some(msg))
    }
}

/// Messages sent by the frontend (client) during the query phase.
#[derive(Debug)]
pub enum FrontendMessage {
    /// 'Q' - Simple query
    Query(String),
    /// 'X' - Termination
    Terminate,
}

impl FrontendMessage {
    /// Decodes a frontend message from the buffer.
    /// The buffer should contain exactly one complete message, type byte included.
    fn decode(src: &mut BytesMut) -> Result<Self, ProtocolError> {
        let msg_type = src.get_u8();
        let _length = src.get_i32();
        match msg_type {
            b'Q' => {
                let query = get_cstring(src)?;
                Ok(FrontendMessage::Query(query))
            }
            b'X' => Ok(FrontendMessage::Terminate),
            _ => Err(ProtocolError::UnknownMessageType(msg_type)),
        }
    }
}

impl Decoder for PostgresCodec {
    type Item = FrontendMessage;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // The type byte alone decides whether the message is acceptable.
        if let Some(&msg_type) = src.first()
            && msg_type != b'Q'
            && msg_type != b'X'
        {
            return Err(ProtocolError::UnknownMessageType(msg_type));
        }

        // Need at least 5 bytes (type + length)
        if src.len() < 5 {
            return Ok(None);
        }

        // Peek at the length (bytes 1-4, don't consume yet)
        let len = i32::from_be_bytes([src[1], src[2], src[3], src[4]]);
        if len < 4 {
            return Err(ProtocolError::InvalidMessage);
        }
        let len = len as usize;
        if len > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge(len));
        }

        // Total message size = 1 (type byte) + length
        let len = 1 + len;

        if src.len() < len {
            src.reserve(len - src.len());
            return Ok(None);
        }

        let mut msg_buf = src.split_to(len);
        let msg = FrontendMessage::decode(&mut msg_buf)?;
        Ok(Some(msg))
    }
}
