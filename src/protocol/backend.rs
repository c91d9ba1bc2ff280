use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::codec::{PostgresCodec, StartupCodec, put_cstring};
use crate::protocol::error::ProtocolError;
use crate::protocol::types::{ErrorFieldCode, FormatCode};

/// Messages sent by the backend (server) to the client.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    /// 'N' - Single-byte reply declining an SSLRequest
    SslRejected,
    /// 'R' - Authentication response (AuthenticationOk)
    AuthenticationOk,
    /// 'S' - Parameter status notification
    ParameterStatus { name: String, value: String },
    /// 'K' - Backend key data
    BackendKeyData { process_id: i32, secret_key: i32 },
    /// 'Z' - Ready for query, always idle
    ReadyForQuery,
    /// 'T' - Row description
    RowDescription { fields: Vec<FieldDescription> },
    /// 'D' - Data row; `None` is SQL NULL
    DataRow { values: Vec<Option<Vec<u8>>> },
    /// 'C' - Command complete
    CommandComplete { tag: String },
    /// 'I' - Empty query response
    EmptyQueryResponse,
    /// 'E' - Error response
    ErrorResponse { fields: Vec<ErrorField> },
}

impl BackendMessage {
    /// Creates an `ERROR` severity ErrorResponse carrying `message`.
    pub fn error(message: impl Into<String>) -> Self {
        BackendMessage::ErrorResponse {
            fields: vec![
                ErrorField::new(ErrorFieldCode::Severity, "ERROR"),
                ErrorField::new(ErrorFieldCode::Message, message),
            ],
        }
    }

    /// Appends the wire encoding of this message to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            BackendMessage::SslRejected => dst.put_u8(b'N'),
            BackendMessage::AuthenticationOk => put_frame(dst, b'R', |dst| {
                dst.put_i32(0); // auth type 0 = Ok
            }),
            BackendMessage::ParameterStatus { name, value } => put_frame(dst, b'S', |dst| {
                put_cstring(dst, name);
                put_cstring(dst, value);
            }),
            BackendMessage::BackendKeyData {
                process_id,
                secret_key,
            } => put_frame(dst, b'K', |dst| {
                dst.put_i32(*process_id);
                dst.put_i32(*secret_key);
            }),
            BackendMessage::ReadyForQuery => put_frame(dst, b'Z', |dst| dst.put_u8(b'I')),
            BackendMessage::RowDescription { fields } => put_frame(dst, b'T', |dst| {
                dst.put_i16(fields.len() as i16);
                for field in fields {
                    put_cstring(dst, &field.name);
                    dst.put_i32(field.table_oid);
                    dst.put_i16(field.column_attr);
                    dst.put_i32(field.type_oid);
                    dst.put_i16(field.type_size);
                    dst.put_i32(field.type_modifier);
                    dst.put_i16(field.format.as_i16());
                }
            }),
            BackendMessage::DataRow { values } => put_frame(dst, b'D', |dst| {
                dst.put_i16(values.len() as i16);
                for value in values {
                    match value {
                        Some(bytes) => {
                            dst.put_i32(bytes.len() as i32);
                            dst.put_slice(bytes);
                        }
                        None => dst.put_i32(-1),
                    }
                }
            }),
            BackendMessage::CommandComplete { tag } => {
                put_frame(dst, b'C', |dst| put_cstring(dst, tag))
            }
            BackendMessage::EmptyQueryResponse => put_frame(dst, b'I', |_| {}),
            BackendMessage::ErrorResponse { fields } => put_frame(dst, b'E', |dst| {
                for field in fields {
                    dst.put_u8(field.code.as_u8());
                    put_cstring(dst, &field.value);
                }
                dst.put_u8(0); // terminator
            }),
        }
    }
}

/// Writes `{tag}{int32 length}{body}`, where the length counts itself and the body.
fn put_frame(dst: &mut BytesMut, tag: u8, body: impl FnOnce(&mut BytesMut)) {
    dst.put_u8(tag);
    let len_pos = dst.len();
    dst.put_i32(0);
    body(dst);
    let len = (dst.len() - len_pos) as i32;
    dst[len_pos..len_pos + 4].copy_from_slice(&len.to_be_bytes());
}

impl Encoder<BackendMessage> for PostgresCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: BackendMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

impl Encoder<BackendMessage> for StartupCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: BackendMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}

/// One column entry of a RowDescription message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescription {
    pub name: String,
    pub table_oid: i32,
    pub column_attr: i16,
    pub type_oid: i32,
    pub type_size: i16,
    pub type_modifier: i32,
    pub format: FormatCode,
}

impl FieldDescription {
    /// Describes a text-format column not backed by a table attribute.
    pub fn new(name: impl Into<String>, type_oid: i32, type_size: i16) -> Self {
        Self {
            name: name.into(),
            table_oid: 0,
            column_attr: 0,
            type_oid,
            type_size,
            type_modifier: 0,
            format: FormatCode::Text,
        }
    }
}

/// Error/Notice field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorField {
    pub code: ErrorFieldCode,
    pub value: String,
}

impl ErrorField {
    pub fn new(code: ErrorFieldCode, value: impl Into<String>) -> Self {
        Self {
            code,
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::type_oid;

    fn encode(msg: BackendMessage) -> Vec<u8> {
        let mut buf = BytesMut::new();
        msg.encode(&mut buf);
        buf.to_vec()
    }

    #[test]
    fn test_write_ssl_rejected() {
        assert_eq!(encode(BackendMessage::SslRejected), vec![b'N']);
    }

    #[test]
    fn test_write_authentication_ok() {
        assert_eq!(
            encode(BackendMessage::AuthenticationOk),
            vec![b'R', 0, 0, 0, 8, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_write_ready_for_query() {
        assert_eq!(
            encode(BackendMessage::ReadyForQuery),
            vec![b'Z', 0, 0, 0, 5, b'I']
        );
    }

    #[test]
    fn test_write_backend_key_data() {
        let buf = encode(BackendMessage::BackendKeyData {
            process_id: 7,
            secret_key: -1,
        });
        assert_eq!(
            buf,
            vec![b'K', 0, 0, 0, 12, 0, 0, 0, 7, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn test_write_parameter_status() {
        let buf = encode(BackendMessage::ParameterStatus {
            name: "server_version".to_string(),
            value: "17.0".to_string(),
        });
        // length = 4 + 15 ("server_version\0") + 5 ("17.0\0") = 24
        assert_eq!(buf[0], b'S');
        assert_eq!(&buf[1..5], &[0, 0, 0, 24]);
        assert_eq!(&buf[5..], b"server_version\x0017.0\0");
    }

    #[test]
    fn test_write_empty_query_response() {
        assert_eq!(
            encode(BackendMessage::EmptyQueryResponse),
            vec![b'I', 0, 0, 0, 4]
        );
    }

    #[test]
    fn test_write_command_complete() {
        let buf = encode(BackendMessage::CommandComplete {
            tag: "SHOW".to_string(),
        });
        assert_eq!(buf, b"C\0\0\0\x09SHOW\0".to_vec());
    }

    #[test]
    fn test_write_error_response() {
        let buf = encode(BackendMessage::error("boom"));
        // 4 + "SERROR\0" (7) + "Mboom\0" (6) + terminator (1) = 18
        assert_eq!(buf, b"E\0\0\0\x12SERROR\0Mboom\0\0".to_vec());
    }

    #[test]
    fn test_write_row_description() {
        let buf = encode(BackendMessage::RowDescription {
            fields: vec![FieldDescription::new("id", type_oid::INT8, 8)],
        });
        let mut expected = vec![b'T', 0, 0, 0, 27, 0, 1];
        expected.extend_from_slice(b"id\0");
        expected.extend_from_slice(&[0, 0, 0, 0]); // table oid
        expected.extend_from_slice(&[0, 0]); // attnum
        expected.extend_from_slice(&[0, 0, 0, 20]); // type oid
        expected.extend_from_slice(&[0, 8]); // type size
        expected.extend_from_slice(&[0, 0, 0, 0]); // type modifier
        expected.extend_from_slice(&[0, 0]); // format
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_write_data_row() {
        let buf = encode(BackendMessage::DataRow {
            values: vec![Some(b"42".to_vec()), None],
        });
        assert_eq!(
            buf,
            vec![
                b'D', 0, 0, 0, 16, 0, 2, 0, 0, 0, 2, b'4', b'2', 0xff, 0xff, 0xff, 0xff
            ]
        );
    }

    #[test]
    fn test_encoder_appends() {
        let mut codec = PostgresCodec::new();
        let mut buf = BytesMut::new();
        codec
            .encode(BackendMessage::EmptyQueryResponse, &mut buf)
            .unwrap();
        codec.encode(BackendMessage::ReadyForQuery, &mut buf).unwrap();
        assert_eq!(buf.to_vec(), vec![b'I', 0, 0, 0, 4, b'Z', 0, 0, 0, 5, b'I']);
    }
}
