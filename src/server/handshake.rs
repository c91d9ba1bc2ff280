use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::protocol::{BackendMessage, PostgresCodec, StartupCodec, StartupMessage};
use crate::server::ConnectionError;
use crate::server::registry::{ConnectionPhase, ConnectionRegistry};

/// Session parameters announced to every client after startup.
const PARAMETERS: [(&str, &str); 5] = [
    ("server_encoding", "UTF8"),
    ("client_encoding", "UTF8"),
    ("DateStyle", "ISO YMD"),
    ("integer_datetimes", "on"),
    ("server_version", "17.0"),
];

/// A single client handshake.
///
/// The client must open with an SSLRequest, which is declined, and then send
/// its startup packet. Any other order closes the connection. A client still
/// in the handshake when shutdown begins is dropped.
pub struct Handshake {
    framed: Framed<TcpStream, StartupCodec>,
    pid: i32,
    connections: Arc<ConnectionRegistry>,
}

impl Handshake {
    pub fn new(socket: TcpStream, pid: i32, connections: Arc<ConnectionRegistry>) -> Self {
        Self {
            framed: Framed::new(socket, StartupCodec::new()),
            pid,
            connections,
        }
    }

    /// Runs both handshake phases and returns the socket framed for queries.
    ///
    /// Returns `None` if `shutdown` fires while waiting for the client.
    pub async fn run(
        mut self,
        shutdown: &CancellationToken,
    ) -> Result<Option<Framed<TcpStream, PostgresCodec>>, ConnectionError> {
        let Some(first) = self.next_message(ConnectionPhase::StartUp, shutdown).await? else {
            return Ok(None);
        };
        match first {
            StartupMessage::SslRequest => {
                self.framed.send(BackendMessage::SslRejected).await?;
                self.connections
                    .set_phase(self.pid, ConnectionPhase::NoSslAcknowledged);
            }
            StartupMessage::Startup { .. } => {
                return Err(ConnectionError::UnexpectedStartupMessage {
                    phase: ConnectionPhase::StartUp,
                });
            }
        }

        let Some(second) = self
            .next_message(ConnectionPhase::NoSslAcknowledged, shutdown)
            .await?
        else {
            return Ok(None);
        };
        match second {
            StartupMessage::Startup {
                protocol_version,
                parameters,
            } => {
                tracing::debug!(
                    pid = self.pid,
                    protocol_version,
                    user = ?parameters.user,
                    database = ?parameters.database,
                    "startup packet"
                );
            }
            StartupMessage::SslRequest => {
                return Err(ConnectionError::UnexpectedStartupMessage {
                    phase: ConnectionPhase::NoSslAcknowledged,
                });
            }
        }

        self.send_startup_info().await?;
        self.connections
            .set_phase(self.pid, ConnectionPhase::ReadyForQuery);

        Ok(Some(self.framed.map_codec(StartupCodec::ready)))
    }

    async fn next_message(
        &mut self,
        phase: ConnectionPhase,
        shutdown: &CancellationToken,
    ) -> Result<Option<StartupMessage>, ConnectionError> {
        let message = tokio::select! {
            _ = shutdown.cancelled() => return Ok(None),
            message = self.framed.next() => message,
        };
        match message {
            Some(message) => Ok(Some(message?)),
            None => Err(ConnectionError::ClosedDuringHandshake { phase }),
        }
    }

    async fn send_startup_info(&mut self) -> Result<(), ConnectionError> {
        self.framed.feed(BackendMessage::AuthenticationOk).await?;

        for (name, value) in PARAMETERS {
            self.framed
                .feed(BackendMessage::ParameterStatus {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .await?;
        }

        self.framed
            .feed(BackendMessage::BackendKeyData {
                process_id: self.pid,
                secret_key: rand::random::<i32>(),
            })
            .await?;
        self.framed.feed(BackendMessage::ReadyForQuery).await?;

        self.framed.flush().await?;
        Ok(())
    }
}
