mod error;

pub use error::ConnectionError;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::datum;
use crate::db::{QueryResult, StatementHandler};
use crate::kv::KvStore;
use crate::protocol::{BackendMessage, FieldDescription, FrontendMessage, PostgresCodec};
use crate::rpc::PeerClient;

/// A single client connection in the query phase.
///
/// Statement failures are reported to the client and the connection stays
/// open; decoding failures end it.
pub struct Connection<S: KvStore, C: PeerClient> {
    framed: Framed<TcpStream, PostgresCodec>,
    pid: i32,
    handler: StatementHandler<S, C>,
}

impl<S: KvStore, C: PeerClient> Connection<S, C> {
    pub fn new(
        framed: Framed<TcpStream, PostgresCodec>,
        pid: i32,
        handler: StatementHandler<S, C>,
    ) -> Self {
        Self {
            framed,
            pid,
            handler,
        }
    }

    /// Serves messages until the client terminates or `shutdown` fires.
    ///
    /// Shutdown is only observed between messages, so a query in progress
    /// always gets its reply.
    pub async fn run(&mut self, shutdown: CancellationToken) -> Result<(), ConnectionError> {
        loop {
            let message = tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(pid = self.pid, "closing connection for shutdown");
                    return Ok(());
                }
                message = self.framed.next() => message,
            };

            match message {
                Some(Ok(FrontendMessage::Query(query))) => self.handle_query(&query).await?,
                Some(Ok(FrontendMessage::Terminate)) => {
                    tracing::debug!(pid = self.pid, "terminate");
                    return Ok(());
                }
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(()), // EOF - client disconnected
            }
        }
    }

    /// Handle a query from the client (Simple Query Protocol).
    async fn handle_query(&mut self, query: &str) -> Result<(), ConnectionError> {
        tracing::info!(pid = self.pid, query = %query, "query");

        match self.handler.execute_query(query).await {
            Ok(None) | Ok(Some(QueryResult::Command { .. })) => {
                self.framed.feed(BackendMessage::EmptyQueryResponse).await?;
            }
            Ok(Some(QueryResult::Rows { columns, rows, tag })) => {
                let fields = columns
                    .iter()
                    .map(|c| {
                        FieldDescription::new(&c.name, c.data_type.oid(), c.data_type.wire_size())
                    })
                    .collect();
                self.framed
                    .feed(BackendMessage::RowDescription { fields })
                    .await?;

                for row in rows {
                    let values = row
                        .iter()
                        .map(|d| Some(datum::encode(d).into_bytes()))
                        .collect();
                    self.framed.feed(BackendMessage::DataRow { values }).await?;
                }

                self.framed
                    .feed(BackendMessage::CommandComplete { tag })
                    .await?;
            }
            Err(e) => {
                tracing::warn!(pid = self.pid, kind = %e.kind(), error = %e, "query failed");
                self.framed.feed(BackendMessage::error(e.to_string())).await?;
            }
        }

        // Always send ReadyForQuery after response
        self.framed.feed(BackendMessage::ReadyForQuery).await?;
        self.framed.flush().await?;
        Ok(())
    }
}
