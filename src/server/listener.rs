use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::db::{Database, StatementHandler};
use crate::kv::KvStore;
use crate::rpc::PeerClient;
use crate::server::connection::Connection;
use crate::server::handshake::Handshake;
use crate::server::registry::ConnectionRegistry;

/// TCP server implementing PostgreSQL wire protocol.
pub struct Server<S: KvStore, C: PeerClient> {
    listener: TcpListener,
    next_pid: AtomicI32,
    connections: Arc<ConnectionRegistry>,
    tasks: TaskTracker,
    database: Arc<Database<S, C>>,
    shutdown: CancellationToken,
}

impl<S: KvStore + 'static, C: PeerClient> Server<S, C> {
    /// Creates a new server with a given listener and database.
    pub fn new(
        listener: TcpListener,
        database: Arc<Database<S, C>>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            listener,
            next_pid: AtomicI32::new(1),
            connections: Arc::new(ConnectionRegistry::new()),
            tasks: TaskTracker::new(),
            database,
            shutdown,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns the map of live connections.
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Accepts connections until the shutdown token is cancelled, then waits
    /// for every connection task to finish.
    ///
    /// Accept failures are logged and do not stop the server.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "sql server listening");

        loop {
            let (socket, peer_addr) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "accept failed");
                        continue;
                    }
                },
            };

            let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
            let connections = self.connections.clone();
            let database = self.database.clone();
            let shutdown = self.shutdown.clone();

            tracing::info!(pid, peer = %peer_addr, "accepted connection");
            connections.register(pid, peer_addr);

            self.tasks.spawn(async move {
                let handshake = Handshake::new(socket, pid, connections.clone());
                match handshake.run(&shutdown).await {
                    Ok(None) => tracing::debug!(pid, "handshake abandoned for shutdown"),
                    Ok(Some(framed)) => {
                        tracing::debug!(pid, "connection ready");
                        let handler = StatementHandler::new(database);
                        let mut connection = Connection::new(framed, pid, handler);
                        if let Err(e) = connection.run(shutdown).await {
                            tracing::warn!(pid, error = %e, "connection error");
                        }
                    }
                    Err(e) => tracing::warn!(pid, error = %e, "handshake failed"),
                }
                connections.unregister(pid);
                tracing::info!(pid, "connection closed");
            });
        }

        tracing::info!(live = self.tasks.len(), "sql server shutting down");
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("sql server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;
    use crate::db::tests::open_test_db;

    const SSL_REQUEST: [u8; 8] = [0, 0, 0, 8, 0x04, 0xd2, 0x16, 0x2f];

    async fn wait_for_connections(connections: &ConnectionRegistry, count: usize) {
        for _ in 0..100 {
            if connections.len() == count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {} connections, found {}", count, connections.len());
    }

    #[tokio::test]
    async fn test_serve_waits_for_connections_on_shutdown() {
        let (db, _) = open_test_db();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = Server::new(listener, db, shutdown.clone());
        let connections = server.connections().clone();
        let serve = tokio::spawn(server.serve());

        // One client idles before its SSLRequest, the other after it.
        let _idle = TcpStream::connect(addr).await.unwrap();
        let mut negotiated = TcpStream::connect(addr).await.unwrap();
        negotiated.write_all(&SSL_REQUEST).await.unwrap();
        assert_eq!(negotiated.read_u8().await.unwrap(), b'N');
        wait_for_connections(&connections, 2).await;

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), serve)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(connections.is_empty());

        let mut rest = Vec::new();
        negotiated.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_serve_returns_without_connections() {
        let (db, _) = open_test_db();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let shutdown = CancellationToken::new();
        let server = Server::new(listener, db, shutdown.clone());

        shutdown.cancel();
        server.serve().await.unwrap();
    }
}
