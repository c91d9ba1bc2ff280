//! Inbound RPC listener.

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cluster::{NodeDescriptor, ServerRegistry};
use crate::datum::row_key;
use crate::kv::{KvError, KvStore, Namespace};
use crate::rpc::{
    InsertRequest, InsertResponse, RegisterRequest, RegisterResponse, RpcCodec, RpcError,
    RpcRequest, RpcResponse,
};

/// Serves Register and Insert calls from peer nodes.
///
/// Each accepted connection runs on its own task and may carry any number of
/// request/response exchanges. Registrations land in the shared
/// [`ServerRegistry`]; inserts are written to the local store.
pub struct RpcServer<S: KvStore> {
    listener: TcpListener,
    registry: Arc<ServerRegistry>,
    store: Arc<S>,
    shutdown: CancellationToken,
}

impl<S: KvStore + 'static> RpcServer<S> {
    pub fn new(
        listener: TcpListener,
        registry: Arc<ServerRegistry>,
        store: Arc<S>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            listener,
            registry,
            store,
            shutdown,
        }
    }

    /// Accepts peer connections until the shutdown token is cancelled, then
    /// waits for in-flight requests to be answered.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        tracing::info!(addr = ?self.listener.local_addr().ok(), "rpc server listening");
        let tasks = TaskTracker::new();

        loop {
            let (socket, peer) = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "rpc accept failed");
                        continue;
                    }
                },
            };

            let handler = RpcHandler {
                registry: self.registry.clone(),
                store: self.store.clone(),
            };
            let shutdown = self.shutdown.clone();
            tasks.spawn(async move {
                if let Err(e) = handler.serve_connection(socket, shutdown).await {
                    tracing::warn!(peer = %peer, error = %e, "rpc connection failed");
                }
            });
        }

        tracing::info!(live = tasks.len(), "rpc server shutting down");
        tasks.close();
        tasks.wait().await;
        Ok(())
    }
}

/// Applies requests against local state.
struct RpcHandler<S: KvStore> {
    registry: Arc<ServerRegistry>,
    store: Arc<S>,
}

impl<S: KvStore> RpcHandler<S> {
    async fn serve_connection(
        &self,
        socket: TcpStream,
        shutdown: CancellationToken,
    ) -> Result<(), RpcError> {
        let mut framed = Framed::new(socket, RpcCodec::<RpcRequest>::new());

        loop {
            let request = tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                request = framed.next() => match request {
                    Some(request) => request?,
                    None => return Ok(()),
                },
            };

            let response = self.handle(request);
            framed.send(response).await?;
        }
    }

    fn handle(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::Register(request) => {
                match self.register(request) {
                    Ok(response) => RpcResponse::Register(response),
                    Err(message) => RpcResponse::Error { message },
                }
            }
            RpcRequest::Insert(request) => match self.insert(request) {
                Ok(response) => RpcResponse::Insert(response),
                Err(e) => {
                    tracing::error!(error = %e, "remote insert failed");
                    RpcResponse::Error {
                        message: e.to_string(),
                    }
                }
            },
        }
    }

    fn register(&self, request: RegisterRequest) -> Result<RegisterResponse, String> {
        let node = NodeDescriptor {
            sql_address: request.sql_address,
            rpc_address: request.rpc_address,
            region: request.region,
            data_dir: String::new(),
        };
        self.registry.register(node).map_err(|e| e.to_string())?;
        Ok(RegisterResponse { success: true })
    }

    fn insert(&self, request: InsertRequest) -> Result<InsertResponse, InsertError> {
        if request.column_values.len() != request.column_ordinals.len() {
            return Err(InsertError::Malformed {
                values: request.column_values.len(),
                ordinals: request.column_ordinals.len(),
            });
        }

        for (value, ordinal) in request.column_values.iter().zip(&request.column_ordinals) {
            let key = row_key(&request.table, &request.primary_key, *ordinal as usize);
            self.store.put(Namespace::Rows, &key, value.as_bytes())?;
        }

        tracing::debug!(
            table = %request.table,
            primary_key = %request.primary_key,
            columns = request.column_names.len(),
            "row written"
        );
        Ok(InsertResponse {})
    }
}

#[derive(Debug)]
enum InsertError {
    Malformed { values: usize, ordinals: usize },
    Storage(KvError),
}

impl std::fmt::Display for InsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InsertError::Malformed { values, ordinals } => write!(
                f,
                "insert carries {} values but {} column ordinals",
                values, ordinals
            ),
            InsertError::Storage(e) => write!(f, "failed to write row: {}", e),
        }
    }
}

impl From<KvError> for InsertError {
    fn from(e: KvError) -> Self {
        InsertError::Storage(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::RegistrationPolicy;
    use crate::kv::MemoryKvStore;
    use crate::rpc::{PeerClient, TcpPeerClient};
    use std::collections::BTreeMap;

    struct Harness {
        addr: String,
        registry: Arc<ServerRegistry>,
        store: Arc<MemoryKvStore>,
        shutdown: CancellationToken,
    }

    async fn start() -> Harness {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let registry = Arc::new(ServerRegistry::new(RegistrationPolicy::Idempotent));
        let store = Arc::new(MemoryKvStore::new());
        let shutdown = CancellationToken::new();
        let server = RpcServer::new(listener, registry.clone(), store.clone(), shutdown.clone());
        tokio::spawn(server.serve());
        Harness {
            addr,
            registry,
            store,
            shutdown,
        }
    }

    #[tokio::test]
    async fn test_register_call() {
        let harness = start().await;
        let client = TcpPeerClient::new();

        let response = client
            .register(
                &harness.addr,
                RegisterRequest {
                    sql_address: "10.0.0.2:5432".to_string(),
                    rpc_address: "10.0.0.2:50051".to_string(),
                    region: "asia".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(response.success);

        let nodes = harness.registry.get_servers(&BTreeMap::new());
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].region, "asia");
        harness.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_insert_call_writes_rows() {
        let harness = start().await;
        let client = TcpPeerClient::new();

        client
            .insert(
                &harness.addr,
                InsertRequest {
                    table: "t".to_string(),
                    primary_key: "7".to_string(),
                    column_names: vec!["region".to_string(), "id".to_string()],
                    column_values: vec!["asia".to_string(), "7".to_string()],
                    column_ordinals: vec![1, 0],
                },
            )
            .await
            .unwrap();

        assert_eq!(
            harness.store.get(Namespace::Rows, "/t/7/column_0").unwrap(),
            Some(b"7".to_vec())
        );
        assert_eq!(
            harness.store.get(Namespace::Rows, "/t/7/column_1").unwrap(),
            Some(b"asia".to_vec())
        );
        harness.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_malformed_insert_is_remote_error() {
        let harness = start().await;
        let client = TcpPeerClient::new();

        let err = client
            .insert(
                &harness.addr,
                InsertRequest {
                    table: "t".to_string(),
                    primary_key: "1".to_string(),
                    column_names: vec!["id".to_string()],
                    column_values: vec!["1".to_string()],
                    column_ordinals: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Remote(_)));
        assert!(harness.store.get_all(Namespace::Rows).unwrap().is_empty());
        harness.shutdown.cancel();
    }

    #[tokio::test]
    async fn test_serve_waits_for_peer_connections() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = CancellationToken::new();
        let server = RpcServer::new(
            listener,
            Arc::new(ServerRegistry::default()),
            Arc::new(MemoryKvStore::new()),
            shutdown.clone(),
        );
        let serve = tokio::spawn(server.serve());

        let mut peer = TcpStream::connect(addr).await.unwrap();
        // Let the server accept before cancelling.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        shutdown.cancel();
        tokio::time::timeout(std::time::Duration::from_secs(5), serve)
            .await
            .unwrap()
            .unwrap()
            .unwrap();

        let mut rest = Vec::new();
        tokio::io::AsyncReadExt::read_to_end(&mut peer, &mut rest)
            .await
            .unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let err = TcpPeerClient::new()
            .register(
                &addr,
                RegisterRequest {
                    sql_address: String::new(),
                    rpc_address: addr.clone(),
                    region: String::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RpcError::Io(_)));
    }
}
