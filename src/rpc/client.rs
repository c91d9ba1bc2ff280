//! Outbound RPC calls.

use std::future::Future;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::rpc::{
    InsertRequest, InsertResponse, RegisterRequest, RegisterResponse, RpcCodec, RpcError,
    RpcRequest, RpcResponse,
};

/// Issues typed requests to peer nodes.
///
/// Implementations provide the raw request/response exchange in
/// [`call`](PeerClient::call); the typed helpers unwrap the matching response
/// variant and turn a remote `Error` reply into [`RpcError::Remote`].
pub trait PeerClient: Send + Sync + 'static {
    /// Sends one request to the node listening at `addr` and waits for its reply.
    fn call(
        &self,
        addr: &str,
        request: RpcRequest,
    ) -> impl Future<Output = Result<RpcResponse, RpcError>> + Send;

    /// Registers a node with the registry at `addr`.
    fn register(
        &self,
        addr: &str,
        request: RegisterRequest,
    ) -> impl Future<Output = Result<RegisterResponse, RpcError>> + Send {
        async move {
            match self.call(addr, RpcRequest::Register(request)).await? {
                RpcResponse::Register(response) => Ok(response),
                RpcResponse::Error { message } => Err(RpcError::Remote(message)),
                _ => Err(RpcError::UnexpectedResponse {
                    expected: "Register",
                }),
            }
        }
    }

    /// Writes one routed row on the node at `addr`.
    fn insert(
        &self,
        addr: &str,
        request: InsertRequest,
    ) -> impl Future<Output = Result<InsertResponse, RpcError>> + Send {
        async move {
            match self.call(addr, RpcRequest::Insert(request)).await? {
                RpcResponse::Insert(response) => Ok(response),
                RpcResponse::Error { message } => Err(RpcError::Remote(message)),
                _ => Err(RpcError::UnexpectedResponse { expected: "Insert" }),
            }
        }
    }
}

/// TCP client opening one connection per call.
#[derive(Debug, Clone, Default)]
pub struct TcpPeerClient;

impl TcpPeerClient {
    pub fn new() -> Self {
        Self
    }
}

impl PeerClient for TcpPeerClient {
    async fn call(&self, addr: &str, request: RpcRequest) -> Result<RpcResponse, RpcError> {
        tracing::debug!(peer = %addr, call = request.name(), "sending rpc");

        let stream = TcpStream::connect(addr).await?;
        let mut framed = Framed::new(stream, RpcCodec::<RpcResponse>::new());
        framed.send(request).await?;

        match framed.next().await {
            Some(response) => response,
            None => Err(RpcError::ConnectionClosed),
        }
    }
}
