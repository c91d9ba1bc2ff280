//! Node-to-node RPC.
//!
//! Nodes talk to each other over a small typed request/response protocol
//! carried in length-prefixed bincode frames.
//!
//! ## Architecture
//!
//! ```text
//!  node A                                   node B
//! +--------+   +---------------+  frames  +-----------+   +----------------+
//! | Router | → | TcpPeerClient | -------> | RpcServer | → | ServerRegistry |
//! +--------+   +---------------+          +-----------+   | KvStore (rows) |
//!                                                         +----------------+
//! ```
//!
//! ## Calls
//!
//! - **Register**: adds the caller's descriptor to the callee's registry.
//! - **Insert**: writes one routed row into the callee's `rows` namespace.

mod client;
mod codec;
mod error;
mod message;
mod server;

pub use client::{PeerClient, TcpPeerClient};
pub use codec::{MAX_FRAME_SIZE, RpcCodec};
pub use error::RpcError;
pub use message::{
    InsertRequest, InsertResponse, RegisterRequest, RegisterResponse, RpcRequest, RpcResponse,
};
pub use server::RpcServer;
