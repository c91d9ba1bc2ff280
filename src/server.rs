//! TCP server for PostgreSQL-compatible connections.
//!
//! This module provides the network layer that accepts client connections
//! and drives each one through the protocol phases.
//!
//! ## Architecture
//!
//! ```text
//! +--------+
//! | Server |  <- Accepts TCP connections, one task per socket
//! +--------+
//!      |
//!      v
//! +-----------+     +------------+     +------------------+
//! | Handshake | --> | Connection | --> | StatementHandler |
//! +-----------+     +------------+     +------------------+
//!      |                  |
//!      v                  v
//! +------------------------------+
//! | ConnectionRegistry           |  <- phase of every live socket
//! +------------------------------+
//! ```
//!
//! ## Phases
//!
//! ```text
//! StartUp --SSLRequest/'N'--> NoSslAcknowledged --startup packet--> ReadyForQuery
//!    |                               |                                  |
//!    +-- anything else: close        +-- anything else: close           +-- 'X' or EOF: close
//! ```
//!
//! ## Terminology
//!
//! - **Server**: TCP listener that spawns connections
//! - **Handshake**: SSL refusal and startup parameter exchange
//! - **Connection**: Per-client query loop after the handshake
//! - **ConnectionRegistry**: Process-wide map from connection id to its phase

pub mod connection;
pub mod handshake;
pub mod listener;
pub mod registry;

pub use connection::{Connection, ConnectionError};
pub use listener::Server;
pub use registry::{ConnectionPhase, ConnectionRegistry};
