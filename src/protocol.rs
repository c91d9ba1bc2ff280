//! PostgreSQL wire protocol implementation.
//!
//! This module implements the subset of the PostgreSQL v3.0 wire protocol
//! needed by `psql` and other standard clients to run simple queries:
//! SSL negotiation (always declined), the startup packet, simple Query and
//! Terminate.
//!
//! ## Architecture
//!
//! ```text
//! +----------+                           +-----------+
//! |  Client  |  --- FrontendMessage -->  |  Server   |
//! |  (psql)  |  <-- BackendMessage  ---  | (regiondb)|
//! +----------+                           +-----------+
//!               ^                   ^
//!               |   StartupCodec    |  negotiation + startup packet
//!               |   PostgresCodec   |  query phase
//!               +-------------------+
//! ```
//!
//! ## Terminology
//!
//! - **StartupMessage**: SSLRequest or the startup packet, both untyped and length-prefixed
//! - **FrontendMessage**: Typed client messages of the query phase (Query, Terminate)
//! - **BackendMessage**: Messages from server to client, one variant per message type
//! - **Codec**: Framing and serialization for the wire protocol

pub mod backend;
pub mod codec;
pub mod error;
pub mod frontend;
pub mod types;

pub use backend::{BackendMessage, ErrorField, FieldDescription};
pub use codec::{PostgresCodec, StartupCodec};
pub use error::ProtocolError;
pub use frontend::{FrontendMessage, StartupMessage, StartupParameters};
pub use types::{ErrorFieldCode, FormatCode, type_oid};
