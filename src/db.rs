//! Statement handling and node composition.
//!
//! The [`Database`] owns the services one node runs. Each SQL connection gets
//! a [`StatementHandler`] over a shared `Arc<Database>`.
//!
//! # Architecture
//!
//! ```text
//! +--------------------------------------------------------------+
//! |                         Database                             |
//! |                                                              |
//! |  +-------------+  +-----------------+  +-------------------+  |
//! |  | Catalog<S>  |  | PartitionRouter |  | ServerRegistry    |  |
//! |  | (tables,    |  | (row -> node,   |  | (known nodes,     |  |
//! |  |  partitions)|  |  remote insert) |  |  shared with RPC) |  |
//! |  +------+------+  +--------+--------+  +-------------------+  |
//! |         |                  |                                 |
//! +---------+------------------+---------------------------------+
//!           |                  |
//!           v                  v
//!     +-----------+     +--------------+
//!     |  KvStore  |     |  PeerClient  |
//!     +-----------+     +--------------+
//! ```

mod database;
mod error;
mod handler;

pub use database::Database;
pub use error::DatabaseError;
pub use handler::{ColumnDesc, QueryResult, StatementHandler};
