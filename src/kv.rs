//! Namespaced key-value storage.
//!
//! The catalog persists table and partition metadata here, and nodes receiving
//! remote inserts write row cells here. Keys are strings, values are opaque
//! bytes, and every key lives in exactly one [`Namespace`].
//!
//! # Architecture
//!
//! ```text
//! +---------+   +----------------+
//! | Catalog |   | Insert service |
//! +---------+   +----------------+
//!        \          /
//!         v        v
//!   +------------------+
//!   | KvStore trait    |
//!   +------------------+
//!       /        \
//!      v          v
//! +-------------+ +-------------+
//! |MemoryKvStore| | FileKvStore |  <- append-only log, replayed on open
//! +-------------+ +-------------+
//! ```

pub mod error;
pub mod file;
pub mod memory;

pub use error::KvError;
pub use file::FileKvStore;
pub use memory::MemoryKvStore;

use std::fmt;

use serde::{Deserialize, Serialize};

/// A logical group of keys, kept separate from every other group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    /// Table records keyed by zero-padded table id.
    Tables,
    /// Partition specifications keyed by table name.
    Partitions,
    /// Row cells keyed by `/<table>/<primary key>/column_<i>`.
    Rows,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::Tables => "tables",
            Namespace::Partitions => "partitions",
            Namespace::Rows => "rows",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key-value storage backend.
///
/// Operations are synchronous and short; callers may invoke them while
/// holding their own locks. Implementations must be thread-safe.
pub trait KvStore: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, ns: Namespace, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Returns the value stored under `key`, if any.
    fn get(&self, ns: Namespace, key: &str) -> Result<Option<Vec<u8>>, KvError>;

    /// Returns every entry of the namespace in ascending key order.
    fn get_all(&self, ns: Namespace) -> Result<Vec<(String, Vec<u8>)>, KvError>;

    /// Removes `key`. Returns whether the key existed.
    fn delete(&self, ns: Namespace, key: &str) -> Result<bool, KvError>;
}
