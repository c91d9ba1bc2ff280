//! Insert routing errors.

use std::fmt;

use crate::datum::Type;
use crate::error::ErrorKind;
use crate::rpc::RpcError;

#[derive(Debug)]
pub enum RouterError {
    /// The target table does not exist.
    TableNotFound { table: String },

    /// The target table has no partition specification.
    NotPartitioned { table: String },

    /// The insert names a column the table does not have.
    ColumnNotFound { table: String, column: String },

    /// The insert names a column twice.
    DuplicateColumn { column: String },

    /// The insert does not supply the partitioning column.
    PartitionColumnMissing { table: String, column: String },

    /// The table declares no primary key, or the insert does not supply it.
    PrimaryKeyMissing { table: String },

    /// A row's width differs from the column list.
    RowWidthMismatch { row: usize, expected: usize, found: usize },

    /// A literal cannot be stored in its column.
    TypeMismatch {
        column: String,
        expected: Type,
        value: String,
    },

    /// No partition accepts the row's partitioning value.
    NoPartition { table: String, value: String },

    /// No registered node satisfies the partition's placement constraints.
    NoServer { partition: String },

    /// More than one registered node satisfies the placement constraints.
    AmbiguousServer { partition: String, matches: usize },

    /// A remote insert failed; earlier rows of the statement stay written.
    Remote {
        node: String,
        routed: usize,
        source: RpcError,
    },

    /// The task carrying a remote insert panicked or was cancelled.
    Task(tokio::task::JoinError),
}

impl RouterError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouterError::TableNotFound { .. }
            | RouterError::ColumnNotFound { .. }
            | RouterError::NoPartition { .. } => ErrorKind::NotFound,
            RouterError::NotPartitioned { .. } => ErrorKind::Unimplemented,
            RouterError::DuplicateColumn { .. }
            | RouterError::PartitionColumnMissing { .. }
            | RouterError::PrimaryKeyMissing { .. }
            | RouterError::RowWidthMismatch { .. }
            | RouterError::TypeMismatch { .. }
            | RouterError::NoServer { .. }
            | RouterError::AmbiguousServer { .. } => ErrorKind::InvalidArgument,
            RouterError::Remote { .. } | RouterError::Task(_) => ErrorKind::Internal,
        }
    }
}

impl fmt::Display for RouterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouterError::TableNotFound { table } => {
                write!(f, "relation \"{}\" does not exist", table)
            }
            RouterError::NotPartitioned { table } => {
                write!(f, "insert into unpartitioned table \"{}\" is not supported", table)
            }
            RouterError::ColumnNotFound { table, column } => {
                write!(
                    f,
                    "column \"{}\" of relation \"{}\" does not exist",
                    column, table
                )
            }
            RouterError::DuplicateColumn { column } => {
                write!(f, "column \"{}\" specified more than once", column)
            }
            RouterError::PartitionColumnMissing { table, column } => {
                write!(
                    f,
                    "insert into \"{}\" must supply partition column \"{}\"",
                    table, column
                )
            }
            RouterError::PrimaryKeyMissing { table } => {
                write!(f, "insert into \"{}\" must supply a primary key", table)
            }
            RouterError::RowWidthMismatch {
                row,
                expected,
                found,
            } => {
                write!(
                    f,
                    "row {} has {} values but {} columns were listed",
                    row, found, expected
                )
            }
            RouterError::TypeMismatch {
                column,
                expected,
                value,
            } => {
                write!(
                    f,
                    "value {} does not fit column \"{}\" of type {}",
                    value, column, expected
                )
            }
            RouterError::NoPartition { table, value } => {
                write!(f, "no partition of \"{}\" accepts value \"{}\"", table, value)
            }
            RouterError::NoServer { partition } => {
                write!(f, "no server matches placement of partition \"{}\"", partition)
            }
            RouterError::AmbiguousServer { partition, matches } => {
                write!(
                    f,
                    "{} servers match placement of partition \"{}\"",
                    matches, partition
                )
            }
            RouterError::Remote {
                node,
                routed,
                source,
            } => {
                write!(
                    f,
                    "remote insert to {} failed after {} row(s) were routed: {}",
                    node, routed, source
                )
            }
            RouterError::Task(e) => write!(f, "remote insert task failed: {}", e),
        }
    }
}

impl std::error::Error for RouterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RouterError::Remote { source, .. } => Some(source),
            RouterError::Task(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tokio::task::JoinError> for RouterError {
    fn from(e: tokio::task::JoinError) -> Self {
        RouterError::Task(e)
    }
}
