//! Catalog-specific errors.

use crate::catalog::PartitionStrategy;
use crate::error::ErrorKind;
use crate::kv::KvError;

/// Errors that can occur during catalog operations.
#[derive(Debug)]
pub enum CatalogError {
    /// Table does not exist.
    TableNotFound { name: String },

    /// Table already exists.
    TableAlreadyExists { name: String },

    /// No partition with this name exists in any table.
    PartitionNotFound { name: String },

    /// A partition with this name already exists.
    PartitionAlreadyExists { name: String },

    /// A value is already routed to another partition.
    ValueAlreadyPartitioned { value: String, partition: String },

    /// A partition value does not parse as the partition column's type.
    InvalidPartitionValue {
        table: String,
        column: String,
        value: String,
    },

    /// Partitioning strategy other than LIST.
    UnsupportedStrategy(PartitionStrategy),

    /// The table is not list partitioned.
    NotListPartitioned { table: String },

    /// The table already has a partition specification.
    AlreadyPartitioned { table: String },

    /// Column does not exist in the table.
    ColumnNotFound { table: String, column: String },

    /// Two columns share a name.
    DuplicateColumn { table: String, column: String },

    /// More than one column is marked PRIMARY KEY.
    MultiplePrimaryKeys { table: String },

    /// The backing store failed.
    Storage(KvError),

    /// A persisted record could not be encoded or decoded.
    Record(serde_json::Error),
}

impl CatalogError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CatalogError::TableNotFound { .. }
            | CatalogError::PartitionNotFound { .. }
            | CatalogError::ColumnNotFound { .. } => ErrorKind::NotFound,
            CatalogError::TableAlreadyExists { .. }
            | CatalogError::PartitionAlreadyExists { .. } => ErrorKind::AlreadyExists,
            CatalogError::ValueAlreadyPartitioned { .. }
            | CatalogError::InvalidPartitionValue { .. }
            | CatalogError::NotListPartitioned { .. }
            | CatalogError::AlreadyPartitioned { .. }
            | CatalogError::DuplicateColumn { .. }
            | CatalogError::MultiplePrimaryKeys { .. } => ErrorKind::InvalidArgument,
            CatalogError::UnsupportedStrategy(_) => ErrorKind::Unimplemented,
            CatalogError::Storage(_) | CatalogError::Record(_) => ErrorKind::Internal,
        }
    }
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::TableNotFound { name } => {
                write!(f, "table \"{}\" does not exist", name)
            }
            CatalogError::TableAlreadyExists { name } => {
                write!(f, "table \"{}\" already exists", name)
            }
            CatalogError::PartitionNotFound { name } => {
                write!(f, "partition \"{}\" does not exist", name)
            }
            CatalogError::PartitionAlreadyExists { name } => {
                write!(f, "partition \"{}\" already exists", name)
            }
            CatalogError::ValueAlreadyPartitioned { value, partition } => {
                write!(
                    f,
                    "value \"{}\" already belongs to partition \"{}\"",
                    value, partition
                )
            }
            CatalogError::InvalidPartitionValue {
                table,
                column,
                value,
            } => {
                write!(
                    f,
                    "value \"{}\" does not match the type of partition column \"{}\" of table \"{}\"",
                    value, column, table
                )
            }
            CatalogError::UnsupportedStrategy(strategy) => {
                write!(f, "partition strategy {} is not supported", strategy)
            }
            CatalogError::NotListPartitioned { table } => {
                write!(f, "table \"{}\" is not list partitioned", table)
            }
            CatalogError::AlreadyPartitioned { table } => {
                write!(f, "table \"{}\" is already partitioned", table)
            }
            CatalogError::ColumnNotFound { table, column } => {
                write!(
                    f,
                    "column \"{}\" of table \"{}\" does not exist",
                    column, table
                )
            }
            CatalogError::DuplicateColumn { table, column } => {
                write!(
                    f,
                    "column \"{}\" specified more than once in table \"{}\"",
                    column, table
                )
            }
            CatalogError::MultiplePrimaryKeys { table } => {
                write!(
                    f,
                    "multiple primary keys for table \"{}\" are not allowed",
                    table
                )
            }
            CatalogError::Storage(e) => write!(f, "catalog storage error: {}", e),
            CatalogError::Record(e) => write!(f, "catalog record error: {}", e),
        }
    }
}

impl std::error::Error for CatalogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogError::Storage(e) => Some(e),
            CatalogError::Record(e) => Some(e),
            _ => None,
        }
    }
}

impl From<KvError> for CatalogError {
    fn from(e: KvError) -> Self {
        CatalogError::Storage(e)
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Record(e)
    }
}
