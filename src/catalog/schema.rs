//! Table, column, and partition metadata.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::datum::Type;

/// Partitioning strategy named in a `PARTITION BY` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartitionStrategy {
    List,
    Range,
    Hash,
}

impl PartitionStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            PartitionStrategy::List => "LIST",
            PartitionStrategy::Range => "RANGE",
            PartitionStrategy::Hash => "HASH",
        }
    }
}

impl fmt::Display for PartitionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: Type,
    pub primary_key: bool,
    /// Set on the column the table is partitioned by.
    pub partitioning: Option<PartitionStrategy>,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: Type) -> Self {
        Self {
            name: name.into(),
            data_type,
            primary_key: false,
            partitioning: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }
}

/// One partition of a list-partitioned table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Encoded values routed to this partition.
    pub values: BTreeSet<String>,
    /// Placement constraints matched against node descriptors (e.g. `region`).
    pub constraints: BTreeMap<String, String>,
}

/// List partitioning: each partition owns an explicit set of column values.
///
/// Partition names are unique within the table and every value belongs to at
/// most one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListPartition {
    pub column_name: String,
    pub partitions: BTreeMap<String, Partition>,
}

impl ListPartition {
    pub fn new(column_name: impl Into<String>) -> Self {
        Self {
            column_name: column_name.into(),
            partitions: BTreeMap::new(),
        }
    }

    /// Finds the partition whose value set contains `value`.
    pub fn lookup(&self, value: &str) -> Option<(&str, &Partition)> {
        self.partitions
            .iter()
            .find(|(_, partition)| partition.values.contains(value))
            .map(|(name, partition)| (name.as_str(), partition))
    }

    /// Returns the partition already owning any of `values`.
    pub(crate) fn owner_of_any<'a>(
        &self,
        values: impl IntoIterator<Item = &'a String>,
    ) -> Option<(&'a str, &str)> {
        values.into_iter().find_map(|value| {
            self.lookup(value)
                .map(|(partition, _)| (value.as_str(), partition))
        })
    }
}

/// How a table's rows are split into partitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartitionSpec {
    #[default]
    None,
    List(ListPartition),
}

/// A table and its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub id: u64,
    pub name: String,
    /// Columns in definition order; the index is the on-disk column ordinal.
    pub columns: Vec<Column>,
    pub partition: PartitionSpec,
}

impl Table {
    /// Returns the ordinal of the named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Returns the primary-key column and its ordinal.
    pub fn primary_key(&self) -> Option<(usize, &Column)> {
        self.columns.iter().enumerate().find(|(_, c)| c.primary_key)
    }
}

/// Persisted form of a table in the `tables` namespace.
///
/// The partition specification is stored separately in the `partitions`
/// namespace, keyed by table name.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct TableRecord {
    pub id: u64,
    pub name: String,
    pub columns: Vec<Column>,
}

impl From<&Table> for TableRecord {
    fn from(table: &Table) -> Self {
        Self {
            id: table.id,
            name: table.name.clone(),
            columns: table.columns.clone(),
        }
    }
}

/// Key of a table record: the id zero-padded so keys sort by id.
pub(crate) fn table_key(id: u64) -> String {
    format!("{:020}", id)
}
