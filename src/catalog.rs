//! Catalog of tables, columns, and list partitions.
//!
//! The [`Catalog`] is an in-memory cache of every table definition backed by a
//! [`KvStore`]. It is loaded completely at start-up and every mutation is
//! written through to the store.
//!
//! ## Persisted Records
//!
//! | Namespace    | Key                     | Value (JSON)          |
//! |--------------|-------------------------|-----------------------|
//! | `tables`     | table id, zero-padded   | id, name, columns     |
//! | `partitions` | table name              | [`ListPartition`]     |
//!
//! ## Consistency
//!
//! Every operation runs under one mutex. A mutation builds the new table
//! definition, writes it to the store, and only then installs it in the cache,
//! so a failed write leaves the cache unchanged. The two writes of
//! `set_partition` (and the cache/store pair in general) are not atomic with
//! respect to a crash: a process dying between them can leave the store
//! holding only part of the change.

mod error;
mod schema;

pub use error::CatalogError;
pub use schema::{Column, ListPartition, Partition, PartitionSpec, PartitionStrategy, Table};

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::datum;
use crate::kv::{KvStore, Namespace};
use schema::{TableRecord, table_key};

/// The process's table catalog.
pub struct Catalog<S: KvStore> {
    store: Arc<S>,
    state: Mutex<CatalogState>,
}

#[derive(Default)]
struct CatalogState {
    tables: HashMap<String, Table>,
    next_id: u64,
}

impl<S: KvStore> Catalog<S> {
    /// Loads every persisted table into a new catalog.
    pub fn open(store: Arc<S>) -> Result<Self, CatalogError> {
        let mut tables = HashMap::new();
        let mut next_id = 1;

        for (_, value) in store.get_all(Namespace::Tables)? {
            let record: TableRecord = serde_json::from_slice(&value)?;
            next_id = next_id.max(record.id + 1);
            tables.insert(
                record.name.clone(),
                Table {
                    id: record.id,
                    name: record.name,
                    columns: record.columns,
                    partition: PartitionSpec::None,
                },
            );
        }

        for (table_name, value) in store.get_all(Namespace::Partitions)? {
            let list: ListPartition = serde_json::from_slice(&value)?;
            match tables.get_mut(&table_name) {
                Some(table) => table.partition = PartitionSpec::List(list),
                None => {
                    tracing::warn!(table = %table_name, "ignoring partition record of unknown table")
                }
            }
        }

        tracing::info!(tables = tables.len(), "catalog loaded");

        Ok(Self {
            store,
            state: Mutex::new(CatalogState { tables, next_id }),
        })
    }

    /// Returns a copy of the named table.
    pub fn get_table(&self, name: &str) -> Option<Table> {
        self.state.lock().tables.get(name).cloned()
    }

    /// Returns a copy of every table, ordered by id.
    pub fn tables(&self) -> Vec<Table> {
        let mut tables: Vec<Table> = self.state.lock().tables.values().cloned().collect();
        tables.sort_by_key(|t| t.id);
        tables
    }

    /// Creates a table with a fresh id.
    pub fn add_table(&self, name: &str, columns: Vec<Column>) -> Result<Table, CatalogError> {
        let mut state = self.state.lock();
        if state.tables.contains_key(name) {
            return Err(CatalogError::TableAlreadyExists {
                name: name.to_string(),
            });
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(CatalogError::DuplicateColumn {
                    table: name.to_string(),
                    column: column.name.clone(),
                });
            }
        }
        if columns.iter().filter(|c| c.primary_key).count() > 1 {
            return Err(CatalogError::MultiplePrimaryKeys {
                table: name.to_string(),
            });
        }

        let table = Table {
            id: state.next_id,
            name: name.to_string(),
            columns,
            partition: PartitionSpec::None,
        };
        self.put_table_record(&table)?;

        state.next_id += 1;
        state.tables.insert(name.to_string(), table.clone());
        tracing::debug!(table = %name, id = table.id, "table added");
        Ok(table)
    }

    /// Removes a table. Dropping an absent table is a no-op.
    ///
    /// Returns whether the table existed.
    pub fn drop_table(&self, name: &str) -> Result<bool, CatalogError> {
        let mut state = self.state.lock();
        let Some(table) = state.tables.get(name) else {
            return Ok(false);
        };

        self.store.delete(Namespace::Tables, &table_key(table.id))?;
        self.store.delete(Namespace::Partitions, name)?;

        state.tables.remove(name);
        tracing::debug!(table = %name, "table dropped");
        Ok(true)
    }

    /// Partitions a table by `column`.
    ///
    /// Only [`PartitionStrategy::List`] is supported. The table starts with no
    /// partitions; add them with [`add_list_partition`](Self::add_list_partition).
    pub fn set_partition(
        &self,
        name: &str,
        column: &str,
        strategy: PartitionStrategy,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        let table = state
            .tables
            .get(name)
            .ok_or_else(|| CatalogError::TableNotFound {
                name: name.to_string(),
            })?;

        if strategy != PartitionStrategy::List {
            return Err(CatalogError::UnsupportedStrategy(strategy));
        }
        if table.partition != PartitionSpec::None {
            return Err(CatalogError::AlreadyPartitioned {
                table: name.to_string(),
            });
        }
        let index = table
            .column_index(column)
            .ok_or_else(|| CatalogError::ColumnNotFound {
                table: name.to_string(),
                column: column.to_string(),
            })?;

        let mut updated = table.clone();
        updated.columns[index].partitioning = Some(strategy);
        let list = ListPartition::new(column);

        self.put_table_record(&updated)?;
        self.put_partition_record(name, &list)?;

        updated.partition = PartitionSpec::List(list);
        state.tables.insert(name.to_string(), updated);
        tracing::debug!(table = %name, column = %column, "table partitioned by list");
        Ok(())
    }

    /// Adds a partition accepting `values` to a list-partitioned table.
    ///
    /// Partition names are unique across the whole catalog because placement
    /// constraints address partitions by name alone.
    pub fn add_list_partition(
        &self,
        table_name: &str,
        partition_name: &str,
        values: Vec<String>,
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        let table = state
            .tables
            .get(table_name)
            .ok_or_else(|| CatalogError::TableNotFound {
                name: table_name.to_string(),
            })?;
        let PartitionSpec::List(list) = &table.partition else {
            return Err(CatalogError::NotListPartitioned {
                table: table_name.to_string(),
            });
        };

        if find_partition(&state.tables, partition_name).is_some() {
            return Err(CatalogError::PartitionAlreadyExists {
                name: partition_name.to_string(),
            });
        }

        // Values are stored in the canonical text of the column's type so
        // they compare equal to the encoded cells the router looks up.
        let column_type = table
            .column_index(&list.column_name)
            .map(|i| table.columns[i].data_type)
            .ok_or_else(|| CatalogError::ColumnNotFound {
                table: table_name.to_string(),
                column: list.column_name.clone(),
            })?;
        let values = values
            .into_iter()
            .map(|value| {
                datum::canonicalize(&value, column_type).map_err(|_| {
                    CatalogError::InvalidPartitionValue {
                        table: table_name.to_string(),
                        column: list.column_name.clone(),
                        value,
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some((value, owner)) = list.owner_of_any(&values) {
            return Err(CatalogError::ValueAlreadyPartitioned {
                value: value.to_string(),
                partition: owner.to_string(),
            });
        }

        let mut list = list.clone();
        list.partitions.insert(
            partition_name.to_string(),
            Partition {
                values: values.into_iter().collect(),
                constraints: BTreeMap::new(),
            },
        );
        self.put_partition_record(table_name, &list)?;

        if let Some(table) = state.tables.get_mut(table_name) {
            table.partition = PartitionSpec::List(list);
        }
        tracing::debug!(table = %table_name, partition = %partition_name, "partition added");
        Ok(())
    }

    /// Attaches the placement constraint `key = value` to a partition,
    /// replacing an earlier value for the same key.
    pub fn add_partition_constraint(
        &self,
        partition_name: &str,
        (key, value): (String, String),
    ) -> Result<(), CatalogError> {
        let mut state = self.state.lock();
        let (table_name, mut list) = find_partition(&state.tables, partition_name)
            .map(|(table, list)| (table.name.clone(), list.clone()))
            .ok_or_else(|| CatalogError::PartitionNotFound {
                name: partition_name.to_string(),
            })?;

        if let Some(partition) = list.partitions.get_mut(partition_name) {
            partition.constraints.insert(key.clone(), value.clone());
        }
        self.put_partition_record(&table_name, &list)?;

        if let Some(table) = state.tables.get_mut(&table_name) {
            table.partition = PartitionSpec::List(list);
        }
        tracing::debug!(
            partition = %partition_name,
            key = %key,
            value = %value,
            "partition constraint added"
        );
        Ok(())
    }

    fn put_table_record(&self, table: &Table) -> Result<(), CatalogError> {
        let record = serde_json::to_vec(&TableRecord::from(table))?;
        self.store
            .put(Namespace::Tables, &table_key(table.id), &record)?;
        Ok(())
    }

    fn put_partition_record(&self, table_name: &str, list: &ListPartition) -> Result<(), CatalogError> {
        let record = serde_json::to_vec(list)?;
        self.store.put(Namespace::Partitions, table_name, &record)?;
        Ok(())
    }
}

/// Finds the table holding a partition named `partition_name`.
fn find_partition<'a>(
    tables: &'a HashMap<String, Table>,
    partition_name: &str,
) -> Option<(&'a Table, &'a ListPartition)> {
    tables.values().find_map(|table| match &table.partition {
        PartitionSpec::List(list) if list.partitions.contains_key(partition_name) => {
            Some((table, list))
        }
        PartitionSpec::List(_) | PartitionSpec::None => None,
    })
}
