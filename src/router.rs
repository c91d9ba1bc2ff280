//! Partition routing for inserts.
//!
//! An insert into a list-partitioned table is split into one remote insert per
//! row, each sent to the node owning the row's partition.
//!
//! ## Routing a row
//!
//! ```text
//! row ──► partition column value ──► ListPartition::lookup ──► partition
//!                                                                  │
//!          InsertRequest ◄── exactly one node ◄── get_servers(constraints)
//! ```
//!
//! Every row of a statement is resolved before the first remote call is made,
//! so an unroutable row fails the statement without side effects. Remote calls
//! then run one at a time in row order, each on its own task. The first failing
//! call stops the statement; rows sent before it stay written.

mod error;

pub use error::RouterError;

use std::collections::HashSet;
use std::sync::Arc;

use crate::catalog::{Catalog, ListPartition, PartitionSpec, Table};
use crate::cluster::{NodeDescriptor, ServerRegistry};
use crate::datum::{self, Datum, DatumError, Type};
use crate::kv::KvStore;
use crate::rpc::{InsertRequest, PeerClient};

/// A row resolved to its partition and owning node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutedRow {
    pub partition: String,
    pub node: NodeDescriptor,
    pub request: InsertRequest,
}

/// Resolves and ships inserts for partitioned tables.
pub struct PartitionRouter<S: KvStore, C: PeerClient> {
    catalog: Arc<Catalog<S>>,
    registry: Arc<ServerRegistry>,
    client: Arc<C>,
}

impl<S: KvStore, C: PeerClient> PartitionRouter<S, C> {
    pub fn new(catalog: Arc<Catalog<S>>, registry: Arc<ServerRegistry>, client: Arc<C>) -> Self {
        Self {
            catalog,
            registry,
            client,
        }
    }

    /// Routes `rows` into `table` and returns the number of rows written.
    ///
    /// An empty `columns` list means every table column in definition order.
    pub async fn insert(
        &self,
        table: &str,
        columns: &[String],
        rows: Vec<Vec<Datum>>,
    ) -> Result<usize, RouterError> {
        let routed = self.plan(table, columns, rows)?;
        let total = routed.len();

        for (sent, row) in routed.into_iter().enumerate() {
            let RoutedRow {
                partition,
                node,
                request,
            } = row;
            tracing::debug!(
                table = %table,
                partition = %partition,
                node = %node.rpc_address,
                "routing row"
            );

            let client = self.client.clone();
            let addr = node.rpc_address.clone();
            let result = tokio::spawn(async move { client.insert(&addr, request).await }).await?;

            if let Err(source) = result {
                tracing::error!(
                    table = %table,
                    node = %node.rpc_address,
                    routed = sent,
                    error = %source,
                    "remote insert failed"
                );
                return Err(RouterError::Remote {
                    node: node.rpc_address,
                    routed: sent,
                    source,
                });
            }
        }

        tracing::info!(table = %table, rows = total, "insert routed");
        Ok(total)
    }

    /// Resolves every row to a partition and node without sending anything.
    pub fn plan(
        &self,
        table_name: &str,
        columns: &[String],
        rows: Vec<Vec<Datum>>,
    ) -> Result<Vec<RoutedRow>, RouterError> {
        let table = self
            .catalog
            .get_table(table_name)
            .ok_or_else(|| RouterError::TableNotFound {
                table: table_name.to_string(),
            })?;
        let list = match &table.partition {
            PartitionSpec::List(list) => list,
            PartitionSpec::None => {
                return Err(RouterError::NotPartitioned {
                    table: table_name.to_string(),
                });
            }
        };

        let target = InsertTarget::resolve(&table, list, columns)?;

        rows.into_iter()
            .enumerate()
            .map(|(index, row)| self.route_row(&table, list, &target, index, row))
            .collect()
    }

    fn route_row(
        &self,
        table: &Table,
        list: &ListPartition,
        target: &InsertTarget,
        index: usize,
        row: Vec<Datum>,
    ) -> Result<RoutedRow, RouterError> {
        if row.len() != target.names.len() {
            return Err(RouterError::RowWidthMismatch {
                row: index + 1,
                expected: target.names.len(),
                found: row.len(),
            });
        }

        let values = row
            .into_iter()
            .zip(&target.names)
            .zip(&target.ordinals)
            .map(|((value, name), &ordinal)| {
                coerce(value, table.columns[ordinal].data_type, name).map(|d| datum::encode(&d))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let partition_value = &values[target.partition_position];
        let (partition_name, partition) =
            list.lookup(partition_value)
                .ok_or_else(|| RouterError::NoPartition {
                    table: table.name.clone(),
                    value: partition_value.clone(),
                })?;

        let mut nodes = self.registry.get_servers(&partition.constraints);
        let node = match nodes.len() {
            0 => {
                return Err(RouterError::NoServer {
                    partition: partition_name.to_string(),
                });
            }
            1 => nodes.remove(0),
            matches => {
                return Err(RouterError::AmbiguousServer {
                    partition: partition_name.to_string(),
                    matches,
                });
            }
        };

        Ok(RoutedRow {
            partition: partition_name.to_string(),
            node,
            request: InsertRequest {
                table: table.name.clone(),
                primary_key: values[target.primary_key_position].clone(),
                column_names: target.names.clone(),
                column_values: values,
                column_ordinals: target.ordinals.iter().map(|&o| o as u32).collect(),
            },
        })
    }
}

/// Column layout of an insert, resolved against the table once per statement.
struct InsertTarget {
    names: Vec<String>,
    /// Table ordinal of each listed column.
    ordinals: Vec<usize>,
    /// Index into `names` of the partitioning column.
    partition_position: usize,
    /// Index into `names` of the primary-key column.
    primary_key_position: usize,
}

impl InsertTarget {
    fn resolve(
        table: &Table,
        list: &ListPartition,
        columns: &[String],
    ) -> Result<Self, RouterError> {
        let names: Vec<String> = if columns.is_empty() {
            table.columns.iter().map(|c| c.name.clone()).collect()
        } else {
            columns.to_vec()
        };

        let mut seen = HashSet::new();
        let mut ordinals = Vec::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(RouterError::DuplicateColumn {
                    column: name.clone(),
                });
            }
            let ordinal = table
                .column_index(name)
                .ok_or_else(|| RouterError::ColumnNotFound {
                    table: table.name.clone(),
                    column: name.clone(),
                })?;
            ordinals.push(ordinal);
        }

        let partition_position = names
            .iter()
            .position(|name| *name == list.column_name)
            .ok_or_else(|| RouterError::PartitionColumnMissing {
                table: table.name.clone(),
                column: list.column_name.clone(),
            })?;

        let primary_key_position = table
            .primary_key()
            .and_then(|(pk, _)| ordinals.iter().position(|&o| o == pk))
            .ok_or_else(|| RouterError::PrimaryKeyMissing {
                table: table.name.clone(),
            })?;

        Ok(Self {
            names,
            ordinals,
            partition_position,
            primary_key_position,
        })
    }
}

/// Converts a literal to the column's type, naming the column on failure.
fn coerce(value: Datum, ty: Type, column: &str) -> Result<Datum, RouterError> {
    datum::coerce(value, ty).map_err(|e| match e {
        DatumError::TypeMismatch { expected, value } => RouterError::TypeMismatch {
            column: column.to_string(),
            expected,
            value,
        },
        other => RouterError::TypeMismatch {
            column: column.to_string(),
            expected: ty,
            value: other.to_string(),
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Column, PartitionStrategy};
    use crate::cluster::RegistrationPolicy;
    use crate::error::ErrorKind;
    use crate::kv::MemoryKvStore;
    use crate::rpc::{InsertResponse, RpcError, RpcRequest, RpcResponse};
    use parking_lot::Mutex;

    /// Records every call and fails the call with the given index.
    #[derive(Default)]
    struct RecordingClient {
        calls: Mutex<Vec<(String, RpcRequest)>>,
        fail_at: Option<usize>,
    }

    impl PeerClient for RecordingClient {
        async fn call(&self, addr: &str, request: RpcRequest) -> Result<RpcResponse, RpcError> {
            let mut calls = self.calls.lock();
            let index = calls.len();
            calls.push((addr.to_string(), request));
            if self.fail_at == Some(index) {
                return Err(RpcError::ConnectionClosed);
            }
            Ok(RpcResponse::Insert(InsertResponse {}))
        }
    }

    struct Fixture {
        catalog: Arc<Catalog<MemoryKvStore>>,
        registry: Arc<ServerRegistry>,
        client: Arc<RecordingClient>,
        router: PartitionRouter<MemoryKvStore, RecordingClient>,
    }

    fn node(rpc: &str, region: &str) -> NodeDescriptor {
        NodeDescriptor {
            sql_address: String::new(),
            rpc_address: rpc.to_string(),
            region: region.to_string(),
            data_dir: String::new(),
        }
    }

    fn fixture_with(client: RecordingClient) -> Fixture {
        let catalog = Arc::new(Catalog::open(Arc::new(MemoryKvStore::new())).unwrap());
        catalog
            .add_table(
                "t",
                vec![
                    Column::new("id", Type::Int64).primary_key(),
                    Column::new("region", Type::String),
                ],
            )
            .unwrap();
        catalog
            .set_partition("t", "region", PartitionStrategy::List)
            .unwrap();
        catalog
            .add_list_partition("t", "asia", vec!["asia".to_string(), "cn".to_string()])
            .unwrap();
        catalog
            .add_partition_constraint("asia", ("region".to_string(), "asia".to_string()))
            .unwrap();

        let registry = Arc::new(ServerRegistry::new(RegistrationPolicy::Idempotent));
        registry.register(node("asia-node:1", "asia")).unwrap();
        registry.register(node("eu-node:1", "eu")).unwrap();

        let client = Arc::new(client);
        let router = PartitionRouter::new(catalog.clone(), registry.clone(), client.clone());
        Fixture {
            catalog,
            registry,
            client,
            router,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingClient::default())
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn row(id: i64, region: &str) -> Vec<Datum> {
        vec![Datum::Int64(id), Datum::from(region)]
    }

    fn sent_inserts(client: &RecordingClient) -> Vec<(String, InsertRequest)> {
        client
            .calls
            .lock()
            .iter()
            .filter_map(|(addr, request)| match request {
                RpcRequest::Insert(insert) => Some((addr.clone(), insert.clone())),
                RpcRequest::Register(_) => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_insert_routes_to_owner() {
        let f = fixture();
        let count = f
            .router
            .insert("t", &names(&["id", "region"]), vec![row(1, "asia")])
            .await
            .unwrap();
        assert_eq!(count, 1);

        let sent = sent_inserts(&f.client);
        assert_eq!(sent.len(), 1);
        let (addr, request) = &sent[0];
        assert_eq!(addr, "asia-node:1");
        assert_eq!(request.table, "t");
        assert_eq!(request.primary_key, "1");
        assert_eq!(request.column_names, names(&["id", "region"]));
        assert_eq!(request.column_values, names(&["1", "asia"]));
        assert_eq!(request.column_names.len(), request.column_values.len());
        assert_eq!(request.column_ordinals, vec![0, 1]);
    }

    #[test]
    fn test_plan_resolves_partition() {
        let f = fixture();
        let routed = f
            .router
            .plan("t", &names(&["id", "region"]), vec![row(1, "cn")])
            .unwrap();
        assert_eq!(routed[0].partition, "asia");
        assert_eq!(routed[0].node.region, "asia");
    }

    #[tokio::test]
    async fn test_column_order_follows_statement() {
        let f = fixture();
        f.router
            .insert(
                "t",
                &names(&["region", "id"]),
                vec![vec![Datum::from("cn"), Datum::Int64(9)]],
            )
            .await
            .unwrap();

        let (_, request) = &sent_inserts(&f.client)[0];
        assert_eq!(request.column_names, names(&["region", "id"]));
        assert_eq!(request.column_values, names(&["cn", "9"]));
        assert_eq!(request.column_ordinals, vec![1, 0]);
        assert_eq!(request.primary_key, "9");
    }

    #[tokio::test]
    async fn test_empty_column_list_uses_table_order() {
        let f = fixture();
        f.router.insert("t", &[], vec![row(3, "asia")]).await.unwrap();
        let (_, request) = &sent_inserts(&f.client)[0];
        assert_eq!(request.column_names, names(&["id", "region"]));
    }

    #[tokio::test]
    async fn test_unknown_value_fails_before_any_call() {
        let f = fixture();
        let err = f
            .router
            .insert(
                "t",
                &names(&["id", "region"]),
                vec![row(1, "asia"), row(2, "eu")],
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(matches!(err, RouterError::NoPartition { ref value, .. } if value == "eu"));
        assert!(f.client.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_no_matching_server() {
        let f = fixture();
        f.catalog
            .add_list_partition("t", "us", vec!["us".to_string()])
            .unwrap();
        f.catalog
            .add_partition_constraint("us", ("region".to_string(), "us".to_string()))
            .unwrap();

        let err = f
            .router
            .insert("t", &names(&["id", "region"]), vec![row(1, "us")])
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::NoServer { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(f.client.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_ambiguous_server() {
        let f = fixture();
        f.registry.register(node("asia-node:2", "asia")).unwrap();

        let err = f
            .router
            .insert("t", &names(&["id", "region"]), vec![row(1, "asia")])
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::AmbiguousServer { matches: 2, .. }));
    }

    #[tokio::test]
    async fn test_statement_shape_errors() {
        let f = fixture();

        let err = f.router.insert("missing", &[], vec![]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        f.catalog
            .add_table("plain", vec![Column::new("id", Type::Int64).primary_key()])
            .unwrap();
        let err = f
            .router
            .insert("plain", &[], vec![vec![Datum::Int64(1)]])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);

        let err = f
            .router
            .insert("t", &names(&["id"]), vec![vec![Datum::Int64(1)]])
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::PartitionColumnMissing { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = f
            .router
            .insert("t", &names(&["region"]), vec![vec![Datum::from("asia")]])
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::PrimaryKeyMissing { .. }));

        let err = f
            .router
            .insert("t", &names(&["id", "nope"]), vec![row(1, "asia")])
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::ColumnNotFound { .. }));

        let err = f
            .router
            .insert("t", &names(&["id", "region"]), vec![vec![Datum::Int64(1)]])
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::RowWidthMismatch { .. }));

        assert!(f.client.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_literal_types_are_checked() {
        let f = fixture();
        let err = f
            .router
            .insert(
                "t",
                &names(&["id", "region"]),
                vec![vec![Datum::Int64(1), Datum::Int64(2)]],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::TypeMismatch { ref column, .. } if column == "region"));

        // Quoted integers are accepted for integer columns.
        f.router
            .insert(
                "t",
                &names(&["id", "region"]),
                vec![vec![Datum::from("42"), Datum::from("asia")]],
            )
            .await
            .unwrap();
        assert_eq!(sent_inserts(&f.client)[0].1.primary_key, "42");
    }

    #[tokio::test]
    async fn test_remote_failure_stops_statement() {
        let f = fixture_with(RecordingClient {
            calls: Mutex::new(Vec::new()),
            fail_at: Some(1),
        });

        let err = f
            .router
            .insert(
                "t",
                &names(&["id", "region"]),
                vec![row(1, "asia"), row(2, "cn"), row(3, "asia")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::Remote { routed: 1, .. }));
        assert_eq!(err.kind(), ErrorKind::Internal);
        // The third row is never attempted.
        assert_eq!(f.client.calls.lock().len(), 2);
    }
}
