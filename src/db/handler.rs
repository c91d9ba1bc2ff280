//! Statement execution against the catalog and the partition router.
//!
//! The [`StatementHandler`] sits between the protocol layer (Connection) and
//! the node's services. DDL maps onto catalog mutations, INSERT is handed to
//! the [`PartitionRouter`](crate::router::PartitionRouter), and SHOW reads the
//! catalog or the registry.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::Database;
use super::error::DatabaseError;
use crate::catalog::{CatalogError, Column, PartitionSpec, PartitionStrategy};
use crate::datum::{self, Datum, Type};
use crate::kv::KvStore;
use crate::rpc::PeerClient;
use crate::sql::{
    AlterTableStmt, CreatePartitionStmt, CreateTableStmt, DropTableStmt, InsertStmt, Literal,
    Parser, PartitionMethod, ShowStmt, Statement,
};

/// Name and type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDesc {
    pub name: String,
    pub data_type: Type,
}

impl ColumnDesc {
    pub fn new(name: impl Into<String>, data_type: Type) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Result of executing a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Statement completed without producing rows.
    Command {
        /// Command tag (e.g., "CREATE TABLE", "INSERT 0 2"), for logs.
        tag: String,
    },
    /// Statement returned rows (SHOW).
    Rows {
        columns: Vec<ColumnDesc>,
        rows: Vec<Vec<Datum>>,
        /// Command completion tag.
        tag: String,
    },
}

/// Executes statements for one client connection.
pub struct StatementHandler<S: KvStore, C: PeerClient> {
    database: Arc<Database<S, C>>,
}

impl<S: KvStore, C: PeerClient> StatementHandler<S, C> {
    pub fn new(database: Arc<Database<S, C>>) -> Self {
        Self { database }
    }

    pub fn database(&self) -> &Arc<Database<S, C>> {
        &self.database
    }

    /// Parses and executes a SQL query string.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - Empty query (no statement parsed)
    /// * `Ok(Some(QueryResult))` - Execution result
    /// * `Err(DatabaseError::Parse)` - If SQL parsing fails
    /// * `Err(DatabaseError::*)` - If execution fails
    pub async fn execute_query(&self, query: &str) -> Result<Option<QueryResult>, DatabaseError> {
        match Parser::new(query).parse()? {
            None => Ok(None),
            Some(stmt) => Ok(Some(self.execute_statement(&stmt).await?)),
        }
    }

    /// Executes a parsed statement.
    pub async fn execute_statement(&self, stmt: &Statement) -> Result<QueryResult, DatabaseError> {
        tracing::debug!(statement = stmt.name(), "executing statement");

        match stmt {
            Statement::CreateTable(create) => self.create_table(create),
            Statement::CreatePartition(create) => self.create_partition(create),
            Statement::DropTable(drop) => self.drop_table(drop),
            Statement::AlterTable(alter) => self.alter_table(alter),
            Statement::Insert(insert) => self.insert(insert).await,
            Statement::Select(_) => Err(DatabaseError::Unsupported {
                statement: stmt.name(),
            }),
            Statement::Transaction(_) => Ok(QueryResult::Command {
                tag: stmt.name().to_string(),
            }),
            Statement::Show(ShowStmt::Tables) => Ok(self.show_tables()),
            Statement::Show(ShowStmt::Servers) => Ok(self.show_servers()),
        }
    }

    fn create_table(&self, stmt: &CreateTableStmt) -> Result<QueryResult, DatabaseError> {
        let partition = match &stmt.partition_by {
            None => None,
            Some(by) => match by.columns.as_slice() {
                [column] => Some((column.as_str(), partition_strategy(by.method))),
                columns => {
                    return Err(DatabaseError::InvalidStatement(format!(
                        "partitioning by {} columns is not supported, exactly one is required",
                        columns.len()
                    )));
                }
            },
        };

        let columns = stmt
            .columns
            .iter()
            .map(|def| {
                let mut column = Column::new(&def.name, Type::from_name(&def.type_name)?);
                column.primary_key = def.is_primary_key();
                Ok(column)
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        let catalog = self.database.catalog();
        catalog.add_table(&stmt.name, columns)?;

        if let Some((column, strategy)) = partition
            && let Err(e) = catalog.set_partition(&stmt.name, column, strategy)
        {
            // A rejected PARTITION BY leaves no table behind.
            if let Err(drop_err) = catalog.drop_table(&stmt.name) {
                tracing::warn!(table = %stmt.name, error = %drop_err, "failed to remove table");
            }
            return Err(e.into());
        }

        tracing::info!(table = %stmt.name, "table created");
        Ok(QueryResult::Command {
            tag: "CREATE TABLE".to_string(),
        })
    }

    fn create_partition(&self, stmt: &CreatePartitionStmt) -> Result<QueryResult, DatabaseError> {
        let catalog = self.database.catalog();
        // An unknown or unpartitioned parent is reported by the catalog.
        let column_type = catalog.get_table(&stmt.parent).and_then(|table| {
            let PartitionSpec::List(list) = &table.partition else {
                return None;
            };
            let index = table.column_index(&list.column_name)?;
            Some(table.columns[index].data_type)
        });
        let values = stmt
            .values
            .iter()
            .map(|literal| {
                let value = literal_to_datum(literal)?;
                let value = match column_type {
                    Some(ty) => datum::coerce(value, ty)?,
                    None => value,
                };
                Ok(datum::encode(&value))
            })
            .collect::<Result<Vec<_>, DatabaseError>>()?;

        catalog.add_list_partition(&stmt.parent, &stmt.name, values)?;

        tracing::info!(table = %stmt.parent, partition = %stmt.name, "partition created");
        Ok(QueryResult::Command {
            tag: "CREATE TABLE".to_string(),
        })
    }

    fn drop_table(&self, stmt: &DropTableStmt) -> Result<QueryResult, DatabaseError> {
        let existed = self.database.catalog().drop_table(&stmt.name)?;
        if !existed && !stmt.if_exists {
            return Err(CatalogError::TableNotFound {
                name: stmt.name.clone(),
            }
            .into());
        }

        tracing::info!(table = %stmt.name, existed, "table dropped");
        Ok(QueryResult::Command {
            tag: "DROP TABLE".to_string(),
        })
    }

    /// Applies each `key = value` option as a placement constraint of the
    /// partition named by the statement.
    fn alter_table(&self, stmt: &AlterTableStmt) -> Result<QueryResult, DatabaseError> {
        for option in &stmt.options {
            let value = datum::encode(&literal_to_datum(&option.value)?);
            self.database
                .catalog()
                .add_partition_constraint(&stmt.name, (option.key.clone(), value))?;
        }

        Ok(QueryResult::Command {
            tag: "ALTER TABLE".to_string(),
        })
    }

    async fn insert(&self, stmt: &InsertStmt) -> Result<QueryResult, DatabaseError> {
        let rows = stmt
            .rows
            .iter()
            .map(|row| row.iter().map(literal_to_datum).collect::<Result<Vec<_>, _>>())
            .collect::<Result<Vec<_>, _>>()?;

        let count = self
            .database
            .router()
            .insert(&stmt.table, &stmt.columns, rows)
            .await?;

        Ok(QueryResult::Command {
            tag: format!("INSERT 0 {}", count),
        })
    }

    fn show_tables(&self) -> QueryResult {
        let rows = self
            .database
            .catalog()
            .tables()
            .into_iter()
            .map(|table| {
                let partitioned = match &table.partition {
                    PartitionSpec::None => "none".to_string(),
                    PartitionSpec::List(list) => format!("list({})", list.column_name),
                };
                vec![
                    Datum::String(table.name),
                    Datum::String(partitioned),
                    Datum::Int64(table.columns.len() as i64),
                ]
            })
            .collect();

        QueryResult::Rows {
            columns: vec![
                ColumnDesc::new("table_name", Type::String),
                ColumnDesc::new("partitioned", Type::String),
                ColumnDesc::new("columns", Type::Int64),
            ],
            rows,
            tag: "SHOW".to_string(),
        }
    }

    fn show_servers(&self) -> QueryResult {
        let rows = self
            .database
            .registry()
            .get_servers(&BTreeMap::new())
            .into_iter()
            .map(|node| {
                vec![
                    Datum::String(node.sql_address),
                    Datum::String(node.rpc_address),
                    Datum::String(node.region),
                ]
            })
            .collect();

        QueryResult::Rows {
            columns: vec![
                ColumnDesc::new("sql_address", Type::String),
                ColumnDesc::new("rpc_address", Type::String),
                ColumnDesc::new("region", Type::String),
            ],
            rows,
            tag: "SHOW".to_string(),
        }
    }
}

fn partition_strategy(method: PartitionMethod) -> PartitionStrategy {
    match method {
        PartitionMethod::List => PartitionStrategy::List,
        PartitionMethod::Range => PartitionStrategy::Range,
        PartitionMethod::Hash => PartitionStrategy::Hash,
    }
}

/// Converts a literal to an untyped value; the router coerces it to the
/// column type.
fn literal_to_datum(literal: &Literal) -> Result<Datum, DatabaseError> {
    match literal {
        Literal::Integer(n) => Ok(Datum::Int64(*n)),
        Literal::String(s) => Ok(Datum::String(s.clone())),
        Literal::Null => Err(DatabaseError::InvalidStatement(
            "NULL values are not supported".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{LoopbackClient, TestDb, open_test_db};
    use crate::error::ErrorKind;
    use crate::rpc::RpcRequest;

    const CREATE_T: &str =
        "CREATE TABLE t (id INT PRIMARY KEY, region STRING) PARTITION BY LIST(region)";

    fn handler(db: &Arc<TestDb>) -> StatementHandler<crate::kv::MemoryKvStore, LoopbackClient> {
        StatementHandler::new(db.clone())
    }

    async fn run(
        handler: &StatementHandler<crate::kv::MemoryKvStore, LoopbackClient>,
        sql: &str,
    ) -> Result<QueryResult, DatabaseError> {
        handler.execute_query(sql).await.map(|r| r.unwrap())
    }

    async fn setup_partitioned(
        handler: &StatementHandler<crate::kv::MemoryKvStore, LoopbackClient>,
    ) {
        run(handler, CREATE_T).await.unwrap();
        run(
            handler,
            "CREATE TABLE asia PARTITION OF t FOR VALUES IN ('asia', 'cn')",
        )
        .await
        .unwrap();
        run(handler, "ALTER TABLE asia SET (region = 'asia')")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_query() {
        let (db, _) = open_test_db();
        assert_eq!(handler(&db).execute_query("").await.unwrap(), None);
        assert_eq!(handler(&db).execute_query(" -- nothing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_create_partitioned_table() {
        let (db, _) = open_test_db();
        let h = handler(&db);

        let result = run(&h, CREATE_T).await.unwrap();
        assert_eq!(
            result,
            QueryResult::Command {
                tag: "CREATE TABLE".to_string()
            }
        );

        let table = db.catalog().get_table("t").unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[0].data_type, Type::Int64);
        assert!(table.columns[0].primary_key);
        assert_eq!(
            table.columns[1].partitioning,
            Some(PartitionStrategy::List)
        );
        assert!(matches!(table.partition, PartitionSpec::List(_)));
    }

    #[tokio::test]
    async fn test_create_table_twice_already_exists() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        run(&h, CREATE_T).await.unwrap();
        let err = run(&h, CREATE_T).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    }

    #[tokio::test]
    async fn test_create_table_rejects_multiple_partition_columns() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        let err = run(
            &h,
            "CREATE TABLE t (id INT, a STRING, b STRING) PARTITION BY LIST (a, b)",
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(db.catalog().get_table("t").is_none());
    }

    #[tokio::test]
    async fn test_create_table_rejects_non_list_strategy() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        let err = run(&h, "CREATE TABLE t (id INT) PARTITION BY HASH (id)")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert!(db.catalog().get_table("t").is_none());
    }

    #[tokio::test]
    async fn test_create_table_unsupported_type() {
        let (db, _) = open_test_db();
        let err = run(&handler(&db), "CREATE TABLE t (id INT, ratio FLOAT)")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Datum(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_partition_and_constraint() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        setup_partitioned(&h).await;

        let table = db.catalog().get_table("t").unwrap();
        let PartitionSpec::List(list) = table.partition else {
            panic!("expected list partitioning");
        };
        let partition = &list.partitions["asia"];
        assert!(partition.values.contains("cn"));
        assert_eq!(partition.constraints["region"], "asia");
    }

    #[tokio::test]
    async fn test_partition_values_follow_column_type() {
        let (db, client) = open_test_db();
        let h = handler(&db);
        run(
            &h,
            "CREATE TABLE z (id INT PRIMARY KEY, zone INT) PARTITION BY LIST(zone)",
        )
        .await
        .unwrap();
        run(&h, "CREATE TABLE z1 PARTITION OF z FOR VALUES IN ('01', 2)")
            .await
            .unwrap();
        run(&h, "ALTER TABLE z1 SET (region = 'asia')").await.unwrap();

        let err = run(&h, "CREATE TABLE zx PARTITION OF z FOR VALUES IN ('abc')")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = run(&h, "CREATE TABLE asia PARTITION OF t FOR VALUES IN (1)")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        run(&h, "INSERT INTO z VALUES (1, '01'), (2, 1), (3, 2)")
            .await
            .unwrap();
        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        let (_, RpcRequest::Insert(request)) = &calls[0] else {
            panic!("expected an insert call");
        };
        assert_eq!(request.column_values, vec!["1", "1"]);
    }

    #[tokio::test]
    async fn test_string_partition_rejects_integer_value() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        run(&h, CREATE_T).await.unwrap();

        let err = run(&h, "CREATE TABLE p PARTITION OF t FOR VALUES IN (7)")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(db.catalog().get_table("p").is_none());
    }

    #[tokio::test]
    async fn test_alter_unknown_partition() {
        let (db, _) = open_test_db();
        let err = run(&handler(&db), "ALTER TABLE nowhere SET (region = 'eu')")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_insert_routes_to_owner() {
        let (db, client) = open_test_db();
        let h = handler(&db);
        setup_partitioned(&h).await;

        let result = run(&h, "INSERT INTO t (id, region) VALUES (1, 'asia'), (2, 'cn')")
            .await
            .unwrap();
        assert_eq!(
            result,
            QueryResult::Command {
                tag: "INSERT 0 2".to_string()
            }
        );

        let calls = client.calls();
        assert_eq!(calls.len(), 2);
        let (addr, RpcRequest::Insert(request)) = &calls[0] else {
            panic!("expected an insert call");
        };
        assert_eq!(addr, "127.0.0.1:50051");
        assert_eq!(request.column_names, vec!["id", "region"]);
        assert_eq!(request.column_values, vec!["1", "asia"]);
    }

    #[tokio::test]
    async fn test_insert_without_partition_fails_before_remote_call() {
        let (db, client) = open_test_db();
        let h = handler(&db);
        setup_partitioned(&h).await;

        let err = run(&h, "INSERT INTO t VALUES (1, 'asia'), (2, 'eu')")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_insert_null_rejected() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        setup_partitioned(&h).await;

        let err = run(&h, "INSERT INTO t VALUES (1, NULL)").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_insert_unpartitioned_unimplemented() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        run(&h, "CREATE TABLE plain (id INT PRIMARY KEY)").await.unwrap();

        let err = run(&h, "INSERT INTO plain VALUES (1)").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
    }

    #[tokio::test]
    async fn test_drop_table() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        run(&h, CREATE_T).await.unwrap();

        run(&h, "DROP TABLE t").await.unwrap();
        assert!(db.catalog().get_table("t").is_none());

        let err = run(&h, "DROP TABLE t").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        run(&h, "DROP TABLE IF EXISTS t").await.unwrap();
    }

    #[tokio::test]
    async fn test_show_tables() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        run(&h, CREATE_T).await.unwrap();
        run(&h, "CREATE TABLE plain (id INT)").await.unwrap();

        let QueryResult::Rows { columns, rows, tag } = run(&h, "SHOW TABLES").await.unwrap() else {
            panic!("expected rows");
        };
        assert_eq!(columns[0], ColumnDesc::new("table_name", Type::String));
        assert_eq!(tag, "SHOW");
        assert_eq!(
            rows,
            vec![
                vec![
                    Datum::from("t"),
                    Datum::from("list(region)"),
                    Datum::Int64(2),
                ],
                vec![Datum::from("plain"), Datum::from("none"), Datum::Int64(1)],
            ]
        );
    }

    #[tokio::test]
    async fn test_show_servers() {
        let (db, _) = open_test_db();
        let QueryResult::Rows { rows, .. } = run(&handler(&db), "SHOW SERVERS").await.unwrap()
        else {
            panic!("expected rows");
        };
        assert_eq!(
            rows,
            vec![vec![
                Datum::from("127.0.0.1:5432"),
                Datum::from("127.0.0.1:50051"),
                Datum::from("asia"),
            ]]
        );
    }

    #[tokio::test]
    async fn test_select_unimplemented() {
        let (db, _) = open_test_db();
        let err = run(&handler(&db), "SELECT * FROM t").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unimplemented);
        assert_eq!(err.to_string(), "SELECT is not supported");
    }

    #[tokio::test]
    async fn test_transaction_statements_acknowledged() {
        let (db, _) = open_test_db();
        let h = handler(&db);
        for sql in ["BEGIN", "COMMIT", "ROLLBACK"] {
            assert!(matches!(
                run(&h, sql).await.unwrap(),
                QueryResult::Command { .. }
            ));
        }
    }

    #[tokio::test]
    async fn test_syntax_error() {
        let (db, _) = open_test_db();
        let err = handler(&db)
            .execute_query("CREATE TABEL t")
            .await
            .unwrap_err();
        assert!(matches!(err, DatabaseError::Parse(_)));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}
