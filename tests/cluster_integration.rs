//! Two-node tests: joining, partition placement and remote inserts.


use std::collections::BTreeMap;

use regiondb::cluster::NodeDescriptor;
use regiondb::kv::{KvStore, MemoryKvStore, Namespace};
use tokio::net::TcpListener;

use node_test_support::{TestNode, WireClient, tags};

fn cell(store: &MemoryKvStore, key: &str) -> Option<String> {
    store
        .get(Namespace::Rows, key)
        .unwrap()
        .map(|v| String::from_utf8(v).unwrap())
}

/// Creates `t` partitioned by region with an `asia` and an `eu` partition,
/// each placed on the node of the same region.
async fn create_regional_table(client: &mut WireClient) {
    for sql in [
        "CREATE TABLE t (id INT PRIMARY KEY, region STRING, name STRING) PARTITION BY LIST (region)",
        "CREATE TABLE asia PARTITION OF t FOR VALUES IN ('asia', 'cn')",
        "CREATE TABLE eu PARTITION OF t FOR VALUES IN ('eu')",
        "ALTER TABLE asia SET (region = 'asia')",
        "ALTER TABLE eu SET (region = 'eu')",
    ] {
        let replies = client.query(sql).await;
        assert_eq!(tags(&replies), vec![b'I', b'Z'], "{}", sql);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_join_registers_with_peer() {
    let asia = TestNode::start("asia", None).await;
    let eu = TestNode::start("eu", Some(&asia)).await;

    let known = asia.registry.get_servers(&BTreeMap::new());
    assert_eq!(known.len(), 2);
    assert_eq!(known[1].rpc_address, eu.rpc_addr.to_string());
    assert_eq!(known[1].sql_address, eu.sql_addr.to_string());
    assert_eq!(known[1].region, "eu");

    // Joining is one-way: the joiner learns nothing about the peer.
    assert_eq!(eu.registry.get_servers(&BTreeMap::new()).len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_insert_routes_rows_by_region() {
    let asia = TestNode::start("asia", None).await;
    let eu = TestNode::start("eu", Some(&asia)).await;
    let mut client = asia.session().await;
    create_regional_table(&mut client).await;

    let replies = client
        .query("INSERT INTO t (id, region, name) VALUES (1, 'cn', 'li'), (2, 'eu', 'anna')")
        .await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);

    assert_eq!(cell(&asia.store, "/t/1/column_0").as_deref(), Some("1"));
    assert_eq!(cell(&asia.store, "/t/1/column_1").as_deref(), Some("cn"));
    assert_eq!(cell(&asia.store, "/t/1/column_2").as_deref(), Some("li"));
    assert_eq!(cell(&eu.store, "/t/2/column_2").as_deref(), Some("anna"));

    assert_eq!(cell(&asia.store, "/t/2/column_0"), None);
    assert_eq!(cell(&eu.store, "/t/1/column_0"), None);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_partition_without_server_writes_nothing() {
    let asia = TestNode::start("asia", None).await;
    let eu = TestNode::start("eu", Some(&asia)).await;
    let mut client = asia.session().await;
    create_regional_table(&mut client).await;

    client
        .query("CREATE TABLE us PARTITION OF t FOR VALUES IN ('us')")
        .await;
    client.query("ALTER TABLE us SET (region = 'us')").await;

    let replies = client
        .query("INSERT INTO t VALUES (1, 'asia', 'li'), (2, 'us', 'sam')")
        .await;
    assert_eq!(tags(&replies), vec![b'E', b'Z']);
    assert_eq!(
        replies[0].error_message(),
        "no server matches placement of partition \"us\""
    );

    assert!(asia.store.get_all(Namespace::Rows).unwrap().is_empty());
    assert!(eu.store.get_all(Namespace::Rows).unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_owner_reports_error() {
    let asia = TestNode::start("asia", None).await;
    let mut client = asia.session().await;
    create_regional_table(&mut client).await;

    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = closed.local_addr().unwrap().to_string();
    drop(closed);
    asia.registry
        .register(NodeDescriptor {
            sql_address: String::new(),
            rpc_address: dead_addr.clone(),
            region: "eu".to_string(),
            data_dir: String::new(),
        })
        .unwrap();

    let replies = client
        .query("INSERT INTO t VALUES (5, 'eu', 'anna')")
        .await;
    assert_eq!(tags(&replies), vec![b'E', b'Z']);
    let message = replies[0].error_message();
    assert!(
        message.starts_with(&format!("remote insert to {} failed", dead_addr)),
        "{}",
        message
    );

    let replies = client.query("INSERT INTO t VALUES (6, 'asia', 'li')").await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);
    assert_eq!(cell(&asia.store, "/t/6/column_2").as_deref(), Some("li"));
}
