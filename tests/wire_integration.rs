//! Wire protocol tests against a running node.


use node_test_support::{TestNode, tags};

#[tokio::test(flavor = "multi_thread")]
async fn test_ssl_request_is_declined() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.connect().await;

    client.send_ssl_request().await;
    assert_eq!(client.read_byte().await, b'N');
}

#[tokio::test(flavor = "multi_thread")]
async fn test_startup_without_ssl_request_closes() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.connect().await;

    client.send_startup().await;
    let rest = client.read_to_close().await;
    assert!(rest.is_empty(), "unexpected reply: {:?}", rest);
    node.wait_for_no_connections().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_startup_sequence() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.connect().await;

    let replies = client.handshake().await;
    assert_eq!(
        tags(&replies),
        vec![b'R', b'S', b'S', b'S', b'S', b'S', b'K', b'Z']
    );
    assert_eq!(replies[0].body, vec![0, 0, 0, 0]);
    assert!(replies[1].body.starts_with(b"server_encoding\0UTF8\0"));
    assert_eq!(replies[6].body.len(), 8);
    assert_eq!(replies[7].body, vec![b'I']);
    assert_eq!(node.connections.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_ddl_replies_with_empty_query_response() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    let replies = client
        .query("CREATE TABLE t (id INT PRIMARY KEY, region STRING) PARTITION BY LIST (region)")
        .await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);
    assert!(node.database.catalog().get_table("t").is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_error_keeps_connection_open() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    let replies = client.query("SELECT * FROM t").await;
    assert_eq!(tags(&replies), vec![b'E', b'Z']);
    assert_eq!(replies[0].error_message(), "SELECT is not supported");

    let replies = client.query("CREATE TABLE (").await;
    assert_eq!(tags(&replies), vec![b'E', b'Z']);

    let replies = client.query("BEGIN").await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_empty_query() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    let replies = client.query("").await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_show_tables() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    client
        .query("CREATE TABLE t (id INT PRIMARY KEY, region STRING) PARTITION BY LIST (region)")
        .await;
    let replies = client.query("SHOW TABLES").await;
    assert_eq!(tags(&replies), vec![b'T', b'D', b'C', b'Z']);
    assert_eq!(
        replies[0].field_names(),
        vec!["table_name", "partitioned", "columns"]
    );
    assert_eq!(replies[1].data_row(), vec!["t", "list(region)", "2"]);
    assert!(replies[2].body.starts_with(b"SHOW\0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_show_servers() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    let replies = client.query("SHOW SERVERS").await;
    assert_eq!(tags(&replies), vec![b'T', b'D', b'C', b'Z']);
    assert_eq!(
        replies[1].data_row(),
        vec![
            node.sql_addr.to_string(),
            node.rpc_addr.to_string(),
            "asia".to_string()
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_terminate_closes_and_unregisters() {
    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    client.terminate().await;
    let rest = client.read_to_close().await;
    assert!(rest.is_empty());
    node.wait_for_no_connections().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unknown_message_type_closes() {
    use tokio::io::AsyncWriteExt;

    let node = TestNode::start("asia", None).await;
    let mut client = node.session().await;

    // Parse messages belong to the extended protocol, which is not served.
    client.stream.write_u8(b'P').await.unwrap();
    client.stream.write_i32(4).await.unwrap();
    client.read_to_close().await;
    node.wait_for_no_connections().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connections_are_independent() {
    let node = TestNode::start("asia", None).await;
    let mut first = node.session().await;
    let mut second = node.session().await;
    assert_eq!(node.connections.len(), 2);

    first.terminate().await;
    first.read_to_close().await;

    let replies = second.query("COMMIT").await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_closes_ready_connection() {
    let mut node = TestNode::start("asia", None).await;
    let mut client = node.session().await;
    let replies = client.query("BEGIN").await;
    assert_eq!(tags(&replies), vec![b'I', b'Z']);

    node.stop().await;
    assert!(node.connections.is_empty());
    assert!(client.read_to_close().await.is_empty());
}
