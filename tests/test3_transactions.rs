mod common;

use common::FakeServer;
use libsql_client::prelude::*;

async fn setup(server: &std::sync::Arc<FakeServer>) -> Result<Client, LibsqlError> {
    let client = server.ws_client();
    client.execute("CREATE TABLE t (a TEXT)").await?;
    Ok(client)
}

#[tokio::test]
async fn commit_makes_writes_visible() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    let tx = client.transaction(TransactionMode::Write).await?;
    tx.execute(("INSERT INTO t VALUES (?)", vec!["one"])).await?;
    let rs = tx.execute("SELECT COUNT(*) FROM t").await?;
    assert_eq!(rs.rows[0][0], Value::Integer(1));
    // Not visible outside the transaction yet.
    assert_eq!(server.count("t"), 0);

    assert!(!tx.is_closed());
    tx.commit().await?;
    assert!(tx.is_closed());

    let rs = client.execute("SELECT COUNT(*) FROM t").await?;
    assert_eq!(rs.rows[0][0], Value::Integer(1));
    assert_eq!(server.open_streams(), 0);
    Ok(())
}

#[tokio::test]
async fn rollback_and_close_discard_writes() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    let tx = client.transaction(TransactionMode::Deferred).await?;
    tx.execute("INSERT INTO t VALUES ('rolled back')").await?;
    tx.rollback().await?;
    assert!(tx.is_closed());
    let err = tx.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransactionClosed);
    let err = tx.commit().await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransactionClosed);

    let tx = client.transaction(TransactionMode::Deferred).await?;
    tx.execute("INSERT INTO t VALUES ('closed')").await?;
    tx.close().await;
    tx.close().await;
    assert!(tx.is_closed());
    let err = tx.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransactionClosed);
    let err = tx.commit().await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransactionClosed);
    let err = tx.execute_multiple("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransactionClosed);

    assert_eq!(server.count("t"), 0);
    assert_eq!(server.open_streams(), 0);
    Ok(())
}

#[tokio::test]
async fn finished_transaction_rejects_every_call() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    let tx = client.transaction(TransactionMode::Deferred).await?;
    tx.commit().await?;

    let code = |r: Result<(), LibsqlError>| r.unwrap_err().code().clone();
    assert_eq!(
        code(tx.execute("SELECT 1").await.map(|_| ())),
        ErrorCode::TransactionClosed
    );
    assert_eq!(
        code(tx.batch(["SELECT 1"]).await.map(|_| ())),
        ErrorCode::TransactionClosed
    );
    assert_eq!(code(tx.commit().await), ErrorCode::TransactionClosed);
    assert_eq!(code(tx.rollback().await), ErrorCode::TransactionClosed);
    Ok(())
}

#[tokio::test]
async fn statement_error_keeps_transaction_open() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    let tx = client.transaction(TransactionMode::Write).await?;
    tx.execute("INSERT INTO t VALUES ('kept')").await?;
    let err = tx.execute("INSERT INTO missing VALUES (1)").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::Other("SQLITE_ERROR".into()));
    assert!(!tx.is_closed());

    tx.execute("INSERT INTO t VALUES ('also kept')").await?;
    tx.commit().await?;
    assert_eq!(server.count("t"), 2);
    Ok(())
}

#[tokio::test]
async fn batch_inside_transaction_stops_at_first_error() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    let tx = client.transaction(TransactionMode::Write).await?;
    let results = tx
        .batch([
            Statement::with_args("INSERT INTO t VALUES (?)", ["a"]),
            Statement::new("SELECT a FROM t"),
        ])
        .await?;
    assert_eq!(results[1].len(), 1);

    let err = tx
        .batch(["INSERT INTO t VALUES ('b')", "SELECT nope FROM t", "INSERT INTO t VALUES ('c')"])
        .await
        .unwrap_err();
    assert!(err.message().contains("nope"), "{err}");
    assert!(!tx.is_closed());

    tx.commit().await?;
    // 'a' and 'b' ran; the statement after the failure did not.
    assert_eq!(server.count("t"), 2);
    Ok(())
}

#[tokio::test]
async fn dropped_transaction_releases_its_stream() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    {
        let tx = client.transaction(TransactionMode::Write).await?;
        tx.execute("INSERT INTO t VALUES ('dropped')").await?;
        assert_eq!(server.open_streams(), 1);
    }
    for _ in 0..10 {
        if server.open_streams() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(server.open_streams(), 0);
    assert_eq!(server.count("t"), 0);
    Ok(())
}

#[tokio::test]
async fn closing_client_closes_its_transactions() -> Result<(), Box<dyn std::error::Error>> {
    let server = FakeServer::new();
    let client = setup(&server).await?;

    let tx = client.transaction(TransactionMode::Deferred).await?;
    client.close().await;
    assert!(tx.is_closed());
    let err = tx.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::ClientClosed);
    Ok(())
}

#[tokio::test]
async fn http_has_no_interactive_transactions() {
    let server = FakeServer::new();
    let err = server
        .http_client()
        .transaction(TransactionMode::Write)
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransactionsNotSupported);
    assert!(server.http_requests().is_empty());
}
