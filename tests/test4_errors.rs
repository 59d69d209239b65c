mod common;

use common::FakeServer;
use libsql_client::prelude::*;
use libsql_client::{Protocol, map_error};

#[tokio::test]
async fn closed_client_rejects_every_call() {
    let server = FakeServer::new();
    for client in server.clients() {
        assert!(!client.is_closed());
        client.close().await;
        assert!(client.is_closed());

        let err = client.execute("SELECT 1").await.unwrap_err();
        assert_eq!(err.code(), &ErrorCode::ClientClosed);
        let err = client
            .batch(TransactionMode::Deferred, ["SELECT 1"])
            .await
            .unwrap_err();
        assert_eq!(err.code(), &ErrorCode::ClientClosed);
        let err = client.execute_multiple("SELECT 1").await.unwrap_err();
        assert_eq!(err.code(), &ErrorCode::ClientClosed);
        let err = client
            .transaction(TransactionMode::Deferred)
            .await
            .unwrap_err();
        assert_eq!(err.code(), &ErrorCode::ClientClosed);
    }
    assert!(server.http_requests().is_empty());
}

#[tokio::test]
async fn configuration_errors_come_before_any_io() {
    let err = Client::connect(&Config::new("ftp://example.com/db"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UrlSchemeNotSupported);
    assert!(err.message().contains("\"ftp:\""), "{err}");

    let err = ConfigBuilder::new("libsql://example.com?mode=rw")
        .build()
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UrlParamNotSupported);
    assert!(err.message().contains("mode"), "{err}");

    let err = Client::connect(&Config::new("not a url")).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::UrlInvalid);
}

#[tokio::test]
async fn http_error_bodies_are_mapped() {
    let server = FakeServer::new();
    let client = server.http_client();

    server.respond_next_with(401, r#"{"message":"Unauthorized","code":"UNAUTHORIZED"}"#);
    let err = client.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::Other("UNAUTHORIZED".into()));
    assert_eq!(err.message(), "Unauthorized");

    server.respond_next_with(502, "bad gateway");
    let err = client.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::ServerError);
    assert!(err.message().contains("502"));
    assert!(err.message().contains("bad gateway"));

    server.respond_next_with(503, "");
    let err = client.batch(TransactionMode::Deferred, ["SELECT 1"]).await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::ServerError);
    assert_eq!(err.message(), "Server returned HTTP status 503");

    server.respond_next_with(200, "not json");
    let err = client.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::ProtocolError);

    // A failed request does not poison the client.
    assert!(client.execute("SELECT 1").await.is_ok());
}

#[tokio::test]
async fn bad_arguments_fail_before_the_round_trip() {
    let server = FakeServer::new();
    let client = server.http_client();

    let err = client
        .execute(Statement::with_args("SELECT ?", [InValue::Undefined]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TypeError);

    let err = client
        .execute(Statement::with_args("SELECT ?", [InValue::Number(f64::INFINITY)]))
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::CoercionError);

    let err = client
        .batch(
            TransactionMode::Deferred,
            [
                Statement::new("SELECT 1"),
                Statement::with_args("SELECT ?", [InValue::BigInt(i128::MAX)]),
            ],
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), &ErrorCode::CoercionError);

    assert!(server.http_requests().is_empty());
}

#[tokio::test]
async fn lost_connection_surfaces_transport_error() {
    let server = FakeServer::new();
    let client = server.ws_client();
    assert_eq!(client.protocol(), Protocol::Ws);
    client.execute("SELECT 1").await.unwrap();

    server.drop_connection();
    let err = client.execute("SELECT 1").await.unwrap_err();
    assert_eq!(err.code(), &ErrorCode::TransportError);
    assert!(client.is_closed());
}

#[test]
fn mapping_is_idempotent() {
    let original = LibsqlError::from_server("boom", Some("SQLITE_BUSY"));
    let mapped = map_error(map_error(original.clone()));
    assert_eq!(mapped, original);
    assert_eq!(mapped.to_string(), "SQLITE_BUSY: boom");

    let from_json = map_error(serde_json::from_str::<i32>("{").unwrap_err());
    assert_eq!(from_json.code(), &ErrorCode::ProtocolError);
}
