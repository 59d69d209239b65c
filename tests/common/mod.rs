//! In-process server for integration tests: answers both transport seams from a rusqlite
//! database file, evaluating batch conditions the way a real server does.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use libsql_client::codec;
use libsql_client::http::{HttpResponse, HttpTransport};
use libsql_client::proto::{
    Batch, BatchReq, BatchResp, BatchResult, Col, Condition, ExecuteReq, ExecuteResp, ProtoError,
    ProtoValue, Request, Response, Stmt, StmtResult,
};
use libsql_client::ws::StreamTransport;
use libsql_client::{Client, IntMode, LibsqlError, Value};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::Connection;
use tempfile::{TempDir, tempdir};

pub struct FakeServer {
    _dir: TempDir,
    path: PathBuf,
    streams: Mutex<HashMap<i32, Connection>>,
    closed: AtomicBool,
    /// Returned instead of handling the next HTTP request
    next_http_response: Mutex<Option<HttpResponse>>,
    /// Raw bodies of every HTTP request received
    http_requests: Mutex<Vec<String>>,
}

/// Honors `RUST_LOG` so client logs show up in failing tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl FakeServer {
    pub fn new() -> Arc<Self> {
        init_tracing();
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("fake.db");
        let conn = Connection::open(&path).expect("open db");
        let mode: String = conn
            .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
            .expect("wal");
        assert_eq!(mode.to_lowercase(), "wal");
        Arc::new(Self {
            _dir: dir,
            path,
            streams: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
            next_http_response: Mutex::new(None),
            http_requests: Mutex::new(Vec::new()),
        })
    }

    fn connect(&self) -> Connection {
        let conn = Connection::open(&self.path).expect("open db");
        conn.busy_timeout(std::time::Duration::from_millis(500))
            .expect("busy timeout");
        conn
    }

    pub fn http_client(self: &Arc<Self>) -> Client {
        Client::from_http(self.clone(), IntMode::Integer)
    }

    pub fn ws_client(self: &Arc<Self>) -> Client {
        Client::from_ws(self.clone(), IntMode::Integer)
    }

    pub fn clients(self: &Arc<Self>) -> [Client; 2] {
        [self.http_client(), self.ws_client()]
    }

    pub fn respond_next_with(&self, status: u16, body: &str) {
        *self.next_http_response.lock().unwrap() = Some(HttpResponse {
            status,
            body: body.to_owned(),
        });
    }

    pub fn http_requests(&self) -> Vec<String> {
        self.http_requests.lock().unwrap().clone()
    }

    pub fn open_streams(&self) -> usize {
        self.streams.lock().unwrap().len()
    }

    /// Simulate the connection dropping out from under the client.
    pub fn drop_connection(&self) {
        self.closed.store(true, Ordering::Release);
        self.streams.lock().unwrap().clear();
    }

    /// Read a table directly, bypassing the client.
    pub fn count(&self, table: &str) -> i64 {
        self.connect()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .expect("count")
    }

    fn handle_http(&self, path: &str, body: &str) -> HttpResponse {
        let outcome = match path {
            "v1/execute" => serde_json::from_str::<ExecuteReq>(body)
                .map_err(|e| bad_request(&e.to_string()))
                .and_then(|req| execute(&self.connect(), &req.stmt))
                .map(|result| serde_json::to_string(&ExecuteResp { result })),
            "v1/batch" => serde_json::from_str::<BatchReq>(body)
                .map_err(|e| bad_request(&e.to_string()))
                .map(|req| run_batch(&self.connect(), &req.batch))
                .map(|result| serde_json::to_string(&BatchResp { result })),
            other => {
                return HttpResponse {
                    status: 404,
                    body: format!("no route for {other}"),
                };
            }
        };
        match outcome {
            Ok(json) => HttpResponse {
                status: 200,
                body: json.expect("serialize"),
            },
            Err(err) => HttpResponse {
                status: 400,
                body: serde_json::to_string(&err).expect("serialize"),
            },
        }
    }

    fn handle_stream(&self, request: Request) -> Result<Response, ProtoError> {
        let mut streams = self.streams.lock().unwrap();
        match request {
            Request::OpenStream { stream_id } => {
                if streams.contains_key(&stream_id) {
                    return Err(bad_request("stream id already in use"));
                }
                streams.insert(stream_id, self.connect());
                Ok(Response::OpenStream)
            }
            Request::CloseStream { stream_id } => {
                // Dropping the connection rolls back any open transaction.
                streams.remove(&stream_id);
                Ok(Response::CloseStream)
            }
            Request::Execute { stream_id, stmt } => {
                let conn = streams.get(&stream_id).ok_or_else(stream_not_found)?;
                execute(conn, &stmt).map(|result| Response::Execute { result })
            }
            Request::Batch { stream_id, batch } => {
                let conn = streams.get(&stream_id).ok_or_else(stream_not_found)?;
                Ok(Response::Batch {
                    result: run_batch(conn, &batch),
                })
            }
        }
    }
}

#[async_trait]
impl HttpTransport for FakeServer {
    async fn post(&self, path: &str, body: String) -> Result<HttpResponse, LibsqlError> {
        self.http_requests.lock().unwrap().push(body.clone());
        if let Some(response) = self.next_http_response.lock().unwrap().take() {
            return Ok(response);
        }
        Ok(self.handle_http(path, &body))
    }
}

#[async_trait]
impl StreamTransport for FakeServer {
    async fn request(&self, request: Request) -> Result<Response, LibsqlError> {
        if self.is_closed() {
            return Err(LibsqlError::new(
                libsql_client::ErrorCode::TransportError,
                "connection lost",
            ));
        }
        // Round-trip through JSON like a real connection would.
        let request: Request =
            serde_json::from_str(&serde_json::to_string(&request).expect("serialize"))
                .expect("deserialize");
        self.handle_stream(request)
            .map_err(|err| LibsqlError::from_server(err.message, err.code.as_deref()))
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    async fn close(&self) {
        self.drop_connection();
    }
}

fn bad_request(message: &str) -> ProtoError {
    ProtoError {
        message: message.to_owned(),
        code: Some("BAD_REQUEST".into()),
    }
}

fn stream_not_found() -> ProtoError {
    ProtoError {
        message: "stream not found".into(),
        code: Some("STREAM_NOT_FOUND".into()),
    }
}

fn sql_error(err: &rusqlite::Error) -> ProtoError {
    let code = match err.sqlite_error_code() {
        Some(rusqlite::ErrorCode::ConstraintViolation) => "SQLITE_CONSTRAINT",
        Some(rusqlite::ErrorCode::DatabaseBusy) => "SQLITE_BUSY",
        _ => "SQLITE_ERROR",
    };
    ProtoError {
        message: err.to_string(),
        code: Some(code.into()),
    }
}

fn to_sql(value: &ProtoValue) -> SqlValue {
    match codec::from_wire(value.clone(), IntMode::Integer).expect("valid wire value") {
        Value::Null => SqlValue::Null,
        Value::Integer(i) => SqlValue::Integer(i),
        Value::Real(f) => SqlValue::Real(f),
        Value::Text(s) => SqlValue::Text(s),
        Value::Blob(b) => SqlValue::Blob(b),
    }
}

fn from_sql(value: ValueRef<'_>) -> ProtoValue {
    let value = match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    };
    codec::to_proto(&value)
}

fn execute(conn: &Connection, stmt: &Stmt) -> Result<StmtResult, ProtoError> {
    // Read-only transactions are a server feature; sqlite itself only knows DEFERRED.
    let sql = if stmt.sql == "BEGIN TRANSACTION READONLY" {
        "BEGIN DEFERRED"
    } else {
        stmt.sql.as_str()
    };
    let mut prepared = conn.prepare(sql).map_err(|e| sql_error(&e))?;

    for (i, arg) in stmt.args.iter().enumerate() {
        prepared
            .raw_bind_parameter(i + 1, to_sql(arg))
            .map_err(|e| sql_error(&e))?;
    }
    for arg in &stmt.named_args {
        if let Some(idx) = prepared
            .parameter_index(&arg.name)
            .map_err(|e| sql_error(&e))?
        {
            prepared
                .raw_bind_parameter(idx, to_sql(&arg.value))
                .map_err(|e| sql_error(&e))?;
        }
    }

    let cols: Vec<Col> = prepared
        .column_names()
        .into_iter()
        .map(|name| Col {
            name: Some(name.to_owned()),
            decltype: None,
        })
        .collect();
    let readonly = prepared.readonly();

    let mut rows = Vec::new();
    let mut cursor = prepared.raw_query();
    while let Some(row) = cursor.next().map_err(|e| sql_error(&e))? {
        let mut cells = Vec::with_capacity(cols.len());
        for i in 0..cols.len() {
            cells.push(from_sql(row.get_ref(i).map_err(|e| sql_error(&e))?));
        }
        rows.push(cells);
    }
    drop(cursor);

    Ok(StmtResult {
        cols,
        rows: if stmt.want_rows { rows } else { Vec::new() },
        affected_row_count: if readonly { 0 } else { conn.changes() },
        last_insert_rowid: Some(conn.last_insert_rowid().to_string()),
    })
}

fn holds(cond: &Condition, result: &BatchResult) -> bool {
    let step = |s: &u32| *s as usize;
    match cond {
        Condition::Ok { step: s } => matches!(result.step_results.get(step(s)), Some(Some(_))),
        Condition::Error { step: s } => matches!(result.step_errors.get(step(s)), Some(Some(_))),
        Condition::Not { cond } => !holds(cond, result),
        Condition::And { conds } => conds.iter().all(|c| holds(c, result)),
        Condition::Or { conds } => conds.iter().any(|c| holds(c, result)),
    }
}

fn run_batch(conn: &Connection, batch: &Batch) -> BatchResult {
    let mut result = BatchResult::default();
    for step in &batch.steps {
        let runs = step.condition.as_ref().is_none_or(|c| holds(c, &result));
        if !runs {
            result.step_results.push(None);
            result.step_errors.push(None);
            continue;
        }
        match execute(conn, &step.stmt) {
            Ok(r) => {
                result.step_results.push(Some(r));
                result.step_errors.push(None);
            }
            Err(e) => {
                result.step_results.push(None);
                result.step_errors.push(Some(e));
            }
        }
    }
    result
}

/// Wraps a [`FakeServer`] and closes the client from inside the round trip that carries
/// `sql`, after the server has answered it. Models `close()` racing an in-flight call.
pub struct CloseDuringCall {
    server: Arc<FakeServer>,
    sql: String,
    client: std::sync::OnceLock<Client>,
}

impl CloseDuringCall {
    fn wrap(server: &Arc<FakeServer>, sql: &str) -> Arc<Self> {
        Arc::new(Self {
            server: server.clone(),
            sql: sql.to_owned(),
            client: std::sync::OnceLock::new(),
        })
    }

    pub fn http(server: &Arc<FakeServer>, sql: &str) -> Client {
        let wrapper = Self::wrap(server, sql);
        let client = Client::from_http(wrapper.clone(), IntMode::Integer);
        let _ = wrapper.client.set(client.clone());
        client
    }

    pub fn ws(server: &Arc<FakeServer>, sql: &str) -> Client {
        let wrapper = Self::wrap(server, sql);
        let client = Client::from_ws(wrapper.clone(), IntMode::Integer);
        let _ = wrapper.client.set(client.clone());
        client
    }

    async fn close_client(&self) {
        if let Some(client) = self.client.get() {
            client.close().await;
        }
    }

    fn carries_sql(&self, request: &Request) -> bool {
        match request {
            Request::Execute { stmt, .. } => stmt.sql == self.sql,
            Request::Batch { batch, .. } => batch.steps.iter().any(|s| s.stmt.sql == self.sql),
            Request::OpenStream { .. } | Request::CloseStream { .. } => false,
        }
    }
}

#[async_trait]
impl HttpTransport for CloseDuringCall {
    async fn post(&self, path: &str, body: String) -> Result<HttpResponse, LibsqlError> {
        let hit = body.contains(&self.sql);
        let response = self.server.post(path, body).await?;
        if hit {
            self.close_client().await;
        }
        Ok(response)
    }
}

#[async_trait]
impl StreamTransport for CloseDuringCall {
    async fn request(&self, request: Request) -> Result<Response, LibsqlError> {
        let hit = self.carries_sql(&request);
        let response = self.server.request(request).await;
        if hit {
            self.close_client().await;
        }
        response
    }

    fn is_closed(&self) -> bool {
        StreamTransport::is_closed(self.server.as_ref())
    }

    async fn close(&self) {
        StreamTransport::close(self.server.as_ref()).await;
    }
}
