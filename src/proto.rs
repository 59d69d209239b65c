//! Serde model of the JSON messages exchanged with the server.
//!
//! Both transports share the statement, batch and result shapes; the stream messages are
//! only spoken over the stateful connection.

use serde::{Deserialize, Serialize};

/// A value as encoded on the wire. Integers travel as decimal strings and blobs as base64 so
/// that neither loses precision in JSON; [`crate::codec`] converts to and from [`crate::Value`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtoValue {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedArg {
    pub name: String,
    pub value: ProtoValue,
}

fn default_want_rows() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub sql: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ProtoValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub named_args: Vec<NamedArg>,
    #[serde(default = "default_want_rows")]
    pub want_rows: bool,
}

impl Stmt {
    /// A statement with no arguments.
    #[must_use]
    pub fn bare(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
            named_args: Vec::new(),
            want_rows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Col {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decltype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StmtResult {
    #[serde(default)]
    pub cols: Vec<Col>,
    #[serde(default)]
    pub rows: Vec<Vec<ProtoValue>>,
    #[serde(default)]
    pub affected_row_count: u64,
    #[serde(default)]
    pub last_insert_rowid: Option<String>,
}

/// Error body reported by the server, either for a whole request or for one batch step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtoError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// Boolean expression over the outcome of earlier batch steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Ok { step: u32 },
    Error { step: u32 },
    Not { cond: Box<Condition> },
    And { conds: Vec<Condition> },
    Or { conds: Vec<Condition> },
}

impl Condition {
    #[must_use]
    pub fn ok(step: u32) -> Self {
        Condition::Ok { step }
    }

    #[must_use]
    pub fn not(cond: Condition) -> Self {
        Condition::Not {
            cond: Box::new(cond),
        }
    }

    /// Highest step index this condition refers to.
    #[must_use]
    pub fn max_step(&self) -> Option<u32> {
        match self {
            Condition::Ok { step } | Condition::Error { step } => Some(*step),
            Condition::Not { cond } => cond.max_step(),
            Condition::And { conds } | Condition::Or { conds } => {
                conds.iter().filter_map(Condition::max_step).max()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStep {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    pub stmt: Stmt,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Batch {
    pub steps: Vec<BatchStep>,
}

/// Step-indexed outcome of a batch. A step that did not run has neither a result nor an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default)]
    pub step_results: Vec<Option<StmtResult>>,
    #[serde(default)]
    pub step_errors: Vec<Option<ProtoError>>,
}

// Stateless request/response bodies.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteReq {
    pub stmt: Stmt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResp {
    pub result: StmtResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReq {
    pub batch: Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResp {
    pub result: BatchResult,
}

// Stream messages.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    Hello {
        #[serde(default)]
        jwt: Option<String>,
    },
    Request {
        request_id: i64,
        request: Request,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    OpenStream { stream_id: i32 },
    CloseStream { stream_id: i32 },
    Execute { stream_id: i32, stmt: Stmt },
    Batch { stream_id: i32, batch: Batch },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    HelloOk,
    HelloError { error: ProtoError },
    ResponseOk { request_id: i64, response: Response },
    ResponseError { request_id: i64, error: ProtoError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    OpenStream,
    CloseStream,
    Execute { result: StmtResult },
    Batch { result: BatchResult },
}
