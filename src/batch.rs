//! Compiles statement lists into conditional step graphs.
//!
//! The stateless transport cannot keep a transaction open between requests, so an atomic batch
//! is sent as a single request whose steps carry their own dependencies:
//!
//! ```text
//! 0      BEGIN                      (unconditional)
//! 1..=n  statement i                if step i-1 succeeded
//! n+1    COMMIT                     if step n succeeded
//! n+2    ROLLBACK                   unless COMMIT succeeded
//! ```
//!
//! Every condition refers only to earlier steps, so the graph is acyclic and executes strictly in
//! order. The ROLLBACK step runs both when a statement fails (COMMIT is skipped) and when COMMIT
//! itself fails.

use crate::error::{ErrorCode, LibsqlError};
use crate::proto::{Batch, BatchResult, BatchStep, Condition, Stmt};
use crate::results::{ResultSet, build_result_set};
use crate::types::{IntMode, TransactionMode};

/// A compiled step graph plus the bookkeeping needed to read its result back.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledBatch {
    pub batch: Batch,
    /// Steps whose errors fail the batch, in scan order
    checked_steps: std::ops::Range<usize>,
    /// Step index of each input statement
    stmt_steps: Vec<usize>,
}

impl CompiledBatch {
    #[must_use]
    pub fn statement_steps(&self) -> &[usize] {
        &self.stmt_steps
    }

    #[must_use]
    pub fn step_count(&self) -> usize {
        self.batch.steps.len()
    }
}

fn step_index(idx: usize) -> Result<u32, LibsqlError> {
    u32::try_from(idx)
        .map_err(|_| LibsqlError::new(ErrorCode::ArgsInvalid, "Too many statements in one batch"))
}

/// Append `stmts` as a chain where each step runs only if the step before it succeeded.
fn push_chain(steps: &mut Vec<BatchStep>, stmts: Vec<Stmt>) -> Result<Vec<usize>, LibsqlError> {
    let mut stmt_steps = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        let condition = match steps.len() {
            0 => None,
            n => Some(Condition::ok(step_index(n - 1)?)),
        };
        stmt_steps.push(steps.len());
        steps.push(BatchStep { condition, stmt });
    }
    Ok(stmt_steps)
}

/// Compile an atomic batch: BEGIN, the statements, COMMIT and a guarding ROLLBACK.
///
/// # Errors
///
/// `ARGS_INVALID` if the step indices would not fit the wire format.
pub fn compile_transactional(
    mode: TransactionMode,
    stmts: Vec<Stmt>,
) -> Result<CompiledBatch, LibsqlError> {
    let mut steps = Vec::with_capacity(stmts.len() + 3);
    steps.push(BatchStep {
        condition: None,
        stmt: Stmt::bare(mode.begin_sql()),
    });

    let stmt_steps = push_chain(&mut steps, stmts)?;

    let commit_step = steps.len();
    steps.push(BatchStep {
        condition: Some(Condition::ok(step_index(commit_step - 1)?)),
        stmt: Stmt::bare("COMMIT"),
    });
    steps.push(BatchStep {
        condition: Some(Condition::not(Condition::ok(step_index(commit_step)?))),
        stmt: Stmt::bare("ROLLBACK"),
    });

    Ok(CompiledBatch {
        batch: Batch { steps },
        checked_steps: 0..commit_step + 1,
        stmt_steps,
    })
}

/// Compile a plain sequence: each statement runs only if the previous one succeeded, with no
/// transaction around them. Used inside interactive transactions and for scripts.
///
/// # Errors
///
/// `ARGS_INVALID` if the step indices would not fit the wire format.
pub fn compile_sequential(stmts: Vec<Stmt>) -> Result<CompiledBatch, LibsqlError> {
    let mut steps = Vec::with_capacity(stmts.len());
    let stmt_steps = push_chain(&mut steps, stmts)?;
    Ok(CompiledBatch {
        checked_steps: 0..steps.len(),
        batch: Batch { steps },
        stmt_steps,
    })
}

/// Turn the step-indexed result of a compiled batch into one result set per input statement.
///
/// # Errors
///
/// The first step error between the first step and COMMIT, in step order; `SERVER_ERROR` if the
/// server omitted the result of a statement step.
pub fn collect_results(
    compiled: &CompiledBatch,
    mut result: BatchResult,
    int_mode: IntMode,
) -> Result<Vec<ResultSet>, LibsqlError> {
    for step in compiled.checked_steps.clone() {
        if let Some(Some(err)) = result.step_errors.get(step) {
            tracing::warn!(step, "batch step failed: {}", err.message);
            return Err(LibsqlError::from_server(err.message.clone(), err.code.as_deref()));
        }
    }

    compiled
        .stmt_steps
        .iter()
        .enumerate()
        .map(|(i, &step)| {
            let step_result = result
                .step_results
                .get_mut(step)
                .and_then(Option::take)
                .ok_or_else(|| {
                    LibsqlError::new(
                        ErrorCode::ServerError,
                        format!("Server did not return a result for statement {i} in a batch"),
                    )
                })?;
            build_result_set(step_result, int_mode)
        })
        .collect()
}
