use std::collections::HashMap;

use crate::codec;
use crate::error::{ErrorCode, LibsqlError};
use crate::proto;
use crate::translation::named_placeholders;
use crate::types::InValue;

/// Arguments bound to a statement. Positional and named arguments cannot be mixed.
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// Bound to `?` / `?N` placeholders in order
    Positional(Vec<InValue>),
    /// Bound by name to `:name`, `@name` or `$name`; the key is stored without its sigil
    Named(Vec<(String, InValue)>),
}

impl Default for Args {
    fn default() -> Self {
        Args::Positional(Vec::new())
    }
}

/// SQL text plus its arguments.
///
/// ```rust
/// use libsql_client::prelude::*;
///
/// let by_position = Statement::with_args("SELECT ?, ?", [InValue::Integer(1), "two".into()]);
/// let by_name = Statement::with_named("SELECT :id", [("id", InValue::Integer(1))]);
/// let bare: Statement = "SELECT 1".into();
/// # let _ = (by_position, by_name, bare);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Args,
}

impl Statement {
    #[must_use]
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Args::default(),
        }
    }

    #[must_use]
    pub fn with_args<I, V>(sql: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<InValue>,
    {
        Self {
            sql: sql.into(),
            args: Args::Positional(args.into_iter().map(Into::into).collect()),
        }
    }

    #[must_use]
    pub fn with_named<I, K, V>(sql: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<InValue>,
    {
        Self {
            sql: sql.into(),
            args: Args::Named(
                args.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Encode into the wire statement descriptor.
    ///
    /// Only the argument shape is validated here; SQL errors are reported by the server.
    ///
    /// # Errors
    ///
    /// `ARGS_INVALID` for an empty or repeated argument name, or any error from
    /// [`codec::to_wire`].
    pub fn to_proto(&self) -> Result<proto::Stmt, LibsqlError> {
        let mut stmt = proto::Stmt::bare(self.sql.clone());
        match &self.args {
            Args::Positional(values) => {
                stmt.args = values
                    .iter()
                    .map(|v| codec::to_wire(v).map(|w| codec::to_proto(&w)))
                    .collect::<Result<_, _>>()?;
            }
            Args::Named(pairs) => {
                stmt.named_args = self.bind_named(pairs)?;
            }
        }
        Ok(stmt)
    }

    fn bind_named(&self, pairs: &[(String, InValue)]) -> Result<Vec<proto::NamedArg>, LibsqlError> {
        let mut by_name: HashMap<&str, proto::ProtoValue> = HashMap::with_capacity(pairs.len());
        let mut order = Vec::with_capacity(pairs.len());
        for (key, value) in pairs {
            let name = strip_sigil(key);
            if name.is_empty() {
                return Err(LibsqlError::new(
                    ErrorCode::ArgsInvalid,
                    format!("Invalid argument name {key:?}"),
                ));
            }
            let encoded = codec::to_proto(&codec::to_wire(value)?);
            if by_name.insert(name, encoded).is_some() {
                return Err(LibsqlError::new(
                    ErrorCode::ArgsInvalid,
                    format!("Argument {name:?} is supplied more than once"),
                ));
            }
            order.push(name);
        }

        // One entry per spelling used in the SQL, so `:x`, `@x` and `$x` all see the same value.
        let mut named = Vec::with_capacity(pairs.len());
        let mut used = Vec::new();
        for placeholder in named_placeholders(&self.sql) {
            if let Some(value) = by_name.get(placeholder.name) {
                named.push(proto::NamedArg {
                    name: placeholder.full_name(),
                    value: value.clone(),
                });
                used.push(placeholder.name);
            }
        }
        for name in order {
            if !used.contains(&name)
                && let Some(value) = by_name.remove(name)
            {
                named.push(proto::NamedArg {
                    name: format!(":{name}"),
                    value,
                });
            }
        }
        Ok(named)
    }
}

/// Encode a list of statements, failing on the first bad one.
pub(crate) fn encode_all<I, S>(stmts: I) -> Result<Vec<proto::Stmt>, LibsqlError>
where
    I: IntoIterator<Item = S>,
    S: Into<Statement>,
{
    stmts.into_iter().map(|s| s.into().to_proto()).collect()
}

/// Split a script into bare statements.
pub(crate) fn encode_script(sql: &str) -> Vec<proto::Stmt> {
    crate::translation::split_statements(sql)
        .into_iter()
        .map(proto::Stmt::bare)
        .collect()
}

fn strip_sigil(key: &str) -> &str {
    key.strip_prefix([':', '@', '$']).unwrap_or(key)
}

impl From<&str> for Statement {
    fn from(sql: &str) -> Self {
        Statement::new(sql)
    }
}

impl From<String> for Statement {
    fn from(sql: String) -> Self {
        Statement::new(sql)
    }
}

impl From<&String> for Statement {
    fn from(sql: &String) -> Self {
        Statement::new(sql.as_str())
    }
}

impl<V: Into<InValue>> From<(&str, Vec<V>)> for Statement {
    fn from((sql, args): (&str, Vec<V>)) -> Self {
        Statement::with_args(sql, args)
    }
}

impl From<&Statement> for Statement {
    fn from(stmt: &Statement) -> Self {
        stmt.clone()
    }
}
