//! `SQLite` [`Executor`] for section reads and writes.
//!
//! A lightweight backend for development and tests: a single connection,
//! shared behind a mutex.
//!
//! ```ignore
//! use section_query::SectionReader;
//! use section_query_sqlite::SqliteExecutor;
//!
//! // SQL_DATABASE=shop.db
//! let executor = SqliteExecutor::connect()?;
//! let reader = SectionReader::new(&registry, executor);
//! ```

#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::cast_precision_loss)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use parking_lot::Mutex;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params_from_iter};
use section_query::{DataType, Executor, Field, Query, Row};

/// Options used to connect to the `SQLite` database.
///
/// Loaded from environment variables by [`SqliteExecutor::connect`].
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database file or URI.
    #[env(from = "SQL_DATABASE", default = "file::memory:?cache=shared")]
    pub database: String,
}

/// Executes section queries on a `SQLite` connection.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    // rusqlite::Connection isn't `Sync`
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExecutor {
    /// Connect using [`ConnectOptions`] loaded from the environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the options cannot be loaded or the database
    /// cannot be opened.
    pub fn connect() -> Result<Self> {
        let options =
            ConnectOptions::from_env().finalize().context("issue loading connection options")?;
        Self::connect_with(&options)
    }

    /// Connect to `options.database`.
    ///
    /// # Errors
    ///
    /// Returns an error when the database cannot be opened.
    pub fn connect_with(options: &ConnectOptions) -> Result<Self> {
        tracing::debug!(database = %options.database, "opening SQLite database");
        let conn = Connection::open(&options.database).context("failed to open SQLite database")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a batch of unparameterized statements, e.g. schema setup.
    ///
    /// # Errors
    ///
    /// Returns an error when any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql).context("failed to execute batch")
    }
}

impl Executor for SqliteExecutor {
    fn query(&self, query: &Query) -> Result<Vec<Row>> {
        tracing::debug!(sql = %query.sql, params = query.params.len(), "executing query");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query.sql).context("failed to prepare statement")?;
        let params: Vec<Value> = query.params.iter().map(to_sqlite).collect();
        let names: Vec<String> = stmt.column_names().iter().map(ToString::to_string).collect();

        let mut rows =
            stmt.query(params_from_iter(params.iter())).context("failed to execute query")?;

        let mut result = Vec::new();
        while let Some(row) = rows.next().context("failed to fetch row")? {
            let mut fields = Vec::with_capacity(names.len());
            for (index, name) in names.iter().enumerate() {
                let value = row.get_ref(index).context("failed to get column value")?;
                fields.push(Field {
                    name: name.clone(),
                    value: from_sqlite(value)?,
                });
            }
            result.push(Row { fields });
        }

        Ok(result)
    }

    fn exec(&self, query: &Query) -> Result<u64> {
        tracing::debug!(sql = %query.sql, params = query.params.len(), "executing statement");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query.sql).context("failed to prepare statement")?;
        let params: Vec<Value> = query.params.iter().map(to_sqlite).collect();

        let affected =
            stmt.execute(params_from_iter(params.iter())).context("failed to execute statement")?;
        u64::try_from(affected).context("affected row count out of range")
    }
}

fn to_sqlite(value: &DataType) -> Value {
    match value {
        DataType::Boolean(Some(b)) => Value::Integer(i64::from(*b)),
        DataType::Int32(Some(i)) => Value::Integer(i64::from(*i)),
        DataType::Int64(Some(i)) => Value::Integer(*i),
        DataType::Uint32(Some(u)) => Value::Integer(i64::from(*u)),
        DataType::Uint64(Some(u)) => {
            i64::try_from(*u).map_or(Value::Real(*u as f64), Value::Integer)
        }
        DataType::Float(Some(f)) => Value::Real(f64::from(*f)),
        DataType::Double(Some(f)) => Value::Real(*f),
        DataType::Str(Some(s))
        | DataType::Date(Some(s))
        | DataType::Time(Some(s))
        | DataType::Timestamp(Some(s)) => Value::Text(s.clone()),
        DataType::Binary(Some(b)) => Value::Blob(b.clone()),
        // every None variant is NULL
        _ => Value::Null,
    }
}

fn from_sqlite(value: ValueRef<'_>) -> Result<DataType> {
    let data_type = match value {
        ValueRef::Null => DataType::Str(None),
        ValueRef::Integer(i) => DataType::Int64(Some(i)),
        ValueRef::Real(f) => DataType::Double(Some(f)),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            DataType::Str(Some(s.to_string()))
        }
        ValueRef::Blob(b) => DataType::Binary(Some(b.to_vec())),
    };
    Ok(data_type)
}
