//! PostgreSQL storage backend
//!
//! Predicates are evaluated against `to_jsonb(t)` so every [`FilterCondition`]
//! has one SQL rendering regardless of the column's native type; rows come back
//! as JSON objects the same way.

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::OnceLock;
use std::time::Duration;

use super::{
    FilterCondition, FilterOperator, Query, Row, StorageBackend, StorageError, StorageErrorKind,
    StorageResult,
};
use crate::config::DatabaseConfig;
use crate::error::{sanitize_url, Error, Result};

/// Create a PostgreSQL connection pool, retrying with exponential backoff
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut attempt = 0;
    let base_delay = Duration::from_secs(config.retry_delay_secs);

    loop {
        match try_create_pool(config).await {
            Ok(pool) => {
                if attempt > 0 {
                    tracing::info!(
                        attempts = attempt + 1,
                        "Database connection established after retry"
                    );
                } else {
                    tracing::info!(
                        max = config.max_connections,
                        min = config.min_connections,
                        "Database connection pool created"
                    );
                }
                return Ok(pool);
            }
            Err(e) => {
                attempt += 1;

                if attempt > config.max_retries {
                    tracing::error!(
                        attempts = config.max_retries + 1,
                        error = %e,
                        "Failed to connect to database"
                    );
                    return Err(e);
                }

                let delay = base_delay * 2_u32.pow(attempt.saturating_sub(1));
                tracing::warn!(
                    attempt,
                    error = %e,
                    ?delay,
                    "Database connection attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

async fn try_create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connection_timeout_secs))
        .connect(&config.url)
        .await
        .map_err(|e| {
            Error::Database(format!(
                "Failed to connect to '{}': {}",
                sanitize_url(&config.url),
                e
            ))
        })
}

/// [`StorageBackend`] over a `sqlx` Postgres pool
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch(&self, statement: Statement) -> StorageResult<Vec<Row>> {
        tracing::trace!(sql = %statement.sql, "executing statement");

        let mut query = sqlx::query_scalar::<_, Value>(&statement.sql);
        for bind in statement.binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Json(json) => query.bind(json),
            };
        }

        let values = query.fetch_all(&self.pool).await.map_err(map_sqlx_error)?;
        values
            .into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(StorageError::new(
                    StorageErrorKind::Serialization,
                    format!("expected a JSON object row, got {}", other),
                )),
            })
            .collect()
    }
}

#[async_trait]
impl StorageBackend for PgStorage {
    async fn select(&self, query: &Query) -> StorageResult<Vec<Row>> {
        self.fetch(build_select(query)?).await
    }

    async fn insert(&self, table: &str, row: Row) -> StorageResult<Row> {
        let mut rows = self.fetch(build_insert(table, row)?).await?;
        rows.pop()
            .ok_or_else(|| StorageError::query_failed("insert returned no row"))
    }

    async fn update(
        &self,
        table: &str,
        row: Row,
        filters: &[FilterCondition],
    ) -> StorageResult<Vec<Row>> {
        self.fetch(build_update(table, row, filters)?).await
    }

    async fn delete(&self, table: &str, filters: &[FilterCondition]) -> StorageResult<u64> {
        let statement = build_delete(table, filters)?;
        tracing::trace!(sql = %statement.sql, "executing statement");

        let mut query = sqlx::query(&statement.sql);
        for bind in statement.binds {
            query = match bind {
                Bind::Text(text) => query.bind(text),
                Bind::Json(json) => query.bind(json),
            };
        }
        let result = query.execute(&self.pool).await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

/// Translate a `sqlx` error into the storage taxonomy
fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    match &err {
        sqlx::Error::Database(db) => {
            let code = db.code().map(|c| c.into_owned());
            match code.as_deref() {
                Some("23505") => StorageError {
                    message: db.message().to_string(),
                    ..StorageError::unique_violation(db.constraint().unwrap_or("unique"), None)
                },
                Some("57014") => StorageError::timeout(db.message()).with_code("57014"),
                Some(code) => StorageError::query_failed(db.message()).with_code(code),
                None => StorageError::query_failed(db.message()),
            }
        }
        sqlx::Error::PoolTimedOut => StorageError::timeout(err.to_string()),
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
            StorageError::connection_failed(err.to_string())
        }
        sqlx::Error::Decode(_) | sqlx::Error::ColumnDecode { .. } => {
            StorageError::new(StorageErrorKind::Serialization, err.to_string())
        }
        _ => StorageError::query_failed(err.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Bind {
    Text(String),
    Json(Value),
}

#[derive(Debug, Default)]
struct Statement {
    sql: String,
    binds: Vec<Bind>,
}

impl Statement {
    fn push(&mut self, bind: Bind) -> String {
        self.binds.push(bind);
        format!("${}", self.binds.len())
    }

    fn push_where(&mut self, filters: &[FilterCondition]) -> StorageResult<()> {
        if filters.is_empty() {
            return Ok(());
        }
        let mut clauses = Vec::with_capacity(filters.len());
        for filter in filters {
            clauses.push(self.condition(filter)?);
        }
        self.sql.push_str(" WHERE ");
        self.sql.push_str(&clauses.join(" AND "));
        Ok(())
    }

    fn condition(&mut self, filter: &FilterCondition) -> StorageResult<String> {
        let column = format!("(to_jsonb(t) -> {})", self.push(Bind::Text(ident(&filter.field)?)));
        let not_null = format!("COALESCE({column}, 'null'::jsonb) <> 'null'::jsonb");

        Ok(match filter.operator {
            FilterOperator::IsNull => format!("COALESCE({column}, 'null'::jsonb) = 'null'::jsonb"),
            FilterOperator::IsNotNull => not_null,
            FilterOperator::Equal => {
                let value = self.push(Bind::Json(filter.value.to_json()));
                format!("{column} = {value}::jsonb")
            }
            FilterOperator::NotEqual => {
                let value = self.push(Bind::Json(filter.value.to_json()));
                format!("({not_null} AND {column} <> {value}::jsonb)")
            }
            FilterOperator::Contains => {
                let value = self.push(Bind::Json(as_array(filter.value.to_json())));
                format!("{column} @> {value}::jsonb")
            }
            FilterOperator::In => {
                let value = self.push(Bind::Json(as_array(filter.value.to_json())));
                format!("({not_null} AND {value}::jsonb @> jsonb_build_array({column}))")
            }
        })
    }
}

fn as_array(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        scalar => Value::Array(vec![scalar]),
    }
}

/// Accept only plain snake_case identifiers; they are spliced into SQL
fn ident(name: &str) -> StorageResult<String> {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    let valid = IDENT
        .get_or_init(|| Regex::new(r"^[a-z_][a-z0-9_]{0,62}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(name));

    if valid {
        Ok(name.to_string())
    } else {
        Err(StorageError::query_failed(format!("invalid identifier '{}'", name)))
    }
}

fn build_select(query: &Query) -> StorageResult<Statement> {
    let table = ident(&query.table)?;
    let mut statement = Statement {
        sql: format!("SELECT to_jsonb(t) FROM \"{table}\" AS t"),
        ..Default::default()
    };
    statement.push_where(&query.filters)?;

    if !query.order.is_empty() {
        let mut clauses = Vec::with_capacity(query.order.len());
        for clause in &query.order {
            clauses.push(format!(
                "t.\"{}\" {} NULLS LAST",
                ident(&clause.field)?,
                clause.direction.to_string().to_uppercase()
            ));
        }
        statement.sql.push_str(" ORDER BY ");
        statement.sql.push_str(&clauses.join(", "));
    }
    Ok(statement)
}

fn build_insert(table: &str, row: Row) -> StorageResult<Statement> {
    let table = ident(table)?;
    // Null columns are left out so column defaults apply
    let columns = row
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, _)| ident(k).map(|c| format!("\"{c}\"")))
        .collect::<StorageResult<Vec<_>>>()?
        .join(", ");

    let mut statement = Statement::default();
    let record = statement.push(Bind::Json(Value::Object(row)));
    statement.sql = format!(
        "INSERT INTO \"{table}\" AS t ({columns}) \
         SELECT {columns} FROM jsonb_populate_record(NULL::\"{table}\", {record}::jsonb) \
         RETURNING to_jsonb(t)"
    );
    Ok(statement)
}

fn build_update(table: &str, row: Row, filters: &[FilterCondition]) -> StorageResult<Statement> {
    let table = ident(table)?;
    let mut assignments = Vec::with_capacity(row.len());
    for (key, value) in &row {
        let column = ident(key)?;
        match key.as_str() {
            "updated_at" => assignments.push(format!("\"{column}\" = now()")),
            // Server-managed; a null here means the caller never loaded it
            "created_at" if value.is_null() => {}
            _ => assignments.push(format!("\"{column}\" = r.\"{column}\"")),
        }
    }
    let assignments = assignments.join(", ");
    if assignments.is_empty() {
        return Err(StorageError::query_failed("update with no columns"));
    }

    let mut statement = Statement::default();
    let record = statement.push(Bind::Json(Value::Object(row)));
    statement.sql = format!(
        "UPDATE \"{table}\" AS t SET {assignments} \
         FROM jsonb_populate_record(NULL::\"{table}\", {record}::jsonb) AS r"
    );
    statement.push_where(filters)?;
    statement.sql.push_str(" RETURNING to_jsonb(t)");
    Ok(statement)
}

fn build_delete(table: &str, filters: &[FilterCondition]) -> StorageResult<Statement> {
    let table = ident(table)?;
    let mut statement = Statement {
        sql: format!("DELETE FROM \"{table}\" AS t"),
        ..Default::default()
    };
    statement.push_where(filters)?;
    Ok(statement)
}
