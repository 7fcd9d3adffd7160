//! In-process storage backend
//!
//! Tables are vectors of rows guarded per table by `DashMap` shards, so a
//! uniqueness check and the write that follows it happen under one lock.
//! Inserts fill `created_at`/`updated_at` when absent and updates stamp
//! `updated_at`, the way the database defaults and triggers do.

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{FilterCondition, Query, Row, StorageBackend, StorageError, StorageResult};

/// Storage operation, used for call counting and failure injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Select,
    Insert,
    Update,
    Delete,
}

/// Snapshot of how many times each operation was called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StorageCalls {
    pub select: u64,
    pub insert: u64,
    pub update: u64,
    pub delete: u64,
}

impl StorageCalls {
    /// Number of calls that could have changed data
    pub fn writes(&self) -> u64 {
        self.insert + self.update + self.delete
    }
}

#[derive(Default)]
struct Counters {
    select: AtomicU64,
    insert: AtomicU64,
    update: AtomicU64,
    delete: AtomicU64,
}

/// In-memory [`StorageBackend`]
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<DashMap<String, Vec<Row>>>,
    unique: Arc<DashMap<String, Vec<String>>>,
    failures: Arc<DashMap<StorageOp, StorageError>>,
    counters: Arc<Counters>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a unique column on `table`
    #[must_use]
    pub fn with_unique(self, table: &str, column: &str) -> Self {
        self.unique
            .entry(table.to_string())
            .or_default()
            .push(column.to_string());
        self
    }

    /// Make every subsequent call of `op` fail with `error`
    pub fn fail(&self, op: StorageOp, error: StorageError) {
        self.failures.insert(op, error);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    pub fn calls(&self) -> StorageCalls {
        StorageCalls {
            select: self.counters.select.load(Ordering::SeqCst),
            insert: self.counters.insert.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
        }
    }

    /// All rows of a table, bypassing counters and predicates
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    fn enter(&self, op: StorageOp) -> StorageResult<()> {
        let counter = match op {
            StorageOp::Select => &self.counters.select,
            StorageOp::Insert => &self.counters.insert,
            StorageOp::Update => &self.counters.update,
            StorageOp::Delete => &self.counters.delete,
        };
        counter.fetch_add(1, Ordering::SeqCst);

        match self.failures.get(&op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn unique_columns(&self, table: &str) -> Vec<String> {
        self.unique
            .get(table)
            .map(|cols| cols.clone())
            .unwrap_or_default()
    }

    /// Find a unique column of `candidate` already held by a row other than `skip`
    fn conflict(
        table: &str,
        columns: &[String],
        rows: &[Row],
        candidate: &Row,
        skip: &[usize],
    ) -> Option<StorageError> {
        columns.iter().find_map(|column| {
            let value = candidate.get(column).filter(|v| !v.is_null())?;
            let taken = rows
                .iter()
                .enumerate()
                .any(|(idx, row)| !skip.contains(&idx) && row.get(column) == Some(value));
            taken.then(|| {
                StorageError::unique_violation(
                    format!("{}_{}_key", table, column),
                    Some(display_value(value)),
                )
            })
        })
    }
}

fn now() -> Value {
    Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn select(&self, query: &Query) -> StorageResult<Vec<Row>> {
        self.enter(StorageOp::Select)?;

        let mut rows: Vec<Row> = self
            .tables
            .get(&query.table)
            .map(|rows| rows.iter().filter(|r| query.matches(r)).cloned().collect())
            .unwrap_or_default();
        rows.sort_by(|a, b| query.compare(a, b));
        Ok(rows)
    }

    async fn insert(&self, table: &str, mut row: Row) -> StorageResult<Row> {
        self.enter(StorageOp::Insert)?;

        for column in ["created_at", "updated_at"] {
            if row.get(column).map_or(true, Value::is_null) {
                row.insert(column.to_string(), now());
            }
        }

        let columns = self.unique_columns(table);
        let mut rows = self.tables.entry(table.to_string()).or_default();
        if let Some(err) = Self::conflict(table, &columns, &rows, &row, &[]) {
            return Err(err);
        }
        rows.push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        row: Row,
        filters: &[FilterCondition],
    ) -> StorageResult<Vec<Row>> {
        self.enter(StorageOp::Update)?;

        let columns = self.unique_columns(table);
        let mut rows = self.tables.entry(table.to_string()).or_default();
        let targets: Vec<usize> = rows
            .iter()
            .enumerate()
            .filter(|(_, r)| filters.iter().all(|f| f.matches(r)))
            .map(|(idx, _)| idx)
            .collect();

        let stamp = now();
        let mut staged = HashMap::with_capacity(targets.len());
        for &idx in &targets {
            let mut merged = rows[idx].clone();
            for (column, value) in &row {
                merged.insert(column.clone(), value.clone());
            }
            merged.insert("updated_at".to_string(), stamp.clone());
            if let Some(err) = Self::conflict(table, &columns, &rows, &merged, &targets) {
                return Err(err);
            }
            staged.insert(idx, merged);
        }

        let mut updated = Vec::with_capacity(staged.len());
        for idx in targets {
            if let Some(merged) = staged.remove(&idx) {
                rows[idx] = merged.clone();
                updated.push(merged);
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: &str, filters: &[FilterCondition]) -> StorageResult<u64> {
        self.enter(StorageOp::Delete)?;

        let Some(mut rows) = self.tables.get_mut(table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|r| !filters.iter().all(|f| f.matches(r)));
        Ok((before - rows.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{OrderDirection, StorageErrorKind};
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_insert_fills_timestamps_and_select_orders() {
        let storage = MemoryStorage::new();
        storage
            .insert("focus_areas", row(json!({"code": "b", "sort_order": 2})))
            .await
            .unwrap();
        let inserted = storage
            .insert("focus_areas", row(json!({"code": "a", "sort_order": 1})))
            .await
            .unwrap();
        assert!(inserted.get("created_at").is_some_and(Value::is_string));

        let rows = storage
            .select(&Query::table("focus_areas").order_by("sort_order", OrderDirection::Ascending))
            .await
            .unwrap();
        let codes: Vec<_> = rows.iter().map(|r| r["code"].clone()).collect();
        assert_eq!(codes, vec![json!("a"), json!("b")]);
        assert_eq!(storage.calls().insert, 2);
        assert_eq!(storage.calls().select, 1);
    }

    #[tokio::test]
    async fn test_unique_column_rejects_duplicate_insert() {
        let storage = MemoryStorage::new().with_unique("focus_areas", "code");
        storage
            .insert("focus_areas", row(json!({"id": "1", "code": "fa1"})))
            .await
            .unwrap();
        let err = storage
            .insert("focus_areas", row(json!({"id": "2", "code": "fa1"})))
            .await
            .unwrap_err();
        assert_eq!(
            err.kind,
            StorageErrorKind::UniqueViolation {
                constraint: "focus_areas_code_key".into(),
                value: Some("fa1".into()),
            }
        );
        assert_eq!(storage.rows("focus_areas").len(), 1);
    }

    #[tokio::test]
    async fn test_update_merges_columns_and_checks_uniqueness() {
        let storage = MemoryStorage::new().with_unique("t", "code");
        storage.insert("t", row(json!({"id": "1", "code": "a", "name": "A"}))).await.unwrap();
        storage.insert("t", row(json!({"id": "2", "code": "b", "name": "B"}))).await.unwrap();

        let updated = storage
            .update("t", row(json!({"name": "Renamed"})), &[FilterCondition::eq("id", "1")])
            .await
            .unwrap();
        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0]["name"], json!("Renamed"));
        assert_eq!(updated[0]["code"], json!("a"));

        let err = storage
            .update("t", row(json!({"code": "b"})), &[FilterCondition::eq("id", "1")])
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn test_delete_counts_removed_rows() {
        let storage = MemoryStorage::new();
        storage.insert("t", row(json!({"id": "1"}))).await.unwrap();
        storage.insert("t", row(json!({"id": "2"}))).await.unwrap();

        assert_eq!(storage.delete("t", &[FilterCondition::eq("id", "1")]).await.unwrap(), 1);
        assert_eq!(storage.delete("t", &[FilterCondition::eq("id", "9")]).await.unwrap(), 0);
        assert_eq!(storage.delete("missing", &[]).await.unwrap(), 0);
        assert_eq!(storage.rows("t").len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_counted_and_returned() {
        let storage = MemoryStorage::new();
        storage.fail(StorageOp::Select, StorageError::timeout("statement timeout"));

        let err = storage.select(&Query::table("t")).await.unwrap_err();
        assert_eq!(err.kind, StorageErrorKind::Timeout);
        assert_eq!(storage.calls().select, 1);

        storage.clear_failures();
        assert!(storage.select(&Query::table("t")).await.unwrap().is_empty());
    }
}
