use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::database::store::{Store, StoreError};
use crate::filter::Filter;
use crate::types::{Operation, Row, Table};

/// In-process tables with per-operation call counters.
///
/// Fills `id` and the table's timestamp column on insert, the way the hosted
/// store's column defaults do.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<Table, Vec<Row>>>,
    calls: CallCounters,
    unavailable: AtomicBool,
}

#[derive(Default)]
struct CallCounters {
    inserts: AtomicUsize,
    selects: AtomicUsize,
    updates: AtomicUsize,
    deletes: AtomicUsize,
}

/// Number of store operations received, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallSnapshot {
    pub inserts: usize,
    pub selects: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl CallSnapshot {
    pub fn total(&self) -> usize {
        self.inserts + self.selects + self.updates + self.deletes
    }

    pub fn mutations(&self) -> usize {
        self.inserts + self.updates + self.deletes
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds rows without counting a call; missing defaults are filled as on insert.
    pub async fn seed(&self, table: Table, rows: Vec<Row>) {
        let mut tables = self.tables.write().await;
        let entries = tables.entry(table).or_default();
        for row in rows {
            entries.push(with_defaults(table, row));
        }
    }

    /// Snapshot of a table, in insertion order.
    pub async fn rows(&self, table: Table) -> Vec<Row> {
        self.tables.read().await.get(&table).cloned().unwrap_or_default()
    }

    pub fn calls(&self) -> CallSnapshot {
        CallSnapshot {
            inserts: self.calls.inserts.load(Ordering::SeqCst),
            selects: self.calls.selects.load(Ordering::SeqCst),
            updates: self.calls.updates.load(Ordering::SeqCst),
            deletes: self.calls.deletes.load(Ordering::SeqCst),
        }
    }

    /// While set, every operation fails the way an unreachable store does.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self, table: Table, operation: Operation) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected {
                table,
                operation,
                status: 503,
                body: "memory store marked unavailable".to_string(),
            });
        }
        Ok(())
    }
}

fn with_defaults(table: Table, mut row: Row) -> Row {
    if !matches!(row.get("id"), Some(v) if !v.is_null()) {
        row.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    }
    let ts_column = table.timestamp_column();
    if !matches!(row.get(ts_column), Some(v) if !v.is_null()) {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        row.insert(ts_column.to_string(), Value::String(now));
    }
    row
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, table: Table, row: Row) -> Result<Vec<Row>, StoreError> {
        self.calls.inserts.fetch_add(1, Ordering::SeqCst);
        self.check_available(table, Operation::Insert)?;

        let row = with_defaults(table, row);
        self.tables.write().await.entry(table).or_default().push(row.clone());
        Ok(vec![row])
    }

    async fn select(&self, table: Table, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.calls.selects.fetch_add(1, Ordering::SeqCst);
        self.check_available(table, Operation::Select)?;

        let tables = self.tables.read().await;
        Ok(tables.get(&table).map(|rows| filter.apply(rows.iter())).unwrap_or_default())
    }

    async fn update(&self, table: Table, changes: Row, filter: &Filter) -> Result<Vec<Row>, StoreError> {
        self.calls.updates.fetch_add(1, Ordering::SeqCst);
        self.check_available(table, Operation::Update)?;

        let mut tables = self.tables.write().await;
        let mut updated = Vec::new();
        if let Some(rows) = tables.get_mut(&table) {
            for row in rows.iter_mut().filter(|r| filter.matches(r)) {
                for (column, value) in &changes {
                    row.insert(column.clone(), value.clone());
                }
                updated.push(row.clone());
            }
        }
        Ok(updated)
    }

    async fn delete(&self, table: Table, filter: &Filter) -> Result<u64, StoreError> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        self.check_available(table, Operation::Delete)?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(&table) else { return Ok(0) };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        Ok((before - rows.len()) as u64)
    }
}
