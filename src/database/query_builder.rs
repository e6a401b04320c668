//! Fluent statements over a [`Store`], shaped like the hosted store's client:
//!
//! ```ignore
//! QueryBuilder::new(store, Table::Events).insert(row).single().await?;
//! QueryBuilder::new(store, Table::Events).select().eq("user_id", id).order("ts", Desc).range(0, 49).fetch_all().await?;
//! QueryBuilder::new(store, Table::Memories).update(changes).eq("id", id).eq("user_id", owner).single().await?;
//! QueryBuilder::new(store, Table::Memories).delete().eq("id", id).eq("user_id", owner).execute().await?;
//! ```

use tracing::debug;

use crate::database::store::{Store, StoreError};
use crate::filter::{Filter, SortDirection, SqlValue};
use crate::types::{Operation, Row, Table};

pub struct QueryBuilder<'s> {
    store: &'s dyn Store,
    table: Table,
}

impl<'s> QueryBuilder<'s> {
    pub fn new(store: &'s dyn Store, table: Table) -> Self {
        Self { store, table }
    }

    pub fn select(self) -> SelectQuery<'s> {
        SelectQuery { store: self.store, table: self.table, filter: Filter::new() }
    }

    pub fn insert(self, row: Row) -> InsertQuery<'s> {
        InsertQuery { store: self.store, table: self.table, row }
    }

    pub fn update(self, changes: Row) -> UpdateQuery<'s> {
        UpdateQuery { store: self.store, table: self.table, changes, filter: Filter::new() }
    }

    pub fn delete(self) -> DeleteQuery<'s> {
        DeleteQuery { store: self.store, table: self.table, filter: Filter::new() }
    }
}

pub struct SelectQuery<'s> {
    store: &'s dyn Store,
    table: Table,
    filter: Filter,
}

impl<'s> SelectQuery<'s> {
    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    pub fn order(mut self, column: &'static str, sort: SortDirection) -> Self {
        self.filter = self.filter.order(column, sort);
        self
    }

    /// Inclusive `[from, to]`.
    pub fn range(mut self, from: i64, to: i64) -> Self {
        self.filter = self.filter.range(from, to);
        self
    }

    pub async fn fetch_all(self) -> Result<Vec<Row>, StoreError> {
        debug!("{} {} via {}: {:?}", Operation::Select, self.table, self.store.backend(), self.filter);
        self.store.select(self.table, &self.filter).await
    }
}

pub struct InsertQuery<'s> {
    store: &'s dyn Store,
    table: Table,
    row: Row,
}

impl<'s> InsertQuery<'s> {
    pub async fn single(self) -> Result<Row, StoreError> {
        debug!("{} {} via {}", Operation::Insert, self.table, self.store.backend());
        let rows = self.store.insert(self.table, self.row).await?;
        exactly_one(rows, self.table, Operation::Insert)
    }
}

pub struct UpdateQuery<'s> {
    store: &'s dyn Store,
    table: Table,
    changes: Row,
    filter: Filter,
}

impl<'s> UpdateQuery<'s> {
    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    /// Runs the update and expects exactly one affected row; zero rows is an error.
    pub async fn single(self) -> Result<Row, StoreError> {
        let table = self.table;
        let rows = self.execute().await?;
        exactly_one(rows, table, Operation::Update)
    }

    pub async fn execute(self) -> Result<Vec<Row>, StoreError> {
        if self.filter.conditions().is_empty() {
            return Err(StoreError::Unfiltered { table: self.table, operation: Operation::Update });
        }
        debug!("{} {} via {}: {:?}", Operation::Update, self.table, self.store.backend(), self.filter);
        self.store.update(self.table, self.changes, &self.filter).await
    }
}

pub struct DeleteQuery<'s> {
    store: &'s dyn Store,
    table: Table,
    filter: Filter,
}

impl<'s> DeleteQuery<'s> {
    pub fn eq(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        self.filter = self.filter.eq(column, value);
        self
    }

    pub async fn execute(self) -> Result<u64, StoreError> {
        if self.filter.conditions().is_empty() {
            return Err(StoreError::Unfiltered { table: self.table, operation: Operation::Delete });
        }
        debug!("{} {} via {}: {:?}", Operation::Delete, self.table, self.store.backend(), self.filter);
        self.store.delete(self.table, &self.filter).await
    }
}

fn exactly_one(mut rows: Vec<Row>, table: Table, operation: Operation) -> Result<Row, StoreError> {
    if rows.len() == 1 {
        if let Some(row) = rows.pop() {
            return Ok(row);
        }
    }
    Err(StoreError::RowCount { table, operation, count: rows.len() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use serde_json::json;

    fn row(v: serde_json::Value) -> Row {
        v.as_object().unwrap().clone()
    }

    #[tokio::test]
    async fn unfiltered_mutations_are_refused() {
        let store = MemoryStore::new();
        let err = QueryBuilder::new(&store, Table::Memories).delete().execute().await.unwrap_err();
        assert!(matches!(err, StoreError::Unfiltered { operation: Operation::Delete, .. }));

        let err = QueryBuilder::new(&store, Table::Memories)
            .update(row(json!({ "content": "x" })))
            .single()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unfiltered { operation: Operation::Update, .. }));
        assert_eq!(store.calls().total(), 0);
    }

    #[tokio::test]
    async fn single_update_with_no_match_is_row_count_error() {
        let store = MemoryStore::new();
        let err = QueryBuilder::new(&store, Table::Memories)
            .update(row(json!({ "content": "x" })))
            .eq("id", "missing")
            .single()
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowCount { count: 0, .. }));
    }

    #[tokio::test]
    async fn insert_then_select() {
        let store = MemoryStore::new();
        let inserted = QueryBuilder::new(&store, Table::Events)
            .insert(row(json!({ "user_id": "u1", "kind": "click", "payload": {} })))
            .single()
            .await
            .unwrap();
        assert!(inserted.contains_key("id"));
        assert!(inserted.contains_key("ts"));

        let rows = QueryBuilder::new(&store, Table::Events)
            .select()
            .eq("user_id", "u1")
            .order("ts", SortDirection::Desc)
            .range(0, 9)
            .fetch_all()
            .await
            .unwrap();
        assert_eq!(rows, vec![inserted]);
    }
}
