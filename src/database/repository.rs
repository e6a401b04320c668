//! Owner-scoped access to events and memories.
//!
//! A repository is bound to the session user at construction and every
//! statement it builds starts with `user_id = owner`. Handlers never build
//! store queries themselves.

use chrono::Utc;
use uuid::Uuid;

use crate::database::models::{Event, Memory, MemoryFields, NewEvent};
use crate::database::query_builder::{DeleteQuery, QueryBuilder, SelectQuery, UpdateQuery};
use crate::database::store::{decode_row, Store, StoreError};
use crate::filter::SortDirection;
use crate::types::{Row, Table, UserId};

pub const OWNER_COLUMN: &str = "user_id";

/// Row window for list operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Page {
    /// Inclusive `[offset, offset + limit - 1]`.
    pub fn range(&self) -> (i64, i64) {
        (self.offset, self.offset.saturating_add(self.limit - 1))
    }
}

struct OwnerScope<'s> {
    store: &'s dyn Store,
    owner: UserId,
}

impl<'s> OwnerScope<'s> {
    fn select(&self, table: Table) -> SelectQuery<'s> {
        QueryBuilder::new(self.store, table).select().eq(OWNER_COLUMN, self.owner)
    }

    fn update(&self, table: Table, changes: Row) -> UpdateQuery<'s> {
        QueryBuilder::new(self.store, table).update(changes).eq(OWNER_COLUMN, self.owner)
    }

    fn delete(&self, table: Table) -> DeleteQuery<'s> {
        QueryBuilder::new(self.store, table).delete().eq(OWNER_COLUMN, self.owner)
    }
}

pub struct EventRepository<'s> {
    scope: OwnerScope<'s>,
}

impl<'s> EventRepository<'s> {
    pub fn new(store: &'s dyn Store, owner: UserId) -> Self {
        Self { scope: OwnerScope { store, owner } }
    }

    pub async fn create(&self, event: NewEvent) -> Result<Event, StoreError> {
        let row = event.into_row(self.scope.owner, Utc::now());
        let inserted = QueryBuilder::new(self.scope.store, Table::Events)
            .insert(row)
            .single()
            .await?;
        decode_row(inserted)
    }

    /// Newest first.
    pub async fn list(&self, kind: Option<&str>, page: Page) -> Result<Vec<Event>, StoreError> {
        let mut query = self.scope.select(Table::Events);
        if let Some(kind) = kind {
            query = query.eq("kind", kind);
        }
        let (from, to) = page.range();
        query
            .order("ts", SortDirection::Desc)
            .range(from, to)
            .fetch_all()
            .await?
            .into_iter()
            .map(decode_row)
            .collect()
    }
}

pub struct MemoryRepository<'s> {
    scope: OwnerScope<'s>,
}

impl<'s> MemoryRepository<'s> {
    pub fn new(store: &'s dyn Store, owner: UserId) -> Self {
        Self { scope: OwnerScope { store, owner } }
    }

    pub async fn create(&self, fields: &MemoryFields) -> Result<Memory, StoreError> {
        let inserted = QueryBuilder::new(self.scope.store, Table::Memories)
            .insert(fields.to_owned_row(self.scope.owner))
            .single()
            .await?;
        decode_row(inserted)
    }

    /// Newest first.
    pub async fn list(&self, page: Page) -> Result<Vec<Memory>, StoreError> {
        let (from, to) = page.range();
        self.scope
            .select(Table::Memories)
            .order("created_at", SortDirection::Desc)
            .range(from, to)
            .fetch_all()
            .await?
            .into_iter()
            .map(decode_row)
            .collect()
    }

    /// Replaces the writable fields. A missing row, or one owned by someone
    /// else, is `StoreError::RowCount`.
    pub async fn update(&self, id: Uuid, fields: &MemoryFields) -> Result<Memory, StoreError> {
        let updated = self
            .scope
            .update(Table::Memories, fields.to_row())
            .eq("id", id)
            .single()
            .await?;
        decode_row(updated)
    }

    /// Returns how many rows were removed (0 or 1).
    pub async fn delete(&self, id: Uuid) -> Result<u64, StoreError> {
        self.scope.delete(Table::Memories).eq("id", id).execute().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryStore;
    use serde_json::{json, Map};

    fn user() -> UserId {
        UserId::new(Uuid::new_v4())
    }

    fn fields(content: &str) -> MemoryFields {
        MemoryFields { memory_type: Some("fact".into()), content: content.into(), importance: Some(2), pii: Some(false) }
    }

    #[test]
    fn page_range_is_inclusive() {
        assert_eq!(Page { limit: 50, offset: 0 }.range(), (0, 49));
        assert_eq!(Page { limit: 2, offset: 4 }.range(), (4, 5));
        assert_eq!(Page { limit: 50, offset: i64::MAX }.range(), (i64::MAX, i64::MAX));
    }

    #[tokio::test]
    async fn events_are_listed_per_owner_newest_first() {
        let store = MemoryStore::new();
        let (me, other) = (user(), user());
        store
            .seed(Table::Events, vec![
                json!({ "user_id": me.to_string(), "kind": "click", "payload": {}, "ts": "2024-01-01T00:00:00Z" }),
                json!({ "user_id": other.to_string(), "kind": "click", "payload": {}, "ts": "2024-01-02T00:00:00Z" }),
                json!({ "user_id": me.to_string(), "kind": "view", "payload": {}, "ts": "2024-01-03T00:00:00Z" }),
            ]
            .into_iter()
            .map(|v| v.as_object().unwrap().clone())
            .collect())
            .await;

        let repo = EventRepository::new(&store, me);
        let all = repo.list(None, Page { limit: 50, offset: 0 }).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, "view");
        assert!(all.iter().all(|e| e.user_id == me));

        let clicks = repo.list(Some("click"), Page { limit: 50, offset: 0 }).await.unwrap();
        assert_eq!(clicks.len(), 1);
    }

    #[tokio::test]
    async fn create_event_uses_owner() {
        let store = MemoryStore::new();
        let me = user();
        let mut payload = Map::new();
        payload.insert("x".into(), json!(1));
        let event = EventRepository::new(&store, me)
            .create(NewEvent { kind: "click".into(), payload, site: None, provider: None })
            .await
            .unwrap();
        assert_eq!(event.user_id, me);
        assert_eq!(event.payload["x"], 1);
    }

    #[tokio::test]
    async fn memory_update_is_owner_scoped() {
        let store = MemoryStore::new();
        let (owner, intruder) = (user(), user());
        let created = MemoryRepository::new(&store, owner).create(&fields("original")).await.unwrap();

        let err = MemoryRepository::new(&store, intruder)
            .update(created.id, &fields("stolen"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::RowCount { count: 0, .. }));

        let rows = store.rows(Table::Memories).await;
        assert_eq!(rows[0]["content"], "original");

        let updated = MemoryRepository::new(&store, owner).update(created.id, &fields("edited")).await.unwrap();
        assert_eq!(updated.content, "edited");
        assert_eq!(updated.id, created.id);
    }

    #[tokio::test]
    async fn memory_delete_is_owner_scoped() {
        let store = MemoryStore::new();
        let (owner, intruder) = (user(), user());
        let created = MemoryRepository::new(&store, owner).create(&fields("keep")).await.unwrap();

        assert_eq!(MemoryRepository::new(&store, intruder).delete(created.id).await.unwrap(), 0);
        assert_eq!(MemoryRepository::new(&store, owner).delete(created.id).await.unwrap(), 1);
    }
}
