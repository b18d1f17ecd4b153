//! SQLite-backed store implementation
//!
//! A self-contained [`CollectionStore`] for tests and offline use. It
//! honors the same contract a hosted backend would: store-assigned ids
//! and stamps, atomic per-document mutations, and push snapshots fanned
//! out through watch channels (one per collection, latest wins).

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use tokio::sync::watch;
use tracing::instrument;

use super::document::{Document, DocumentId};
use super::error::StoreError;
use super::migrations;
use super::parse::{parse_datetime, parse_json};
use super::subscription::{OrderBy, Subscription};
use super::traits::CollectionStore;
use super::write::WriteOp;

/// Local document store over a single SQLite database.
#[derive(Clone)]
pub struct LocalStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    conn: Connection,
    last_stamp: DateTime<Utc>,
    channels: HashMap<String, watch::Sender<Arc<Vec<Document>>>>,
}

impl LocalStore {
    /// Open or create a store at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Open an in-memory store (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(Inner {
                conn,
                last_stamp: Utc::now(),
                channels: HashMap::new(),
            })),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))
    }
}

impl Inner {
    /// Next write stamp: wall clock, forced strictly past the previous
    /// stamp so insertion order is total within this store instance.
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let step = Duration::microseconds(1);
        let now = Utc::now().duration_trunc(step).unwrap_or(self.last_stamp);
        let stamp = if now > self.last_stamp {
            now
        } else {
            self.last_stamp + step
        };
        self.last_stamp = stamp;
        stamp
    }

    fn exists(&self, collection: &str, id: &DocumentId) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection, id.as_str()],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn read_doc(&self, collection: &str, id: &DocumentId) -> Result<Option<Document>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, updated_at, data FROM documents
             WHERE collection = ?1 AND id = ?2",
        )?;

        let doc = stmt
            .query_row(params![collection, id.as_str()], |row| {
                Ok(Document {
                    id: DocumentId::from(row.get::<_, String>(0)?),
                    created_at: parse_datetime(&row.get::<_, String>(1)?)?,
                    updated_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    data: parse_json(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(doc)
    }

    fn load_collection(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, updated_at, data FROM documents
             WHERE collection = ?1 ORDER BY id",
        )?;

        let docs = stmt
            .query_map(params![collection], |row| {
                Ok(Document {
                    id: DocumentId::from(row.get::<_, String>(0)?),
                    created_at: parse_datetime(&row.get::<_, String>(1)?)?,
                    updated_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    data: parse_json(&row.get::<_, String>(3)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(docs)
    }

    fn insert_doc(
        &mut self,
        collection: &str,
        id: &DocumentId,
        data: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let stamp = format_stamp(self.next_stamp());
        self.conn.execute(
            "INSERT INTO documents (collection, id, created_at, updated_at, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                collection,
                id.as_str(),
                stamp,
                stamp,
                Value::Object(data.clone()).to_string(),
            ],
        )?;
        Ok(())
    }

    fn rewrite_doc(
        &mut self,
        collection: &str,
        id: &DocumentId,
        data: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        let stamp = format_stamp(self.next_stamp());
        self.conn.execute(
            "UPDATE documents SET data = ?1, updated_at = ?2
             WHERE collection = ?3 AND id = ?4",
            params![
                Value::Object(data.clone()).to_string(),
                stamp,
                collection,
                id.as_str(),
            ],
        )?;
        Ok(())
    }

    /// Rebroadcast a collection's current contents to its listeners.
    fn publish(&self, collection: &str) -> Result<(), StoreError> {
        if let Some(tx) = self.channels.get(collection) {
            let docs = Arc::new(self.load_collection(collection)?);
            tx.send_replace(docs);
        }
        Ok(())
    }
}

fn format_stamp(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn require_object(data: Value) -> Result<Map<String, Value>, StoreError> {
    match data {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::NotAnObject),
    }
}

#[async_trait]
impl CollectionStore for LocalStore {
    #[instrument(skip(self, data))]
    async fn create(&self, collection: &str, data: Value) -> Result<DocumentId, StoreError> {
        let data = require_object(data)?;
        let mut inner = self.lock()?;

        let mut id = DocumentId::generate();
        while inner.exists(collection, &id)? {
            id = DocumentId::generate();
        }

        inner.insert_doc(collection, &id, &data)?;
        inner.publish(collection)?;
        Ok(id)
    }

    #[instrument(skip(self, data), fields(id = %id))]
    async fn set(
        &self,
        collection: &str,
        id: &DocumentId,
        data: Value,
        merge: bool,
    ) -> Result<(), StoreError> {
        let incoming = require_object(data)?;
        let mut inner = self.lock()?;

        match inner.read_doc(collection, id)? {
            Some(existing) => {
                let merged = if merge {
                    let mut base = require_object(existing.data)?;
                    for (key, value) in incoming {
                        base.insert(key, value);
                    }
                    base
                } else {
                    incoming
                };
                inner.rewrite_doc(collection, id, &merged)?;
            }
            None => inner.insert_doc(collection, id, &incoming)?,
        }

        inner.publish(collection)
    }

    #[instrument(skip(self, ops), fields(id = %id, ops = ops.len()))]
    async fn update(
        &self,
        collection: &str,
        id: &DocumentId,
        ops: Vec<WriteOp>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock()?;

        let doc = inner
            .read_doc(collection, id)?
            .ok_or_else(|| StoreError::MissingDocument {
                collection: collection.to_string(),
                id: id.to_string(),
            })?;

        let mut data = require_object(doc.data)?;
        for op in &ops {
            op.apply(&mut data)?;
        }

        inner.rewrite_doc(collection, id, &data)?;
        inner.publish(collection)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete(&self, collection: &str, id: &DocumentId) -> Result<(), StoreError> {
        let inner = self.lock()?;

        let removed = inner.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection, id.as_str()],
        )?;

        if removed > 0 {
            inner.publish(collection)?;
        }
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn get(
        &self,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let inner = self.lock()?;
        inner.read_doc(collection, id)
    }

    fn subscribe(&self, collection: &str, order: OrderBy) -> Result<Subscription, StoreError> {
        let mut inner = self.lock()?;

        let rx = match inner.channels.get(collection) {
            Some(tx) => tx.subscribe(),
            None => {
                let docs = Arc::new(inner.load_collection(collection)?);
                let (tx, rx) = watch::channel(docs);
                inner.channels.insert(collection.to_string(), tx);
                rx
            }
        };

        Ok(Subscription::new(rx, order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    use crate::store::subscription::FIELD_CREATED_AT;

    #[tokio::test]
    async fn test_create_assigns_id_and_stamps() {
        let store = LocalStore::open_in_memory().unwrap();

        let id = store
            .create("games", json!({ "title": "Friday 5v5" }))
            .await
            .unwrap();

        let doc = store.get("games", &id).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.field("title"), Some(&json!("Friday 5v5")));
        assert_eq!(doc.created_at, doc.updated_at);
    }

    #[tokio::test]
    async fn test_created_at_is_monotonic() {
        let store = LocalStore::open_in_memory().unwrap();

        let a = store.create("games", json!({})).await.unwrap();
        let b = store.create("games", json!({})).await.unwrap();
        let c = store.create("games", json!({})).await.unwrap();

        let doc_a = store.get("games", &a).await.unwrap().unwrap();
        let doc_b = store.get("games", &b).await.unwrap().unwrap();
        let doc_c = store.get("games", &c).await.unwrap().unwrap();

        assert!(doc_a.created_at < doc_b.created_at);
        assert!(doc_b.created_at < doc_c.created_at);
    }

    #[tokio::test]
    async fn test_create_rejects_non_object() {
        let store = LocalStore::open_in_memory().unwrap();

        let err = store.create("games", json!("scalar")).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject));
    }

    #[tokio::test]
    async fn test_set_merge_overlays_fields() {
        let store = LocalStore::open_in_memory().unwrap();
        let id = DocumentId::from("player-1");

        store
            .set(
                "players",
                &id,
                json!({ "displayName": "Alex", "email": "alex@example.com" }),
                true,
            )
            .await
            .unwrap();
        let first = store.get("players", &id).await.unwrap().unwrap();

        store
            .set("players", &id, json!({ "displayName": "Alexandra" }), true)
            .await
            .unwrap();
        let second = store.get("players", &id).await.unwrap().unwrap();

        assert_eq!(second.field("displayName"), Some(&json!("Alexandra")));
        assert_eq!(second.field("email"), Some(&json!("alex@example.com")));
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
    }

    #[tokio::test]
    async fn test_set_without_merge_replaces() {
        let store = LocalStore::open_in_memory().unwrap();
        let id = DocumentId::from("player-1");

        store
            .set("players", &id, json!({ "displayName": "Alex", "email": "a@x" }), false)
            .await
            .unwrap();
        store
            .set("players", &id, json!({ "displayName": "Alexandra" }), false)
            .await
            .unwrap();

        let doc = store.get("players", &id).await.unwrap().unwrap();
        assert_eq!(doc.field("email"), None);
    }

    #[tokio::test]
    async fn test_update_missing_document_fails() {
        let store = LocalStore::open_in_memory().unwrap();

        let err = store
            .update(
                "games",
                &DocumentId::from("ghost"),
                vec![WriteOp::set("title", json!("x"))],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::MissingDocument { .. }));
    }

    #[tokio::test]
    async fn test_update_applies_array_ops() {
        let store = LocalStore::open_in_memory().unwrap();
        let id = store
            .create("games", json!({ "participants": [{ "uid": "u1" }] }))
            .await
            .unwrap();

        store
            .update(
                "games",
                &id,
                vec![WriteOp::array_union("participants", json!({ "uid": "u2" }))],
            )
            .await
            .unwrap();
        store
            .update(
                "games",
                &id,
                vec![WriteOp::array_remove_by_key("participants", "uid", json!("u1"))],
            )
            .await
            .unwrap();

        let doc = store.get("games", &id).await.unwrap().unwrap();
        assert_eq!(doc.field("participants"), Some(&json!([{ "uid": "u2" }])));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = LocalStore::open_in_memory().unwrap();
        let id = store.create("games", json!({})).await.unwrap();

        store.delete("games", &id).await.unwrap();
        assert!(store.get("games", &id).await.unwrap().is_none());

        // Absent document is not an error
        store.delete("games", &id).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_delivers_initial_and_updates() {
        let store = LocalStore::open_in_memory().unwrap();
        store.create("games", json!({ "title": "a" })).await.unwrap();

        let mut sub = store
            .subscribe("games", OrderBy::descending(FIELD_CREATED_AT))
            .unwrap();
        let initial = sub.recv().await.unwrap();
        assert_eq!(initial.len(), 1);

        store.create("games", json!({ "title": "b" })).await.unwrap();
        let next = sub.recv().await.unwrap();
        assert_eq!(next.len(), 2);
        // Newest first per the declared order
        assert_eq!(next[0].field("title"), Some(&json!("b")));
    }

    #[tokio::test]
    async fn test_subscribe_sees_writes_from_clone() {
        let store = LocalStore::open_in_memory().unwrap();
        let writer = store.clone();

        let mut sub = store
            .subscribe("groups", OrderBy::descending(FIELD_CREATED_AT))
            .unwrap();
        assert!(sub.recv().await.unwrap().is_empty());

        writer
            .create("groups", json!({ "name": "Downtown FC" }))
            .await
            .unwrap();
        let snapshot = sub.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
    }

    #[tokio::test]
    async fn test_open_persists_to_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rondo.db");

        {
            let store = LocalStore::open(&path).unwrap();
            store
                .create("groups", json!({ "name": "Downtown FC" }))
                .await
                .unwrap();
        }

        let reopened = LocalStore::open(&path).unwrap();
        let mut sub = reopened
            .subscribe("groups", OrderBy::descending(FIELD_CREATED_AT))
            .unwrap();
        let snapshot = sub.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].field("name"), Some(&json!("Downtown FC")));
    }
}
