//! In-process document store with optional JSON snapshot persistence.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::{Timestamp, Uuid};

use crate::{DbError, Document, DocumentStore, Filter, FindOptions, ID_FIELD};

type Collections = BTreeMap<String, Vec<Document>>;

/// Document store keeping every collection in memory.
///
/// When built with [`MemoryStore::with_snapshot`], the full contents are
/// rewritten to the snapshot file after each successful mutation and read
/// back on the next start.
pub struct MemoryStore {
    collections: RwLock<Collections>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(Collections::new()),
            snapshot: None,
        }
    }

    /// Load `path` if it exists and persist every later mutation to it.
    pub async fn with_snapshot(path: impl Into<PathBuf>) -> Result<Self, DbError> {
        let path = path.into();
        let collections = load_snapshot(&path).await?;

        tracing::info!(
            target: "shelf-db",
            path = %path.display(),
            collections = collections.len(),
            "snapshot loaded"
        );

        Ok(Self {
            collections: RwLock::new(collections),
            snapshot: Some(path),
        })
    }

    async fn persist(&self, collections: &Collections) -> Result<(), DbError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let bytes = serde_json::to_vec_pretty(collections)?;
        let io_err = |source| DbError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        // Readers must never observe a partially written snapshot.
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, path).await.map_err(io_err)?;

        tracing::debug!(target: "shelf-db", path = %path.display(), "snapshot written");
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn load_snapshot(path: &Path) -> Result<Collections, DbError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| DbError::Corrupt {
            path: path.display().to_string(),
            source,
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Collections::new()),
        Err(source) => Err(DbError::Io {
            path: path.display().to_string(),
            source,
        }),
    }
}

fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

fn new_id() -> String {
    Uuid::new_v7(Timestamp::now(uuid::NoContext)).to_string()
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &str, mut doc: Document) -> Result<Document, DbError> {
        doc.insert(ID_FIELD.to_string(), Value::String(new_id()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(doc.clone());

        if let Err(err) = self.persist(&collections).await {
            // Keep memory and snapshot in step.
            if let Some(docs) = collections.get_mut(collection) {
                docs.pop();
            }
            return Err(err);
        }

        Ok(doc)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DbError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        let selected = docs
            .iter()
            .filter(|doc| filter.matches(doc))
            .skip(options.skip);

        let found: Vec<Document> = match options.limit {
            Some(limit) => selected.take(limit).cloned().collect(),
            None => selected.cloned().collect(),
        };

        Ok(found)
    }

    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, DbError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|doc| filter.matches(doc)).count())
            .unwrap_or(0))
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut changes: Document,
    ) -> Result<Option<Document>, DbError> {
        changes.remove(ID_FIELD);

        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id)))
        else {
            return Ok(None);
        };

        let previous = doc.clone();
        doc.extend(changes);
        let updated = doc.clone();

        if let Err(err) = self.persist(&collections).await {
            if let Some(doc) = collections
                .get_mut(collection)
                .and_then(|docs| docs.iter_mut().find(|doc| document_id(doc) == Some(id)))
            {
                *doc = previous;
            }
            return Err(err);
        }

        Ok(Some(updated))
    }

    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, DbError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(position) = docs.iter().position(|doc| document_id(doc) == Some(id)) else {
            return Ok(false);
        };

        let removed = docs.remove(position);

        if let Err(err) = self.persist(&collections).await {
            if let Some(docs) = collections.get_mut(collection) {
                docs.insert(position, removed);
            }
            return Err(err);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashSet;

    const BOOKS: &str = "books";

    fn doc(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn name(doc: &Document) -> &str {
        doc["name"].as_str().unwrap()
    }

    fn temp_snapshot() -> PathBuf {
        std::env::temp_dir().join(format!("shelf-db-{}.json", Uuid::new_v4()))
    }

    async fn seeded(names: &[&str]) -> MemoryStore {
        let store = MemoryStore::new();
        for n in names {
            store.insert(BOOKS, doc(json!({ "name": n }))).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn insert_assigns_unique_ids() {
        let store = MemoryStore::new();
        let mut ids = HashSet::new();
        for i in 0..50 {
            let stored = store
                .insert(BOOKS, doc(json!({ "name": format!("book {i}") })))
                .await
                .unwrap();
            assert!(ids.insert(document_id(&stored).unwrap().to_string()));
        }
        assert_eq!(store.count(BOOKS, &Filter::All).await.unwrap(), 50);
    }

    #[tokio::test]
    async fn insert_replaces_caller_supplied_id() {
        let store = MemoryStore::new();
        let stored = store
            .insert(BOOKS, doc(json!({ "_id": "mine", "name": "x" })))
            .await
            .unwrap();
        assert_ne!(document_id(&stored), Some("mine"));
    }

    #[tokio::test]
    async fn find_keeps_insertion_order_and_windows() {
        let store = seeded(&["a", "b", "c", "d", "e"]).await;

        let all = store
            .find(BOOKS, &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(all.iter().map(name).collect::<Vec<_>>(), ["a", "b", "c", "d", "e"]);

        let page = store
            .find(BOOKS, &Filter::All, FindOptions::page(2, 2))
            .await
            .unwrap();
        assert_eq!(page.iter().map(name).collect::<Vec<_>>(), ["c", "d"]);

        let past_end = store
            .find(BOOKS, &Filter::All, FindOptions::page(10, 2))
            .await
            .unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn find_on_unknown_collection_is_empty() {
        let store = MemoryStore::new();
        let found = store
            .find("nothing", &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn count_applies_filter() {
        let store = seeded(&["Dune", "Dune Messiah", "Emma"]).await;
        let filter = Filter::contains("name", "dune");
        assert_eq!(store.count(BOOKS, &filter).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn update_merges_fields_and_keeps_id() {
        let store = MemoryStore::new();
        let stored = store
            .insert(BOOKS, doc(json!({ "name": "Dune", "price": "10" })))
            .await
            .unwrap();
        let id = document_id(&stored).unwrap().to_string();

        let updated = store
            .update_by_id(BOOKS, &id, doc(json!({ "_id": "other", "price": "12" })))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(document_id(&updated), Some(id.as_str()));
        assert_eq!(updated["name"], "Dune");
        assert_eq!(updated["price"], "12");
    }

    #[tokio::test]
    async fn update_of_missing_id_changes_nothing() {
        let store = seeded(&["a"]).await;
        let before = store
            .find(BOOKS, &Filter::All, FindOptions::default())
            .await
            .unwrap();

        let result = store
            .update_by_id(BOOKS, "missing", doc(json!({ "name": "b" })))
            .await
            .unwrap();

        assert!(result.is_none());
        let after = store
            .find(BOOKS, &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn delete_removes_exactly_one_document() {
        let store = seeded(&["a", "b", "c"]).await;
        let docs = store
            .find(BOOKS, &Filter::All, FindOptions::default())
            .await
            .unwrap();
        let id = document_id(&docs[1]).unwrap().to_string();

        assert!(store.delete_by_id(BOOKS, &id).await.unwrap());
        assert!(!store.delete_by_id(BOOKS, &id).await.unwrap());

        let rest = store
            .find(BOOKS, &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(rest.iter().map(name).collect::<Vec<_>>(), ["a", "c"]);
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let path = temp_snapshot();

        {
            let store = MemoryStore::with_snapshot(&path).await.unwrap();
            store.insert(BOOKS, doc(json!({ "name": "first" }))).await.unwrap();
            let second = store
                .insert(BOOKS, doc(json!({ "name": "second" })))
                .await
                .unwrap();
            store.insert(BOOKS, doc(json!({ "name": "third" }))).await.unwrap();
            store
                .delete_by_id(BOOKS, document_id(&second).unwrap())
                .await
                .unwrap();
        }

        let reopened = MemoryStore::with_snapshot(&path).await.unwrap();
        let docs = reopened
            .find(BOOKS, &Filter::All, FindOptions::default())
            .await
            .unwrap();
        assert_eq!(docs.iter().map(name).collect::<Vec<_>>(), ["first", "third"]);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_reported() {
        let path = temp_snapshot();
        tokio::fs::write(&path, b"not json").await.unwrap();

        let result = MemoryStore::with_snapshot(&path).await;
        assert!(matches!(result, Err(DbError::Corrupt { .. })));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}
