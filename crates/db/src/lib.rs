//! Document store used by SHELF modules.
//!
//! Documents are JSON objects grouped into named collections. The store
//! assigns every document an `_id` on insert and keeps documents in
//! insertion order, which is the natural order returned by [`DocumentStore::find`].

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub mod memory;

pub use memory::MemoryStore;

/// Key under which the store keeps a document's identifier.
pub const ID_FIELD: &str = "_id";

/// A stored document.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Shared handle to a store, cloned into modules.
pub type SharedStore = Arc<dyn DocumentStore>;

/// Errors raised by store backends
#[derive(Error, Debug)]
pub enum DbError {
    #[error("failed to access snapshot {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("snapshot {path} is corrupt: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode documents: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Which backend [`open`] should build.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Documents live in process memory only.
    #[default]
    Memory,
    /// Documents are kept in memory and written to a JSON snapshot after every mutation.
    File,
}

/// Selection applied by [`DocumentStore::find`] and [`DocumentStore::count`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    /// Case-insensitive substring match on a string field. An empty needle matches every document.
    Contains { field: String, needle: String },
}

impl Filter {
    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// Returns true when `doc` is selected by this filter.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Contains { needle, .. } if needle.is_empty() => true,
            Filter::Contains { field, needle } => doc
                .get(field)
                .and_then(|value| value.as_str())
                .map(|value| value.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
        }
    }
}

/// Skip/limit window applied after filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub skip: usize,
    pub limit: Option<usize>,
}

impl FindOptions {
    pub fn page(skip: usize, limit: usize) -> Self {
        Self {
            skip,
            limit: Some(limit),
        }
    }
}

/// Minimal document database contract.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert `doc` into `collection`, assigning a fresh id. Any `_id` in `doc` is replaced.
    async fn insert(&self, collection: &str, doc: Document) -> Result<Document, DbError>;

    /// Return the documents selected by `filter`, in natural order, windowed by `options`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        options: FindOptions,
    ) -> Result<Vec<Document>, DbError>;

    /// Count the documents selected by `filter`.
    async fn count(&self, collection: &str, filter: &Filter) -> Result<usize, DbError>;

    /// Overwrite the given fields of the document with `id`. The id itself is never changed.
    /// Returns the updated document, or `None` when no such document exists.
    async fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        changes: Document,
    ) -> Result<Option<Document>, DbError>;

    /// Remove the document with `id`. Returns whether a document was removed.
    async fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool, DbError>;
}

/// Open a store for the given backend. `path` is only read by [`Backend::File`].
pub async fn open(backend: Backend, path: impl AsRef<Path>) -> Result<SharedStore, DbError> {
    let store = match backend {
        Backend::Memory => {
            tracing::info!(target: "shelf-db", "using in-memory document store");
            MemoryStore::new()
        }
        Backend::File => {
            let path = path.as_ref();
            tracing::info!(target: "shelf-db", path = %path.display(), "using file-backed document store");
            MemoryStore::with_snapshot(path).await?
        }
    };

    Ok(Arc::new(store))
}
