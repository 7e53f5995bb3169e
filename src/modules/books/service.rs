//! Catalog rules on top of the document store.

use shelf_db::{DbError, Filter, FindOptions, SharedStore};
use shelf_kernel::settings::CatalogSettings;
use thiserror::Error;

use super::models::{Book, BookFields, BookPage, Field, ListQuery, COLLECTION};

/// Failures of catalog operations
#[derive(Error, Debug)]
pub enum BookError {
    #[error("missing required fields: {}", field_list(.missing))]
    Validation { missing: Vec<Field> },

    #[error("book '{id}' not found")]
    NotFound { id: String },

    #[error("{0} must be at least 1")]
    InvalidPaging(&'static str),

    #[error(transparent)]
    Store(#[from] DbError),

    #[error("stored book is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

fn field_list(fields: &[Field]) -> String {
    fields
        .iter()
        .map(|field| field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Validates, normalizes and pages book records.
///
/// Creation is the only operation that enforces required fields; edits
/// overwrite whatever fields they carry.
#[derive(Clone)]
pub struct BookService {
    store: SharedStore,
    paging: CatalogSettings,
}

impl BookService {
    pub fn new(store: SharedStore, paging: CatalogSettings) -> Self {
        Self { store, paging }
    }

    /// Store a new book. Every field must be present and non-blank.
    pub async fn add_book(&self, fields: BookFields) -> Result<Book, BookError> {
        let fields = fields.normalized();
        let missing = fields.missing();
        if !missing.is_empty() {
            tracing::debug!(missing = %field_list(&missing), "book rejected");
            return Err(BookError::Validation { missing });
        }

        let stored = self
            .store
            .insert(COLLECTION, fields.into_document())
            .await?;
        let book = Book::from_document(stored)?;

        tracing::info!(book_id = %book.id, name = %book.name, "book added");
        Ok(book)
    }

    /// One page of books whose name contains `query.search`, ignoring case.
    pub async fn list_books(&self, query: ListQuery) -> Result<BookPage, BookError> {
        let page = query.page.unwrap_or(1);
        if page == 0 {
            return Err(BookError::InvalidPaging("page"));
        }

        let limit = query.limit.unwrap_or(self.paging.default_page_size);
        if limit == 0 {
            return Err(BookError::InvalidPaging("limit"));
        }
        let limit = limit.min(self.paging.max_page_size);

        let filter = Filter::contains(Field::Name.as_str(), query.search);
        let total = self.store.count(COLLECTION, &filter).await?;
        let skip = (page - 1).saturating_mul(limit);

        let books = self
            .store
            .find(COLLECTION, &filter, FindOptions::page(skip, limit))
            .await?
            .into_iter()
            .map(Book::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(page, limit, total, returned = books.len(), "books listed");

        Ok(BookPage {
            books,
            total,
            page,
            limit,
        })
    }

    /// Overwrite the fields present in `changes` on the book with `id`.
    pub async fn edit_book(&self, id: &str, changes: BookFields) -> Result<Book, BookError> {
        let updated = self
            .store
            .update_by_id(COLLECTION, id, changes.into_document())
            .await?
            .ok_or_else(|| BookError::NotFound { id: id.to_string() })?;
        let book = Book::from_document(updated)?;

        tracing::info!(book_id = %book.id, "book edited");
        Ok(book)
    }

    /// Permanently remove the book with `id`.
    pub async fn delete_book(&self, id: &str) -> Result<(), BookError> {
        if !self.store.delete_by_id(COLLECTION, id).await? {
            return Err(BookError::NotFound { id: id.to_string() });
        }

        tracing::info!(book_id = %id, "book deleted");
        Ok(())
    }
}
