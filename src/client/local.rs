//! In-process [`BookApi`] calling the catalog service directly.

use async_trait::async_trait;

use super::{ApiError, BookApi};
use crate::modules::books::models::{Book, BookFields, BookPage, ListQuery};
use crate::modules::books::service::BookService;

#[derive(Clone)]
pub struct LocalBookApi {
    service: BookService,
}

impl LocalBookApi {
    pub fn new(service: BookService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl BookApi for LocalBookApi {
    async fn add(&self, fields: &BookFields) -> Result<Book, ApiError> {
        Ok(self.service.add_book(fields.clone()).await?)
    }

    async fn list(&self, search: &str, page: usize, limit: usize) -> Result<BookPage, ApiError> {
        let query = ListQuery {
            search: search.to_string(),
            page: Some(page),
            limit: Some(limit),
        };
        Ok(self.service.list_books(query).await?)
    }

    async fn edit(&self, id: &str, fields: &BookFields) -> Result<Book, ApiError> {
        Ok(self.service.edit_book(id, fields.clone()).await?)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        Ok(self.service.delete_book(id).await?)
    }
}
