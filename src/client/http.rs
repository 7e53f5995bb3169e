//! [`BookApi`] over the REST surface.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;

use super::{ApiError, BookApi};
use crate::modules::books::models::{Book, BookFields, BookPage, DeleteConfirmation};

/// Talks to a running catalog server.
#[derive(Debug, Clone)]
pub struct HttpBookApi {
    client: Client,
    base_url: String,
}

impl HttpBookApi {
    /// `base_url` points at the book module, e.g. `http://127.0.0.1:3030/book`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Deserialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

/// Turn non-success responses into [`ApiError::Status`].
async fn check_response(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => ("unknown".to_string(), body),
    };

    Err(ApiError::Status {
        status: status.as_u16(),
        code,
        message,
    })
}

#[async_trait]
impl BookApi for HttpBookApi {
    async fn add(&self, fields: &BookFields) -> Result<Book, ApiError> {
        let resp = self.client.post(self.url("add")).json(fields).send().await?;
        let book = check_response(resp).await?.json::<Book>().await?;
        tracing::debug!(book_id = %book.id, "book submitted");
        Ok(book)
    }

    async fn list(&self, search: &str, page: usize, limit: usize) -> Result<BookPage, ApiError> {
        let resp = self
            .client
            .get(self.url("getAll"))
            .query(&[
                ("search", search.to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        Ok(check_response(resp).await?.json::<BookPage>().await?)
    }

    async fn edit(&self, id: &str, fields: &BookFields) -> Result<Book, ApiError> {
        let resp = self
            .client
            .put(self.url("edit"))
            .query(&[("id", id)])
            .json(fields)
            .send()
            .await?;
        let book = check_response(resp).await?.json::<Book>().await?;
        tracing::debug!(book_id = %book.id, "book edit submitted");
        Ok(book)
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let resp = self
            .client
            .delete(self.url("delete"))
            .query(&[("id", id)])
            .send()
            .await?;
        let confirmation = check_response(resp)
            .await?
            .json::<DeleteConfirmation>()
            .await?;
        tracing::debug!(book_id = %confirmation.id, "book delete confirmed");
        Ok(())
    }
}
