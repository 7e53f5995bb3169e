//! Catalog client: a form controller over a pluggable catalog API.
//!
//! [`form::FormController`] keeps the draft, field errors, submit mode and
//! the fetched list. It talks to the catalog through [`BookApi`], which is
//! implemented over HTTP ([`http::HttpBookApi`]) and in-process
//! ([`local::LocalBookApi`]).

pub mod form;
pub mod http;
pub mod local;
pub mod view;

use async_trait::async_trait;
use thiserror::Error;

use crate::modules::books::models::{Book, BookFields, BookPage};
use crate::modules::books::service::BookError;

pub use form::{FieldErrors, FormController, FormError, FormState, Mode, Submitted};
pub use http::HttpBookApi;
pub use local::LocalBookApi;

/// Failures of a single catalog request
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded {status} ({code}): {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error(transparent)]
    Service(#[from] BookError),
}

impl ApiError {
    /// True when the target book does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Status { status, .. } => *status == 404,
            ApiError::Service(BookError::NotFound { .. }) => true,
            _ => false,
        }
    }
}

/// The four catalog operations as seen by a client.
#[async_trait]
pub trait BookApi: Send + Sync {
    async fn add(&self, fields: &BookFields) -> Result<Book, ApiError>;

    async fn list(&self, search: &str, page: usize, limit: usize) -> Result<BookPage, ApiError>;

    async fn edit(&self, id: &str, fields: &BookFields) -> Result<Book, ApiError>;

    async fn delete(&self, id: &str) -> Result<(), ApiError>;
}
