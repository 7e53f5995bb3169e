use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use shelf_http::error::AppError;

use super::models::{Book, BookFields, BookPage, DeleteConfirmation, IdQuery, ListQuery};
use super::service::{BookError, BookService};

/// HTTP routes of the book module, relative to the module mount point.
pub fn router(service: BookService) -> Router {
    Router::new()
        .route("/add", post(add_book))
        .route("/getAll", get(list_books))
        .route("/edit", put(edit_book))
        .route("/delete", delete(delete_book))
        .route("/health", get(health_check))
        .with_state(service)
}

impl From<BookError> for AppError {
    fn from(err: BookError) -> Self {
        match err {
            BookError::Validation { ref missing } => {
                let details = missing
                    .iter()
                    .map(|field| {
                        json!({
                            "field": field.as_str(),
                            "error": "required",
                            "message": field.required_message(),
                        })
                    })
                    .collect();
                AppError::validation(details, err.to_string())
            }
            BookError::NotFound { .. } => AppError::not_found(err.to_string()),
            BookError::InvalidPaging(_) => AppError::bad_request(err.to_string()),
            BookError::Store(_) | BookError::Malformed(_) => AppError::Internal(err.into()),
        }
    }
}

fn required_id(query: IdQuery) -> Result<String, AppError> {
    query
        .id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::bad_request("query parameter 'id' is required"))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "book module is healthy"
}

async fn add_book(
    State(service): State<BookService>,
    payload: Result<Json<BookFields>, JsonRejection>,
) -> Result<(StatusCode, Json<Book>), AppError> {
    let Json(fields) = payload?;
    let book = service.add_book(fields).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

async fn list_books(
    State(service): State<BookService>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<BookPage>, AppError> {
    let Query(query) = query?;
    Ok(Json(service.list_books(query).await?))
}

async fn edit_book(
    State(service): State<BookService>,
    query: Result<Query<IdQuery>, QueryRejection>,
    payload: Result<Json<BookFields>, JsonRejection>,
) -> Result<Json<Book>, AppError> {
    let id = required_id(query?.0)?;
    let Json(changes) = payload?;
    Ok(Json(service.edit_book(&id, changes).await?))
}

async fn delete_book(
    State(service): State<BookService>,
    query: Result<Query<IdQuery>, QueryRejection>,
) -> Result<Json<DeleteConfirmation>, AppError> {
    let id = required_id(query?.0)?;
    service.delete_book(&id).await?;
    Ok(Json(DeleteConfirmation {
        message: "Book deleted successfully".to_string(),
        id,
    }))
}
