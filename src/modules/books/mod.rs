pub mod models;
pub mod routes;
pub mod service;

use async_trait::async_trait;
use axum::Router;
use serde_json::json;
use shelf_db::{Filter, SharedStore};
use shelf_kernel::{settings::CatalogSettings, InitCtx, Module};

use service::BookService;

/// Book catalog module, mounted at `/book`
pub struct BooksModule {
    service: BookService,
}

impl BooksModule {
    pub fn new(store: SharedStore, paging: CatalogSettings) -> Self {
        Self {
            service: BookService::new(store, paging),
        }
    }

    pub fn service(&self) -> &BookService {
        &self.service
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "book"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let stored = ctx.db.count(models::COLLECTION, &Filter::All).await?;

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = stored,
            "book module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        routes::router(self.service.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error_response = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let id_param = json!({
            "name": "id",
            "in": "query",
            "required": true,
            "schema": { "type": "string" }
        });

        Some(json!({
            "paths": {
                "/add": {
                    "post": {
                        "summary": "Add a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookFields" }
                                }
                            }
                        },
                        "responses": {
                            "201": {
                                "description": "Created book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": error_response("Malformed body"),
                            "422": error_response("Required fields missing")
                        }
                    }
                },
                "/getAll": {
                    "get": {
                        "summary": "List books, optionally filtered by name",
                        "tags": ["Books"],
                        "parameters": [
                            {
                                "name": "search",
                                "in": "query",
                                "required": false,
                                "schema": { "type": "string" }
                            },
                            {
                                "name": "page",
                                "in": "query",
                                "required": false,
                                "schema": { "type": "integer", "minimum": 1, "default": 1 }
                            },
                            {
                                "name": "limit",
                                "in": "query",
                                "required": false,
                                "schema": { "type": "integer", "minimum": 1, "default": 10 }
                            }
                        ],
                        "responses": {
                            "200": {
                                "description": "One page of books",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/BookPage" }
                                    }
                                }
                            },
                            "400": error_response("Invalid paging parameters")
                        }
                    }
                },
                "/edit": {
                    "put": {
                        "summary": "Overwrite fields of a book",
                        "tags": ["Books"],
                        "parameters": [id_param.clone()],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/BookFields" }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Updated book",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Book" }
                                    }
                                }
                            },
                            "400": error_response("Missing id or malformed body"),
                            "404": error_response("Book not found")
                        }
                    }
                },
                "/delete": {
                    "delete": {
                        "summary": "Delete a book",
                        "tags": ["Books"],
                        "parameters": [id_param],
                        "responses": {
                            "200": {
                                "description": "Deletion confirmation",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/DeleteConfirmation" }
                                    }
                                }
                            },
                            "400": error_response("Missing id"),
                            "404": error_response("Book not found")
                        }
                    }
                },
                "/health": {
                    "get": {
                        "summary": "Book module health check",
                        "tags": ["Books"],
                        "responses": {
                            "200": {
                                "description": "OK",
                                "content": {
                                    "text/plain": {
                                        "schema": { "type": "string" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Book": {
                        "type": "object",
                        "properties": {
                            "_id": {
                                "type": "string",
                                "description": "Store-assigned identifier"
                            },
                            "name": { "type": "string" },
                            "price": { "type": "string" },
                            "published_date": { "type": "string" },
                            "description": { "type": "string" }
                        },
                        "required": ["_id", "name", "price", "published_date", "description"]
                    },
                    "BookFields": {
                        "type": "object",
                        "description": "All fields are required when adding; edits overwrite only the fields given",
                        "properties": {
                            "name": { "type": "string" },
                            "price": { "type": ["string", "number"] },
                            "published_date": { "type": "string" },
                            "description": { "type": "string" }
                        }
                    },
                    "BookPage": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/Book" }
                            },
                            "total": { "type": "integer" },
                            "page": { "type": "integer" },
                            "limit": { "type": "integer" }
                        },
                        "required": ["books", "total", "page", "limit"]
                    },
                    "DeleteConfirmation": {
                        "type": "object",
                        "properties": {
                            "message": { "type": "string" },
                            "id": { "type": "string" }
                        },
                        "required": ["message", "id"]
                    }
                }
            }
        }))
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "book module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "book module stopped");
        Ok(())
    }
}

/// Create a new instance of the book module
pub fn create_module(store: SharedStore, paging: CatalogSettings) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(store, paging))
}
