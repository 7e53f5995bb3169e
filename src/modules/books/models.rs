use std::fmt;

use serde::{Deserialize, Serialize};
use shelf_db::Document;

/// Store collection holding book documents.
pub const COLLECTION: &str = "books";

/// A catalog entry as stored and returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// Store-assigned identifier
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    /// Title of the book
    #[serde(default)]
    pub name: String,
    /// Price as entered; free text
    #[serde(default)]
    pub price: String,
    /// Publication date as entered; free text
    #[serde(default)]
    pub published_date: String,
    #[serde(default)]
    pub description: String,
}

impl Book {
    pub fn from_document(doc: Document) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::Value::Object(doc))
    }

    /// The user-editable fields of this book.
    pub fn fields(&self) -> BookFields {
        BookFields {
            name: Some(self.name.clone()),
            price: Some(self.price.clone()),
            published_date: Some(self.published_date.clone()),
            description: Some(self.description.clone()),
        }
    }
}

/// The user-editable book fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Name,
    Price,
    Description,
    PublishedDate,
}

impl Field {
    /// Every field, in the order forms check them.
    pub const ALL: [Field; 4] = [
        Field::Name,
        Field::Price,
        Field::Description,
        Field::PublishedDate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Price => "price",
            Field::Description => "description",
            Field::PublishedDate => "published_date",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Price => "Price",
            Field::Description => "Description",
            Field::PublishedDate => "Published date",
        }
    }

    pub fn required_message(self) -> String {
        format!("{} is required", self.label())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A set of book fields, any of which may be absent.
///
/// Used as the create payload, the edit payload (only present fields are
/// overwritten) and the client-side draft. Numbers are accepted wherever
/// text is expected and kept as their textual form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookFields {
    #[serde(default, deserialize_with = "text::optional", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "text::optional", skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "text::optional", skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(default, deserialize_with = "text::optional", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BookFields {
    pub fn get(&self, field: Field) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.slot_mut(field) = Some(value.into());
    }

    /// Builder-style [`BookFields::set`].
    pub fn with(mut self, field: Field, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Required fields that are absent or blank.
    pub fn missing(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|field| self.get(*field).map_or(true, |value| value.trim().is_empty()))
            .collect()
    }

    /// Trim surrounding whitespace from every present field.
    pub fn normalized(mut self) -> Self {
        for field in Field::ALL {
            if let Some(value) = self.slot_mut(field) {
                let trimmed = value.trim();
                if trimmed.len() != value.len() {
                    *value = trimmed.to_string();
                }
            }
        }
        self
    }

    /// Present fields as a store document.
    pub fn into_document(self) -> Document {
        Field::ALL
            .into_iter()
            .filter_map(|field| {
                self.get(field)
                    .map(|value| (field.as_str().to_string(), value.into()))
            })
            .collect()
    }

    fn slot(&self, field: Field) -> &Option<String> {
        match field {
            Field::Name => &self.name,
            Field::Price => &self.price,
            Field::Description => &self.description,
            Field::PublishedDate => &self.published_date,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::Price => &mut self.price,
            Field::Description => &mut self.description,
            Field::PublishedDate => &mut self.published_date,
        }
    }
}

/// Query string of `GET /getAll`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: String,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPage {
    pub books: Vec<Book>,
    /// Number of books matching the search, across all pages
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Query string carrying a target book id.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdQuery {
    pub id: Option<String>,
}

/// Body returned by `DELETE /delete`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteConfirmation {
    pub message: String,
    pub id: String,
}

mod text {
    use serde::de::{Deserializer, Error};
    use serde::Deserialize;
    use serde_json::Value;

    /// Accept a string, a number, or null.
    pub fn optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(Value::Number(number)) => Ok(Some(number.to_string())),
            Some(other) => Err(D::Error::custom(format!(
                "expected text or number, found {other}"
            ))),
        }
    }
}
