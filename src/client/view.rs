//! Plain-text rendering of the form and the book list.

use std::fmt::Write;

use super::form::{FieldErrors, FormState};
use crate::modules::books::models::Book;

/// One book as a card.
pub fn render_book(book: &Book) -> String {
    format!(
        "{}\n  Price: ${}\n  Published Date: {}\n  Description: {}\n  Id: {}\n",
        book.name, book.price, book.published_date, book.description, book.id
    )
}

/// The loaded list, with a footer counting matches.
pub fn render_list(state: &FormState) -> String {
    let mut out = String::new();
    for book in &state.books {
        out.push_str(&render_book(book));
        out.push('\n');
    }

    let scope = if state.query.is_empty() {
        String::new()
    } else {
        format!(" matching \"{}\"", state.query)
    };
    let _ = write!(
        out,
        "{} of {} book(s){}",
        state.books.len(),
        state.total,
        scope
    );
    out
}

/// One `field: message` line per error.
pub fn render_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("\n")
}
