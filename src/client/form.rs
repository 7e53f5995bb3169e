//! Form controller: one draft, a list, and a create/edit mode.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

use super::{ApiError, BookApi};
use crate::modules::books::models::{Book, BookFields, Field};

/// Field → message for every field that failed validation.
pub type FieldErrors = BTreeMap<Field, String>;

/// What `submit` will do with the draft.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Create,
    /// Overwrite the book with this id.
    Edit(String),
}

impl Mode {
    pub fn submit_label(&self) -> &'static str {
        match self {
            Mode::Create => "Add Book",
            Mode::Edit(_) => "Edit Book",
        }
    }
}

/// Everything the form shows.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub draft: BookFields,
    pub errors: FieldErrors,
    pub books: Vec<Book>,
    /// Matches for the last fetch across all pages
    pub total: usize,
    pub mode: Mode,
    /// Search term of the last fetch
    pub query: String,
    submitting: bool,
}

impl FormState {
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }
}

#[derive(Error, Debug)]
pub enum FormError {
    #[error("{} required field(s) are empty", .0.len())]
    Invalid(FieldErrors),

    #[error("a submission is already in flight")]
    Busy,

    #[error(transparent)]
    Request(#[from] ApiError),
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Created(Book),
    Updated(Book),
}

impl Submitted {
    pub fn book(&self) -> &Book {
        match self {
            Submitted::Created(book) | Submitted::Updated(book) => book,
        }
    }
}

/// Check that every required draft field is non-empty.
pub fn validate(draft: &BookFields) -> FieldErrors {
    draft
        .missing()
        .into_iter()
        .map(|field| (field, field.required_message()))
        .collect()
}

fn lock(state: &Mutex<FormState>) -> MutexGuard<'_, FormState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Marks a submission as in flight until dropped.
struct InFlight {
    state: Arc<Mutex<FormState>>,
}

impl InFlight {
    fn acquire(state: &Arc<Mutex<FormState>>) -> Result<Self, FormError> {
        let mut guard = lock(state);
        if guard.submitting {
            return Err(FormError::Busy);
        }
        guard.submitting = true;
        Ok(Self {
            state: Arc::clone(state),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.state).submitting = false;
    }
}

/// Drives the catalog form against a [`BookApi`].
///
/// Clones share state, so a UI can hand copies to several event handlers.
/// Failed requests are logged and leave the state untouched so the user can
/// retry.
pub struct FormController<A> {
    api: Arc<A>,
    page_size: usize,
    state: Arc<Mutex<FormState>>,
}

impl<A> Clone for FormController<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            page_size: self.page_size,
            state: Arc::clone(&self.state),
        }
    }
}

impl<A: BookApi> FormController<A> {
    pub fn new(api: A, page_size: usize) -> Self {
        Self {
            api: Arc::new(api),
            page_size: page_size.max(1),
            state: Arc::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> FormState {
        self.state().clone()
    }

    pub fn mode(&self) -> Mode {
        self.state().mode.clone()
    }

    pub fn submit_label(&self) -> &'static str {
        self.state().mode.submit_label()
    }

    pub fn books(&self) -> Vec<Book> {
        self.state().books.clone()
    }

    /// Look up a book in the currently loaded list.
    pub fn book(&self, id: &str) -> Option<Book> {
        self.state().books.iter().find(|book| book.id == id).cloned()
    }

    /// Load the first page with no search term.
    pub async fn on_mount(&self) -> Result<(), FormError> {
        self.fetch("").await
    }

    pub fn handle_change(&self, field: Field, value: impl Into<String>) {
        self.state().draft.set(field, value);
    }

    /// Errors for the current draft; does not touch the stored errors.
    pub fn validate(&self) -> FieldErrors {
        validate(&self.state().draft)
    }

    /// Validate and send the draft, as an add or an edit depending on the mode.
    pub async fn submit(&self) -> Result<Submitted, FormError> {
        let _in_flight = InFlight::acquire(&self.state)?;

        let (draft, mode) = {
            let mut state = self.state();
            let errors = validate(&state.draft);
            if !errors.is_empty() {
                state.errors = errors.clone();
                return Err(FormError::Invalid(errors));
            }
            (state.draft.clone(), state.mode.clone())
        };

        let result = match &mode {
            Mode::Edit(id) => self.api.edit(id, &draft).await.map(Submitted::Updated),
            Mode::Create => self.api.add(&draft).await.map(Submitted::Created),
        };
        let submitted = match result {
            Ok(submitted) => submitted,
            Err(err) => {
                tracing::error!(error = %err, mode = ?mode, "error submitting form");
                return Err(err.into());
            }
        };

        {
            let mut state = self.state();
            state.mode = Mode::Create;
            state.draft = BookFields::default();
            state.errors.clear();
        }
        tracing::info!(book_id = %submitted.book().id, "form submitted");

        // The mutation stands even if the refetch fails.
        let _ = self.fetch("").await;
        Ok(submitted)
    }

    /// Load `book` into the draft and switch to edit mode.
    pub fn start_edit(&self, book: &Book) {
        let mut state = self.state();
        state.draft = book.fields();
        state.errors.clear();
        state.mode = Mode::Edit(book.id.clone());
    }

    /// Drop the draft and return to create mode.
    pub fn cancel_edit(&self) {
        let mut state = self.state();
        state.draft = BookFields::default();
        state.errors.clear();
        state.mode = Mode::Create;
    }

    /// Refetch the first page filtered by `query`.
    pub async fn search(&self, query: &str) -> Result<(), FormError> {
        self.fetch(query).await
    }

    /// Delete a book and refetch. The draft and mode are left alone.
    pub async fn remove(&self, id: &str) -> Result<(), FormError> {
        if let Err(err) = self.api.delete(id).await {
            tracing::error!(error = %err, book_id = %id, "error deleting book");
            return Err(err.into());
        }
        tracing::info!(book_id = %id, "book removed");

        self.fetch("").await
    }

    async fn fetch(&self, query: &str) -> Result<(), FormError> {
        match self.api.list(query, 1, self.page_size).await {
            Ok(page) => {
                let mut state = self.state();
                state.books = page.books;
                state.total = page.total;
                state.query = query.to_string();
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, query, "error fetching books");
                Err(err.into())
            }
        }
    }

    fn state(&self) -> MutexGuard<'_, FormState> {
        lock(&self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LocalBookApi;
    use crate::modules::books::models::BookPage;
    use crate::modules::books::service::BookService;
    use async_trait::async_trait;
    use shelf_db::MemoryStore;
    use shelf_kernel::settings::CatalogSettings;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Wraps the local API, counting calls and optionally holding `add` until released.
    struct ProbeApi {
        inner: LocalBookApi,
        calls: AtomicUsize,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    impl ProbeApi {
        fn new() -> Self {
            let service = BookService::new(Arc::new(MemoryStore::new()), CatalogSettings::default());
            Self {
                inner: LocalBookApi::new(service),
                calls: AtomicUsize::new(0),
                gate: None,
                fail: false,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn check(&self) -> Result<(), ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Status {
                    status: 503,
                    code: "unavailable".to_string(),
                    message: "down".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BookApi for ProbeApi {
        async fn add(&self, fields: &BookFields) -> Result<Book, ApiError> {
            self.check()?;
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.inner.add(fields).await
        }

        async fn list(&self, search: &str, page: usize, limit: usize) -> Result<BookPage, ApiError> {
            self.check()?;
            self.inner.list(search, page, limit).await
        }

        async fn edit(&self, id: &str, fields: &BookFields) -> Result<Book, ApiError> {
            self.check()?;
            self.inner.edit(id, fields).await
        }

        async fn delete(&self, id: &str) -> Result<(), ApiError> {
            self.check()?;
            self.inner.delete(id).await
        }
    }

    fn fill(form: &FormController<ProbeApi>, name: &str) {
        form.handle_change(Field::Name, name);
        form.handle_change(Field::Price, "20");
        form.handle_change(Field::Description, "text");
        form.handle_change(Field::PublishedDate, "2024-01-01");
    }

    #[test]
    fn validate_reports_every_empty_field() {
        let draft = BookFields::default().with(Field::Price, "");
        let errors = validate(&draft);

        assert_eq!(errors.len(), 4);
        assert_eq!(errors[&Field::Name], "Name is required");
        assert_eq!(errors[&Field::Price], "Price is required");
        assert_eq!(errors[&Field::Description], "Description is required");
        assert_eq!(errors[&Field::PublishedDate], "Published date is required");
    }

    #[tokio::test]
    async fn on_mount_loads_first_page() {
        let form = FormController::new(ProbeApi::new(), 10);
        form.api().inner.add(&BookFields::default()
            .with(Field::Name, "Dune")
            .with(Field::Price, "1")
            .with(Field::Description, "d")
            .with(Field::PublishedDate, "1965"))
            .await
            .unwrap();

        form.on_mount().await.unwrap();

        let state = form.snapshot();
        assert_eq!(state.books.len(), 1);
        assert_eq!(state.total, 1);
        assert_eq!(state.query, "");
    }

    #[tokio::test]
    async fn invalid_submit_makes_no_request() {
        let form = FormController::new(ProbeApi::new(), 10);
        form.handle_change(Field::Name, "Dune");

        let err = form.submit().await.unwrap_err();

        match err {
            FormError::Invalid(errors) => assert_eq!(errors.len(), 3),
            other => panic!("expected invalid form, got {other:?}"),
        }
        assert_eq!(form.api().calls(), 0);
        let state = form.snapshot();
        assert_eq!(state.errors.len(), 3);
        assert_eq!(state.draft.name.as_deref(), Some("Dune"));
        assert!(!state.is_submitting());
    }

    #[tokio::test]
    async fn create_submit_clears_draft_and_refetches() {
        let form = FormController::new(ProbeApi::new(), 10);
        fill(&form, "Go Systems");

        let submitted = form.submit().await.unwrap();

        assert!(matches!(submitted, Submitted::Created(_)));
        let state = form.snapshot();
        assert_eq!(state.draft, BookFields::default());
        assert!(state.errors.is_empty());
        assert_eq!(state.books, [submitted.book().clone()]);
        assert_eq!(form.api().calls(), 2);
    }

    #[tokio::test]
    async fn start_edit_switches_submit_to_edit_and_back() {
        let form = FormController::new(ProbeApi::new(), 10);
        fill(&form, "Go Systems");
        let created = form.submit().await.unwrap().book().clone();
        assert_eq!(form.submit_label(), "Add Book");

        form.start_edit(&created);
        assert_eq!(form.mode(), Mode::Edit(created.id.clone()));
        assert_eq!(form.submit_label(), "Edit Book");
        assert_eq!(form.snapshot().draft, created.fields());

        form.handle_change(Field::Price, "25");
        let submitted = form.submit().await.unwrap();

        match &submitted {
            Submitted::Updated(book) => {
                assert_eq!(book.id, created.id);
                assert_eq!(book.price, "25");
            }
            other => panic!("expected update, got {other:?}"),
        }
        assert_eq!(form.mode(), Mode::Create);
        assert_eq!(form.books().len(), 1);
        assert_eq!(form.book(&created.id).unwrap().price, "25");
    }

    #[tokio::test]
    async fn cancel_edit_drops_draft() {
        let form = FormController::new(ProbeApi::new(), 10);
        fill(&form, "Go Systems");
        let created = form.submit().await.unwrap().book().clone();

        form.start_edit(&created);
        form.handle_change(Field::Name, "Changed");
        form.cancel_edit();

        assert_eq!(form.mode(), Mode::Create);
        assert_eq!(form.snapshot().draft, BookFields::default());
        assert_eq!(form.book(&created.id).unwrap().name, "Go Systems");
        assert!(form.book("missing").is_none());
    }

    #[tokio::test]
    async fn failed_request_leaves_state_for_retry() {
        let mut api = ProbeApi::new();
        api.fail = true;
        let form = FormController::new(api, 10);
        let book = Book {
            id: "b1".to_string(),
            name: "Dune".to_string(),
            price: "20".to_string(),
            published_date: "1965".to_string(),
            description: "sand".to_string(),
        };
        form.start_edit(&book);

        let err = form.submit().await.unwrap_err();

        assert!(matches!(err, FormError::Request(_)));
        let state = form.snapshot();
        assert_eq!(state.mode, Mode::Edit("b1".to_string()));
        assert_eq!(state.draft, book.fields());
        assert!(!state.is_submitting());
    }

    #[tokio::test]
    async fn edit_of_vanished_book_reports_not_found() {
        let form = FormController::new(ProbeApi::new(), 10);
        fill(&form, "Dune");
        let created = form.submit().await.unwrap().book().clone();

        form.start_edit(&created);
        form.api().inner.delete(&created.id).await.unwrap();

        match form.submit().await.unwrap_err() {
            FormError::Request(err) => assert!(err.is_not_found()),
            other => panic!("expected request error, got {other:?}"),
        }
        assert_eq!(form.mode(), Mode::Edit(created.id));
    }

    #[tokio::test]
    async fn second_submit_while_in_flight_is_rejected() {
        let gate = Arc::new(Notify::new());
        let mut api = ProbeApi::new();
        api.gate = Some(gate.clone());
        let form = FormController::new(api, 10);
        fill(&form, "Dune");

        let first = tokio::spawn({
            let form = form.clone();
            async move { form.submit().await }
        });
        while !form.snapshot().is_submitting() {
            tokio::task::yield_now().await;
        }

        assert!(matches!(form.submit().await, Err(FormError::Busy)));

        gate.notify_one();
        let submitted = first.await.unwrap().unwrap();
        assert!(matches!(submitted, Submitted::Created(_)));
        assert!(!form.snapshot().is_submitting());
        assert_eq!(form.books().len(), 1);
    }

    #[tokio::test]
    async fn dropped_submission_releases_guard() {
        let gate = Arc::new(Notify::new());
        let mut api = ProbeApi::new();
        api.gate = Some(gate);
        let form = FormController::new(api, 10);
        fill(&form, "Dune");

        let pending = tokio::spawn({
            let form = form.clone();
            async move { form.submit().await }
        });
        while !form.snapshot().is_submitting() {
            tokio::task::yield_now().await;
        }
        pending.abort();
        let _ = pending.await;

        assert!(!form.snapshot().is_submitting());
    }

    #[tokio::test]
    async fn search_and_remove_refetch() {
        let form = FormController::new(ProbeApi::new(), 10);
        for name in ["Dune", "Emma", "Dune Messiah"] {
            fill(&form, name);
            form.submit().await.unwrap();
        }

        form.search("dune").await.unwrap();
        let state = form.snapshot();
        assert_eq!(state.total, 2);
        assert_eq!(state.query, "dune");

        let dune = form.book(&state.books[0].id).unwrap();
        assert_eq!(dune.name, "Dune");
        form.handle_change(Field::Name, "half-typed");
        form.remove(&dune.id).await.unwrap();

        let state = form.snapshot();
        assert_eq!(state.query, "");
        assert_eq!(state.total, 2);
        assert!(state.books.iter().all(|b| b.id != dune.id));
        assert_eq!(state.draft.name.as_deref(), Some("half-typed"));

        assert!(form.remove(&dune.id).await.is_err());
    }
}
