//! SHELF application library
//!
//! The book catalog module served over HTTP, the server bootstrap, and the
//! form-driven catalog client.

pub mod app;
pub mod client;
pub mod modules;

pub use app::App;
