//! Document store adapter for the t-bio site.
//!
//! Every piece the site manages (users, articles, profiles, comments) lives in
//! a single document collection. This crate provides the minimal interface the
//! profile logic is built on:
//!
//! - **find**: filter documents, returned as a lazy stream
//! - **insert**: store a new document, assigning an id when missing
//! - **replace**: overwrite a document by id
//!
//! Two backends implement [`DocumentStore`]: [`MemoryStore`] for tests and
//! throwaway runs, and [`SqliteStore`] for persistent data.

mod error;
mod filter;
mod memory;
mod records;
mod sqlite;
mod store;
mod types;

pub use error::StoreError;
pub use filter::Filter;
pub use memory::MemoryStore;
pub use records::*;
pub use sqlite::SqliteStore;
pub use store::{DocStream, DocumentStore};
pub use types::*;
