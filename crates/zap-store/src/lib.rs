//! Persistence for ZapLink.
//!
//! Two collaborators live here, both consumed by the controller through
//! trait objects so deployments and tests can substitute them freely:
//!
//! - [`ZapRepository`]: durable keyed storage for zap records, with a
//!   uniqueness constraint on the short code and a compare-and-swap view
//!   counter
//! - [`ContentStore`]: object storage for uploaded bytes, returning a
//!   retrievable URL per object
//!
//! # Backends
//!
//! - [`InMemoryZapRepository`] / [`InMemoryContentStore`]: tests and embedding
//! - [`SqliteZapRepository`]: single-file durable store via sqlx
//! - [`FilesystemContentStore`]: objects under a local root, served by the
//!   HTTP layer
//!
//! # Design Rules
//!
//! 1. `create` never overwrites: a taken short code is `DuplicateKey`.
//! 2. `increment_view_count` is a single atomic conditional update.
//! 3. All backend errors are propagated, never retried here.

pub mod content;
pub mod error;
pub mod filesystem;
pub mod memory;
pub mod sqlite;
pub mod traits;

#[cfg(test)]
mod testing;

pub use content::{ContentObject, ContentStore, InMemoryContentStore, ResourceClass, UploadRouting};
pub use error::{StoreError, StoreResult};
pub use filesystem::FilesystemContentStore;
pub use memory::InMemoryZapRepository;
pub use sqlite::SqliteZapRepository;
pub use traits::ZapRepository;
