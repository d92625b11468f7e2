//! # thinghub-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the `MetadataStore` port defined in `thinghub-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations)
//! - Map metadata documents to and from JSON rows
//!
//! ## Dependency rule
//! Depends on `thinghub-app` (for port traits) and `thinghub-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod metadata_store;
pub mod pool;

pub use error::StorageError;
pub use metadata_store::SqliteMetadataStore;
pub use pool::{Config, Database};
