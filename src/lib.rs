//! malsearch - Lucene-style search over a malware object repository.
//!
//! This library compiles Lucene query text into access-restricted relational
//! predicates over a polymorphic object hierarchy (generic objects, files,
//! static configs and text blobs) and runs them against SQLite.
//!
//! # Features
//!
//! - **Typed fields**: `file.name`, `static.family`, `blob.last_seen`, ...
//! - **Multi-valued fields**: tags, comments and alternative file names
//! - **Attributes**: `meta.<key>[.path]`, filtered by per-group read rights
//! - **JSON documents**: `static.cfg.<path>`
//! - **Sharing relations**: `shared:<group>` and `uploader:<login>`
//! - **Visibility**: every query is AND'ed with the principal's access
//!   predicate before it reaches storage
//!
//! # Quick Start
//!
//! ```no_run
//! use malsearch::backend::SqliteBackend;
//! use malsearch::query::{search, SearchOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = SqliteBackend::open(Path::new("repository.db"))?;
//! let principal = backend.load_principal("alice")?;
//! let rows = search(
//!     &backend,
//!     "file.type:PE32* AND tag:trojan",
//!     &principal,
//!     &SearchOptions::default(),
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`lucene`] - Query syntax tree and parser
//! - [`query`] - Field resolution, compilation and SQL rendering
//! - [`backend`] - Repository lookups and plan execution (SQLite)
//! - [`principal`] - Requesting user and its access predicate
//! - [`error`] - Error types
//! - [`output`] - Response types and formatting

pub mod backend;
pub mod error;
pub mod lucene;
pub mod model;
pub mod output;
pub mod output_common;
pub mod predicate;
pub mod principal;
pub mod query;
pub mod schema;

pub use backend::{ObjectRepository, SqliteBackend, Storage};
pub use error::SearchError;
pub use model::{ObjectKind, ObjectRow};
pub use principal::Principal;
pub use query::{compile_query, search, QueryPlan, SearchOptions};

use clap::ValueEnum;
use serde::Serialize;

/// Ordering of search results by upload time
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    /// Most recent uploads first (default)
    #[default]
    Newest,
    /// Oldest uploads first
    Oldest,
}
