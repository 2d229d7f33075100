//! Query module: compiles Lucene query text into access-restricted plans.
//!
//! This module provides the core search functionality for malsearch:
//!
//! - Field path resolution against the static field tables
//! - Condition building per field kind (columns, lists, JSON, attributes,
//!   sharing relations)
//! - Object kind binding across the whole query
//! - SQL rendering of the resulting predicate
//!
//! # Search Options
//!
//! [`compile_query`] and [`search`] take a [`SearchOptions`] describing the
//! kind the caller restricts to, the result limit, ordering and the
//! pagination pivot.

mod builder;
mod compiler;
mod conditions;
mod fields;
mod options;
mod search;
mod util;

// Options
pub use options::{SearchOptions, DEFAULT_LIMIT};

// Compilation
pub use compiler::{bind, Binding, QueryCompiler};
pub use fields::{lookup, resolve, ColumnType, FieldEntry, FieldKind, ResolvedField};
pub use search::{compile_query, search, QueryPlan};

// SQL rendering
pub use builder::{build_object_query, build_position_query, render_predicate};

#[cfg(test)]
mod tests;
