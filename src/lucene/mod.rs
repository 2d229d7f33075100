//! Lucene query syntax subset.
//!
//! Supported: field terms (`file.name:foo`), phrases, `AND`/`OR`/`NOT` and
//! their `&&`/`||`/`!` forms, `-` (prohibit), `+`, groups, field groups
//! (`tag:(a OR b)`), ranges with any mix of `[ ]` and `{ }`, and the fuzzy,
//! proximity, boost and regex forms. The parser accepts the whole subset;
//! deciding which constructs are meaningful is left to the query compiler.

mod ast;
mod parser;

pub use ast::{Node, Range};
pub use parser::parse;
