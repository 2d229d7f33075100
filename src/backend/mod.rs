//! Storage collaborators of the search subsystem.
//!
//! The compiler only needs point lookups ([`ObjectRepository`]); running a
//! compiled plan is a separate concern ([`Storage`]). Both are traits so the
//! compiler can be exercised against in-memory fakes, while
//! [`SqliteBackend`] provides the real implementation.

mod sqlite;

pub use sqlite::SqliteBackend;

use crate::error::SearchError;
use crate::model::{AttributeDefinition, Group, ObjectPosition, ObjectRow, User};
use crate::principal::Principal;
use crate::query::QueryPlan;

/// Read-only lookups issued while a query is being compiled.
///
/// A miss is reported as `Ok(None)`; callers turn it into
/// [`SearchError::ObjectNotFound`].
pub trait ObjectRepository {
    fn group_by_name(&self, name: &str) -> Result<Option<Group>, SearchError>;

    fn user_by_login(&self, login: &str) -> Result<Option<User>, SearchError>;

    /// Attribute definition with all of its permission rows.
    fn attribute_definition(&self, key: &str) -> Result<Option<AttributeDefinition>, SearchError>;

    /// Position of the object with `dhash`, or `None` if it does not exist
    /// or `principal` cannot see it.
    fn object_position(
        &self,
        dhash: &str,
        principal: &Principal,
    ) -> Result<Option<ObjectPosition>, SearchError>;
}

/// Executes compiled plans.
pub trait Storage: ObjectRepository {
    /// Matching rows in plan order, at most `plan.limit` of them.
    fn execute(&self, plan: &QueryPlan) -> Result<Vec<ObjectRow>, SearchError>;

    /// Number of rows matching the plan, ignoring its limit.
    fn count(&self, plan: &QueryPlan) -> Result<u64, SearchError>;
}
