//! Search entry point.
//!
//! Compilation and execution are strictly separated: [`compile_query`]
//! either returns a complete [`QueryPlan`] or an error, and only a complete
//! plan is ever handed to [`Storage::execute`].

use crate::backend::{ObjectRepository, Storage};
use crate::error::SearchError;
use crate::lucene;
use crate::model::{ObjectKind, ObjectRow};
use crate::predicate::{CmpOp, Predicate, Value};
use crate::principal::Principal;
use crate::query::compiler::QueryCompiler;
use crate::query::options::SearchOptions;
use crate::schema::{OBJECT_ID, OBJECT_TYPE, OBJECT_UPLOAD_TIME};
use crate::SortMode;
use tracing::debug;

/// Fully compiled, access-restricted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// Kind the query ended up bound to.
    pub kind: ObjectKind,
    /// Type restriction, query condition, access predicate and pivot, AND'ed.
    pub predicate: Predicate,
    pub sort_by: SortMode,
    pub limit: usize,
}

/// Parses and compiles `query` for `principal`.
pub fn compile_query(
    query: &str,
    principal: &Principal,
    repository: &dyn ObjectRepository,
    options: &SearchOptions,
) -> Result<QueryPlan, SearchError> {
    let tree = lucene::parse(query)?;
    let compiler = QueryCompiler::new(principal, repository);
    let (condition, binding) = compiler.compile(&tree, options.object_kind)?;
    let kind = binding.unwrap_or(ObjectKind::Object);

    let mut parts = Vec::with_capacity(4);
    if let Some(tag) = kind.type_tag() {
        parts.push(Predicate::eq(OBJECT_TYPE, Value::text(tag)));
    }
    parts.push(condition);
    parts.push(principal.access_predicate(OBJECT_ID));
    if let Some(dhash) = options.older_than.as_deref() {
        parts.push(after_pivot(repository, principal, dhash, options.sort_by)?);
    }

    let plan = QueryPlan {
        kind,
        predicate: Predicate::And(parts),
        sort_by: options.sort_by,
        limit: options.effective_limit(),
    };
    debug!(query, kind = %plan.kind, limit = plan.limit, "compiled search query");
    Ok(plan)
}

/// Compiles `query` and runs it against `storage`.
pub fn search<S: Storage>(
    storage: &S,
    query: &str,
    principal: &Principal,
    options: &SearchOptions,
) -> Result<Vec<ObjectRow>, SearchError> {
    let plan = compile_query(query, principal, storage, options)?;
    storage.execute(&plan)
}

// Keyset pivot: strictly after the pivot in sort order, ties broken by id.
fn after_pivot(
    repository: &dyn ObjectRepository,
    principal: &Principal,
    dhash: &str,
    sort_by: SortMode,
) -> Result<Predicate, SearchError> {
    let pivot = repository
        .object_position(dhash, principal)?
        .ok_or_else(|| SearchError::not_found(format!("No such object: {}", dhash)))?;
    let op = match sort_by {
        SortMode::Newest => CmpOp::Lt,
        SortMode::Oldest => CmpOp::Gt,
    };
    let time = Value::DateTime(pivot.upload_time);
    Ok(Predicate::Or(vec![
        Predicate::compare(OBJECT_UPLOAD_TIME, op, time.clone()),
        Predicate::And(vec![
            Predicate::eq(OBJECT_UPLOAD_TIME, time),
            Predicate::compare(OBJECT_ID, op, Value::Integer(pivot.id)),
        ]),
    ]))
}
