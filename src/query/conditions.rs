//! Condition builders, one per [`FieldKind`].
//!
//! Each builder turns a leaf value (a term, or a range) for a resolved field
//! into a [`Predicate`]. Permission checks for attributes, groups and users
//! happen here, while the query is compiled; every refusal is reported with
//! the same message a missing entity would produce.

use crate::backend::ObjectRepository;
use crate::error::SearchError;
use crate::lucene::Range;
use crate::model::{Capability, ShareReason};
use crate::predicate::{CmpOp, Column, Operand, Predicate, Value};
use crate::principal::Principal;
use crate::query::fields::{ColumnType, FieldKind, ResolvedField};
use crate::query::util::{
    has_wildcards, is_unbounded, match_value, parse_datetime_window, parse_integer, unescape,
    MatchValue,
};
use crate::schema::{
    ATTRIBUTES, ATTRIBUTE_KEY, ATTRIBUTE_VALUE, OBJECT_ID, PERMISSIONS, PERMISSION_GROUP,
    PERMISSION_REASON, PERMISSION_USER,
};
use tracing::debug;

/// Leaf value handed to a builder.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Leaf<'a> {
    /// Term or phrase content, escapes intact, quotes removed.
    Term(&'a str),
    Range(&'a Range),
}

/// Principal and lookups a builder may consult.
pub(crate) struct ConditionContext<'a> {
    pub(crate) principal: &'a Principal,
    pub(crate) repository: &'a dyn ObjectRepository,
}

pub(crate) fn build_condition(
    ctx: &ConditionContext<'_>,
    field: &ResolvedField,
    leaf: Leaf<'_>,
) -> Result<Predicate, SearchError> {
    match field.field {
        FieldKind::Direct {
            column,
            column_type: ColumnType::Text,
        } => match leaf {
            Leaf::Term(value) => Ok(string_condition(Operand::Column(*column), value)),
            Leaf::Range(_) => Err(range_not_supported(field)),
        },
        FieldKind::Direct {
            column,
            column_type: ColumnType::Integer,
        } => match leaf {
            Leaf::Term(value) => Ok(Predicate::eq(
                *column,
                Value::Integer(parse_integer(&field.path, value)?),
            )),
            Leaf::Range(range) => integer_range(field, *column, range),
        },
        FieldKind::DateTime { column } => match leaf {
            Leaf::Term(value) => datetime_term(field, *column, value),
            Leaf::Range(range) => datetime_range(field, *column, range),
        },
        FieldKind::List { relation, value } => match leaf {
            Leaf::Term(term) => Ok(Predicate::exists(
                *relation,
                OBJECT_ID,
                string_condition(Operand::Column(*value), term),
            )),
            Leaf::Range(_) => Err(range_not_supported(field)),
        },
        FieldKind::Json { column } => {
            let operand = json_operand(*column, &field.residual)?;
            match leaf {
                Leaf::Term(value) => Ok(string_condition(operand, value)),
                Leaf::Range(range) => Ok(json_range(operand, range)),
            }
        }
        FieldKind::Attribute => attribute_condition(ctx, field, leaf),
        FieldKind::Share => share_condition(ctx, field, leaf),
        FieldKind::Uploader => uploader_condition(ctx, field, leaf),
    }
}

/// Exact comparison, or LIKE if the value has Lucene wildcards.
pub(crate) fn string_condition(operand: Operand, value: &str) -> Predicate {
    match match_value(value) {
        MatchValue::Exact(literal) => Predicate::eq(operand, Value::Text(literal)),
        MatchValue::Pattern(pattern) => Predicate::Like { operand, pattern },
    }
}

fn range_not_supported(field: &ResolvedField) -> SearchError {
    SearchError::unsupported(format!(
        "Range queries are not supported for field '{}'",
        field.path
    ))
}

fn integer_range(
    field: &ResolvedField,
    column: Column,
    range: &Range,
) -> Result<Predicate, SearchError> {
    let mut bounds = Vec::new();
    if !is_unbounded(&range.low) {
        let low = parse_integer(&field.path, &unescape(&range.low))?;
        let op = if range.include_low { CmpOp::Ge } else { CmpOp::Gt };
        bounds.push(Predicate::compare(column, op, Value::Integer(low)));
    }
    if !is_unbounded(&range.high) {
        let high = parse_integer(&field.path, &unescape(&range.high))?;
        let op = if range.include_high { CmpOp::Le } else { CmpOp::Lt };
        bounds.push(Predicate::compare(column, op, Value::Integer(high)));
    }
    Ok(Predicate::all(bounds))
}

fn datetime_term(
    field: &ResolvedField,
    column: Column,
    value: &str,
) -> Result<Predicate, SearchError> {
    if has_wildcards(value) {
        return Err(SearchError::unsupported(format!(
            "Wildcards are not allowed for field '{}'",
            field.path
        )));
    }
    let (low, high) = parse_datetime_window(&field.path, &unescape(value))?;
    Ok(Predicate::all(vec![
        Predicate::compare(column, CmpOp::Ge, Value::DateTime(low)),
        Predicate::compare(column, CmpOp::Lt, Value::DateTime(high)),
    ]))
}

// Both endpoints are inclusive; the upper one covers its whole unit.
fn datetime_range(
    field: &ResolvedField,
    column: Column,
    range: &Range,
) -> Result<Predicate, SearchError> {
    if !range.include_low || !range.include_high {
        return Err(SearchError::unsupported(format!(
            "Exclusive ranges are not allowed for field '{}'",
            field.path
        )));
    }
    let mut bounds = Vec::new();
    if !is_unbounded(&range.low) {
        let (low, _) = parse_datetime_window(&field.path, &unescape(&range.low))?;
        bounds.push(Predicate::compare(column, CmpOp::Ge, Value::DateTime(low)));
    }
    if !is_unbounded(&range.high) {
        let (_, high) = parse_datetime_window(&field.path, &unescape(&range.high))?;
        bounds.push(Predicate::compare(column, CmpOp::Lt, Value::DateTime(high)));
    }
    Ok(Predicate::all(bounds))
}

/// SQLite JSON path for `segments`, each one quoted as an object label.
fn json_operand(column: Column, segments: &[String]) -> Result<Operand, SearchError> {
    let mut path = String::from("$");
    for segment in segments {
        let label = unescape(segment);
        if label.contains('"') {
            return Err(SearchError::not_queryable(format!(
                "Invalid JSON path segment '{}'",
                segment
            )));
        }
        path.push_str(".\"");
        path.push_str(&label);
        path.push('"');
    }
    Ok(Operand::JsonText { column, path })
}

// Endpoints compare as raw strings; an inclusive endpoint adds an OR'ed
// equality instead of switching to >= / <=.
fn json_range(operand: Operand, range: &Range) -> Predicate {
    let mut bounds = Vec::new();
    if !is_unbounded(&range.low) {
        let low = Value::text(unescape(&range.low));
        let strict = Predicate::compare(operand.clone(), CmpOp::Gt, low.clone());
        bounds.push(if range.include_low {
            Predicate::Or(vec![strict, Predicate::eq(operand.clone(), low)])
        } else {
            strict
        });
    }
    if !is_unbounded(&range.high) {
        let high = Value::text(unescape(&range.high));
        let strict = Predicate::compare(operand.clone(), CmpOp::Lt, high.clone());
        bounds.push(if range.include_high {
            Predicate::Or(vec![strict, Predicate::eq(operand, high)])
        } else {
            strict
        });
    }
    Predicate::all(bounds)
}

fn attribute_condition(
    ctx: &ConditionContext<'_>,
    field: &ResolvedField,
    leaf: Leaf<'_>,
) -> Result<Predicate, SearchError> {
    let Leaf::Term(value) = leaf else {
        return Err(range_not_supported(field));
    };
    let (key, subpath) = field
        .residual
        .split_first()
        .ok_or_else(|| SearchError::not_queryable("Missing attribute key"))?;
    let key = unescape(key);
    let missing = || SearchError::not_found(format!("No such attribute: {}", key));

    let definition = ctx.repository.attribute_definition(&key)?.ok_or_else(missing)?;
    if !ctx.principal.has_capability(Capability::ReadingAllAttributes) {
        let readable = definition
            .permissions
            .iter()
            .any(|perm| perm.can_read && ctx.principal.is_member_of(perm.group_id));
        if !readable {
            debug!(key = %key, login = ctx.principal.login(), "attribute not readable");
            return Err(missing());
        }
    }
    if definition.hidden && has_wildcards(value) {
        return Err(SearchError::not_queryable(
            "Wildcards are not allowed for hidden attributes",
        ));
    }

    let operand = json_operand(ATTRIBUTE_VALUE, subpath)?;
    Ok(Predicate::exists(
        &ATTRIBUTES,
        OBJECT_ID,
        Predicate::all(vec![
            Predicate::eq(ATTRIBUTE_KEY, Value::Text(key)),
            string_condition(operand, value),
        ]),
    ))
}

/// Value of a share/uploader term: no ranges, no wildcards.
fn exact_identifier(field: &ResolvedField, leaf: Leaf<'_>) -> Result<String, SearchError> {
    match leaf {
        Leaf::Range(_) => Err(range_not_supported(field)),
        Leaf::Term(value) if has_wildcards(value) => Err(SearchError::unsupported(format!(
            "Wildcards are not allowed for field '{}'",
            field.path
        ))),
        Leaf::Term(value) => Ok(unescape(value)),
    }
}

fn share_condition(
    ctx: &ConditionContext<'_>,
    field: &ResolvedField,
    leaf: Leaf<'_>,
) -> Result<Predicate, SearchError> {
    let name = exact_identifier(field, leaf)?;
    let missing = || SearchError::not_found(format!("No such group: {}", name));

    let group = ctx.repository.group_by_name(&name)?.ok_or_else(missing)?;
    if !ctx.principal.has_capability(Capability::ManageUsers)
        && !ctx.principal.is_member_of(group.id)
    {
        debug!(group = %name, login = ctx.principal.login(), "group not visible");
        return Err(missing());
    }
    Ok(Predicate::exists(
        &PERMISSIONS,
        OBJECT_ID,
        Predicate::eq(PERMISSION_GROUP, Value::Integer(group.id)),
    ))
}

fn uploader_condition(
    ctx: &ConditionContext<'_>,
    field: &ResolvedField,
    leaf: Leaf<'_>,
) -> Result<Predicate, SearchError> {
    let login = exact_identifier(field, leaf)?;
    let missing = || SearchError::not_found(format!("No such user: {}", login));

    if !ctx.principal.has_capability(Capability::ManageUsers) && login != ctx.principal.login() {
        debug!(uploader = %login, login = ctx.principal.login(), "uploader not visible");
        return Err(missing());
    }
    let user = ctx.repository.user_by_login(&login)?.ok_or_else(missing)?;
    Ok(Predicate::exists(
        &PERMISSIONS,
        OBJECT_ID,
        Predicate::all(vec![
            Predicate::eq(PERMISSION_USER, Value::Integer(user.id)),
            Predicate::eq(PERMISSION_REASON, Value::text(ShareReason::Added.as_str())),
        ]),
    ))
}
