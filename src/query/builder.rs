//! SQL query builders for search operations.
//!
//! This is the only place predicates become SQL text. Identifiers come from
//! [`crate::schema`]; every value, including JSON paths, is bound as a
//! parameter.

use crate::predicate::{Operand, Predicate, Value, DATETIME_FORMAT};
use crate::principal::Principal;
use crate::query::search::QueryPlan;
use crate::schema::{OBJECT_DHASH, OBJECT_FROM, OBJECT_ID};
use crate::SortMode;
use rusqlite::types::Value as SqlValue;

/// Columns selected for every object row, in decoding order.
pub(crate) const OBJECT_COLUMNS: &str = "o.id, o.dhash, o.type, o.upload_time,
       f.file_name, f.file_size, f.file_type, f.md5, f.sha1, f.sha256, f.sha512, f.crc32, f.ssdeep,
       c.family, c.config_type, c.cfg,
       b.blob_name, b.blob_size, b.blob_type, b.last_seen";

/// Builds the SELECT for `plan`, or a `COUNT(*)` over the same rows.
pub fn build_object_query(plan: &QueryPlan, count_only: bool) -> (String, Vec<SqlValue>) {
    let mut params = Vec::new();
    let where_clause = render_predicate(&plan.predicate, &mut params);

    let select_clause = if count_only {
        "SELECT COUNT(*)"
    } else {
        "SELECT DISTINCT"
    };
    let columns = if count_only { "" } else { OBJECT_COLUMNS };

    let mut sql = format!(
        "{select_clause} {columns}
FROM {from}
WHERE {where_clause}",
        select_clause = select_clause,
        columns = columns,
        from = OBJECT_FROM,
        where_clause = where_clause,
    );

    if !count_only {
        let order_by = match plan.sort_by {
            SortMode::Newest => "o.upload_time DESC, o.id DESC",
            SortMode::Oldest => "o.upload_time ASC, o.id ASC",
        };
        sql.push_str(&format!("\nORDER BY {}\n", order_by));
        sql.push_str("LIMIT ?");
        params.push(SqlValue::Integer(plan.limit as i64));
    }

    (sql, params)
}

/// Builds the lookup of a pagination pivot, restricted to what `principal`
/// can see.
pub fn build_position_query(dhash: &str, principal: &Principal) -> (String, Vec<SqlValue>) {
    let mut params = vec![SqlValue::Text(dhash.to_string())];
    let access = render_predicate(&principal.access_predicate(OBJECT_ID), &mut params);
    let sql = format!(
        "SELECT o.id, o.upload_time FROM object o WHERE {} = ? AND {}",
        OBJECT_DHASH, access
    );
    (sql, params)
}

/// Renders `predicate`, appending its parameters in placeholder order.
pub fn render_predicate(predicate: &Predicate, params: &mut Vec<SqlValue>) -> String {
    match predicate {
        Predicate::Const(true) => "1 = 1".to_string(),
        Predicate::Const(false) => "1 = 0".to_string(),
        Predicate::Compare { operand, op, value } => {
            let lhs = render_operand(operand, params);
            params.push(sql_value(value));
            format!("{} {} ?", lhs, op.as_sql())
        }
        Predicate::Like { operand, pattern } => {
            let lhs = render_operand(operand, params);
            params.push(SqlValue::Text(pattern.clone()));
            format!("{} LIKE ? ESCAPE '\\'", lhs)
        }
        Predicate::InList { values, .. } if values.is_empty() => "1 = 0".to_string(),
        Predicate::InList { operand, values } => {
            let lhs = render_operand(operand, params);
            params.extend(values.iter().map(sql_value));
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{} IN ({})", lhs, placeholders)
        }
        Predicate::And(parts) if parts.is_empty() => "1 = 1".to_string(),
        Predicate::Or(parts) if parts.is_empty() => "1 = 0".to_string(),
        Predicate::And(parts) => render_joined(parts, " AND ", params),
        Predicate::Or(parts) => render_joined(parts, " OR ", params),
        Predicate::Not(inner) => format!("NOT ({})", render_predicate(inner, params)),
        Predicate::Exists {
            relation,
            outer,
            condition,
        } => format!(
            "EXISTS (SELECT 1 FROM {} WHERE {} = {} AND {})",
            relation.source,
            relation.link,
            outer,
            render_predicate(condition, params)
        ),
    }
}

fn render_joined(parts: &[Predicate], separator: &str, params: &mut Vec<SqlValue>) -> String {
    let rendered: Vec<String> = parts
        .iter()
        .map(|part| render_predicate(part, params))
        .collect();
    format!("({})", rendered.join(separator))
}

fn render_operand(operand: &Operand, params: &mut Vec<SqlValue>) -> String {
    match operand {
        Operand::Column(column) => column.to_string(),
        // json_extract yields 1/0 for JSON booleans; keep their JSON text.
        Operand::JsonText { column, path } => {
            params.push(SqlValue::Text(path.clone()));
            params.push(SqlValue::Text(path.clone()));
            format!(
                "CASE json_type({col}, ?) WHEN 'true' THEN 'true' WHEN 'false' THEN 'false' \
                 ELSE CAST(json_extract({col}, ?) AS TEXT) END",
                col = column
            )
        }
    }
}

pub(crate) fn sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Text(text) => SqlValue::Text(text.clone()),
        Value::Integer(number) => SqlValue::Integer(*number),
        Value::DateTime(datetime) => SqlValue::Text(datetime.format(DATETIME_FORMAT).to_string()),
    }
}
