//! Abstract boolean predicates over repository columns.
//!
//! The query compiler only ever produces these values; turning them into SQL
//! happens in a single step in [`crate::query::builder`]. Column and table
//! identifiers are `&'static str` taken from [`crate::schema`], so user input
//! can only reach the database through bound [`Value`]s.

use chrono::NaiveDateTime;
use std::fmt;

/// Storage format of datetime values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A column of one of the aliased tables in the object query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Column {
    pub table: &'static str,
    pub name: &'static str,
}

impl Column {
    pub const fn new(table: &'static str, name: &'static str) -> Self {
        Self { table, name }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.name)
    }
}

/// A related table reached through a correlated subquery.
///
/// `source` is the FROM clause of the subquery and `link` the column that
/// must equal the outer object id.
#[derive(Debug, PartialEq, Eq)]
pub struct Relation {
    pub source: &'static str,
    pub link: Column,
}

/// Left-hand side of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Column(Column),
    /// Text rendering of the JSON value at `path` (SQLite JSON path syntax)
    /// inside a JSON document column.
    JsonText { column: Column, path: String },
}

impl From<Column> for Operand {
    fn from(column: Column) -> Self {
        Operand::Column(column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Value::Text(value.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "'{}'", text.replace('\'', "''")),
            Value::Integer(number) => write!(f, "{}", number),
            Value::DateTime(datetime) => write!(f, "'{}'", datetime.format(DATETIME_FORMAT)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn as_sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// Composable boolean condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Const(bool),
    Compare {
        operand: Operand,
        op: CmpOp,
        value: Value,
    },
    /// `LIKE` with `\` as the escape character.
    Like { operand: Operand, pattern: String },
    InList { operand: Operand, values: Vec<Value> },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// Some row of `relation` linked to `outer` satisfies `condition`.
    Exists {
        relation: &'static Relation,
        outer: Column,
        condition: Box<Predicate>,
    },
}

impl Predicate {
    pub fn compare(operand: impl Into<Operand>, op: CmpOp, value: Value) -> Self {
        Predicate::Compare {
            operand: operand.into(),
            op,
            value,
        }
    }

    pub fn eq(operand: impl Into<Operand>, value: Value) -> Self {
        Self::compare(operand, CmpOp::Eq, value)
    }

    pub fn exists(relation: &'static Relation, outer: Column, condition: Predicate) -> Self {
        Predicate::Exists {
            relation,
            outer,
            condition: Box::new(condition),
        }
    }

    /// Conjunction; a single part is returned unwrapped.
    pub fn all(mut parts: Vec<Predicate>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::And(parts)
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }
}
