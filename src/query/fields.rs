//! Field registry: maps dotted query field paths to resolution strategies.
//!
//! A path such as `file.name`, `static.cfg.urls.main`, `tag` or
//! `meta.malware_family` is classified into the object kind it applies to,
//! the strategy used to build its condition, and the residual path segments
//! the strategy consumes (JSON path or attribute key).
//!
//! Lookup walks the tables in a fixed priority order (JSON paths,
//! multi-valued collections, attributes, sharing relations, plain columns)
//! and, within a table, prefers an entry of the bound kind over the generic
//! object entry that every kind inherits.

use crate::error::SearchError;
use crate::model::ObjectKind;
use crate::predicate::{Column, Relation};
use crate::schema::*;

/// Value type of a plain column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
}

/// How a field's condition is built.
#[derive(Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Scalar column compared directly.
    Direct { column: Column, column_type: ColumnType },
    /// Datetime column matched by day/minute/second windows.
    DateTime { column: Column },
    /// Any related row's `value` column matches.
    List {
        relation: &'static Relation,
        value: Column,
    },
    /// Leaf of a JSON document column, addressed by the residual path.
    Json { column: Column },
    /// `meta.<key>[.subpath]`
    Attribute,
    /// Objects shared with a group.
    Share,
    /// Objects added by a user.
    Uploader,
}

impl FieldKind {
    fn accepts_subfields(&self) -> bool {
        matches!(self, FieldKind::Json { .. } | FieldKind::Attribute)
    }
}

#[derive(Debug)]
pub struct FieldEntry {
    pub kind: ObjectKind,
    pub name: &'static str,
    pub field: FieldKind,
}

const fn text(kind: ObjectKind, name: &'static str, column: Column) -> FieldEntry {
    FieldEntry {
        kind,
        name,
        field: FieldKind::Direct {
            column,
            column_type: ColumnType::Text,
        },
    }
}

const fn integer(kind: ObjectKind, name: &'static str, column: Column) -> FieldEntry {
    FieldEntry {
        kind,
        name,
        field: FieldKind::Direct {
            column,
            column_type: ColumnType::Integer,
        },
    }
}

const fn datetime(kind: ObjectKind, name: &'static str, column: Column) -> FieldEntry {
    FieldEntry {
        kind,
        name,
        field: FieldKind::DateTime { column },
    }
}

const fn list(
    kind: ObjectKind,
    name: &'static str,
    relation: &'static Relation,
    value: Column,
) -> FieldEntry {
    FieldEntry {
        kind,
        name,
        field: FieldKind::List { relation, value },
    }
}

static JSON_FIELDS: [FieldEntry; 1] = [FieldEntry {
    kind: ObjectKind::Config,
    name: "cfg",
    field: FieldKind::Json { column: CONFIG_CFG },
}];

static LIST_FIELDS: [FieldEntry; 3] = [
    list(ObjectKind::Object, "tag", &TAGS, TAG_VALUE),
    list(ObjectKind::Object, "comment", &COMMENTS, COMMENT_VALUE),
    list(ObjectKind::File, "alt_name", &ALT_NAMES, ALT_NAME_VALUE),
];

static ATTRIBUTE_FIELDS: [FieldEntry; 2] = [
    FieldEntry {
        kind: ObjectKind::Object,
        name: "meta",
        field: FieldKind::Attribute,
    },
    FieldEntry {
        kind: ObjectKind::Object,
        name: "attribute",
        field: FieldKind::Attribute,
    },
];

static RELATION_FIELDS: [FieldEntry; 2] = [
    FieldEntry {
        kind: ObjectKind::Object,
        name: "shared",
        field: FieldKind::Share,
    },
    FieldEntry {
        kind: ObjectKind::Object,
        name: "uploader",
        field: FieldKind::Uploader,
    },
];

static PLAIN_FIELDS: [FieldEntry; 19] = [
    text(ObjectKind::Object, "dhash", OBJECT_DHASH),
    datetime(ObjectKind::Object, "upload_time", OBJECT_UPLOAD_TIME),
    text(ObjectKind::File, "name", FILE_NAME),
    integer(ObjectKind::File, "size", FILE_SIZE),
    text(ObjectKind::File, "type", FILE_TYPE),
    text(ObjectKind::File, "md5", FILE_MD5),
    text(ObjectKind::File, "sha1", FILE_SHA1),
    text(ObjectKind::File, "sha256", FILE_SHA256),
    text(ObjectKind::File, "sha512", FILE_SHA512),
    text(ObjectKind::File, "crc32", FILE_CRC32),
    text(ObjectKind::File, "ssdeep", FILE_SSDEEP),
    text(ObjectKind::Config, "family", CONFIG_FAMILY),
    text(ObjectKind::Config, "type", CONFIG_TYPE),
    text(ObjectKind::TextBlob, "name", BLOB_NAME),
    integer(ObjectKind::TextBlob, "size", BLOB_SIZE),
    text(ObjectKind::TextBlob, "type", BLOB_TYPE),
    text(ObjectKind::TextBlob, "content", BLOB_CONTENT),
    datetime(ObjectKind::TextBlob, "first_seen", OBJECT_UPLOAD_TIME),
    datetime(ObjectKind::TextBlob, "last_seen", BLOB_LAST_SEEN),
];

/// Tables in classification priority order.
static FIELD_TABLES: [&[FieldEntry]; 5] = [
    &JSON_FIELDS,
    &LIST_FIELDS,
    &ATTRIBUTE_FIELDS,
    &RELATION_FIELDS,
    &PLAIN_FIELDS,
];

/// Outcome of classifying a field path.
#[derive(Debug, PartialEq, Eq)]
pub struct ResolvedField {
    /// Full path as written, for messages.
    pub path: String,
    /// Kind the field belongs to: the alias prefix if one was written,
    /// otherwise the kind already bound by the query.
    pub kind: ObjectKind,
    pub field: &'static FieldKind,
    /// Segments left for the strategy: JSON path or attribute key and subpath.
    pub residual: Vec<String>,
}

/// Finds the entry for `name` on `kind`, including inherited object fields.
pub fn lookup(kind: ObjectKind, name: &str) -> Option<&'static FieldEntry> {
    FIELD_TABLES.iter().find_map(|table| {
        table
            .iter()
            .find(|entry| entry.kind == kind && entry.name == name)
            .or_else(|| {
                table
                    .iter()
                    .find(|entry| entry.kind == ObjectKind::Object && entry.name == name)
            })
    })
}

/// Classifies `path` given the kind bound so far (`None` if nothing is bound).
pub fn resolve(path: &str, bound: Option<ObjectKind>) -> Result<ResolvedField, SearchError> {
    let segments: Vec<&str> = path.split('.').collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(SearchError::not_queryable(format!(
            "Field '{}' contains an empty path segment",
            path
        )));
    }

    let (kind, rest) = match ObjectKind::from_alias(segments[0]) {
        Some(kind) => (kind, &segments[1..]),
        None => (bound.unwrap_or(ObjectKind::Object), &segments[..]),
    };

    let Some((name, residual)) = rest.split_first() else {
        return Err(SearchError::not_queryable(format!(
            "Missing field name after '{}'",
            path
        )));
    };

    let entry = lookup(kind, name).ok_or_else(|| {
        SearchError::not_queryable(format!("Field '{}' is not queryable for {} objects", path, kind))
    })?;

    if !residual.is_empty() && !entry.field.accepts_subfields() {
        return Err(SearchError::not_queryable(format!(
            "Field '{}' doesn't have subfields",
            name
        )));
    }
    if residual.is_empty() && entry.field == FieldKind::Attribute {
        return Err(SearchError::not_queryable(format!(
            "Missing attribute key in '{}'",
            path
        )));
    }

    Ok(ResolvedField {
        path: path.to_string(),
        kind,
        field: &entry.field,
        residual: residual.iter().map(|s| s.to_string()).collect(),
    })
}
