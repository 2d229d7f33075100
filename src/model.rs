//! Repository entities as seen by the search subsystem.
//!
//! Everything here is read-only from the compiler's point of view; rows are
//! created by the ingestion side of the repository.

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::Serialize;
use std::fmt;

/// Object subtype a query is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Generic object, compatible with every concrete subtype.
    Object,
    File,
    #[value(alias = "static")]
    Config,
    #[value(name = "blob")]
    TextBlob,
}

impl ObjectKind {
    /// Resolves a query prefix such as `file` or `static`.
    pub fn from_alias(alias: &str) -> Option<Self> {
        match alias {
            "object" => Some(ObjectKind::Object),
            "file" => Some(ObjectKind::File),
            "static" | "config" => Some(ObjectKind::Config),
            "blob" => Some(ObjectKind::TextBlob),
            _ => None,
        }
    }

    /// Value of `object.type` for concrete kinds.
    pub fn type_tag(self) -> Option<&'static str> {
        match self {
            ObjectKind::Object => None,
            ObjectKind::File => Some("file"),
            ObjectKind::Config => Some("static_config"),
            ObjectKind::TextBlob => Some("text_blob"),
        }
    }

    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "file" => Some(ObjectKind::File),
            "static_config" => Some(ObjectKind::Config),
            "text_blob" => Some(ObjectKind::TextBlob),
            _ => None,
        }
    }

    pub fn is_concrete(self) -> bool {
        self != ObjectKind::Object
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Object => "object",
            ObjectKind::File => "file",
            ObjectKind::Config => "config",
            ObjectKind::TextBlob => "blob",
        };
        f.write_str(name)
    }
}

/// Global permission held through group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ManageUsers,
    ReadingAllAttributes,
    AccessAllObjects,
}

impl Capability {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "manage_users" => Some(Capability::ManageUsers),
            "reading_all_attributes" => Some(Capability::ReadingAllAttributes),
            "access_all_objects" => Some(Capability::AccessAllObjects),
            _ => None,
        }
    }
}

/// Why a group holds an ObjectPermission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareReason {
    Added,
    Shared,
    Queried,
    Migrated,
}

impl ShareReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ShareReason::Added => "added",
            ShareReason::Shared => "shared",
            ShareReason::Queried => "queried",
            ShareReason::Migrated => "migrated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributePermission {
    pub group_id: i64,
    pub can_read: bool,
    pub can_set: bool,
}

/// Declared attribute key together with its per-group permission rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeDefinition {
    pub key: String,
    pub label: String,
    pub url_template: Option<String>,
    pub hidden: bool,
    pub permissions: Vec<AttributePermission>,
}

/// Keyset pagination pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectPosition {
    pub id: i64,
    pub upload_time: NaiveDateTime,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectRow {
    pub id: i64,
    pub dhash: String,
    pub upload_time: NaiveDateTime,
    #[serde(flatten)]
    pub details: ObjectDetails,
}

impl ObjectRow {
    pub fn kind(&self) -> ObjectKind {
        match self.details {
            ObjectDetails::Object => ObjectKind::Object,
            ObjectDetails::File { .. } => ObjectKind::File,
            ObjectDetails::Config { .. } => ObjectKind::Config,
            ObjectDetails::TextBlob { .. } => ObjectKind::TextBlob,
        }
    }

    /// Short human label: file name, config family or blob name.
    pub fn label(&self) -> &str {
        match &self.details {
            ObjectDetails::Object => "",
            ObjectDetails::File { file_name, .. } => file_name,
            ObjectDetails::Config { family, .. } => family,
            ObjectDetails::TextBlob { blob_name, .. } => blob_name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectDetails {
    Object,
    File {
        file_name: String,
        file_size: i64,
        file_type: String,
        md5: String,
        sha1: String,
        sha256: String,
        sha512: String,
        crc32: String,
        ssdeep: Option<String>,
    },
    #[serde(rename = "static_config")]
    Config {
        family: String,
        config_type: String,
        cfg: serde_json::Value,
    },
    TextBlob {
        blob_name: String,
        blob_size: i64,
        blob_type: String,
        last_seen: NaiveDateTime,
    },
}
