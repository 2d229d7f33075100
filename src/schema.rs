//! Relational layout of the object repository.
//!
//! Object queries always alias the tables the same way:
//!
//! | alias | table |
//! |---|---|
//! | `o` | `object` |
//! | `f` | `file` |
//! | `c` | `static_config` |
//! | `b` | `text_blob` |
//!
//! Related tables are only reached through correlated `EXISTS` subqueries
//! described by the [`Relation`] statics below.

use crate::predicate::{Column, Relation};

pub const OBJECT_ID: Column = Column::new("o", "id");
pub const OBJECT_DHASH: Column = Column::new("o", "dhash");
pub const OBJECT_TYPE: Column = Column::new("o", "type");
pub const OBJECT_UPLOAD_TIME: Column = Column::new("o", "upload_time");

pub const FILE_NAME: Column = Column::new("f", "file_name");
pub const FILE_SIZE: Column = Column::new("f", "file_size");
pub const FILE_TYPE: Column = Column::new("f", "file_type");
pub const FILE_MD5: Column = Column::new("f", "md5");
pub const FILE_SHA1: Column = Column::new("f", "sha1");
pub const FILE_SHA256: Column = Column::new("f", "sha256");
pub const FILE_SHA512: Column = Column::new("f", "sha512");
pub const FILE_CRC32: Column = Column::new("f", "crc32");
pub const FILE_SSDEEP: Column = Column::new("f", "ssdeep");

pub const CONFIG_FAMILY: Column = Column::new("c", "family");
pub const CONFIG_TYPE: Column = Column::new("c", "config_type");
pub const CONFIG_CFG: Column = Column::new("c", "cfg");

pub const BLOB_NAME: Column = Column::new("b", "blob_name");
pub const BLOB_SIZE: Column = Column::new("b", "blob_size");
pub const BLOB_TYPE: Column = Column::new("b", "blob_type");
pub const BLOB_CONTENT: Column = Column::new("b", "content");
pub const BLOB_LAST_SEEN: Column = Column::new("b", "last_seen");

pub const TAG_VALUE: Column = Column::new("t", "tag");
pub const COMMENT_VALUE: Column = Column::new("cm", "comment");
pub const ALT_NAME_VALUE: Column = Column::new("fa", "name");
pub const ATTRIBUTE_KEY: Column = Column::new("a", "key");
pub const ATTRIBUTE_VALUE: Column = Column::new("a", "value");
pub const PERMISSION_GROUP: Column = Column::new("p", "group_id");
pub const PERMISSION_USER: Column = Column::new("p", "related_user_id");
pub const PERMISSION_REASON: Column = Column::new("p", "reason_type");

pub static TAGS: Relation = Relation {
    source: "object_tag ot JOIN tag t ON t.id = ot.tag_id",
    link: Column::new("ot", "object_id"),
};

pub static COMMENTS: Relation = Relation {
    source: "comment cm",
    link: Column::new("cm", "object_id"),
};

pub static ALT_NAMES: Relation = Relation {
    source: "file_alt_name fa",
    link: Column::new("fa", "file_id"),
};

pub static ATTRIBUTES: Relation = Relation {
    source: "attribute a",
    link: Column::new("a", "object_id"),
};

pub static PERMISSIONS: Relation = Relation {
    source: "permission p",
    link: Column::new("p", "object_id"),
};

/// FROM clause shared by every object query.
pub const OBJECT_FROM: &str = "object o
LEFT JOIN file f ON f.id = o.id
LEFT JOIN static_config c ON c.id = o.id
LEFT JOIN text_blob b ON b.id = o.id";

/// Schema used by `init-db` and the test fixtures.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS object (
    id INTEGER PRIMARY KEY,
    dhash TEXT NOT NULL UNIQUE,
    type TEXT NOT NULL,
    upload_time TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_object_upload_time ON object(upload_time, id);
CREATE TABLE IF NOT EXISTS file (
    id INTEGER PRIMARY KEY REFERENCES object(id) ON DELETE CASCADE,
    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    file_type TEXT NOT NULL,
    md5 TEXT NOT NULL,
    sha1 TEXT NOT NULL,
    sha256 TEXT NOT NULL,
    sha512 TEXT NOT NULL,
    crc32 TEXT NOT NULL,
    ssdeep TEXT
);
CREATE TABLE IF NOT EXISTS file_alt_name (
    file_id INTEGER NOT NULL REFERENCES file(id) ON DELETE CASCADE,
    name TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS static_config (
    id INTEGER PRIMARY KEY REFERENCES object(id) ON DELETE CASCADE,
    family TEXT NOT NULL,
    config_type TEXT NOT NULL,
    cfg TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS text_blob (
    id INTEGER PRIMARY KEY REFERENCES object(id) ON DELETE CASCADE,
    blob_name TEXT NOT NULL,
    blob_size INTEGER NOT NULL,
    blob_type TEXT NOT NULL,
    content TEXT NOT NULL,
    last_seen TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tag (
    id INTEGER PRIMARY KEY,
    tag TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS object_tag (
    object_id INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
    PRIMARY KEY (object_id, tag_id)
);
CREATE TABLE IF NOT EXISTS comment (
    id INTEGER PRIMARY KEY,
    object_id INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
    user_id INTEGER,
    comment TEXT NOT NULL,
    timestamp TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attribute (
    id INTEGER PRIMARY KEY,
    object_id INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
    key TEXT NOT NULL,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS attribute_definition (
    key TEXT PRIMARY KEY,
    label TEXT NOT NULL DEFAULT '',
    url_template TEXT,
    hidden INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS attribute_permission (
    key TEXT NOT NULL REFERENCES attribute_definition(key) ON DELETE CASCADE,
    group_id INTEGER NOT NULL,
    can_read INTEGER NOT NULL DEFAULT 0,
    can_set INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (key, group_id)
);
CREATE TABLE IF NOT EXISTS user (
    id INTEGER PRIMARY KEY,
    login TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS \"group\" (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    capabilities TEXT NOT NULL DEFAULT '[]'
);
CREATE TABLE IF NOT EXISTS member (
    user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES \"group\"(id) ON DELETE CASCADE,
    PRIMARY KEY (user_id, group_id)
);
CREATE TABLE IF NOT EXISTS permission (
    object_id INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
    group_id INTEGER NOT NULL REFERENCES \"group\"(id) ON DELETE CASCADE,
    reason_type TEXT NOT NULL,
    related_user_id INTEGER,
    PRIMARY KEY (object_id, group_id)
);
CREATE TABLE IF NOT EXISTS relation (
    parent_id INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
    child_id INTEGER NOT NULL REFERENCES object(id) ON DELETE CASCADE,
    PRIMARY KEY (parent_id, child_id)
);
";
