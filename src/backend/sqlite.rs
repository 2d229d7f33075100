//! SQLite backend implementation.
//!
//! SqliteBackend implements both storage traits over a rusqlite
//! [`Connection`] holding the repository schema from [`crate::schema`].

use super::{ObjectRepository, Storage};
use crate::error::SearchError;
use crate::model::{
    AttributeDefinition, AttributePermission, Capability, Group, ObjectDetails, ObjectKind,
    ObjectPosition, ObjectRow, User,
};
use crate::predicate::DATETIME_FORMAT;
use crate::principal::Principal;
use crate::query::{build_object_query, build_position_query, QueryPlan};
use crate::schema::SCHEMA;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, warn};

/// SQLite backend implementation.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open a repository database.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    pub fn open(db_path: &Path) -> Result<Self, SearchError> {
        debug!(path = %db_path.display(), "opening repository database");
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, SearchError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    /// Wrap an existing connection.
    ///
    /// `LIKE` is switched to case-sensitive matching so that wildcard and
    /// exact comparisons agree.
    pub fn from_connection(conn: Connection) -> Result<Self, SearchError> {
        conn.execute_batch("PRAGMA case_sensitive_like = ON; PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    /// Create any missing repository tables.
    pub fn ensure_schema(&self) -> Result<(), SearchError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Build the principal for `login`: its groups and the union of their
    /// capabilities.
    pub fn load_principal(&self, login: &str) -> Result<Principal, SearchError> {
        let user = self
            .user_by_login(login)?
            .ok_or_else(|| SearchError::not_found(format!("No such user: {}", login)))?;

        let mut stmt = self.conn.prepare(
            "SELECT g.id, g.name, g.capabilities
             FROM member m JOIN \"group\" g ON g.id = m.group_id
             WHERE m.user_id = ?
             ORDER BY g.id",
        )?;
        let rows = stmt.query_map(params![user.id], |row| {
            Ok((
                Group {
                    id: row.get(0)?,
                    name: row.get(1)?,
                },
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut principal = Principal::new(user.id, user.login);
        for row in rows {
            let (group, capabilities) = row?;
            for name in serde_json::from_str::<Vec<String>>(&capabilities)? {
                match Capability::from_name(&name) {
                    Some(capability) => principal = principal.with_capability(capability),
                    None => warn!(group = %group.name, capability = %name, "ignoring unknown capability"),
                }
            }
            principal = principal.with_group(group);
        }
        Ok(principal)
    }

    /// SQLite's plan for `plan`, one line per step.
    pub fn explain_query_plan(&self, plan: &QueryPlan) -> Result<Vec<String>, SearchError> {
        let (sql, params) = build_object_query(plan, false);
        let mut stmt = self.conn.prepare(&format!("EXPLAIN QUERY PLAN {}", sql))?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| row.get::<_, String>(3))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl ObjectRepository for SqliteBackend {
    fn group_by_name(&self, name: &str) -> Result<Option<Group>, SearchError> {
        let group = self
            .conn
            .query_row(
                "SELECT id, name FROM \"group\" WHERE name = ?",
                params![name],
                |row| {
                    Ok(Group {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(group)
    }

    fn user_by_login(&self, login: &str) -> Result<Option<User>, SearchError> {
        let user = self
            .conn
            .query_row(
                "SELECT id, login FROM user WHERE login = ?",
                params![login],
                |row| {
                    Ok(User {
                        id: row.get(0)?,
                        login: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    fn attribute_definition(&self, key: &str) -> Result<Option<AttributeDefinition>, SearchError> {
        let definition = self
            .conn
            .query_row(
                "SELECT key, label, url_template, hidden FROM attribute_definition WHERE key = ?",
                params![key],
                |row| {
                    Ok(AttributeDefinition {
                        key: row.get(0)?,
                        label: row.get(1)?,
                        url_template: row.get(2)?,
                        hidden: row.get(3)?,
                        permissions: Vec::new(),
                    })
                },
            )
            .optional()?;
        let Some(mut definition) = definition else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT group_id, can_read, can_set FROM attribute_permission WHERE key = ?",
        )?;
        let rows = stmt.query_map(params![key], |row| {
            Ok(AttributePermission {
                group_id: row.get(0)?,
                can_read: row.get(1)?,
                can_set: row.get(2)?,
            })
        })?;
        definition.permissions = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(Some(definition))
    }

    fn object_position(
        &self,
        dhash: &str,
        principal: &Principal,
    ) -> Result<Option<ObjectPosition>, SearchError> {
        let (sql, params) = build_position_query(dhash, principal);
        let position = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| {
                Ok(ObjectPosition {
                    id: row.get(0)?,
                    upload_time: datetime_column(row, 1)?,
                })
            })
            .optional()?;
        Ok(position)
    }
}

impl Storage for SqliteBackend {
    fn execute(&self, plan: &QueryPlan) -> Result<Vec<ObjectRow>, SearchError> {
        let (sql, params) = build_object_query(plan, false);
        debug!(kind = %plan.kind, params = params.len(), "executing search query");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), decode_object_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, SearchError> {
        let (sql, params) = build_object_query(plan, true);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(params.iter()), |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// Decode one row selected with the object column list.
fn decode_object_row(row: &Row<'_>) -> rusqlite::Result<ObjectRow> {
    let type_tag: String = row.get(2)?;
    let details = match ObjectKind::from_type_tag(&type_tag) {
        Some(ObjectKind::File) => ObjectDetails::File {
            file_name: row.get(4)?,
            file_size: row.get(5)?,
            file_type: row.get(6)?,
            md5: row.get(7)?,
            sha1: row.get(8)?,
            sha256: row.get(9)?,
            sha512: row.get(10)?,
            crc32: row.get(11)?,
            ssdeep: row.get(12)?,
        },
        Some(ObjectKind::Config) => {
            let cfg: String = row.get(15)?;
            ObjectDetails::Config {
                family: row.get(13)?,
                config_type: row.get(14)?,
                cfg: serde_json::from_str(&cfg).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(15, Type::Text, Box::new(e))
                })?,
            }
        }
        Some(ObjectKind::TextBlob) => ObjectDetails::TextBlob {
            blob_name: row.get(16)?,
            blob_size: row.get(17)?,
            blob_type: row.get(18)?,
            last_seen: datetime_column(row, 19)?,
        },
        Some(ObjectKind::Object) | None => ObjectDetails::Object,
    };

    Ok(ObjectRow {
        id: row.get(0)?,
        dhash: row.get(1)?,
        upload_time: datetime_column(row, 3)?,
        details,
    })
}

fn datetime_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, DATETIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
