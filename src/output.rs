use crate::model::{ObjectKind, ObjectRow};
use chrono::Utc;
use clap::ValueEnum;
use rusqlite::types::Value as SqlValue;
use serde::Serialize;
use std::fmt;

const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
        };
        write!(f, "{}", value)
    }
}

#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub schema_version: &'static str,
    pub execution_id: String,
    pub tool: &'static str,
    pub timestamp: String,
    pub data: T,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    pub message: String,
    /// Character offset into the query, for parse errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    pub remediation: Option<String>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<ObjectRow>,
    pub query: String,
    pub object_type: ObjectKind,
    pub total_count: u64,
    pub limit: usize,
}

#[derive(Serialize)]
pub struct ExplainResponse {
    pub query: String,
    pub object_type: ObjectKind,
    pub sql: String,
    pub params: Vec<serde_json::Value>,
    /// SQLite `EXPLAIN QUERY PLAN` detail lines
    pub plan: Vec<String>,
}

pub fn json_response<T>(data: T) -> JsonResponse<T> {
    JsonResponse {
        schema_version: SCHEMA_VERSION,
        execution_id: execution_id(),
        tool: "malsearch",
        timestamp: Utc::now().to_rfc3339(),
        data,
    }
}

pub fn execution_id() -> String {
    let timestamp = Utc::now().timestamp();
    let pid = std::process::id();
    format!("{:x}-{:x}", timestamp, pid)
}

/// Bound SQL parameters as JSON values.
pub fn params_to_json(params: &[SqlValue]) -> Vec<serde_json::Value> {
    params
        .iter()
        .map(|value| match value {
            SqlValue::Null => serde_json::Value::Null,
            SqlValue::Integer(number) => serde_json::Value::from(*number),
            SqlValue::Real(number) => serde_json::Value::from(*number),
            SqlValue::Text(text) => serde_json::Value::from(text.as_str()),
            SqlValue::Blob(bytes) => serde_json::Value::from(format!("<{} bytes>", bytes.len())),
        })
        .collect()
}
