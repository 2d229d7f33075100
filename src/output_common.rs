//! Shared output formatting utilities for all response types.

use crate::error::SearchError;
use crate::model::ObjectRow;
use crate::output::{json_response, OutputFormat};
use crate::predicate::DATETIME_FORMAT;
use serde::Serialize;

/// Render any serializable response inside the JSON envelope
pub fn render_json_response<T: Serialize>(
    data: &T,
    format: OutputFormat,
) -> Result<String, SearchError> {
    let payload = json_response(data);
    let rendered = if matches!(format, OutputFormat::Pretty) {
        serde_json::to_string_pretty(&payload)
    } else {
        serde_json::to_string(&payload)
    }?;
    Ok(rendered)
}

/// Format the "total: N" header for human-readable output
pub fn format_total_header(total: u64) -> String {
    format!("total: {}", total)
}

/// One search hit as a human-readable line
pub fn format_object_line(row: &ObjectRow) -> String {
    let line = format!(
        "{}  {:<6}  {}",
        row.upload_time.format(DATETIME_FORMAT),
        row.kind().to_string(),
        row.dhash
    );
    match row.label() {
        "" => line,
        label => format!("{}  {}", line, label),
    }
}

/// Check if format is JSON (either Json or Pretty)
pub fn is_json_format(format: OutputFormat) -> bool {
    matches!(format, OutputFormat::Json | OutputFormat::Pretty)
}
