use std::fs::File;
use std::path::Path;

use anyhow::Result;
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use time::{format_description::well_known, OffsetDateTime};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::table::{cell_text, Column, Session};
use crate::types::{DisplayMode, LookupRecord};

/// Serialize `records` as CSV over `columns`, exactly as they are ordered on screen.
///
/// The header row holds the column keys. Every field is quoted, embedded quotes are
/// doubled and absent values are empty strings.
pub fn to_csv(records: &[LookupRecord], columns: &[Column]) -> Result<String, PipelineError> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    wtr.write_record(columns.iter().map(|c| c.key))?;
    for record in records {
        wtr.write_record(
            columns
                .iter()
                .map(|c| cell_text(record, c.key).unwrap_or_default()),
        )?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| PipelineError::Unexpected(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Unexpected(e.to_string()))
}

/// Export the session's current view. Fails when there is nothing on screen.
pub fn export_current(session: &Session) -> Result<String, PipelineError> {
    if !session.export_available() {
        return Err(PipelineError::NothingToExport);
    }
    debug!(rows = session.records().len(), "exporting current view");
    to_csv(session.records(), session.columns())
}

/// Write the current view as CSV to `path`.
pub fn write_csv(session: &Session, path: &Path) -> Result<()> {
    let doc = export_current(session)?;
    std::fs::write(path, doc)?;
    info!(rows = session.records().len(), path = %path.display(), "wrote CSV report");
    Ok(())
}

#[derive(Serialize)]
struct JsonSnapshot<'a> {
    generated_at: String,
    mode: DisplayMode,
    records: &'a [LookupRecord],
}

/// Write the current result set as pretty JSON.
pub fn write_json(session: &Session, path: &Path) -> Result<()> {
    let snapshot = JsonSnapshot {
        generated_at: now_rfc3339(),
        mode: session.mode(),
        records: session.records(),
    };
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, &snapshot)?;
    info!(rows = snapshot.records.len(), path = %path.display(), "wrote JSON snapshot");
    Ok(())
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&well_known::Rfc3339)
        .unwrap_or_else(|_| String::from("1970-01-01T00:00:00Z"))
}
