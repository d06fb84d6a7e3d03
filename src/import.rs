//! Batch import of draw files.
//!
//! Each `*.json` file holds either one draw object or an array of them, in
//! the same raw field shape a form would submit. Bad draws are logged and
//! skipped; they never abort the batch.

use crate::Fields;
use crate::database::{get_draw_dates, insert_draw};
use crate::draw::DrawSchema;
use crate::error::{StoreError, StoreResult};
use crate::utils::missing_draw_dates;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Default, Serialize)]
pub struct ImportSummary {
    pub files: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: Vec<Rejection>,
    pub missing_dates: Vec<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct Rejection {
    pub source: String,
    pub reason: String,
}

/// Split a file's JSON into draw field maps.
pub fn parse_draw_file(raw_json: &str) -> Result<Vec<Fields>, String> {
    let value: Value = serde_json::from_str(raw_json).map_err(|e| e.to_string())?;
    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(map) => Ok(map),
                other => Err(format!("entry {i} is not an object: {other}")),
            })
            .collect(),
        other => Err(format!("expected an object or an array, got {other}")),
    }
}

/// Validate and store every draw in `fields`, tallying into `summary`.
pub fn import_draws(
    conn: &Connection,
    source: &str,
    fields: &[Fields],
    summary: &mut ImportSummary,
) -> StoreResult<()> {
    for (i, entry) in fields.iter().enumerate() {
        let label = format!("{source}#{i}");
        let draw = match DrawSchema::create(entry) {
            Ok(draw) => draw,
            Err(e) => {
                warn!(source = %label, "{}", e);
                summary.rejected.push(Rejection {
                    source: label,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match insert_draw(conn, &draw) {
            Ok(_) => summary.inserted += 1,
            Err(StoreError::AlreadyExists { id, .. }) => {
                info!(source = %label, date = %id, "draw already stored, skipping");
                summary.duplicates += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

pub fn import_directory(conn: &Connection, dir: &Path) -> StoreResult<ImportSummary> {
    let mut summary = ImportSummary::default();

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();

    for path in paths {
        info!("Reading file: {:?}", path);
        summary.files += 1;
        let source = path.display().to_string();

        let parsed = fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|raw| parse_draw_file(&raw));

        match parsed {
            Ok(fields) => import_draws(conn, &source, &fields, &mut summary)?,
            Err(reason) => {
                warn!(source = %source, "unreadable draw file: {}", reason);
                summary.rejected.push(Rejection { source, reason });
            }
        }
    }

    summary.missing_dates = missing_draw_dates(&get_draw_dates(conn)?);
    if !summary.missing_dates.is_empty() {
        warn!(
            count = summary.missing_dates.len(),
            "draw dates without a record between the oldest and newest draw"
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_object_and_array_files() {
        assert_eq!(parse_draw_file(r#"{"date": "2025-06-21"}"#).unwrap().len(), 1);
        assert_eq!(parse_draw_file(r#"[{}, {}]"#).unwrap().len(), 2);
        assert!(parse_draw_file(r#"[{}, 3]"#).is_err());
        assert!(parse_draw_file("42").is_err());
        assert!(parse_draw_file("not json").is_err());
    }
}
