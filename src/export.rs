//! CSV export of an author batch.
//!
//! Columns appear in a fixed order. An optional column that is unknown for
//! every row is dropped entirely; `source_file`, `name` and `role` are always
//! written, so even an empty batch yields a header row.

use crate::error::ExtractError;
use crate::output::AuthorRecord;
use std::io::Write;
use std::path::Path;

/// Output column order.
pub const CSV_COLUMNS: [&str; 6] = [
    "source_file",
    "name",
    "role",
    "is_corresponding",
    "affiliation",
    "email",
];

/// Columns to write for `records`, in [`CSV_COLUMNS`] order.
pub fn present_columns(records: &[AuthorRecord]) -> Vec<&'static str> {
    CSV_COLUMNS
        .iter()
        .copied()
        .filter(|&col| match col {
            "is_corresponding" => records.iter().any(|r| r.is_corresponding.is_some()),
            "affiliation" => records.iter().any(|r| r.affiliation.is_some()),
            "email" => records.iter().any(|r| r.email.is_some()),
            _ => true,
        })
        .collect()
}

fn cell(record: &AuthorRecord, column: &str) -> String {
    match column {
        "source_file" => record.source_file.clone(),
        "name" => record.name.clone(),
        "role" => record.role.clone(),
        "is_corresponding" => record
            .is_corresponding
            .map(|b| b.to_string())
            .unwrap_or_default(),
        "affiliation" => record.affiliation.clone().unwrap_or_default(),
        "email" => record.email.clone().unwrap_or_default(),
        _ => String::new(),
    }
}

/// Write `records` as UTF-8 CSV with a header row.
pub fn write_csv<W: Write>(records: &[AuthorRecord], writer: W) -> Result<(), ExtractError> {
    let columns = present_columns(records);
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(&columns)?;
    for record in records {
        wtr.write_record(columns.iter().map(|c| cell(record, c)))?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Render `records` as a CSV string.
pub fn to_csv_string(records: &[AuthorRecord]) -> Result<String, ExtractError> {
    let mut buf = Vec::new();
    write_csv(records, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ExtractError::Internal(format!("CSV is not UTF-8: {e}")))
}

/// Write `records` as CSV to `path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn write_csv_file(
    records: &[AuthorRecord],
    path: impl AsRef<Path>,
) -> Result<(), ExtractError> {
    let path = path.as_ref();
    let csv = to_csv_string(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtractError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, csv.as_bytes())
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ExtractError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
