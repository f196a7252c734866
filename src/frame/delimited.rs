//! Delimited text (CSV) ingestion and serialization

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{FrameError, FrameResult, TabularFrame, Value};

/// Read a CSV file with a header row into a frame
pub fn read_csv_path(path: &Path) -> FrameResult<TabularFrame> {
    let file = File::open(path)
        .map_err(|e| FrameError::Io(format!("Failed to open {}: {}", path.display(), e)))?;
    read_csv(file)
}

/// Read CSV data with a header row into a frame
///
/// Column types are inferred from the parsed cells; empty fields and the
/// usual missing-value tokens become nulls.
pub fn read_csv<R: Read>(reader: R) -> FrameResult<TabularFrame> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let names: Vec<String> = rdr
        .headers()
        .map_err(|e| FrameError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| FrameError::Csv(e.to_string()))?;
        rows.push(record.iter().map(Value::parse_field).collect());
    }

    TabularFrame::from_rows(names, rows)
}

/// Serialize a frame as CSV: header row, one record per row, nulls as empty fields
pub fn to_csv_bytes(frame: &TabularFrame) -> FrameResult<Vec<u8>> {
    if frame.column_count() == 0 {
        return Ok(Vec::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(frame.column_names())
        .map_err(|e| FrameError::Csv(e.to_string()))?;

    for row in frame.rows() {
        writer
            .write_record(row.iter().map(Value::to_string))
            .map_err(|e| FrameError::Csv(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| FrameError::Csv(e.to_string()))
}
