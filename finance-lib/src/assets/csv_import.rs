use csv::ReaderBuilder;
use serde_json::Value;

use crate::assets::{sanitize_column_name, IngestError, UploadRow};

/// Parses CSV text into upload rows using the header record as column names. Empty cells become
/// null.
pub fn parse_rows(data: &[u8]) -> Result<Vec<UploadRow>, IngestError> {
    let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(data);
    let headers = reader.headers()?.clone();
    for (index, header) in headers.iter().enumerate() {
        if let Some(first) = headers.iter().take(index).find(|h| *h == header) {
            return Err(IngestError::DuplicateColumn {
                first: first.to_string(),
                second: header.to_string(),
                sanitized: sanitize_column_name(header),
            });
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: UploadRow = headers
            .iter()
            .zip(record.iter())
            .map(|(header, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (header.to_string(), value)
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}
