//! User uploaded tabular "asset" data.
//!
//! Uploads are lists of rows keyed by column name. Column names are normalised by
//! [sanitize_column_name]. The columns of a user's first upload become their schema; later
//! uploads must stay within it. Cells of a schema column that a row leaves out are stored as
//! null.

use std::collections::HashMap;

use actix_web::{web, Scope};
use finance_repo::asset_repo::{AssetRow, AssetValues};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod csv_import;
mod handlers;

/// A row as uploaded by the client.
pub type UploadRow = Map<String, Value>;

const RESERVED_COLUMNS: [&str; 2] = ["id", "uploaded_at"];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("No rows to upload")]
    Empty,
    #[error("Column \"{0}\" has no letters, digits or underscores")]
    EmptyColumnName(String),
    #[error("Column \"{0}\" is reserved")]
    ReservedColumn(String),
    #[error("Columns \"{first}\" and \"{second}\" both become \"{sanitized}\"")]
    DuplicateColumn {
        first: String,
        second: String,
        sanitized: String,
    },
    #[error("Row {row} has column \"{column}\" which earlier uploads do not have")]
    UnknownColumn { row: usize, column: String },
    #[error("Row {row} column \"{column}\" must be text, a number, a boolean or null")]
    UnsupportedValue { row: usize, column: String },
    #[error("Unable to parse CSV: {0}")]
    Csv(#[from] csv::Error),
}

/// Rows ready to be stored, along with the schema they conform to.
#[derive(Debug, PartialEq)]
pub struct PreparedUpload {
    pub columns: Vec<String>,
    pub rows: Vec<AssetValues>,
}

/// Lowercases `name` and drops everything except ASCII letters, digits and underscores.
pub fn sanitize_column_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_'))
        .collect()
}

/// Validates an upload against the user's schema. Without an existing schema the columns of the
/// first row become the schema.
pub fn prepare_upload(
    schema: Option<Vec<String>>,
    rows: Vec<UploadRow>,
) -> Result<PreparedUpload, IngestError> {
    let first_row = rows.first().ok_or(IngestError::Empty)?;
    let columns = match schema {
        Some(columns) => columns,
        None => sanitize_columns(first_row.keys())?,
    };

    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| prepare_row(index + 1, &columns, row))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(PreparedUpload { columns, rows })
}

fn sanitize_columns<'a>(
    names: impl Iterator<Item = &'a String>,
) -> Result<Vec<String>, IngestError> {
    let mut columns: Vec<String> = Vec::new();
    let mut originals: HashMap<String, &String> = HashMap::new();
    for name in names {
        let column = sanitize_column(name)?;
        if let Some(first) = originals.insert(column.clone(), name) {
            return Err(IngestError::DuplicateColumn {
                first: first.clone(),
                second: name.clone(),
                sanitized: column,
            });
        }
        columns.push(column);
    }
    Ok(columns)
}

fn sanitize_column(name: &str) -> Result<String, IngestError> {
    let column = sanitize_column_name(name);
    if column.is_empty() {
        return Err(IngestError::EmptyColumnName(name.to_string()));
    }
    if RESERVED_COLUMNS.contains(&column.as_str()) {
        return Err(IngestError::ReservedColumn(name.to_string()));
    }
    Ok(column)
}

fn prepare_row(row: usize, columns: &[String], cells: UploadRow) -> Result<AssetValues, IngestError> {
    let mut values: AssetValues = columns.iter().map(|c| (c.clone(), None)).collect();
    let mut originals: HashMap<String, String> = HashMap::new();

    for (name, value) in cells {
        let column = sanitize_column(&name)?;
        if !values.contains_key(&column) {
            return Err(IngestError::UnknownColumn { row, column: name });
        }
        if let Some(first) = originals.insert(column.clone(), name.clone()) {
            return Err(IngestError::DuplicateColumn {
                first,
                second: name,
                sanitized: column,
            });
        }
        let text = match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Array(_) | Value::Object(_) => {
                return Err(IngestError::UnsupportedValue { row, column: name })
            }
        };
        values.insert(column, text);
    }
    Ok(values)
}

/// Flattens a stored row into `{id, <columns in schema order>, uploaded_at}`.
pub fn row_to_json(columns: &[String], row: AssetRow) -> Value {
    let AssetRow {
        id,
        mut values,
        uploaded_at,
    } = row;

    let mut object = Map::with_capacity(columns.len() + 2);
    object.insert("id".to_string(), Value::from(id));
    for column in columns {
        let value = values
            .remove(column)
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null);
        object.insert(column.clone(), value);
    }
    object.insert("uploaded_at".to_string(), Value::String(uploaded_at.to_rfc3339()));
    Value::Object(object)
}

pub fn asset_service() -> Scope {
    web::scope("/assets")
        .service(handlers::get_assets)
        .service(handlers::upload_dynamic)
        .service(handlers::upload_csv)
}
