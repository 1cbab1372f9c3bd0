//! Text extraction wrapper for uploaded files
//!
//! Thin I/O shim over format parsers; structuring and embedding happen
//! downstream.

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Extract plain text from uploaded bytes based on MIME type.
pub fn extract_text(data: &[u8], mime_type: &str, filename: &str) -> Result<String> {
    match mime_type {
        "application/pdf" => extract_pdf(data, filename),
        "text/csv" | "application/csv" => extract_csv(data, filename),
        t if t.starts_with("text/") => Ok(String::from_utf8_lossy(data).into_owned()),
        "application/json" => Ok(String::from_utf8_lossy(data).into_owned()),
        other => Err(Error::UnsupportedFileType(other.to_string())),
    }
}

fn extract_pdf(data: &[u8], filename: &str) -> Result<String> {
    pdf_extract::extract_text_from_mem(data)
        .map_err(|e| Error::extract(filename, e.to_string()))
}

/// Render CSV rows as a JSON array of header-keyed objects, one object per
/// row, so the structuring model sees column names next to values.
fn extract_csv(data: &[u8], filename: &str) -> Result<String> {
    let mut reader = csv::Reader::from_reader(data);
    let headers = reader
        .headers()
        .map_err(|e| Error::extract(filename, e.to_string()))?
        .clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| Error::extract(filename, e.to_string()))?;
        let row: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), Value::String(value.to_string())))
            .collect();
        rows.push(Value::Object(row));
    }

    serde_json::to_string_pretty(&rows).map_err(|e| Error::extract(filename, e.to_string()))
}
