use std::collections::HashSet;
use std::io::Read;

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::error::TransformError;
use crate::record::{COLUMNS, SalesRecord};

/// Columns parsed as integers. Whitespace around their values is ignored.
const NUMERIC_COLUMNS: [&str; 3] = ["price", "quantity", "revenue"];

/// Parse sales records from CSV.
///
/// The header is validated before any row is read. Rows must have exactly as
/// many fields as the header; numeric columns must hold integers. Text fields
/// are kept verbatim.
pub fn read_records<R: Read>(reader: R) -> Result<Vec<SalesRecord>, TransformError> {
  let mut reader = ReaderBuilder::new().trim(Trim::Headers).from_reader(reader);

  let headers = reader.headers().map_err(from_csv)?.clone();
  validate_headers(&headers)?;

  let numeric: Vec<usize> = headers
    .iter()
    .enumerate()
    .filter(|(_, name)| NUMERIC_COLUMNS.contains(name))
    .map(|(index, _)| index)
    .collect();

  let mut records = Vec::new();
  for row in reader.records() {
    let row = row.map_err(from_csv)?;
    let line = row.position().map_or(0, |p| p.line());
    let record = trim_numeric(&row, &numeric)
      .deserialize::<SalesRecord>(Some(&headers))
      .map_err(|e| from_deserialize(e, &headers, line))?;
    records.push(record);
  }

  Ok(records)
}

fn trim_numeric(row: &StringRecord, numeric: &[usize]) -> StringRecord {
  row
    .iter()
    .enumerate()
    .map(|(index, field)| {
      if numeric.contains(&index) {
        field.trim()
      } else {
        field
      }
    })
    .collect()
}

fn validate_headers(headers: &StringRecord) -> Result<(), TransformError> {
  let mut seen = HashSet::new();

  for name in headers.iter() {
    if !COLUMNS.contains(&name) {
      return Err(TransformError::malformed(
        1,
        format!("unknown column '{}'", name),
      ));
    }
    if !seen.insert(name) {
      return Err(TransformError::malformed(
        1,
        format!("duplicate column '{}'", name),
      ));
    }
  }

  let missing: Vec<&str> = COLUMNS
    .iter()
    .copied()
    .filter(|column| !seen.contains(column))
    .collect();
  if !missing.is_empty() {
    return Err(TransformError::malformed(
      1,
      format!("missing columns: {}", missing.join(", ")),
    ));
  }

  Ok(())
}

fn from_csv(err: csv::Error) -> TransformError {
  let line = err.position().map_or(1, |p| p.line());
  let message = err.to_string();

  match err.into_kind() {
    csv::ErrorKind::Io(source) => TransformError::Io { path: None, source },
    csv::ErrorKind::UnequalLengths {
      expected_len, len, ..
    } => TransformError::malformed(
      line,
      format!("expected {} fields, found {}", expected_len, len),
    ),
    _ => TransformError::malformed(line, message),
  }
}

fn from_deserialize(err: csv::Error, headers: &StringRecord, line: u64) -> TransformError {
  if let csv::ErrorKind::Deserialize { err: inner, .. } = err.kind() {
    let column = inner
      .field()
      .and_then(|index| headers.get(index as usize))
      .unwrap_or("?");
    return TransformError::malformed(line, format!("column '{}': {}", column, inner.kind()));
  }
  TransformError::malformed(line, err.to_string())
}
