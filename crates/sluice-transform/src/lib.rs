//! Sluice Transform
//!
//! Converts a CSV file of sales transactions into a Parquet payload.
//!
//! The CSV header must name exactly the nine [`COLUMNS`], in any order. The
//! Parquet output always carries them in canonical order with fixed types, so
//! the warehouse's external table can read it without schema inference.
//! Conversion is a pure function of the input: the same CSV always produces
//! byte-identical Parquet.

mod columnar;
mod error;
mod reader;
mod record;

pub use columnar::{read_parquet, write_parquet};
pub use error::TransformError;
pub use reader::read_records;
pub use record::{COLUMNS, SalesRecord, arrow_schema};

use std::fs::File;
use std::io::Read;
use std::path::Path;

use bytes::Bytes;
use tracing::{debug, instrument};

/// Convert the CSV file at `path` into Parquet bytes.
#[instrument(name = "csv_to_parquet", skip_all, fields(path = %path.as_ref().display()))]
pub fn csv_to_parquet(path: impl AsRef<Path>) -> Result<Bytes, TransformError> {
  let path = path.as_ref();
  let file = File::open(path).map_err(|source| TransformError::Io {
    path: Some(path.to_path_buf()),
    source,
  })?;
  convert_reader(file)
}

/// Convert CSV from any reader into Parquet bytes.
pub fn convert_reader<R: Read>(reader: R) -> Result<Bytes, TransformError> {
  let records = read_records(reader)?;
  let bytes = write_parquet(&records)?;
  debug!(rows = records.len(), bytes = bytes.len(), "csv_converted");
  Ok(bytes)
}
