//! Sluice Pipeline
//!
//! The sales-load flow. Five nodes move a CSV file into a warehouse fact
//! table:
//!
//! ```text
//! convert_csv_to_parquet ──> upload_parquet ──────┐
//! create_external_table ─────────────────────────>├──> insert_into_fact_table
//! create_fact_table ─────────────────────────────>┘
//! ```
//!
//! The conversion runs once; the upload and the three warehouse statements
//! retry transient failures up to three attempts, five seconds apart.

mod error;
mod flow;
mod settings;
mod tasks;

pub use error::PipelineError;
pub use flow::{SalesLoad, build_workflow};
pub use settings::{
  LoadSettings, PARAMETER_NAMES, SECRET_NAMES, STAGED_OBJECT_KEY, nodes, params, resolve_secrets,
  secrets,
};
pub use tasks::{ConvertCsvTask, QueryKind, QueryTask, UploadTask};
