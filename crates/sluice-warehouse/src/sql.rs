//! Query builders for the sales-load statements.
//!
//! Table names and the bucket are interpolated as given. String literals
//! (bucket and credentials) have embedded single quotes doubled.

use std::fmt;

use secrecy::ExposeSecret;

use crate::credentials::AwsCredentials;

/// Column definitions shared by the external and the fact table.
const COLUMNS: [(&str, &str); 9] = [
  ("transaction_number", "TEXT"),
  ("purchase_date", "TEXT"),
  ("product_number", "TEXT"),
  ("product_name", "TEXT"),
  ("price", "LONG"),
  ("quantity", "INT"),
  ("revenue", "LONG"),
  ("customer_number", "TEXT"),
  ("country", "TEXT"),
];

/// Rendered SQL text.
///
/// `Debug` shows only the length: the text may carry credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
  pub fn new(text: impl Into<String>) -> Self {
    Self(text.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  pub fn into_string(self) -> String {
    self.0
  }
}

impl fmt::Debug for Query {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Query(<{} bytes redacted>)", self.0.len())
  }
}

fn column_list() -> String {
  COLUMNS
    .iter()
    .map(|(name, ty)| format!("  {:<18} {}", name, ty))
    .collect::<Vec<_>>()
    .join(",\n")
}

fn literal(value: &str) -> String {
  value.replace('\'', "''")
}

/// External table over every Parquet object in `bucket`.
pub fn create_external_table(external_table: &str, bucket: &str, aws: &AwsCredentials) -> Query {
  Query(format!(
    "CREATE EXTERNAL TABLE IF NOT EXISTS {table} (\n{columns}\n)\n\
     URL = 's3://{bucket}/'\n\
     CREDENTIALS = ( AWS_KEY_ID = '{key_id}' AWS_SECRET_KEY = '{secret}' )\n\
     OBJECT_PATTERN = '*.parquet'\n\
     TYPE = (PARQUET);",
    table = external_table,
    columns = column_list(),
    bucket = literal(bucket),
    key_id = literal(aws.access_key_id.expose_secret()),
    secret = literal(aws.secret_access_key.expose_secret()),
  ))
}

/// Fact table with a primary index on transaction and product number.
pub fn create_fact_table(fact_table: &str) -> Query {
  Query(format!(
    "CREATE FACT TABLE IF NOT EXISTS {table} (\n{columns}\n)\n\
     PRIMARY INDEX transaction_number, product_number;",
    table = fact_table,
    columns = column_list(),
  ))
}

/// Copy every row of the external table into the fact table.
pub fn insert_into(fact_table: &str, external_table: &str) -> Query {
  Query(format!(
    "INSERT INTO {} SELECT * FROM {};",
    fact_table, external_table
  ))
}
