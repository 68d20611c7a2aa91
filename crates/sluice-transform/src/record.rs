use std::sync::Arc;

use arrow_schema::{DataType, Field, Schema, SchemaRef};
use serde::Deserialize;

/// Column names in canonical order.
pub const COLUMNS: [&str; 9] = [
  "transaction_number",
  "purchase_date",
  "product_number",
  "product_name",
  "price",
  "quantity",
  "revenue",
  "customer_number",
  "country",
];

/// One sales transaction row.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SalesRecord {
  pub transaction_number: String,
  pub purchase_date: String,
  pub product_number: String,
  pub product_name: String,
  pub price: i64,
  pub quantity: i32,
  pub revenue: i64,
  pub customer_number: String,
  pub country: String,
}

/// Arrow schema of the Parquet output. All columns are non-nullable.
pub fn arrow_schema() -> SchemaRef {
  Arc::new(Schema::new(vec![
    Field::new("transaction_number", DataType::Utf8, false),
    Field::new("purchase_date", DataType::Utf8, false),
    Field::new("product_number", DataType::Utf8, false),
    Field::new("product_name", DataType::Utf8, false),
    Field::new("price", DataType::Int64, false),
    Field::new("quantity", DataType::Int32, false),
    Field::new("revenue", DataType::Int64, false),
    Field::new("customer_number", DataType::Utf8, false),
    Field::new("country", DataType::Utf8, false),
  ]))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_schema_matches_column_order() {
    let schema = arrow_schema();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, COLUMNS);
    assert!(schema.fields().iter().all(|f| !f.is_nullable()));
  }
}
