use std::io::Cursor;
use std::sync::Arc;

use arrow_array::{Array, ArrayRef, Int32Array, Int64Array, RecordBatch, StringArray};
use bytes::Bytes;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::TransformError;
use crate::record::{SalesRecord, arrow_schema};

fn writer_properties() -> WriterProperties {
  WriterProperties::builder()
    .set_compression(Compression::SNAPPY)
    .build()
}

/// Encode records as a single-row-group Parquet file.
pub fn write_parquet(records: &[SalesRecord]) -> Result<Bytes, TransformError> {
  let schema = arrow_schema();

  let text = |f: fn(&SalesRecord) -> &str| -> ArrayRef {
    Arc::new(StringArray::from_iter_values(records.iter().map(f)))
  };

  let columns: Vec<ArrayRef> = vec![
    text(|r| r.transaction_number.as_str()),
    text(|r| r.purchase_date.as_str()),
    text(|r| r.product_number.as_str()),
    text(|r| r.product_name.as_str()),
    Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.price))),
    Arc::new(Int32Array::from_iter_values(records.iter().map(|r| r.quantity))),
    Arc::new(Int64Array::from_iter_values(records.iter().map(|r| r.revenue))),
    text(|r| r.customer_number.as_str()),
    text(|r| r.country.as_str()),
  ];

  let batch = RecordBatch::try_new(schema.clone(), columns)
    .map_err(|e| TransformError::Encode(e.into()))?;

  let mut cursor = Cursor::new(Vec::<u8>::new());
  let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(writer_properties()))?;
  writer.write(&batch)?;
  writer.close()?;

  Ok(Bytes::from(cursor.into_inner()))
}

/// Decode a Parquet payload produced by [`write_parquet`].
pub fn read_parquet(bytes: &Bytes) -> Result<Vec<SalesRecord>, TransformError> {
  let reader = ParquetRecordBatchReaderBuilder::try_new(bytes.clone())
    .map_err(|e| TransformError::decode(format!("reader init failed: {}", e)))?
    .build()
    .map_err(|e| TransformError::decode(format!("reader build failed: {}", e)))?;

  let mut records = Vec::new();
  for batch in reader {
    let batch = batch.map_err(|e| TransformError::decode(format!("read batch failed: {}", e)))?;

    let transaction_number = column::<StringArray>(&batch, "transaction_number")?;
    let purchase_date = column::<StringArray>(&batch, "purchase_date")?;
    let product_number = column::<StringArray>(&batch, "product_number")?;
    let product_name = column::<StringArray>(&batch, "product_name")?;
    let price = column::<Int64Array>(&batch, "price")?;
    let quantity = column::<Int32Array>(&batch, "quantity")?;
    let revenue = column::<Int64Array>(&batch, "revenue")?;
    let customer_number = column::<StringArray>(&batch, "customer_number")?;
    let country = column::<StringArray>(&batch, "country")?;

    for row in 0..batch.num_rows() {
      records.push(SalesRecord {
        transaction_number: transaction_number.value(row).to_string(),
        purchase_date: purchase_date.value(row).to_string(),
        product_number: product_number.value(row).to_string(),
        product_name: product_name.value(row).to_string(),
        price: price.value(row),
        quantity: quantity.value(row),
        revenue: revenue.value(row),
        customer_number: customer_number.value(row).to_string(),
        country: country.value(row).to_string(),
      });
    }
  }

  Ok(records)
}

fn column<'a, A: Array + 'static>(
  batch: &'a RecordBatch,
  name: &str,
) -> Result<&'a A, TransformError> {
  let index = batch
    .schema()
    .index_of(name)
    .map_err(|e| TransformError::decode(format!("missing column '{}': {}", name, e)))?;
  batch
    .column(index)
    .as_any()
    .downcast_ref::<A>()
    .ok_or_else(|| {
      TransformError::decode(format!(
        "column '{}' has unexpected type {}",
        name,
        batch.column(index).data_type()
      ))
    })
}
