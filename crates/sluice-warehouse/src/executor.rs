use async_trait::async_trait;

use crate::credentials::WarehouseCredentials;
use crate::error::QueryError;
use crate::sql::Query;

/// One query to run against a named database on a named engine.
#[derive(Debug, Clone)]
pub struct QueryRequest {
  pub database: String,
  pub engine_name: String,
  pub credentials: WarehouseCredentials,
  pub query: Query,
}

/// Submits a query and blocks until the warehouse reports completion.
///
/// Returns the response body as JSON, or `Null` when the statement produces
/// no result set.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
  async fn execute(&self, request: &QueryRequest) -> Result<serde_json::Value, QueryError>;
}
