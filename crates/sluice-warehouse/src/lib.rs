//! Sluice Warehouse
//!
//! Everything that talks SQL to the warehouse:
//!
//! - [`sql`]: pure builders for the external-table DDL, the fact-table DDL and
//!   the insert-select. Rendered text is wrapped in [`Query`], which never
//!   shows its body in `Debug` output because it may embed credentials.
//! - [`QueryExecutor`]: submits one query and waits for it to finish.
//!   [`HttpQueryExecutor`] implements it against the warehouse REST API.

mod credentials;
mod error;
mod executor;
mod http;
pub mod sql;

pub use credentials::{AwsCredentialBundle, AwsCredentials, WarehouseCredentials};
pub use error::QueryError;
pub use executor::{QueryExecutor, QueryRequest};
pub use http::{HttpQueryExecutor, WarehouseConfig};
pub use sql::Query;
