//! Sluice Artifact
//!
//! Object storage for staged files. The transformed Parquet payload is put
//! into a bucket under a fixed key, where the warehouse's external table
//! reads it.
//!
//! The [`ObjectStore`] trait is the backend layer. [`FsStore`] keeps objects
//! on the local filesystem; `S3Store` (behind the `s3` feature) talks to
//! Amazon S3. Every error says whether retrying the operation can help.

mod error;
mod fs;
#[cfg(feature = "s3")]
mod s3;

pub use error::StoreError;
pub use fs::FsStore;
#[cfg(feature = "s3")]
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;

/// Object storage trait.
///
/// `put` overwrites any existing object at the same location, so writing the
/// same payload twice leaves the store unchanged.
#[async_trait]
pub trait ObjectStore: Send + Sync {
  /// Store `data` at `bucket`/`key`.
  async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError>;

  /// Retrieve the object at `bucket`/`key`.
  async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;
}
