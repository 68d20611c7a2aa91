use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::{ObjectStore, StoreError};

/// Filesystem-based object store.
///
/// Each object is stored at `{base_path}/{bucket}/{key}`. Parent directories
/// are created automatically. Writes go to a sibling temp file which is then
/// renamed over the destination, so readers never see a partial object.
#[derive(Debug, Clone)]
pub struct FsStore {
  base_path: PathBuf,
}

impl FsStore {
  /// Create a new filesystem store with the given base path.
  pub fn new(base_path: impl Into<PathBuf>) -> Self {
    Self {
      base_path: base_path.into(),
    }
  }

  pub fn base_path(&self) -> &Path {
    &self.base_path
  }

  fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StoreError> {
    if bucket.is_empty() || bucket.contains('/') || bucket.contains('\\') {
      return Err(StoreError::InvalidKey {
        location: bucket.to_string(),
        reason: "bucket must be a single non-empty path segment".to_string(),
      });
    }
    check_relative(bucket)?;
    check_relative(key)?;

    Ok(self.base_path.join(bucket).join(key))
  }
}

/// Reject keys that are empty or would escape the bucket directory.
fn check_relative(key: &str) -> Result<(), StoreError> {
  let invalid = |reason: &str| StoreError::InvalidKey {
    location: key.to_string(),
    reason: reason.to_string(),
  };

  if key.is_empty() {
    return Err(invalid("empty"));
  }

  for component in Path::new(key).components() {
    match component {
      Component::Normal(_) => {}
      Component::CurDir => return Err(invalid("contains '.'")),
      Component::ParentDir => return Err(invalid("contains '..'")),
      Component::RootDir | Component::Prefix(_) => return Err(invalid("absolute path")),
    }
  }

  Ok(())
}

fn not_found(bucket: &str, key: &str, err: std::io::Error) -> StoreError {
  if err.kind() == std::io::ErrorKind::NotFound {
    StoreError::NotFound {
      bucket: bucket.to_string(),
      key: key.to_string(),
    }
  } else {
    StoreError::from(err)
  }
}

#[async_trait]
impl ObjectStore for FsStore {
  async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
    let path = self.object_path(bucket, key)?;

    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent).await?;
    }

    let mut partial = path.clone().into_os_string();
    partial.push(".partial");
    let partial = PathBuf::from(partial);

    let mut file = File::create(&partial).await?;
    file.write_all(&data).await?;
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(&partial, &path).await?;

    debug!(
      path = %path.display(),
      bytes = data.len(),
      "object_stored"
    );
    Ok(())
  }

  async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
    let path = self.object_path(bucket, key)?;
    let data = fs::read(&path)
      .await
      .map_err(|e| not_found(bucket, key, e))?;
    Ok(Bytes::from(data))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn test_put_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    store
      .put("sales", "staged/data.parquet", Bytes::from_static(b"PAR1"))
      .await
      .unwrap();

    let data = store.get("sales", "staged/data.parquet").await.unwrap();
    assert_eq!(data, Bytes::from_static(b"PAR1"));
    assert!(dir.path().join("sales/staged/data.parquet").is_file());
  }

  #[tokio::test]
  async fn test_put_overwrites_and_leaves_no_partial() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    store
      .put("sales", "data.parquet", Bytes::from_static(b"first"))
      .await
      .unwrap();
    store
      .put("sales", "data.parquet", Bytes::from_static(b"second"))
      .await
      .unwrap();

    let data = store.get("sales", "data.parquet").await.unwrap();
    assert_eq!(data, Bytes::from_static(b"second"));

    let entries: Vec<_> = std::fs::read_dir(dir.path().join("sales"))
      .unwrap()
      .map(|entry| entry.unwrap().file_name())
      .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("data.parquet")]);
  }

  #[tokio::test]
  async fn test_get_missing_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    let err = store.get("sales", "missing.parquet").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }));
    assert!(!err.is_retryable());
  }

  #[tokio::test]
  async fn test_rejects_escaping_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsStore::new(dir.path());

    for key in ["../outside", "/etc/passwd", "a/../../b", ""] {
      let err = store
        .put("sales", key, Bytes::from_static(b"x"))
        .await
        .unwrap_err();
      assert!(matches!(err, StoreError::InvalidKey { .. }), "key {key:?}");
    }

    let err = store
      .put("../sales", "data.parquet", Bytes::from_static(b"x"))
      .await
      .unwrap_err();
    assert!(matches!(err, StoreError::InvalidKey { .. }));
  }
}
