use async_trait::async_trait;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use tracing::debug;

use crate::{ObjectStore, StoreError};

const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// Amazon S3 object store.
#[derive(Debug, Clone)]
pub struct S3Store {
  client: Client,
}

impl S3Store {
  pub fn new(client: Client) -> Self {
    Self { client }
  }

  /// Build a client from a static access key pair.
  ///
  /// `endpoint_url` points the client at an S3-compatible service instead of
  /// AWS, using path-style addressing.
  pub fn from_access_key(
    access_key_id: &str,
    secret_access_key: &str,
    region: impl Into<String>,
    endpoint_url: Option<&str>,
  ) -> Self {
    let credentials = Credentials::new(access_key_id, secret_access_key, None, None, "sluice");

    let mut builder = aws_sdk_s3::Config::builder()
      .behavior_version(BehaviorVersion::latest())
      .region(Region::new(region.into()))
      .credentials_provider(credentials);

    if let Some(endpoint) = endpoint_url {
      builder = builder.endpoint_url(endpoint).force_path_style(true);
    }

    Self::new(Client::from_conf(builder.build()))
  }
}

/// Timeouts, dispatch failures and 5xx/429 answers are worth another attempt;
/// everything else is a rejection.
fn classify<E>(operation: &str, err: SdkError<E, HttpResponse>) -> StoreError
where
  E: std::error::Error + Send + Sync + 'static,
{
  let message = format!("{} failed: {}", operation, DisplayErrorContext(&err));

  match &err {
    SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
      StoreError::transient(message)
    }
    SdkError::ServiceError(service) => {
      let status = service.raw().status().as_u16();
      if status >= 500 || status == 429 {
        StoreError::transient(message)
      } else {
        StoreError::fatal(message)
      }
    }
    _ => StoreError::fatal(message),
  }
}

#[async_trait]
impl ObjectStore for S3Store {
  async fn put(&self, bucket: &str, key: &str, data: Bytes) -> Result<(), StoreError> {
    let size = data.len();

    self
      .client
      .put_object()
      .bucket(bucket)
      .key(key)
      .content_type(PARQUET_CONTENT_TYPE)
      .body(ByteStream::from(data))
      .send()
      .await
      .map_err(|e| classify("put_object", e))?;

    debug!(bucket = %bucket, key = %key, bytes = size, "object_stored");
    Ok(())
  }

  async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
    let output = self
      .client
      .get_object()
      .bucket(bucket)
      .key(key)
      .send()
      .await
      .map_err(|e| {
        if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
          StoreError::NotFound {
            bucket: bucket.to_string(),
            key: key.to_string(),
          }
        } else {
          classify("get_object", e)
        }
      })?;

    let body = output
      .body
      .collect()
      .await
      .map_err(|e| StoreError::transient(format!("reading object body failed: {}", e)))?;

    Ok(body.into_bytes())
  }
}
