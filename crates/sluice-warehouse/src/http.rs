use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::credentials::WarehouseCredentials;
use crate::error::QueryError;
use crate::executor::{QueryExecutor, QueryRequest};

const DEFAULT_API_URL: &str = "https://api.app.firebolt.io";

/// Longest slice of an error response body kept in error messages.
const MAX_ERROR_BODY: usize = 512;

/// Settings for the warehouse REST client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
  /// Base URL of the account API (login and engine lookup).
  pub api_url: String,
  /// Per-request timeout; a query that runs longer counts as a transient
  /// failure.
  pub request_timeout: Duration,
}

impl Default for WarehouseConfig {
  fn default() -> Self {
    Self {
      api_url: DEFAULT_API_URL.to_string(),
      request_timeout: Duration::from_secs(600),
    }
  }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
  username: &'a str,
  password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
  access_token: String,
}

#[derive(Deserialize)]
struct EngineUrlResponse {
  engine_url: String,
}

/// Query executor for the warehouse REST API.
///
/// Each submission logs in, resolves the engine endpoint by name and posts
/// the query text to it.
#[derive(Debug, Clone)]
pub struct HttpQueryExecutor {
  client: Client,
  config: WarehouseConfig,
}

impl HttpQueryExecutor {
  pub fn new(config: WarehouseConfig) -> Result<Self, QueryError> {
    let client = Client::builder()
      .timeout(config.request_timeout)
      .build()
      .map_err(|e| QueryError::fatal(format!("failed to build http client: {}", e)))?;
    Ok(Self { client, config })
  }

  fn api_url(&self, path: &str) -> String {
    format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
  }

  async fn login(&self, credentials: &WarehouseCredentials) -> Result<String, QueryError> {
    let response = self
      .client
      .post(self.api_url("/auth/v1/login"))
      .json(&LoginRequest {
        username: &credentials.username,
        password: credentials.password.expose_secret(),
      })
      .send()
      .await
      .map_err(|e| from_transport("login", e))?;

    let body: LoginResponse = check(response, "login")
      .await?
      .json()
      .await
      .map_err(|e| from_transport("login", e))?;
    Ok(body.access_token)
  }

  async fn engine_url(&self, token: &str, engine_name: &str) -> Result<String, QueryError> {
    let response = self
      .client
      .get(self.api_url("/core/v1/account/engines:getURLByName"))
      .query(&[("engine_name", engine_name)])
      .bearer_auth(token)
      .send()
      .await
      .map_err(|e| from_transport("engine lookup", e))?;

    let body: EngineUrlResponse = check(response, "engine lookup")
      .await?
      .json()
      .await
      .map_err(|e| from_transport("engine lookup", e))?;
    Ok(engine_base_url(&body.engine_url))
  }
}

#[async_trait]
impl QueryExecutor for HttpQueryExecutor {
  #[instrument(
    name = "query_execute",
    skip_all,
    fields(database = %request.database, engine = %request.engine_name)
  )]
  async fn execute(&self, request: &QueryRequest) -> Result<serde_json::Value, QueryError> {
    let token = self.login(&request.credentials).await?;
    let engine = self.engine_url(&token, &request.engine_name).await?;
    debug!(engine = %engine, "engine_resolved");

    let response = self
      .client
      .post(format!("{}/", engine))
      .query(&[("database", request.database.as_str())])
      .bearer_auth(&token)
      .header(reqwest::header::CONTENT_TYPE, "text/plain")
      .body(request.query.as_str().to_string())
      .send()
      .await
      .map_err(|e| from_transport("query", e))?;

    let text = check(response, "query")
      .await?
      .text()
      .await
      .map_err(|e| from_transport("query", e))?;

    if text.trim().is_empty() {
      return Ok(serde_json::Value::Null);
    }
    Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text)))
  }
}

/// Engine endpoints come back without a scheme.
fn engine_base_url(endpoint: &str) -> String {
  let endpoint = endpoint.trim_end_matches('/');
  if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
    endpoint.to_string()
  } else {
    format!("https://{}", endpoint)
  }
}

/// Pass successful responses through; turn the rest into a classified error.
async fn check(response: Response, stage: &str) -> Result<Response, QueryError> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let body = response.text().await.unwrap_or_default();
  let message = format!("{} failed with status {}: {}", stage, status, truncate(&body));
  Err(classify_status(status, message))
}

fn classify_status(status: StatusCode, message: String) -> QueryError {
  if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
    QueryError::transient(message)
  } else {
    QueryError::fatal(message)
  }
}

fn from_transport(stage: &str, err: reqwest::Error) -> QueryError {
  // The error's URL may carry the engine host but never credentials.
  let message = format!("{} failed: {}", stage, err);
  if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
    QueryError::transient(message)
  } else {
    QueryError::fatal(message)
  }
}

fn truncate(body: &str) -> &str {
  match body.char_indices().nth(MAX_ERROR_BODY) {
    Some((index, _)) => &body[..index],
    None => body,
  }
}
