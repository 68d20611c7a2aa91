use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while resolving parameters and secrets.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing required parameter: {name}")]
  MissingParameter { name: String },

  #[error("missing required secret: {name}")]
  MissingSecret { name: String },

  /// The secret exists but its value has the wrong shape. The value itself is
  /// never included in the message.
  #[error("secret '{name}' is malformed: {message}")]
  InvalidSecret { name: String, message: String },

  #[error("invalid parameter assignment '{input}': expected key=value")]
  InvalidAssignment { input: String },

  #[error("failed to read parameters file {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse parameters file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}
