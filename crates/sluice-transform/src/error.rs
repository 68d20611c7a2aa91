use std::path::PathBuf;

/// Errors that can occur while converting CSV to Parquet.
///
/// None of these are worth retrying: the same input fails the same way.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
  /// The CSV does not match the expected layout or a value does not parse.
  #[error("malformed input at line {line}: {message}")]
  MalformedInput { line: u64, message: String },

  #[error("failed to read {}: {source}", display_path(.path))]
  Io {
    path: Option<PathBuf>,
    #[source]
    source: std::io::Error,
  },

  #[error("parquet encoding failed: {0}")]
  Encode(#[from] ::parquet::errors::ParquetError),

  #[error("parquet decoding failed: {message}")]
  Decode { message: String },
}

fn display_path(path: &Option<PathBuf>) -> String {
  match path {
    Some(path) => path.display().to_string(),
    None => "input".to_string(),
  }
}

impl TransformError {
  pub(crate) fn malformed(line: u64, message: impl Into<String>) -> Self {
    Self::MalformedInput {
      line,
      message: message.into(),
    }
  }

  pub(crate) fn decode(message: impl Into<String>) -> Self {
    Self::Decode {
      message: message.into(),
    }
  }
}
