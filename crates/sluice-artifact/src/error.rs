/// Errors that can occur in object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  /// The store could not be reached or answered with a server-side error.
  #[error("transient storage error: {message}")]
  Transient { message: String },

  /// The request was rejected and repeating it will not help.
  #[error("storage error: {message}")]
  Fatal { message: String },

  #[error("object not found: {bucket}/{key}")]
  NotFound { bucket: String, key: String },

  #[error("invalid object location '{location}': {reason}")]
  InvalidKey { location: String, reason: String },
}

impl StoreError {
  pub fn transient(message: impl Into<String>) -> Self {
    Self::Transient {
      message: message.into(),
    }
  }

  pub fn fatal(message: impl Into<String>) -> Self {
    Self::Fatal {
      message: message.into(),
    }
  }

  /// Whether repeating the operation may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transient { .. })
  }
}

impl From<std::io::Error> for StoreError {
  fn from(err: std::io::Error) -> Self {
    use std::io::ErrorKind;

    match err.kind() {
      ErrorKind::Interrupted
      | ErrorKind::TimedOut
      | ErrorKind::WouldBlock
      | ErrorKind::ResourceBusy => Self::transient(err.to_string()),
      _ => Self::fatal(err.to_string()),
    }
  }
}
