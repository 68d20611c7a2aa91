/// Errors returned by a query submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
  /// Network failure, timeout, 5xx or 429. The same query may succeed later.
  #[error("transient query error: {message}")]
  Transient { message: String },

  /// Malformed SQL, authentication failure, missing object or another 4xx.
  #[error("query error: {message}")]
  Fatal { message: String },
}

impl QueryError {
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

  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transient { .. })
  }
}
