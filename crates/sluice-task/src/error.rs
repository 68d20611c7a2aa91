//! Task failure kinds.

use sluice_config::ConfigError;

/// Errors returned by a task attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaskError {
  /// A failure that may go away on its own (network, timeout, throttling).
  #[error("transient failure: {message}")]
  Transient { message: String },

  /// A failure that will repeat on every attempt (bad input, bad credentials,
  /// malformed SQL).
  #[error("fatal failure: {message}")]
  Fatal { message: String },
}

impl TaskError {
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

  /// Whether another attempt may succeed.
  pub fn is_retryable(&self) -> bool {
    matches!(self, Self::Transient { .. })
  }

  pub fn message(&self) -> &str {
    match self {
      Self::Transient { message } | Self::Fatal { message } => message,
    }
  }
}

/// Missing or malformed configuration never fixes itself between attempts.
impl From<ConfigError> for TaskError {
  fn from(err: ConfigError) -> Self {
    Self::fatal(err.to_string())
  }
}
