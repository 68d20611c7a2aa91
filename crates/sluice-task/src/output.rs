use bytes::Bytes;

/// Value produced by a successful task attempt.
///
/// Outputs are handed to direct dependents through their [`TaskContext`].
///
/// [`TaskContext`]: crate::TaskContext
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
  /// The task ran for its side effect only.
  Empty,
  /// A binary payload, e.g. an encoded file.
  Bytes(Bytes),
  /// A structured result.
  Value(serde_json::Value),
}

impl TaskOutput {
  pub fn as_bytes(&self) -> Option<&Bytes> {
    match self {
      Self::Bytes(bytes) => Some(bytes),
      _ => None,
    }
  }

  pub fn as_value(&self) -> Option<&serde_json::Value> {
    match self {
      Self::Value(value) => Some(value),
      _ => None,
    }
  }

  /// Short JSON description suitable for reports and logs. Binary payloads
  /// are summarized by size, never dumped.
  pub fn summary(&self) -> serde_json::Value {
    match self {
      Self::Empty => serde_json::Value::Null,
      Self::Bytes(bytes) => serde_json::json!({ "bytes": bytes.len() }),
      Self::Value(value) => value.clone(),
    }
  }
}

impl From<Bytes> for TaskOutput {
  fn from(bytes: Bytes) -> Self {
    Self::Bytes(bytes)
  }
}

impl From<serde_json::Value> for TaskOutput {
  fn from(value: serde_json::Value) -> Self {
    Self::Value(value)
  }
}
