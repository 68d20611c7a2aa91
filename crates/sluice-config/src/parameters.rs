use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Named run parameters.
///
/// Parameters are plain strings with no defaults; a parameter is valid as soon
/// as it is present. The file format is a flat JSON object:
///
/// ```json
/// {
///   "s3_bucket": "sales-staging",
///   "fact_table_name": "business_sales_transaction"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters(BTreeMap<String, String>);

impl Parameters {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.insert(name, value);
    self
  }

  /// Insert or replace a parameter.
  pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
    self.0.insert(name.into(), value.into());
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.0.get(name).map(String::as_str)
  }

  /// Get a parameter that must be present.
  pub fn require(&self, name: &str) -> Result<&str, ConfigError> {
    self.get(name).ok_or_else(|| ConfigError::MissingParameter {
      name: name.to_string(),
    })
  }

  /// Names of all parameters that are not present.
  pub fn missing<'a>(&self, names: &[&'a str]) -> Vec<&'a str> {
    names
      .iter()
      .copied()
      .filter(|name| !self.0.contains_key(*name))
      .collect()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  /// Load parameters from a JSON file containing a flat string object.
  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }

  /// Parse a `key=value` assignment, as given on the command line.
  ///
  /// The value may itself contain `=`; only the first one separates.
  pub fn parse_assignment(input: &str) -> Result<(String, String), ConfigError> {
    match input.split_once('=') {
      Some((key, value)) if !key.trim().is_empty() => {
        Ok((key.trim().to_string(), value.to_string()))
      }
      _ => Err(ConfigError::InvalidAssignment {
        input: input.to_string(),
      }),
    }
  }
}

impl<K, V> FromIterator<(K, V)> for Parameters
where
  K: Into<String>,
  V: Into<String>,
{
  fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
    Self(
      iter
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
    )
  }
}

impl Extend<(String, String)> for Parameters {
  fn extend<I: IntoIterator<Item = (String, String)>>(&mut self, iter: I) {
    self.0.extend(iter);
  }
}
