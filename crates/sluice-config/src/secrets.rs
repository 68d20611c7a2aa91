use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Resolved secrets for one run.
///
/// `Debug` prints secret names only.
#[derive(Default)]
pub struct Secrets(BTreeMap<String, SecretString>);

impl Secrets {
  pub fn new() -> Self {
    Self::default()
  }

  /// Builder-style insert.
  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self.insert(name, SecretString::from(value.into()));
    self
  }

  pub fn insert(&mut self, name: impl Into<String>, value: SecretString) {
    self.0.insert(name.into(), value);
  }

  pub fn get(&self, name: &str) -> Option<&SecretString> {
    self.0.get(name)
  }

  /// Get a secret that must be present.
  pub fn require(&self, name: &str) -> Result<&SecretString, ConfigError> {
    self.get(name).ok_or_else(|| ConfigError::MissingSecret {
      name: name.to_string(),
    })
  }

  /// Parse a secret whose value is a JSON document (a credential bundle).
  pub fn require_json<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
    let secret = self.require(name)?;
    serde_json::from_str(secret.expose_secret()).map_err(|e| ConfigError::InvalidSecret {
      name: name.to_string(),
      // serde_json messages may quote the offending value
      message: format!(
        "not a valid JSON bundle ({:?} error at line {} column {})",
        e.classify(),
        e.line(),
        e.column()
      ),
    })
  }

  pub fn contains(&self, name: &str) -> bool {
    self.0.contains_key(name)
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl Clone for Secrets {
  fn clone(&self) -> Self {
    Self(
      self
        .0
        .iter()
        .map(|(name, value)| {
          (
            name.clone(),
            SecretString::from(value.expose_secret().to_string()),
          )
        })
        .collect(),
    )
  }
}

impl fmt::Debug for Secrets {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.0.keys()).finish()
  }
}

/// Source of secret values.
#[async_trait]
pub trait SecretResolver: Send + Sync {
  /// Resolve a single secret by name.
  async fn resolve(&self, name: &str) -> Result<SecretString, ConfigError>;

  /// Resolve every named secret, failing on the first one that is missing.
  async fn resolve_all(&self, names: &[&str]) -> Result<Secrets, ConfigError> {
    let mut secrets = Secrets::new();
    for name in names {
      secrets.insert(*name, self.resolve(name).await?);
    }
    Ok(secrets)
  }
}

/// Resolves secrets from process environment variables.
///
/// With a prefix, secret `FIREBOLT_PASSWORD` is read from
/// `{prefix}FIREBOLT_PASSWORD`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretResolver {
  prefix: String,
}

impl EnvSecretResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_prefix(prefix: impl Into<String>) -> Self {
    Self {
      prefix: prefix.into(),
    }
  }

  fn variable_name(&self, name: &str) -> String {
    format!("{}{}", self.prefix, name)
  }
}

#[async_trait]
impl SecretResolver for EnvSecretResolver {
  async fn resolve(&self, name: &str) -> Result<SecretString, ConfigError> {
    let var = self.variable_name(name);
    match std::env::var(&var) {
      Ok(value) => Ok(SecretString::from(value)),
      Err(std::env::VarError::NotPresent) => Err(ConfigError::MissingSecret {
        name: name.to_string(),
      }),
      Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::InvalidSecret {
        name: name.to_string(),
        message: format!("environment variable {} is not valid unicode", var),
      }),
    }
  }
}

/// Resolves secrets from a fixed in-memory table.
#[derive(Default)]
pub struct StaticSecretResolver {
  values: BTreeMap<String, SecretString>,
}

impl StaticSecretResolver {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
    self
      .values
      .insert(name.into(), SecretString::from(value.into()));
    self
  }
}

#[async_trait]
impl SecretResolver for StaticSecretResolver {
  async fn resolve(&self, name: &str) -> Result<SecretString, ConfigError> {
    self
      .values
      .get(name)
      .map(|value| SecretString::from(value.expose_secret().to_string()))
      .ok_or_else(|| ConfigError::MissingSecret {
        name: name.to_string(),
      })
  }
}
