use secrecy::SecretString;
use serde::Deserialize;

/// Login for the warehouse API.
#[derive(Debug, Clone)]
pub struct WarehouseCredentials {
  pub username: String,
  pub password: SecretString,
}

impl WarehouseCredentials {
  pub fn new(username: impl Into<String>, password: SecretString) -> Self {
    Self {
      username: username.into(),
      password,
    }
  }
}

/// AWS access key pair the warehouse uses to read the staged object.
#[derive(Debug, Clone)]
pub struct AwsCredentials {
  pub access_key_id: SecretString,
  pub secret_access_key: SecretString,
}

/// Shape of the `AWS_CREDENTIALS` secret.
#[derive(Deserialize)]
pub struct AwsCredentialBundle {
  #[serde(rename = "ACCESS_KEY")]
  access_key: String,
  #[serde(rename = "SECRET_ACCESS_KEY")]
  secret_access_key: String,
}

impl From<AwsCredentialBundle> for AwsCredentials {
  fn from(bundle: AwsCredentialBundle) -> Self {
    Self {
      access_key_id: SecretString::from(bundle.access_key),
      secret_access_key: SecretString::from(bundle.secret_access_key),
    }
  }
}
