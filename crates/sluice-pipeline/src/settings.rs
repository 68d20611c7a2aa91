use std::path::PathBuf;

use secrecy::ExposeSecret;
use sluice_config::{ConfigError, Parameters, SecretResolver, Secrets};
use sluice_warehouse::{AwsCredentialBundle, AwsCredentials, WarehouseCredentials};

/// Run parameter names.
pub mod params {
  pub const FIREBOLT_DATABASE: &str = "firebolt_database";
  pub const FIREBOLT_ENGINE_NAME: &str = "firebolt_engine_name";
  pub const S3_BUCKET: &str = "s3_bucket";
  pub const CSV_FILE_PATH: &str = "csv_file_path";
  pub const FACT_TABLE_NAME: &str = "fact_table_name";
  pub const EXTERNAL_TABLE_NAME: &str = "external_table_name";
}

/// Secret names.
pub mod secrets {
  pub const FIREBOLT_USERNAME: &str = "FIREBOLT_USERNAME";
  pub const FIREBOLT_PASSWORD: &str = "FIREBOLT_PASSWORD";
  /// JSON bundle `{"ACCESS_KEY": ..., "SECRET_ACCESS_KEY": ...}`.
  pub const AWS_CREDENTIALS: &str = "AWS_CREDENTIALS";
}

/// Graph node ids.
pub mod nodes {
  pub const CONVERT_CSV_TO_PARQUET: &str = "convert_csv_to_parquet";
  pub const UPLOAD_PARQUET: &str = "upload_parquet";
  pub const CREATE_EXTERNAL_TABLE: &str = "create_external_table";
  pub const CREATE_FACT_TABLE: &str = "create_fact_table";
  pub const INSERT_INTO_FACT_TABLE: &str = "insert_into_fact_table";
}

/// Every parameter the flow requires. None has a default.
pub const PARAMETER_NAMES: [&str; 6] = [
  params::FIREBOLT_DATABASE,
  params::FIREBOLT_ENGINE_NAME,
  params::S3_BUCKET,
  params::CSV_FILE_PATH,
  params::FACT_TABLE_NAME,
  params::EXTERNAL_TABLE_NAME,
];

pub const SECRET_NAMES: [&str; 3] = [
  secrets::FIREBOLT_USERNAME,
  secrets::FIREBOLT_PASSWORD,
  secrets::AWS_CREDENTIALS,
];

/// Object key the Parquet payload is staged under.
pub const STAGED_OBJECT_KEY: &str = "business_sales_transaction.parquet";

/// Resolve every secret the flow needs.
pub async fn resolve_secrets(resolver: &dyn SecretResolver) -> Result<Secrets, ConfigError> {
  resolver.resolve_all(&SECRET_NAMES).await
}

/// Parameters and secrets of one run, checked and typed.
#[derive(Debug, Clone)]
pub struct LoadSettings {
  pub database: String,
  pub engine_name: String,
  pub bucket: String,
  pub csv_file_path: PathBuf,
  pub fact_table: String,
  pub external_table: String,
  pub warehouse: WarehouseCredentials,
  pub aws: AwsCredentials,
}

impl LoadSettings {
  /// Fails on the first missing parameter (in [`PARAMETER_NAMES`] order),
  /// then on the first missing or malformed secret.
  pub fn resolve(parameters: &Parameters, secrets: &Secrets) -> Result<Self, ConfigError> {
    if let Some(name) = parameters.missing(&PARAMETER_NAMES).first() {
      return Err(ConfigError::MissingParameter {
        name: name.to_string(),
      });
    }

    let username = secrets.require(secrets::FIREBOLT_USERNAME)?.expose_secret();
    let password = secrets.require(secrets::FIREBOLT_PASSWORD)?.clone();
    let bundle: AwsCredentialBundle = secrets.require_json(secrets::AWS_CREDENTIALS)?;

    Ok(Self {
      database: parameters.require(params::FIREBOLT_DATABASE)?.to_string(),
      engine_name: parameters.require(params::FIREBOLT_ENGINE_NAME)?.to_string(),
      bucket: parameters.require(params::S3_BUCKET)?.to_string(),
      csv_file_path: PathBuf::from(parameters.require(params::CSV_FILE_PATH)?),
      fact_table: parameters.require(params::FACT_TABLE_NAME)?.to_string(),
      external_table: parameters.require(params::EXTERNAL_TABLE_NAME)?.to_string(),
      warehouse: WarehouseCredentials::new(username, password),
      aws: AwsCredentials::from(bundle),
    })
  }
}
