use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sluice_artifact::{FsStore, ObjectStore};
use sluice_config::{EnvSecretResolver, Parameters, Secrets};
use sluice_pipeline::{SalesLoad, resolve_secrets};
use sluice_runtime::{NodeStatus, RuntimeConfig};
use sluice_warehouse::{HttpQueryExecutor, WarehouseConfig};

/// Sluice - load sales transactions from CSV into the warehouse
#[derive(Parser)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.sluice)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the full load: convert, stage, create tables, insert
  Run(RunArgs),

  /// Convert a CSV file to Parquet without loading it
  Convert {
    /// Path to the CSV file
    csv_file: PathBuf,

    /// Where to write the Parquet file
    output: PathBuf,
  },
}

#[derive(clap::Args)]
struct RunArgs {
  /// JSON file with the run parameters
  #[arg(long)]
  params: Option<PathBuf>,

  /// Set or override a parameter (repeatable)
  #[arg(long = "param", value_name = "KEY=VALUE")]
  overrides: Vec<String>,

  /// Read secrets from `{prefix}NAME` environment variables
  #[arg(long, default_value = "")]
  secret_prefix: String,

  /// Directory standing in for object storage (default: <data-dir>/staging)
  #[arg(long)]
  staging_dir: Option<PathBuf>,

  /// Stage to Amazon S3 in this region instead of the local staging directory
  #[cfg(feature = "s3")]
  #[arg(long)]
  s3_region: Option<String>,

  /// Base URL of the warehouse account API
  #[arg(long)]
  api_url: Option<String>,

  /// Per-request timeout for warehouse calls, in seconds
  #[arg(long, default_value_t = 600)]
  request_timeout: u64,

  /// Maximum number of nodes running at once
  #[arg(long, default_value_t = 4)]
  workers: usize,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sluice=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run(args)) => run(args, data_dir(cli.data_dir)?)?,
    Some(Commands::Convert { csv_file, output }) => convert(csv_file, output)?,
    None => {
      println!("sluice - use --help to see available commands");
    }
  }

  Ok(())
}

/// Only `run` stages data, so only `run` needs a home directory.
fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
  match explicit {
    Some(dir) => Ok(dir),
    None => Ok(
      dirs::home_dir()
        .context("could not determine home directory")?
        .join(".sluice"),
    ),
  }
}

fn convert(csv_file: PathBuf, output: PathBuf) -> Result<()> {
  let bytes = sluice_transform::csv_to_parquet(&csv_file)
    .with_context(|| format!("failed to convert {}", csv_file.display()))?;
  std::fs::write(&output, &bytes)
    .with_context(|| format!("failed to write {}", output.display()))?;

  eprintln!("Wrote {} bytes to {}", bytes.len(), output.display());
  Ok(())
}

fn run(args: RunArgs, data_dir: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run_async(args, data_dir).await })
}

async fn run_async(args: RunArgs, data_dir: PathBuf) -> Result<()> {
  let parameters = load_parameters(&args)?;

  let resolver = EnvSecretResolver::with_prefix(&args.secret_prefix);
  let secrets = resolve_secrets(&resolver)
    .await
    .context("failed to resolve secrets")?;

  let store = object_store(&args, &data_dir, &secrets)?;

  let mut warehouse = WarehouseConfig {
    request_timeout: Duration::from_secs(args.request_timeout),
    ..WarehouseConfig::default()
  };
  if let Some(api_url) = &args.api_url {
    warehouse.api_url = api_url.clone();
  }
  let executor = HttpQueryExecutor::new(warehouse).context("failed to create warehouse client")?;

  let load = SalesLoad::new(store, Arc::new(executor))?.with_runtime_config(RuntimeConfig {
    max_concurrency: args.workers,
  });

  let report = load.run(&parameters, &secrets).await?;

  println!("{}", serde_json::to_string_pretty(&report)?);

  if !report.succeeded {
    bail!(
      "run {} failed: failed nodes [{}], skipped nodes [{}]",
      report.run_id,
      report.nodes_with(NodeStatus::Failed).join(", "),
      report.nodes_with(NodeStatus::Skipped).join(", ")
    );
  }

  eprintln!("Run {} completed", report.run_id);
  Ok(())
}

/// Parameters file first, then `--param` overrides in order.
fn load_parameters(args: &RunArgs) -> Result<Parameters> {
  let mut parameters = match &args.params {
    Some(path) => Parameters::from_json_file(path)?,
    None => Parameters::new(),
  };

  for assignment in &args.overrides {
    let (name, value) = Parameters::parse_assignment(assignment)?;
    parameters.insert(name, value);
  }

  Ok(parameters)
}

#[cfg(not(feature = "s3"))]
fn object_store(
  args: &RunArgs,
  data_dir: &std::path::Path,
  _secrets: &Secrets,
) -> Result<Arc<dyn ObjectStore>> {
  Ok(Arc::new(fs_store(args, data_dir)))
}

#[cfg(feature = "s3")]
fn object_store(
  args: &RunArgs,
  data_dir: &std::path::Path,
  secrets: &Secrets,
) -> Result<Arc<dyn ObjectStore>> {
  use secrecy::ExposeSecret;
  use sluice_warehouse::{AwsCredentialBundle, AwsCredentials};

  let Some(region) = &args.s3_region else {
    return Ok(Arc::new(fs_store(args, data_dir)));
  };

  let bundle: AwsCredentialBundle = secrets.require_json(sluice_pipeline::secrets::AWS_CREDENTIALS)?;
  let aws = AwsCredentials::from(bundle);
  Ok(Arc::new(sluice_artifact::S3Store::from_access_key(
    aws.access_key_id.expose_secret(),
    aws.secret_access_key.expose_secret(),
    region.clone(),
    None,
  )))
}

fn fs_store(args: &RunArgs, data_dir: &std::path::Path) -> FsStore {
  let staging = args
    .staging_dir
    .clone()
    .unwrap_or_else(|| data_dir.join("staging"));
  tracing::info!(path = %staging.display(), "staging_directory");
  FsStore::new(staging)
}
