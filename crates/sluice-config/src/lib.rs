//! Sluice Config
//!
//! Run-time configuration for a sluice run. Two kinds of values are resolved
//! once, before any task executes, and are read-only afterwards:
//!
//! - [`Parameters`]: named, externally supplied strings (table names, bucket,
//!   input path). Only presence is validated.
//! - [`Secrets`]: named sensitive values resolved through a
//!   [`SecretResolver`]. They are held as [`secrecy::SecretString`] and never
//!   appear in `Debug` output or serialized reports.

mod error;
mod parameters;
mod secrets;

pub use error::ConfigError;
pub use parameters::Parameters;
pub use secrets::{EnvSecretResolver, SecretResolver, Secrets, StaticSecretResolver};
