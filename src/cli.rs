//! Command-line interface parsing for Fountain Map
//!
//! This module handles parsing of CLI arguments using clap. Flags override the
//! config file and seed the initial filter criteria.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::config::ConfigOverrides;
use crate::filter::FilterCriteria;

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// Zero days would make every cache entry stale on arrival
    #[error("Invalid expiry: '{0}'. The cache expiry must be at least 1 day")]
    InvalidExpiry(u32),

    /// A filter flag was given an empty value
    #[error("Empty value for --{0}")]
    EmptyFilterValue(&'static str),
}

/// Fountain Map - Public drinking-water sources on a terminal map
#[derive(Parser, Debug)]
#[command(name = "fountainmap")]
#[command(about = "Public drinking-water sources on a terminal map")]
#[command(version)]
pub struct Cli {
    /// Primary data endpoint (URL or file path)
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Fallback source: `bundled`, a file path, or a URL
    #[arg(long, value_name = "SOURCE")]
    pub fallback: Option<String>,

    /// Directory holding the cache entry
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Days a cached payload stays valid
    #[arg(long, value_name = "N")]
    pub expiry_days: Option<u32>,

    /// Ignore the cache on start and fetch fresh data
    #[arg(long)]
    pub refresh: bool,

    /// Delete the cache entry and exit
    #[arg(long, conflicts_with = "list")]
    pub clear_cache: bool,

    /// Print the filtered water sources and exit, without the terminal UI
    #[arg(long)]
    pub list: bool,

    /// Only show sources in this district (repeatable)
    ///
    /// Examples:
    ///   fountainmap --district Centro --district Retiro
    #[arg(long = "district", value_name = "NAME")]
    pub districts: Vec<String>,

    /// Only show sources of this type (repeatable)
    #[arg(long = "type", value_name = "NAME")]
    pub types: Vec<String>,

    /// Only show operational sources
    #[arg(long)]
    pub operational_only: bool,

    /// Alternate config file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// How the binary should run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Interactive terminal map
    #[default]
    Interactive,
    /// Print once and exit
    List,
    /// Delete the cache entry and exit
    ClearCache,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone, Default)]
pub struct StartupConfig {
    /// What to do
    pub mode: RunMode,
    /// Whether the first load bypasses the cache
    pub force_refresh: bool,
    /// Criteria applied to the first render
    pub criteria: FilterCriteria,
    /// Values that replace config file settings
    pub overrides: ConfigOverrides,
    /// Config file to read instead of the default one
    pub config_path: Option<PathBuf>,
}

/// Validates repeatable filter values
///
/// # Arguments
/// * `flag` - Flag name, for the error message
/// * `values` - Values given on the command line
///
/// # Returns
/// * `Ok(())` if every value is non-empty after trimming
/// * `Err(CliError::EmptyFilterValue)` otherwise
fn check_filter_values(flag: &'static str, values: &[String]) -> Result<(), CliError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(CliError::EmptyFilterValue(flag));
    }
    Ok(())
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Arguments
    /// * `cli` - The parsed CLI struct
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with appropriate settings
    /// * `Err(CliError)` if a value is out of range
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        if let Some(days) = cli.expiry_days {
            if days == 0 {
                return Err(CliError::InvalidExpiry(days));
            }
        }
        check_filter_values("district", &cli.districts)?;
        check_filter_values("type", &cli.types)?;

        let mode = if cli.clear_cache {
            RunMode::ClearCache
        } else if cli.list {
            RunMode::List
        } else {
            RunMode::Interactive
        };

        let criteria = FilterCriteria {
            districts: cli.districts.iter().map(|d| d.trim().to_string()).collect(),
            types: cli.types.iter().map(|t| t.trim().to_string()).collect(),
            operational_only: cli.operational_only,
        };

        Ok(StartupConfig {
            mode,
            force_refresh: cli.refresh,
            criteria,
            overrides: ConfigOverrides {
                endpoint: cli.endpoint.clone(),
                fallback: cli.fallback.clone(),
                cache_dir: cli.cache_dir.clone(),
                expiry_days: cli.expiry_days,
            },
            config_path: cli.config.clone(),
        })
    }
}
