//! profilectl - Power profile library tool
//!
//! Lists and inspects device profiles, validates custom field variables and
//! checks sensor configuration files against the library.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use common::config_loader::{get_config_value, get_optional_string, get_string_config};
use common::logging::{init_logging, LoggingConfig};
use powercalc_profile::{
    LibraryContext, RemoteSettings, VariableMapping, DEFAULT_REMOTE_TIMEOUT_SECS,
};

pub const ENV_CONFIG_DIR: &str = "POWERCALC_CONFIG_DIR";
pub const ENV_REMOTE_URL: &str = "POWERCALC_REMOTE_URL";
pub const ENV_REMOTE_TIMEOUT: &str = "POWERCALC_REMOTE_TIMEOUT";

#[derive(Parser)]
#[command(name = "profilectl")]
#[command(about = "Power profile library tool")]
#[command(long_about = "Power profile library tool

Examples:
  profilectl manufacturers                          # List manufacturers
  profilectl models signify --search lct            # Search models
  profilectl show test custom-fields --var some_entity=sensor.test
  profilectl check powercalc.yaml                   # Check a sensor configuration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Host configuration directory (default: $POWERCALC_CONFIG_DIR or .)
    #[arg(short = 'c', long = "config-dir", global = true)]
    config_dir: Option<String>,

    /// Remote profile library base URL (default: $POWERCALC_REMOTE_URL)
    #[arg(long = "remote-url", global = true)]
    remote_url: Option<String>,

    /// Remote request timeout in seconds (default: $POWERCALC_REMOTE_TIMEOUT or 30)
    #[arg(long = "remote-timeout", global = true)]
    remote_timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List manufacturers in the library
    Manufacturers,

    /// List or search a manufacturer's models
    Models {
        manufacturer: String,

        /// Case-insensitive substring filter
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Resolve a profile and print it with variables applied
    Show {
        manufacturer: String,
        model: String,

        /// Custom field value, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Check variables against a profile's custom fields
    Validate {
        manufacturer: String,
        model: String,

        /// Custom field value, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },

    /// Validate a sensor configuration file and resolve every sensor
    Check {
        /// YAML, JSON or TOML configuration file
        config_file: PathBuf,
    },
}

fn parse_var(s: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.trim().is_empty() {
        return Err(format!("empty variable name in '{}'", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

fn to_mapping(vars: Vec<(String, String)>) -> VariableMapping {
    vars.into_iter().collect()
}

impl Cli {
    /// Library context from flags, then environment, then defaults
    fn library_context(&self) -> LibraryContext {
        let config_dir = get_string_config(self.config_dir.clone(), ENV_CONFIG_DIR, ".");
        let context = LibraryContext::new(config_dir);
        match get_optional_string(self.remote_url.clone(), ENV_REMOTE_URL) {
            Some(url) => {
                let mut remote = RemoteSettings::new(url);
                remote.timeout_secs = get_config_value(
                    self.remote_timeout,
                    ENV_REMOTE_TIMEOUT,
                    DEFAULT_REMOTE_TIMEOUT_SECS,
                );
                context.with_remote(remote)
            },
            None => context,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure colored output
    if cli.no_color {
        colored::control::set_override(false);
    }

    let logging = LoggingConfig {
        ansi: !cli.no_color,
        ..Default::default()
    }
    .with_level(if cli.verbose { "debug" } else { "warn" });
    init_logging(&logging).context("Failed to initialise logging")?;

    let context = cli.library_context();

    match cli.command {
        Commands::Manufacturers => commands::manufacturers(&context).await,
        Commands::Models {
            manufacturer,
            search,
        } => commands::models(&context, &manufacturer, search.as_deref()).await,
        Commands::Show {
            manufacturer,
            model,
            vars,
            json,
        } => commands::show(&context, &manufacturer, &model, &to_mapping(vars), json).await,
        Commands::Validate {
            manufacturer,
            model,
            vars,
        } => commands::validate(&context, &manufacturer, &model, &to_mapping(vars)).await,
        Commands::Check { config_file } => commands::check(&config_file).await,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("some_entity=sensor.test").unwrap(),
            ("some_entity".to_string(), "sensor.test".to_string())
        );
        // Only the first '=' separates
        assert_eq!(parse_var("k=a=b").unwrap().1, "a=b");
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }

    #[test]
    fn test_show_collects_vars() {
        let cli = Cli::try_parse_from([
            "profilectl",
            "--config-dir",
            "/config",
            "show",
            "test",
            "custom-fields",
            "--var",
            "some_entity=sensor.test",
            "--var",
            "other=sensor.other",
        ])
        .unwrap();

        assert_eq!(
            cli.library_context().config_dir,
            PathBuf::from("/config")
        );
        match cli.command {
            Commands::Show { vars, json, .. } => {
                assert_eq!(vars.len(), 2);
                assert!(!json);
                assert_eq!(to_mapping(vars)["other"], "sensor.other");
            },
            _ => panic!("expected show"),
        }
    }

    #[test]
    fn test_remote_timeout_flag() {
        let cli = Cli::try_parse_from([
            "profilectl",
            "--remote-url",
            "https://profiles.example.com",
            "--remote-timeout",
            "5",
            "manufacturers",
        ])
        .unwrap();

        let remote = cli.library_context().remote.unwrap();
        assert_eq!(remote.base_url, "https://profiles.example.com");
        assert_eq!(remote.timeout_secs, 5);
    }
}
