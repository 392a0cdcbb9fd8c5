// Command line and environment configuration
use crate::emt_credential::Credential;
use crate::emt_models::{EmtError, Result};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.emtpalma.cat/maas/api/v1/agency";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_TIMEZONE: &str = "Europe/Madrid";

#[derive(Debug, Parser)]
#[command(name = "emt-bus", version, about = "EMT Palma bus arrivals and line browser")]
pub struct Cli {
    /// File holding the API bearer token
    #[arg(long, env = "EMT_TOKEN_FILE")]
    pub token_file: Option<PathBuf>,

    #[arg(long, env = "EMT_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Request timeout in seconds
    #[arg(long, env = "EMT_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// IANA time zone used for the "last updated" stamp
    #[arg(long, env = "EMT_TIMEZONE", default_value = DEFAULT_TIMEZONE)]
    pub timezone: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum Command {
    /// Open the desktop window (default)
    Gui,
    /// Next buses at a stop
    Arrivals {
        stop: String,
        /// Print the display bundle as JSON
        #[arg(long)]
        json: bool,
    },
    /// All lines with their colors
    Lines,
    /// Sublines of a line
    Sublines { line_id: String },
    /// Directions of a subline
    Directions { subline_id: String },
    /// Stops and shape of one trip
    Route { line_id: String, trip_id: String },
    /// Interactive terminal menu
    Menu,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub token_file: PathBuf,
    pub base_url: String,
    pub timeout: Duration,
    pub timezone: Tz,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            token_file: PathBuf::from(Credential::FILE_NAME),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            timezone: chrono_tz::Europe::Madrid,
        }
    }
}

impl Settings {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let timezone: Tz = cli
            .timezone
            .parse()
            .map_err(|e| EmtError::InvalidInput(format!("unknown time zone '{}': {}", cli.timezone, e)))?;

        if cli.timeout == 0 {
            return Err(EmtError::InvalidInput("timeout must be at least one second".to_string()));
        }

        Ok(Settings {
            token_file: cli.token_file.clone().unwrap_or_else(Credential::default_path),
            base_url: cli.base_url.clone(),
            timeout: Duration::from_secs(cli.timeout),
            timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_empty_command_line() {
        let cli = Cli::try_parse_from(["emt-bus", "--token-file", "secret.txt"]).unwrap();
        let settings = Settings::from_cli(&cli).unwrap();
        assert_eq!(settings.token_file, PathBuf::from("secret.txt"));
        assert_eq!(settings.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(cli.command, None);
    }

    #[test]
    fn arrivals_subcommand() {
        let cli = Cli::try_parse_from(["emt-bus", "arrivals", "123", "--json"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Arrivals {
                stop: "123".to_string(),
                json: true
            })
        );
    }

    #[test]
    fn rejects_unknown_timezone() {
        let cli = Cli::try_parse_from(["emt-bus", "--timezone", "Mars/Olympus"]).unwrap();
        assert!(matches!(Settings::from_cli(&cli), Err(EmtError::InvalidInput(_))));
    }
}
