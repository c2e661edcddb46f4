//! Runtime configuration assembled once at startup.
//!
//! Required credentials and the channel set are validated here before any
//! network activity. Both failure cases are fatal: missing required
//! configuration and an unknown channel filter terminate the process with
//! a non-zero exit.

use crate::cli::Cli;
use crate::models::{ChannelSpec, Strategy};
use thiserror::Error;
use tracing::info;

/// Errors that abort the run before any external call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {0}")]
    Missing(&'static str),
    #[error("unknown channel: {0}")]
    UnknownChannel(String),
    #[error("failed to read channels file {path}: {source}")]
    ChannelsFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse channels file {path}: {source}")]
    ChannelsParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Immutable configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Channels to process, in order. A singleton set when a CLI filter
    /// was given.
    pub channels: Vec<ChannelSpec>,
    pub webhook_url: String,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub day_offset: i64,
}

/// Channels processed when no channels file is supplied.
fn default_channels() -> Vec<ChannelSpec> {
    vec![ChannelSpec {
        name: "ahboyashreads".to_string(),
        strategy: Strategy::Scrape,
    }]
}

fn load_channels_file(path: &str) -> Result<Vec<ChannelSpec>, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::ChannelsFile {
        path: path.to_string(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::ChannelsParse {
        path: path.to_string(),
        source,
    })
}

impl Config {
    /// Build the run configuration from parsed CLI arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let webhook_url = cli
            .webhook_url
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("SLACK_WEBHOOK_URL"))?;
        let gemini_api_key = cli
            .gemini_api_key
            .clone()
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("GEMINI_API_KEY"))?;

        let mut channels = match &cli.channels_file {
            Some(path) => load_channels_file(path)?,
            None => default_channels(),
        };

        if let Some(filter) = &cli.channel {
            let selected = channels
                .iter()
                .find(|c| &c.name == filter)
                .cloned()
                .ok_or_else(|| ConfigError::UnknownChannel(filter.clone()))?;
            channels = vec![selected];
        }

        info!(
            channel_count = channels.len(),
            model = %cli.gemini_model,
            "Configuration loaded"
        );

        Ok(Self {
            channels,
            webhook_url,
            gemini_api_key,
            gemini_model: cli.gemini_model.clone(),
            day_offset: cli.day_offset,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    /// The missing-config tests parse without flags, so stray environment
    /// variables on the test host would otherwise satisfy clap's env fallback.
    fn clear_env() {
        unsafe {
            std::env::remove_var("SLACK_WEBHOOK_URL");
            std::env::remove_var("GEMINI_API_KEY");
        }
    }

    fn cli_with(args: &[&str]) -> Cli {
        let mut argv = vec![
            "tg_digest",
            "--webhook-url",
            "https://hooks.slack.test/T/B/x",
            "--gemini-api-key",
            "test-key",
        ];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_to_builtin_channel_set() {
        let config = Config::from_cli(&cli_with(&[])).unwrap();
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "ahboyashreads");
        assert_eq!(config.channels[0].strategy, Strategy::Scrape);
    }

    #[test]
    fn test_missing_webhook_is_fatal() {
        clear_env();
        let cli = Cli::parse_from(["tg_digest", "--gemini-api-key", "k"]);
        let err = Config::from_cli(&cli).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Missing("SLACK_WEBHOOK_URL")
        ));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        clear_env();
        let cli = Cli::parse_from(["tg_digest", "--webhook-url", "https://hooks.slack.test/x"]);
        let err = Config::from_cli(&cli).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("GEMINI_API_KEY")));
    }

    #[test]
    fn test_blank_webhook_counts_as_missing() {
        let cli = Cli::parse_from([
            "tg_digest",
            "--webhook-url",
            "  ",
            "--gemini-api-key",
            "k",
        ]);
        assert!(Config::from_cli(&cli).is_err());
    }

    #[test]
    fn test_known_channel_filter_narrows_to_singleton() {
        let config = Config::from_cli(&cli_with(&["ahboyashreads"])).unwrap();
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].name, "ahboyashreads");
    }

    #[test]
    fn test_unknown_channel_filter_is_fatal() {
        let err = Config::from_cli(&cli_with(&["nosuchchannel"])).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownChannel(name) if name == "nosuchchannel"));
    }

    #[test]
    fn test_channels_file_parsing() {
        let dir = std::env::temp_dir();
        let path = dir.join("tg_digest_channels_test.yaml");
        std::fs::write(
            &path,
            "- name: ahboyashreads\n  strategy: scrape\n- name: feeds\n  strategy: translate\n",
        )
        .unwrap();

        let config =
            Config::from_cli(&cli_with(&["-f", path.to_str().unwrap()])).unwrap();
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].name, "feeds");
        assert_eq!(config.channels[1].strategy, Strategy::Translate);

        let _ = std::fs::remove_file(&path);
    }
}
