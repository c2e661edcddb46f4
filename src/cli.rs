//! Command-line interface definitions for the digest pipeline.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Secrets and endpoints can be provided via flags or environment variables
//! (a `.env` file is loaded before parsing).

use clap::Parser;

/// Command-line arguments for the daily digest run.
///
/// # Examples
///
/// ```sh
/// # Process every configured channel
/// tg_digest
///
/// # Process a single configured channel
/// tg_digest ahboyashreads
///
/// # Re-run for the day before yesterday
/// tg_digest --day-offset -2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Restrict the run to one configured channel by name
    pub channel: Option<String>,

    /// Optional path to a channels.yaml file (list of {name, strategy})
    #[arg(short = 'f', long)]
    pub channels_file: Option<String>,

    /// Slack incoming-webhook URL for delivery
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true)]
    pub webhook_url: Option<String>,

    /// Google Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model to call
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.0-flash")]
    pub gemini_model: String,

    /// Day offset of the digest window relative to today (KST)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub day_offset: i64,
}
