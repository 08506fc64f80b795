//! Command-line argument parsing for tokenpipe
//!
//! Provides clap-based CLI with verbosity control. Every tuning flag is
//! optional so values from the config file apply unless overridden.

use crate::cli::config::Config;
use clap::Parser;
use std::path::PathBuf;

/// tokenpipe - stream tokens from a generation server
#[derive(Parser, Debug, Default)]
#[command(name = "tokenpipe")]
#[command(version)]
#[command(about = "Stream generated tokens from a server-sent-event endpoint", long_about = None)]
pub struct Args {
    /// Server URL for the streaming endpoint
    #[arg(long)]
    pub url: Option<String>,

    /// Per-attempt request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Attempts per prompt before giving up
    #[arg(long)]
    pub retries: Option<u32>,

    /// Backoff delay after the first failed attempt
    #[arg(long, value_name = "MS")]
    pub base_delay_ms: Option<u64>,

    /// Upper bound for any single backoff delay
    #[arg(long, value_name = "MS")]
    pub max_delay_ms: Option<u64>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f64>,

    /// Nucleus sampling threshold
    #[arg(long)]
    pub top_p: Option<f64>,

    /// Check and print API version
    #[arg(long)]
    pub check_version: bool,

    /// Check and print LLM model
    #[arg(long)]
    pub check_model: bool,

    /// Run a single prompt and exit instead of starting the prompt loop
    #[arg(short, long)]
    pub prompt: Option<String>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log file to append to (empty string disables file logging)
    #[arg(long)]
    pub log_file: Option<String>,

    /// Do not load or save prompt history
    #[arg(long)]
    pub no_history: bool,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Args {
    /// Verbosity requested on the command line, if any
    pub fn verbosity(&self) -> Option<Verbosity> {
        if self.quiet {
            Some(Verbosity::Quiet)
        } else {
            match self.verbose {
                0 => None,
                1 => Some(Verbosity::Verbose),
                _ => Some(Verbosity::VeryVerbose),
            }
        }
    }

    /// Whether only metadata queries were requested
    pub fn is_info_query(&self) -> bool {
        self.check_version || self.check_model
    }

    /// Overlay explicit flags onto a loaded configuration
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.server.url = url.clone();
        }
        if let Some(timeout) = self.timeout {
            config.server.timeout_secs = timeout;
        }
        if let Some(retries) = self.retries {
            config.retry.max_attempts = retries;
        }
        if let Some(base) = self.base_delay_ms {
            config.retry.base_delay_ms = base;
        }
        if let Some(max) = self.max_delay_ms {
            config.retry.max_delay_ms = max;
        }
        if let Some(temperature) = self.temperature {
            config.sampling.temperature = temperature;
        }
        if let Some(top_p) = self.top_p {
            config.sampling.top_p = top_p;
        }
        if let Some(file) = &self.log_file {
            config.logging.file = file.clone();
        }
        if self.no_history {
            config.logging.history = false;
        }
        if let Some(verbosity) = self.verbosity() {
            config.logging.verbosity = verbosity.as_str().to_string();
        }
    }
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Parse the config-file spelling
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// `tracing` filter directive for this level
    pub fn log_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::VeryVerbose => "trace",
        }
    }

    /// Check if should show detailed events
    pub fn show_events(&self) -> bool {
        matches!(self, Verbosity::Verbose | Verbosity::VeryVerbose)
    }
}
