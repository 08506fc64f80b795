//! tokenpipe - CLI entry point

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;
use tokenpipe::{
    cli::{Args, Config},
    info::{self, InfoFetcher},
    repl::{stream_prompt, ReplSession},
    telemetry::{logging::init_logging, TelemetryCollector, TelemetryDisplay},
    HttpTransport, RetryingGenerator,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = Config::load(args.config.clone())?;
    args.apply_to(&mut config);
    config.validate()?;

    let verbosity = config.verbosity();
    init_logging(verbosity, config.log_file().as_deref())?;

    if args.is_info_query() {
        return check_server(&args, &config).await;
    }

    let telemetry = TelemetryCollector::new();
    let transport = HttpTransport::with_config(&config.server.url, config.timeout())?;
    let generator = RetryingGenerator::new(Arc::new(transport)).with_telemetry(telemetry.clone());

    let succeeded = match &args.prompt {
        Some(prompt) => run_once(&generator, &config, prompt).await?,
        None => {
            let base = info::base_url(&config.server.url)?;
            let mut session = ReplSession::new(generator, config, &base)?;
            session.run().await?;
            true
        }
    };

    let display = TelemetryDisplay::new(telemetry, verbosity);
    if display.should_show_details() {
        display.display_summary();
    }

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Print the server's API version and/or model, then exit
async fn check_server(args: &Args, config: &Config) -> Result<()> {
    let fetcher = InfoFetcher::new(&config.server.url, config.timeout())?;

    if args.check_version {
        match fetcher.version().await {
            Ok(info) => println!("API Version: {}", info.result.as_deref().unwrap_or("Unknown")),
            Err(e) => println!("Failed to fetch API version: {}", e),
        }
    }

    if args.check_model {
        match fetcher.model().await {
            Ok(info) => println!("LLM Model: {}", info.result.as_deref().unwrap_or("Unknown")),
            Err(e) => println!("Failed to fetch LLM model: {}", e),
        }
    }

    Ok(())
}

/// Stream a single prompt; false when every attempt failed
async fn run_once(generator: &RetryingGenerator, config: &Config, prompt: &str) -> Result<bool> {
    let request = config.request(prompt)?;
    let mut stdout = std::io::stdout();

    let result = stream_prompt(generator, request, config.retry_policy()?, &mut stdout).await?;
    if let Some(line) = result.log_line() {
        tracing::info!("{}", line);
    }

    match result.failure_message() {
        Some(message) => {
            eprintln!("{}", message.red());
            Ok(false)
        }
        None => Ok(true),
    }
}
