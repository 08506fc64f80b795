//! Interactive prompt loop
//!
//! Reads prompts, streams each generation to the terminal as tokens arrive
//! and logs the full response with its timing.

pub mod input;

use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::{Duration, Instant};

use crate::cli::Config;
use crate::generation::{GenerationReport, GenerationStatus, RetryPolicy, RetryingGenerator};
use crate::types::GenerationRequest;
pub use crate::repl::input::{classify, InputHandler, UserInput, EXIT_COMMAND};

/// Text and timing of one streamed generation
#[derive(Debug, Clone)]
pub struct PromptResult {
    pub text: String,
    pub elapsed: Duration,
    pub report: GenerationReport,
}

impl PromptResult {
    /// Line logged after a response; nothing is logged for empty output
    pub fn log_line(&self) -> Option<String> {
        if self.text.is_empty() {
            return None;
        }
        Some(format!(
            "Response({:.2} Seconds): {:?}",
            self.elapsed.as_secs_f64(),
            self.text
        ))
    }

    /// Message for a generation that ran out of attempts
    pub fn failure_message(&self) -> Option<String> {
        match &self.report.status {
            GenerationStatus::Exhausted { attempts, last } => Some(format!(
                "All {} attempts failed, giving up (last: {})",
                attempts, last
            )),
            _ => None,
        }
    }
}

/// Stream one generation into `out`, flushing after every token
pub async fn stream_prompt<W: Write>(
    generator: &RetryingGenerator,
    request: GenerationRequest,
    policy: RetryPolicy,
    out: &mut W,
) -> Result<PromptResult> {
    tracing::info!("Prompt: {:?}", request.prompt());

    let start = Instant::now();
    let mut tokens = generator.generate(request, policy);
    let mut text = String::new();

    while let Some(token) = tokens.next().await {
        out.write_all(token.as_bytes())?;
        out.flush()?;
        text.push_str(&token);
    }
    writeln!(out)?;
    out.flush()?;

    Ok(PromptResult {
        text,
        elapsed: start.elapsed(),
        report: tokens.into_report(),
    })
}

/// Whether the loop keeps going after a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Prompt loop coordinator
pub struct ReplSession {
    input: InputHandler,
    generator: RetryingGenerator,
    config: Config,
    policy: RetryPolicy,
}

impl ReplSession {
    /// Create session prompting for the server at `base_url`
    pub fn new(generator: RetryingGenerator, config: Config, base_url: &str) -> Result<Self> {
        let prompt = format!(
            "Enter prompt for server at {} (or type '{}' to quit): ",
            base_url, EXIT_COMMAND
        );
        let input = match config.history_path() {
            Some(path) => InputHandler::with_history(prompt, path)?,
            None => InputHandler::new(prompt)?,
        };
        let policy = config.retry_policy()?;

        Ok(ReplSession {
            input,
            generator,
            config,
            policy,
        })
    }

    /// Run until the user quits
    pub async fn run(&mut self) -> Result<()> {
        loop {
            let prompt = match self.input.read_line() {
                Ok(UserInput::Prompt(prompt)) => prompt,
                Ok(UserInput::Empty) => continue,
                Ok(UserInput::Quit) => break,
                Err(e) => {
                    eprintln!("{} {}", "Error:".red(), e);
                    break;
                }
            };

            match self.handle_prompt(&prompt).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Quit) => break,
                Err(e) => {
                    tracing::error!("Prompt failed: {}", e);
                    eprintln!("{} {}", "Error:".red(), e);
                }
            }
        }

        if let Err(e) = self.input.save_history() {
            tracing::warn!("Could not save history: {}", e);
        }
        Ok(())
    }

    /// Stream one prompt to stdout. Ctrl-C while streaming cancels the
    /// generation and ends the session.
    pub async fn handle_prompt(&mut self, prompt: &str) -> Result<Flow> {
        let request = self.config.request(prompt)?;
        let mut stdout = std::io::stdout();

        let result = tokio::select! {
            result = stream_prompt(&self.generator, request, self.policy, &mut stdout) => result?,
            _ = tokio::signal::ctrl_c() => {
                println!();
                tracing::info!("Generation interrupted");
                return Ok(Flow::Quit);
            }
        };

        if let Some(line) = result.log_line() {
            tracing::info!("{}", line);
        }
        if let Some(message) = result.failure_message() {
            eprintln!("{}", message.red());
        }
        Ok(Flow::Continue)
    }
}
