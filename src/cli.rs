//! Command-line shell around the extraction pipeline.
//!
//! ## Commands
//!
//! - `extract`: send a conversation to the model and report the events (default)
//! - `validate`: re-check a saved model response without calling the model
//! - `prompt`: print the prompt that would be sent
//! - `schemas`: list the event schemas
//! - `models`: list models available on the Ollama server

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use uuid::Uuid;

use crate::config::{
    ModelSettings, APP_VERSION, DEFAULT_MAX_NEW_TOKENS, DEFAULT_MODEL, DEFAULT_OLLAMA_URL,
    DEFAULT_TIMEOUT_SECS,
};
use crate::pipeline::structuring::{
    build_extraction_prompt, process_response, render_failure_json, render_failure_text,
    render_result_json, render_result_text, render_schemas_text, EventExtractor,
    ExtractionError, ExtractionFailure, ExtractionResult, OllamaClient, SchemaRegistry,
    StructuredExtractor, SAMPLE_CONVERSATION,
};

#[derive(Parser, Debug)]
#[command(name = "event-extract")]
#[command(version = APP_VERSION)]
#[command(about = "Extract schema-validated events from conversation text with a local LLM", long_about = None)]
pub struct Cli {
    /// Base URL of the Ollama server
    #[arg(long, global = true, env = "EVENT_EXTRACT_OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub ollama_url: String,

    /// Model name as known to Ollama
    #[arg(long, global = true, env = "EVENT_EXTRACT_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Request timeout for the model call
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Generation cap passed to the model
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_NEW_TOKENS)]
    pub max_new_tokens: u32,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract events from a conversation (sample conversation if no input)
    Extract {
        /// Conversation text file, or `-` for stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Sanitize and validate a saved model response
    Validate {
        /// Raw model response file, or `-` for stdin
        response: PathBuf,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the extraction prompt
    Prompt {
        /// Conversation text file, or `-` for stdin
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// List the registered event schemas
    Schemas,

    /// List models available on the Ollama server
    Models,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write output: {0}")]
    Output(#[from] std::io::Error),

    #[error("cannot render JSON: {0}")]
    Render(#[from] serde_json::Error),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// How a successfully executed command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    ExtractionFailed,
}

impl Cli {
    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            base_url: self.ollama_url.clone(),
            model: self.model.clone(),
            timeout_secs: self.timeout_secs,
            max_new_tokens: self.max_new_tokens,
        }
    }
}

/// Run the parsed command, writing the report to `out`.
pub fn execute(cli: &Cli, out: &mut impl Write) -> Result<Outcome, CliError> {
    let registry = SchemaRegistry::builtin();

    match &cli.command {
        None => extract(cli, None, OutputFormat::Text, out),
        Some(Command::Extract { input, format }) => extract(cli, input.as_deref(), *format, out),
        Some(Command::Validate { response, format }) => {
            let raw = read_source(response)?;
            let outcome = process_response(Uuid::new_v4(), raw, &registry);
            report(outcome, *format, out)
        }
        Some(Command::Prompt { input }) => {
            let conversation = read_conversation(input.as_deref())?;
            write!(out, "{}", build_extraction_prompt(&conversation))?;
            Ok(Outcome::Success)
        }
        Some(Command::Schemas) => {
            write!(out, "{}", render_schemas_text(&registry))?;
            Ok(Outcome::Success)
        }
        Some(Command::Models) => {
            let client = OllamaClient::new(&cli.model_settings())?;
            for name in client.list_models()? {
                let marker = if name.starts_with(client.model()) { " *" } else { "" };
                writeln!(out, "{name}{marker}")?;
            }
            Ok(Outcome::Success)
        }
    }
}

fn extract(
    cli: &Cli,
    input: Option<&Path>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    let conversation = read_conversation(input)?;
    let settings = cli.model_settings();
    tracing::info!(model = %settings.model, url = %settings.base_url, "Using Ollama backend");

    let extractor = EventExtractor::new(Box::new(OllamaClient::new(&settings)?));
    report(extractor.extract(&conversation), format, out)
}

fn report(
    outcome: Result<ExtractionResult, ExtractionFailure>,
    format: OutputFormat,
    out: &mut impl Write,
) -> Result<Outcome, CliError> {
    match outcome {
        Ok(result) => {
            let rendered = match format {
                OutputFormat::Text => render_result_text(&result),
                OutputFormat::Json => render_result_json(&result)?,
            };
            writeln!(out, "{}", rendered.trim_end())?;
            Ok(Outcome::Success)
        }
        Err(failure) => {
            let rendered = match format {
                OutputFormat::Text => render_failure_text(&failure),
                OutputFormat::Json => render_failure_json(&failure)?,
            };
            writeln!(out, "{}", rendered.trim_end())?;
            Ok(Outcome::ExtractionFailed)
        }
    }
}

/// Conversation from a file, stdin (`-`), or the built-in sample.
pub fn read_conversation(input: Option<&Path>) -> Result<String, CliError> {
    match input {
        None => Ok(SAMPLE_CONVERSATION.to_string()),
        Some(path) => read_source(path),
    }
}

fn read_source(path: &Path) -> Result<String, CliError> {
    let io_err = |source| CliError::Io {
        path: path.display().to_string(),
        source,
    };

    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(io_err)?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).map_err(io_err)
}
