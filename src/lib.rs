pub mod cli;
pub mod config;
pub mod pipeline;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    let cli = cli::Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    tracing::debug!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let mut stdout = std::io::stdout().lock();
    match cli::execute(&cli, &mut stdout) {
        Ok(cli::Outcome::Success) => ExitCode::SUCCESS,
        Ok(cli::Outcome::ExtractionFailed) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

/// Logs go to stderr so reports on stdout stay clean.
fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new(format!("{}=debug,info", env!("CARGO_CRATE_NAME")))
        } else {
            EnvFilter::new(config::default_log_filter())
        }
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
