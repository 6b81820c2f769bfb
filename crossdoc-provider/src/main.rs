//! The `crossdoc` binary: extract a PDF with cross-validation and print the
//! consolidated result as JSON.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crossdoc_core::prelude::*;
use crossdoc_provider::{build_registry, Settings};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a PDF and cross-validate it against the configured validators
    Extract {
        /// Path to the PDF file
        pdf: PathBuf,
        /// Override the primary provider
        #[arg(long)]
        primary: Option<String>,
        /// Validator to run (repeatable); replaces VALIDATORS
        #[arg(long = "validator")]
        validators: Vec<String>,
        /// Skip cross-validation and return the primary result only
        #[arg(long)]
        no_cross_validation: bool,
        /// Designated validator for field overrides
        #[arg(long)]
        validation_provider: Option<String>,
        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List providers that have credentials configured
    Providers,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "crossdoc failed");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let mut settings = Settings::from_env()?;

    match command {
        Commands::Providers => {
            for id in settings.configured() {
                let role = if id == settings.primary { "primary" } else { "validator" };
                println!("{id}\t{role}");
            }
            Ok(())
        }
        Commands::Extract {
            pdf,
            primary,
            validators,
            no_cross_validation,
            validation_provider,
            pretty,
        } => {
            if let Some(primary) = primary {
                settings.primary = ProviderId::new(primary);
            }
            if !validators.is_empty() {
                settings.validators = validators.iter().map(ProviderId::new).collect();
            }
            if no_cross_validation {
                settings.cross_validation_enabled = false;
            }
            if let Some(designated) = validation_provider {
                settings.validation_provider = ProviderId::new(designated);
            }

            let document = load(&pdf, &settings)?;
            let registry = build_registry(&settings)?;
            let orchestrator = ExtractionOrchestrator::new(registry);
            let config = settings.orchestrator_config();

            let cancelled = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };
            let consolidated = orchestrator.run_until(&document, &config, cancelled).await?;

            let json = if pretty {
                serde_json::to_string_pretty(&consolidated)?
            } else {
                serde_json::to_string(&consolidated)?
            };
            println!("{json}");
            Ok(())
        }
    }
}

fn load(path: &Path, settings: &Settings) -> anyhow::Result<Document> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let metadata = DocumentMetadata {
        filename: path.file_name().map(|n| n.to_string_lossy().into_owned()),
        ..DocumentMetadata::default()
    };
    Document::with_limits(bytes, metadata, settings.limits)
        .map_err(OrchestratorError::from)
        .with_context(|| format!("rejected {}", path.display()))
}
