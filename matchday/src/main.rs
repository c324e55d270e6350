use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod telemetry;

#[derive(Parser)]
#[command(name = "matchday")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = "matchday.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    Gateway,
    Pipeline,
}

#[derive(thiserror::Error, Debug)]
enum ServiceError {
    #[error("missing `{0}` section in config")]
    MissingSection(&'static str),
    #[error(transparent)]
    Gateway(#[from] gateway::GatewayServiceError),
    #[error(transparent)]
    Pipeline(#[from] pipeline::PipelineError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match config::Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(config.metrics.as_ref());

    let result = match cli.command {
        CliCommand::Gateway => run_gateway(config.gateway).await,
        CliCommand::Pipeline => run_pipeline(config.pipeline).await,
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "service exited");
            ExitCode::FAILURE
        }
    }
}

async fn run_gateway(config: Option<gateway::config::Config>) -> Result<(), ServiceError> {
    let config = config.ok_or(ServiceError::MissingSection("gateway"))?;
    tracing::info!("starting gateway");
    gateway::run(config).await?;
    Ok(())
}

async fn run_pipeline(config: Option<pipeline::config::Config>) -> Result<(), ServiceError> {
    let config = config.ok_or(ServiceError::MissingSection("pipeline"))?;
    tracing::info!("starting pipeline");
    pipeline::run(config).await?;
    Ok(())
}
