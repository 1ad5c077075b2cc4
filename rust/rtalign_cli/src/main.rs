mod cli;
mod config;
mod errors;
mod processing;

use clap::Parser;
use tracing::info;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use config::Config;

#[cfg(target_os = "windows")]
use mimalloc::MiMalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() -> std::result::Result<(), errors::CliError> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        ) // This uses RUST_LOG environment variable
        .init();

    let args = Cli::parse();
    let config = Config::with_cli_args(&args)?;
    info!("Parsed configuration: {:#?}", config);

    let output_config = config.output()?;
    if let Err(e) = std::fs::create_dir_all(&output_config.directory) {
        return Err(errors::CliError::Io {
            source: e.to_string(),
            path: Some(output_config.directory.to_string_lossy().to_string()),
        });
    }

    let calibration = processing::process_collection(&config)?;
    match calibration.reference_run.as_deref() {
        Some(reference) => info!(
            "Collection {} calibrated onto {} using {} anchors",
            calibration.collection,
            reference,
            calibration.anchors.len()
        ),
        None => info!(
            "Collection {} left uncalibrated ({} peptidoforms)",
            calibration.collection,
            calibration.consensus.len()
        ),
    }

    Ok(())
}
