use anyhow::Result;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod models;
mod pipeline;
mod services;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // --- Logging setup ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(true)
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;
    tracing::debug!(
        bucket = %cfg.bucket_key,
        file = %cfg.file_path.display(),
        base_url = %cfg.base_url,
        "starting model-uploader"
    );

    // --- Run the call chain; every failure ends up here ---
    match pipeline::run(&cfg).await {
        Ok(summary) => {
            tracing::info!(
                object = %summary.object.object_key,
                urn = %summary.urn,
                complete = summary.manifest.is_some(),
                "done"
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::error!(status = ?err.status(), "Error: {}", err);
            Ok(ExitCode::FAILURE)
        }
    }
}
