use anyhow::Result;
use clap::Parser;
use release_helper::cli::{run, Cli};
use release_helper::load_config::load_or_default;
use release_helper::logging::init_logging;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = load_or_default(cli.config.as_deref())?;

    let _log_guard = init_logging(&settings.logging);
    settings.trace_loaded();
    tracing::info!("CLI arguments parsed, invoking run");

    let result = run(cli, settings).await;
    match &result {
        Ok(_) => tracing::info!("CLI completed successfully"),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result
}
