mod adapters;
mod cli;
mod config;
mod core;
mod error;
mod logging;
mod tools;

use clap::Parser;

use crate::{cli::Args, config::AppConfig, error::AppResult};

fn main() -> AppResult<()> {
    let args = Args::parse();
    logging::init(&args.log_level);

    let config = AppConfig::from_args(&args);
    tracing::info!(db = %config.db_path.display(), "starting sqlite-agent");

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| error::AppError::Internal(e.to_string()))?;
    rt.block_on(adapters::mcp::server::run(config))
}
