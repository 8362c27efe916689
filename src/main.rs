mod app;
mod browser;
mod config;
mod coordinator;
mod detector;
mod domain;
mod infrastructure;
mod orchestrator;
mod page_fetch;
mod protocol;
mod scheduler;
mod session;

use anyhow::Result;
use infrastructure::{directories, logging, shutdown};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = config::load_config()?;
    let paths = directories::ensure_directories(&config.directories)?;
    logging::init_tracing(&config, &paths)?;

    let shutdown = shutdown::Shutdown::new();
    shutdown::install_signal_handlers(shutdown.clone());

    let app = app::FinePrintApp::initialize(config, shutdown).await?;
    app.run().await
}
