use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::command::SystemRunner;
use crate::config::Config;
use crate::processor::Pipeline;
use crate::web::start_web_server;

mod command;
mod config;
mod error;
mod format;
mod models;
mod processor;
mod web;

const DEFAULT_LOG_FILTER: &str = "loopserve=info";

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;

    let runner = Arc::new(SystemRunner::new(config.tool_timeout));
    let pipeline = Pipeline::new(config, runner);

    start_web_server(pipeline).await
}
