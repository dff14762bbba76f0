use std::sync::Arc;

use clap::Parser;

use geode_index_client::cache::ServerCaches;
use geode_index_client::config;
use geode_index_client::endpoints::ServerClient;
use geode_index_client::integration::index::ReqwestTransport;
use geode_index_client::logging;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init(&config::build_log_config())?;
    let args = cli::Args::parse();

    let config = config::build_config()?;
    log::debug!("Using index at {}", config.base_url());
    let transport = Arc::new(ReqwestTransport::new(&config)?);
    let caches = Arc::new(ServerCaches::new(config.cache()));
    let client = ServerClient::new(config, transport, caches);

    if let Err(e) = cli::run(args, &client).await {
        log::error!("{}", e);
        return Err(e);
    }
    anyhow::Ok(())
}
