use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tandem_providers::ChatClient;
use tandem_server::broadcast::EventBroadcaster;
use tandem_server::config::ServerConfig;
use tandem_server::session::{self, SessionContext};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::try_new("warn").expect("warn filter is valid"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();
}

/// Optional config path from `TANDEM_CONFIG` or the first CLI argument.
fn config_path() -> Option<PathBuf> {
    std::env::var_os("TANDEM_CONFIG")
        .map(PathBuf::from)
        .or_else(|| std::env::args_os().nth(1).map(PathBuf::from))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = ServerConfig::load(config_path().as_deref())?;
    tracing::info!(addr = %config.listen_addr, "starting tandemd");

    let ctx = Arc::new(SessionContext {
        registry: config.registry(),
        chat: ChatClient::new(config.chat_config()),
        broadcaster: EventBroadcaster::new(),
    });

    session::run(ctx, &config.listen_addr).await
}
