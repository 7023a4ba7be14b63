use std::str::FromStr;

use ramprice::history::HistoryKeyMode;
use ramprice_server::{ApiServer, router};

const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8055";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .write_style(env_logger::WriteStyle::Never)
        .init();

    let store_path =
        std::env::var("RAMPRICE_STORE").unwrap_or_else(|_| ramprice::DEFAULT_STORE_PATH.into());
    let key_mode = match std::env::var("RAMPRICE_KEY_MODE") {
        Ok(mode) => HistoryKeyMode::from_str(&mode)?,
        Err(_) => HistoryKeyMode::default(),
    };

    let address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.into());
    let app = router(ApiServer::new(&store_path, key_mode));
    let tcp_listener = tokio::net::TcpListener::bind(&address).await?;

    log::info!(
        "Serving {} ({} keys) on address: {}",
        store_path,
        key_mode,
        address
    );

    axum::serve(tcp_listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {e:?}");
            }
        })
        .await?;

    Ok(())
}
