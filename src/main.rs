use std::sync::Arc;

use tokio::sync::watch;

use minnow::config::Config;
use minnow::files::FileStore;
use minnow::http::request::Method;
use minnow::router::{MethodMatcher, RouteTable};
use minnow::server::listener;
use minnow::stats;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Arc::new(Config::load());
    let files = Arc::new(FileStore::new(cfg.directory.clone()));

    let routes = Arc::new(
        RouteTable::builder()
            .route(
                MethodMatcher::Exact(Method::GET),
                "/rest/stats",
                stats::stats_handler(&cfg),
            )
            .build(),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            let _ = shutdown_tx.send(true);
        }
    });

    listener::run(cfg, routes, files, shutdown_rx).await
}
