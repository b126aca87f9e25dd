use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::files::FileStore;
use crate::http::connection::Connection;
use crate::router::RouteTable;

/// How long to wait for in-flight sessions after shutdown is requested
/// before they are forcibly terminated.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Bind the listening socket and serve until shutdown. Failure to bind is
/// the one server-fatal condition; it aborts startup.
pub async fn run(
    cfg: Arc<Config>,
    routes: Arc<RouteTable>,
    files: Arc<FileStore>,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = format!("0.0.0.0:{}", cfg.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind listening socket on {addr}"))?;

    run_on(listener, cfg, routes, files, shutdown).await
}

/// Accept loop over an already-bound listener.
///
/// Each accepted socket is handed to its own task; the task first acquires a
/// permit from the fixed-size pool semaphore, so at most `poolsize` sessions
/// run at once and the rest queue in accept order. The shutdown channel ends
/// accepting, then in-flight sessions get a bounded grace period to drain.
pub async fn run_on(
    listener: TcpListener,
    cfg: Arc<Config>,
    routes: Arc<RouteTable>,
    files: Arc<FileStore>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    info!("Listening on {}", listener.local_addr()?);
    info!("Connection pool size is {}", cfg.poolsize);
    info!("Connection timeout is {}ms", cfg.timeout);

    let pool = Arc::new(Semaphore::new(cfg.poolsize));
    let mut sessions = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                info!("Shutdown requested, no longer accepting connections");
                break;
            }

            // Reap finished sessions so the set doesn't accumulate.
            Some(_) = sessions.join_next(), if !sessions.is_empty() => {}

            accepted = listener.accept() => {
                let (socket, peer) = accepted.context("accept failed")?;
                debug!("Client connected {}", peer);

                let pool = pool.clone();
                let cfg = cfg.clone();
                let routes = routes.clone();
                let files = files.clone();
                let shutdown = shutdown.clone();

                sessions.spawn(async move {
                    // The permit is the worker slot; holding the socket
                    // while waiting is what queues excess connections.
                    let _permit = pool
                        .acquire_owned()
                        .await
                        .expect("connection pool semaphore closed");

                    let mut conn = Connection::new(socket, &cfg, routes, files, shutdown);
                    if let Err(e) = conn.run().await {
                        error!("Connection error from {}: {}", peer, e);
                    }
                    debug!("Client disconnected {}", peer);
                });
            }
        }
    }

    drop(listener);

    let drain = async {
        while sessions.join_next().await.is_some() {}
    };
    if timeout(SHUTDOWN_GRACE, drain).await.is_err() {
        debug!("grace period elapsed, aborting {} session(s)", sessions.len());
        sessions.shutdown().await;
    }

    info!("Server shutdown");
    Ok(())
}
