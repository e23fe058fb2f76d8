/**
 * vSPHERE MANAGER KERNEL - Point d'entrée du serveur
 *
 * RÔLE : Bootstrap : .env, config YAML, logging, runtime, session store, HTTP.
 *
 * ARCHITECTURE : API REST Axum devant une session vSphere unique (VI/JSON).
 * La connexion est ouverte par POST /login et fermée à l'arrêt du process.
 */

mod auth;
mod config;
mod controllers;
mod http;
mod logging;
mod models;
mod session;
mod vsphere;

use anyhow::Context;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use vsphere_vim::{VimConnector, VimJsonConnector};

use crate::config::{load_config, ConfigSource, ManagerConfig};
use crate::http::AppState;
use crate::session::SessionStore;

fn main() -> anyhow::Result<()> {
    // .env optionnel
    dotenvy::dotenv().ok();

    let loaded = load_config();
    logging::init_logging(&loaded.config.logging)?;
    match &loaded.source {
        ConfigSource::File(path) => info!("[kernel] config loaded from {}", path.display()),
        ConfigSource::Defaults(reason) => warn!("[kernel] using default config ({reason})"),
    }

    let workers = loaded.config.server.worker_threads.max(1);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(serve(loaded.config))
}

async fn serve(cfg: ManagerConfig) -> anyhow::Result<()> {
    let connector: Arc<dyn VimConnector> = Arc::new(
        VimJsonConnector::new(cfg.vsphere.api_release.clone()).accept_invalid_certs(cfg.vsphere.accept_invalid_certs),
    );
    let sessions = Arc::new(SessionStore::new(connector));

    let ip: IpAddr = cfg
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid bind address {}", cfg.server.bind))?;
    let addr = SocketAddr::new(ip, cfg.server.port);
    let workers = cfg.server.worker_threads.max(1);

    let app = http::build_router(AppState::new(sessions.clone(), cfg));

    let listener = TcpListener::bind(addr).await.with_context(|| format!("cannot bind {addr}"))?;
    info!("[kernel] vSphere Manager listening on http://{addr} ({workers} workers)");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    sessions.disconnect().await;
    info!("[kernel] stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("[kernel] cannot listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("[kernel] shutdown requested");
}
