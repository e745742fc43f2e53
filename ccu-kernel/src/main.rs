/**
 * CCU KERNEL - Point d'entrée du serveur
 *
 * RÔLE : Bootstrap : .env, logs, config, store CSV, routeur HTTP.
 * Un seul process sert toutes les sessions ; le fichier CSV est partagé
 * sans verrou (le dernier qui sauvegarde gagne).
 */

use anyhow::Context;
use ccu_kernel::config::load_config;
use ccu_kernel::http::{build_router, AppState};
use ccu_kernel::session::SWEEP_EVERY;
use ccu_kernel::store::CsvTableStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cfg = load_config().await.context("loading kernel config")?;

    let store = CsvTableStore::new(&cfg.data_file);
    info!(data_file = ?store.path(), "using CSV store");

    let state = AppState::new(Arc::new(store));
    state.sessions.spawn_idle_sweeper(cfg.session_idle(), SWEEP_EVERY);
    info!(idle_secs = cfg.session_idle_secs, "session sweeper started");

    let app = build_router(state);

    let listener = TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;
    info!("listening on http://{}", cfg.bind);
    axum::serve(listener, app).await.context("HTTP server stopped")?;
    Ok(())
}
