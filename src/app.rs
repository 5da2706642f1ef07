/*
 * Responsibility
 * - Config load -> pool/service construction -> Router assembly
 * - Middleware application (error shaping, auth gateway, CORS, HTTP hygiene)
 * - axum::serve() startup; any configuration problem aborts here, before
 *   the listener binds
 */
use std::sync::Arc;
use std::{panic, process};

use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::db::Db;
use crate::middleware;
use crate::services::user_client::UserClient;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,backend_core=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        // (stderr can be hidden depending on how the process is launched.)
        tracing::error!(?info, "panic");

        // In development, fail fast: crash the whole process so we notice immediately.
        // In production, prefer the default behavior (stderr) and let the server keep running.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting backend-core in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_state(config: &Config) -> Result<AppState> {
    // Settings are resolved and validated before any pool exists; a broken
    // writer or reader endpoint stops the process right here.
    let settings = config.db_settings_provider.provide()?;
    let db = Db::connect(&settings, config.db_max_connections).await?;

    let validator = UserClient::new(
        config.users_service_url.clone(),
        config.users_service_timeout,
    )?;

    Ok(AppState::new(
        db,
        Arc::new(validator),
        config.open_paths.clone(),
    ))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let routes = Router::new()
        .route("/health", get(health))
        .nest("/v1/api", api::v1::routes());

    // The gateway sits below the error responder so its rejections are
    // shaped and logged like every other failure.
    let routes = middleware::auth::gateway::apply(routes, state.clone());
    let app = middleware::error_responder::apply(routes.with_state(state));

    let app = middleware::security_headers::apply(app);
    let app = middleware::cors::apply(app, config);
    middleware::http::apply(app, config)
}
