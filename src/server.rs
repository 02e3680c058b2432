use anyhow::Context as _;
use axum::{middleware, routing::get, Router};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, AuthConfig};
use crate::database::manager::DatabaseManager;
use crate::handlers::{diagnostics, health, todo, AppState};
use crate::middleware::{access_log_middleware, basic_auth_middleware, client_os_middleware, AccessLogger};
use crate::services::TodoService;

/// Compose every route with its middleware.
///
/// Order per request: access log (outermost) -> client OS -> basic auth (only
/// on /basic-auth) -> handler. `/log` skips the client OS layer, so it answers
/// `os not found` even when a user agent is sent.
pub fn app(state: AppState, auth: Arc<AuthConfig>, logger: AccessLogger) -> Router {
    Router::new()
        .route("/log", get(diagnostics::os_check))
        .merge(enriched_routes(auth))
        .with_state(state)
        // Global middleware
        .layer(middleware::from_fn_with_state(logger, access_log_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

fn enriched_routes(auth: Arc<AuthConfig>) -> Router<AppState> {
    Router::new()
        // Public
        .route("/healthz", get(health::healthz))
        .route("/no-auth", get(health::healthz))
        .route(
            "/todos",
            get(todo::list)
                .post(todo::create)
                .put(todo::update)
                .delete(todo::delete),
        )
        .merge(basic_auth_routes(auth))
        .merge(diagnostic_routes())
        .route_layer(middleware::from_fn(client_os_middleware))
}

fn basic_auth_routes(auth: Arc<AuthConfig>) -> Router<AppState> {
    Router::new()
        .route("/basic-auth", get(health::healthz))
        .route_layer(middleware::from_fn_with_state(auth, basic_auth_middleware))
}

fn diagnostic_routes() -> Router<AppState> {
    Router::new()
        .route("/os", get(diagnostics::os_check))
        .route("/log2", get(diagnostics::os_check))
        .route("/slow", get(diagnostics::slow_operation))
}

/// Open storage, serve until a shutdown signal, then drain for at most the
/// configured grace period before force-closing what is left.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .with_context(|| format!("failed to open database {}", config.database.path.display()))?;
    DatabaseManager::health_check(&pool).await.context("database health check failed")?;

    let state = AppState::new(TodoService::from_config(pool.clone(), &config.database));
    let router = app(state, Arc::new(config.auth.clone()), AccessLogger::stdout());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Todo API listening on http://{}", bind_addr);

    let result = serve_with_grace(listener, router, shutdown_signal(), config.server.shutdown_grace()).await;

    DatabaseManager::close(&pool).await;
    result
}

/// Serve `router` until `signal` resolves. In-flight requests then get `grace`
/// to finish; after that the server task is aborted and the caller returns, so
/// connections still open are dropped when the runtime shuts down.
pub async fn serve_with_grace<F>(
    listener: tokio::net::TcpListener,
    router: Router,
    signal: F,
    grace: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = stop_rx.await;
    });
    let mut server = tokio::spawn(async move { serve.await });

    tokio::select! {
        joined = &mut server => {
            // Server stopped without being asked to
            joined.context("server task panicked")?.context("server error")?;
            return Ok(());
        }
        _ = signal => {}
    }

    tracing::info!("Shutting down, waiting up to {:?} for in-flight requests", grace);
    let _ = stop_tx.send(());

    match tokio::time::timeout(grace, &mut server).await {
        Ok(joined) => {
            joined.context("server task panicked")?.context("server error")?;
            tracing::info!("Shutdown complete");
        }
        Err(_) => {
            tracing::warn!("Grace period elapsed, closing remaining connections");
            server.abort();
        }
    }
    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on unix, SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, initiating graceful shutdown"),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
