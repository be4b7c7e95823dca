//! HTTP API over the render service.
//!
//! Routes:
//! - `GET  /api/v1/ping`
//! - `GET  /api/v1/status`
//! - `GET  /api/v1/datasources/list`
//! - `POST /api/v1/datasources/add`
//! - `GET  /api/v1/datasources/{name}/fs/list?path=`
//! - `GET  /api/v1/datasources/{name}/fs/file?path=`
//! - `GET  /cache/{file}` and `/cache/{namespace}/{file}`

mod error;
mod handlers;
mod middleware;

pub use error::ApiError;
pub use middleware::RESPONSE_TIME_HEADER;

use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::service::RenderService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RenderService>,
}

/// Build the router with CORS and response timing applied.
pub fn router(service: Arc<RenderService>) -> Router {
    let cors = cors_layer(&service.settings().server.cors_origins);
    let state = AppState { service };

    let datasources = Router::new()
        .route("/list", get(handlers::list_sources))
        .route("/add", post(handlers::add_source))
        .route("/{name}/fs/list", get(handlers::list_files))
        .route("/{name}/fs/file", get(handlers::read_file));

    let api = Router::new()
        .route("/ping", get(handlers::ping))
        .route("/status", get(handlers::status))
        .nest("/datasources", datasources);

    Router::new()
        .nest("/api/v1", api)
        .route("/cache/{file}", get(handlers::cached_artifact))
        .route(
            "/cache/{namespace}/{file}",
            get(handlers::cached_namespaced_artifact),
        )
        .layer(axum::middleware::from_fn(middleware::response_time))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("[http] ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

/// Serve until Ctrl+C or until `ct` is cancelled, then stop the watcher
/// and drain the render queue.
pub async fn serve(
    service: Arc<RenderService>,
    bind: &str,
    ct: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    crate::log_event!("http", "listening", "http://{bind}");

    {
        let ct = ct.clone();
        tokio::spawn(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!("[http] failed to listen for ctrl+c: {e}");
                        return;
                    }
                    crate::log_event!("http", "shutdown requested");
                    ct.cancel();
                }
                _ = ct.cancelled() => {}
            }
        });
    }

    axum::serve(listener, router(Arc::clone(&service)))
        .with_graceful_shutdown(ct.clone().cancelled_owned())
        .await?;

    // Joining worker threads blocks.
    tokio::task::spawn_blocking(move || service.shutdown()).await?;
    crate::log_event!("http", "stopped");
    Ok(())
}
