//! Serve command: HTTP API plus live re-rendering.

use std::sync::Arc;

use crate::config::Settings;
use crate::service::RenderService;

pub struct ServeArgs {
    pub bind: Option<String>,
    pub no_watch: bool,
}

pub async fn run(args: ServeArgs, config: Settings) -> anyhow::Result<()> {
    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let watch = !args.no_watch;

    // Watcher setup and warm-up walks are blocking work.
    let service = tokio::task::spawn_blocking(move || -> anyhow::Result<RenderService> {
        let service = RenderService::start(config, watch)?;
        if watch {
            let watched = service.watch_registered()?;
            crate::log_event!("serve", "watching", "{watched} data sources");
        }
        Ok(service)
    })
    .await??;

    serve_http(Arc::new(service), &bind).await
}

#[cfg(feature = "http-server")]
async fn serve_http(service: Arc<RenderService>, bind: &str) -> anyhow::Result<()> {
    let ct = tokio_util::sync::CancellationToken::new();
    crate::server::serve(service, bind, ct).await
}

#[cfg(not(feature = "http-server"))]
async fn serve_http(service: Arc<RenderService>, _bind: &str) -> anyhow::Result<()> {
    // Without the HTTP layer, keep the watcher running until Ctrl+C.
    eprintln!("HTTP server support is not compiled in; watching only.");
    tokio::signal::ctrl_c().await?;
    tokio::task::spawn_blocking(move || service.shutdown()).await?;
    Ok(())
}
