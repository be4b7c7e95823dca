//! One-shot warm-up: render what is missing, wait, exit.

use std::time::Duration;

use crate::config::Settings;
use crate::service::RenderService;

pub fn run(config: Settings, source: Option<&str>, timeout_secs: u64) -> anyhow::Result<()> {
    let service = RenderService::start(config, false)?;
    let reports = service.warm_up(source, Duration::from_secs(timeout_secs))?;
    let stats = service.pipeline().stats();
    service.shutdown();

    for (name, report) in &reports {
        println!(
            "{name}: {} enqueued, {} already cached",
            report.enqueued, report.already_cached
        );
    }
    println!(
        "Rendered {}, failed {}, cache hits {}",
        stats.rendered, stats.failed, stats.cache_hits
    );

    if stats.failed > 0 {
        anyhow::bail!("{} renders failed; see the log for compiler output", stats.failed);
    }
    Ok(())
}
