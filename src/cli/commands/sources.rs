//! Data source management commands.

use std::path::Path;

use anyhow::Context;

use crate::config::Settings;
use crate::datasource::DataSourceStore;
use crate::service::RenderService;
use crate::watcher::ExtensionFilter;

pub fn run_list(config: &Settings, json: bool) -> anyhow::Result<()> {
    let store = DataSourceStore::new(config.data_store_path());
    let sources = store
        .get()
        .with_context(|| format!("Failed to read {}", store.path().display()))?;

    if json {
        let filter = ExtensionFilter::new(&config.watch.extensions);
        let listing: Vec<_> = sources
            .iter()
            .map(|(name, record)| {
                serde_json::json!({ "name": name, "metadata": record.open(&filter).describe() })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    if sources.is_empty() {
        println!("No data sources registered.");
        println!("Add one with: texbook sources add <name> <path>");
        return Ok(());
    }

    println!("{:<20} {:<8} {:<12} PATH", "NAME", "TYPE", "ID");
    for (name, record) in &sources {
        println!(
            "{name:<20} {:<8} {:<12} {}",
            record.kind,
            record.id,
            record.path.display()
        );
    }
    Ok(())
}

pub fn run_add(config: Settings, name: &str, path: &Path, kind: &str) -> anyhow::Result<()> {
    // No watcher: the source is picked up by the next `serve`.
    let service = RenderService::start(config, false)?;
    let record = service.add_source(name, kind, path)?;
    service.shutdown();

    println!(
        "Added data source '{name}' ({}, id {}) at {}",
        record.kind,
        record.id,
        record.path.display()
    );
    Ok(())
}
