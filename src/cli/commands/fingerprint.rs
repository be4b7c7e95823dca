//! Fingerprint command: show where a source's artifact lives.

use std::path::Path;

use crate::cache::{CacheStore, Namespace, fingerprint};
use crate::config::Settings;

pub fn run(config: &Settings, path: &Path, namespace: Option<&str>) -> anyhow::Result<()> {
    let namespace = namespace
        .map(|ns| Namespace::parse(ns).ok_or_else(|| anyhow::anyhow!("Invalid namespace '{ns}'")))
        .transpose()?;

    // Match what the watcher sees: canonical when the file exists.
    let source = path.canonicalize().or_else(|_| std::path::absolute(path))?;
    let fp = fingerprint(&source);
    let store = CacheStore::new(config.cache_dir());
    let location = store.locate(&fp, namespace.as_ref());

    println!("source:      {}", source.display());
    println!("fingerprint: {fp}");
    println!("artifact:    {}", location.display());
    println!("url:         {}", CacheStore::public_path(&fp, namespace.as_ref()));
    println!("cached:      {}", store.exists(&location));
    Ok(())
}
