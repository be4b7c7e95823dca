//! Registered data-source roots and the directories watched under them.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::cache::Namespace;

/// Lifecycle of a watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    /// Directory watches are being installed.
    Registered,
    /// Events under the root are being processed.
    Active,
    /// The watcher was closed.
    Closed,
}

/// One data-source root known to the watcher.
#[derive(Debug, Clone)]
pub struct WatchRoot {
    pub id: u32,
    pub path: PathBuf,
    pub namespace: Option<Namespace>,
    pub state: RootState,
    /// Directories with a watch installed.
    pub watched_dirs: usize,
}

/// Roots keyed by path, looked up by longest prefix.
#[derive(Debug, Default)]
pub struct RootRegistry {
    roots: Vec<WatchRoot>,
}

impl RootRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the root at `root.path`.
    pub fn insert(&mut self, root: WatchRoot) {
        self.roots.retain(|existing| existing.path != root.path);
        self.roots.push(root);
    }

    pub fn get(&self, path: &Path) -> Option<&WatchRoot> {
        self.roots.iter().find(|root| root.path == path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut WatchRoot> {
        self.roots.iter_mut().find(|root| root.path == path)
    }

    /// The most specific root containing `path`.
    pub fn owner(&self, path: &Path) -> Option<&WatchRoot> {
        self.roots
            .iter()
            .filter(|root| path.starts_with(&root.path))
            .max_by_key(|root| root.path.components().count())
    }

    /// Cache namespace for an event path. `None` when namespacing is off or
    /// the path is outside every root.
    pub fn namespace_for(&self, path: &Path) -> Option<Namespace> {
        self.owner(path).and_then(|root| root.namespace.clone())
    }

    pub fn set_all(&mut self, state: RootState) {
        for root in &mut self.roots {
            root.state = state;
        }
    }

    pub fn roots(&self) -> &[WatchRoot] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// The root and every directory below it, as they exist right now.
///
/// Each gets a non-recursive watch. Directories created later are not
/// picked up until the root is registered again.
pub fn watch_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("[watcher] skipping unreadable entry: {e}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root(id: u32, path: &str) -> WatchRoot {
        WatchRoot {
            id,
            path: PathBuf::from(path),
            namespace: Some(Namespace::from(id)),
            state: RootState::Registered,
            watched_dirs: 0,
        }
    }

    #[test]
    fn test_owner_prefers_longest_prefix() {
        let mut registry = RootRegistry::new();
        registry.insert(root(1, "/docs"));
        registry.insert(root(2, "/docs/thesis"));

        assert_eq!(registry.owner(Path::new("/docs/a.tex")).unwrap().id, 1);
        assert_eq!(registry.owner(Path::new("/docs/thesis/ch1/a.tex")).unwrap().id, 2);
        assert!(registry.owner(Path::new("/other/a.tex")).is_none());
        // Component-wise prefix, not string prefix
        assert_eq!(registry.owner(Path::new("/docs/thesis2/a.tex")).unwrap().id, 1);
    }

    #[test]
    fn test_namespace_for_path() {
        let mut registry = RootRegistry::new();
        registry.insert(root(7, "/docs"));
        registry.insert(WatchRoot {
            namespace: None,
            ..root(8, "/plain")
        });

        assert_eq!(
            registry.namespace_for(Path::new("/docs/a.tex")),
            Some(Namespace::from(7))
        );
        assert_eq!(registry.namespace_for(Path::new("/plain/a.tex")), None);
        assert_eq!(registry.namespace_for(Path::new("/elsewhere/a.tex")), None);
    }

    #[test]
    fn test_insert_replaces_same_path() {
        let mut registry = RootRegistry::new();
        registry.insert(root(1, "/docs"));
        registry.insert(root(2, "/docs"));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(Path::new("/docs")).unwrap().id, 2);
    }

    #[test]
    fn test_set_all_states() {
        let mut registry = RootRegistry::new();
        registry.insert(root(1, "/a"));
        registry.insert(root(2, "/b"));
        registry.set_all(RootState::Closed);

        assert!(registry.roots().iter().all(|r| r.state == RootState::Closed));
    }

    #[test]
    fn test_watch_dirs_includes_nested_directories() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("ch1/figures")).unwrap();
        std::fs::create_dir_all(dir.path().join("ch2")).unwrap();
        std::fs::write(dir.path().join("main.tex"), "x").unwrap();

        let mut dirs = watch_dirs(dir.path());
        dirs.sort();

        assert_eq!(
            dirs,
            vec![
                dir.path().to_path_buf(),
                dir.path().join("ch1"),
                dir.path().join("ch1/figures"),
                dir.path().join("ch2"),
            ]
        );
    }
}
