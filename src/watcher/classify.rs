//! Maps raw notify events to watcher actions.

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

/// What the watcher does in response to one path in an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchAction {
    /// The source was created or written; enqueue a render.
    Render { path: PathBuf },
    /// The source is gone; evict its artifact.
    Evict { path: PathBuf },
}

/// Case-insensitive extension match for tracked sources.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect();
        Self { extensions }
    }

    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

impl Default for ExtensionFilter {
    fn default() -> Self {
        Self::new(["tex"])
    }
}

/// Turn one event into zero or more actions.
///
/// Creates and content writes render, removes evict. A rename is split into
/// its halves: the old name evicts, the new name renders. Directories,
/// metadata-only changes and untracked extensions produce nothing.
pub fn classify(event: &Event, filter: &ExtensionFilter) -> Vec<WatchAction> {
    let tracked = event.paths.iter().filter(|path| filter.accepts(path));

    match event.kind {
        EventKind::Create(_)
        | EventKind::Modify(ModifyKind::Data(_))
        | EventKind::Modify(ModifyKind::Any)
        | EventKind::Modify(ModifyKind::Other)
        | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => tracked
            .filter(|path| is_file(path))
            .map(|path| WatchAction::Render { path: path.clone() })
            .collect(),

        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => tracked
            .map(|path| WatchAction::Evict { path: path.clone() })
            .collect(),

        // paths are [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut actions = Vec::with_capacity(2);
            if let Some(from) = event.paths.first().filter(|p| filter.accepts(p)) {
                actions.push(WatchAction::Evict { path: from.clone() });
            }
            if let Some(to) = event.paths.get(1).filter(|p| filter.accepts(p) && is_file(p)) {
                actions.push(WatchAction::Render { path: to.clone() });
            }
            actions
        }

        // Platforms that cannot tell the halves apart: decide by existence.
        EventKind::Modify(ModifyKind::Name(_)) => tracked
            .map(|path| {
                if path.exists() {
                    WatchAction::Render { path: path.clone() }
                } else {
                    WatchAction::Evict { path: path.clone() }
                }
            })
            .filter(|action| match action {
                WatchAction::Render { path } => is_file(path),
                WatchAction::Evict { .. } => true,
            })
            .collect(),

        _ => Vec::new(),
    }
}

/// A create or write on anything but a regular file is ignored.
fn is_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|meta| meta.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, DataChange, MetadataKind, RemoveKind};
    use tempfile::TempDir;

    fn event<P: AsRef<Path>>(kind: EventKind, paths: &[P]) -> Event {
        paths
            .iter()
            .fold(Event::new(kind), |event, path| event.add_path(path.as_ref().to_path_buf()))
    }

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        let filter = ExtensionFilter::new(["tex", ".Ltx"]);

        assert!(filter.accepts(Path::new("/docs/a.tex")));
        assert!(filter.accepts(Path::new("/docs/a.TEX")));
        assert!(filter.accepts(Path::new("/docs/b.ltx")));
        assert!(!filter.accepts(Path::new("/docs/a.pdf")));
        assert!(!filter.accepts(Path::new("/docs/tex")));
        assert_eq!(filter.extensions(), ["tex", "ltx"]);
    }

    #[test]
    fn test_create_and_write_render_files() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.tex");
        std::fs::write(&source, "x").unwrap();
        let filter = ExtensionFilter::default();

        let created = event(EventKind::Create(CreateKind::File), &[&source]);
        let written = event(EventKind::Modify(ModifyKind::Data(DataChange::Content)), &[&source]);

        let expected = vec![WatchAction::Render { path: source.clone() }];
        assert_eq!(classify(&created, &filter), expected);
        assert_eq!(classify(&written, &filter), expected);
    }

    #[test]
    fn test_directories_and_other_extensions_ignored() {
        let dir = TempDir::new().unwrap();
        let subdir = dir.path().join("chapter.tex");
        std::fs::create_dir(&subdir).unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "x").unwrap();
        let filter = ExtensionFilter::default();

        assert!(classify(&event(EventKind::Create(CreateKind::Folder), &[&subdir]), &filter).is_empty());
        assert!(classify(&event(EventKind::Create(CreateKind::File), &[&notes]), &filter).is_empty());
    }

    #[test]
    fn test_metadata_change_ignored() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.tex");
        std::fs::write(&source, "x").unwrap();

        let chmod = event(
            EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
            &[&source],
        );
        assert!(classify(&chmod, &ExtensionFilter::default()).is_empty());
    }

    #[test]
    fn test_remove_evicts_without_touching_disk() {
        let source = Path::new("/gone/a.tex");
        let removed = event(EventKind::Remove(RemoveKind::File), &[source]);

        assert_eq!(
            classify(&removed, &ExtensionFilter::default()),
            vec![WatchAction::Evict { path: source.to_path_buf() }]
        );
    }

    #[test]
    fn test_rename_splits_into_evict_and_render() {
        let dir = TempDir::new().unwrap();
        let from = dir.path().join("old.tex");
        let to = dir.path().join("new.tex");
        std::fs::write(&to, "x").unwrap();
        let filter = ExtensionFilter::default();

        let both = event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &[&from, &to]);
        assert_eq!(
            classify(&both, &filter),
            vec![
                WatchAction::Evict { path: from.clone() },
                WatchAction::Render { path: to.clone() },
            ]
        );

        let from_only = event(EventKind::Modify(ModifyKind::Name(RenameMode::From)), &[&from]);
        assert_eq!(classify(&from_only, &filter), vec![WatchAction::Evict { path: from.clone() }]);

        let ambiguous = event(EventKind::Modify(ModifyKind::Name(RenameMode::Any)), &[&from, &to]);
        assert_eq!(
            classify(&ambiguous, &filter),
            vec![WatchAction::Evict { path: from }, WatchAction::Render { path: to }]
        );
    }
}
