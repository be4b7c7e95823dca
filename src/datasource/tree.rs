//! File tree listing for data sources.

use std::path::Path;

use serde::Serialize;

use crate::cache::{CacheStore, Fingerprint, Namespace, fingerprint};
use crate::watcher::ExtensionFilter;

/// One entry of a listed tree. `hash` is the fingerprint of the absolute
/// path, so a client can address the cached artifact directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub name: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FileNode>,
    pub hash: String,
    /// Public path of the rendered artifact, for files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl FileNode {
    fn file(name: String, path: &Path) -> Self {
        Self {
            name,
            is_dir: false,
            children: Vec::new(),
            hash: fingerprint(path).to_hex(),
            thumbnail: None,
        }
    }

    fn dir(name: String, path: &Path, children: Vec<FileNode>) -> Self {
        Self {
            name,
            is_dir: true,
            children,
            hash: fingerprint(path).to_hex(),
            thumbnail: None,
        }
    }

    /// Fill `thumbnail` on every file node with its artifact URL.
    pub fn attach_thumbnails(&mut self, namespace: Option<&Namespace>) {
        if self.is_dir {
            for child in &mut self.children {
                child.attach_thumbnails(namespace);
            }
        } else if let Ok(fp) = self.hash.parse::<Fingerprint>() {
            self.thumbnail = Some(CacheStore::public_path(&fp, namespace));
        }
    }

    /// Number of file nodes in the tree.
    pub fn file_count(&self) -> usize {
        if self.is_dir {
            self.children.iter().map(FileNode::file_count).sum()
        } else {
            1
        }
    }
}

/// Build the tree under `path`. Files not accepted by `filter` are dropped,
/// and so is every directory left without children. Returns `None` when
/// nothing survives.
pub fn build_tree(path: &Path, filter: &ExtensionFilter) -> std::io::Result<Option<FileNode>> {
    let meta = std::fs::metadata(path)?;
    let name = display_name(path);

    if !meta.is_dir() {
        return Ok(filter.accepts(path).then(|| FileNode::file(name, path)));
    }

    let mut entries = std::fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();

    let mut children = Vec::new();
    for entry in entries {
        if let Some(child) = build_tree(&entry, filter)? {
            children.push(child);
        }
    }

    Ok((!children.is_empty()).then(|| FileNode::dir(name, path, children)))
}

/// Like [`build_tree`] but an empty root is kept as a childless directory.
pub(crate) fn build_root(path: &Path, filter: &ExtensionFilter) -> std::io::Result<FileNode> {
    match build_tree(path, filter)? {
        Some(node) => Ok(node),
        None if path.is_dir() => Ok(FileNode::dir(display_name(path), path, Vec::new())),
        None => Ok(FileNode::file(display_name(path), path)),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("ch1")).unwrap();
        std::fs::create_dir_all(dir.path().join("figures")).unwrap();
        std::fs::write(dir.path().join("main.tex"), "x").unwrap();
        std::fs::write(dir.path().join("ch1/intro.tex"), "x").unwrap();
        std::fs::write(dir.path().join("ch1/notes.md"), "x").unwrap();
        std::fs::write(dir.path().join("figures/plot.png"), "x").unwrap();
        dir
    }

    #[test]
    fn test_prunes_untracked_files_and_empty_dirs() {
        let dir = fixture();
        let tree = build_tree(dir.path(), &ExtensionFilter::default())
            .unwrap()
            .unwrap();

        assert!(tree.is_dir);
        let names: Vec<_> = tree.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["ch1", "main.tex"]);
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[0].children[0].name, "intro.tex");
        assert_eq!(tree.file_count(), 2);
    }

    #[test]
    fn test_hash_is_path_fingerprint() {
        let dir = fixture();
        let tree = build_tree(dir.path(), &ExtensionFilter::default())
            .unwrap()
            .unwrap();

        let main = tree.children.iter().find(|c| c.name == "main.tex").unwrap();
        assert_eq!(main.hash, fingerprint(&dir.path().join("main.tex")).to_hex());
    }

    #[test]
    fn test_empty_root_is_kept() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("readme.txt"), "x").unwrap();

        assert!(build_tree(dir.path(), &ExtensionFilter::default()).unwrap().is_none());
        let root = build_root(dir.path(), &ExtensionFilter::default()).unwrap();
        assert!(root.is_dir);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_thumbnails_point_at_cache() {
        let dir = fixture();
        let mut tree = build_root(dir.path(), &ExtensionFilter::default()).unwrap();
        tree.attach_thumbnails(Some(&Namespace::from(9)));

        let main = tree.children.iter().find(|c| c.name == "main.tex").unwrap();
        assert_eq!(main.thumbnail, Some(format!("/cache/9/{}.pdf", main.hash)));
        assert!(tree.thumbnail.is_none());
    }

    #[test]
    fn test_serializes_camel_case() {
        let dir = fixture();
        let tree = build_root(&dir.path().join("main.tex"), &ExtensionFilter::default()).unwrap();
        let json = serde_json::to_value(&tree).unwrap();

        assert_eq!(json["isDir"], false);
        assert_eq!(json["name"], "main.tex");
        assert!(json.get("children").is_none());
    }
}
