//! Image discovery under a root directory

use crate::core::config::DiscoveryConfig;
use crate::core::{IndexError, IndexResult};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Supported image files under `root`, sorted, as absolute paths
///
/// Hidden entries and ExifTool `*_original` backups are skipped. Entries
/// that cannot be read are logged and skipped.
pub fn discover(root: &Path, config: &DiscoveryConfig) -> IndexResult<Vec<PathBuf>> {
    let root = &std::fs::canonicalize(root).map_err(|e| IndexError::io(root, e))?;
    let meta = std::fs::metadata(root).map_err(|e| IndexError::io(root, e))?;
    if !meta.is_dir() {
        return Err(IndexError::Config(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let extensions: HashSet<String> = config
        .extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let walker = WalkDir::new(root)
        .follow_links(true)
        .max_depth(if config.recursive { usize::MAX } else { 1 });

    let mut files = Vec::new();
    for entry in walker.into_iter().filter_entry(|e| e.depth() == 0 || !is_hidden(e)) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let supported = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| extensions.contains(&ext));
        if supported {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    tracing::info!(root = %root.display(), count = files.len(), "Discovered images");
    Ok(files)
}

fn is_hidden(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.ends_with("_original")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    fn names(root: &Path, files: &[PathBuf]) -> Vec<String> {
        let root = root.canonicalize().unwrap();
        files
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("b.JPG"));
        touch(&root.join("a.png"));
        touch(&root.join("notes.txt"));
        touch(&root.join("a.png_original"));
        touch(&root.join(".hidden.jpg"));
        touch(&root.join(".cache/c.jpg"));
        touch(&root.join("sub/d.nef"));
        touch(&root.join("sub/deeper/e.webp"));

        let files = discover(root, &DiscoveryConfig::default()).unwrap();
        assert_eq!(
            names(root, &files),
            vec!["a.png", "b.JPG", "sub/d.nef", "sub/deeper/e.webp"]
        );
    }

    #[test]
    fn test_no_crawl() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(&root.join("top.jpg"));
        touch(&root.join("sub/inner.jpg"));

        let config = DiscoveryConfig {
            recursive: false,
            ..DiscoveryConfig::default()
        };
        let files = discover(root, &config).unwrap();
        assert_eq!(names(root, &files), vec!["top.jpg"]);
    }

    #[test]
    fn test_relative_root_yields_absolute_paths() {
        let dir = TempDir::new_in(".").unwrap();
        touch(&dir.path().join("a.jpg"));
        let name = dir.path().file_name().unwrap();

        let files = discover(Path::new(name), &DiscoveryConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].is_absolute());
        assert_eq!(files[0], dir.path().canonicalize().unwrap().join("a.jpg"));
    }

    #[test]
    fn test_root_must_be_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.jpg");
        touch(&file);
        assert!(matches!(
            discover(&file, &DiscoveryConfig::default()),
            Err(IndexError::Config(_))
        ));
        assert!(matches!(
            discover(&dir.path().join("missing"), &DiscoveryConfig::default()),
            Err(IndexError::Io { .. })
        ));
    }
}
