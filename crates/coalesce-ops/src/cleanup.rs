//! Empty-folder cleanup.
//!
//! A folder is empty when nothing but folders lives anywhere below it. Empty
//! folders are removed deepest first, so a parent that only held empty
//! folders goes too. The roots themselves always stay.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use serde::Serialize;

use coalesce_core::{CleanupConfig, Error, OperationError, Result};

use crate::runlog::{RunLog, RULE};

/// Result of one cleanup run.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    /// True when deletion was not confirmed and folders were only listed.
    pub dry_run: bool,
    /// Folders removed, or that would be removed in a dry run, in order.
    pub removed: Vec<PathBuf>,
    /// Folders that could not be removed and roots that could not be read.
    pub errors: Vec<OperationError>,
    /// The log file, if one was written.
    pub log_path: Option<PathBuf>,
}

impl CleanupReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Every empty folder strictly below `root`, deepest first.
///
/// Anything that is not a directory marks all its ancestors as occupied;
/// symlinks are not followed and count as occupants. A subtree that cannot
/// be read is treated as occupied.
pub fn find_empty_dirs(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::NotFound {
            path: root.to_path_buf(),
        });
    }
    if !root.is_dir() {
        return Err(Error::NotADirectory {
            path: root.to_path_buf(),
        });
    }

    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .follow_links(false)
        .sort(true)
        .min_depth(1);

    let mut dirs = Vec::new();
    let mut occupied: HashSet<PathBuf> = HashSet::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf());
                tracing::warn!(target: "coalesce", "Cannot read {}: {err}", path.display());
                mark_occupied(&mut occupied, root, &path);
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_dir() {
            dirs.push((entry.depth(), path));
        } else if let Some(parent) = path.parent() {
            mark_occupied(&mut occupied, root, parent);
        }
    }

    let mut empty: Vec<(usize, PathBuf)> = dirs
        .into_iter()
        .filter(|(_, path)| !occupied.contains(path))
        .collect();
    empty.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    Ok(empty.into_iter().map(|(_, path)| path).collect())
}

/// Mark `dir` and every ancestor below `root` as occupied.
fn mark_occupied(occupied: &mut HashSet<PathBuf>, root: &Path, dir: &Path) {
    for ancestor in dir.ancestors() {
        if ancestor == root || !ancestor.starts_with(root) {
            break;
        }
        if !occupied.insert(ancestor.to_path_buf()) {
            break;
        }
    }
}

/// Removes empty folders below a set of roots.
#[derive(Debug, Clone)]
pub struct EmptyFolderCleaner {
    config: CleanupConfig,
}

impl EmptyFolderCleaner {
    pub fn new(config: CleanupConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Run the cleanup. Unconfirmed configs list what would be removed.
    ///
    /// Fails only when the config is invalid or the log cannot be opened;
    /// per-folder failures are logged and reported.
    pub fn run(&self) -> Result<CleanupReport> {
        let config = &self.config;
        config.validate()?;
        let dry_run = !config.confirmed;

        let mut log = match (&config.log_path, dry_run) {
            (_, false) => RunLog::open(&config.log_file())?,
            (Some(path), true) => RunLog::open(path)?,
            (None, true) => RunLog::in_memory(),
        };

        log.banner(if dry_run {
            "EMPTY FOLDER CLEANUP (dry run, nothing will be deleted)"
        } else {
            "EMPTY FOLDER CLEANUP STARTED"
        });

        let mut removed = Vec::new();
        let mut errors = Vec::new();
        let total = config.roots.len();

        for (i, root) in config.roots.iter().enumerate() {
            log.info(format!("[{}/{}] Cleaning: {}", i + 1, total, root.display()));

            let empty = match find_empty_dirs(root) {
                Ok(empty) => empty,
                Err(Error::NotFound { .. } | Error::NotADirectory { .. }) => {
                    let message = format!("ERROR: Source not found: {}", root.display());
                    log.error(&message);
                    errors.push(OperationError::new(root, message));
                    continue;
                }
                Err(e) => {
                    let message = format!("ERROR processing {}: {e}", root.display());
                    log.error(&message);
                    errors.push(OperationError::new(root, message));
                    continue;
                }
            };

            // A failed removal leaves its ancestors non-empty; they are
            // skipped rather than reported a second time.
            let mut failed: Vec<PathBuf> = Vec::new();

            for dir in empty {
                if dry_run {
                    log.info(format!("WOULD DELETE EMPTY: {}", dir.display()));
                    removed.push(dir);
                    continue;
                }
                if failed.iter().any(|f| f.starts_with(&dir)) {
                    continue;
                }
                match fs::remove_dir(&dir) {
                    Ok(()) => {
                        log.info(format!("DELETED EMPTY: {}", dir.display()));
                        removed.push(dir);
                    }
                    Err(e) => {
                        let message = format!("ERROR deleting {}: {e}", dir.display());
                        log.error(&message);
                        errors.push(OperationError::new(&dir, message));
                        failed.push(dir);
                    }
                }
            }
        }

        log.info(RULE);
        log.info(if dry_run { "CLEANUP PLAN COMPLETE" } else { "CLEANUP COMPLETE" });
        log.info(RULE);
        log.info("STATISTICS:");
        if dry_run {
            log.info(format!("  Empty Folders Found: {}", removed.len()));
        } else {
            log.info(format!("  Empty Folders Deleted: {}", removed.len()));
        }
        log.info(format!("  Errors: {}", errors.len()));

        let log_path = log.path().map(Path::to_path_buf);
        if let Some(path) = &log_path {
            log.info(format!("Log: {}", path.display()));
        }

        Ok(CleanupReport {
            dry_run,
            removed,
            errors,
            log_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_empty_dirs_deepest_first() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/b/c")).unwrap();
        fs::create_dir_all(root.join("keep/empty")).unwrap();
        fs::write(root.join("keep/file.txt"), "x").unwrap();

        let empty = find_empty_dirs(root).unwrap();
        assert_eq!(
            empty,
            vec![
                root.join("a/b/c"),
                root.join("a/b"),
                root.join("keep/empty"),
                root.join("a"),
            ]
        );
    }

    #[test]
    fn test_file_deep_below_keeps_every_ancestor() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("x/y/z")).unwrap();
        fs::write(root.join("x/y/z/deep.txt"), "x").unwrap();

        assert!(find_empty_dirs(root).unwrap().is_empty());
    }

    #[test]
    fn test_hidden_files_count() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("cfg")).unwrap();
        fs::write(temp.path().join("cfg/.keep"), "").unwrap();

        assert!(find_empty_dirs(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let err = find_empty_dirs(&temp.path().join("gone")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_counts_as_occupant() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("links")).unwrap();
        fs::create_dir_all(temp.path().join("elsewhere")).unwrap();
        std::os::unix::fs::symlink(temp.path().join("elsewhere"), root.join("links/to")).unwrap();

        assert!(find_empty_dirs(&root).unwrap().is_empty());
    }

    #[test]
    fn test_dry_run_deletes_nothing() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("a/b")).unwrap();

        let report = EmptyFolderCleaner::new(CleanupConfig::new(vec![root.clone()]))
            .run()
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.removed, vec![root.join("a/b"), root.join("a")]);
        assert!(root.join("a/b").is_dir());
        assert!(report.log_path.is_none());
    }
}
