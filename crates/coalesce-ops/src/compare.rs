//! Content comparison: cached file fingerprints and directory tree identity.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;

use coalesce_core::{fingerprint_file, ContentFingerprint, Result};

/// Per-run cache of file fingerprints, keyed by path.
///
/// The destination is only ever added to during a run, so a fingerprint
/// computed once stays valid until the run ends.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: HashMap<PathBuf, ContentFingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fingerprint `path`, reading it at most once per run.
    pub fn get(&mut self, path: &Path) -> Result<ContentFingerprint> {
        if let Some(fp) = self.entries.get(path) {
            return Ok(*fp);
        }
        let fp = fingerprint_file(path)?;
        self.entries.insert(path.to_path_buf(), fp);
        Ok(fp)
    }

    /// Number of cached fingerprints.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Whether two directories hold the same entries with the same content.
///
/// Names must match one-to-one at every level and every file pair must have
/// equal fingerprints. Anything unreadable counts as a difference.
pub fn trees_identical(left: &Path, right: &Path, cache: &mut FingerprintCache) -> bool {
    let (Some(left_entries), Some(right_entries)) = (sorted_children(left), sorted_children(right))
    else {
        return false;
    };

    if left_entries.len() != right_entries.len() {
        return false;
    }

    left_entries
        .iter()
        .zip(right_entries.iter())
        .all(|((left_name, left_path), (right_name, right_path))| {
            if left_name != right_name {
                return false;
            }
            match (left_path.is_dir(), right_path.is_dir()) {
                (true, true) => trees_identical(left_path, right_path, cache),
                (false, false) => match (cache.get(left_path), cache.get(right_path)) {
                    (Ok(a), Ok(b)) => a == b,
                    _ => false,
                },
                _ => false,
            }
        })
}

/// Children of `dir` as (name, path), sorted by name.
fn sorted_children(dir: &Path) -> Option<Vec<(std::ffi::OsString, PathBuf)>> {
    let entries = fs::read_dir(dir).ok()?;
    let children: Vec<_> = entries
        .map(|entry| entry.map(|e| (e.file_name(), e.path())))
        .collect::<std::io::Result<Vec<_>>>()
        .ok()?;
    Some(children.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)).collect())
}
