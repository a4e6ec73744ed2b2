//! Layout checks run before anything is written.

use std::path::{Path, PathBuf};

use coalesce_core::{Error, Result};

/// Result of a successful layout check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutCheck {
    /// Source roots that live inside the destination. They are skipped:
    /// consolidating them would copy the destination's own content back in.
    pub sources_inside_destination: Vec<PathBuf>,
}

impl LayoutCheck {
    pub fn is_skipped(&self, source: &Path) -> bool {
        self.sources_inside_destination.iter().any(|s| s == source)
    }
}

/// Refuse layouts where the destination is a source root or lies inside one.
///
/// Paths are compared after resolving symlinks and `..`; a destination that
/// does not exist yet is resolved through its nearest existing ancestor.
/// Sources that do not exist are ignored here and reported by the run.
pub fn check_layout(sources: &[PathBuf], destination: &Path) -> Result<LayoutCheck> {
    let dest = resolve(destination)?;
    let mut check = LayoutCheck::default();

    for source in sources {
        let Ok(src) = source.canonicalize() else {
            continue;
        };
        if dest.starts_with(&src) {
            return Err(Error::DestinationInsideSource {
                source_root: source.clone(),
                destination: destination.to_path_buf(),
            });
        }
        if src.starts_with(&dest) {
            check.sources_inside_destination.push(source.clone());
        }
    }

    Ok(check)
}

/// Canonicalize `path`, or its nearest existing ancestor joined with the rest.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::io(path, e))?
            .join(path)
    };

    let mut missing = Vec::new();
    let mut cursor = absolute.as_path();
    loop {
        match cursor.canonicalize() {
            Ok(base) => {
                return Ok(missing.iter().rev().fold(base, |acc, part| acc.join(part)));
            }
            Err(_) => {
                let (Some(parent), Some(name)) = (cursor.parent(), cursor.file_name()) else {
                    return Ok(absolute);
                };
                missing.push(name.to_os_string());
                cursor = parent;
            }
        }
    }
}
