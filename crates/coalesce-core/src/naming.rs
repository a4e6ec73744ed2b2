//! The `_2`, `_3`, ... renaming policy used on name collisions.
//!
//! Everything here is pure: callers pass in the set of names already present
//! at the destination and get back a name, with no filesystem access.

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::path::Path;

/// How a name is split before a numeric suffix is inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// The suffix goes before the extension: `report.pdf` -> `report_2.pdf`.
    File,
    /// The suffix is appended to the whole name: `v1.0` -> `v1.0_2`.
    Folder,
}

/// Build the name carrying suffix `n` for `base`.
fn suffixed(base: &OsStr, kind: NameKind, n: u64) -> OsString {
    let path = Path::new(base);
    let (stem, extension) = match kind {
        NameKind::File => (path.file_stem().unwrap_or(base), path.extension()),
        NameKind::Folder => (base, None),
    };

    let mut name = OsString::from(stem);
    name.push(format!("_{n}"));
    if let Some(ext) = extension {
        name.push(".");
        name.push(ext);
    }
    name
}

/// Infinite sequence of rename candidates: `base_2`, `base_3`, ...
///
/// The unsuffixed `base` itself is not part of the sequence.
pub fn candidate_names(base: &OsStr, kind: NameKind) -> impl Iterator<Item = OsString> + '_ {
    (2u64..).map(move |n| suffixed(base, kind, n))
}

/// Pick the name an incoming item should take at the destination.
///
/// Returns `base` when it is unused, otherwise the candidate with the lowest
/// suffix (starting at 2) that is not in `existing`.
pub fn next_available_name(existing: &HashSet<OsString>, base: &OsStr, kind: NameKind) -> OsString {
    if !existing.contains(base) {
        return base.to_os_string();
    }
    candidate_names(base, kind)
        .find(|candidate| !existing.contains(candidate))
        .unwrap_or_else(|| unreachable!("candidate sequence is unbounded"))
}
