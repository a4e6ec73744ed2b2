//! Copy primitives: single files with metadata, whole trees without dedup,
//! and a dry walk that predicts what a tree copy writes.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use filetime::{set_file_times, FileTime};
use itertools::Itertools;

use coalesce_core::{EntryKind, OperationError};

/// Copy one file to `dest`, which must not exist yet.
///
/// Permissions and access/modification times are carried over. A partially
/// written destination is removed again if the copy fails. Only regular
/// files (or symlinks to them) are copied; anything else is rejected before
/// it is opened. Returns the number of bytes copied.
pub fn copy_file_preserving(source: &Path, dest: &Path) -> io::Result<u64> {
    let metadata = fs::metadata(source)?;
    if !metadata.is_file() {
        return Err(not_a_regular_file());
    }

    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dest)?;

    let copied = io::copy(&mut reader, &mut writer);
    drop(writer);

    let finish = copied.and_then(|bytes| {
        fs::set_permissions(dest, metadata.permissions())?;
        set_file_times(
            dest,
            FileTime::from_last_access_time(&metadata),
            FileTime::from_last_modification_time(&metadata),
        )?;
        Ok(bytes)
    });

    if finish.is_err() {
        let _ = fs::remove_file(dest);
    }
    finish
}

fn not_a_regular_file() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, "not a regular file or folder")
}

/// One folder created or file copied by a tree copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub kind: EntryKind,
    /// Destination path of the item.
    pub path: PathBuf,
    /// Bytes written (zero for folders).
    pub bytes: u64,
}

/// Counters and failures from one [`copy_tree`] or [`plan_tree`] call.
#[derive(Debug, Clone, Default)]
pub struct TreeCopyReport {
    /// Directories created, the top one included.
    pub dirs_created: u64,
    /// Files copied.
    pub files_copied: u64,
    /// Bytes copied.
    pub bytes_copied: u64,
    /// Every folder and file written, in visiting order.
    pub items: Vec<TreeItem>,
    /// Items that could not be copied; the rest of the tree still is.
    pub errors: Vec<OperationError>,
}

impl TreeCopyReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    fn record(&mut self, kind: EntryKind, path: PathBuf, bytes: u64) {
        match kind {
            EntryKind::Folder => self.dirs_created += 1,
            EntryKind::File => self.files_copied += 1,
        }
        self.bytes_copied += bytes;
        self.items.push(TreeItem { kind, path, bytes });
    }
}

/// Recursively copy `source` to `dest`, which must not exist yet.
///
/// Entries are visited in name order. Symlinked directories inside the tree
/// are not followed and pipes, sockets and devices are not read; both are
/// reported as errors. Symlinked files are copied by content. Failing items
/// are recorded and the copy continues.
///
/// Returns an error only when `dest` itself cannot be created.
pub fn copy_tree(source: &Path, dest: &Path) -> io::Result<TreeCopyReport> {
    fs::create_dir(dest)?;
    let mut report = TreeCopyReport::default();
    report.record(EntryKind::Folder, dest.to_path_buf(), 0);
    walk_tree(source, dest, Mode::Copy, &mut report);
    Ok(report)
}

/// What [`copy_tree`] would do, without writing anything.
///
/// Reports the same items, counters and per-item errors a real copy into a
/// fresh `dest` would produce, using source sizes for byte counts.
pub fn plan_tree(source: &Path, dest: &Path) -> io::Result<TreeCopyReport> {
    if !fs::metadata(source)?.is_dir() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a folder"));
    }
    let mut report = TreeCopyReport::default();
    report.record(EntryKind::Folder, dest.to_path_buf(), 0);
    walk_tree(source, dest, Mode::Plan, &mut report);
    Ok(report)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Copy,
    Plan,
}

fn walk_tree(source: &Path, dest: &Path, mode: Mode, report: &mut TreeCopyReport) {
    let entries = match fs::read_dir(source) {
        Ok(entries) => entries,
        Err(e) => {
            report
                .errors
                .push(OperationError::new(source, format!("Failed to read directory: {e}")));
            return;
        }
    };

    let entries = entries
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                report
                    .errors
                    .push(OperationError::new(source, format!("Failed to read entry: {e}")));
                None
            }
        })
        .sorted_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let dest_path = dest.join(entry.file_name());
        let is_symlink = entry.file_type().map(|t| t.is_symlink()).unwrap_or(false);

        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                report
                    .errors
                    .push(OperationError::new(&path, format!("Failed to read metadata: {e}")));
                continue;
            }
        };

        if metadata.is_dir() {
            if is_symlink {
                report.errors.push(OperationError::new(
                    &path,
                    "Symlinked directory not followed",
                ));
                continue;
            }
            let created = match mode {
                Mode::Copy => fs::create_dir(&dest_path),
                Mode::Plan => Ok(()),
            };
            match created {
                Ok(()) => {
                    report.record(EntryKind::Folder, dest_path.clone(), 0);
                    walk_tree(&path, &dest_path, mode, report);
                }
                Err(e) => report.errors.push(OperationError::new(
                    &path,
                    format!("Failed to create {}: {e}", dest_path.display()),
                )),
            }
        } else if metadata.is_file() {
            let copied = match mode {
                Mode::Copy => copy_file_preserving(&path, &dest_path),
                Mode::Plan => Ok(metadata.len()),
            };
            match copied {
                Ok(bytes) => report.record(EntryKind::File, dest_path, bytes),
                Err(e) => report
                    .errors
                    .push(OperationError::new(&path, format!("Failed to copy: {e}"))),
            }
        } else {
            report.errors.push(OperationError::new(
                &path,
                format!("Skipped: {}", not_a_regular_file()),
            ));
        }
    }
}
