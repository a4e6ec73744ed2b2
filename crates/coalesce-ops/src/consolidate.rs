//! The consolidator: copies every source root's immediate children into one
//! destination, resolving collisions by name suffix and content fingerprint.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::iter;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Serialize;

use coalesce_core::{
    candidate_names, next_available_name, ConsolidationStats, CopyPlanEntry, EntryKind, Error,
    NameKind, OperationError, Outcome, Result, RunConfig,
};

use crate::compare::{trees_identical, FingerprintCache};
use crate::copy::{copy_file_preserving, copy_tree, plan_tree, TreeCopyReport};
use crate::destination::DestinationIndex;
use crate::preflight::{check_layout, LayoutCheck};
use crate::runlog::{RunLog, RULE};

/// Everything a consolidation run decided and did.
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    /// True when the run was not confirmed and only planned.
    pub dry_run: bool,
    /// One entry per top-level item, in processing order.
    pub entries: Vec<CopyPlanEntry>,
    /// Root-level failures and failures inside copied folders.
    pub errors: Vec<OperationError>,
    /// Totals.
    pub stats: ConsolidationStats,
    /// The log file, if one was written.
    pub log_path: Option<PathBuf>,
}

impl ConsolidationReport {
    /// Entries with the given outcome.
    pub fn with_outcome(&self, outcome: Outcome) -> impl Iterator<Item = &CopyPlanEntry> {
        self.entries.iter().filter(move |e| e.outcome == outcome)
    }

    /// Entries for the given source path.
    pub fn entry_for(&self, source: &Path) -> Option<&CopyPlanEntry> {
        self.entries.iter().find(|e| e.source == source)
    }

    /// Human-readable summary block.
    pub fn summary_lines(&self) -> Vec<String> {
        let s = &self.stats;
        vec![
            format!("  Folders Copied:   {}", s.folders_copied),
            format!("  Folders Renamed:  {}", s.folders_renamed),
            format!("  Folders Skipped:  {}", s.folders_skipped),
            format!("  Files Copied:     {}", s.files_copied),
            format!("  Files Renamed:    {}", s.files_renamed),
            format!("  Files Skipped:    {}", s.files_skipped),
            format!("  Errors:           {}", s.errors),
            format!(
                "  Data Copied:      {}",
                humansize::format_size(s.bytes_copied, humansize::BINARY)
            ),
        ]
    }
}

/// Consolidates a set of source roots into one destination.
#[derive(Debug, Clone)]
pub struct Consolidator {
    config: RunConfig,
}

impl Consolidator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the consolidation.
    ///
    /// Unconfirmed configs produce the same report without writing anything
    /// to the destination; their log is only written to disk when a log path
    /// was configured explicitly.
    ///
    /// Fails only for run-level problems (invalid config, destination inside a
    /// source, unwritable destination or log). Item-level problems end up in
    /// the report and the log.
    pub fn run(&self) -> Result<ConsolidationReport> {
        let config = &self.config;
        config.validate()?;

        let layout = check_layout(&config.source_roots, &config.destination)?;
        let dry_run = !config.confirmed;

        if !dry_run {
            fs::create_dir_all(&config.destination)
                .map_err(|e| Error::io(&config.destination, e))?;
        }

        let log = match (&config.log_path, dry_run) {
            (_, false) => RunLog::open(&config.log_file())?,
            (Some(path), true) => RunLog::open(path)?,
            (None, true) => RunLog::in_memory(),
        };
        let index = DestinationIndex::load(&config.destination)?;

        let mut run = Run {
            config,
            layout,
            dry_run,
            index,
            log,
            fingerprints: FingerprintCache::new(),
            entries: Vec::new(),
            errors: Vec::new(),
            stats: ConsolidationStats::new(),
        };
        run.execute();
        Ok(run.finish())
    }
}

/// Mutable state of one run.
struct Run<'a> {
    config: &'a RunConfig,
    layout: LayoutCheck,
    dry_run: bool,
    index: DestinationIndex,
    log: RunLog,
    fingerprints: FingerprintCache,
    entries: Vec<CopyPlanEntry>,
    errors: Vec<OperationError>,
    stats: ConsolidationStats,
}

/// How an incoming file or folder resolves against the destination.
enum Resolution {
    /// Take this name (the original one or a `_N` variant).
    Take(OsString),
    /// Identical content already sits under this name.
    Duplicate(OsString),
}

impl Run<'_> {
    fn execute(&mut self) {
        let config = self.config;
        let total = config.source_roots.len();

        self.log.banner(if self.dry_run {
            "CONSOLIDATION PLAN (dry run, nothing will be written)"
        } else {
            "CONSOLIDATION STARTED"
        });
        self.log
            .info(format!("Destination: {}", config.destination.display()));
        self.log.info(format!("Sources: {total} folder(s)"));

        for (i, root) in config.source_roots.iter().enumerate() {
            self.log
                .info(format!("[{}/{}] Processing: {}", i + 1, total, root.display()));
            self.process_root(root);
        }
    }

    fn process_root(&mut self, root: &Path) {
        if self.layout.is_skipped(root) {
            self.log.warn(format!(
                "SKIP ROOT: {} is inside the destination",
                root.display()
            ));
            return;
        }
        if !root.exists() {
            self.root_error(root, format!("ERROR: Source not found: {}", root.display()));
            return;
        }
        if !root.is_dir() {
            self.root_error(root, format!("ERROR: Source is not a folder: {}", root.display()));
            return;
        }

        let children = match list_children(root) {
            Ok(children) => children,
            Err(e) => {
                self.root_error(root, format!("ERROR processing {}: {e}", root.display()));
                return;
            }
        };

        for (name, path) in children {
            let entry = match fs::metadata(&path) {
                Ok(metadata) if metadata.is_dir() => {
                    self.log.info(format!("Processing folder: {}", name.to_string_lossy()));
                    self.consolidate_folder(&path, &name)
                }
                Ok(metadata) if metadata.is_file() => {
                    self.log.info(format!("Processing file: {}", name.to_string_lossy()));
                    self.consolidate_file(&path, &name)
                }
                Ok(_) => self.item_error(
                    EntryKind::File,
                    &path,
                    &name,
                    format!("ERROR: Not a regular file or folder: {}", path.display()),
                ),
                Err(e) => self.item_error(
                    EntryKind::File,
                    &path,
                    &name,
                    format!("ERROR reading {}: {e}", path.display()),
                ),
            };
            self.stats.record(&entry);
            self.entries.push(entry);
        }
    }

    fn root_error(&mut self, root: &Path, message: String) {
        self.log.error(&message);
        self.errors.push(OperationError::new(root, message));
        self.stats.errors += 1;
    }

    /// Log and collect a failed top-level item. The entry is counted when
    /// it is recorded into the stats.
    fn item_error(
        &mut self,
        kind: EntryKind,
        source: &Path,
        name: &OsStr,
        message: String,
    ) -> CopyPlanEntry {
        self.log.error(&message);
        self.errors.push(OperationError::new(source, message.clone()));
        CopyPlanEntry::error(kind, source, self.index.path_of(name), message)
    }

    /// Merge a tree copy (or plan) into the run: one log line per folder and
    /// file, counters, and per-item errors.
    fn absorb_tree(&mut self, report: TreeCopyReport) {
        for item in &report.items {
            match item.kind {
                EntryKind::Folder => self.log.info(format!("FOLDER: {}", item.path.display())),
                EntryKind::File => self.log.info(format!("COPY: {}", item.path.display())),
            }
        }
        self.stats.folders_copied += report.dirs_created;
        self.stats.files_copied += report.files_copied;
        self.stats.bytes_copied += report.bytes_copied;
        for error in report.errors {
            self.log.error(format!("ERROR copying {error}"));
            self.stats.errors += 1;
            self.errors.push(error);
        }
    }

    /// Resolve and copy one top-level file.
    fn consolidate_file(&mut self, source: &Path, name: &OsStr) -> CopyPlanEntry {
        let proposed = self.index.path_of(name);

        let resolution = match self.resolve_file(source, name) {
            Ok(resolution) => resolution,
            Err(e) => {
                let message = format!("ERROR copying file {}: {e}", source.display());
                return self.item_error(EntryKind::File, source, name, message);
            }
        };

        match resolution {
            Resolution::Duplicate(existing) => {
                let resolved = self.index.path_of(&existing);
                self.log.info(format!("SKIP (identical): {}", resolved.display()));
                CopyPlanEntry::resolved(
                    EntryKind::File,
                    source,
                    proposed,
                    resolved,
                    Outcome::SkippedDuplicate,
                )
            }
            Resolution::Take(target) => {
                let renamed = target.as_os_str() != name;
                let dest = self.index.path_of(&target);

                if self.dry_run {
                    self.stats.bytes_copied += fs::metadata(source).map(|m| m.len()).unwrap_or(0);
                } else {
                    match copy_file_preserving(source, &dest) {
                        Ok(bytes) => self.stats.bytes_copied += bytes,
                        Err(e) => {
                            let message = format!("ERROR copying file {}: {e}", source.display());
                            return self.item_error(EntryKind::File, source, name, message);
                        }
                    }
                }

                let content = if self.dry_run { source.to_path_buf() } else { dest.clone() };
                self.index.claim(&target, content, false);

                let outcome = if renamed {
                    self.log.warn(format!(
                        "RENAME FILE: {} -> {}",
                        name.to_string_lossy(),
                        target.to_string_lossy()
                    ));
                    Outcome::Renamed
                } else {
                    self.log.info(format!("COPY: {}", dest.display()));
                    Outcome::Copied
                };
                CopyPlanEntry::resolved(EntryKind::File, source, proposed, dest, outcome)
            }
        }
    }

    /// Walk `name`, `name_2`, ... while they are taken. The first taken name
    /// holding identical content wins; otherwise the lowest free name does.
    fn resolve_file(&mut self, source: &Path, name: &OsStr) -> Result<Resolution> {
        if !self.index.contains(name) {
            return Ok(Resolution::Take(name.to_os_string()));
        }

        let incoming = self.fingerprints.get(source)?;

        let taken: Vec<OsString> = iter::once(name.to_os_string())
            .chain(candidate_names(name, NameKind::File))
            .take_while(|candidate| self.index.contains(candidate))
            .collect();

        for candidate in taken {
            let Some(slot) = self.index.slot(&candidate) else {
                continue;
            };
            if slot.is_dir {
                continue;
            }
            let content = slot.content.clone();
            match self.fingerprints.get(&content) {
                Ok(existing) if existing == incoming => {
                    return Ok(Resolution::Duplicate(candidate));
                }
                Ok(_) => {}
                Err(e) => self.log.warn(format!(
                    "Could not fingerprint {}: {e}; treating as different",
                    content.display()
                )),
            }
        }

        Ok(Resolution::Take(next_available_name(
            self.index.names(),
            name,
            NameKind::File,
        )))
    }

    /// Resolve and copy one top-level folder.
    fn consolidate_folder(&mut self, source: &Path, name: &OsStr) -> CopyPlanEntry {
        let proposed = self.index.path_of(name);

        match self.resolve_folder(source, name) {
            Resolution::Duplicate(existing) => {
                let resolved = self.index.path_of(&existing);
                self.log.info(format!(
                    "SKIP FOLDER (identical from a previous run): {}",
                    resolved.display()
                ));
                CopyPlanEntry::resolved(
                    EntryKind::Folder,
                    source,
                    proposed,
                    resolved,
                    Outcome::SkippedDuplicate,
                )
            }
            Resolution::Take(target) => {
                let renamed = target.as_os_str() != name;
                let dest = self.index.path_of(&target);

                if renamed {
                    self.log.warn(format!(
                        "CONFLICT: Folder '{}' exists -> '{}'",
                        name.to_string_lossy(),
                        target.to_string_lossy()
                    ));
                }

                let copied = if self.dry_run {
                    plan_tree(source, &dest)
                } else {
                    copy_tree(source, &dest)
                };
                match copied {
                    Ok(report) => {
                        let content = if self.dry_run { source.to_path_buf() } else { dest.clone() };
                        self.index.claim(&target, content, true);
                        self.absorb_tree(report);
                    }
                    Err(e) => {
                        let message = format!("ERROR copying folder {}: {e}", source.display());
                        return self.item_error(EntryKind::Folder, source, name, message);
                    }
                }

                let outcome = if renamed { Outcome::Renamed } else { Outcome::Copied };
                CopyPlanEntry::resolved(EntryKind::Folder, source, proposed, dest, outcome)
            }
        }
    }

    /// Folders never compare against what this run created; only a folder
    /// that was already at the destination before the run can count as the
    /// same folder.
    fn resolve_folder(&mut self, source: &Path, name: &OsStr) -> Resolution {
        if !self.index.contains(name) {
            return Resolution::Take(name.to_os_string());
        }

        if !self.config.always_rename_folders {
            let taken: Vec<OsString> = iter::once(name.to_os_string())
                .chain(candidate_names(name, NameKind::Folder))
                .take_while(|candidate| self.index.contains(candidate))
                .collect();

            for candidate in taken {
                let Some(slot) = self.index.slot(&candidate) else {
                    continue;
                };
                if !(slot.preexisting && slot.is_dir) {
                    continue;
                }
                let content = slot.content.clone();
                if trees_identical(source, &content, &mut self.fingerprints) {
                    return Resolution::Duplicate(candidate);
                }
            }
        }

        Resolution::Take(next_available_name(
            self.index.names(),
            name,
            NameKind::Folder,
        ))
    }

    fn finish(mut self) -> ConsolidationReport {
        self.log.info(RULE);
        self.log.info(if self.dry_run {
            "CONSOLIDATION PLAN COMPLETE"
        } else {
            "CONSOLIDATION COMPLETE"
        });
        self.log.info(RULE);

        let mut report = ConsolidationReport {
            dry_run: self.dry_run,
            entries: self.entries,
            errors: self.errors,
            stats: self.stats,
            log_path: None,
        };

        self.log.info("STATISTICS:");
        for line in report.summary_lines() {
            self.log.info(line);
        }
        report.log_path = self.log.path().map(Path::to_path_buf);
        if let Some(path) = &report.log_path {
            self.log.info(format!("Log: {}", path.display()));
        }
        report
    }
}

/// Immediate children of `dir` as (name, path), sorted by name.
fn list_children(dir: &Path) -> std::io::Result<Vec<(OsString, PathBuf)>> {
    let children = fs::read_dir(dir)?
        .map(|entry| entry.map(|e| (e.file_name(), e.path())))
        .collect::<std::io::Result<Vec<_>>>()?;
    Ok(children
        .into_iter()
        .sorted_by(|a, b| a.0.cmp(&b.0))
        .collect())
}
