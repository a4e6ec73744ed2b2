//! Consolidation and cleanup engine for coalesce.
//!
//! Two independent, synchronous operations:
//!
//! - [`Consolidator`] copies the immediate children of every source root into
//!   one destination. Folders that collide by name get a `_N` suffix; files
//!   that collide are compared by MD5 and either skipped (identical) or copied
//!   under a `_N` name (different).
//! - [`EmptyFolderCleaner`] removes directories that contain no files,
//!   deepest first.
//!
//! Both take an immutable config, only touch the filesystem when the config
//! is confirmed, and write a timestamped text log as they go.
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use coalesce_ops::{Consolidator, RunConfig};
//!
//! let config = RunConfig::new(
//!     vec![PathBuf::from("/mnt/old-laptop"), PathBuf::from("/mnt/usb")],
//!     "/data/master",
//! )
//! .with_confirmed(true);
//!
//! let report = Consolidator::new(config).run().unwrap();
//! println!("{} files copied", report.stats.files_copied);
//! ```

mod cleanup;
mod compare;
mod consolidate;
mod copy;
mod destination;
mod preflight;
mod runlog;

pub use cleanup::{find_empty_dirs, CleanupReport, EmptyFolderCleaner};
pub use compare::{trees_identical, FingerprintCache};
pub use consolidate::{ConsolidationReport, Consolidator};
pub use copy::{copy_file_preserving, copy_tree, plan_tree, TreeCopyReport, TreeItem};
pub use destination::{DestinationIndex, Slot};
pub use preflight::{check_layout, LayoutCheck};
pub use runlog::{LogLevel, LogRecord, RunLog};

// Re-export core types for convenience
pub use coalesce_core::{
    CleanupConfig, ConsolidationStats, CopyPlanEntry, EntryKind, Error, OperationError, Outcome,
    Result, RunConfig,
};
