//! Core types and traits for coalesce.
//!
//! This crate provides the building blocks shared by the consolidator and the
//! empty-folder cleanup: run configuration, error types, the `_N` naming
//! policy, MD5 content fingerprints, copy plan records, and the provider
//! traits used to ask for paths and confirmation.

mod config;
mod error;
mod fingerprint;
mod naming;
mod plan;
mod provider;

pub use config::{
    CleanupConfig, CleanupConfigBuilder, RunConfig, RunConfigBuilder, CLEANUP_LOG_FILE_NAME,
    CONSOLIDATION_LOG_FILE_NAME,
};
pub use error::{Error, OperationError, Result};
pub use fingerprint::{fingerprint_file, ContentFingerprint};
pub use naming::{candidate_names, next_available_name, NameKind};
pub use plan::{ConsolidationStats, CopyPlanEntry, EntryKind, Outcome};
pub use provider::{
    AssumeNo, AssumeYes, ConfirmationProvider, PathProvider, PromptConfirm, PromptPaths,
    StaticPaths,
};
