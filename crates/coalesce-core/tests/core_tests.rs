use coalesce_core::{
    candidate_names, fingerprint_file, next_available_name, CleanupConfig, ConfirmationProvider,
    ContentFingerprint, Error, NameKind, PathProvider, PromptConfirm, PromptPaths, RunConfig,
};
use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_candidate_sequence() {
    let names: Vec<OsString> = candidate_names(OsStr::new("report.pdf"), NameKind::File)
        .take(3)
        .collect();
    assert_eq!(names, vec!["report_2.pdf", "report_3.pdf", "report_4.pdf"]);

    let folders: Vec<OsString> = candidate_names(OsStr::new("my.photos"), NameKind::Folder)
        .take(2)
        .collect();
    assert_eq!(folders, vec!["my.photos_2", "my.photos_3"]);
}

#[test]
fn test_next_available_name_skips_taken() {
    let existing: HashSet<OsString> = ["Photos", "Photos_2"].iter().map(OsString::from).collect();
    assert_eq!(
        next_available_name(&existing, OsStr::new("Photos"), NameKind::Folder),
        OsString::from("Photos_3")
    );
    assert_eq!(
        next_available_name(&existing, OsStr::new("Music"), NameKind::Folder),
        OsString::from("Music")
    );
}

#[test]
fn test_fingerprint_ignores_name_and_mtime() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a.bin");
    let b = temp.path().join("other-name.dat");
    fs::write(&a, b"same bytes").unwrap();
    fs::write(&b, b"same bytes").unwrap();

    let fa = fingerprint_file(&a).unwrap();
    assert_eq!(fa, fingerprint_file(&b).unwrap());
    assert_eq!(fa, ContentFingerprint::of_bytes(b"same bytes"));
    assert_eq!(fa.to_hex().len(), 32);
}

#[test]
fn test_run_config_and_cleanup_config_share_roots() {
    let run = RunConfig::builder()
        .source_roots(vec![PathBuf::from("/a"), PathBuf::from("/b")])
        .destination("/master")
        .build()
        .unwrap();

    let cleanup = CleanupConfig::from_run_config(&run);
    assert_eq!(cleanup.roots, run.source_roots);
    assert!(!cleanup.confirmed);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = RunConfig::from_toml_str("destination = 3").unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn test_interactive_flow() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("src");
    fs::create_dir_all(&src).unwrap();

    let script = format!("{}\n{}\n\n", temp.path().join("master").display(), src.display());
    let mut output = Vec::new();
    let mut paths = PromptPaths::new(Cursor::new(script), &mut output);

    let dest = paths.destination().unwrap().unwrap();
    let sources = paths.source_roots().unwrap();
    assert_eq!(dest, temp.path().join("master"));
    assert_eq!(sources, vec![src]);

    let mut confirm = PromptConfirm::new(Cursor::new("no\n"), Vec::new());
    assert!(!confirm.confirm("Proceed?").unwrap());
}
