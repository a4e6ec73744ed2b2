use coalesce_ops::{
    CleanupConfig, Consolidator, EmptyFolderCleaner, EntryKind, Error, Outcome, RunConfig,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn confirmed(sources: &[&Path], dest: &Path) -> RunConfig {
    RunConfig::new(sources.iter().map(|s| s.to_path_buf()).collect(), dest).with_confirmed(true)
}

/// Names at the destination root, log file excluded, sorted.
fn dest_names(dest: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dest)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n != "consolidation_log.txt")
        .collect();
    names.sort();
    names
}

#[test]
fn test_identical_files_are_copied_once() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let backup = temp.path().join("Backup");
    let master = temp.path().join("master");
    write(&docs.join("report.pdf"), "content A");
    write(&backup.join("report.pdf"), "content A");

    let report = Consolidator::new(confirmed(&[&docs, &backup], &master))
        .run()
        .unwrap();

    assert_eq!(dest_names(&master), vec!["report.pdf"]);
    assert_eq!(report.entry_for(&docs.join("report.pdf")).unwrap().outcome, Outcome::Copied);
    assert_eq!(
        report.entry_for(&backup.join("report.pdf")).unwrap().outcome,
        Outcome::SkippedDuplicate
    );
    assert_eq!(report.stats.files_copied, 1);
    assert_eq!(report.stats.files_skipped, 1);
}

#[test]
fn test_different_files_get_suffix() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let backup = temp.path().join("Backup");
    let master = temp.path().join("master");
    write(&docs.join("report.pdf"), "content A");
    write(&backup.join("report.pdf"), "content B");

    let report = Consolidator::new(confirmed(&[&docs, &backup], &master))
        .run()
        .unwrap();

    assert_eq!(dest_names(&master), vec!["report.pdf", "report_2.pdf"]);
    assert_eq!(fs::read_to_string(master.join("report.pdf")).unwrap(), "content A");
    assert_eq!(fs::read_to_string(master.join("report_2.pdf")).unwrap(), "content B");
    assert_eq!(report.stats.files_renamed, 1);

    let log = fs::read_to_string(master.join("consolidation_log.txt")).unwrap();
    assert!(log.contains("RENAME FILE: report.pdf -> report_2.pdf"));
}

#[test]
fn test_third_copy_matches_renamed_file() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    let c = temp.path().join("c");
    let master = temp.path().join("master");
    write(&a.join("notes.txt"), "one");
    write(&b.join("notes.txt"), "two");
    write(&c.join("notes.txt"), "two");

    let report = Consolidator::new(confirmed(&[&a, &b, &c], &master))
        .run()
        .unwrap();

    assert_eq!(dest_names(&master), vec!["notes.txt", "notes_2.txt"]);
    let third = report.entry_for(&c.join("notes.txt")).unwrap();
    assert_eq!(third.outcome, Outcome::SkippedDuplicate);
    assert_eq!(third.resolved_path(), Some(master.join("notes_2.txt").as_path()));
}

#[test]
fn test_colliding_folders_are_renamed() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let backup = temp.path().join("Backup");
    let master = temp.path().join("master");
    write(&docs.join("Photos/a.jpg"), "a");
    write(&backup.join("Photos/b.jpg"), "b");

    let report = Consolidator::new(confirmed(&[&docs, &backup], &master))
        .run()
        .unwrap();

    assert_eq!(dest_names(&master), vec!["Photos", "Photos_2"]);
    assert!(master.join("Photos/a.jpg").is_file());
    assert!(master.join("Photos_2/b.jpg").is_file());
    assert_eq!(report.stats.folders_renamed, 1);
    assert_eq!(report.stats.folders_copied, 2);

    let log = fs::read_to_string(master.join("consolidation_log.txt")).unwrap();
    assert!(log.contains("CONFLICT: Folder 'Photos' exists -> 'Photos_2'"));
}

#[test]
fn test_folders_are_not_merged_even_when_identical() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let backup = temp.path().join("Backup");
    let master = temp.path().join("master");
    write(&docs.join("Photos/a.jpg"), "a");
    write(&backup.join("Photos/a.jpg"), "a");

    Consolidator::new(confirmed(&[&docs, &backup], &master))
        .run()
        .unwrap();

    assert_eq!(dest_names(&master), vec!["Photos", "Photos_2"]);
}

#[test]
fn test_rerun_is_idempotent() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let backup = temp.path().join("Backup");
    let master = temp.path().join("master");
    write(&docs.join("report.pdf"), "A");
    write(&backup.join("report.pdf"), "B");
    write(&docs.join("Photos/a.jpg"), "a");
    write(&backup.join("Photos/b.jpg"), "b");

    let config = confirmed(&[&docs, &backup], &master);
    Consolidator::new(config.clone()).run().unwrap();
    let before = dest_names(&master);

    let second = Consolidator::new(config).run().unwrap();

    assert_eq!(dest_names(&master), before);
    assert!(
        second
            .entries
            .iter()
            .all(|e| e.outcome == Outcome::SkippedDuplicate)
    );
    assert_eq!(second.stats.files_skipped, 2);
    assert_eq!(second.stats.folders_skipped, 2);
    assert_eq!(second.stats.total_written(), 0);
}

#[test]
fn test_always_rename_folders_on_rerun() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let master = temp.path().join("master");
    write(&docs.join("Photos/a.jpg"), "a");

    let mut config = confirmed(&[&docs], &master);
    Consolidator::new(config.clone()).run().unwrap();

    config.always_rename_folders = true;
    let second = Consolidator::new(config).run().unwrap();

    assert_eq!(dest_names(&master), vec!["Photos", "Photos_2"]);
    assert_eq!(second.stats.folders_renamed, 1);
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let backup = temp.path().join("Backup");
    let master = temp.path().join("master");
    write(&docs.join("report.pdf"), "A");
    write(&backup.join("report.pdf"), "B");
    write(&backup.join("Photos/b.jpg"), "b");

    let report = Consolidator::new(RunConfig::new(vec![docs.clone(), backup.clone()], &master))
        .run()
        .unwrap();

    assert!(report.dry_run);
    assert!(!master.exists());
    assert!(report.log_path.is_none());

    let renamed = report.entry_for(&backup.join("report.pdf")).unwrap();
    assert_eq!(renamed.outcome, Outcome::Renamed);
    assert_eq!(renamed.resolved_path(), Some(master.join("report_2.pdf").as_path()));

    let folder = report.entry_for(&backup.join("Photos")).unwrap();
    assert_eq!(folder.kind, EntryKind::Folder);
    assert_eq!(folder.outcome, Outcome::Copied);
    assert_eq!(report.stats.folders_copied, 1);
}

#[test]
fn test_dry_run_plan_matches_real_run() {
    let temp = TempDir::new().unwrap();
    let a = temp.path().join("a");
    let b = temp.path().join("b");
    let master = temp.path().join("master");
    write(&a.join("x.txt"), "1");
    write(&b.join("x.txt"), "1");
    write(&b.join("y.txt"), "2");
    write(&a.join("Music/s.mp3"), "s");
    write(&b.join("Music/t.mp3"), "t");

    let config = RunConfig::new(vec![a, b], &master);
    let plan = Consolidator::new(config.clone()).run().unwrap();
    let real = Consolidator::new(config.with_confirmed(true)).run().unwrap();

    let summarize = |entries: &[coalesce_ops::CopyPlanEntry]| {
        entries
            .iter()
            .map(|e| (e.source.clone(), e.resolved.clone(), e.outcome))
            .collect::<Vec<_>>()
    };
    assert_eq!(summarize(&plan.entries), summarize(&real.entries));
    assert_eq!(plan.stats, real.stats);
    assert_eq!(real.stats.files_copied, 4);
}

#[test]
fn test_destination_inside_source_is_refused() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Documents");
    write(&docs.join("a.txt"), "a");

    let err = Consolidator::new(confirmed(&[&docs], &docs.join("master")))
        .run()
        .unwrap_err();

    assert!(matches!(err, Error::DestinationInsideSource { .. }));
    assert!(!docs.join("master").exists());
}

#[test]
fn test_log_structure() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let master = temp.path().join("master");
    let log_path = temp.path().join("logs/run.txt");
    write(&docs.join("a.txt"), "a");

    let mut config = confirmed(&[&docs, &temp.path().join("missing")], &master);
    config.log_path = Some(log_path.clone());
    let report = Consolidator::new(config).run().unwrap();

    assert_eq!(report.log_path.as_deref(), Some(log_path.as_path()));
    assert!(!master.join("consolidation_log.txt").exists());

    let log = fs::read_to_string(&log_path).unwrap();
    for expected in [
        "CONSOLIDATION STARTED",
        "[1/2] Processing:",
        "[2/2] Processing:",
        "ERROR: Source not found:",
        "CONSOLIDATION COMPLETE",
        "STATISTICS:",
        "Files Copied:     1",
        "Errors:           1",
    ] {
        assert!(log.contains(expected), "missing {expected:?} in:\n{log}");
    }
    assert!(log.lines().all(|l| l.starts_with('[')));
}

#[test]
fn test_cleanup_removes_nested_empty_folders() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir_all(root.join("empty/inner/deeper")).unwrap();
    write(&root.join("full/sub/file.txt"), "x");
    fs::create_dir_all(root.join("full/empty_sibling")).unwrap();
    let log_path = temp.path().join("cleanup.txt");

    let config = CleanupConfig::builder()
        .roots(vec![root.clone()])
        .log_path(Some(log_path.clone()))
        .confirmed(true)
        .build()
        .unwrap();
    let report = EmptyFolderCleaner::new(config).run().unwrap();

    assert!(report.is_success());
    assert_eq!(report.removed.len(), 4);
    assert!(root.is_dir());
    assert!(!root.join("empty").exists());
    assert!(!root.join("full/empty_sibling").exists());
    assert!(root.join("full/sub/file.txt").is_file());

    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("EMPTY FOLDER CLEANUP STARTED"));
    assert!(log.contains("DELETED EMPTY:"));
    assert!(log.contains("Empty Folders Deleted: 4"));
}

#[test]
fn test_cleanup_missing_root_continues() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir_all(root.join("e")).unwrap();

    let config = CleanupConfig {
        roots: vec![temp.path().join("gone"), root.clone()],
        log_path: Some(temp.path().join("cleanup.txt")),
        confirmed: true,
    };
    let report = EmptyFolderCleaner::new(config).run().unwrap();

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.removed, vec![root.join("e")]);
}

#[cfg(unix)]
#[test]
fn test_cleanup_failure_is_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let root = temp.path().join("root");
    fs::create_dir_all(root.join("locked/child")).unwrap();
    fs::create_dir_all(root.join("other")).unwrap();
    fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o555)).unwrap();

    // Root ignores directory permissions.
    let writable_check = root.join("locked/writable_check");
    if fs::create_dir(&writable_check).is_ok() {
        fs::remove_dir(&writable_check).unwrap();
        fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let config = CleanupConfig {
        roots: vec![root.clone()],
        log_path: Some(temp.path().join("cleanup.txt")),
        confirmed: true,
    };
    let report = EmptyFolderCleaner::new(config).run().unwrap();
    fs::set_permissions(root.join("locked"), fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].path.ends_with("locked/child"));
    assert_eq!(report.removed, vec![root.join("other")]);
    assert!(root.join("locked").is_dir());
}

#[test]
fn test_consolidation_log_default_location() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let master: PathBuf = temp.path().join("master");
    write(&docs.join("a.txt"), "a");

    let report = Consolidator::new(confirmed(&[&docs], &master)).run().unwrap();
    assert_eq!(report.log_path, Some(master.join("consolidation_log.txt")));
}

#[test]
fn test_log_names_nested_folders_and_files() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let master = temp.path().join("master");
    write(&docs.join("Photos/2020/beach.jpg"), "beach");
    write(&docs.join("Photos/cover.jpg"), "jpg");

    let report = Consolidator::new(confirmed(&[&docs], &master)).run().unwrap();
    assert_eq!(report.stats.folders_copied, 2);
    assert_eq!(report.stats.files_copied, 2);

    let log = fs::read_to_string(master.join("consolidation_log.txt")).unwrap();
    for expected in [
        format!("FOLDER: {}", master.join("Photos").display()),
        format!("FOLDER: {}", master.join("Photos/2020").display()),
        format!("COPY: {}", master.join("Photos/2020/beach.jpg").display()),
        format!("COPY: {}", master.join("Photos/cover.jpg").display()),
    ] {
        assert!(log.contains(&expected), "missing {expected:?} in:\n{log}");
    }
}

#[cfg(unix)]
fn make_fifo(path: &Path) -> bool {
    std::process::Command::new("mkfifo")
        .arg(path)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

#[cfg(unix)]
#[test]
fn test_fifo_is_reported_and_does_not_block_the_run() {
    let temp = TempDir::new().unwrap();
    let docs = temp.path().join("Docs");
    let master = temp.path().join("master");
    write(&docs.join("z.txt"), "z");
    write(&docs.join("Music/song.mp3"), "la");
    if !make_fifo(&docs.join("pipe")) || !make_fifo(&docs.join("Music/pipe")) {
        return;
    }

    let (tx, rx) = std::sync::mpsc::channel();
    let config = confirmed(&[&docs], &master);
    std::thread::spawn(move || {
        let _ = tx.send(Consolidator::new(config).run());
    });
    let report = rx
        .recv_timeout(std::time::Duration::from_secs(10))
        .expect("run finished")
        .unwrap();

    let pipe = report.entry_for(&docs.join("pipe")).unwrap();
    assert_eq!(pipe.outcome, Outcome::Error);
    assert!(master.join("z.txt").is_file());
    assert!(master.join("Music/song.mp3").is_file());
    assert!(!master.join("pipe").exists());
    assert_eq!(report.errors.len(), 2);
    assert_eq!(report.stats.errors, 2);
}
