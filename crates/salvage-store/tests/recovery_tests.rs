// End-to-end recovery tests: ingest, reconcile, materialize
// Covers point-in-time selection, replacement of earlier output,
// idempotence and disambiguation

use salvage_core::{reconcile, reconcile_by, EpochMillis, PartitionKey};
use salvage_store::destination::{Destination, Outcome};
use salvage_store::history::{HistoryIngestor, DEFAULT_MANIFEST_NAME};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_folder(root: &Path, folder: &str, resource: &str, entries: &[(&str, i64, &str)]) {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    let declared: Vec<String> = entries
        .iter()
        .map(|(id, ts, _)| format!(r#"{{"id":"{}","timestamp":{}}}"#, id, ts))
        .collect();
    fs::write(
        dir.join(DEFAULT_MANIFEST_NAME),
        format!(
            r#"{{"resource":"{}","entries":[{}]}}"#,
            resource,
            declared.join(",")
        ),
    )
    .unwrap();
    for (id, _, body) in entries {
        fs::write(dir.join(id), body).unwrap();
    }
}

fn ab_history() -> TempDir {
    let root = TempDir::new().unwrap();
    write_folder(
        root.path(),
        "A",
        "/proj/a.txt",
        &[("a1", 1000, "A v1"), ("a2", 2000, "A v2"), ("a3", 3000, "A v3")],
    );
    write_folder(root.path(), "B", "/proj/b.txt", &[("b1", 1500, "B v1")]);
    root
}

fn dir_contents(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap())
        .map(|e| (e.file_name().to_string_lossy().into_owned(), fs::read(e.path()).unwrap()))
        .collect()
}

fn recover_into(history: &Path, dest: &Path, cutoff: i64) -> salvage_store::MaterializeReport {
    let (records, _) = HistoryIngestor::new(history).ingest_all().unwrap();
    let set = reconcile(records, EpochMillis::new(cutoff));
    Destination::prepare_clean(dest).unwrap().materialize(&set)
}

#[test]
fn test_recover_as_of_1800() {
    // Given: A has snapshots at 1000/2000/3000 and B at 1500
    let history = ab_history();
    let out = TempDir::new().unwrap();

    // When: we recover as of 1800
    let report = recover_into(history.path(), out.path(), 1800);

    // Then: A v1 and B v1 are recovered
    let files = dir_contents(out.path());
    assert_eq!(files.len(), 2);
    assert_eq!(files["a.txt"], b"A v1");
    assert_eq!(files["b.txt"], b"B v1");
    assert_eq!(report.written(), 2);
    assert_eq!(report.failed(), 0);
}

#[test]
fn test_recover_as_of_2500() {
    // Given: the same history
    let history = ab_history();
    let out = TempDir::new().unwrap();

    // When: we recover as of 2500
    recover_into(history.path(), out.path(), 2500);

    // Then: A v2 and B v1 are recovered
    let files = dir_contents(out.path());
    assert_eq!(files["a.txt"], b"A v2");
    assert_eq!(files["b.txt"], b"B v1");
}

#[test]
fn test_recover_before_any_snapshot_writes_nothing() {
    let history = ab_history();
    let out = TempDir::new().unwrap();

    let report = recover_into(history.path(), out.path(), 999);

    assert!(dir_contents(out.path()).is_empty());
    assert_eq!(report.written(), 0);
}

#[test]
fn test_recovery_is_idempotent_across_fresh_destinations() {
    // Given: one history
    let history = ab_history();
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();

    // When: we recover twice into empty destinations
    recover_into(history.path(), first.path(), 2500);
    recover_into(history.path(), second.path(), 2500);

    // Then: names and bytes are identical
    assert_eq!(dir_contents(first.path()), dir_contents(second.path()));
}

#[test]
fn test_rerun_into_same_destination_gives_same_files() {
    // Given: a completed recovery
    let history = ab_history();
    let out = TempDir::new().unwrap();
    recover_into(history.path(), out.path(), 2500);
    let before = dir_contents(out.path());

    // When: we run the same recovery again
    let report = recover_into(history.path(), out.path(), 2500);

    // Then: the same names and bytes, and no `.1` copies
    assert_eq!(report.written(), 2);
    assert_eq!(dir_contents(out.path()), before);
}

#[test]
fn test_rerun_at_lower_cutoff_replaces_output() {
    // Given: a destination holding the 2500 recovery
    let history = ab_history();
    let out = TempDir::new().unwrap();
    recover_into(history.path(), out.path(), 2500);

    // When: we recover as of 1800 into the same place
    let report = recover_into(history.path(), out.path(), 1800);

    // Then: a.txt holds the 1800 winner and the 2500 one is gone
    let files = dir_contents(out.path());
    assert_eq!(files.keys().map(String::as_str).collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
    assert_eq!(files["a.txt"], b"A v1");
    let placed = report
        .placements
        .iter()
        .find(|p| p.logical_name == "a.txt")
        .unwrap();
    assert_eq!(placed.outcome, Outcome::Written);
    assert!(placed.target.ends_with("a.txt"));
}

#[test]
fn test_prepare_keeps_existing_files_and_disambiguates() {
    // Given: a destination that is prepared, not cleared, and already has a.txt
    let history = ab_history();
    let out = TempDir::new().unwrap();
    fs::write(out.path().join("a.txt"), b"keep me").unwrap();
    let (records, _) = HistoryIngestor::new(history.path()).ingest_all().unwrap();
    let set = reconcile(records, EpochMillis::new(1800));

    // When: we materialize into it
    Destination::prepare(out.path()).unwrap().materialize(&set);

    // Then: the existing file survives and the snapshot lands beside it
    let files = dir_contents(out.path());
    assert_eq!(files["a.txt"], b"keep me");
    assert_eq!(files["a.1.txt"], b"A v1");
}

#[test]
fn test_same_name_from_different_dirs_is_deterministic() {
    // Given: two distinct files that share a basename
    let history = TempDir::new().unwrap();
    write_folder(history.path(), "f1", "/proj/server/mod.rs", &[("s1", 100, "server")]);
    write_folder(history.path(), "f2", "/proj/client/mod.rs", &[("c1", 200, "client")]);

    let run = |dest: &Path| {
        let (records, _) = HistoryIngestor::new(history.path()).ingest_all().unwrap();
        let set = reconcile_by(records, EpochMillis::new(1_000), PartitionKey::ResourcePath);
        Destination::prepare_clean(dest).unwrap().materialize(&set)
    };

    // When: we recover by resource path into two fresh destinations
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    run(first.path());
    run(second.path());

    // Then: both files are kept, client first because it sorts first
    let files = dir_contents(first.path());
    assert_eq!(files.len(), 2);
    assert_eq!(files["mod.rs"], b"client");
    assert_eq!(files["mod.1.rs"], b"server");

    // And: repeated runs assign the same names
    assert_eq!(files, dir_contents(second.path()));
}

#[test]
fn test_missing_content_does_not_abort_materialization() {
    // Given: a winner whose snapshot disappears after ingest
    let history = ab_history();
    let out = TempDir::new().unwrap();
    let (records, _) = HistoryIngestor::new(history.path()).ingest_all().unwrap();
    let set = reconcile(records, EpochMillis::new(1800));
    fs::remove_file(history.path().join("A").join("a1")).unwrap();

    // When: we materialize
    let report = Destination::prepare(out.path()).unwrap().materialize(&set);

    // Then: the failure is recorded and the other file is still copied
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].name, "a.txt");
    assert_eq!(report.failures[0].error.code(), "ERR_COPY_FAILED");
    assert_eq!(dir_contents(out.path())["b.txt"], b"B v1");

    // And: no temporary files are left behind
    assert!(dir_contents(out.path())
        .keys()
        .all(|name| !name.ends_with(".tmp")));
}
