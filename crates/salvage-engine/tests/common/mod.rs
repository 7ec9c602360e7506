#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

/// Write one history folder with its manifest and snapshot files
pub fn write_folder(root: &Path, folder: &str, resource: &str, entries: &[(&str, i64, &str)]) {
    let dir = root.join(folder);
    fs::create_dir_all(&dir).unwrap();
    let declared: Vec<String> = entries
        .iter()
        .map(|(id, ts, _)| format!(r#"{{"id":"{}","timestamp":{}}}"#, id, ts))
        .collect();
    fs::write(
        dir.join("entries.json"),
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

/// A/B history: A at 1000/2000/3000, B at 1500, plus folder C with no entries
pub fn ab_history(root: &Path) {
    write_folder(
        root,
        "A",
        "file:///work/proj/a.txt",
        &[("a1", 1000, "A v1"), ("a2", 2000, "A v2"), ("a3", 3000, "A v3")],
    );
    write_folder(root, "B", "file:///work/proj/b.txt", &[("b1", 1500, "B v1")]);
    let c = root.join("C");
    fs::create_dir_all(&c).unwrap();
    fs::write(c.join("entries.json"), r#"{"resource":"/work/proj/c.txt"}"#).unwrap();
}

/// A key-value database with one composer conversation and some noise
pub fn state_db(dir: &Path, conversation: &serde_json::Value) -> PathBuf {
    let path = dir.join("state.vscdb");
    let conn = Connection::open(&path).unwrap();
    conn.execute("CREATE TABLE cursorDiskKV (key TEXT UNIQUE, value BLOB)", [])
        .unwrap();

    let blob = serde_json::to_vec(conversation).unwrap();
    conn.execute(
        "INSERT INTO cursorDiskKV (key, value) VALUES (?1, ?2)",
        params!["composerData:main", blob],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO cursorDiskKV (key, value) VALUES (?1, ?2)",
        params!["composerData:tiny", br#"{"conversation":[]}"#.to_vec()],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO cursorDiskKV (key, value) VALUES (?1, ?2)",
        params!["bubbleId:x:y", vec![b'q'; 3000]],
    )
    .unwrap();
    path
}

pub fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
