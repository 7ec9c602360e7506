// Test suite for conversation extraction, blob dumps and blob decoding

mod common;

use salvage_core::{DisplayZone, EpochMillis};
use salvage_engine::commands::conversation::{
    decode_blob_file, dump_blobs, extract_conversation, ConversationOptions, DumpOptions,
};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn sample_conversation() -> serde_json::Value {
    json!({
        "composerId": "main",
        "conversation": [
            {"type": 1, "text": "Refactor the parser for café", "timingInfo": {"clientStartTime": 1_710_512_520_000i64}},
            {"type": 2, "text": "Done, see diff."},
            {"type": 1, "text": "Undo that", "timingInfo": {"clientRpcSendTime": 1_710_512_580}}
        ]
    })
}

#[test]
fn test_extract_conversation_picks_largest_composer_blob() {
    // Given: a database with a real conversation and a tiny one
    let dir = TempDir::new().unwrap();
    let db = common::state_db(dir.path(), &sample_conversation());

    // When: we extract
    let report = extract_conversation(&ConversationOptions::new(&db)).unwrap();

    // Then: the large blob is used
    assert_eq!(report.key, "composerData:main");
    assert_eq!(report.conversation.len(), 3);

    // And: the timeline is newest first, seconds normalized to millis
    let timeline = report.conversation.timeline();
    assert_eq!(timeline[0].text, "Undo that");
    assert_eq!(timeline[0].timestamp, Some(EpochMillis::new(1_710_512_580_000)));
    assert_eq!(
        report.conversation.cutoff_for_entry(1).unwrap(),
        EpochMillis::new(1_710_512_520_000)
    );
}

#[test]
fn test_extract_conversation_writes_outputs() {
    // Given: a database and output paths in a not-yet-existing directory
    let dir = TempDir::new().unwrap();
    let db = common::state_db(dir.path(), &sample_conversation());
    let out = dir.path().join("extracted");

    let mut options = ConversationOptions::new(&db);
    options.json_out = Some(out.join("conversation.json"));
    options.text_out = Some(out.join("timeline.txt"));
    options.zone = DisplayZone::Utc;

    // When: we extract
    extract_conversation(&options).unwrap();

    // Then: pretty JSON keeps non-ASCII text unescaped
    let json_text = fs::read_to_string(out.join("conversation.json")).unwrap();
    assert!(json_text.contains("café"));
    assert!(json_text.contains("\n  \"conversation\""));

    // And: the text timeline is rendered in UTC
    let timeline = fs::read_to_string(out.join("timeline.txt")).unwrap();
    assert!(timeline.starts_with("[2024-03-15 14:23:00] You: Undo that"));
}

#[test]
fn test_extract_conversation_without_composer_blob_is_not_found() {
    let dir = TempDir::new().unwrap();
    let db = common::state_db(dir.path(), &sample_conversation());

    let mut options = ConversationOptions::new(&db);
    options.key_prefix = "chatData:".to_string();
    let err = extract_conversation(&options).unwrap_err();

    assert_eq!(err.code(), "ERR_NOT_FOUND");
}

#[test]
fn test_extract_conversation_missing_db_is_source_unavailable() {
    let dir = TempDir::new().unwrap();

    let err = extract_conversation(&ConversationOptions::new(dir.path().join("none.vscdb")))
        .unwrap_err();

    assert_eq!(err.code(), "ERR_SOURCE_UNAVAILABLE");
}

#[test]
fn test_dump_blobs_respects_min_size() {
    // Given: a database with one 3000-byte blob and smaller ones
    let dir = TempDir::new().unwrap();
    let db = common::state_db(dir.path(), &sample_conversation());
    let out = dir.path().join("blobs");

    // When: we dump with the default threshold
    let report = dump_blobs(&DumpOptions::new(&db, &out)).unwrap();

    // Then: only the large blob is written, with ':' made file-safe
    assert_eq!(common::dir_names(&out), vec!["bubbleId_x_y.bin"]);
    assert_eq!(report.blobs.len(), 1);
    assert_eq!(report.total_bytes(), 3000);

    // And: lowering the threshold dumps everything
    let mut options = DumpOptions::new(&db, dir.path().join("all"));
    options.min_size = 0;
    assert_eq!(dump_blobs(&options).unwrap().blobs.len(), 3);
}

#[test]
fn test_decode_blob_file_pretty_prints() {
    // Given: a raw blob file
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("composerData_main.bin");
    fs::write(&input, serde_json::to_vec(&sample_conversation()).unwrap()).unwrap();
    let output = dir.path().join("decoded").join("composer.json");

    // When: we decode it
    decode_blob_file(&input, &output).unwrap();

    // Then: the output is equivalent, indented JSON
    let text = fs::read_to_string(&output).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(parsed, sample_conversation());
    assert!(text.contains('\n'));
    assert!(text.contains("café"));
}

#[test]
fn test_decode_blob_file_rejects_binary() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("junk.bin");
    fs::write(&input, [0xff, 0x00, 0x12]).unwrap();

    let err = decode_blob_file(&input, &dir.path().join("out.json")).unwrap_err();

    assert_eq!(err.code(), "ERR_SERIALIZATION");
    assert!(!dir.path().join("out.json").exists());
}
