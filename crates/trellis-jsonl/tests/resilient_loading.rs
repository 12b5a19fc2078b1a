//! Integration tests for resilient loading of damaged JSONL files.

use serde::Deserialize;
use trellis_jsonl::{Warning, read_jsonl_resilient};

#[derive(Debug, Deserialize, PartialEq)]
struct TestRecord {
    id: u32,
    name: String,
    active: bool,
}

async fn write_fixture(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.jsonl");
    tokio::fs::write(&path, content).await.unwrap();
    (dir, path)
}

#[tokio::test]
async fn corrupted_lines_are_skipped_with_warnings() {
    let content = r#"{"id": 1, "name": "Valid1", "active": true}
{corrupted line without proper json}
{"id": 3, "name": "Valid2", "active": false}
{also corrupted
{"id": 5, "name": "Valid3", "active": true}
{"missing_required_field": 123}
{"id": 7, "name": "Valid4", "active": false}
"#;
    let (_dir, path) = write_fixture(content).await;

    let (records, warnings) = read_jsonl_resilient::<TestRecord, _>(&path).await.unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[0].id, 1);
    assert_eq!(records[3].id, 7);

    assert_eq!(warnings.len(), 3);
    assert_eq!(warnings[0].line_number(), 2);
    assert_eq!(warnings[1].line_number(), 4);
    assert_eq!(warnings[2].line_number(), 6);
    for warning in &warnings {
        assert!(matches!(warning, Warning::MalformedJson { .. }));
    }
}

#[tokio::test]
async fn fully_valid_file_produces_no_warnings() {
    let content = r#"{"id": 1, "name": "a", "active": true}
{"id": 2, "name": "b", "active": false}
"#;
    let (_dir, path) = write_fixture(content).await;

    let (records, warnings) = read_jsonl_resilient::<TestRecord, _>(&path).await.unwrap();
    assert_eq!(records.len(), 2);
    assert!(warnings.is_empty());
}

#[tokio::test]
async fn fully_corrupted_file_yields_empty_records() {
    let content = "{bad1}\n{bad2}\n{bad3}\n";
    let (_dir, path) = write_fixture(content).await;

    let (records, warnings) = read_jsonl_resilient::<TestRecord, _>(&path).await.unwrap();
    assert!(records.is_empty());
    assert_eq!(warnings.len(), 3);
}

#[tokio::test]
async fn blank_lines_do_not_produce_warnings() {
    let content = "\n{\"id\": 1, \"name\": \"a\", \"active\": true}\n\n\t  \n{bad}\n\n";
    let (_dir, path) = write_fixture(content).await;

    let (records, warnings) = read_jsonl_resilient::<TestRecord, _>(&path).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line_number(), 5);
}

#[tokio::test]
async fn missing_file_is_an_error() {
    let result = read_jsonl_resilient::<TestRecord, _>("/nonexistent/dir/file.jsonl").await;
    assert!(result.is_err());
}
