//! Integration tests for write-then-read cycles, including atomic writes.

use rstest::rstest;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use trellis_jsonl::{JsonlReader, JsonlWriter, write_jsonl_atomic};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestRecord {
    id: u32,
    name: String,
    active: bool,
}

async fn write_then_read(records: &[TestRecord]) -> Vec<TestRecord> {
    let mut writer = JsonlWriter::new(Cursor::new(Vec::new()));
    writer.write_all(records.iter()).await.unwrap();
    writer.flush().await.unwrap();

    let data = writer.into_inner().into_inner().into_inner();
    let mut reader = JsonlReader::new(Cursor::new(data));
    reader.read_all().await.unwrap()
}

#[rstest]
#[case::plain("Release 1.0")]
#[case::escapes("Line1\nLine2\t\"Quoted\"\\Backslash")]
#[case::unicode("Hello, \u{4e16}\u{754c}! \u{1F600}")]
#[case::empty("")]
#[tokio::test]
async fn roundtrip_preserves_names(#[case] name: &str) {
    let records = vec![TestRecord {
        id: 1,
        name: name.to_string(),
        active: true,
    }];
    assert_eq!(write_then_read(&records).await, records);
}

#[tokio::test]
async fn roundtrip_many_records_in_order() {
    let records: Vec<TestRecord> = (0..250)
        .map(|i| TestRecord {
            id: i,
            name: format!("record-{i}"),
            active: i % 2 == 0,
        })
        .collect();

    assert_eq!(write_then_read(&records).await, records);
}

#[tokio::test]
async fn reader_reports_eof_after_last_record() {
    let records = vec![TestRecord {
        id: 1,
        name: "only".to_string(),
        active: false,
    }];

    let mut writer = JsonlWriter::new(Cursor::new(Vec::new()));
    writer.write_all(records.iter()).await.unwrap();
    writer.flush().await.unwrap();

    let data = writer.into_inner().into_inner().into_inner();
    let mut reader = JsonlReader::new(Cursor::new(data));

    let first: Option<TestRecord> = reader.read_record().await.unwrap();
    assert!(first.is_some());
    let eof: Option<TestRecord> = reader.read_record().await.unwrap();
    assert!(eof.is_none());
}

#[tokio::test]
async fn atomic_write_roundtrips_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.jsonl");

    let records = vec![
        TestRecord {
            id: 1,
            name: "alpha".to_string(),
            active: true,
        },
        TestRecord {
            id: 2,
            name: "beta".to_string(),
            active: false,
        },
    ];
    write_jsonl_atomic(&path, &records).await.unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let mut reader = JsonlReader::new(file);
    let read_back: Vec<TestRecord> = reader.read_all().await.unwrap();

    assert_eq!(read_back, records);
}

#[tokio::test]
async fn atomic_write_replaces_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records.jsonl");

    let first = vec![TestRecord {
        id: 1,
        name: "old".to_string(),
        active: true,
    }];
    write_jsonl_atomic(&path, &first).await.unwrap();

    let second = vec![
        TestRecord {
            id: 10,
            name: "new".to_string(),
            active: false,
        },
        TestRecord {
            id: 11,
            name: "newer".to_string(),
            active: true,
        },
    ];
    write_jsonl_atomic(&path, &second).await.unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let mut reader = JsonlReader::new(file);
    let read_back: Vec<TestRecord> = reader.read_all().await.unwrap();

    assert_eq!(read_back, second);
}
