//! Integration tests for resilient JSONL decoding of stored payloads.
//!
//! A persisted payload may be damaged by manual edits or an interrupted
//! external copy. Decoding must keep every intact record and report the rest.

use serde::{Deserialize, Serialize};
use tempfile::tempdir;
use trellis_store::warning::Damage;
use trellis_store::{FileStore, KvStore, decode_jsonl_resilient, encode_jsonl};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Record {
    Header { version: u32 },
    Item { id: String, parents: Vec<String> },
}

fn item(id: &str, parents: &[&str]) -> Record {
    Record::Item {
        id: id.to_string(),
        parents: parents.iter().map(ToString::to_string).collect(),
    }
}

#[test]
fn tagged_records_roundtrip_through_jsonl() {
    let records = vec![
        Record::Header { version: 1 },
        item("c", &["b"]),
        item("b", &["a"]),
        item("a", &[]),
    ];

    let bytes = encode_jsonl(&records).unwrap();
    let (decoded, warnings) = decode_jsonl_resilient::<Record>(&bytes);

    assert_eq!(decoded, records);
    assert!(warnings.is_empty());
}

#[test]
fn unknown_record_kind_is_reported_not_fatal() {
    let payload = concat!(
        "{\"kind\":\"header\",\"version\":1}\n",
        "{\"kind\":\"mystery\",\"id\":\"x\"}\n",
        "{\"kind\":\"item\",\"id\":\"a\",\"parents\":[]}\n",
    );

    let (decoded, warnings) = decode_jsonl_resilient::<Record>(payload.as_bytes());

    assert_eq!(decoded, vec![Record::Header { version: 1 }, item("a", &[])]);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line_number, 2);
    assert!(matches!(warnings[0].damage, Damage::NotARecord(_)));
}

#[test]
fn every_line_damaged_yields_only_warnings() {
    let payload = b"garbage\n{\"kind\":\nnull\n";

    let (decoded, warnings) = decode_jsonl_resilient::<Record>(payload);

    assert!(decoded.is_empty());
    assert_eq!(warnings.len(), 3);
    let lines: Vec<usize> = warnings.iter().map(|w| w.line_number).collect();
    assert_eq!(lines, vec![1, 2, 3]);
}

#[tokio::test]
async fn payload_damaged_on_disk_still_decodes_intact_records() {
    let dir = tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let bytes = encode_jsonl([Record::Header { version: 1 }, item("a", &[])]).unwrap();
    store.set("graph:repo:a", &bytes).await.unwrap();

    let path = dir.path().join("graph%3Arepo%3Aa");
    let mut damaged = tokio::fs::read(&path).await.unwrap();
    damaged.extend_from_slice(b"{\"kind\":\"item\",\"id\":\"b\",\"par");
    tokio::fs::write(&path, &damaged).await.unwrap();

    let raw = store.get("graph:repo:a").await.unwrap().unwrap();
    let (decoded, warnings) = decode_jsonl_resilient::<Record>(&raw);

    assert_eq!(decoded.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].line_number, 3);
}
