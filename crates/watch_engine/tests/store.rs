use std::fs;

use chrono::{TimeZone, Utc};
use tempfile::TempDir;
use watch_core::{Item, ItemSet};
use watch_engine::{ensure_parent_dir, AtomicFileWriter, SeenItemStore, StoreError};

fn item(id: &str) -> Item {
    Item {
        id: id.to_string(),
        text: format!("text {id}"),
        created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        author_id: "7".to_string(),
        author_handle: "dora".to_string(),
        author_avatar_url: "https://cdn.example/d.jpg".to_string(),
    }
}

fn init_logging() {
    watch_logging::initialize_for_tests();
}

#[test]
fn missing_store_loads_as_empty_set() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = SeenItemStore::new(temp.path().join("comments.json"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn saved_set_loads_back_in_order() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let store = SeenItemStore::new(temp.path().join("nested").join("comments.json"));
    let set = ItemSet::from(vec![item("b"), item("a")]);

    store.save(&set).unwrap();
    let loaded = store.load().unwrap();
    assert_eq!(loaded, set);
    assert_eq!(loaded.items()[0].id, "b");

    let text = fs::read_to_string(store.path()).unwrap();
    assert!(text.contains("\"authorHandle\": \"dora\""));
}

#[test]
fn corrupt_store_is_an_error_not_an_empty_set() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("comments.json");
    fs::write(&path, "{ not json").unwrap();

    let err = SeenItemStore::new(&path).load().unwrap_err();
    assert!(matches!(err, StoreError::Parse(..)));
}

#[test]
fn store_reads_records_written_by_hand() {
    init_logging();
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("comments.json");
    fs::write(
        &path,
        r#"[
  {
    "id": "1",
    "text": "hello",
    "createdAt": "2024-05-01T12:00:00.000Z",
    "authorId": "9",
    "authorHandle": "eve",
    "authorAvatarUrl": ""
  }
]"#,
    )
    .unwrap();

    let set = SeenItemStore::new(&path).load().unwrap();
    assert!(set.contains_id("1"));
}

#[test]
fn creates_missing_parent_dir() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("out").join("state.json");
    ensure_parent_dir(&target).unwrap();
    assert!(temp.path().join("out").is_dir());
}

#[test]
fn atomic_write_replaces_existing_content() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("doc.json"));

    writer.write("hello").unwrap();
    assert_eq!(fs::read_to_string(writer.path()).unwrap(), "hello");

    writer.write("world").unwrap();
    assert_eq!(fs::read_to_string(writer.path()).unwrap(), "world");
    // Only the target remains; no temp files left behind.
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}

#[test]
fn failed_write_leaves_no_partial_file() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("not_a_dir");
    fs::write(&blocker, "x").unwrap();

    let writer = AtomicFileWriter::new(blocker.join("doc.json"));
    assert!(writer.write("data").is_err());
    assert_eq!(fs::read_to_string(&blocker).unwrap(), "x");
}
