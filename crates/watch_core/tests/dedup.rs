use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use watch_core::{diff_new, Item, ItemSet};

fn item(id: &str, text: &str) -> Item {
    Item {
        id: id.to_string(),
        text: text.to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        author_id: format!("u-{id}"),
        author_handle: format!("user_{id}"),
        author_avatar_url: format!("https://cdn.example/{id}.jpg"),
    }
}

fn ids(items: &[Item]) -> Vec<&str> {
    items.iter().map(|item| item.id.as_str()).collect()
}

fn init_logging() {
    watch_logging::initialize_for_tests();
}

#[test]
fn diff_returns_unknown_items_in_fetch_order() {
    init_logging();
    let known = ItemSet::from(vec![item("2", "b"), item("4", "d")]);
    let latest = vec![item("5", "e"), item("2", "b"), item("1", "a"), item("4", "d")];

    let fresh = diff_new(&latest, &known);
    assert_eq!(ids(&fresh), vec!["5", "1"]);
}

#[test]
fn diff_reports_duplicate_ids_once_first_occurrence_wins() {
    init_logging();
    let latest = vec![item("7", "first"), item("8", "x"), item("7", "second")];

    let fresh = diff_new(&latest, &ItemSet::new());
    assert_eq!(ids(&fresh), vec!["7", "8"]);
    assert_eq!(fresh[0].text, "first");
}

#[test]
fn diff_against_superset_is_empty() {
    init_logging();
    let known = ItemSet::from(vec![item("1", "a"), item("2", "b")]);
    assert!(diff_new(&[item("2", "b")], &known).is_empty());
    assert!(diff_new(&[], &known).is_empty());
}

#[test]
fn merge_is_a_set_union_and_idempotent() {
    init_logging();
    let mut known = ItemSet::from(vec![item("1", "a")]);
    let latest = vec![item("1", "a"), item("2", "b"), item("3", "c")];

    let fresh = diff_new(&latest, &known);
    assert_eq!(known.merge(fresh.clone()), 2);
    let once = known.clone();

    // A restart replays the same batch against the same known set.
    assert_eq!(known.merge(fresh), 0);
    assert_eq!(known, once);
    assert_eq!(ids(known.items()), vec!["1", "2", "3"]);
}

#[test]
fn item_set_from_sequence_drops_duplicate_ids() {
    init_logging();
    let set = ItemSet::from(vec![item("1", "a"), item("1", "again"), item("2", "b")]);
    assert_eq!(set.len(), 2);
    assert!(set.contains_id("1"));
    assert_eq!(set.items()[0].text, "a");
}

#[test]
fn item_set_serializes_as_flat_camel_case_sequence() {
    init_logging();
    let set = ItemSet::from(vec![item("9", "hello")]);
    let json = serde_json::to_value(&set).unwrap();

    let record = &json.as_array().expect("sequence")[0];
    assert_eq!(record["id"], "9");
    assert_eq!(record["text"], "hello");
    assert_eq!(record["authorId"], "u-9");
    assert_eq!(record["authorHandle"], "user_9");
    assert_eq!(record["authorAvatarUrl"], "https://cdn.example/9.jpg");
    assert!(record["createdAt"].as_str().unwrap().starts_with("2024-05-01T12:00:00"));

    let back: ItemSet = serde_json::from_value(json).unwrap();
    assert_eq!(back, set);
}
