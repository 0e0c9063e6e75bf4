//! Property tests over identities, updates and paging.

use collection_store::query::{self, QueryParams};
use collection_store::{FieldSchema, FieldType, Record, Store, StoreConfig};
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::HashSet;
use tempfile::TempDir;

fn note_schema(secured: bool) -> FieldSchema {
    let schema = FieldSchema::new("Note")
        .with_field("Text", FieldType::String)
        .with_field("Rank", FieldType::Integer);
    if secured {
        schema.secured()
    } else {
        schema
    }
}

fn note(text: &str, rank: i64) -> Record {
    json!({"Text": text, "Rank": rank}).as_object().cloned().unwrap()
}

/// Interleaved adds and removes; removal targets an index into the Ids
/// issued so far.
#[derive(Debug, Clone)]
enum Op {
    Add(String),
    Remove(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => "[a-z]{0,8}".prop_map(Op::Add),
        1 => (0usize..64).prop_map(Op::Remove),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn ids_are_pairwise_distinct(ops in prop::collection::vec(op(), 1..40), secured in any::<bool>()) {
        let dir = TempDir::new().unwrap();
        let store = Store::create(StoreConfig {
            path: dir.path().join("store"),
            ..Default::default()
        })
        .unwrap();
        let notes = store.collection(note_schema(secured)).unwrap();

        let mut issued: Vec<String> = Vec::new();
        for op in ops {
            match op {
                Op::Add(text) => {
                    let added = notes.add(note(&text, 0)).unwrap();
                    prop_assert!(added.succeeded());
                    let id = match &added.value["Id"] {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    issued.push(id);
                }
                Op::Remove(i) if !issued.is_empty() => {
                    let id = issued[i % issued.len()].clone();
                    notes.remove(&id).unwrap();
                }
                Op::Remove(_) => {}
            }

            let live = notes.find_by_filter(|_| true);
            let distinct: HashSet<String> = live.iter().map(|r| r["Id"].to_string()).collect();
            prop_assert_eq!(distinct.len(), live.len());
        }
    }

    #[test]
    fn update_replaces_every_schema_field(text in "[a-z ]{0,12}", rank in -1000i64..1000, new_id in 2u64..100) {
        let dir = TempDir::new().unwrap();
        let store = Store::create(StoreConfig {
            path: dir.path().join("store"),
            ..Default::default()
        })
        .unwrap();
        let notes = store.collection(note_schema(false)).unwrap();
        notes.add(note("first", 7)).unwrap();

        let mut replacement = note(&text, rank);
        replacement.insert("Id".into(), json!(new_id));
        let updated = notes.update("1", replacement).unwrap();
        prop_assert!(updated.succeeded());

        let stored = notes.get("1").unwrap();
        prop_assert_eq!(&stored["Id"], &json!(1));
        prop_assert_eq!(&stored["Text"], &json!(text));
        prop_assert_eq!(&stored["Rank"], &json!(rank));
        prop_assert_eq!(stored.len(), 3);
    }

    #[test]
    fn page_is_window_of_sorted_result(len in 0usize..30, limit in 0usize..8, offset in 0usize..6) {
        let records: Vec<Record> = (0..len)
            .map(|i| json!({"Id": i as u64 + 1, "Text": "x", "Rank": (i * 7 % 11) as i64}).as_object().cloned().unwrap())
            .collect();
        let schema = note_schema(false);

        let sorted = query::filter(records.clone(), &QueryParams::new().with("sort", "Rank,Id"), &schema).unwrap();
        let page = query::filter(
            records,
            &QueryParams::new()
                .with("sort", "Rank,Id")
                .with("limit", limit.to_string())
                .with("offset", offset.to_string()),
            &schema,
        )
        .unwrap();

        let expected: Vec<Record> = sorted.into_iter().skip(offset * limit).take(limit).collect();
        prop_assert_eq!(page, expected);
    }
}
