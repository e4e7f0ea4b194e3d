//! Integration tests for slotted record pages

use std::collections::BTreeMap;

use litestore::common::{StorageError, PAGE_DATA_SIZE, SLOT_SIZE};
use litestore::record::{Record, RecordBuilder, Schema};
use litestore::storage::page::{Page, RecordPage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// id and a short name, padded out with three full-width payload columns
/// so that a handful of rows fill a page.
fn person_schema() -> Schema {
    Schema::builder()
        .integer("id")
        .varchar("name", 20)
        .varchar("bio", 255)
        .varchar("notes", 255)
        .varchar("extra", 255)
        .build()
}

fn person(id: i32, name: &str) -> Record {
    let pad = "p".repeat(255);
    RecordBuilder::new()
        .value(id)
        .value(name)
        .value(pad.as_str())
        .value(pad.as_str())
        .value(pad.as_str())
        .build()
}

#[test]
fn test_record_page_compaction_scenario() {
    let schema = person_schema();
    let mut page = Page::new();
    let mut rp = RecordPage::new(&mut page, &schema).unwrap();

    let names = ["ana", "bruno", "chloe", "dmitri", "eve"];
    for (id, name) in names.iter().enumerate() {
        assert_eq!(rp.insert(&person(id as i32, name)).unwrap(), id as u32);
    }

    // the sixth, larger row does not fit the page as it stands
    let sixth = person(5, "a-much-longer-name-x");
    let sixth_size = sixth.serialized_size(&schema).unwrap() + SLOT_SIZE;
    assert!(rp.free_space() < sixth_size);

    for slot in [0, 2, 4] {
        rp.delete(slot).unwrap();
    }
    assert_eq!(rp.record_count(), 5);
    assert_eq!(rp.live_count(), 2);
    assert!((rp.fragmentation_ratio() - 0.6).abs() < 1e-9);

    let slot = rp.insert(&sixth).unwrap();
    assert_eq!(slot, 5);
    assert_eq!(rp.get_record(5).unwrap(), Some(sixth));

    // surviving original rows are untouched
    assert_eq!(rp.get_record(1).unwrap(), Some(person(1, "bruno")));
    assert_eq!(rp.get_record(3).unwrap(), Some(person(3, "dmitri")));
    for slot in [0, 2, 4] {
        assert_eq!(rp.get_record(slot).unwrap(), None);
    }
}

#[test]
fn test_record_page_slots_stable_under_random_operations() {
    let schema = Schema::builder().integer("id").varchar("name", 255).build();
    let mut page = Page::new();
    let mut rp = RecordPage::new(&mut page, &schema).unwrap();
    let mut rng = StdRng::seed_from_u64(1234);

    let mut expected: BTreeMap<u32, Record> = BTreeMap::new();
    for step in 0..400 {
        let live: Vec<u32> = expected.keys().copied().collect();
        match rng.gen_range(0..10) {
            0..=4 => {
                let len = rng.gen_range(0..120);
                let record = RecordBuilder::new().value(step).value("r".repeat(len).as_str()).build();
                match rp.insert(&record) {
                    Ok(slot) => {
                        assert!(expected.insert(slot, record).is_none());
                    }
                    Err(StorageError::InsufficientSpace { .. }) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            5..=6 if !live.is_empty() => {
                let slot = live[rng.gen_range(0..live.len())];
                rp.delete(slot).unwrap();
                expected.remove(&slot);
            }
            7..=8 if !live.is_empty() => {
                let slot = live[rng.gen_range(0..live.len())];
                let len = rng.gen_range(0..200);
                let record = RecordBuilder::new().value(-step).value("u".repeat(len).as_str()).build();
                match rp.update(slot, &record) {
                    Ok(()) => {
                        expected.insert(slot, record);
                    }
                    Err(StorageError::InsufficientSpace { .. }) => {}
                    Err(e) => panic!("unexpected error: {}", e),
                }
            }
            _ => rp.compact().unwrap(),
        }

        assert!(rp.free_space() <= PAGE_DATA_SIZE);
        for (slot, record) in &expected {
            assert_eq!(rp.get_record(*slot).unwrap().as_ref(), Some(record), "slot {}", slot);
        }
    }

    let all: Vec<(u32, Record)> = rp.get_all_records().unwrap();
    assert_eq!(all, expected.into_iter().collect::<Vec<_>>());
}

#[test]
fn test_record_page_missing_slot() {
    let schema = person_schema();
    let mut page = Page::new();
    let mut rp = RecordPage::new(&mut page, &schema).unwrap();
    rp.insert(&person(0, "x")).unwrap();

    assert_eq!(rp.get_record(9).unwrap(), None);
    assert!(matches!(rp.delete(9), Err(StorageError::SlotNotFound(9))));
    assert!(matches!(
        rp.update(9, &person(1, "y")),
        Err(StorageError::SlotNotFound(9))
    ));
}
