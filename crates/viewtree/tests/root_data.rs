//! Integration tests for root data: base policies, persistence and the
//! disabled flag.

use std::sync::Arc;

use viewtree::{
    validator_fn, ElementOrdering, ListStore, ListView, MapStore, MapView, RootOptions, RootPolicy,
    RootSnapshot, SetStore, SetView, ValidationError, ViewError,
};

fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_lazy_base_is_created_on_first_use() {
    setup();
    let list: ListView<i32> = ListView::new();
    assert!(list.snapshot().base.is_none());
    assert!(list.is_empty().unwrap());
    assert!(list.snapshot().base.is_some());
}

#[test]
fn test_lazy_base_can_be_replaced() {
    setup();
    let list = ListView::from_vec(vec![1, 2]);
    let before = list.mod_count();
    let old = list.replace(ListStore::from_vec(vec![7])).unwrap();
    assert_eq!(old.map(ListStore::into_vec), Some(vec![1, 2]));
    assert_eq!(list.to_vec().unwrap(), vec![7]);
    assert!(list.mod_count() > before);
}

#[test]
fn test_set_once_refuses_a_second_base() {
    setup();
    let list: ListView<i32> = ListView::with_options(RootOptions::new().with_policy(RootPolicy::SetOnce));
    list.push(1).unwrap();
    assert!(matches!(
        list.replace(ListStore::from_vec(vec![2])),
        Err(ViewError::BaseAlreadySet)
    ));
    assert_eq!(list.to_vec().unwrap(), vec![1]);
}

#[test]
fn test_construct_only_has_a_base_immediately() {
    setup();
    let set: SetView<u8> = SetView::with_options(
        RootOptions::new()
            .with_policy(RootPolicy::ConstructOnly)
            .with_ordering(ElementOrdering::Sorted),
    );
    let snapshot = set.snapshot();
    assert_eq!(snapshot.base.map(|store| store.ordering()), Some(ElementOrdering::Sorted));
}

#[test]
fn test_replace_through_a_derived_view_fails() {
    setup();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let sub = list.sub_list(0, 2).unwrap();
    assert!(matches!(sub.replace(ListStore::new()), Err(ViewError::NotRoot)));

    let set = SetView::from_elements(ElementOrdering::Sorted, [1, 2, 3]);
    let down = set.descending_set().unwrap();
    assert!(matches!(
        down.replace(SetStore::new(ElementOrdering::Sorted)),
        Err(ViewError::NotRoot)
    ));
}

#[test]
fn test_list_snapshot_round_trip() {
    setup();
    let list = ListView::from_store(ListStore::unique_from(vec![3, 1, 2]), RootOptions::default());
    let json = serde_json::to_string(&list.snapshot()).unwrap();

    let snapshot: RootSnapshot<ListStore<i32>> = serde_json::from_str(&json).unwrap();
    let restored = ListView::from_snapshot(snapshot, RootOptions::default());
    assert_eq!(restored.to_vec().unwrap(), vec![3, 1, 2]);

    // Uniqueness survives the trip.
    restored.push(3).unwrap();
    assert_eq!(restored.to_vec().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_set_and_map_snapshots_keep_their_ordering() {
    setup();
    let set = SetView::from_elements(ElementOrdering::Linked, ["b", "a", "c"].map(String::from));
    let json = serde_json::to_string(&set.snapshot()).unwrap();
    let snapshot: RootSnapshot<SetStore<String>> = serde_json::from_str(&json).unwrap();
    let restored = SetView::from_snapshot(snapshot, RootOptions::new().with_ordering(ElementOrdering::Linked));
    assert_eq!(restored.to_vec().unwrap(), vec!["b", "a", "c"]);

    let map = MapView::from_entries(ElementOrdering::Sorted, [(2u32, "two".to_string()), (1, "one".to_string())]);
    let json = serde_json::to_string(&map.snapshot()).unwrap();
    let snapshot: RootSnapshot<MapStore<u32, String>> = serde_json::from_str(&json).unwrap();
    let restored = MapView::from_snapshot(snapshot, RootOptions::new().with_ordering(ElementOrdering::Sorted));
    assert_eq!(restored.first_entry().unwrap(), Some((1, "one".to_string())));
    assert_eq!(restored.tail_map(2, true).unwrap().len().unwrap(), 1);
}

#[test]
fn test_validators_are_registered_again_after_restore() {
    setup();
    let positive = validator_fn(|n: &i32| {
        if *n > 0 { Ok(()) } else { Err(ValidationError::new("not positive")) }
    });
    let list = ListView::from_vec(vec![1, 2]);
    list.add_validator(Arc::clone(&positive));
    assert!(matches!(list.push(-1), Err(ViewError::Validation(_))));

    let restored = ListView::from_snapshot(list.snapshot(), RootOptions::default());
    restored.push(-1).unwrap();
    assert_eq!(restored.to_vec().unwrap(), vec![1, 2, -1]);

    restored.add_validator(positive);
    assert!(matches!(restored.push(-2), Err(ViewError::Validation(_))));
    assert_eq!(restored.len().unwrap(), 3);
}

#[test]
fn test_disabled_flag_is_persisted() {
    setup();
    let list = ListView::from_vec(vec![1]);
    list.disable();
    let snapshot = list.snapshot();
    assert!(snapshot.disabled);

    let restored = ListView::from_snapshot(snapshot, RootOptions::default());
    assert!(restored.is_disabled());
    assert!(matches!(restored.len(), Err(ViewError::Disabled)));
}

#[test]
fn test_disabled_collection_refuses_reads_until_written() {
    setup();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let sub = list.sub_list(1, 3).unwrap();
    list.disable();

    assert!(sub.is_disabled());
    assert!(matches!(sub.to_vec(), Err(ViewError::Disabled)));
    assert!(matches!(sub.iter(), Err(ViewError::Disabled)));

    // Writing through any view enables the whole collection again.
    sub.push(4).unwrap();
    assert!(!list.is_disabled());
    assert_eq!(list.to_vec().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_disabled_cursor_fails() {
    setup();
    let set = SetView::from_elements(ElementOrdering::Sorted, [1, 2, 3]);
    let mut cursor = set.iter().unwrap();
    assert_eq!(cursor.next().unwrap().unwrap(), 1);
    set.disable();
    assert!(matches!(cursor.next(), Some(Err(ViewError::Disabled))));
    set.enable();
    assert!(set.contains(&2).unwrap());
}

#[test]
fn test_stale_list_cursor_after_foreign_write() {
    setup();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let mut cursor = list.iter().unwrap();
    assert_eq!(cursor.next().unwrap().unwrap(), 1);
    list.sub_list(2, 3).unwrap().push(4).unwrap();
    assert!(cursor.remove().unwrap_err().is_comodification());
    assert_eq!(list.to_vec().unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_sublist_rederives_against_a_replaced_base() {
    setup();
    let list = ListView::from_vec(vec![1, 2, 3]);
    let sub = list.sub_list(1, 3).unwrap();

    list.replace(ListStore::from_vec(vec![4, 5, 6, 7])).unwrap();
    assert_eq!(sub.to_vec().unwrap(), vec![5, 6]);

    list.replace(ListStore::from_vec(vec![9])).unwrap();
    assert!(matches!(sub.len(), Err(ViewError::IllegalViewInfo { .. })));
}
