use relata::collection::CollectionOptions;
use relata::common::Value;
use relata::doc;
use relata::errors::ErrorKind;
use relata_int_test::test_util::{FailingStorage, FailureMode};

fn three_items() -> Vec<relata::collection::Document> {
    vec![doc! { id: 1, name: "a" }, doc! { id: 2, name: "b" }, doc! { id: 3, name: "c" }]
}

#[test]
fn test_put_partial_failure_reports_partition() {
    let collection = CollectionOptions::new()
        .name("partial")
        .storage_provider(FailingStorage::new(Value::from(2), FailureMode::Error))
        .build()
        .unwrap();

    let err = collection.put_all(three_items(), false).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::SaveFailed);

    let partition = err.partition().unwrap();
    assert_eq!(
        partition.saved(),
        &[doc! { id: 1, name: "a" }, doc! { id: 3, name: "c" }]
    );
    assert_eq!(partition.failed(), &[doc! { id: 2, name: "b" }]);
    assert_eq!(err.cause().unwrap().kind(), &ErrorKind::StorageError);
    assert_eq!(
        err.message(),
        "Error saving items! (Write of 2 rejected)"
    );

    // saved items are not rolled back
    assert_eq!(collection.to_vec(None).unwrap().len(), 2);
}

#[test]
fn test_put_fail_early() {
    let collection = CollectionOptions::new()
        .name("early")
        .storage_provider(FailingStorage::new(Value::from(2), FailureMode::Error))
        .build()
        .unwrap();

    let err = collection.put_all(three_items(), true).unwrap_err();
    let partition = err.partition().unwrap();
    assert_eq!(partition.saved(), &[doc! { id: 1, name: "a" }]);
    assert_eq!(partition.failed(), &[doc! { id: 2, name: "b" }]);
    assert!(collection.get(&Value::from(3)).unwrap().is_none());
}

#[test]
fn test_refused_write_counts_as_failure() {
    let collection = CollectionOptions::new()
        .name("refusing")
        .storage_provider(FailingStorage::new(Value::from(2), FailureMode::Refuse))
        .build()
        .unwrap();

    let err = collection.put_all(three_items(), false).unwrap_err();
    let partition = err.partition().unwrap();
    assert_eq!(partition.saved().len(), 2);
    assert_eq!(partition.failed().len(), 1);

    let single = collection.put(doc! { id: 2 }).unwrap_err();
    assert_eq!(single.kind(), &ErrorKind::SaveFailed);
}

#[test]
fn test_put_returns_items_with_keys() {
    let collection = CollectionOptions::new().name("keys").build().unwrap();
    let saved = collection
        .put_all(vec![doc! { name: "a" }, doc! { id: "fixed", name: "b" }], true)
        .unwrap();

    assert_eq!(saved.len(), 2);
    assert!(saved[0].get("id").is_string());
    assert_eq!(saved[1].get("id"), Value::from("fixed"));
    for item in &saved {
        assert_eq!(collection.get(&item.get("id")).unwrap().as_ref(), Some(item));
    }
}

#[test]
fn test_custom_keygen() {
    let collection = CollectionOptions::new()
        .name("custom")
        .pk("sku")
        .keygen(|| Value::from("constant"))
        .build()
        .unwrap();

    let saved = collection.put(doc! { name: "x" }).unwrap();
    assert_eq!(saved, doc! { sku: "constant", name: "x" });
    assert_eq!(collection.get(&Value::from("constant")).unwrap(), Some(saved));
}
