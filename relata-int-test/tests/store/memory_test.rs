use relata::collection::CollectionOptions;
use relata::common::Value;
use relata::doc;
use relata::errors::ErrorKind;
use relata::filter::Predicate;
use relata::store::memory::InMemoryStorage;
use relata::store::StorageProvider;
use relata_int_test::test_util::{cleanup, create_populated_context, ids, run_test, CountingStorage};

#[test]
fn test_index_tracks_collection_writes() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let by_customer = ctx.order_store().index(&["customer"]).unwrap();
            // later writes replace earlier ones under the same index key
            assert_eq!(
                by_customer.get(&Value::from("1"))?.unwrap().get("id"),
                Value::from("o2")
            );
            assert_eq!(
                by_customer.get(&Value::from("2"))?.unwrap().get("id"),
                Value::from("o3")
            );

            ctx.orders().put(doc! { id: "o4", customer: 3, total: 5 })?;
            assert!(by_customer.contains_key(&Value::from("3"))?);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_store_fails_collection_operations() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let customers = ctx.customers();
            let mut cursor = customers.iter()?;
            assert!(cursor.next().unwrap().is_ok());

            ctx.customer_store().close();

            let err = customers.get(&Value::from(1)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StorageError);
            assert!(customers.find(&Predicate::all()).is_err());
            assert!(cursor.next().unwrap().is_err());

            let err = customers.put(doc! { id: 9 }).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::SaveFailed);
            assert_eq!(err.cause().unwrap().kind(), &ErrorKind::StorageError);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_cursor_tolerates_concurrent_writes() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let customers = ctx.customers();
            let mut cursor = customers.iter()?;
            assert_eq!(cursor.next().unwrap()?.get("id"), Value::from(1));

            customers.put(doc! { id: 0, name: "Behind" })?;
            customers.put(doc! { id: 4, name: "Ahead" })?;

            let rest: Vec<Value> = cursor
                .map(|item| item.map(|i| i.get("id")))
                .collect::<Result<_, _>>()?;
            assert_eq!(rest, vec![Value::from(2), Value::from(3), Value::from(4)]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_pulls_lazily() {
    let storage = CountingStorage::new("counted");
    let collection = CollectionOptions::new()
        .name("counted")
        .storage_provider(storage.clone())
        .build()
        .unwrap();
    for n in 0..10 {
        let even = n % 2 == 0;
        collection.put(doc! { id: n, even: even }).unwrap();
    }

    let mut cursor = collection.find(&Predicate::from(doc! { even: true })).unwrap();
    assert_eq!(storage.finds(), 1);
    assert_eq!(storage.pulled(), 0);

    assert_eq!(cursor.next().unwrap().unwrap().get("id"), Value::from(0));
    assert!(storage.pulled() <= 2);

    let first_two = collection.to_vec(Some(2)).unwrap();
    assert_eq!(ids(&first_two), vec![Value::from(0), Value::from(1)]);
}

#[test]
fn test_collections_share_a_store() {
    let shared = InMemoryStorage::new("shared");
    let first = CollectionOptions::new()
        .name("first")
        .storage_provider(shared.clone())
        .build()
        .unwrap();
    let second = CollectionOptions::new()
        .name("second")
        .storage_provider(shared.clone())
        .build()
        .unwrap();

    first.put(doc! { id: "k", from: "first" }).unwrap();
    assert_eq!(
        second.get(&Value::from("k")).unwrap().unwrap().get("from"),
        Value::from("first")
    );
    assert_eq!(shared.size().unwrap(), 1);
    assert_eq!(shared.name(), "shared");
}
