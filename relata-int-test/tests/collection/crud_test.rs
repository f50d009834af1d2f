use relata::collection::{CollectionOptions, SequenceKeyGenerator};
use relata::common::Value;
use relata::doc;
use relata::errors::ErrorKind;
use relata::store::{Storage, StorageProvider};
use relata_int_test::test_util::{
    cleanup, create_populated_context, create_test_context, ids, run_test,
};
use std::collections::HashSet;

#[test]
fn test_put_generates_unique_keys() {
    run_test(
        || create_test_context(),
        |ctx| {
            let customers = ctx.customers();
            let mut keys = HashSet::new();
            for _ in 0..200 {
                let saved = customers.put(doc! { name: "x" })?;
                let key = saved.get("id");
                assert!(key.is_truthy());
                assert!(keys.insert(key));
            }
            assert_eq!(customers.to_vec(None)?.len(), 200);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_generated_keys_follow_insertion_order() {
    run_test(
        || create_test_context(),
        |ctx| {
            let customers = ctx.customers();
            let first = customers.put(doc! { name: "first" })?;
            let second = customers.put(doc! { name: "second" })?;
            let third = customers.put(doc! { name: "third" })?;

            let names: Vec<Value> = customers
                .to_vec(None)?
                .iter()
                .map(|c| c.get("name"))
                .collect();
            assert_eq!(names, vec![first.get("name"), second.get("name"), third.get("name")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_get_is_idempotent() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let customers = ctx.customers();
            let first = customers.get(&Value::from(2))?;
            let second = customers.get(&Value::from(2))?;
            assert_eq!(first, second);
            assert_eq!(first, Some(doc! { id: 2, name: "Ann Lee", city: "Boston" }));
            assert_eq!(customers.get(&Value::from(42))?, None);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_iteration_in_key_order() {
    run_test(
        || create_test_context(),
        |ctx| {
            let customers = ctx.customers();
            customers.put(doc! { id: "a" })?;
            customers.put(doc! { id: "c" })?;
            customers.put(doc! { id: "b" })?;

            let items = customers.to_vec(None)?;
            assert_eq!(ids(&items), vec![Value::from("a"), Value::from("b"), Value::from("c")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_set_replaces_whole_item() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let customers = ctx.customers();
            assert!(customers.set(Value::from(1), doc! { id: 1, name: "Robert" })?);
            assert_eq!(
                customers.get(&Value::from(1))?,
                Some(doc! { id: 1, name: "Robert" })
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_set_all_reports_each_pair() {
    run_test(
        || create_test_context(),
        |ctx| {
            let customers = ctx.customers();
            let results = customers.set_all(vec![
                (Value::from(1), doc! { id: 1 }),
                (Value::Null, doc! { id: 2 }),
                (Value::from(3), doc! { id: 3 }),
            ])?;

            assert_eq!(results.len(), 3);
            assert_eq!(results[0].1.as_ref().ok(), Some(&true));
            assert_eq!(results[1].1.as_ref().ok(), Some(&false));
            assert_eq!(results[2].1.as_ref().ok(), Some(&true));
            assert_eq!(customers.to_vec(None)?.len(), 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_strict_keys() {
    let strict = CollectionOptions::new()
        .name("strict")
        .pk("code")
        .strict_keys(true)
        .build()
        .unwrap();

    let err = strict.set(Value::from("x"), doc! { name: "x" }).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::MissingKey);
    assert!(strict.set(Value::from("x"), doc! { code: "x" }).unwrap());

    // put assigns the key before writing
    let saved = strict.put(doc! { name: "y" }).unwrap();
    assert!(saved.get("code").is_truthy());
}

#[test]
fn test_to_vec_with_max() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();
            assert_eq!(orders.to_vec(Some(2))?.len(), 2);
            assert_eq!(orders.to_vec(Some(10))?.len(), 3);
            assert!(orders.to_vec(Some(0))?.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_cursors_are_restartable() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();
            let mut partial = orders.iter()?;
            let first = partial.next().unwrap()?;
            assert_eq!(first.get("id"), Value::from("o1"));

            // a fresh cursor starts over, independent of the partial one
            let all = orders.iter()?.to_vec(None)?;
            assert_eq!(all.len(), 3);
            assert_eq!(partial.next().unwrap()?.get("id"), Value::from("o2"));
            assert_eq!(partial.yielded(), 2);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_collection_backs_collection() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let mirror = CollectionOptions::new()
                .name("mirror")
                .keygen(SequenceKeyGenerator::new("m"))
                .storage(Storage::new(ctx.customers()))
                .build()?;

            assert_eq!(mirror.to_vec(None)?, ctx.customers().to_vec(None)?);
            let saved = mirror.put(doc! { name: "Di" })?;
            assert_eq!(saved.get("id"), Value::from("m0000000001"));
            assert!(ctx.customers().get(&Value::from("m0000000001"))?.is_some());
            assert_eq!(StorageProvider::name(&mirror), "mirror");
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_closed_storage_surfaces_errors() {
    run_test(
        || create_populated_context(),
        |ctx| {
            ctx.customer_store().close();
            let err = ctx.customers().get(&Value::from(1)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::StorageError);
            assert!(ctx.customers().iter().is_err());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
