use relata::collection::JoinOptions;
use relata::common::Value;
use relata::errors::ErrorKind;
use relata::filter::{Fields, QueryBuilder};
use relata_derive::Fields;
use relata_int_test::test_util::{cleanup, create_populated_context, ids, run_test};

#[allow(dead_code)]
#[derive(Fields)]
struct Address {
    street: String,
    city: String,
}

#[allow(dead_code)]
#[derive(Fields)]
struct Customer {
    id: u64,
    name: String,
    city: String,
    #[fields(nested)]
    addresses: Vec<Address>,
    #[fields(skip)]
    cached_score: f64,
}

#[allow(dead_code)]
#[derive(Fields)]
#[fields(join(alias = "customer", target = Customer))]
struct Order {
    id: String,
    #[fields(rename = "customer")]
    customer_id: u64,
    total: u64,
    tags: Vec<String>,
}

#[test]
fn test_derived_paths() {
    assert_eq!(
        Customer::paths(),
        vec!["id", "name", "city", "addresses", "addresses.street", "addresses.city"]
    );
    let order_paths = Order::paths();
    assert!(order_paths.contains(&"customer".to_string()));
    assert!(order_paths.contains(&"customer.name".to_string()));
    assert!(order_paths.contains(&"customer.addresses.city".to_string()));
    assert!(!order_paths.contains(&"customer_id".to_string()));
}

#[test]
fn test_checked_builder_accepts_declared_paths() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let with_customer = ctx.orders().join(
                &ctx.customers(),
                JoinOptions::new().from("customer").alias("customer"),
            )?;

            let query = QueryBuilder::checked::<Order>()
                .field("customer")
                .field("city")
                .eq("Austin")
                .field("total")
                .lt(30)
                .build()?;
            let found = query.execute(&with_customer, false)?.to_vec(None)?;
            assert_eq!(ids(&found), vec![Value::from("o1")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_checked_builder_rejects_unknown_paths() {
    let err = QueryBuilder::checked::<Order>()
        .field("customer")
        .field("nickname")
        .eq("Bobby")
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidQuery);

    let err = QueryBuilder::checked::<Customer>()
        .field("cached_score")
        .gt(1)
        .build()
        .unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::InvalidQuery);

    // array positions are not part of the shape
    assert!(QueryBuilder::checked::<Customer>()
        .field("addresses.0.city")
        .eq("Austin")
        .build()
        .is_ok());
}

#[test]
fn test_builder_groups_against_collection() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();
            let view = orders.filter(|q| {
                q.or(|q| q.field("total").ge(40).field("customer").eq(2))
                    .not(|q| q.field("tags").contains("rush"))
            })?;
            // o2 is large but rushed, o3 is Ann's
            assert_eq!(ids(&view.to_vec(None)?), vec![Value::from("o3")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_builder_errors_surface_from_filter() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let err = ctx.orders().filter(|q| q.eq(1)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidQuery);

            let err = ctx.orders().filter(|q| q.field("").eq(1)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidArgument);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}
