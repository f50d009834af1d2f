use rand::seq::SliceRandom;
use relata::collection::{CollectionOptions, JoinOptions, Multiplicity, Pick};
use relata::common::Value;
use relata::doc;
use relata::filter::Predicate;
use relata::store::Storage;
use relata_int_test::test_util::{
    cleanup, create_populated_context, create_test_context, customer_documents, ids,
    order_documents, run_test, CountingStorage,
};

#[test]
fn test_one_to_many_join() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let customers = ctx.customers();
            let orders = ctx.orders();
            customers.set(Value::from(1), doc! { id: 1, name: "Bob Jones" })?;

            let with_orders = customers.join(
                &orders,
                JoinOptions::new().from("id").to("customer").alias("orders"),
            )?;
            assert_eq!(with_orders.name(), "customer_to_order");
            assert_eq!(
                with_orders.join_descriptor().unwrap().multiplicity(),
                Multiplicity::Many
            );

            let bob = with_orders.get(&Value::from(1))?;
            let expected = doc! {
                id: 1,
                name: "Bob Jones",
                orders: [
                    { id: "o1", customer: 1, total: 25, tags: ["gift"] },
                    { id: "o2", customer: 1, total: 40, tags: ["rush", "gift"] },
                ],
            };
            assert_eq!(bob, Some(expected));

            // no orders, alias left unset
            let cy = with_orders.get(&Value::from(3))?.unwrap();
            assert!(!cy.contains_key("orders"));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_many_to_one_join() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let with_customer = ctx.orders().join(
                &ctx.customers(),
                JoinOptions::new().from("customer").to("id").alias("customer"),
            )?;

            let order = with_customer.get(&Value::from("o3"))?.unwrap();
            let customer = order.get("customer");
            assert!(customer.is_document());
            assert_eq!(
                customer,
                Value::Document(doc! { id: 2, name: "Ann Lee", city: "Boston" })
            );
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_on_join_alias_with_shuffled_inserts() {
    run_test(
        || create_test_context(),
        |ctx| {
            let mut customers = customer_documents();
            let mut orders = order_documents();
            let mut rng = rand::rng();
            customers.shuffle(&mut rng);
            orders.shuffle(&mut rng);
            ctx.customers().put_all(customers, false)?;
            ctx.orders().put_all(orders, false)?;

            let with_customer = ctx.orders().join(
                &ctx.customers(),
                JoinOptions::new().from("customer").alias("customer"),
            )?;

            let found = with_customer
                .find(&Predicate::from(doc! { customer: { id: 2 } }))?
                .to_vec(None)?;
            assert_eq!(ids(&found), vec![Value::from("o3")]);
            assert_eq!(found[0].get("customer.name"), Value::from("Ann Lee"));

            let austin = with_customer
                .find(&Predicate::from(doc! { customer: { city: "Austin" } }))?
                .to_vec(None)?;
            assert_eq!(ids(&austin), vec![Value::from("o1"), Value::from("o2")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_find_combines_own_and_joined_conditions() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let with_customer = ctx.orders().join(
                &ctx.customers(),
                JoinOptions::new().from("customer").alias("customer"),
            )?;

            let found = with_customer
                .find(&Predicate::from(doc! { total: 40, customer: { name: "Bob Jones" } }))?
                .to_vec(None)?;
            assert_eq!(ids(&found), vec![Value::from("o2")]);

            let none = with_customer
                .find(&Predicate::from(doc! { total: 15, customer: { name: "Bob Jones" } }))?
                .to_vec(None)?;
            assert!(none.is_empty());
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_hydration_is_lazy() {
    let counting = CountingStorage::new("customer");
    let customers = CollectionOptions::new()
        .name("customer")
        .storage(Storage::new(counting.clone()))
        .build()
        .unwrap();
    let orders = CollectionOptions::new().name("order").build().unwrap();
    customers.put_all(customer_documents(), true).unwrap();
    orders.put_all(order_documents(), true).unwrap();

    let with_customer = orders
        .join(&customers, JoinOptions::new().from("customer").alias("customer"))
        .unwrap();

    let mut cursor = with_customer.iter().unwrap();
    assert_eq!(counting.finds(), 0);

    let first = cursor.next().unwrap().unwrap();
    assert_eq!(first.get("customer.id"), Value::from(1));
    assert_eq!(counting.finds(), 1);

    drop(cursor);
    assert_eq!(counting.finds(), 1);
}

#[test]
fn test_join_chain() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let with_orders = ctx.customers().join(
                &ctx.orders(),
                JoinOptions::new().to("customer").alias("orders"),
            )?;
            let with_customer = ctx.orders().join(
                &with_orders,
                JoinOptions::new().from("customer").alias("customer"),
            )?;

            let order = with_customer.get(&Value::from("o3"))?.unwrap();
            assert_eq!(order.get("customer.orders.id"), Value::Array(vec![Value::from("o3")]));
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_pick_for_duplicate_matches() {
    let accounts = CollectionOptions::new().name("account").pk("number").build().unwrap();
    accounts.set(Value::from(1), doc! { number: 7, owner: "old" }).unwrap();
    accounts.set(Value::from(2), doc! { number: 7, owner: "new" }).unwrap();

    let payments = CollectionOptions::new().name("payment").build().unwrap();
    payments.put(doc! { id: 1, account: 7 }).unwrap();

    let last = payments
        .join(&accounts, JoinOptions::new().from("account").alias("account"))
        .unwrap();
    let first = payments
        .join(
            &accounts,
            JoinOptions::new().from("account").alias("account").pick(Pick::First),
        )
        .unwrap();

    let key = Value::from(1);
    assert_eq!(last.get(&key).unwrap().unwrap().get("account.owner"), Value::from("new"));
    assert_eq!(first.get(&key).unwrap().unwrap().get("account.owner"), Value::from("old"));
}

#[test]
fn test_self_join_hierarchy() {
    let employees = CollectionOptions::new().name("employee").build().unwrap();
    employees
        .put_all(
            vec![
                doc! { id: 1, name: "Ceo" },
                doc! { id: 2, name: "Cto", manager: 1 },
                doc! { id: 3, name: "Dev", manager: 2 },
            ],
            true,
        )
        .unwrap();

    let chain = employees
        .join_self(JoinOptions::new().from("manager").alias("manager"))
        .unwrap();
    assert!(chain.join_descriptor().unwrap().is_self_join());

    let dev = chain.get(&Value::from(3)).unwrap().unwrap();
    assert_eq!(dev.get("manager.name"), Value::from("Cto"));
    assert_eq!(dev.get("manager.manager.name"), Value::from("Ceo"));
    assert!(!dev.get("manager.manager").as_document().unwrap().contains_key("manager"));

    let reports_to_ceo = chain
        .find(&Predicate::from(doc! { manager: { manager: { name: "Ceo" } } }))
        .unwrap()
        .to_vec(None)
        .unwrap();
    assert_eq!(ids(&reports_to_ceo), vec![Value::from(3)]);
}

#[test]
fn test_self_join_from_options() {
    let employees = CollectionOptions::new()
        .name("employee")
        .recurse(true)
        .from("manager")
        .alias("manager")
        .build()
        .unwrap();
    employees.put(doc! { id: 1, name: "Ceo" }).unwrap();
    employees.put(doc! { id: 2, name: "Cto", manager: 1 }).unwrap();

    let cto = employees.get(&Value::from(2)).unwrap().unwrap();
    assert_eq!(cto.get("manager.name"), Value::from("Ceo"));
}

#[test]
fn test_cyclic_self_join_is_bounded() {
    let nodes = CollectionOptions::new()
        .name("node")
        .recurse(true)
        .from("next")
        .alias("next")
        .max_join_depth(4)
        .build()
        .unwrap();
    nodes.put(doc! { id: 1, next: 2 }).unwrap();
    nodes.put(doc! { id: 2, next: 1 }).unwrap();

    let one = nodes.get(&Value::from(1)).unwrap().unwrap();
    let mut depth = 0;
    let mut current = one.get("next");
    while let Value::Document(next) = current {
        depth += 1;
        current = next.get("next");
    }
    assert_eq!(depth, 4);
    // the innermost item keeps its raw join key
    assert!(current.is_integer());
}
