use relata::collection::{Collection, JoinOptions};
use relata::common::Value;
use relata::doc;
use relata::errors::ErrorKind;
use relata::filter::{Operands, Operator, Predicate, QueryNode};
use relata_int_test::test_util::{cleanup, create_populated_context, ids, run_test};
use std::collections::BTreeSet;

fn key_set(collection: &Collection, query: &QueryNode, negate: bool) -> BTreeSet<Value> {
    query
        .execute(collection, negate)
        .unwrap()
        .map(|item| item.unwrap().get("id"))
        .collect()
}

fn sample_queries() -> Vec<QueryNode> {
    vec![
        QueryNode::compare(Operator::Eq, "customer", 1),
        QueryNode::compare(Operator::Ne, "customer", 1),
        QueryNode::compare(Operator::Gt, "total", 20),
        QueryNode::compare(Operator::Le, "total", 25),
        QueryNode::compare(Operator::Contains, "tags", "gift"),
        QueryNode::compare(Operator::BeginsWith, "id", "o1"),
        QueryNode::between("total", 20, 30),
        QueryNode::and(vec![
            QueryNode::compare(Operator::Ge, "total", 15),
            QueryNode::compare(Operator::Lt, "total", 40),
        ]),
        QueryNode::or(vec![
            QueryNode::compare(Operator::Eq, "customer", 2),
            QueryNode::not(QueryNode::compare(Operator::Contains, "tags", "rush")),
        ]),
        QueryNode::not(QueryNode::or(vec![
            QueryNode::compare(Operator::Eq, "customer", 2),
            QueryNode::compare(Operator::Gt, "total", 30),
        ])),
    ]
}

#[test]
fn test_negated_execution_is_complement() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();
            let all: BTreeSet<Value> = ids(&orders.to_vec(None)?).into_iter().collect();

            for query in sample_queries() {
                let matched = key_set(&orders, &query, false);
                let negated = key_set(&orders, &query, true);
                assert!(matched.is_disjoint(&negated), "{} overlaps its negation", query);
                assert_eq!(
                    matched.union(&negated).cloned().collect::<BTreeSet<_>>(),
                    all,
                    "{} and its negation do not cover all items",
                    query
                );

                // rewriting and wrapping in Not agree
                let wrapped: BTreeSet<Value> = orders
                    .find(&Predicate::from(QueryNode::not(query.clone())))?
                    .map(|item| item.map(|i| i.get("id")))
                    .collect::<Result<_, _>>()?;
                assert_eq!(wrapped, negated, "{}", query);
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_double_negation_restores_results() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();
            for query in sample_queries() {
                let twice = query.negate().negate();
                assert_eq!(key_set(&orders, &twice, false), key_set(&orders, &query, false));
            }
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_through_join_alias() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let with_customer = ctx.orders().join(
                &ctx.customers(),
                JoinOptions::new().from("customer").alias("customer"),
            )?;

            let query = QueryNode::and(vec![
                QueryNode::compare(Operator::Eq, "customer.city", "Austin"),
                QueryNode::compare(Operator::Gt, "total", 30),
            ]);
            let found = query.execute(&with_customer, false)?.to_vec(None)?;
            assert_eq!(ids(&found), vec![Value::from("o2")]);

            let negated = query.execute(&with_customer, true)?.to_vec(None)?;
            assert_eq!(ids(&negated), vec![Value::from("o1"), Value::from("o3")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_invalid_queries_are_rejected() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();

            let no_field = QueryNode::new(
                Operator::Eq,
                Operands::Values(vec![Value::from(1)]),
                None,
            );
            let err = no_field.execute(&orders, false).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidQuery);

            let two_children = QueryNode::new(
                Operator::Not,
                Operands::Nodes(vec![
                    QueryNode::compare(Operator::Eq, "id", "o1"),
                    QueryNode::compare(Operator::Eq, "id", "o2"),
                ]),
                None,
            );
            let err = orders.find(&Predicate::from(two_children)).unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidQuery);

            let err = "like".parse::<Operator>().unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::InvalidQuery);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_shallow_and_query_predicates_agree() {
    run_test(
        || create_populated_context(),
        |ctx| {
            let orders = ctx.orders();
            let shallow = Predicate::from(doc! { customer: 1, total: 40 });
            let query = Predicate::from(shallow.to_query());

            let by_shallow = orders.find(&shallow)?.to_vec(None)?;
            let by_query = orders.find(&query)?.to_vec(None)?;
            assert_eq!(by_shallow, by_query);
            assert_eq!(ids(&by_shallow), vec![Value::from("o2")]);
            Ok(())
        },
        |ctx| cleanup(ctx),
    )
}

#[test]
fn test_query_display() {
    let query = QueryNode::or(vec![
        QueryNode::compare(Operator::Ge, "total", 10),
        QueryNode::not(QueryNode::between("age", 1, 5)),
    ]);
    assert_eq!(query.to_string(), "((total >= 10) || !(age between 1 and 5))");
}
