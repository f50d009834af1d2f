use crate::collection::Document;
use crate::common::Value;
use crate::errors::RelataResult;
use crate::filter::query::path_starts_with;
use crate::filter::{Operator, QueryNode};
use std::collections::HashMap;
use std::fmt::Display;

/// A filter over items.
///
/// - `Shallow` is a nested equality mapping: every key must match, nested
///   mappings recurse into sub-documents (or into any element of an attached
///   list), scalars compare by equality.
/// - `Ast` is a [`QueryNode`] tree.
///
/// ```rust
/// use relata::doc;
/// use relata::filter::Predicate;
///
/// let order = doc! { id: 7, customer: { id: 2, name: "Ann" } };
/// assert!(Predicate::from(doc! { customer: { id: 2 } }).matches(&order).unwrap());
/// assert!(!Predicate::from(doc! { customer: { id: 3 } }).matches(&order).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Shallow(Document),
    Ast(QueryNode),
}

impl Predicate {
    /// The predicate every item satisfies.
    pub fn all() -> Self {
        Predicate::Shallow(Document::new())
    }

    pub fn is_all(&self) -> bool {
        match self {
            Predicate::Shallow(conditions) => conditions.is_empty(),
            Predicate::Ast(node) => node.conjuncts().is_empty(),
        }
    }

    pub fn matches(&self, item: &Document) -> RelataResult<bool> {
        match self {
            Predicate::Shallow(conditions) => Ok(matches_shallow(item, conditions)),
            Predicate::Ast(node) => node.matches(item),
        }
    }

    pub fn validate(&self) -> RelataResult<()> {
        match self {
            Predicate::Shallow(_) => Ok(()),
            Predicate::Ast(node) => node.validate(),
        }
    }

    /// This predicate as a query tree.
    pub fn to_query(&self) -> QueryNode {
        match self {
            Predicate::Shallow(conditions) => QueryNode::from_shallow(conditions),
            Predicate::Ast(node) => node.clone(),
        }
    }

    /// The part of this predicate that can be checked before `alias` is
    /// hydrated.
    ///
    /// Shallow predicates drop the alias key. Query trees keep the top-level
    /// conjuncts that never read the alias; a root that is not a conjunction
    /// and reads the alias cannot be split, so the result matches everything.
    /// The split is always weaker than the original, so verifying the full
    /// predicate after hydration stays correct.
    pub fn split(&self, alias: Option<&str>) -> Predicate {
        let Some(alias) = alias else {
            return self.clone();
        };

        match self {
            Predicate::Shallow(conditions) => {
                let mut own = conditions.clone();
                for (key, _) in conditions.iter() {
                    if path_starts_with(&key, alias) {
                        own.remove(&key);
                    }
                }
                Predicate::Shallow(own)
            }
            Predicate::Ast(node) => {
                if !node.touches(alias) {
                    return self.clone();
                }

                if node.operator() != Operator::And {
                    log::debug!("Cannot split {} across alias {}, scanning all", node, alias);
                    return Predicate::all();
                }

                let kept: Vec<QueryNode> = node
                    .conjuncts()
                    .into_iter()
                    .filter(|conjunct| !conjunct.touches(alias))
                    .cloned()
                    .collect();
                log::trace!("Split {} across {} keeps {} conjunct(s)", node, alias, kept.len());

                if kept.is_empty() {
                    Predicate::all()
                } else {
                    Predicate::Ast(QueryNode::and(kept))
                }
            }
        }
    }

    /// Conjunction of both predicates, or `None` when they obviously
    /// contradict each other on the same field.
    ///
    /// Two shallow predicates merge key by key and conflict when a key maps
    /// to different values. Anything else merges into a conjunction that
    /// conflicts when two top-level equality tests on the same field disagree.
    pub fn merge(&self, other: &Predicate) -> Option<Predicate> {
        match (self, other) {
            (Predicate::Shallow(left), Predicate::Shallow(right)) => {
                merge_shallow(left, right).map(Predicate::Shallow)
            }
            _ => {
                let left = self.to_query();
                let right = other.to_query();
                let conjuncts: Vec<QueryNode> = left
                    .conjuncts()
                    .into_iter()
                    .chain(right.conjuncts())
                    .cloned()
                    .collect();

                let mut equalities: HashMap<&str, &Value> = HashMap::new();
                for conjunct in &conjuncts {
                    if conjunct.operator() != Operator::Eq {
                        continue;
                    }
                    if let (Some(field), [value]) = (conjunct.field(), conjunct.values()) {
                        match equalities.get(field) {
                            Some(existing) if *existing != value => return None,
                            _ => {
                                equalities.insert(field, value);
                            }
                        }
                    }
                }

                Some(Predicate::Ast(QueryNode::and(conjuncts)))
            }
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::all()
    }
}

impl From<Document> for Predicate {
    fn from(conditions: Document) -> Self {
        Predicate::Shallow(conditions)
    }
}

impl From<QueryNode> for Predicate {
    fn from(node: QueryNode) -> Self {
        Predicate::Ast(node)
    }
}

impl Display for Predicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Predicate::Shallow(conditions) => write!(f, "{}", conditions),
            Predicate::Ast(node) => write!(f, "{}", node),
        }
    }
}

fn matches_shallow(item: &Document, conditions: &Document) -> bool {
    conditions
        .iter()
        .all(|(key, expected)| matches_value(&item.get(&key), &expected))
}

fn matches_value(actual: &Value, expected: &Value) -> bool {
    match expected {
        Value::Document(nested) => match actual {
            Value::Document(sub) => matches_shallow(sub, nested),
            Value::Array(items) => items.iter().any(|v| matches_value(v, expected)),
            _ => nested.is_empty(),
        },
        expected => actual == expected,
    }
}

fn merge_shallow(left: &Document, right: &Document) -> Option<Document> {
    let mut merged = left.clone();
    for (key, incoming) in right.iter() {
        match (merged.field(&key), &incoming) {
            (None, _) => {}
            (Some(Value::Document(current)), Value::Document(nested)) => {
                let nested = merge_shallow(current, nested)?;
                merged.put(&key, nested).ok()?;
                continue;
            }
            (Some(current), incoming) if current == incoming => continue,
            (Some(_), _) => {
                log::debug!("Conditions conflict on field {}", key);
                return None;
            }
        }
        merged.put(&key, incoming).ok()?;
    }
    Some(merged)
}
