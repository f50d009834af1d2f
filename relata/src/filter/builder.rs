use crate::collection::FIELD_SEPARATOR;
use crate::common::Value;
use crate::errors::{ErrorKind, RelataError, RelataResult};
use crate::filter::{Fields, Operands, Operator, Predicate, QueryNode};
use std::sync::Arc;

/// Fluent construction of [`QueryNode`] trees by field path.
///
/// `field` descends one step and scopes the builder to the new path. A value
/// method (`eq`, `gt`, ...) appends a comparison on the accumulated path and
/// returns the builder to its root scope, so conditions chain as a
/// conjunction. `and`, `or` and `not` hand a fresh builder, scoped to the
/// current path, to a callback and group whatever it builds.
///
/// Errors are captured along the way and reported by [`QueryBuilder::build`].
///
/// ```rust
/// use relata::doc;
/// use relata::filter::QueryBuilder;
///
/// let query = QueryBuilder::new()
///     .field("status").ne("cancelled")
///     .or(|q| q.field("total").gt(100).field("customer").field("vip").eq(true))
///     .build()
///     .unwrap();
///
/// assert!(query.matches(&doc! { status: "open", total: 150 }).unwrap());
/// assert!(!query.matches(&doc! { status: "cancelled", total: 150 }).unwrap());
/// ```
pub struct QueryBuilder {
    stack: Vec<QueryNode>,
    scope: Vec<String>,
    base: Vec<String>,
    known_paths: Option<Arc<Vec<String>>>,
    error: Option<RelataError>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        QueryBuilder {
            stack: vec![QueryNode::and(vec![])],
            scope: Vec::new(),
            base: Vec::new(),
            known_paths: None,
            error: None,
        }
    }

    /// A builder that rejects any path not declared by `T`.
    pub fn checked<T: Fields>() -> Self {
        QueryBuilder {
            known_paths: Some(Arc::new(T::paths())),
            ..QueryBuilder::new()
        }
    }

    /// Descends into `name`. A dotted name descends several steps at once.
    pub fn field(mut self, name: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        if name.is_empty() || name.split(FIELD_SEPARATOR).any(str::is_empty) {
            return self.fail(
                &format!("Invalid field name '{}'", name),
                ErrorKind::InvalidArgument,
            );
        }

        self.scope
            .extend(name.split(FIELD_SEPARATOR).map(str::to_string));
        let path = self.path();
        if let Err(e) = self.check_path(&path) {
            self.error = Some(e);
            return self;
        }

        self.stack.push(QueryNode::and(vec![]));
        self
    }

    pub fn eq<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Eq, vec![value.into()])
    }

    pub fn ne<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Ne, vec![value.into()])
    }

    pub fn gt<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Gt, vec![value.into()])
    }

    pub fn ge<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Ge, vec![value.into()])
    }

    /// Negation of `ge`: also holds when the field is missing, and over an
    /// array every element must be smaller.
    pub fn lt<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Lt, vec![value.into()])
    }

    /// Negation of `gt`, with the same caveats as [`QueryBuilder::lt`].
    pub fn le<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Le, vec![value.into()])
    }

    /// Substring test on strings, membership test on arrays.
    pub fn contains<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::Contains, vec![value.into()])
    }

    pub fn not_contains<T: Into<Value>>(self, value: T) -> Self {
        self.compare(Operator::NotContains, vec![value.into()])
    }

    pub fn begins_with(self, prefix: &str) -> Self {
        self.compare(Operator::BeginsWith, vec![Value::from(prefix)])
    }

    /// Inclusive range test.
    pub fn between<L: Into<Value>, U: Into<Value>>(self, lower: L, upper: U) -> Self {
        self.compare(Operator::Between, vec![lower.into(), upper.into()])
    }

    /// Every condition built by `f` must hold.
    pub fn and<F: FnOnce(QueryBuilder) -> QueryBuilder>(self, f: F) -> Self {
        self.group(Operator::And, f)
    }

    /// At least one condition built by `f` must hold.
    pub fn or<F: FnOnce(QueryBuilder) -> QueryBuilder>(self, f: F) -> Self {
        self.group(Operator::Or, f)
    }

    /// The conjunction of the conditions built by `f` must not hold.
    pub fn not<F: FnOnce(QueryBuilder) -> QueryBuilder>(self, f: F) -> Self {
        self.group(Operator::Not, f)
    }

    /// Finishes the tree.
    ///
    /// # Errors
    ///
    /// The first error captured while building, or [`ErrorKind::InvalidQuery`]
    /// if the resulting tree is malformed.
    pub fn build(self) -> RelataResult<QueryNode> {
        let mut builder = self.into_root();
        if let Some(e) = builder.error.take() {
            return Err(e);
        }

        let root = builder
            .stack
            .pop()
            .unwrap_or_else(|| QueryNode::and(vec![]));
        root.validate()?;
        Ok(root)
    }

    pub fn build_predicate(self) -> RelataResult<Predicate> {
        Ok(Predicate::Ast(self.build()?))
    }

    fn compare(self, operator: Operator, values: Vec<Value>) -> Self {
        if self.error.is_some() {
            return self.into_root();
        }

        let path = self.path();
        if path.is_empty() {
            return self.fail(
                &format!("Operator {:?} requires a field", operator),
                ErrorKind::InvalidQuery,
            );
        }

        let node = QueryNode::new(operator, Operands::Values(values), Some(path));
        self.attach(node)
    }

    fn group<F: FnOnce(QueryBuilder) -> QueryBuilder>(mut self, operator: Operator, f: F) -> Self {
        if self.error.is_some() {
            return self.into_root();
        }

        let child = f(self.child_builder());
        let mut children = match child.build() {
            Ok(root) => root.into_children(),
            Err(e) => {
                self.error = Some(e);
                return self.into_root();
            }
        };

        let node = match operator {
            Operator::Not => {
                let inner = if children.len() == 1 {
                    children.remove(0)
                } else {
                    QueryNode::and(children)
                };
                QueryNode::not(inner)
            }
            op => QueryNode::new(op, Operands::Nodes(children), None),
        };
        self.attach(node)
    }

    fn child_builder(&self) -> QueryBuilder {
        QueryBuilder {
            stack: vec![QueryNode::and(vec![])],
            scope: self.scope.clone(),
            base: self.scope.clone(),
            known_paths: self.known_paths.clone(),
            error: None,
        }
    }

    fn attach(mut self, node: QueryNode) -> Self {
        if let Some(tail) = self.stack.last_mut() {
            tail.push_child(node);
        }
        self.into_root()
    }

    // folds the open field scopes back into the root
    fn into_root(mut self) -> Self {
        while self.stack.len() > 1 {
            if let Some(node) = self.stack.pop() {
                if let Some(parent) = self.stack.last_mut() {
                    parent.push_child(node);
                }
            }
        }
        self.scope = self.base.clone();
        self
    }

    fn fail(mut self, message: &str, kind: ErrorKind) -> Self {
        log::error!("{}", message);
        self.error = Some(RelataError::new(message, kind));
        self
    }

    fn path(&self) -> String {
        self.scope.join(&FIELD_SEPARATOR.to_string())
    }

    fn check_path(&self, path: &str) -> RelataResult<()> {
        let Some(known) = &self.known_paths else {
            return Ok(());
        };

        // numeric steps index into arrays and are not part of the shape
        let shape: Vec<&str> = path
            .split(FIELD_SEPARATOR)
            .filter(|step| step.parse::<usize>().is_err())
            .collect();
        let shape = shape.join(&FIELD_SEPARATOR.to_string());

        let declared = known.iter().any(|p| {
            p == &shape
                || (p.starts_with(&shape) && p[shape.len()..].starts_with(FIELD_SEPARATOR))
        });
        if declared {
            Ok(())
        } else {
            log::error!("Unknown field path {}", path);
            Err(RelataError::new(
                &format!("Unknown field path {}", path),
                ErrorKind::InvalidQuery,
            ))
        }
    }
}

impl Default for QueryBuilder {
    fn default() -> Self {
        QueryBuilder::new()
    }
}
