use crate::collection::{Collection, Document, FIELD_SEPARATOR};
use crate::common::{ItemCursor, Value};
use crate::errors::{ErrorKind, RelataError, RelataResult};
use crate::filter::Predicate;
use itertools::Itertools;
use std::fmt::Display;
use std::str::FromStr;

/// Operator of a [`QueryNode`].
///
/// `And`, `Or` and `Not` combine child nodes; every other operator compares
/// the value at the node's field with its operands.
///
/// `Eq`, `Gt`, `Ge`, `Contains`, `BeginsWith` and `Between` hold for an array
/// reached through a path when any element satisfies them. `Ne`, `Le`, `Lt`
/// and `NotContains` are the negations of `Eq`, `Gt`, `Ge` and `Contains`:
/// they hold when the field is missing, and over an array they require every
/// element to satisfy them. `age < 18` therefore matches an item without an
/// `age` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operator {
    And,
    Or,
    Not,
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    NotContains,
    BeginsWith,
    Between,
}

impl Operator {
    pub fn is_group(&self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Not)
    }

    pub fn is_value(&self) -> bool {
        !self.is_group()
    }

    /// The operator whose result is the complement of this one, if the
    /// negation table has an entry for it.
    ///
    /// The table is an involution: `negated(negated(op)) == op` for every
    /// paired operator. `Not` negates to `And` over its child, which is not
    /// an operator pairing, so it returns `None` like the unpaired operators.
    pub fn negated(&self) -> Option<Operator> {
        match self {
            Operator::And => Some(Operator::Or),
            Operator::Or => Some(Operator::And),
            Operator::Eq => Some(Operator::Ne),
            Operator::Ne => Some(Operator::Eq),
            Operator::Gt => Some(Operator::Le),
            Operator::Le => Some(Operator::Gt),
            Operator::Ge => Some(Operator::Lt),
            Operator::Lt => Some(Operator::Ge),
            Operator::Contains => Some(Operator::NotContains),
            Operator::NotContains => Some(Operator::Contains),
            Operator::Not | Operator::BeginsWith | Operator::Between => None,
        }
    }

    fn arity(&self) -> usize {
        match self {
            Operator::Between => 2,
            _ => 1,
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Operator::And => "&&",
            Operator::Or => "||",
            Operator::Not => "!",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Contains => "contains",
            Operator::NotContains => "not contains",
            Operator::BeginsWith => "begins with",
            Operator::Between => "between",
        }
    }
}

impl FromStr for Operator {
    type Err = RelataError;

    /// Parses an operator name. `gte` and `lte` are accepted as aliases of
    /// `ge` and `le`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Ok(Operator::And),
            "or" => Ok(Operator::Or),
            "not" => Ok(Operator::Not),
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "gt" => Ok(Operator::Gt),
            "ge" | "gte" => Ok(Operator::Ge),
            "lt" => Ok(Operator::Lt),
            "le" | "lte" => Ok(Operator::Le),
            "contains" => Ok(Operator::Contains),
            "notcontains" | "not_contains" => Ok(Operator::NotContains),
            "beginswith" | "begins_with" => Ok(Operator::BeginsWith),
            "between" => Ok(Operator::Between),
            other => {
                log::error!("Unknown query operator {}", other);
                Err(RelataError::new(
                    &format!("Unknown query operator {}", other),
                    ErrorKind::InvalidQuery,
                ))
            }
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Operands of a [`QueryNode`]: child nodes for group operators, comparison
/// values for value operators.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Operands {
    Nodes(Vec<QueryNode>),
    Values(Vec<Value>),
}

/// One node of a query tree.
///
/// ```rust
/// use relata::doc;
/// use relata::filter::{Operator, QueryNode};
///
/// let query = QueryNode::and(vec![
///     QueryNode::compare(Operator::Eq, "customer.id", 2),
///     QueryNode::compare(Operator::Gt, "total", 100),
/// ]);
///
/// let order = doc! { total: 150, customer: { id: 2 } };
/// assert!(query.matches(&order).unwrap());
/// assert!(!query.negate().matches(&order).unwrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QueryNode {
    operator: Operator,
    operands: Operands,
    field: Option<String>,
}

impl QueryNode {
    /// Creates a node without validating it. Malformed nodes are reported
    /// by [`QueryNode::validate`] or when they are evaluated.
    pub fn new(operator: Operator, operands: Operands, field: Option<String>) -> Self {
        QueryNode {
            operator,
            operands,
            field,
        }
    }

    pub fn and(children: Vec<QueryNode>) -> Self {
        QueryNode::new(Operator::And, Operands::Nodes(children), None)
    }

    pub fn or(children: Vec<QueryNode>) -> Self {
        QueryNode::new(Operator::Or, Operands::Nodes(children), None)
    }

    pub fn not(child: QueryNode) -> Self {
        QueryNode::new(Operator::Not, Operands::Nodes(vec![child]), None)
    }

    /// A single-operand comparison on `field`.
    pub fn compare<T: Into<Value>>(operator: Operator, field: &str, value: T) -> Self {
        QueryNode::new(
            operator,
            Operands::Values(vec![value.into()]),
            Some(field.to_string()),
        )
    }

    /// An inclusive range test on `field`.
    pub fn between<L: Into<Value>, U: Into<Value>>(field: &str, lower: L, upper: U) -> Self {
        QueryNode::new(
            Operator::Between,
            Operands::Values(vec![lower.into(), upper.into()]),
            Some(field.to_string()),
        )
    }

    /// Equality conjunction over every leaf of a nested mapping.
    pub fn from_shallow(conditions: &Document) -> Self {
        let mut children = Vec::new();
        collect_leaf_conditions("", conditions, &mut children);
        QueryNode::and(children)
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operands(&self) -> &Operands {
        &self.operands
    }

    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    pub fn children(&self) -> &[QueryNode] {
        match &self.operands {
            Operands::Nodes(nodes) => nodes,
            Operands::Values(_) => &[],
        }
    }

    pub fn values(&self) -> &[Value] {
        match &self.operands {
            Operands::Values(values) => values,
            Operands::Nodes(_) => &[],
        }
    }

    /// Appends a child to a group node.
    pub(crate) fn push_child(&mut self, child: QueryNode) {
        match &mut self.operands {
            Operands::Nodes(children) => children.push(child),
            Operands::Values(_) => self.operands = Operands::Nodes(vec![child]),
        }
    }

    pub(crate) fn into_children(self) -> Vec<QueryNode> {
        match self.operands {
            Operands::Nodes(children) => children,
            Operands::Values(_) => Vec::new(),
        }
    }

    /// Checks the whole tree for structural errors.
    pub fn validate(&self) -> RelataResult<()> {
        if self.operator.is_group() {
            let children = self.group_children()?;
            for child in children {
                child.validate()?;
            }
        } else {
            self.comparison_parts()?;
        }
        Ok(())
    }

    /// Evaluates this node against `item`.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidQuery`] for a value operator without a field, an
    /// operand list of the wrong shape, or a `Not` with other than one child.
    pub fn matches(&self, item: &Document) -> RelataResult<bool> {
        match self.operator {
            Operator::And => {
                for child in self.group_children()? {
                    if !child.matches(item)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operator::Or => {
                for child in self.group_children()? {
                    if child.matches(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Operator::Not => {
                let children = self.group_children()?;
                Ok(!children[0].matches(item)?)
            }
            _ => {
                let (field, values) = self.comparison_parts()?;
                Ok(compare(self.operator, &item.get(field), values))
            }
        }
    }

    /// Rewrites the tree into its logical complement.
    ///
    /// `And`/`Or` swap and negate their children, `Not` unwraps into an
    /// `And` of its child, paired comparisons swap to their complement and
    /// unpaired ones are wrapped in `Not`.
    pub fn negate(&self) -> QueryNode {
        match self.operator {
            Operator::And | Operator::Or => {
                let operator = match self.operator {
                    Operator::And => Operator::Or,
                    _ => Operator::And,
                };
                QueryNode::new(
                    operator,
                    Operands::Nodes(self.children().iter().map(|c| c.negate()).collect()),
                    self.field.clone(),
                )
            }
            Operator::Not => QueryNode::new(
                Operator::And,
                Operands::Nodes(self.children().to_vec()),
                self.field.clone(),
            ),
            op => match op.negated() {
                Some(negated) => {
                    QueryNode::new(negated, self.operands.clone(), self.field.clone())
                }
                None => QueryNode::not(self.clone()),
            },
        }
    }

    /// Runs this query against `collection`, rewriting it into its
    /// complement first when `negate` is set.
    pub fn execute(&self, collection: &Collection, negate: bool) -> RelataResult<ItemCursor> {
        self.validate()?;
        let node = if negate { self.negate() } else { self.clone() };
        log::debug!("Executing query {} on {}", node, collection.name());
        collection.find(&Predicate::Ast(node))
    }

    /// Whether any comparison in the tree reads `alias` or a path below it.
    pub fn touches(&self, alias: &str) -> bool {
        if self.operator.is_group() {
            return self.children().iter().any(|c| c.touches(alias));
        }
        self.field.as_deref().is_some_and(|f| path_starts_with(f, alias))
    }

    /// Top-level conjuncts, looking through nested `And` nodes.
    pub fn conjuncts(&self) -> Vec<&QueryNode> {
        let mut conjuncts = Vec::new();
        self.collect_conjuncts(&mut conjuncts);
        conjuncts
    }

    fn collect_conjuncts<'a>(&'a self, conjuncts: &mut Vec<&'a QueryNode>) {
        if self.operator == Operator::And {
            for child in self.children() {
                child.collect_conjuncts(conjuncts);
            }
        } else {
            conjuncts.push(self);
        }
    }

    fn group_children(&self) -> RelataResult<&[QueryNode]> {
        let children = match &self.operands {
            Operands::Nodes(nodes) => nodes.as_slice(),
            Operands::Values(values) if values.is_empty() => &[],
            Operands::Values(_) => {
                log::error!("Operator {:?} takes query nodes, not values", self.operator);
                return Err(RelataError::new(
                    &format!("Operator {:?} takes query nodes, not values", self.operator),
                    ErrorKind::InvalidQuery,
                ));
            }
        };

        if self.operator == Operator::Not && children.len() != 1 {
            log::error!("Not takes exactly one operand, got {}", children.len());
            return Err(RelataError::new(
                &format!("Not takes exactly one operand, got {}", children.len()),
                ErrorKind::InvalidQuery,
            ));
        }
        Ok(children)
    }

    fn comparison_parts(&self) -> RelataResult<(&str, &[Value])> {
        let field = match self.field.as_deref() {
            Some(field) if !field.is_empty() => field,
            _ => {
                log::error!("Operator {:?} requires a field", self.operator);
                return Err(RelataError::new(
                    &format!("Operator {:?} requires a field", self.operator),
                    ErrorKind::InvalidQuery,
                ));
            }
        };

        match &self.operands {
            Operands::Values(values) if values.len() == self.operator.arity() => {
                Ok((field, values.as_slice()))
            }
            _ => {
                log::error!(
                    "Operator {:?} on {} expects {} value operand(s)",
                    self.operator,
                    field,
                    self.operator.arity()
                );
                Err(RelataError::new(
                    &format!(
                        "Operator {:?} on {} expects {} value operand(s)",
                        self.operator,
                        field,
                        self.operator.arity()
                    ),
                    ErrorKind::InvalidQuery,
                ))
            }
        }
    }
}

impl From<&Document> for QueryNode {
    fn from(conditions: &Document) -> Self {
        QueryNode::from_shallow(conditions)
    }
}

impl Display for QueryNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operator {
            Operator::And | Operator::Or => {
                let children = self.children();
                if children.is_empty() {
                    return write!(f, "{}", if self.operator == Operator::And { "true" } else { "false" });
                }
                let separator = format!(" {} ", self.operator);
                write!(f, "({})", children.iter().join(&separator))
            }
            Operator::Not => match self.children().first() {
                Some(child) => write!(f, "!{}", child),
                None => write!(f, "!()"),
            },
            Operator::Between => {
                let field = self.field.as_deref().unwrap_or("?");
                match self.values() {
                    [lower, upper] => write!(f, "({} between {} and {})", field, lower, upper),
                    _ => write!(f, "({} between ?)", field),
                }
            }
            op => {
                let field = self.field.as_deref().unwrap_or("?");
                match self.values().first() {
                    Some(value) => write!(f, "({} {} {})", field, op, value),
                    None => write!(f, "({} {} ?)", field, op),
                }
            }
        }
    }
}

fn collect_leaf_conditions(prefix: &str, conditions: &Document, out: &mut Vec<QueryNode>) {
    for (key, value) in conditions.iter() {
        let path = if prefix.is_empty() {
            key
        } else {
            format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
        };
        match value {
            Value::Document(nested) => collect_leaf_conditions(&path, &nested, out),
            value => out.push(QueryNode::compare(Operator::Eq, &path, value)),
        }
    }
}

pub(crate) fn path_starts_with(path: &str, prefix: &str) -> bool {
    path == prefix
        || (path.starts_with(prefix)
            && path[prefix.len()..].starts_with(FIELD_SEPARATOR))
}

/// Positive operators hold for an array reached through a path when any
/// element satisfies them; their complements are defined as the negation so
/// that rewriting and runtime negation always agree. A complement therefore
/// holds for a missing field (`Lt` is `!Ge`, so `null < 18` is true) and over
/// an array it requires every element to satisfy it.
fn compare(operator: Operator, actual: &Value, operands: &[Value]) -> bool {
    match operator {
        Operator::Ne => !compare(Operator::Eq, actual, operands),
        Operator::Le => !compare(Operator::Gt, actual, operands),
        Operator::Lt => !compare(Operator::Ge, actual, operands),
        Operator::NotContains => !compare(Operator::Contains, actual, operands),
        Operator::Contains => contains(actual, &operands[0]),
        Operator::Eq => any_element(actual, &operands[0], &|v| v == &operands[0]),
        Operator::Gt => any_element(actual, &operands[0], &|v| v > &operands[0]),
        Operator::Ge => any_element(actual, &operands[0], &|v| v >= &operands[0]),
        Operator::BeginsWith => any_element(actual, &operands[0], &|v| {
            match (v.as_str(), operands[0].as_str()) {
                (Some(s), Some(prefix)) => s.starts_with(prefix),
                _ => false,
            }
        }),
        Operator::Between => any_element(actual, &operands[0], &|v| {
            v >= &operands[0] && v <= &operands[1]
        }),
        Operator::And | Operator::Or | Operator::Not => false,
    }
}

fn any_element(actual: &Value, operand: &Value, test: &dyn Fn(&Value) -> bool) -> bool {
    match actual {
        Value::Array(items) if !operand.is_array() => {
            items.iter().any(|v| any_element(v, operand, test))
        }
        value => test(value),
    }
}

fn contains(actual: &Value, operand: &Value) -> bool {
    match (actual, operand) {
        (Value::String(s), Value::String(sub)) => s.contains(sub.as_str()),
        // nested arrays come from projecting a path over a list
        (Value::Array(items), operand) => items
            .iter()
            .any(|v| v == operand || (v.is_array() && contains(v, operand))),
        _ => false,
    }
}
