use im::OrdMap;
use smallvec::SmallVec;

use crate::common::Value;
use crate::errors::{ErrorKind, RelataError, RelataResult};
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// Separator between the steps of an embedded field path.
pub const FIELD_SEPARATOR: char = '.';

/// An item stored in a collection, built on a persistent ordered map.
///
/// Documents are composed of key-value pairs. The key is always a [String]
/// and the value is a [Value]. Nested documents are addressed with dotted
/// paths, so `{"customer": {"name": "Bob"}}` answers `get("customer.name")`.
///
/// When a path step lands on an array (the shape a one-to-many join attaches),
/// the rest of the path is projected over every element: `get("orders.total")`
/// on `{"orders": [{"total": 1}, {"total": 2}]}` yields `[1, 2]`. A numeric
/// step indexes into the array instead.
///
/// ## Cheap copies
///
/// `im::OrdMap` shares structure between clones, so join hydration can work
/// on a copy of every stored item without copying its fields.
#[derive(Clone, Eq, PartialEq, Hash, Default, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    /// Checks if the document is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Associates the specified [Value] with the specified key in this document.
    ///
    /// Embedded keys (`"customer.address.city"`) create intermediate documents
    /// as needed.
    ///
    /// # Errors
    ///
    /// Returns [ErrorKind::InvalidArgument] if the key, or any step of an
    /// embedded key, is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use relata::collection::Document;
    /// use relata::common::Value;
    ///
    /// let mut doc = Document::new();
    /// doc.put("user.name", "Alice").unwrap();
    /// assert_eq!(doc.get("user.name"), Value::from("Alice"));
    /// ```
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> RelataResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RelataError::new(
                "Document does not support empty key",
                ErrorKind::InvalidArgument,
            ));
        }

        let value = value.into();
        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value)
        } else {
            self.data = self.data.update(key.to_string(), value);
            Ok(())
        }
    }

    /// Returns the [Value] at `key`, or [Value::Null] if there is none.
    ///
    /// Top-level keys are looked up first, so a field whose name itself
    /// contains the separator still resolves.
    pub fn get(&self, key: &str) -> Value {
        match self.data.get(key) {
            Some(value) => value.clone(),
            None if key.contains(FIELD_SEPARATOR) => {
                let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
                self.deep_get(&splits)
            }
            None => Value::Null,
        }
    }

    /// Borrows a top-level field without resolving embedded paths.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Removes the key and its value from the document.
    ///
    /// Removing a missing key is not an error.
    pub fn remove(&mut self, key: &str) {
        if self.data.contains_key(key) || !key.contains(FIELD_SEPARATOR) {
            self.data = self.data.without(key);
            return;
        }

        let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
        self.deep_remove(&splits);
    }

    /// Retrieves all top-level and embedded field paths of this document.
    ///
    /// Arrays are leaves: their elements do not contribute paths.
    pub fn fields(&self) -> FieldVec {
        let mut fields = FieldVec::new();
        self.collect_fields("", &mut fields);
        fields
    }

    /// Returns the number of top-level entries in the document.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Checks whether a top-level key is present, even if its value is null.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks whether a top-level or embedded field resolves to a non-null value.
    pub fn contains_field(&self, field: &str) -> bool {
        self.contains_key(field) || !self.get(field).is_null()
    }

    /// Merges `other` into this document.
    ///
    /// Nested documents present on both sides are merged recursively; any other
    /// value from `other` overwrites the existing one.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (self.data.get(key), value) {
                (Some(Value::Document(current)), Value::Document(incoming)) => {
                    let mut merged = current.clone();
                    merged.merge(incoming);
                    self.data = self.data.update(key.clone(), Value::Document(merged));
                }
                _ => {
                    self.data = self.data.update(key.clone(), value.clone());
                }
            }
        }
    }

    /// Iterates over the top-level entries in key order.
    pub fn iter(&self) -> DocumentIter {
        DocumentIter {
            inner: self.data.clone().into_iter(),
        }
    }

    pub(crate) fn to_json(&self) -> String {
        let entries: Vec<String> = self
            .data
            .iter()
            .map(|(k, v)| format!("\"{}\": {}", k, v.to_json()))
            .collect();
        format!("{{{}}}", entries.join(", "))
    }

    fn deep_get(&self, splits: &[&str]) -> Value {
        let Some((first, rest)) = splits.split_first() else {
            return Value::Null;
        };

        match self.data.get(*first) {
            Some(value) if rest.is_empty() => value.clone(),
            Some(value) => resolve_path(value, rest),
            None => Value::Null,
        }
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> RelataResult<()> {
        let Some((key, rest)) = splits.split_first() else {
            log::error!("Empty embedded key");
            return Err(RelataError::new(
                "Empty embedded key",
                ErrorKind::InvalidArgument,
            ));
        };

        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RelataError::new(
                "Document does not support empty key",
                ErrorKind::InvalidArgument,
            ));
        }

        if rest.is_empty() {
            self.data = self.data.update(key.to_string(), value);
            return Ok(());
        }

        // descend into an existing embedded document or start a new one
        let mut nested = match self.data.get(*key) {
            Some(Value::Document(obj)) => obj.clone(),
            _ => Document::new(),
        };
        nested.deep_put(rest, value)?;
        self.data = self.data.update(key.to_string(), Value::Document(nested));
        Ok(())
    }

    fn deep_remove(&mut self, splits: &[&str]) {
        let Some((key, rest)) = splits.split_first() else {
            return;
        };

        if rest.is_empty() {
            self.data = self.data.without(*key);
            return;
        }

        if let Some(Value::Document(obj)) = self.data.get(*key) {
            let mut nested = obj.clone();
            nested.deep_remove(rest);
            self.data = self.data.update(key.to_string(), Value::Document(nested));
        }
    }

    fn collect_fields(&self, prefix: &str, fields: &mut FieldVec) {
        for (key, value) in self.data.iter() {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(nested) if !nested.is_empty() => {
                    nested.collect_fields(&path, fields)
                }
                _ => fields.push(path),
            }
        }
    }
}

fn resolve_path(value: &Value, splits: &[&str]) -> Value {
    let Some((first, rest)) = splits.split_first() else {
        return value.clone();
    };

    match value {
        Value::Document(doc) => doc.deep_get(splits),
        Value::Array(items) => match first.parse::<usize>() {
            Ok(index) => items
                .get(index)
                .map(|item| resolve_path(item, rest))
                .unwrap_or(Value::Null),
            // project the remaining path over every element
            Err(_) => Value::Array(items.iter().map(|item| resolve_path(item, splits)).collect()),
        },
        _ => Value::Null,
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

pub struct DocumentIter {
    inner: im::ordmap::ConsumingIter<(String, Value)>,
}

impl Iterator for DocumentIter {
    type Item = (String, Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

#[doc(hidden)]
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// Values are single token trees: literals, identifiers, nested `{}`
/// documents, `[]` arrays or parenthesized expressions.
///
/// ```rust
/// use relata::doc;
///
/// let base = 100;
/// let order = doc! {
///     id: 1,
///     customer: { name: "Bob Jones", tags: ["vip", "new"] },
///     total: (base * 2),
/// };
/// assert_eq!(order.get("customer.name").as_str(), Some("Bob Jones"));
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::collection::Document::new()
    };

    () => {
        $crate::collection::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            let mut doc = $crate::collection::Document::new();
            $(
                doc.put(&$crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Helper macro to convert values for the doc! macro.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
