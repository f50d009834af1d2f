use crate::collection::Document;
use crate::common::Value;

pub(crate) const INDEX_KEY_SEPARATOR: &str = ",";

/// Name under which a secondary index over `fields` is registered.
pub(crate) fn derive_index_name(fields: &[&str]) -> String {
    fields.join(INDEX_KEY_SEPARATOR)
}

/// Comma-joined rendering of `item`'s values for `fields`.
///
/// Missing or null fields render as the empty string and strings render
/// without quotes, so `{a: "x", b: 2}` over `["a", "b"]` yields `"x,2"`.
pub(crate) fn derive_index_key(item: &Document, fields: &[String]) -> Value {
    let mut key = String::with_capacity(fields.len() * 8);
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            key.push_str(INDEX_KEY_SEPARATOR);
        }
        match item.get(field) {
            Value::Null => {}
            Value::String(s) => key.push_str(&s),
            other => key.push_str(&other.to_string()),
        }
    }
    Value::String(key)
}
