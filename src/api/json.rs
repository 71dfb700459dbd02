//! Path-based access into loosely shaped JSON.
//!
//! The upstream API is undocumented and has changed shape over time, so
//! responses are read by JSON pointer with defaults instead of through a
//! rigid schema. Unknown fields are ignored and missing ones read as `None`.

use serde_json::Value;

/// Tolerant accessors on a JSON value, addressed by JSON pointer
/// (`"/graphql/user/id"`).
pub trait JsonPath {
    /// String at `pointer`, if present and a string.
    fn str_at(&self, pointer: &str) -> Option<&str>;

    /// Integer at `pointer`. Numeric strings are accepted since IDs and
    /// timestamps have been served both ways.
    fn i64_at(&self, pointer: &str) -> Option<i64>;

    /// Boolean at `pointer`, defaulting to `false`.
    fn bool_at(&self, pointer: &str) -> bool;

    /// Array at `pointer`, or an empty slice.
    fn array_at(&self, pointer: &str) -> &[Value];

    /// Scalar at `pointer` rendered as a string (string or number).
    fn id_at(&self, pointer: &str) -> Option<String>;
}

impl JsonPath for Value {
    fn str_at(&self, pointer: &str) -> Option<&str> {
        self.pointer(pointer).and_then(Value::as_str)
    }

    fn i64_at(&self, pointer: &str) -> Option<i64> {
        match self.pointer(pointer)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn bool_at(&self, pointer: &str) -> bool {
        self.pointer(pointer)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    fn array_at(&self, pointer: &str) -> &[Value] {
        self.pointer(pointer)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn id_at(&self, pointer: &str) -> Option<String> {
        match self.pointer(pointer)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}
