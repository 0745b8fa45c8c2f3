//! Member lookup by name.
//!
//! Dotted reference paths such as `joey.profile.name` are walked one segment
//! at a time. Each step asks the current value for a named member through
//! [`Resolve`].
//!
//! Built-in values expose a small fixed table of members. User types join in
//! by implementing the trait and being stored as [`Value::Dyn`].

use std::fmt;

use crate::value::Value;

/// Name of the meta-member every value answers with its runtime type name.
pub const TYPE_MEMBER: &str = "__type__";

/// Capability to expose named members.
pub trait Resolve: fmt::Debug {
    /// Runtime type name reported for `__type__`.
    fn type_name(&self) -> String;

    /// Look up a member by name. `None` means the member does not exist.
    fn member(&self, name: &str) -> Option<Value>;
}

impl Resolve for Value {
    fn type_name(&self) -> String {
        Value::type_name(self)
    }

    fn member(&self, name: &str) -> Option<Value> {
        if name == TYPE_MEMBER {
            return Some(Value::Text(Value::type_name(self)));
        }
        match self {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) => None,
            Value::Text(s) => match name {
                "len" => Some(Value::Int(s.chars().count() as i64)),
                "upper" => Some(Value::Text(s.to_uppercase())),
                "lower" => Some(Value::Text(s.to_lowercase())),
                _ => None,
            },
            Value::List(items) => match name {
                "len" => Some(Value::Int(items.len() as i64)),
                "first" => items.first().cloned(),
                "last" => items.last().cloned(),
                _ => name
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| items.get(idx).cloned()),
            },
            Value::Map(map) => map
                .get(name)
                .cloned()
                .or_else(|| (name == "len").then(|| Value::Int(map.len() as i64))),
            Value::Object(obj) => obj.member(name),
            Value::Dyn(d) => d.member(name),
        }
    }
}
