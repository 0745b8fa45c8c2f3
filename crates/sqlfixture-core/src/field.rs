//! Column definitions.

use crate::error::{Error, Result};
use crate::value::Value;

/// Storage type of a column, used to check literal fixture values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Integer column. Accepts `Int`.
    Integer,
    /// Floating point column. Accepts `Float` and `Int`.
    Float,
    /// Text column. Accepts `Text`.
    Text,
    /// Boolean column. Accepts `Bool`.
    Boolean,
    /// JSON column. Accepts any literal, including nested lists and maps.
    Json,
}

impl FieldType {
    /// Lower-case type name used in error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
            FieldType::Json => "json",
        }
    }

    /// Whether a non-null value can be stored in a column of this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::Integer, Value::Int(_))
            | (FieldType::Float, Value::Float(_) | Value::Int(_))
            | (FieldType::Text, Value::Text(_))
            | (FieldType::Boolean, Value::Bool(_)) => true,
            (FieldType::Json, v) => is_literal(v),
            _ => false,
        }
    }
}

fn is_literal(value: &Value) -> bool {
    match value {
        Value::Object(_) | Value::Dyn(_) => false,
        Value::List(items) => items.iter().all(is_literal),
        Value::Map(map) => map.values().all(is_literal),
        _ => true,
    }
}

/// Metadata about a model column.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Field (and column) name.
    pub name: String,
    /// Storage type.
    pub field_type: FieldType,
    /// Whether `null` may be assigned.
    pub nullable: bool,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Whether the session assigns a value on flush when unset.
    pub auto_increment: bool,
    /// Whether values must be unique within the table.
    pub unique: bool,
    /// Foreign key reference (`table.column`).
    pub foreign_key: Option<String>,
}

impl FieldDef {
    /// Create a non-nullable column.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
            primary_key: false,
            auto_increment: false,
            unique: false,
            foreign_key: None,
        }
    }

    /// Shorthand for an auto-incrementing integer primary key.
    pub fn id(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
            .primary_key()
            .auto_increment()
    }

    /// Mark as nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Mark as primary key.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark as auto-incrementing.
    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    /// Mark as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set the foreign key reference (`table.column`).
    pub fn foreign_key(mut self, target: impl Into<String>) -> Self {
        self.foreign_key = Some(target.into());
        self
    }

    /// Check that `value` may be stored in this column of `model`.
    pub fn check(&self, model: &str, value: &Value) -> Result<()> {
        if value.is_null() {
            if self.nullable {
                return Ok(());
            }
            return Err(Error::invalid_value(
                model,
                &self.name,
                "column is not nullable",
            ));
        }
        if self.field_type.accepts(value) {
            Ok(())
        } else {
            Err(Error::invalid_value(
                model,
                &self.name,
                format!(
                    "expected {}, found {}",
                    self.field_type.as_str(),
                    value.type_name()
                ),
            ))
        }
    }
}
