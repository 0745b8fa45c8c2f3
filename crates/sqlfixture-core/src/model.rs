//! Model definitions and their field descriptor tables.
//!
//! A [`ModelDef`] is the runtime counterpart of a mapped class. It declares
//! columns and relationships in order and can register named constructors.
//! The descriptor table (`field name → FieldKind`) is built as fields are
//! declared. The loader consults it to classify every fixture field.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::field::FieldDef;
use crate::instance::ObjectRef;
use crate::relationship::RelationshipInfo;
use crate::resolve::Resolve;
use crate::value::Value;

/// Constructor name used when a section header does not name one.
pub const DEFAULT_CONSTRUCTOR: &str = "from_fixture";

/// A constructor builds an instance from keyword arguments.
///
/// Constructors receive every literal fixture field plus any parameter that is
/// not a declared field. They are responsible for mapping parameters onto fields.
pub type Constructor = Rc<dyn Fn(&Rc<ModelDef>, Kwargs) -> Result<ObjectRef>>;

/// What a declared field is.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// A literal-valued column.
    Column(FieldDef),
    /// A field holding other model instances.
    Relationship(RelationshipInfo),
}

impl FieldKind {
    /// The declared field name.
    pub fn name(&self) -> &str {
        match self {
            FieldKind::Column(def) => &def.name,
            FieldKind::Relationship(rel) => &rel.name,
        }
    }

    /// The column definition, if this is a column.
    pub fn as_column(&self) -> Option<&FieldDef> {
        match self {
            FieldKind::Column(def) => Some(def),
            FieldKind::Relationship(_) => None,
        }
    }

    /// The relationship metadata, if this is a relationship.
    pub fn as_relationship(&self) -> Option<&RelationshipInfo> {
        match self {
            FieldKind::Relationship(rel) => Some(rel),
            FieldKind::Column(_) => None,
        }
    }
}

/// A mapped model definition.
pub struct ModelDef {
    name: String,
    table_name: String,
    fields: Vec<FieldKind>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
    constructors: HashMap<String, Constructor>,
}

impl ModelDef {
    /// Start a model definition bound to `table_name`.
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            fields: Vec::new(),
            index: HashMap::new(),
            duplicates: Vec::new(),
            constructors: HashMap::new(),
        }
    }

    /// Declare a column.
    pub fn column(self, field: FieldDef) -> Self {
        self.declare(FieldKind::Column(field))
    }

    /// Declare a relationship.
    pub fn relationship(self, rel: RelationshipInfo) -> Self {
        self.declare(FieldKind::Relationship(rel))
    }

    /// Register a named constructor.
    ///
    /// A constructor named [`DEFAULT_CONSTRUCTOR`] replaces the default one.
    pub fn constructor<F>(mut self, name: impl Into<String>, ctor: F) -> Self
    where
        F: Fn(&Rc<ModelDef>, Kwargs) -> Result<ObjectRef> + 'static,
    {
        self.constructors.insert(name.into(), Rc::new(ctor));
        self
    }

    fn declare(mut self, kind: FieldKind) -> Self {
        let name = kind.name().to_string();
        if self.index.contains_key(&name) {
            self.duplicates.push(name);
        } else {
            self.index.insert(name, self.fields.len());
        }
        self.fields.push(kind);
        self
    }

    /// Model name, as used in fixture section headers.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Table name.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Declared fields in declaration order.
    pub fn fields(&self) -> &[FieldKind] {
        &self.fields
    }

    /// Look up the descriptor for a field.
    pub fn descriptor(&self, field: &str) -> Option<&FieldKind> {
        self.index.get(field).map(|&idx| &self.fields[idx])
    }

    /// Position of a field in [`fields`](Self::fields).
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.index.get(field).copied()
    }

    /// Look up a relationship by field name.
    pub fn relationship_info(&self, field: &str) -> Option<&RelationshipInfo> {
        self.descriptor(field).and_then(FieldKind::as_relationship)
    }

    /// Iterate over the relationships.
    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipInfo> {
        self.fields.iter().filter_map(FieldKind::as_relationship)
    }

    /// Iterate over the columns.
    pub fn columns(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter_map(FieldKind::as_column)
    }

    /// The primary key column, if any.
    pub fn primary_key(&self) -> Option<&FieldDef> {
        self.columns().find(|c| c.primary_key)
    }

    /// Field names declared more than once.
    pub fn duplicate_fields(&self) -> &[String] {
        &self.duplicates
    }

    /// Look up a named constructor.
    pub fn constructor_named(&self, name: &str) -> Option<&Constructor> {
        self.constructors.get(name)
    }

    /// Build an instance with the constructor called `name`.
    ///
    /// `None` selects [`DEFAULT_CONSTRUCTOR`] when registered, otherwise the
    /// built-in constructor that assigns every keyword argument as a field.
    pub fn construct(self: &Rc<Self>, name: Option<&str>, kwargs: Kwargs) -> Result<ObjectRef> {
        let ctor = match name {
            Some(name) => Some(self.constructors.get(name).ok_or_else(|| {
                Error::UnknownConstructor {
                    model: self.name.clone(),
                    name: name.to_string(),
                }
            })?),
            None => self.constructors.get(DEFAULT_CONSTRUCTOR),
        };
        match ctor {
            Some(ctor) => ctor(self, kwargs),
            None => Self::construct_default(self, kwargs),
        }
    }

    /// The built-in constructor: a fresh instance with every argument assigned.
    pub fn construct_default(model: &Rc<Self>, kwargs: Kwargs) -> Result<ObjectRef> {
        let obj = ObjectRef::new(model);
        for (name, value) in kwargs {
            obj.set(&name, value)?;
        }
        Ok(obj)
    }
}

impl fmt::Debug for ModelDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ctors: Vec<&String> = self.constructors.keys().collect();
        ctors.sort();
        f.debug_struct("ModelDef")
            .field("name", &self.name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .field("constructors", &ctors)
            .finish_non_exhaustive()
    }
}

impl Resolve for ModelDef {
    fn type_name(&self) -> String {
        "model".to_string()
    }

    fn member(&self, name: &str) -> Option<Value> {
        match name {
            "__type__" => Some(Value::Text(self.type_name())),
            "name" => Some(Value::Text(self.name.clone())),
            "table" => Some(Value::Text(self.table_name.clone())),
            "fields" => Some(Value::List(
                self.fields
                    .iter()
                    .map(|f| Value::Text(f.name().to_string()))
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// Ordered keyword arguments passed to a constructor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwargs {
    entries: Vec<(String, Value)>,
}

impl Kwargs {
    /// Empty argument list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an argument, replacing an earlier one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value.into());
        self
    }

    /// Borrow an argument.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Remove and return an argument.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(n, _)| n == name)?;
        Some(self.entries.remove(pos).1)
    }

    /// Whether an argument is present.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Argument names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Number of arguments.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no arguments.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over arguments in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl IntoIterator for Kwargs {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
