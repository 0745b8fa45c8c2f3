//! Model instances created at runtime.
//!
//! A [`ModelInstance`] stores one optional value per declared field of its
//! [`ModelDef`]. Instances are shared through [`ObjectRef`] handles. The
//! reference store, the session and every referencing object see the same
//! instance.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use sqlfixture_core::{FieldDef, FieldType, ModelDef, ObjectRef, Value};
//!
//! let user = Rc::new(
//!     ModelDef::new("User", "user")
//!         .column(FieldDef::id("id"))
//!         .column(FieldDef::new("username", FieldType::Text)),
//! );
//!
//! let joey = ObjectRef::new(&user);
//! joey.set("username", Value::from("joey")).unwrap();
//!
//! assert_eq!(joey.get("username").unwrap().as_str(), Some("joey"));
//! assert!(!joey.is_set("id"));
//! ```

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::model::{FieldKind, ModelDef};
use crate::relationship::RelationshipInfo;
use crate::resolve::TYPE_MEMBER;
use crate::value::Value;

/// Field values of one model instance.
#[derive(Debug)]
pub struct ModelInstance {
    model: Rc<ModelDef>,
    /// One slot per declared field; `None` means never assigned.
    values: Vec<Option<Value>>,
}

impl ModelInstance {
    /// Create an instance with every field unset.
    pub fn new(model: Rc<ModelDef>) -> Self {
        let values = vec![None; model.fields().len()];
        Self { model, values }
    }

    /// The model definition.
    pub fn model(&self) -> &Rc<ModelDef> {
        &self.model
    }

    /// The value assigned to `field`, if any.
    pub fn get(&self, field: &str) -> Option<&Value> {
        let idx = self.model.field_index(field)?;
        self.values[idx].as_ref()
    }

    /// Whether `field` has been assigned.
    pub fn is_set(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Primary key value, if the model has one and it is set to a non-null value.
    pub fn primary_key(&self) -> Option<Value> {
        let pk = self.model.primary_key()?;
        self.get(&pk.name).filter(|v| !v.is_null()).cloned()
    }

    /// Serialize every field; unset fields become `null` and objects become their primary key.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (kind, value) in self.model.fields().iter().zip(&self.values) {
            let json = value.as_ref().map_or(serde_json::Value::Null, Value::to_json);
            map.insert(kind.name().to_string(), json);
        }
        serde_json::Value::Object(map)
    }
}

/// Shared handle to a [`ModelInstance`].
///
/// Cloning the handle shares the instance; equality is identity.
///
/// Both sides of a `back_populates` pair hold strong handles, so a linked
/// graph forms `Rc` cycles and is only freed when the process exits.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ModelInstance>>);

impl ObjectRef {
    /// Create an empty instance of `model`.
    pub fn new(model: &Rc<ModelDef>) -> Self {
        Self::from_instance(ModelInstance::new(Rc::clone(model)))
    }

    /// Wrap an existing instance.
    pub fn from_instance(instance: ModelInstance) -> Self {
        ObjectRef(Rc::new(RefCell::new(instance)))
    }

    /// Whether both handles point at the same instance.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the shared instance, stable while any handle is alive.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0).cast::<()>() as usize
    }

    /// Borrow the instance.
    pub fn borrow(&self) -> Ref<'_, ModelInstance> {
        self.0.borrow()
    }

    /// The model definition.
    pub fn model(&self) -> Rc<ModelDef> {
        Rc::clone(&self.0.borrow().model)
    }

    /// The model name.
    pub fn model_name(&self) -> String {
        self.0.borrow().model.name().to_string()
    }

    /// Read a declared field; unset fields read as `Null`.
    pub fn get(&self, field: &str) -> Result<Value> {
        let inst = self.0.borrow();
        let idx = inst
            .model
            .field_index(field)
            .ok_or_else(|| unknown_field(&inst.model, field))?;
        Ok(inst.values[idx].clone().unwrap_or(Value::Null))
    }

    /// Whether `field` has been assigned.
    pub fn is_set(&self, field: &str) -> bool {
        self.0.borrow().is_set(field)
    }

    /// Primary key value, if set.
    pub fn primary_key(&self) -> Option<Value> {
        self.0.borrow().primary_key()
    }

    /// Serialize every field.
    pub fn to_json(&self) -> serde_json::Value {
        self.0.borrow().to_json()
    }

    /// Assign a declared field.
    ///
    /// Columns must accept the value's type. Relationship fields take an
    /// instance of the target model (or `Null`) for to-one fields and a list
    /// of such instances for to-many fields. When the relationship declares
    /// `back_populates`, the inverse field on every assigned instance is
    /// updated to point back at `self`, and instances the assignment drops
    /// no longer point back at `self`.
    pub fn set(&self, field: &str, value: Value) -> Result<()> {
        let model = self.model();
        let idx = model
            .field_index(field)
            .ok_or_else(|| unknown_field(&model, field))?;

        match &model.fields()[idx] {
            FieldKind::Column(def) => {
                def.check(model.name(), &value)?;
                self.0.borrow_mut().values[idx] = Some(value);
            }
            FieldKind::Relationship(rel) => {
                check_related(model.name(), rel, &value)?;
                let related = related_objects(&value);
                let previous = self.0.borrow().values[idx]
                    .as_ref()
                    .map(related_objects)
                    .unwrap_or_default();
                self.0.borrow_mut().values[idx] = Some(value);
                if let Some(back) = &rel.back_populates {
                    let dropped = previous
                        .iter()
                        .filter(|old| !related.iter().any(|new| new.ptr_eq(old)));
                    for old in dropped {
                        old.detach_inverse(back, self)?;
                    }
                    for target in &related {
                        target.populate_inverse(back, field, self)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Point the relationship `field` of `self` back at `owner`.
    ///
    /// A to-one inverse that pointed at another instance is replaced, and
    /// that instance's `forward` field stops pointing at `self`.
    fn populate_inverse(&self, field: &str, forward: &str, owner: &ObjectRef) -> Result<()> {
        let model = self.model();
        let idx = model
            .field_index(field)
            .ok_or_else(|| unknown_field(&model, field))?;
        let Some(rel) = model.fields()[idx].as_relationship() else {
            return Err(Error::InvalidModel {
                message: format!(
                    "back_populates target `{}.{}` is not a relationship",
                    model.name(),
                    field
                ),
            });
        };

        let owner_value = Value::Object(owner.clone());
        let mut inst = self.0.borrow_mut();
        if rel.is_to_many() {
            match &mut inst.values[idx] {
                Some(Value::List(items)) => {
                    if !items.iter().any(|v| points_at(v, owner)) {
                        items.push(owner_value);
                    }
                }
                slot => *slot = Some(Value::List(vec![owner_value])),
            }
            return Ok(());
        }

        let displaced = match inst.values[idx].replace(owner_value) {
            Some(Value::Object(prev)) if !prev.ptr_eq(owner) => Some(prev),
            _ => None,
        };
        drop(inst);
        if let Some(prev) = displaced {
            prev.detach_inverse(forward, self)?;
        }
        Ok(())
    }

    /// Stop the relationship `field` of `self` from pointing at `owner`.
    ///
    /// A to-one field is cleared to `Null`; `owner` is removed from a to-many list.
    fn detach_inverse(&self, field: &str, owner: &ObjectRef) -> Result<()> {
        let model = self.model();
        let idx = model
            .field_index(field)
            .ok_or_else(|| unknown_field(&model, field))?;

        let mut inst = self.0.borrow_mut();
        match &mut inst.values[idx] {
            Some(Value::List(items)) => items.retain(|v| !points_at(v, owner)),
            slot if slot.as_ref().is_some_and(|v| points_at(v, owner)) => {
                *slot = Some(Value::Null);
            }
            _ => {}
        }
        Ok(())
    }

    /// Named member lookup used by reference paths.
    ///
    /// Declared fields resolve to their value (`Null` when unset). `__type__`
    /// yields the model name and `__table__` the table name.
    pub fn member(&self, name: &str) -> Option<Value> {
        let inst = self.0.borrow();
        match name {
            TYPE_MEMBER => Some(Value::Text(inst.model.name().to_string())),
            "__table__" => Some(Value::Text(inst.model.table_name().to_string())),
            _ => {
                let idx = inst.model.field_index(name)?;
                Some(inst.values[idx].clone().unwrap_or(Value::Null))
            }
        }
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for ObjectRef {
    /// Prints only the model name and primary key, since object graphs may be cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(inst) => match inst.primary_key() {
                Some(pk) => write!(f, "{}(pk={:?})", inst.model.name(), pk),
                None => write!(f, "{}(@{:#x})", inst.model.name(), self.addr()),
            },
            Err(_) => write!(f, "ObjectRef(<borrowed>)"),
        }
    }
}

fn unknown_field(model: &ModelDef, field: &str) -> Error {
    Error::UnknownField {
        model: model.name().to_string(),
        field: field.to_string(),
    }
}

fn check_related(model: &str, rel: &RelationshipInfo, value: &Value) -> Result<()> {
    let check_one = |v: &Value| match v {
        Value::Object(obj) if obj.model_name() == rel.target => Ok(()),
        other => Err(Error::invalid_value(
            model,
            &rel.name,
            format!(
                "expected {} instance, found {}",
                rel.target,
                other.type_name()
            ),
        )),
    };

    if rel.is_to_many() {
        match value {
            Value::List(items) => items.iter().try_for_each(check_one),
            other => Err(Error::invalid_value(
                model,
                &rel.name,
                format!(
                    "expected list of {} instances, found {}",
                    rel.target,
                    other.type_name()
                ),
            )),
        }
    } else if value.is_null() {
        Ok(())
    } else {
        check_one(value)
    }
}

fn points_at(value: &Value, obj: &ObjectRef) -> bool {
    value.as_object().is_some_and(|o| o.ptr_eq(obj))
}

fn related_objects(value: &Value) -> Vec<ObjectRef> {
    match value {
        Value::Object(obj) => vec![obj.clone()],
        Value::List(items) => items.iter().filter_map(|v| v.as_object().cloned()).collect(),
        _ => Vec::new(),
    }
}
