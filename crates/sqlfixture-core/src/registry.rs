//! Registry mapping entity-type names to model definitions.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, Result};
use crate::model::ModelDef;

/// Models known to a fixture load, keyed by name.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    models: HashMap<String, Rc<ModelDef>>,
    order: Vec<String>,
}

impl ModelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model definition.
    ///
    /// Fails if the model declares a field twice or its name is taken.
    pub fn register(&mut self, model: ModelDef) -> Result<Rc<ModelDef>> {
        if let Some(dup) = model.duplicate_fields().first() {
            return Err(Error::InvalidModel {
                message: format!("model `{}` declares field `{}` twice", model.name(), dup),
            });
        }
        if self.models.contains_key(model.name()) {
            return Err(Error::InvalidModel {
                message: format!("model `{}` is already registered", model.name()),
            });
        }

        let name = model.name().to_string();
        let model = Rc::new(model);
        tracing::debug!(model = %name, table = model.table_name(), "Registering model");
        self.models.insert(name.clone(), Rc::clone(&model));
        self.order.push(name);
        Ok(model)
    }

    /// Builder form of [`register`](Self::register).
    pub fn with(mut self, model: ModelDef) -> Result<Self> {
        self.register(model)?;
        Ok(self)
    }

    /// Look up a model by name.
    pub fn get(&self, name: &str) -> Option<&Rc<ModelDef>> {
        self.models.get(name)
    }

    /// Look up a model by name, failing with `UnknownEntity`.
    pub fn resolve(&self, name: &str) -> Result<Rc<ModelDef>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownEntity {
                name: name.to_string(),
            })
    }

    /// Whether a model is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    /// Model names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Check relationship metadata across models.
    ///
    /// Every relationship target must be registered. A `back_populates` must
    /// name a relationship on the target that points back at the declaring
    /// model. A `local_key` must name a column of the declaring model.
    pub fn validate(&self) -> Result<()> {
        for name in &self.order {
            let model = &self.models[name];
            for rel in model.relationships() {
                let target = self.get(&rel.target).ok_or_else(|| Error::InvalidModel {
                    message: format!(
                        "relationship `{}.{}` targets unknown model `{}`",
                        name, rel.name, rel.target
                    ),
                })?;

                if let Some(back) = &rel.back_populates {
                    let points_back = target
                        .relationship_info(back)
                        .is_some_and(|inverse| inverse.target == *name);
                    if !points_back {
                        return Err(Error::InvalidModel {
                            message: format!(
                                "`{}.{}` back-populates `{}.{}`, which is not a relationship to `{}`",
                                name, rel.name, rel.target, back, name
                            ),
                        });
                    }
                }

                if let Some(local) = &rel.local_key {
                    let is_column = model
                        .descriptor(local)
                        .is_some_and(|d| d.as_column().is_some());
                    if rel.is_to_many() || !is_column {
                        return Err(Error::InvalidModel {
                            message: format!(
                                "`{}.{}` local key `{}` must be a column of a to-one relationship",
                                name, rel.name, local
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldDef, FieldType};
    use crate::relationship::RelationshipInfo;

    fn user() -> ModelDef {
        ModelDef::new("User", "user")
            .column(FieldDef::id("id"))
            .column(FieldDef::new("username", FieldType::Text))
            .relationship(RelationshipInfo::one_to_one("profile", "Profile").back_populates("user"))
    }

    fn profile() -> ModelDef {
        ModelDef::new("Profile", "profile")
            .column(FieldDef::id("id"))
            .column(FieldDef::new("user_id", FieldType::Integer).foreign_key("user.id"))
            .relationship(
                RelationshipInfo::many_to_one("user", "User")
                    .local_key("user_id")
                    .back_populates("profile"),
            )
    }

    #[test]
    fn test_register_and_resolve() {
        let registry = ModelRegistry::new().with(user()).unwrap();
        assert!(registry.contains("User"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.resolve("User").unwrap().table_name(), "user");
        assert!(matches!(
            registry.resolve("Band"),
            Err(Error::UnknownEntity { name }) if name == "Band"
        ));
    }

    #[test]
    fn test_register_twice_fails() {
        let mut registry = ModelRegistry::new();
        registry.register(user()).unwrap();
        assert!(matches!(
            registry.register(user()),
            Err(Error::InvalidModel { .. })
        ));
    }

    #[test]
    fn test_register_rejects_duplicate_fields() {
        let model = ModelDef::new("User", "user")
            .column(FieldDef::new("name", FieldType::Text))
            .relationship(RelationshipInfo::many_to_one("name", "User"));
        let err = ModelRegistry::new().register(model).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid model definition: model `User` declares field `name` twice"
        );
    }

    #[test]
    fn test_names_keep_registration_order() {
        let registry = ModelRegistry::new()
            .with(profile())
            .unwrap()
            .with(user())
            .unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Profile", "User"]);
    }

    #[test]
    fn test_validate_consistent_models() {
        let registry = ModelRegistry::new()
            .with(user())
            .unwrap()
            .with(profile())
            .unwrap();
        registry.validate().unwrap();
    }

    #[test]
    fn test_validate_unknown_target() {
        let registry = ModelRegistry::new().with(profile()).unwrap();
        assert!(matches!(
            registry.validate(),
            Err(Error::InvalidModel { .. })
        ));
    }

    #[test]
    fn test_validate_back_populates_must_point_back() {
        let broken = ModelDef::new("User", "user")
            .column(FieldDef::new("username", FieldType::Text))
            .relationship(
                RelationshipInfo::one_to_one("profile", "Profile").back_populates("owner"),
            );
        let registry = ModelRegistry::new()
            .with(broken)
            .unwrap()
            .with(profile())
            .unwrap();
        let err = registry.validate().unwrap_err();
        assert!(err.to_string().contains("back-populates `Profile.owner`"));
    }

    #[test]
    fn test_validate_local_key_must_be_column() {
        let broken = ModelDef::new("Profile", "profile")
            .relationship(RelationshipInfo::many_to_one("user", "User").local_key("user_id"));
        let registry = ModelRegistry::new()
            .with(ModelDef::new("User", "user"))
            .unwrap()
            .with(broken)
            .unwrap();
        assert!(registry.validate().is_err());
    }
}
