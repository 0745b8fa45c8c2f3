//! Sample schema shared by the integration tests.

#![allow(dead_code)]

use sqlfixture::prelude::*;

pub fn user_model() -> ModelDef {
    ModelDef::new("User", "user")
        .column(FieldDef::id("id"))
        .column(FieldDef::new("username", FieldType::Text).unique())
        .column(FieldDef::new("email", FieldType::Text).nullable())
        .relationship(RelationshipInfo::one_to_one("profile", "Profile").back_populates("user"))
}

/// `with_user` takes `nickname` and `the_user` instead of the mapped fields.
pub fn profile_model() -> ModelDef {
    ModelDef::new("Profile", "profile")
        .column(FieldDef::id("id"))
        .column(
            FieldDef::new("user_id", FieldType::Integer)
                .nullable()
                .foreign_key("user.id"),
        )
        .column(FieldDef::new("name", FieldType::Text).nullable())
        .relationship(
            RelationshipInfo::many_to_one("user", "User")
                .local_key("user_id")
                .back_populates("profile"),
        )
        .relationship(RelationshipInfo::many_to_many("groups", "Group").back_populates("members"))
        .constructor("with_user", |model, mut kwargs| {
            let obj = ObjectRef::new(model);
            if let Some(nickname) = kwargs.take("nickname") {
                obj.set("name", nickname)?;
            }
            if let Some(user) = kwargs.take("the_user") {
                obj.set("user", user)?;
            }
            for (field, value) in kwargs {
                obj.set(&field, value)?;
            }
            Ok(obj)
        })
}

pub fn group_model() -> ModelDef {
    ModelDef::new("Group", "group")
        .column(FieldDef::id("id"))
        .column(FieldDef::new("name", FieldType::Text))
        .relationship(RelationshipInfo::many_to_many("members", "Profile").back_populates("groups"))
}

pub fn registry() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    registry.register(user_model()).unwrap();
    registry.register(profile_model()).unwrap();
    registry.register(group_model()).unwrap();
    registry
}

/// Mixed sections, nested records, reference lists and constructor parameters.
pub const RAMONES: &str = r"
- User:
    - __key__: joey
      username: joey
      email: joey@example.com
    - __key__: dee_dee
      username: deedee
      profile:
        __key__: dee_dee_profile
        name: Dee Dee Ramone
- Profile:with_user:
    - __key__: joey_profile
      nickname: Joey Ramone
      the_user: {ref: joey}
- Group:
    - __key__: ramones
      name: Ramones
      members: [joey_profile, dee_dee_profile, tommy.profile]
    - name: Sex Pistols
- User:
    - __key__: tommy
      username: tommy
      profile:
        name: Tommy Ramone
";

pub fn names(objects: &[ObjectRef], field: &str) -> Vec<String> {
    objects
        .iter()
        .map(|o| o.get(field).unwrap().as_str().unwrap_or_default().to_string())
        .collect()
}
