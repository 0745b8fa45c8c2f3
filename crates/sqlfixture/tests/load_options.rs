mod common;

use common::registry;
use sqlfixture::prelude::*;

#[test]
fn test_synthesized_keys() {
    let registry = registry();
    let mut session = MemorySession::new();
    let report = FixtureLoader::new(&registry)
        .load(
            &mut session,
            r"
- User:
    - username: joey
    - __key__: dee
      username: deedee
- Group:
    - name: Ramones
- User:
    - username: tommy
",
        )
        .unwrap();

    let store = &report.store;
    assert_eq!(
        store.keys().collect::<Vec<_>>(),
        vec!["User#0", "dee", "Group#0", "User#2"]
    );
    assert_eq!(store.get("User#0.username").unwrap(), Value::from("joey"));
    assert_eq!(store.get("User#2.username").unwrap(), Value::from("tommy"));
}

#[test]
fn test_forward_reference_through_synthesized_key() {
    let registry = registry();
    let mut session = MemorySession::new();
    load(
        &registry,
        &mut session,
        r"
Profile:
  - user: User#0
User:
  - username: joey
",
    )
    .unwrap();

    let user = session.query("Profile")[0].get("user").unwrap();
    assert!(user.as_object().unwrap().ptr_eq(&session.query("User")[0]));
}

#[test]
fn test_without_synthesized_keys() {
    let registry = registry();
    let mut session = MemorySession::new();
    let loader = FixtureLoader::new(&registry)
        .with_options(LoadOptions::default().with_synthesized_keys(false));
    assert!(!loader.options().synthesize_keys);

    let report = loader
        .load(&mut session, "User:\n  - username: joey\n  - __key__: dee\n    username: dee\n")
        .unwrap();
    assert_eq!(report.store.keys().collect::<Vec<_>>(), vec!["dee"]);
    assert_eq!(session.query("User").len(), 2);

    let mut session = MemorySession::new();
    let err = loader
        .load(&mut session, "Profile:\n  - user: User#0\nUser:\n  - username: joey\n")
        .unwrap_err();
    assert!(err.is_key_not_found());
}

#[test]
fn test_custom_markers() {
    let registry = registry();
    let mut session = MemorySession::new();
    let options = LoadOptions::default()
        .with_key_field("_id")
        .with_ref_marker("$ref");
    let report = FixtureLoader::new(&registry)
        .with_options(options)
        .load(
            &mut session,
            r"
User:
  - _id: joey
    id: 9
    username: joey
Profile:
  - user: {$ref: joey}
    user_id: {$ref: joey.id}
",
        )
        .unwrap();

    assert!(report.store.contains("joey"));
    let profile = &session.query("Profile")[0];
    assert_eq!(profile.get("user_id").unwrap(), Value::Int(9));
    let user = profile.get("user").unwrap();
    assert!(user.as_object().unwrap().ptr_eq(&session.query("User")[0]));
    assert_eq!(report.resolved, 2);
}

#[test]
fn test_default_marker_is_plain_data_with_custom_marker() {
    let registry = registry();
    let mut session = MemorySession::new();
    let err = FixtureLoader::new(&registry)
        .with_options(LoadOptions::default().with_ref_marker("$ref"))
        .load(&mut session, "Profile:\n  - user_id: {ref: joey}\n")
        .unwrap_err();
    assert!(matches!(err.root(), Error::InvalidValue { field, .. } if field == "user_id"));
}

#[test]
fn test_user_value_in_store() {
    #[derive(Debug)]
    struct Band;

    impl Resolve for Band {
        fn type_name(&self) -> String {
            "Band".to_string()
        }

        fn member(&self, name: &str) -> Option<Value> {
            match name {
                "__type__" => Some(Value::from("Band")),
                "members" => Some(Value::Int(4)),
                _ => None,
            }
        }
    }

    let mut store = Store::new();
    store.put("ramones", Value::Dyn(std::rc::Rc::new(Band))).unwrap();
    assert_eq!(store.get("ramones.members").unwrap(), Value::Int(4));
    assert_eq!(store.get("ramones.members.__type__").unwrap(), Value::from("int"));
    assert!(store.put("ramones", 1).unwrap_err().is_duplicate_key());
}
