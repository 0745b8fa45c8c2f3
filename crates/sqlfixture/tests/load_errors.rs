mod common;

use common::{group_model, registry, user_model};
use sqlfixture::prelude::*;

fn load_err(text: &str) -> Error {
    let registry = registry();
    let mut session = MemorySession::new();
    load(&registry, &mut session, text).unwrap_err()
}

fn field_context(err: &Error) -> (&str, &str) {
    match err {
        Error::Field { model, field, .. } => (model.as_str(), field.as_str()),
        other => panic!("expected field context, got {other}"),
    }
}

#[test]
fn test_unknown_entity() {
    let err = load_err("Band:\n  - name: Ramones\n");
    assert!(matches!(err, Error::UnknownEntity { name } if name == "Band"));
}

#[test]
fn test_unknown_field_without_constructor() {
    let err = load_err("User:\n  - username: joey\n    nickname: joe\n");
    assert_eq!(field_context(&err), ("User", "nickname"));
    assert!(matches!(
        err.root(),
        Error::UnknownField { model, field } if model == "User" && field == "nickname"
    ));
}

#[test]
fn test_unknown_constructor() {
    let err = load_err("Profile:create:\n  - name: joe\n");
    assert!(matches!(
        err,
        Error::UnknownConstructor { model, name } if model == "Profile" && name == "create"
    ));
}

#[test]
fn test_literal_type_mismatch() {
    let err = load_err("User:\n  - username: 3\n");
    assert_eq!(field_context(&err), ("User", "username"));
    assert!(matches!(err.root(), Error::InvalidValue { .. }));
}

#[test]
fn test_null_in_required_column() {
    let err = load_err("User:\n  - username: null\n");
    assert!(matches!(err.root(), Error::InvalidValue { field, .. } if field == "username"));
}

#[test]
fn test_duplicate_explicit_key() {
    let err = load_err(
        r"
User:
  - __key__: joey
    username: joey
Group:
  - __key__: joey
    name: Ramones
",
    );
    assert!(err.is_duplicate_key());
    assert!(matches!(err, Error::DuplicateKey { key } if key == "joey"));
}

#[test]
fn test_reference_to_wrong_model() {
    let err = load_err(
        r"
Group:
  - __key__: ramones
    name: Ramones
Profile:
  - user: ramones
",
    );
    assert_eq!(field_context(&err), ("Profile", "user"));
    assert!(matches!(err.root(), Error::InvalidValue { .. }));
}

#[test]
fn test_eager_reference_must_be_declared_earlier() {
    let err = load_err(
        r"
Profile:with_user:
  - nickname: Joey Ramone
    the_user: {ref: joey}
User:
  - __key__: joey
    username: joey
",
    );
    assert_eq!(field_context(&err), ("Profile", "the_user"));
    assert!(err.is_key_not_found());
}

#[test]
fn test_bad_path_in_reference() {
    let err = load_err("Profile:\n  - user: joey..profile\n");
    assert!(matches!(err.root(), Error::InvalidPath { path } if path == "joey..profile"));
}

#[test]
fn test_unresolvable_path_segment() {
    let err = load_err(
        r"
User:
  - __key__: joey
    username: joey
Profile:
  - user: joey.band
",
    );
    assert!(matches!(
        err.root(),
        Error::AttributeNotFound { segment, .. } if segment == "band"
    ));
}

#[test]
fn test_ref_marker_needs_string_path() {
    let err = load_err("Profile:\n  - user: {ref: 3}\n");
    assert!(matches!(err.root(), Error::InvalidDocument { .. }));
}

#[test]
fn test_relationship_shape_errors() {
    for text in [
        "Profile:\n  - user: [joey]\n",
        "Profile:\n  - user: 3\n",
        "Profile:\n  - groups: {name: Ramones}\n",
        "Profile:\n  - groups: [ramones, {name: Fans}]\n",
        "Profile:\n  - groups: [3]\n",
    ] {
        let err = load_err(text);
        assert!(
            matches!(err.root(), Error::InvalidValue { .. }),
            "{text}: {err}"
        );
    }
}

#[test]
fn test_document_shape_errors() {
    for text in ["User: joey\n", "[1, 2]\n", "User:\n  - joey\n", "3\n"] {
        assert!(
            matches!(load_err(text), Error::InvalidDocument { .. }),
            "{text}"
        );
    }
}

#[test]
fn test_invalid_yaml() {
    assert!(matches!(load_err("User: [\n"), Error::Yaml(_)));
}

#[test]
fn test_inconsistent_registry() {
    let mut registry = ModelRegistry::new();
    registry.register(user_model()).unwrap();
    registry.register(group_model()).unwrap();
    let mut session = MemorySession::new();
    let err = load(&registry, &mut session, "User:\n  - username: joey\n").unwrap_err();
    assert!(matches!(err, Error::InvalidModel { .. }));
    assert_eq!(session.tracked_count(), 0);
}

#[test]
fn test_error_messages_name_the_field() {
    let err = load_err("Profile:\n  - user: nobody\n");
    assert_eq!(
        err.to_string(),
        "error processing Profile.user: key not found: nobody"
    );
}
