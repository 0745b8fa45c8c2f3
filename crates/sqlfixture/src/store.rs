//! Reference store: symbolic key → realized value.
//!
//! Keys are write-once. Lookups accept dotted paths whose first segment is a
//! key and whose later segments are member accesses resolved through
//! [`Resolve`].

use std::collections::HashMap;

use sqlfixture_core::{Error, Resolve, Result, Value, split_path};

/// Write-once map from symbolic key to value.
#[derive(Debug, Default)]
pub struct Store {
    entries: HashMap<String, Value>,
    order: Vec<String>,
}

impl Store {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` under `key`.
    ///
    /// Fails with `InvalidKey` if `get` could never return the entry, which
    /// is the case for the empty key and for keys containing `.`. Fails with
    /// `DuplicateKey` if `key` is taken; the first value stays.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if !matches!(split_path(&key), Ok((_, rest)) if rest.is_empty()) {
            return Err(Error::InvalidKey { key });
        }
        if self.entries.contains_key(&key) {
            return Err(Error::DuplicateKey { key });
        }
        self.entries.insert(key.clone(), value.into());
        self.order.push(key);
        Ok(())
    }

    /// Resolve a dotted path.
    ///
    /// `joey` returns the value under `joey`; `joey.profile.nickname` walks
    /// the `profile` member of that value and then its `nickname` member.
    pub fn get(&self, path: &str) -> Result<Value> {
        let (head, segments) = split_path(path)?;
        let mut current = self
            .entries
            .get(head)
            .cloned()
            .ok_or_else(|| Error::KeyNotFound {
                key: head.to_string(),
            })?;

        for segment in segments {
            current = current
                .member(segment)
                .ok_or_else(|| Error::AttributeNotFound {
                    path: path.to_string(),
                    segment: segment.to_string(),
                    type_name: current.type_name(),
                })?;
        }
        Ok(current)
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::rc::Rc;

    #[derive(Debug)]
    struct Foo {
        bar: i64,
    }

    impl Resolve for Foo {
        fn type_name(&self) -> String {
            "Foo".to_string()
        }

        fn member(&self, name: &str) -> Option<Value> {
            match name {
                "__type__" => Some(Value::Text(self.type_name())),
                "bar" => Some(Value::Int(self.bar)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_put_then_get() {
        let mut store = Store::new();
        store.put("foo", "bar").unwrap();
        assert_eq!(store.get("foo").unwrap(), Value::from("bar"));
        assert!(store.contains("foo"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_missing_key() {
        let store = Store::new();
        assert!(matches!(
            store.get("foo"),
            Err(Error::KeyNotFound { key }) if key == "foo"
        ));
    }

    #[test]
    fn test_duplicate_put_keeps_first_value() {
        let mut store = Store::new();
        store.put("foo", "bar").unwrap();
        let err = store.put("foo", "second").unwrap_err();
        assert!(matches!(err, Error::DuplicateKey { key } if key == "foo"));
        assert_eq!(store.get("foo").unwrap(), Value::from("bar"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_put_rejects_unaddressable_keys() {
        let mut store = Store::new();
        for key in ["a.b", "", "a."] {
            assert!(matches!(
                store.put(key, 1),
                Err(Error::InvalidKey { key: k }) if k == key
            ));
        }
        assert!(store.is_empty());

        store.put("User#0", 3).unwrap();
        assert_eq!(store.get("User#0").unwrap(), Value::Int(3));
    }

    #[test]
    fn test_get_attribute_of_user_type() {
        let mut store = Store::new();
        store.put("foo", Value::Dyn(Rc::new(Foo { bar: 52 }))).unwrap();
        assert_eq!(store.get("foo.bar").unwrap(), Value::Int(52));
        assert_eq!(store.get("foo.__type__").unwrap(), Value::from("Foo"));
        assert_eq!(store.get("foo.bar.__type__").unwrap(), Value::from("int"));
    }

    #[test]
    fn test_get_walks_maps_and_lists() {
        let mut map = BTreeMap::new();
        map.insert(
            "names".to_string(),
            Value::List(vec![Value::from("joey"), Value::from("dee")]),
        );
        let mut store = Store::new();
        store.put("band", Value::Map(map)).unwrap();

        assert_eq!(store.get("band.names.1").unwrap(), Value::from("dee"));
        assert_eq!(store.get("band.names.len").unwrap(), Value::Int(2));
        assert_eq!(store.get("band.names.first.upper").unwrap(), Value::from("JOEY"));
    }

    #[test]
    fn test_get_unresolvable_segment() {
        let mut store = Store::new();
        store.put("foo", 3).unwrap();
        let err = store.get("foo.bar.baz").unwrap_err();
        match err {
            Error::AttributeNotFound {
                path,
                segment,
                type_name,
            } => {
                assert_eq!(path, "foo.bar.baz");
                assert_eq!(segment, "bar");
                assert_eq!(type_name, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_get_rejects_empty_segments() {
        let mut store = Store::new();
        store.put("a", 1).unwrap();
        for path in ["", "a..b", "a."] {
            assert!(matches!(store.get(path), Err(Error::InvalidPath { .. })));
        }
    }

    #[test]
    fn test_keys_in_insertion_order() {
        let mut store = Store::new();
        store.put("zeta", 1).unwrap();
        store.put("alpha", 2).unwrap();
        assert_eq!(store.keys().collect::<Vec<_>>(), vec!["zeta", "alpha"]);
        assert!(!store.is_empty());
    }
}
