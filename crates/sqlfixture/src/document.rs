//! Fixture document parsing.
//!
//! Turns YAML text into an ordered list of sections. A document is either a
//! mapping from section header to records:
//!
//! ```yaml
//! User:
//!   - __key__: joey
//!     username: joey
//! Profile:
//!   - user: joey
//! ```
//!
//! or a sequence of single-entry mappings, which lets one entity appear in
//! several sections:
//!
//! ```yaml
//! - User:
//!     - __key__: joey
//! - Profile:
//!     - user: joey
//! - User:
//!     - __key__: dee
//! ```
//!
//! A header may name a constructor as `Entity:constructor`.

use serde_yaml::{Mapping, Value as Yaml};
use sqlfixture_core::value::yaml_key;
use sqlfixture_core::{Error, Result, validate_key};

use crate::loader::LoadOptions;

/// One record: an optional explicit key and its remaining fields in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureRecord {
    /// The explicit symbolic key, if the record has one.
    pub key: Option<String>,
    /// Field name / raw value pairs, key field removed.
    pub fields: Vec<(String, Yaml)>,
}

impl FixtureRecord {
    /// Build a record from a YAML mapping, extracting the key field.
    pub fn from_mapping(entity: &str, map: &Mapping, options: &LoadOptions) -> Result<Self> {
        let mut key = None;
        let mut fields = Vec::with_capacity(map.len());
        for (name, value) in map {
            let name = yaml_key(name)?;
            if name == options.key_field {
                let Yaml::String(k) = value else {
                    return Err(Error::InvalidDocument {
                        message: format!(
                            "`{}` of a `{}` record must be a string, found {}",
                            options.key_field,
                            entity,
                            describe(value)
                        ),
                    });
                };
                validate_key(k)?;
                key = Some(k.clone());
            } else {
                fields.push((name, value.clone()));
            }
        }
        Ok(Self { key, fields })
    }

    /// Raw value of a field.
    pub fn field(&self, name: &str) -> Option<&Yaml> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// A run of records of one entity type.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Entity-type name.
    pub entity: String,
    /// Constructor named in the header, if any.
    pub constructor: Option<String>,
    /// Records in document order.
    pub records: Vec<FixtureRecord>,
}

/// A parsed fixture document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureDocument {
    /// Sections in document order. Sections whose value is `null` are omitted.
    pub sections: Vec<Section>,
}

impl FixtureDocument {
    /// Parse fixture text.
    pub fn parse(text: &str, options: &LoadOptions) -> Result<Self> {
        let root: Yaml = serde_yaml::from_str(text)?;
        let mut sections = Vec::new();

        match root {
            // Empty document
            Yaml::Null => {}
            Yaml::Mapping(map) => {
                for (header, body) in &map {
                    push_section(&mut sections, &yaml_key(header)?, body, options)?;
                }
            }
            Yaml::Sequence(items) => {
                for (idx, item) in items.iter().enumerate() {
                    let entry = match item {
                        Yaml::Mapping(map) if map.len() == 1 => map.iter().next(),
                        _ => None,
                    };
                    let Some((header, body)) = entry else {
                        return Err(Error::InvalidDocument {
                            message: format!(
                                "item {} of the top-level sequence must be a single-entry mapping, found {}",
                                idx,
                                describe(item)
                            ),
                        });
                    };
                    push_section(&mut sections, &yaml_key(header)?, body, options)?;
                }
            }
            other => {
                return Err(Error::InvalidDocument {
                    message: format!(
                        "top level must be a mapping or a sequence, found {}",
                        describe(&other)
                    ),
                });
            }
        }

        Ok(Self { sections })
    }

    /// Total number of top-level records.
    pub fn record_count(&self) -> usize {
        self.sections.iter().map(|s| s.records.len()).sum()
    }
}

fn push_section(
    sections: &mut Vec<Section>,
    header: &str,
    body: &Yaml,
    options: &LoadOptions,
) -> Result<()> {
    let (entity, constructor) = parse_header(header)?;

    let items = match body {
        Yaml::Null => return Ok(()),
        Yaml::Sequence(items) => items,
        other => {
            return Err(Error::InvalidDocument {
                message: format!(
                    "section `{}` must be a sequence of records, found {}",
                    header,
                    describe(other)
                ),
            });
        }
    };

    let mut records = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let Yaml::Mapping(map) = item else {
            return Err(Error::InvalidDocument {
                message: format!(
                    "record {} of section `{}` must be a mapping, found {}",
                    idx,
                    header,
                    describe(item)
                ),
            });
        };
        records.push(FixtureRecord::from_mapping(&entity, map, options)?);
    }

    sections.push(Section {
        entity,
        constructor,
        records,
    });
    Ok(())
}

/// Split `Entity` or `Entity:constructor`.
fn parse_header(header: &str) -> Result<(String, Option<String>)> {
    let (entity, constructor) = match header.split_once(':') {
        Some((entity, ctor)) => (entity.trim(), Some(ctor.trim())),
        None => (header.trim(), None),
    };
    if entity.is_empty() || constructor.is_some_and(str::is_empty) {
        return Err(Error::InvalidDocument {
            message: format!("malformed section header `{header}`"),
        });
    }
    Ok((entity.to_string(), constructor.map(str::to_string)))
}

/// Short description of a YAML node for error messages.
pub(crate) fn describe(node: &Yaml) -> &'static str {
    match node {
        Yaml::Null => "null",
        Yaml::Bool(_) => "a boolean",
        Yaml::Number(_) => "a number",
        Yaml::String(_) => "a string",
        Yaml::Sequence(_) => "a sequence",
        Yaml::Mapping(_) => "a mapping",
        Yaml::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<FixtureDocument> {
        FixtureDocument::parse(text, &LoadOptions::default())
    }

    #[test]
    fn test_parse_mapping_document() {
        let doc = parse(
            r"
User:
  - __key__: joey
    username: joey
    email: joey@example.com
  - username: dee
Profile:
  - user: joey
",
        )
        .unwrap();

        assert_eq!(doc.sections.len(), 2);
        assert_eq!(doc.record_count(), 3);
        let users = &doc.sections[0];
        assert_eq!(users.entity, "User");
        assert_eq!(users.constructor, None);
        assert_eq!(users.records[0].key.as_deref(), Some("joey"));
        assert_eq!(
            users.records[0]
                .fields
                .iter()
                .map(|(n, _)| n.as_str())
                .collect::<Vec<_>>(),
            vec!["username", "email"]
        );
        assert_eq!(users.records[1].key, None);
        assert_eq!(
            doc.sections[1].records[0].field("user"),
            Some(&Yaml::String("joey".to_string()))
        );
    }

    #[test]
    fn test_parse_sequence_document_repeats_entities() {
        let doc = parse(
            r"
- User:
    - __key__: joey
- Profile:
    - user: joey
- User:
    - __key__: dee
",
        )
        .unwrap();
        let entities: Vec<&str> = doc.sections.iter().map(|s| s.entity.as_str()).collect();
        assert_eq!(entities, vec!["User", "Profile", "User"]);
    }

    #[test]
    fn test_constructor_header() {
        let doc = parse("Profile:with_nickname:\n  - nickname: joe\n").unwrap();
        assert_eq!(doc.sections[0].entity, "Profile");
        assert_eq!(doc.sections[0].constructor.as_deref(), Some("with_nickname"));
    }

    #[test]
    fn test_null_section_is_skipped() {
        let doc = parse("User:\nProfile:\n  - nickname: joe\n").unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].entity, "Profile");
    }

    #[test]
    fn test_empty_document() {
        assert!(parse("").unwrap().sections.is_empty());
    }

    #[test]
    fn test_custom_key_field() {
        let options = LoadOptions::default().with_key_field("_id");
        let doc =
            FixtureDocument::parse("User:\n  - _id: joey\n    __key__: x\n", &options).unwrap();
        let record = &doc.sections[0].records[0];
        assert_eq!(record.key.as_deref(), Some("joey"));
        assert!(record.field("__key__").is_some());
    }

    #[test]
    fn test_shape_errors() {
        let cases = [
            "42",
            "User: joey",
            "User:\n  - joey",
            "- User: []\n  Profile: []",
            "- 3",
            "':ctor':\n  - {}",
            "'User:':\n  - {}",
            "User:\n  - [1, 2]",
        ];
        for text in cases {
            assert!(
                matches!(parse(text), Err(Error::InvalidDocument { .. })),
                "{text}"
            );
        }
    }

    #[test]
    fn test_invalid_explicit_key() {
        assert!(matches!(
            parse("User:\n  - __key__: joey.ramone\n"),
            Err(Error::InvalidKey { key }) if key == "joey.ramone"
        ));
        assert!(matches!(
            parse("User:\n  - __key__: 3\n"),
            Err(Error::InvalidDocument { .. })
        ));
    }

    #[test]
    fn test_yaml_syntax_error() {
        assert!(matches!(parse("User: [\n"), Err(Error::Yaml(_))));
    }
}
