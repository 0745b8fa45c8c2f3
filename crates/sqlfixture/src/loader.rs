//! Two-pass fixture loader.
//!
//! The first pass walks sections and records in document order. Each record
//! is built from its literal fields, registered in the [`Store`] under its
//! symbolic key and added to the session. Fields that reference other records
//! are queued as deferred fields instead of being assigned.
//!
//! The second pass resolves every deferred field through the store, in the
//! order the fields were recorded. Every record already has a key by then,
//! so a record may reference one declared further down the document.
//!
//! The loader never flushes or commits; that stays with the session's owner.

use std::collections::HashMap;
use std::rc::Rc;

use serde_yaml::Value as Yaml;
use sqlfixture_core::{
    DEFAULT_CONSTRUCTOR, Error, FieldKind, Kwargs, ModelDef, ModelRegistry, ObjectRef,
    RelationshipInfo, Result, Value, is_synthesized_key, split_path, synthesized_key,
};
use sqlfixture_session::Session;

use crate::document::{FixtureDocument, FixtureRecord, describe};
use crate::store::Store;

// ============================================================================
// Options and Report
// ============================================================================

/// Loader configuration.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Field holding a record's explicit symbolic key.
    pub key_field: String,
    /// Key of the single-entry mapping that marks a reference, as in `{ref: joey.id}`.
    pub ref_marker: String,
    /// Whether records without an explicit key get a synthesized `Entity#n` key.
    pub synthesize_keys: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            key_field: "__key__".to_string(),
            ref_marker: "ref".to_string(),
            synthesize_keys: true,
        }
    }
}

impl LoadOptions {
    /// Set the key field name.
    pub fn with_key_field(mut self, name: impl Into<String>) -> Self {
        self.key_field = name.into();
        self
    }

    /// Set the reference marker.
    pub fn with_ref_marker(mut self, marker: impl Into<String>) -> Self {
        self.ref_marker = marker.into();
        self
    }

    /// Enable or disable synthesized keys.
    pub fn with_synthesized_keys(mut self, enabled: bool) -> Self {
        self.synthesize_keys = enabled;
        self
    }
}

/// Outcome of a successful load.
#[derive(Debug)]
pub struct LoadReport {
    /// Every registered record, by symbolic key.
    pub store: Store,
    /// Objects created per entity, in first-seen order. Nested records count.
    pub counts: Vec<(String, usize)>,
    /// Number of deferred fields resolved in the second pass.
    pub resolved: usize,
}

impl LoadReport {
    /// Objects created for `entity`.
    pub fn count(&self, entity: &str) -> usize {
        self.counts
            .iter()
            .find(|(name, _)| name == entity)
            .map_or(0, |(_, n)| *n)
    }

    /// Objects created in total.
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

// ============================================================================
// Deferred Fields
// ============================================================================

/// Reference expression of a deferred field.
#[derive(Debug, Clone, PartialEq)]
enum Reference {
    /// One path, resolving to one value.
    One(String),
    /// Several paths, resolving to a list.
    Many(Vec<String>),
}

impl Reference {
    fn paths(&self) -> &[String] {
        match self {
            Reference::One(path) => std::slice::from_ref(path),
            Reference::Many(paths) => paths,
        }
    }
}

#[derive(Debug)]
struct DeferredField {
    target: ObjectRef,
    field: String,
    reference: Reference,
}

/// Records nested under a relationship field.
enum Nested {
    One(FixtureRecord),
    Many(Vec<FixtureRecord>),
}

/// How one record field was classified.
enum Classified {
    Literal(Value),
    Deferred(Reference),
    Nested(Nested),
    Skip,
}

// ============================================================================
// FixtureLoader
// ============================================================================

/// Loads fixture documents against a model registry.
#[derive(Debug)]
pub struct FixtureLoader<'r> {
    registry: &'r ModelRegistry,
    options: LoadOptions,
}

impl<'r> FixtureLoader<'r> {
    /// Create a loader with default options.
    pub fn new(registry: &'r ModelRegistry) -> Self {
        Self {
            registry,
            options: LoadOptions::default(),
        }
    }

    /// Replace the options.
    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    /// The active options.
    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Load `text` into `session`.
    ///
    /// On error the session may hold some of the document's objects; the
    /// caller should discard it.
    #[tracing::instrument(level = "debug", skip(self, session, text))]
    pub fn load<S: Session + ?Sized>(&self, session: &mut S, text: &str) -> Result<LoadReport> {
        let start = std::time::Instant::now();
        self.registry.validate()?;
        let document = FixtureDocument::parse(text, &self.options)?;

        tracing::info!(
            sections = document.sections.len(),
            records = document.record_count(),
            "Loading fixtures"
        );

        let mut run = LoadRun::new(self.registry, &self.options);
        for section in document.sections {
            let model = self.registry.resolve(&section.entity)?;
            for record in section.records {
                let ordinal = run.next_ordinal(model.name());
                let key = match &record.key {
                    Some(key) => Some(key.clone()),
                    None if self.options.synthesize_keys => {
                        Some(synthesized_key(model.name(), ordinal))
                    }
                    None => None,
                };
                run.build(&model, section.constructor.as_deref(), record, key, session)?;
            }
        }

        let resolved = run.resolve_deferred()?;

        tracing::info!(
            objects = run.counts.iter().map(|(_, n)| n).sum::<usize>(),
            keys = run.store.len(),
            resolved,
            elapsed_ms = start.elapsed().as_millis(),
            "Fixtures loaded"
        );

        Ok(LoadReport {
            store: run.store,
            counts: run.counts,
            resolved,
        })
    }
}

/// Load `text` into `session` with default options.
pub fn load<S: Session + ?Sized>(
    registry: &ModelRegistry,
    session: &mut S,
    text: &str,
) -> Result<()> {
    FixtureLoader::new(registry).load(session, text).map(|_| ())
}

// ============================================================================
// Load Run
// ============================================================================

/// State of one load.
struct LoadRun<'a> {
    registry: &'a ModelRegistry,
    options: &'a LoadOptions,
    store: Store,
    deferred: Vec<DeferredField>,
    counts: Vec<(String, usize)>,
    ordinals: HashMap<String, usize>,
}

impl<'a> LoadRun<'a> {
    fn new(registry: &'a ModelRegistry, options: &'a LoadOptions) -> Self {
        Self {
            registry,
            options,
            store: Store::new(),
            deferred: Vec::new(),
            counts: Vec::new(),
            ordinals: HashMap::new(),
        }
    }

    /// Position of the next top-level record of `entity` across the document.
    fn next_ordinal(&mut self, entity: &str) -> usize {
        let slot = self.ordinals.entry(entity.to_string()).or_insert(0);
        let ordinal = *slot;
        *slot += 1;
        ordinal
    }

    fn count(&mut self, entity: &str) {
        match self.counts.iter_mut().find(|(name, _)| name == entity) {
            Some((_, n)) => *n += 1,
            None => self.counts.push((entity.to_string(), 1)),
        }
    }

    /// Construct, register and add one record, then build its nested records.
    fn build<S: Session + ?Sized>(
        &mut self,
        model: &Rc<ModelDef>,
        constructor: Option<&str>,
        record: FixtureRecord,
        key: Option<String>,
        session: &mut S,
    ) -> Result<ObjectRef> {
        let custom =
            constructor.is_some() || model.constructor_named(DEFAULT_CONSTRUCTOR).is_some();
        let mut kwargs = Kwargs::new();
        let mut deferred = Vec::new();
        let mut nested = Vec::new();

        for (field, raw) in record.fields {
            let classified = self
                .classify(model, custom, &field, &raw)
                .map_err(|e| e.in_field(model.name(), &field))?;
            match classified {
                Classified::Literal(value) => kwargs.insert(field, value),
                Classified::Deferred(reference) => deferred.push((field, reference)),
                Classified::Nested(records) => nested.push((field, records)),
                Classified::Skip => {}
            }
        }

        let obj = model.construct(constructor, kwargs)?;
        if obj.model_name() != model.name() {
            return Err(Error::InvalidModel {
                message: format!(
                    "constructor of `{}` returned a `{}` instance",
                    model.name(),
                    obj.model_name()
                ),
            });
        }

        if let Some(key) = &key {
            self.store.put(key.clone(), obj.clone())?;
        }
        session.add(&obj);
        self.count(model.name());
        tracing::debug!(
            model = model.name(),
            key = key.as_deref().unwrap_or("-"),
            deferred = deferred.len(),
            nested = nested.len(),
            "Registered fixture record"
        );

        for (field, reference) in deferred {
            self.deferred.push(DeferredField {
                target: obj.clone(),
                field,
                reference,
            });
        }

        for (field, records) in nested {
            self.build_nested(model, &obj, &field, records, session)
                .map_err(|e| e.in_field(model.name(), &field))?;
        }

        Ok(obj)
    }

    /// Build records nested under `parent.field` and assign them.
    fn build_nested<S: Session + ?Sized>(
        &mut self,
        model: &ModelDef,
        parent: &ObjectRef,
        field: &str,
        records: Nested,
        session: &mut S,
    ) -> Result<()> {
        let rel = model
            .relationship_info(field)
            .ok_or_else(|| Error::UnknownField {
                model: model.name().to_string(),
                field: field.to_string(),
            })?;
        let target = self.registry.resolve(&rel.target)?;
        let value = match records {
            Nested::One(record) => {
                let key = record.key.clone();
                Value::Object(self.build(&target, None, record, key, session)?)
            }
            Nested::Many(records) => {
                let mut children = Vec::with_capacity(records.len());
                for record in records {
                    let key = record.key.clone();
                    children.push(Value::Object(self.build(&target, None, record, key, session)?));
                }
                Value::List(children)
            }
        };
        parent.set(field, value)
    }

    /// Decide what to do with one record field.
    fn classify(
        &self,
        model: &ModelDef,
        custom: bool,
        field: &str,
        raw: &Yaml,
    ) -> Result<Classified> {
        match model.descriptor(field) {
            Some(FieldKind::Column(def)) => {
                if let Some(path) = self.ref_path(raw)? {
                    return Ok(Classified::Deferred(Reference::One(path)));
                }
                let value = Value::from_yaml(raw)?;
                def.check(model.name(), &value)?;
                Ok(Classified::Literal(value))
            }
            Some(FieldKind::Relationship(rel)) => self.classify_relationship(model, rel, raw),
            None if custom => {
                // Constructor parameter: references resolve now, against what is registered so far.
                let value = match self.ref_path(raw)? {
                    Some(path) => self.lookup(&path)?,
                    None => Value::from_yaml(raw)?,
                };
                Ok(Classified::Literal(value))
            }
            None => Err(Error::UnknownField {
                model: model.name().to_string(),
                field: field.to_string(),
            }),
        }
    }

    fn classify_relationship(
        &self,
        model: &ModelDef,
        rel: &RelationshipInfo,
        raw: &Yaml,
    ) -> Result<Classified> {
        if let Some(path) = self.ref_path(raw)? {
            return Ok(Classified::Deferred(Reference::One(path)));
        }

        let invalid = |message: String| Error::InvalidValue {
            model: model.name().to_string(),
            field: rel.name.clone(),
            message,
        };

        match raw {
            Yaml::Null if rel.is_to_many() => Ok(Classified::Literal(Value::List(Vec::new()))),
            Yaml::Null => Ok(Classified::Literal(Value::Null)),
            Yaml::String(path) => {
                split_path(path)?;
                Ok(Classified::Deferred(Reference::One(path.clone())))
            }
            Yaml::Mapping(map) if !rel.is_to_many() => Ok(Classified::Nested(Nested::One(
                FixtureRecord::from_mapping(&rel.target, map, self.options)?,
            ))),
            Yaml::Sequence(items) if rel.is_to_many() => {
                if items.is_empty() {
                    return Ok(Classified::Skip);
                }
                let mut paths = Vec::new();
                let mut records = Vec::new();
                for item in items {
                    if let Some(path) = self.ref_path(item)? {
                        paths.push(path);
                        continue;
                    }
                    match item {
                        Yaml::String(path) => {
                            split_path(path)?;
                            paths.push(path.clone());
                        }
                        Yaml::Mapping(map) => records.push(FixtureRecord::from_mapping(
                            &rel.target,
                            map,
                            self.options,
                        )?),
                        other => {
                            return Err(invalid(format!(
                                "list items must be keys or mappings, found {}",
                                describe(other)
                            )));
                        }
                    }
                }
                match (paths.is_empty(), records.is_empty()) {
                    (false, true) => Ok(Classified::Deferred(Reference::Many(paths))),
                    (true, false) => Ok(Classified::Nested(Nested::Many(records))),
                    _ => Err(invalid(
                        "a list cannot mix references and nested records".to_string(),
                    )),
                }
            }
            other if rel.is_to_many() => Err(invalid(format!(
                "to-many relationship takes a list, found {}",
                describe(other)
            ))),
            other => Err(invalid(format!(
                "to-one relationship takes a key or a mapping, found {}",
                describe(other)
            ))),
        }
    }

    /// The path of a `{ref: path}` marker, if `raw` is one.
    fn ref_path(&self, raw: &Yaml) -> Result<Option<String>> {
        let Yaml::Mapping(map) = raw else {
            return Ok(None);
        };
        if map.len() != 1 {
            return Ok(None);
        }
        let Some(target) = map.get(self.options.ref_marker.as_str()) else {
            return Ok(None);
        };
        match target {
            Yaml::String(path) => {
                split_path(path)?;
                Ok(Some(path.clone()))
            }
            other => Err(Error::InvalidDocument {
                message: format!(
                    "`{}` marker takes a string path, found {}",
                    self.options.ref_marker,
                    describe(other)
                ),
            }),
        }
    }

    /// Resolve one path against the store.
    fn lookup(&self, path: &str) -> Result<Value> {
        let (head, _) = split_path(path)?;
        if is_synthesized_key(head) {
            tracing::warn!(
                path,
                "Reference uses a synthesized key; it depends on record position"
            );
        }
        self.store.get(path)
    }

    /// Second pass: assign every deferred field, stopping at the first failure.
    fn resolve_deferred(&mut self) -> Result<usize> {
        let deferred = std::mem::take(&mut self.deferred);
        let total = deferred.len();

        for DeferredField {
            target,
            field,
            reference,
        } in deferred
        {
            let model = target.model_name();
            let value = match &reference {
                Reference::One(path) => self.lookup(path),
                Reference::Many(paths) => paths
                    .iter()
                    .map(|p| self.lookup(p))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List),
            }
            .map_err(|e| e.in_field(&model, &field))?;

            target
                .set(&field, value)
                .map_err(|e| e.in_field(&model, &field))?;

            tracing::debug!(
                model = %model,
                field = %field,
                reference = %reference.paths().join(","),
                "Resolved deferred field"
            );
        }
        Ok(total)
    }
}
