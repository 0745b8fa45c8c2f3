//! Session contract and in-memory Unit of Work for SQLFixture Rust.
//!
//! The fixture loader only needs one thing from an ORM session: somewhere to
//! `add` the objects it builds. That contract is the [`Session`] trait.
//!
//! [`MemorySession`] is a complete in-memory implementation for tests and for
//! callers without a database. It keeps an identity map and tracks pending
//! inserts and deletes. On flush it assigns primary keys and fills foreign
//! key columns.
//!
//! # Design Philosophy
//!
//! - **Explicit over implicit**: nothing is flushed until `flush()` or `commit()`
//! - **Identity map**: objects are tracked by identity, so adding twice is a no-op
//! - **Caller owns the transaction**: the loader never flushes or commits
//!
//! # Example
//!
//! ```ignore
//! let mut session = MemorySession::new();
//!
//! // Add new objects (will be INSERTed on flush)
//! session.add(&joey);
//!
//! // Flush pending changes: primary keys and foreign keys are assigned
//! session.flush()?;
//!
//! // Query in insertion order
//! let users = session.query("User");
//! ```

use serde_json::Value as JsonValue;
use sqlfixture_core::{Error, ObjectRef, Value};
use std::collections::HashMap;

// ============================================================================
// Session Contract
// ============================================================================

/// Where loaded objects go.
pub trait Session {
    /// Attach an object to the session. It will be persisted by the caller's flush/commit.
    fn add(&mut self, obj: &ObjectRef);
}

/// A plain list collects objects in the order they are added.
impl Session for Vec<ObjectRef> {
    fn add(&mut self, obj: &ObjectRef) {
        if !self.iter().any(|o| o.ptr_eq(obj)) {
            self.push(obj.clone());
        }
    }
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Configuration for [`MemorySession`] behavior.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Whether flush assigns unset auto-increment primary keys and syncs
    /// foreign key columns from to-one relationships.
    pub autoflush_ids: bool,
    /// Whether to auto-begin a transaction on the first flush.
    pub auto_begin: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            autoflush_ids: true,
            auto_begin: true,
        }
    }
}

impl SessionConfig {
    /// Enable or disable key assignment on flush.
    pub fn with_autoflush_ids(mut self, enabled: bool) -> Self {
        self.autoflush_ids = enabled;
        self
    }

    /// Enable or disable auto-begin.
    pub fn with_auto_begin(mut self, enabled: bool) -> Self {
        self.auto_begin = enabled;
        self
    }
}

// ============================================================================
// Object Key and State
// ============================================================================

/// Unique key for an object in the identity map.
///
/// Fixture objects have no primary key before flush, so identity is the
/// address of the shared instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectKey(usize);

impl ObjectKey {
    /// Create an object key from an object handle.
    pub fn of(obj: &ObjectRef) -> Self {
        ObjectKey(obj.addr())
    }
}

/// State of a tracked object in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    /// New object, needs INSERT on flush.
    New,
    /// Object that has been flushed.
    Persistent,
    /// Object marked for deletion, needs DELETE on flush.
    Deleted,
    /// Object detached from session.
    Detached,
}

/// A tracked object in the session.
struct TrackedObject {
    /// The shared object.
    object: ObjectRef,
    /// Serialized state at the last flush, for dirty checking.
    original_state: Option<JsonValue>,
    /// Current object state.
    state: ObjectState,
}

// ============================================================================
// MemorySession
// ============================================================================

/// In-memory Unit of Work.
pub struct MemorySession {
    /// Identity map: ObjectKey -> TrackedObject.
    identity_map: HashMap<ObjectKey, TrackedObject>,
    /// Tracked keys in the order they were first added.
    order: Vec<ObjectKey>,
    /// Objects marked as new (need INSERT).
    pending_new: Vec<ObjectKey>,
    /// Objects marked as deleted (need DELETE).
    pending_delete: Vec<ObjectKey>,
    /// Last assigned primary key per table.
    sequences: HashMap<String, i64>,
    /// Whether we're in a transaction.
    in_transaction: bool,
    /// Configuration.
    config: SessionConfig,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    #[tracing::instrument(level = "debug", skip(self, obj))]
    fn add(&mut self, obj: &ObjectRef) {
        let key = ObjectKey::of(obj);
        let model = obj.model();

        tracing::info!(
            model = model.name(),
            table = model.table_name(),
            "Adding object to session"
        );

        // If already tracked, re-attach
        if let Some(tracked) = self.identity_map.get_mut(&key) {
            match tracked.state {
                ObjectState::New | ObjectState::Persistent => {}
                ObjectState::Deleted => {
                    self.pending_delete.retain(|k| k != &key);
                    tracked.state = if tracked.original_state.is_some() {
                        ObjectState::Persistent
                    } else {
                        self.pending_new.push(key);
                        ObjectState::New
                    };
                }
                ObjectState::Detached => {
                    tracked.state = ObjectState::New;
                    self.pending_new.push(key);
                }
            }
            return;
        }

        self.identity_map.insert(
            key,
            TrackedObject {
                object: obj.clone(),
                original_state: None,
                state: ObjectState::New,
            },
        );
        self.order.push(key);
        self.pending_new.push(key);
    }
}

impl MemorySession {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Create a new session with custom configuration.
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            identity_map: HashMap::new(),
            order: Vec::new(),
            pending_new: Vec::new(),
            pending_delete: Vec::new(),
            sequences: HashMap::new(),
            in_transaction: false,
            config,
        }
    }

    /// Get the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ========================================================================
    // Object Tracking
    // ========================================================================

    /// Mark an object for deletion.
    ///
    /// New objects are simply forgotten; persistent ones are removed on the next `flush()`.
    #[tracing::instrument(level = "debug", skip(self, obj))]
    pub fn delete(&mut self, obj: &ObjectRef) {
        let key = ObjectKey::of(obj);

        tracing::info!(model = %obj.model_name(), "Marking object for deletion");

        if let Some(tracked) = self.identity_map.get_mut(&key) {
            match tracked.state {
                ObjectState::New => {
                    self.identity_map.remove(&key);
                    self.order.retain(|k| k != &key);
                    self.pending_new.retain(|k| k != &key);
                }
                ObjectState::Persistent => {
                    tracked.state = ObjectState::Deleted;
                    self.pending_delete.push(key);
                }
                ObjectState::Deleted | ObjectState::Detached => {}
            }
        }
    }

    /// Check if an object is attached to this session.
    pub fn contains(&self, obj: &ObjectRef) -> bool {
        self.state(obj)
            .is_some_and(|s| s != ObjectState::Detached)
    }

    /// Tracking state of an object, if tracked.
    pub fn state(&self, obj: &ObjectRef) -> Option<ObjectState> {
        self.identity_map
            .get(&ObjectKey::of(obj))
            .map(|tracked| tracked.state)
    }

    /// Detach an object from the session.
    pub fn expunge(&mut self, obj: &ObjectRef) {
        let key = ObjectKey::of(obj);
        if let Some(tracked) = self.identity_map.get_mut(&key) {
            tracked.state = ObjectState::Detached;
        }
        self.pending_new.retain(|k| k != &key);
        self.pending_delete.retain(|k| k != &key);
    }

    /// Detach all objects from the session.
    pub fn expunge_all(&mut self) {
        for tracked in self.identity_map.values_mut() {
            tracked.state = ObjectState::Detached;
        }
        self.pending_new.clear();
        self.pending_delete.clear();
    }

    /// Attached objects, in the order they were added.
    pub fn objects(&self) -> Vec<ObjectRef> {
        self.order
            .iter()
            .filter_map(|key| self.identity_map.get(key))
            .filter(|t| matches!(t.state, ObjectState::New | ObjectState::Persistent))
            .map(|t| t.object.clone())
            .collect()
    }

    /// Attached objects of one model, in the order they were added.
    pub fn query(&self, model: &str) -> Vec<ObjectRef> {
        self.objects()
            .into_iter()
            .filter(|obj| obj.model_name() == model)
            .collect()
    }

    /// Whether a flushed object changed since its last flush.
    ///
    /// New objects are always modified; untracked ones never are.
    pub fn is_modified(&self, obj: &ObjectRef) -> bool {
        match self.identity_map.get(&ObjectKey::of(obj)) {
            Some(tracked) => match &tracked.original_state {
                Some(original) => *original != obj.to_json(),
                None => tracked.state == ObjectState::New,
            },
            None => false,
        }
    }

    // ========================================================================
    // Transaction Management
    // ========================================================================

    /// Begin a transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin(&mut self) {
        if self.in_transaction {
            return;
        }
        tracing::info!("Beginning transaction");
        self.in_transaction = true;
    }

    /// Flush pending changes.
    ///
    /// Deleted objects are dropped from the identity map. When
    /// `autoflush_ids` is set, new objects then receive primary keys and
    /// their foreign key columns are filled. Finally every new object becomes
    /// persistent and the state of every persistent object is snapshotted.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn flush(&mut self) -> Result<(), Error> {
        let start = std::time::Instant::now();

        tracing::info!(
            inserts = self.pending_new.len(),
            deletes = self.pending_delete.len(),
            "Starting flush"
        );

        if self.config.auto_begin {
            self.begin();
        }

        // 1. DELETEs
        let deletes: Vec<ObjectKey> = std::mem::take(&mut self.pending_delete);
        for key in &deletes {
            self.identity_map.remove(key);
        }
        self.order.retain(|k| !deletes.contains(k));

        // 2. INSERTs
        let inserts: Vec<ObjectKey> = std::mem::take(&mut self.pending_new);
        let new_objects: Vec<ObjectRef> = inserts
            .iter()
            .filter_map(|key| self.identity_map.get(key))
            .map(|t| t.object.clone())
            .collect();

        if self.config.autoflush_ids {
            if let Err(e) = self.assign_keys(&new_objects) {
                self.pending_new = inserts;
                return Err(e);
            }
        }

        for key in &inserts {
            if let Some(tracked) = self.identity_map.get_mut(key) {
                tracked.state = ObjectState::Persistent;
            }
        }

        // 3. Snapshot for dirty checking
        let mut updated = 0usize;
        for tracked in self.identity_map.values_mut() {
            if tracked.state == ObjectState::Persistent {
                let snapshot = tracked.object.to_json();
                if tracked.original_state.as_ref().is_some_and(|o| *o != snapshot) {
                    updated += 1;
                }
                tracked.original_state = Some(snapshot);
            }
        }

        tracing::info!(
            inserted = inserts.len(),
            updated,
            elapsed_ms = start.elapsed().as_millis(),
            "Flush completed"
        );

        Ok(())
    }

    /// Assign primary keys, then copy them into foreign key columns.
    fn assign_keys(&mut self, objects: &[ObjectRef]) -> Result<(), Error> {
        // Explicit keys advance the sequence so generated keys never collide.
        for obj in objects {
            let model = obj.model();
            if let Some(Value::Int(id)) = obj.primary_key() {
                let seq = self.sequences.entry(model.table_name().to_string()).or_insert(0);
                *seq = (*seq).max(id);
            }
        }

        for obj in objects {
            let model = obj.model();
            let Some(pk) = model.primary_key() else {
                continue;
            };
            if pk.auto_increment && obj.primary_key().is_none() {
                let seq = self.sequences.entry(model.table_name().to_string()).or_insert(0);
                *seq += 1;
                obj.set(&pk.name, Value::Int(*seq))?;
            }
        }

        for obj in objects {
            let model = obj.model();
            for rel in model.relationships() {
                let Some(local_key) = &rel.local_key else {
                    continue;
                };
                if let Value::Object(target) = obj.get(&rel.name)? {
                    if let Some(fk) = target.primary_key() {
                        obj.set(local_key, fk)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Flush and commit the current transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&mut self) -> Result<(), Error> {
        tracing::info!("Committing transaction");
        self.flush()?;
        self.in_transaction = false;
        Ok(())
    }

    /// Rollback the current transaction.
    ///
    /// Objects that were never flushed are dropped and deletions are undone.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) {
        tracing::info!("Rolling back transaction");

        self.in_transaction = false;
        self.pending_new.clear();
        self.pending_delete.clear();

        let mut to_remove = Vec::new();
        for (key, tracked) in &mut self.identity_map {
            match tracked.state {
                ObjectState::New => to_remove.push(*key),
                ObjectState::Deleted => tracked.state = ObjectState::Persistent,
                _ => {}
            }
        }

        for key in &to_remove {
            self.identity_map.remove(key);
        }
        self.order.retain(|k| !to_remove.contains(k));
    }

    // ========================================================================
    // Debug Diagnostics
    // ========================================================================

    /// Get count of objects pending INSERT.
    pub fn pending_new_count(&self) -> usize {
        self.pending_new.len()
    }

    /// Get count of objects pending DELETE.
    pub fn pending_delete_count(&self) -> usize {
        self.pending_delete.len()
    }

    /// Get total tracked object count.
    pub fn tracked_count(&self) -> usize {
        self.identity_map.len()
    }

    /// Whether we're in a transaction.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Dump session state for debugging.
    pub fn debug_state(&self) -> SessionDebugInfo {
        SessionDebugInfo {
            tracked: self.tracked_count(),
            pending_new: self.pending_new_count(),
            pending_delete: self.pending_delete_count(),
            in_transaction: self.in_transaction,
        }
    }
}

/// Debug information about session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDebugInfo {
    /// Total tracked objects.
    pub tracked: usize,
    /// Objects pending INSERT.
    pub pending_new: usize,
    /// Objects pending DELETE.
    pub pending_delete: usize,
    /// Whether in a transaction.
    pub in_transaction: bool,
}

// ============================================================================
// Unit Tests
// ============================================================================
