//! Core types for SQLFixture Rust.
//!
//! `sqlfixture-core` is the **mapped-model layer** that fixtures are loaded into.
//! It defines the values, models and errors the other crates build on.
//!
//! # Role In The Architecture
//!
//! - **Data model**: `Value` is the dynamic value stored in model fields and in
//!   the reference store; `ObjectRef` is a shared handle to a `ModelInstance`.
//! - **Contract layer**: `Resolve` is the capability to look up a member by
//!   name. Dotted reference paths are walked through it.
//! - **Metadata**: `ModelDef` declares columns (`FieldDef`) and relationships
//!   (`RelationshipInfo`) and owns the per-model field descriptor table.
//!   `ModelRegistry` maps entity-type names to definitions.
//! - **Errors**: one `Error` enum covers registry, resolution and loading failures.
//!
//! # Who Uses This Crate
//!
//! - `sqlfixture-session` tracks `ObjectRef`s added by the loader.
//! - `sqlfixture` consults model descriptor tables while loading and resolves
//!   references through `Resolve`.
//!
//! Most applications should use the `sqlfixture` facade; reach for
//! `sqlfixture-core` directly when defining models or custom `Resolve` types.

pub mod error;
pub mod field;
pub mod instance;
pub mod keys;
pub mod model;
pub mod registry;
pub mod relationship;
pub mod resolve;
pub mod value;

pub use error::{Error, Result};
pub use field::{FieldDef, FieldType};
pub use instance::{ModelInstance, ObjectRef};
pub use keys::{is_synthesized_key, is_valid_key, split_path, synthesized_key, validate_key};
pub use model::{Constructor, DEFAULT_CONSTRUCTOR, FieldKind, Kwargs, ModelDef};
pub use registry::ModelRegistry;
pub use relationship::{RelationshipInfo, RelationshipKind};
pub use resolve::{Resolve, TYPE_MEMBER};
pub use value::Value;
