//! SQLFixture Rust: declarative YAML fixtures for an ORM session.
//!
//! `sqlfixture` is the **primary facade** for loading fixtures. Fixture
//! documents describe records by entity type and wire them together by
//! symbolic key instead of database identifiers:
//!
//! ```yaml
//! User:
//!   - __key__: joey
//!     username: joey
//! Profile:
//!   - user: joey
//!     nickname: Joey Ramone
//! ```
//!
//! # Role In The Architecture
//!
//! - **Document parsing**: [`FixtureDocument`] turns YAML text into ordered sections.
//! - **Reference store**: [`Store`] maps symbolic keys to realized objects and
//!   resolves dotted paths such as `joey.profile.nickname`.
//! - **Loading**: [`load`] and [`FixtureLoader`] build every record in a first
//!   pass and resolve references in a second pass, so records may reference
//!   records declared later.
//! - **Sessions**: objects are added to any [`Session`]. The loader never
//!   flushes or commits.
//!
//! # Example
//!
//! ```ignore
//! use sqlfixture::prelude::*;
//!
//! let registry = ModelRegistry::new().with(user_model())?.with(profile_model())?;
//! let mut session = MemorySession::new();
//! load(&registry, &mut session, FIXTURES)?;
//! session.commit()?;
//! ```

pub mod document;
pub mod loader;
pub mod session;
pub mod store;

pub use document::{FixtureDocument, FixtureRecord, Section};
pub use loader::{FixtureLoader, LoadOptions, LoadReport, load};
pub use session::{MemorySession, ObjectState, Session, SessionConfig};
pub use store::Store;

pub use sqlfixture_core::{
    DEFAULT_CONSTRUCTOR, Error, FieldDef, FieldKind, FieldType, Kwargs, ModelDef, ModelInstance,
    ModelRegistry, ObjectRef, RelationshipInfo, RelationshipKind, Resolve, Result, TYPE_MEMBER,
    Value,
};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use sqlfixture::prelude::*;
/// ```
pub mod prelude {
    pub use crate::document::FixtureDocument;
    pub use crate::loader::{FixtureLoader, LoadOptions, LoadReport, load};
    pub use crate::session::{MemorySession, ObjectState, Session, SessionConfig};
    pub use crate::store::Store;
    pub use sqlfixture_core::{
        Error, FieldDef, FieldType, Kwargs, ModelDef, ModelRegistry, ObjectRef, RelationshipInfo,
        RelationshipKind, Resolve, Result, Value,
    };
}
