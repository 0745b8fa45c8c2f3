//! Session re-exports.
//!
//! The loader only needs [`Session::add`]. [`MemorySession`] is the in-memory
//! identity map from `sqlfixture-session`, exposed here so callers do not
//! depend on the sub-crate directly.

pub use sqlfixture_session::{
    MemorySession, ObjectKey, ObjectState, Session, SessionConfig, SessionDebugInfo,
};
