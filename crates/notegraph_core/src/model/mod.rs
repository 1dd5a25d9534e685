//! Graph entity model for the in-memory note cache.
//!
//! # Responsibility
//! - Define loader-facing row shapes (`*Row`) and cache-side entities.
//! - Normalize attribute names/values at construction time.
//!
//! # Invariants
//! - Entities never own each other; every cross-entity link is an id.
//! - Attribute names are always lowercase after construction.
//!
//! # See also
//! - `crate::cache` for the owning tables and derived views.

pub mod attribute;
pub mod branch;
pub mod note;
pub mod snapshot;

/// Stable note identifier (for example `root`).
pub type NoteId = String;
/// Stable branch identifier.
pub type BranchId = String;
/// Stable attribute identifier.
pub type AttributeId = String;

/// Id of the single graph root note.
pub const ROOT_NOTE_ID: &str = "root";
