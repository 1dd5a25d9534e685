//! Bulk snapshot contract between the external loader and the cache.

use super::attribute::AttributeRow;
use super::branch::BranchRow;
use super::note::NoteRow;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Full read-only graph snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub notes: Vec<NoteRow>,
    #[serde(default)]
    pub branches: Vec<BranchRow>,
    #[serde(default)]
    pub attributes: Vec<AttributeRow>,
}

/// Error reported by a [`GraphLoader`].
#[derive(Debug)]
pub enum LoadError {
    /// Backing store could not be read.
    Source(Box<dyn Error + Send + Sync>),
    /// Rows were read but are not a consistent snapshot.
    InvalidData(String),
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Source(err) => write!(f, "graph snapshot source failed: {err}"),
            Self::InvalidData(message) => write!(f, "invalid graph snapshot: {message}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Source(err) => Some(err.as_ref()),
            Self::InvalidData(_) => None,
        }
    }
}

/// Collaborator that materializes snapshots from the document store.
pub trait GraphLoader {
    fn load_snapshot(&self) -> Result<GraphSnapshot, LoadError>;
}

impl GraphLoader for GraphSnapshot {
    fn load_snapshot(&self) -> Result<GraphSnapshot, LoadError> {
        Ok(self.clone())
    }
}
