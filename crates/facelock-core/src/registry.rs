//! Enrollment registry seam.
//!
//! The tracker only needs to know whether a name is enrolled before it
//! commits a session to it; the recognition collaborator owns embeddings
//! and matching. Backends implement [`IdentityRegistry`] — the workspace
//! ships a SQLite one (`facelock-registry`) and [`MemoryRegistry`] for
//! tests and embedded callers.

use std::collections::BTreeSet;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub trait IdentityRegistry {
    fn is_enrolled(&self, name: &str) -> Result<bool, RegistryError>;
}

/// In-memory identity set.
#[derive(Debug, Default, Clone)]
pub struct MemoryRegistry {
    names: BTreeSet<String>,
}

impl MemoryRegistry {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl IdentityRegistry for MemoryRegistry {
    fn is_enrolled(&self, name: &str) -> Result<bool, RegistryError> {
        Ok(self.names.contains(name))
    }
}
