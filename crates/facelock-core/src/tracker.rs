//! Per-frame entry point combining external observations with the lock
//! session.
//!
//! The tracker never talks to a camera or a model: the detection and
//! recognition collaborators hand it one [`FrameObservation`] per frame,
//! already carrying the bounding box, landmarks and recognition verdict.
//! Everything is synchronous and pull-based — one `process_frame` call per
//! video frame, all mutation inline. Callers that process frames off-thread
//! must serialize access externally.

use std::path::PathBuf;

use tracing::warn;

use crate::config::{ConfigError, TrackerConfig};
use crate::history::HistoryError;
use crate::registry::{IdentityRegistry, RegistryError};
use crate::session::{FrameResult, LockSession};
use crate::types::{FrameObservation, LockState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("history error: {0}")]
    History(#[from] HistoryError),
    #[error("no active session — select a target first")]
    NoSession,
    #[error("a session for '{0}' is already active — finalize it before selecting a new target")]
    SessionActive(String),
}

#[derive(Debug)]
pub struct FaceLockTracker<R: IdentityRegistry> {
    config: TrackerConfig,
    registry: R,
    session: Option<LockSession>,
}

impl<R: IdentityRegistry> FaceLockTracker<R> {
    pub fn new(config: TrackerConfig, registry: R) -> Result<Self, TrackerError> {
        config.validate()?;
        Ok(Self {
            config,
            registry,
            session: None,
        })
    }

    /// Select the identity to lock onto and start a session for it.
    ///
    /// Returns `Ok(false)` — with no state mutated — when the name is not
    /// enrolled. A new target requires finalizing the current session first.
    pub fn select_target(&mut self, name: &str) -> Result<bool, TrackerError> {
        if let Some(session) = &self.session {
            return Err(TrackerError::SessionActive(session.target().to_string()));
        }
        if !self.registry.is_enrolled(name)? {
            warn!(name, "target identity is not enrolled");
            return Ok(false);
        }
        self.session = Some(LockSession::start(name, &self.config)?);
        Ok(true)
    }

    /// Process one frame's observation.
    ///
    /// A missing face is normal input, never an error. A frame that claims a
    /// face but carries malformed landmarks is downgraded to face-absent for
    /// that frame — a single bad frame must not abort the session.
    pub fn process_frame(
        &mut self,
        observation: &FrameObservation,
    ) -> Result<FrameResult, TrackerError> {
        let session = self.session.as_mut().ok_or(TrackerError::NoSession)?;
        let sighting = match observation.sighting() {
            Ok(sighting) => sighting,
            Err(err) => {
                warn!(error = %err, "malformed observation treated as face-absent");
                None
            }
        };
        Ok(session.advance(sighting.as_ref())?)
    }

    /// Manually release the lock; the session keeps running in SEARCHING.
    pub fn release_lock(&mut self) -> Result<(), TrackerError> {
        let session = self.session.as_mut().ok_or(TrackerError::NoSession)?;
        session.release()?;
        Ok(())
    }

    /// Finalize the history file and end the session. On a write failure the
    /// session stays active so finalize can be retried.
    pub fn finalize_session(&mut self) -> Result<PathBuf, TrackerError> {
        let session = self.session.as_mut().ok_or(TrackerError::NoSession)?;
        let path = session.finalize()?;
        self.session = None;
        Ok(path)
    }

    pub fn state(&self) -> Option<LockState> {
        self.session.as_ref().map(|s| s.state())
    }

    pub fn target(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.target())
    }
}
