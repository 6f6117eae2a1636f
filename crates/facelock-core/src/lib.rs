//! facelock-core — single-subject lock tracking and behavioral event
//! timeline.
//!
//! Consumes per-frame observations (bounding box, 5-point landmarks,
//! recognition verdict) produced by external detection/recognition
//! collaborators, locks onto one previously-enrolled identity, tolerates
//! brief disappearances, and converts landmark geometry into discrete,
//! confidence-scored action events persisted to a per-session history file.
//!
//! The crate is synchronous and pull-based: one `process_frame` call per
//! video frame, no internal threads or locking.

pub mod config;
pub mod detector;
pub mod history;
pub mod metrics;
pub mod registry;
pub mod session;
pub mod tracker;
pub mod types;

pub use config::TrackerConfig;
pub use registry::{IdentityRegistry, MemoryRegistry};
pub use session::FrameResult;
pub use tracker::{FaceLockTracker, TrackerError};
pub use types::{
    ActionEvent, ActionKind, BoundingBox, FrameObservation, LandmarkSet, LockState, StatusEvent,
};
