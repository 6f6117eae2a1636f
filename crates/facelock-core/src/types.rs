//! Core data model: landmarks, per-frame observations, and timeline events.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned face bounding box in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

#[derive(Error, Debug)]
pub enum LandmarkError {
    #[error("expected 5 landmark points, got {0}")]
    WrongCount(usize),
    #[error("landmark data contains a non-finite value")]
    NonFinite,
    #[error("degenerate landmark geometry — eye centres coincide")]
    Degenerate,
}

/// The 5-point landmark set produced by the detection collaborator.
///
/// Point order is fixed (SCRFD convention) and all geometry indexes by
/// position, never by label lookup:
/// 0 = left eye, 1 = right eye, 2 = nose tip, 3 = left mouth corner,
/// 4 = right mouth corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkSet {
    points: [(f32, f32); 5],
}

impl LandmarkSet {
    /// Validate and wrap a fixed-order 5-point array.
    ///
    /// Rejects non-finite coordinates and geometry with coinciding eye
    /// centres, since every derived scalar normalizes by eye distance.
    pub fn new(points: [(f32, f32); 5]) -> Result<Self, LandmarkError> {
        if points
            .iter()
            .any(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(LandmarkError::NonFinite);
        }
        let (lx, ly) = points[0];
        let (rx, ry) = points[1];
        if (rx - lx).hypot(ry - ly) <= f32::EPSILON {
            return Err(LandmarkError::Degenerate);
        }
        Ok(Self { points })
    }

    /// Validate a slice of arbitrary length (the wire form).
    pub fn from_slice(points: &[(f32, f32)]) -> Result<Self, LandmarkError> {
        let arr: [(f32, f32); 5] = points
            .try_into()
            .map_err(|_| LandmarkError::WrongCount(points.len()))?;
        Self::new(arr)
    }

    pub fn left_eye(&self) -> (f32, f32) {
        self.points[0]
    }
    pub fn right_eye(&self) -> (f32, f32) {
        self.points[1]
    }
    pub fn nose_tip(&self) -> (f32, f32) {
        self.points[2]
    }
    pub fn left_mouth(&self) -> (f32, f32) {
        self.points[3]
    }
    pub fn right_mouth(&self) -> (f32, f32) {
        self.points[4]
    }
}

/// One frame's worth of input from the detection/recognition collaborators.
///
/// This is the wire type: optional fields arrive exactly as the upstream
/// pipeline produced them and are validated on conversion to a [`Sighting`].
/// `face_detected == false` means no face was observed this frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FrameObservation {
    pub face_detected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmarks: Option<Vec<(f32, f32)>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

impl FrameObservation {
    /// An observation with no face present.
    pub fn absent() -> Self {
        Self::default()
    }

    /// Validate the raw observation into a usable sighting.
    ///
    /// `Ok(None)` means no face this frame. `Err` means the frame claimed a
    /// face but carried unusable landmark data (wrong count, non-finite,
    /// degenerate); callers treat that frame as face-absent.
    pub fn sighting(&self) -> Result<Option<Sighting>, LandmarkError> {
        if !self.face_detected {
            return Ok(None);
        }
        let raw = self
            .landmarks
            .as_deref()
            .ok_or(LandmarkError::WrongCount(0))?;
        let landmarks = LandmarkSet::from_slice(raw)?;
        let verdict = match (&self.identity, self.confidence) {
            (Some(identity), Some(confidence)) => {
                if !confidence.is_finite() {
                    return Err(LandmarkError::NonFinite);
                }
                Some(RecognitionVerdict {
                    identity: identity.clone(),
                    confidence: confidence.clamp(0.0, 1.0),
                })
            }
            _ => None,
        };
        Ok(Some(Sighting {
            bbox: self.bbox,
            landmarks,
            verdict,
        }))
    }
}

/// A validated face sighting for one frame.
#[derive(Debug, Clone)]
pub struct Sighting {
    pub bbox: Option<BoundingBox>,
    pub landmarks: LandmarkSet,
    pub verdict: Option<RecognitionVerdict>,
}

/// Identity comparison result from the recognition collaborator.
#[derive(Debug, Clone)]
pub struct RecognitionVerdict {
    pub identity: String,
    /// Similarity confidence in [0, 1].
    pub confidence: f32,
}

/// Lock state of a tracking session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Searching,
    Locked,
    Lost,
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LockState::Searching => "SEARCHING",
            LockState::Locked => "LOCKED",
            LockState::Lost => "LOST",
        };
        f.write_str(s)
    }
}

/// Discrete behavioral action kinds derived from landmark geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Blink,
    MoveLeft,
    MoveRight,
    Smile,
    FaceCloser,
    FaceFarther,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Blink => "BLINK",
            ActionKind::MoveLeft => "MOVE_LEFT",
            ActionKind::MoveRight => "MOVE_RIGHT",
            ActionKind::Smile => "SMILE",
            ActionKind::FaceCloser => "FACE_CLOSER",
            ActionKind::FaceFarther => "FACE_FARTHER",
        };
        f.write_str(s)
    }
}

/// A discrete, confidence-scored behavioral event. Immutable once created.
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub kind: ActionKind,
    /// Monotonic offset since session start.
    pub elapsed: Duration,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// The scalar measurement behind the event (pixels or ratio, per kind).
    pub value: f32,
    pub description: String,
}

/// A session-lifecycle note (lock acquired / lost / re-acquired / released).
#[derive(Debug, Clone)]
pub struct StatusEvent {
    /// Monotonic offset since session start.
    pub elapsed: Duration,
    pub description: String,
}
