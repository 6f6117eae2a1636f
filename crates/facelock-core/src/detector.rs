//! Stateful per-lock-session action detection.
//!
//! Four independent threshold evaluators run against each landmark snapshot
//! while the session is locked: blink (the only one with multi-frame
//! hysteresis), horizontal head movement, smile, and face distance. The
//! other three keep a single baseline value that re-anchors on trigger, so a
//! sustained displacement fires exactly once per crossing rather than once
//! per frame.
//!
//! Baselines are anchored from the current frame on every entry into the
//! locked state. No evaluator can fire on the anchoring frame itself, since
//! every displacement is measured against a baseline equal to the current
//! value.

use std::time::Duration;

use tracing::debug;

use crate::config::TrackerConfig;
use crate::metrics;
use crate::types::{ActionEvent, ActionKind, LandmarkSet};

/// Fixed confidence reported for a completed blink cycle.
const BLINK_CONFIDENCE: f32 = 0.85;
/// Confidence ceiling for MOVE_LEFT / MOVE_RIGHT.
const MOVE_CONFIDENCE_CAP: f32 = 0.95;
/// Confidence ceiling for SMILE.
const SMILE_CONFIDENCE_CAP: f32 = 0.90;
/// Confidence ceiling for FACE_CLOSER / FACE_FARTHER.
const SCALE_CONFIDENCE_CAP: f32 = 0.85;
/// Consecutive below-boundary frames required before a closure counts.
const MIN_CLOSED_FRAMES: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlinkPhase {
    Open,
    Closing,
    Closed,
    Opening,
}

/// Reference scalars anchored at (re-)lock time.
#[derive(Debug, Clone, Copy)]
struct Baselines {
    eye_openness: f32,
    nose_x: f32,
    mouth_spread: f32,
    eye_distance: f32,
}

/// Per-session working memory of the four evaluators. Owned exclusively by
/// one lock session; reset on anchor, never persisted.
#[derive(Debug)]
pub struct ActionDetector {
    blink_threshold: f32,
    smile_threshold: f32,
    movement_threshold_px: f32,
    scale_change_threshold: f32,
    baselines: Option<Baselines>,
    blink_phase: BlinkPhase,
    closed_frames: u32,
    /// Lowest openness ratio seen during the current closure.
    trough_ratio: f32,
}

impl ActionDetector {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            blink_threshold: config.blink_threshold,
            smile_threshold: config.smile_threshold,
            movement_threshold_px: config.movement_threshold_px,
            scale_change_threshold: config.scale_change_threshold,
            baselines: None,
            blink_phase: BlinkPhase::Open,
            closed_frames: 0,
            trough_ratio: 1.0,
        }
    }

    /// Re-anchor every baseline to the current frame and reset the blink
    /// sub-state. Called on each entry into the locked state so a tracking
    /// gap cannot produce phantom movement or scale events.
    pub fn anchor(&mut self, landmarks: &LandmarkSet) {
        self.baselines = Some(Baselines {
            eye_openness: metrics::eye_openness(landmarks),
            nose_x: metrics::nose_x(landmarks),
            mouth_spread: metrics::mouth_spread(landmarks),
            eye_distance: metrics::inter_eye_distance(landmarks),
        });
        self.blink_phase = BlinkPhase::Open;
        self.closed_frames = 0;
        self.trough_ratio = 1.0;
        debug!("detector baselines anchored");
    }

    /// Drop all working memory (manual release / lock timeout).
    pub fn discard(&mut self) {
        self.baselines = None;
        self.blink_phase = BlinkPhase::Open;
        self.closed_frames = 0;
        self.trough_ratio = 1.0;
    }

    /// Evaluate one locked-state frame. Returns zero or more events; a frame
    /// may carry e.g. MOVE_RIGHT and SMILE together, but never both movement
    /// directions or both scale directions.
    pub fn detect(&mut self, landmarks: &LandmarkSet, elapsed: Duration) -> Vec<ActionEvent> {
        let Some(mut base) = self.baselines else {
            // First frame seen without an anchor: anchor now, nothing can fire.
            self.anchor(landmarks);
            return Vec::new();
        };

        let mut events = Vec::new();

        // Blink
        let openness_ratio = metrics::eye_openness(landmarks) / base.eye_openness;
        if let Some(event) = self.update_blink(openness_ratio, elapsed) {
            events.push(event);
        }

        // Horizontal movement
        let x = metrics::nose_x(landmarks);
        let dx = x - base.nose_x;
        if dx.abs() > self.movement_threshold_px {
            let kind = if dx < 0.0 {
                ActionKind::MoveLeft
            } else {
                ActionKind::MoveRight
            };
            let direction = if dx < 0.0 { "left" } else { "right" };
            events.push(ActionEvent {
                kind,
                elapsed,
                confidence: ramp(
                    dx.abs() - self.movement_threshold_px,
                    self.movement_threshold_px,
                    MOVE_CONFIDENCE_CAP,
                ),
                value: dx.abs(),
                description: format!("Head moved {direction} by {:.1} px", dx.abs()),
            });
            base.nose_x = x;
        }

        // Smile
        let spread = metrics::mouth_spread(landmarks);
        let spread_ratio = spread / base.mouth_spread;
        let increase = spread_ratio - 1.0;
        if increase >= self.smile_threshold {
            events.push(ActionEvent {
                kind: ActionKind::Smile,
                elapsed,
                confidence: ramp(
                    increase - self.smile_threshold,
                    self.smile_threshold,
                    SMILE_CONFIDENCE_CAP,
                ),
                value: spread_ratio,
                description: "Smile detected".to_string(),
            });
            base.mouth_spread = spread;
        }

        // Scale: the distance-estimate ratio is baseline/current inter-eye
        // distance, so a face moving closer (larger on screen) drives the
        // ratio below 1.
        let eye_distance = metrics::inter_eye_distance(landmarks);
        let distance_ratio = base.eye_distance / eye_distance;
        let scale_change = (distance_ratio - 1.0).abs();
        if scale_change > self.scale_change_threshold {
            let (kind, description) = if distance_ratio < 1.0 {
                (ActionKind::FaceCloser, "Face moved closer")
            } else {
                (ActionKind::FaceFarther, "Face moved farther")
            };
            events.push(ActionEvent {
                kind,
                elapsed,
                confidence: ramp(
                    scale_change - self.scale_change_threshold,
                    self.scale_change_threshold,
                    SCALE_CONFIDENCE_CAP,
                ),
                value: distance_ratio,
                description: description.to_string(),
            });
            base.eye_distance = eye_distance;
        }

        self.baselines = Some(base);

        for event in &events {
            debug!(kind = %event.kind, value = event.value, confidence = event.confidence, "action detected");
        }
        events
    }

    /// Blink hysteresis: Open → Closing → Closed → Opening → Open. The event
    /// fires only when the full cycle completes; an interrupted closure
    /// resets silently.
    fn update_blink(&mut self, ratio: f32, elapsed: Duration) -> Option<ActionEvent> {
        let boundary = 1.0 - self.blink_threshold;
        match self.blink_phase {
            BlinkPhase::Open => {
                if ratio < boundary {
                    self.blink_phase = BlinkPhase::Closing;
                    self.closed_frames = 1;
                    self.trough_ratio = ratio;
                }
                None
            }
            BlinkPhase::Closing => {
                if ratio < boundary {
                    self.closed_frames += 1;
                    self.trough_ratio = self.trough_ratio.min(ratio);
                    if self.closed_frames >= MIN_CLOSED_FRAMES {
                        self.blink_phase = BlinkPhase::Closed;
                    }
                } else {
                    // Closure not sustained long enough — not a blink.
                    self.blink_phase = BlinkPhase::Open;
                    self.closed_frames = 0;
                    self.trough_ratio = 1.0;
                }
                None
            }
            BlinkPhase::Closed => {
                if ratio >= boundary {
                    self.blink_phase = BlinkPhase::Opening;
                } else {
                    self.trough_ratio = self.trough_ratio.min(ratio);
                }
                None
            }
            BlinkPhase::Opening => {
                if ratio >= boundary {
                    self.blink_phase = BlinkPhase::Open;
                    let event = ActionEvent {
                        kind: ActionKind::Blink,
                        elapsed,
                        confidence: BLINK_CONFIDENCE,
                        value: self.trough_ratio,
                        description: "Blink detected".to_string(),
                    };
                    self.closed_frames = 0;
                    self.trough_ratio = 1.0;
                    Some(event)
                } else {
                    self.blink_phase = BlinkPhase::Closed;
                    self.trough_ratio = self.trough_ratio.min(ratio);
                    None
                }
            }
        }
    }
}

/// Linear confidence ramp: 0 where the measurement equals the threshold,
/// reaching `cap` at three times the threshold, clamped beyond.
fn ramp(excess: f32, threshold: f32, cap: f32) -> f32 {
    (excess / (2.0 * threshold)).clamp(0.0, 1.0) * cap
}
