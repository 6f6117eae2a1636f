//! Lock session: the SEARCHING / LOCKED / LOST state machine.
//!
//! One session commits to one target identity for its whole lifetime. The
//! session owns its action detector and history logger exclusively; the
//! detector only runs while locked, and every entry into the locked state
//! re-anchors its baselines to the current frame so a tracking gap cannot
//! produce phantom events.

use std::path::PathBuf;
use std::time::Instant;

use chrono::Local;
use tracing::{debug, info};

use crate::config::TrackerConfig;
use crate::detector::ActionDetector;
use crate::history::{HistoryError, HistoryLogger};
use crate::types::{ActionEvent, BoundingBox, LockState, Sighting, StatusEvent};

/// Outcome of advancing a session by one frame.
#[derive(Debug)]
pub struct FrameResult {
    pub state: LockState,
    /// The target identity while the lock is held; `None` otherwise.
    pub locked_identity: Option<String>,
    pub face_box: Option<BoundingBox>,
    /// Actions fired this frame. Empty unless the session is locked and at
    /// least one evaluator crossed its threshold.
    pub actions: Vec<ActionEvent>,
}

#[derive(Debug)]
pub struct LockSession {
    target: String,
    state: LockState,
    /// Frames since the face was last usable while in the lost state.
    lost_frames: u32,
    lock_timeout_frames: u32,
    min_lock_confidence: f32,
    started: Instant,
    detector: ActionDetector,
    logger: HistoryLogger,
}

impl LockSession {
    /// Open a new session for `target`: creates the history file and a fresh
    /// detector. The target is immutable for the session's lifetime.
    pub fn start(target: &str, config: &TrackerConfig) -> Result<Self, HistoryError> {
        let logger = HistoryLogger::open(&config.history_dir, target, Local::now())?;
        info!(target, "lock session started");
        Ok(Self {
            target: target.to_string(),
            state: LockState::Searching,
            lost_frames: 0,
            lock_timeout_frames: config.lock_timeout_frames,
            min_lock_confidence: config.min_lock_confidence,
            started: Instant::now(),
            detector: ActionDetector::new(config),
            logger,
        })
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn state(&self) -> LockState {
        self.state
    }

    pub fn lost_frames(&self) -> u32 {
        self.lost_frames
    }

    /// Advance the state machine by one frame. `None` means no usable face
    /// was observed. Logging failures surface as errors but the transition
    /// has already been applied — lock-tracking state is never corrupted by
    /// a logging failure.
    pub fn advance(&mut self, sighting: Option<&Sighting>) -> Result<FrameResult, HistoryError> {
        let mut actions = Vec::new();
        let face_box = sighting.and_then(|s| s.bbox);

        match self.state {
            LockState::Searching => {
                if let Some(s) = sighting {
                    if let Some(confidence) = self.matching_confidence(s) {
                        self.state = LockState::Locked;
                        self.lost_frames = 0;
                        self.detector.anchor(&s.landmarks);
                        self.status(format!(
                            "Lock ACQUIRED for {} (confidence={confidence:.2})",
                            self.target
                        ))?;
                    }
                    // A face recognized as someone else, or with too little
                    // confidence, is non-matching: keep searching.
                }
            }
            LockState::Locked => match sighting {
                // Any detected face keeps the lock; re-confirmation of the
                // identity is not required frame to frame.
                Some(s) => {
                    self.lost_frames = 0;
                    actions = self.detector.detect(&s.landmarks, self.started.elapsed());
                    for event in &actions {
                        self.logger.append_action(event)?;
                    }
                }
                None => {
                    self.state = LockState::Lost;
                    self.lost_frames = 1;
                    self.status("Lock LOST (face disappeared)".to_string())?;
                }
            },
            LockState::Lost => {
                let matched = sighting.and_then(|s| self.matching_confidence(s).map(|c| (s, c)));
                if let Some((s, _)) = matched {
                    self.state = LockState::Locked;
                    self.lost_frames = 0;
                    // Re-anchor so nothing fires off the pre-gap baselines.
                    self.detector.anchor(&s.landmarks);
                    self.status(format!("Lock RE-ACQUIRED for {}", self.target))?;
                } else if self.lost_frames > self.lock_timeout_frames {
                    self.state = LockState::Searching;
                    self.lost_frames = 0;
                    self.detector.discard();
                    self.status("Lock timed out, returning to search".to_string())?;
                } else {
                    self.lost_frames += 1;
                    debug!(lost_frames = self.lost_frames, "target still lost");
                }
            }
        }

        Ok(FrameResult {
            state: self.state,
            locked_identity: (self.state == LockState::Locked).then(|| self.target.clone()),
            face_box,
            actions,
        })
    }

    /// Manual release: back to searching from any state, detector state
    /// discarded.
    pub fn release(&mut self) -> Result<(), HistoryError> {
        self.state = LockState::Searching;
        self.lost_frames = 0;
        self.detector.discard();
        self.status("Lock released manually".to_string())
    }

    /// Finalize the history file. Safe to retry if the write fails.
    pub fn finalize(&mut self) -> Result<PathBuf, HistoryError> {
        self.logger.finalize()
    }

    /// The recognition confidence if this sighting matches the session
    /// target at or above the lock threshold.
    fn matching_confidence(&self, sighting: &Sighting) -> Option<f32> {
        let verdict = sighting.verdict.as_ref()?;
        (verdict.identity == self.target && verdict.confidence >= self.min_lock_confidence)
            .then_some(verdict.confidence)
    }

    fn status(&mut self, description: String) -> Result<(), HistoryError> {
        info!(target = %self.target, state = %self.state, "{description}");
        let event = StatusEvent {
            elapsed: self.started.elapsed(),
            description,
        };
        self.logger.append_status(&event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LandmarkSet, RecognitionVerdict};
    use std::fs;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "facelock-session-test-{tag}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn config(dir: &PathBuf) -> TrackerConfig {
        TrackerConfig {
            history_dir: dir.clone(),
            ..Default::default()
        }
    }

    fn landmarks_at(nose_x: f32) -> LandmarkSet {
        let dx = nose_x - 120.0;
        LandmarkSet::new([
            (100.0 + dx, 50.0),
            (140.0 + dx, 50.0),
            (nose_x, 70.0),
            (108.0 + dx, 90.0),
            (132.0 + dx, 90.0),
        ])
        .unwrap()
    }

    fn sighting_of(identity: &str, confidence: f32, nose_x: f32) -> Sighting {
        Sighting {
            bbox: Some(BoundingBox {
                x1: 90.0,
                y1: 30.0,
                x2: 150.0,
                y2: 110.0,
            }),
            landmarks: landmarks_at(nose_x),
            verdict: Some(RecognitionVerdict {
                identity: identity.to_string(),
                confidence,
            }),
        }
    }

    fn unrecognized(nose_x: f32) -> Sighting {
        Sighting {
            verdict: None,
            ..sighting_of("", 0.0, nose_x)
        }
    }

    #[test]
    fn searching_locks_on_matching_identity() {
        let dir = temp_dir("lock");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();
        assert_eq!(session.state(), LockState::Searching);

        let result = session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Locked);
        assert_eq!(result.locked_identity.as_deref(), Some("Gabi"));
        assert!(result.face_box.is_some());
        // No action may fire on the acquisition frame.
        assert!(result.actions.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn searching_ignores_low_confidence_and_other_identities() {
        let dir = temp_dir("nonmatch");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();

        let result = session
            .advance(Some(&sighting_of("Gabi", 0.60, 100.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Searching);

        let result = session
            .advance(Some(&sighting_of("Marta", 0.99, 100.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Searching);
        assert!(result.locked_identity.is_none());

        let result = session.advance(Some(&unrecognized(100.0))).unwrap();
        assert_eq!(result.state, LockState::Searching);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn gabi_scenario_end_to_end() {
        // The reference sequence: lock at 0.92, nose drifts 100 → 112 and
        // fires exactly one MOVE_RIGHT with value 12.0, face disappears,
        // thirty more empty frames, search resumes on the frame after the
        // lost count exceeds the timeout.
        let dir = temp_dir("gabi");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();

        // Frame 1: lock acquired.
        let result = session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Locked);

        // Frames 2–5: nose x 104, 106, 112, 112. The cumulative delta first
        // exceeds 8 px at 112; later frames at 112 must not re-fire.
        let mut move_events = Vec::new();
        for nose_x in [104.0, 106.0, 112.0, 112.0] {
            // Identity re-confirmation is not required while locked.
            let result = session.advance(Some(&unrecognized(nose_x))).unwrap();
            assert_eq!(result.state, LockState::Locked);
            move_events.extend(result.actions);
        }
        assert_eq!(move_events.len(), 1);
        assert_eq!(move_events[0].kind, crate::types::ActionKind::MoveRight);
        assert!((move_events[0].value - 12.0).abs() < 1e-4);

        // Frame 6: face disappears.
        let result = session.advance(None).unwrap();
        assert_eq!(result.state, LockState::Lost);
        assert_eq!(session.lost_frames(), 1);

        // Frames 7–36: still gone. The counter strictly increases and the
        // state stays LOST throughout.
        for i in 0..30 {
            let result = session.advance(None).unwrap();
            assert_eq!(result.state, LockState::Lost, "frame {}", 7 + i);
            assert_eq!(session.lost_frames(), 2 + i);
        }

        // Frame 37: timeout exceeded, back to searching.
        let result = session.advance(None).unwrap();
        assert_eq!(result.state, LockState::Searching);
        assert_eq!(session.lost_frames(), 0);

        let path = session.finalize().unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Lock ACQUIRED for Gabi (confidence=0.92)"));
        assert!(contents.contains("Lock LOST (face disappeared)"));
        assert!(contents.contains("Lock timed out, returning to search"));
        assert!(contents.contains("actions: 1"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn lost_reacquisition_reanchors_and_fires_nothing() {
        let dir = temp_dir("reacquire");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();
        session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();
        session.advance(None).unwrap();
        assert_eq!(session.state(), LockState::Lost);

        // A different enrolled identity does not re-acquire.
        let result = session
            .advance(Some(&sighting_of("Marta", 0.99, 100.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Lost);

        // The target reappears far from the pre-gap position: baselines are
        // re-anchored, so the jump must not produce a movement event.
        let result = session
            .advance(Some(&sighting_of("Gabi", 0.95, 160.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Locked);
        assert!(result.actions.is_empty());
        assert_eq!(session.lost_frames(), 0);

        // And a genuine displacement from the new baseline still fires.
        let result = session.advance(Some(&unrecognized(172.0))).unwrap();
        assert_eq!(result.actions.len(), 1);

        let path = session.finalize().unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Lock RE-ACQUIRED for Gabi"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn lost_counter_resets_on_reacquisition() {
        let dir = temp_dir("counter");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();
        session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();
        session.advance(None).unwrap();
        session.advance(None).unwrap();
        assert_eq!(session.lost_frames(), 2);

        session
            .advance(Some(&sighting_of("Gabi", 0.90, 100.0)))
            .unwrap();
        assert_eq!(session.lost_frames(), 0);
        assert_eq!(session.state(), LockState::Locked);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn manual_release_returns_to_searching() {
        let dir = temp_dir("release");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();
        session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();
        assert_eq!(session.state(), LockState::Locked);

        session.release().unwrap();
        assert_eq!(session.state(), LockState::Searching);

        // Detector state was discarded: a matching face locks again and the
        // first locked frame fires nothing even at a new position.
        let result = session
            .advance(Some(&sighting_of("Gabi", 0.92, 200.0)))
            .unwrap();
        assert_eq!(result.state, LockState::Locked);
        assert!(result.actions.is_empty());

        let path = session.finalize().unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Lock released manually"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn detector_never_runs_outside_locked() {
        let dir = temp_dir("invariant");
        let mut session = LockSession::start("Gabi", &config(&dir)).unwrap();

        // Faces while searching produce no actions regardless of movement.
        for nose_x in [100.0, 150.0, 80.0] {
            let result = session.advance(Some(&unrecognized(nose_x))).unwrap();
            assert_eq!(result.state, LockState::Searching);
            assert!(result.actions.is_empty());
        }

        // Same while lost.
        session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();
        session.advance(None).unwrap();
        for nose_x in [100.0, 150.0, 80.0] {
            let result = session.advance(Some(&unrecognized(nose_x))).unwrap();
            assert_eq!(result.state, LockState::Lost);
            assert!(result.actions.is_empty());
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn timeout_respects_configured_frame_count() {
        let dir = temp_dir("timeout");
        let mut session = LockSession::start(
            "Gabi",
            &TrackerConfig {
                lock_timeout_frames: 3,
                history_dir: dir.clone(),
                ..Default::default()
            },
        )
        .unwrap();
        session
            .advance(Some(&sighting_of("Gabi", 0.92, 100.0)))
            .unwrap();

        session.advance(None).unwrap(); // lost_frames = 1
        for expected in [2, 3, 4] {
            let result = session.advance(None).unwrap();
            assert_eq!(result.state, LockState::Lost);
            assert_eq!(session.lost_frames(), expected);
        }
        // lost_frames (4) now exceeds the timeout (3): next frame searches.
        let result = session.advance(None).unwrap();
        assert_eq!(result.state, LockState::Searching);

        let _ = fs::remove_dir_all(&dir);
    }
}
