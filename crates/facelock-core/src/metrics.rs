//! Scalar geometry proxies over the 5-point landmark set.
//!
//! Only eye centres, nose tip and mouth corners are available — no eyelid or
//! lip contour points — so openness and mouth shape are proxies, not direct
//! measurements. Each scalar is normalized by the inter-eye distance where
//! scale invariance matters, so head distance changes do not masquerade as
//! blinks or smiles.

use crate::types::LandmarkSet;

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    (b.0 - a.0).hypot(b.1 - a.1)
}

/// Pixel distance between the two eye centres. Grows as the face approaches
/// the camera; the scale evaluator's raw input.
pub fn inter_eye_distance(landmarks: &LandmarkSet) -> f32 {
    distance(landmarks.left_eye(), landmarks.right_eye())
}

/// Eye-openness proxy: distance from the eye midpoint to the nose tip,
/// normalized by the inter-eye distance.
///
/// When the eyes close, 5-point detectors pull the predicted eye centres
/// down toward the nose, shrinking this measure. It is compared as a ratio
/// against the value anchored at lock acquisition, never in absolute terms.
pub fn eye_openness(landmarks: &LandmarkSet) -> f32 {
    let (lx, ly) = landmarks.left_eye();
    let (rx, ry) = landmarks.right_eye();
    let midpoint = ((lx + rx) / 2.0, (ly + ry) / 2.0);
    distance(midpoint, landmarks.nose_tip()) / inter_eye_distance(landmarks)
}

/// Mouth-geometry proxy: mouth-corner distance normalized by the inter-eye
/// distance. A smile widens the mouth, raising this ratio.
pub fn mouth_spread(landmarks: &LandmarkSet) -> f32 {
    distance(landmarks.left_mouth(), landmarks.right_mouth()) / inter_eye_distance(landmarks)
}

/// Horizontal nose-tip position in pixels.
pub fn nose_x(landmarks: &LandmarkSet) -> f32 {
    landmarks.nose_tip().0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(scale: f32, offset_x: f32) -> LandmarkSet {
        LandmarkSet::new([
            (offset_x + 100.0 * scale, 50.0 * scale),
            (offset_x + 140.0 * scale, 50.0 * scale),
            (offset_x + 120.0 * scale, 70.0 * scale),
            (offset_x + 108.0 * scale, 90.0 * scale),
            (offset_x + 132.0 * scale, 90.0 * scale),
        ])
        .unwrap()
    }

    #[test]
    fn inter_eye_distance_is_pixel_distance() {
        assert!((inter_eye_distance(&face(1.0, 0.0)) - 40.0).abs() < 1e-6);
        assert!((inter_eye_distance(&face(2.0, 0.0)) - 80.0).abs() < 1e-6);
    }

    #[test]
    fn openness_is_scale_invariant() {
        let near = eye_openness(&face(2.0, 0.0));
        let far = eye_openness(&face(0.5, 0.0));
        assert!((near - far).abs() < 1e-6);
    }

    #[test]
    fn openness_drops_when_eyes_sink_toward_nose() {
        let open = face(1.0, 0.0);
        let closed = LandmarkSet::new([
            (100.0, 60.0),
            (140.0, 60.0),
            (120.0, 70.0),
            (108.0, 90.0),
            (132.0, 90.0),
        ])
        .unwrap();
        assert!(eye_openness(&closed) < eye_openness(&open));
    }

    #[test]
    fn mouth_spread_rises_with_wider_mouth() {
        let neutral = face(1.0, 0.0);
        let smiling = LandmarkSet::new([
            (100.0, 50.0),
            (140.0, 50.0),
            (120.0, 70.0),
            (104.0, 90.0),
            (136.0, 90.0),
        ])
        .unwrap();
        assert!(mouth_spread(&smiling) > mouth_spread(&neutral));
    }

    #[test]
    fn nose_x_tracks_translation() {
        assert!((nose_x(&face(1.0, 12.0)) - 132.0).abs() < 1e-6);
    }
}
