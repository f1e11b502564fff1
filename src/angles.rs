//! Joint angle computation from landmark triplets.

use crate::landmark::{Landmark, LandmarkFrame};
use crate::profile::ExerciseProfile;
use std::collections::BTreeMap;

/// Angle name -> degrees, for every definition that was fully visible.
pub type AngleMap = BTreeMap<String, f64>;

/// Unsigned interior angle at `b`, in degrees within [0, 180].
///
/// Swapping `a` and `c` yields the same value.
pub fn angle_at(a: &Landmark, b: &Landmark, c: &Landmark) -> f64 {
    let radians = (c.y - b.y).atan2(c.x - b.x) - (a.y - b.y).atan2(a.x - b.x);
    let angle = radians.to_degrees().abs();

    if angle > 180.0 {
        360.0 - angle
    } else {
        angle
    }
}

/// Measure every angle of `profile` whose three landmarks are visible in `frame`.
///
/// Definitions with a missing or low-confidence landmark are left out; an
/// empty map means the body is not sufficiently in view.
pub fn compute_angles(frame: &LandmarkFrame, profile: &ExerciseProfile) -> AngleMap {
    let floor = profile.visibility_floor;

    profile
        .angles
        .iter()
        .filter_map(|def| {
            let a = frame.visible(def.first, floor)?;
            let b = frame.visible(def.vertex, floor)?;
            let c = frame.visible(def.third, floor)?;
            let angle = angle_at(a, b, c);
            angle.is_finite().then(|| (def.name.clone(), angle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmark::{LEFT_ANKLE, LEFT_HIP, LEFT_KNEE, RIGHT_ANKLE, RIGHT_HIP, RIGHT_KNEE};
    use rand::Rng;

    fn point(x: f64, y: f64) -> Landmark {
        Landmark::new(0, x, y, 1.0)
    }

    #[test]
    fn test_straight_line_is_180() {
        let angle = angle_at(&point(0.0, 0.0), &point(0.5, 0.0), &point(1.0, 0.0));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_at(&point(0.0, 0.0), &point(0.5, 0.0), &point(0.5, 0.5));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_reflex_angle_is_reflected() {
        // Ray angles of -170 and +170 degrees differ by 340; interior is 20.
        let rad = 170_f64.to_radians();
        let a = point(rad.cos(), rad.sin());
        let b = point(0.0, 0.0);
        let c = point(rad.cos(), -rad.sin());
        let angle = angle_at(&a, &b, &c);
        assert!((angle - 20.0).abs() < 1e-6, "got {angle}");
    }

    #[test]
    fn test_random_triplets_in_range_and_order_symmetric() {
        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let a = point(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
            let b = point(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
            let c = point(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));

            let forward = angle_at(&a, &b, &c);
            let backward = angle_at(&c, &b, &a);
            assert!((0.0..=180.0).contains(&forward), "out of range: {forward}");
            assert!((forward - backward).abs() < 1e-9);
        }
    }

    #[test]
    fn test_compute_angles_skips_hidden_triplets() {
        let frame = LandmarkFrame::new(
            0,
            vec![
                Landmark::new(LEFT_HIP, 0.4, 0.3, 0.9),
                Landmark::new(LEFT_KNEE, 0.4, 0.5, 0.9),
                Landmark::new(LEFT_ANKLE, 0.4, 0.7, 0.9),
                Landmark::new(RIGHT_HIP, 0.6, 0.3, 0.9),
                Landmark::new(RIGHT_KNEE, 0.6, 0.5, 0.2),
                Landmark::new(RIGHT_ANKLE, 0.6, 0.7, 0.9),
            ],
        );

        let angles = compute_angles(&frame, &ExerciseProfile::squat());
        assert_eq!(angles.len(), 1);
        assert!((angles["left_knee"] - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_compute_angles_empty_frame() {
        let frame = LandmarkFrame::new(0, vec![]);
        assert!(compute_angles(&frame, &ExerciseProfile::pushup()).is_empty());
    }
}
