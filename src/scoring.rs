use crate::angles::AngleMap;
use crate::profile::ExerciseProfile;
use crate::util::variance;

pub const MAX_ACCURACY: u8 = 100;

/// Heuristic form score in [0, 100] for the angles seen as a rep completes.
///
/// Spread across all angles costs the profile's variance penalty tier; each
/// bilateral pair further apart than the symmetry tolerance costs the
/// symmetry penalty. Pairs with a side missing are skipped.
pub fn score_form(angles: &AngleMap, profile: &ExerciseProfile) -> u8 {
    let mut accuracy = i64::from(MAX_ACCURACY);

    if angles.len() > 1 {
        let values: Vec<f64> = angles.values().copied().collect();
        let tiers = &profile.variance_penalty;
        if let Some(v) = variance(&values) {
            if v > tiers.high_threshold {
                accuracy -= i64::from(tiers.high_penalty);
            } else if v > tiers.moderate_threshold {
                accuracy -= i64::from(tiers.moderate_penalty);
            }
        }
    }

    for (left, right) in &profile.symmetry_pairs {
        if let (Some(l), Some(r)) = (angles.get(left), angles.get(right)) {
            if (l - r).abs() > profile.symmetry_tolerance {
                accuracy -= i64::from(profile.symmetry_penalty);
            }
        }
    }

    accuracy.clamp(0, i64::from(MAX_ACCURACY)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::VariancePenalty;

    fn angles(values: &[(&str, f64)]) -> AngleMap {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn without_variance(mut profile: ExerciseProfile) -> ExerciseProfile {
        profile.variance_penalty = VariancePenalty {
            high_penalty: 0,
            moderate_penalty: 0,
            ..VariancePenalty::default()
        };
        profile
    }

    #[test]
    fn test_symmetric_rep_scores_full() {
        let map = angles(&[("left_knee", 170.0), ("right_knee", 168.0)]);
        assert_eq!(score_form(&map, &ExerciseProfile::squat()), 100);
    }

    #[test]
    fn test_knee_asymmetry_costs_symmetry_penalty() {
        let profile = without_variance(ExerciseProfile::squat());
        let map = angles(&[("left_knee", 170.0), ("right_knee", 150.0)]);
        assert_eq!(score_form(&map, &profile), 85);
    }

    #[test]
    fn test_variance_tiers() {
        let mut profile = ExerciseProfile::squat();
        profile.symmetry_pairs.clear();

        // variance 64
        let map = angles(&[("left_knee", 170.0), ("right_knee", 154.0)]);
        assert_eq!(score_form(&map, &profile), 90);

        // variance 121
        let map = angles(&[("left_knee", 170.0), ("right_knee", 148.0)]);
        assert_eq!(score_form(&map, &profile), 80);

        // variance exactly 100 is only moderate
        let map = angles(&[("left_knee", 170.0), ("right_knee", 150.0)]);
        assert_eq!(score_form(&map, &profile), 90);
    }

    #[test]
    fn test_combined_penalties_with_defaults() {
        // variance 400 (-20) and 40 degree elbow gap over pullup tolerance (-20)
        let map = angles(&[("left_elbow", 170.0), ("right_elbow", 130.0)]);
        assert_eq!(score_form(&map, &ExerciseProfile::pullup()), 60);
    }

    #[test]
    fn test_single_angle_skips_spread_checks() {
        let map = angles(&[("left_elbow", 165.0)]);
        assert_eq!(score_form(&map, &ExerciseProfile::pushup()), 100);
    }

    #[test]
    fn test_empty_map_scores_full() {
        assert_eq!(score_form(&AngleMap::new(), &ExerciseProfile::pushup()), 100);
    }

    #[test]
    fn test_score_clamps_at_zero() {
        let mut profile = ExerciseProfile::pushup();
        profile.symmetry_penalty = 150;
        let map = angles(&[("left_elbow", 170.0), ("right_elbow", 100.0)]);
        assert_eq!(score_form(&map, &profile), 0);
    }
}
