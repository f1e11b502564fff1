use crate::angles::AngleMap;
use crate::profile::ExerciseProfile;
use crate::util::mean;
use serde::{Deserialize, Serialize};

/// Coarse body configuration derived from the mean joint angle.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
pub enum Posture {
    #[strum(serialize = "EXTENDED")]
    Extended,
    #[strum(serialize = "FLEXED")]
    Flexed,
    #[strum(serialize = "TRANSITIONAL")]
    Transitional,
}

/// Mean of all present angles, or `None` when nothing was measured.
pub fn mean_angle(angles: &AngleMap) -> Option<f64> {
    let values: Vec<f64> = angles.values().copied().collect();
    mean(&values)
}

/// Threshold an aggregated angle against the profile's posture boundaries.
pub fn classify_angle(angle: f64, profile: &ExerciseProfile) -> Posture {
    if angle >= profile.extended_threshold {
        Posture::Extended
    } else if angle <= profile.flexed_threshold {
        Posture::Flexed
    } else {
        Posture::Transitional
    }
}

pub fn classify(angles: &AngleMap, profile: &ExerciseProfile) -> Option<Posture> {
    mean_angle(angles).map(|m| classify_angle(m, profile))
}

/// Exponential smoothing of the mean-angle signal ahead of thresholding.
///
/// `alpha` is the weight of the newest sample; 1.0 disables smoothing.
#[derive(Debug, Clone)]
pub struct AngleSmoother {
    alpha: f64,
    value: Option<f64>,
}

impl AngleSmoother {
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(0.01, 1.0),
            value: None,
        }
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            Some(prev) => prev + self.alpha * (sample - prev),
            None => sample,
        };
        self.value = Some(next);
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn angles(values: &[(&str, f64)]) -> AngleMap {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_classify_boundaries_are_inclusive() {
        let profile = ExerciseProfile::squat();
        assert_eq!(classify_angle(160.0, &profile), Posture::Extended);
        assert_eq!(classify_angle(90.0, &profile), Posture::Flexed);
        assert_eq!(classify_angle(125.0, &profile), Posture::Transitional);
        assert_eq!(classify_angle(159.9, &profile), Posture::Transitional);
    }

    #[test]
    fn test_classify_uses_mean() {
        let profile = ExerciseProfile::pushup();
        let map = angles(&[("left_elbow", 170.0), ("right_elbow", 150.0)]);
        assert_eq!(classify(&map, &profile), Some(Posture::Extended));

        let map = angles(&[("left_elbow", 100.0), ("right_elbow", 70.0)]);
        assert_eq!(classify(&map, &profile), Some(Posture::Flexed));
    }

    #[test]
    fn test_classify_empty_is_none() {
        assert_eq!(classify(&AngleMap::new(), &ExerciseProfile::pushup()), None);
    }

    #[test]
    fn test_posture_display() {
        assert_eq!(Posture::Flexed.to_string(), "FLEXED");
        assert_eq!(Posture::Transitional.to_string(), "TRANSITIONAL");
    }

    #[test]
    fn test_smoother_seeds_then_blends() {
        let mut smoother = AngleSmoother::new(0.5);
        assert_eq!(smoother.update(170.0), 170.0);
        assert_eq!(smoother.update(90.0), 130.0);
        assert_eq!(smoother.update(90.0), 110.0);
    }

    #[test]
    fn test_smoother_alpha_one_passes_through() {
        let mut smoother = AngleSmoother::new(1.0);
        smoother.update(170.0);
        assert_eq!(smoother.update(80.0), 80.0);
    }
}
