use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::landmark::{
    LANDMARK_COUNT, LEFT_ANKLE, LEFT_ELBOW, LEFT_HIP, LEFT_KNEE, LEFT_SHOULDER, LEFT_WRIST,
    RIGHT_ANKLE, RIGHT_ELBOW, RIGHT_HIP, RIGHT_KNEE, RIGHT_SHOULDER, RIGHT_WRIST,
    VISIBILITY_FLOOR,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_EXTENDED_THRESHOLD: f64 = 160.0;
pub const DEFAULT_FLEXED_THRESHOLD: f64 = 90.0;
pub const DEFAULT_MIN_DWELL_MS: u64 = 800;

/// A named joint angle measured at `vertex` between the rays to `first` and `third`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleDefinition {
    pub name: String,
    pub first: usize,
    pub vertex: usize,
    pub third: usize,
}

impl AngleDefinition {
    pub fn new(name: &str, first: usize, vertex: usize, third: usize) -> Self {
        Self {
            name: name.to_string(),
            first,
            vertex,
            third,
        }
    }

    pub fn landmarks(&self) -> [usize; 3] {
        [self.first, self.vertex, self.third]
    }
}

/// Penalty tiers applied when the spread of the observed angles is large.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariancePenalty {
    pub high_threshold: f64,
    pub high_penalty: u32,
    pub moderate_threshold: f64,
    pub moderate_penalty: u32,
}

impl Default for VariancePenalty {
    fn default() -> Self {
        Self {
            high_threshold: 100.0,
            high_penalty: 20,
            moderate_threshold: 50.0,
            moderate_penalty: 10,
        }
    }
}

/// Static description of how one exercise is measured and scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseProfile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub angles: Vec<AngleDefinition>,
    #[serde(default = "default_extended")]
    pub extended_threshold: f64,
    #[serde(default = "default_flexed")]
    pub flexed_threshold: f64,
    /// Bilateral angle pairs compared by the symmetry check
    #[serde(default)]
    pub symmetry_pairs: Vec<(String, String)>,
    #[serde(default)]
    pub symmetry_tolerance: f64,
    #[serde(default)]
    pub symmetry_penalty: u32,
    #[serde(default)]
    pub variance_penalty: VariancePenalty,
    #[serde(default = "default_dwell")]
    pub min_dwell_ms: u64,
    #[serde(default = "default_floor")]
    pub visibility_floor: f64,
}

fn default_extended() -> f64 {
    DEFAULT_EXTENDED_THRESHOLD
}

fn default_flexed() -> f64 {
    DEFAULT_FLEXED_THRESHOLD
}

fn default_dwell() -> u64 {
    DEFAULT_MIN_DWELL_MS
}

fn default_floor() -> f64 {
    VISIBILITY_FLOOR
}

impl ExerciseProfile {
    fn elbow_cycle(id: &str, name: &str, tolerance: f64, penalty: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            angles: vec![
                AngleDefinition::new("left_elbow", LEFT_SHOULDER, LEFT_ELBOW, LEFT_WRIST),
                AngleDefinition::new("right_elbow", RIGHT_SHOULDER, RIGHT_ELBOW, RIGHT_WRIST),
            ],
            extended_threshold: DEFAULT_EXTENDED_THRESHOLD,
            flexed_threshold: DEFAULT_FLEXED_THRESHOLD,
            symmetry_pairs: vec![("left_elbow".into(), "right_elbow".into())],
            symmetry_tolerance: tolerance,
            symmetry_penalty: penalty,
            variance_penalty: VariancePenalty::default(),
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
            visibility_floor: VISIBILITY_FLOOR,
        }
    }

    pub fn pushup() -> Self {
        Self::elbow_cycle("pushup", "Push-ups", 20.0, 15)
    }

    pub fn pullup() -> Self {
        Self::elbow_cycle("pullup", "Pull-ups", 25.0, 20)
    }

    pub fn squat() -> Self {
        Self {
            id: "squat".to_string(),
            name: "Squats".to_string(),
            angles: vec![
                AngleDefinition::new("left_knee", LEFT_HIP, LEFT_KNEE, LEFT_ANKLE),
                AngleDefinition::new("right_knee", RIGHT_HIP, RIGHT_KNEE, RIGHT_ANKLE),
            ],
            extended_threshold: DEFAULT_EXTENDED_THRESHOLD,
            flexed_threshold: DEFAULT_FLEXED_THRESHOLD,
            symmetry_pairs: vec![("left_knee".into(), "right_knee".into())],
            symmetry_tolerance: 15.0,
            symmetry_penalty: 15,
            variance_penalty: VariancePenalty::default(),
            min_dwell_ms: DEFAULT_MIN_DWELL_MS,
            visibility_floor: VISIBILITY_FLOOR,
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![Self::pushup(), Self::squat(), Self::pullup()]
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Reject profiles that cannot be measured or classified.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EngineError::InvalidProfile(msg));

        if self.id.trim().is_empty() {
            return invalid("exercise identifier is empty".into());
        }
        if self.angles.is_empty() {
            return invalid(format!("{}: no angle definitions", self.id));
        }
        if let Some(dup) = self.angles.iter().map(|a| a.name.as_str()).duplicates().next() {
            return invalid(format!("{}: duplicate angle name '{}'", self.id, dup));
        }
        for def in &self.angles {
            if let Some(bad) = def.landmarks().into_iter().find(|&id| id >= LANDMARK_COUNT) {
                return invalid(format!(
                    "{}: angle '{}' references unknown landmark {}",
                    self.id, def.name, bad
                ));
            }
            if def.first == def.vertex || def.third == def.vertex {
                return invalid(format!(
                    "{}: angle '{}' reuses its vertex as an outer point",
                    self.id, def.name
                ));
            }
        }

        let in_range = |t: f64| t.is_finite() && (0.0..=180.0).contains(&t);
        if !in_range(self.extended_threshold) || !in_range(self.flexed_threshold) {
            return invalid(format!("{}: thresholds must lie in [0, 180]", self.id));
        }
        if self.flexed_threshold >= self.extended_threshold {
            return invalid(format!(
                "{}: flexed threshold {} must be below extended threshold {}",
                self.id, self.flexed_threshold, self.extended_threshold
            ));
        }

        for (left, right) in &self.symmetry_pairs {
            for side in [left, right] {
                if !self.angles.iter().any(|a| &a.name == side) {
                    return invalid(format!(
                        "{}: symmetry pair references undefined angle '{}'",
                        self.id, side
                    ));
                }
            }
        }
        if !self.symmetry_tolerance.is_finite() || self.symmetry_tolerance < 0.0 {
            return invalid(format!("{}: symmetry tolerance must be >= 0", self.id));
        }
        let tiers = &self.variance_penalty;
        if !tiers.high_threshold.is_finite()
            || !tiers.moderate_threshold.is_finite()
            || tiers.moderate_threshold < 0.0
        {
            return invalid(format!("{}: variance thresholds must be finite and >= 0", self.id));
        }
        if tiers.moderate_threshold > tiers.high_threshold {
            return invalid(format!(
                "{}: moderate variance threshold {} exceeds high threshold {}",
                self.id, tiers.moderate_threshold, tiers.high_threshold
            ));
        }
        if !(0.0..1.0).contains(&self.visibility_floor) {
            return invalid(format!("{}: visibility floor must lie in [0, 1)", self.id));
        }

        Ok(())
    }
}

/// Profiles available to the host, keyed by exercise identifier.
#[derive(Debug, Clone)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, ExerciseProfile>,
}

impl ProfileCatalog {
    pub fn builtin() -> Self {
        Self {
            profiles: ExerciseProfile::builtins()
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    /// Built-ins tuned by the config's global settings, then replaced by any
    /// custom profile carrying the same identifier.
    pub fn from_config(config: &Config) -> Self {
        let mut catalog = Self::builtin();
        for profile in catalog.profiles.values_mut() {
            profile.min_dwell_ms = config.min_dwell_ms;
            profile.visibility_floor = config.visibility_floor;
        }
        for custom in &config.profiles {
            catalog.insert(custom.clone());
        }
        catalog
    }

    pub fn insert(&mut self, profile: ExerciseProfile) {
        self.profiles.insert(profile.id.to_lowercase(), profile);
    }

    pub fn get(&self, id: &str) -> Result<&ExerciseProfile> {
        self.profiles
            .get(&id.to_lowercase())
            .ok_or_else(|| EngineError::UnknownExercise(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

impl Default for ProfileCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
