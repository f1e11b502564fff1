//! Landmark frames as delivered by the pose-estimation source.
//!
//! Identifiers follow the 33-point BlazePose numbering. Frames from a
//! 17-keypoint MoveNet model are remapped into that numbering on entry so
//! profiles only ever reference one scheme.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NOSE: usize = 0;
pub const LEFT_EYE: usize = 2;
pub const RIGHT_EYE: usize = 5;
pub const LEFT_EAR: usize = 7;
pub const RIGHT_EAR: usize = 8;
pub const LEFT_SHOULDER: usize = 11;
pub const RIGHT_SHOULDER: usize = 12;
pub const LEFT_ELBOW: usize = 13;
pub const RIGHT_ELBOW: usize = 14;
pub const LEFT_WRIST: usize = 15;
pub const RIGHT_WRIST: usize = 16;
pub const LEFT_HIP: usize = 23;
pub const RIGHT_HIP: usize = 24;
pub const LEFT_KNEE: usize = 25;
pub const RIGHT_KNEE: usize = 26;
pub const LEFT_ANKLE: usize = 27;
pub const RIGHT_ANKLE: usize = 28;

/// Number of points in the BlazePose scheme; valid identifiers are `0..LANDMARK_COUNT`.
pub const LANDMARK_COUNT: usize = 33;

/// Default confidence floor; landmarks at or below it are treated as absent.
pub const VISIBILITY_FLOOR: f64 = 0.5;

/// MoveNet keypoints scoring at or below this are dropped during remapping.
pub const MOVENET_MIN_SCORE: f64 = 0.3;

/// MoveNet keypoint index -> BlazePose landmark identifier
pub const MOVENET_TO_BLAZEPOSE: [usize; 17] = [
    NOSE,
    LEFT_EYE,
    RIGHT_EYE,
    LEFT_EAR,
    RIGHT_EAR,
    LEFT_SHOULDER,
    RIGHT_SHOULDER,
    LEFT_ELBOW,
    RIGHT_ELBOW,
    LEFT_WRIST,
    RIGHT_WRIST,
    LEFT_HIP,
    RIGHT_HIP,
    LEFT_KNEE,
    RIGHT_KNEE,
    LEFT_ANKLE,
    RIGHT_ANKLE,
];

/// A single tracked body point, normalized to the capture frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub id: usize,
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(alias = "visibility", alias = "score")]
    pub confidence: f64,
}

impl Landmark {
    pub fn new(id: usize, x: f64, y: f64, confidence: f64) -> Self {
        Self {
            id,
            x,
            y,
            z: None,
            confidence,
        }
    }

    pub fn is_visible(&self, floor: f64) -> bool {
        self.confidence > floor
    }
}

/// One timestamped snapshot of body landmarks. Immutable once built.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LandmarkFrame {
    pub timestamp_ms: u64,
    landmarks: BTreeMap<usize, Landmark>,
}

impl LandmarkFrame {
    pub fn new<I>(timestamp_ms: u64, landmarks: I) -> Self
    where
        I: IntoIterator<Item = Landmark>,
    {
        Self {
            timestamp_ms,
            landmarks: landmarks.into_iter().map(|l| (l.id, l)).collect(),
        }
    }

    /// Build a frame from MoveNet keypoints, where each keypoint's `id` is its
    /// MoveNet index (0..17).
    pub fn from_movenet<I>(timestamp_ms: u64, keypoints: I) -> Self
    where
        I: IntoIterator<Item = Landmark>,
    {
        let remapped = keypoints.into_iter().filter_map(|kp| {
            let target = *MOVENET_TO_BLAZEPOSE.get(kp.id)?;
            if kp.confidence <= MOVENET_MIN_SCORE {
                return None;
            }
            Some(Landmark { id: target, ..kp })
        });
        Self::new(timestamp_ms, remapped)
    }

    pub fn get(&self, id: usize) -> Option<&Landmark> {
        self.landmarks.get(&id)
    }

    /// Landmark `id` if present and above `floor`.
    pub fn visible(&self, id: usize, floor: f64) -> Option<&Landmark> {
        self.get(id).filter(|l| l.is_visible(floor))
    }

    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.values()
    }
}

/// Wire shape of one frame in a JSON-lines stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub timestamp_ms: u64,
    pub landmarks: Vec<Landmark>,
}

impl FrameRecord {
    pub fn into_frame(self, movenet: bool) -> LandmarkFrame {
        if movenet {
            LandmarkFrame::from_movenet(self.timestamp_ms, self.landmarks)
        } else {
            LandmarkFrame::new(self.timestamp_ms, self.landmarks)
        }
    }
}

impl From<&LandmarkFrame> for FrameRecord {
    fn from(frame: &LandmarkFrame) -> Self {
        Self {
            timestamp_ms: frame.timestamp_ms,
            landmarks: frame.iter().copied().collect(),
        }
    }
}
