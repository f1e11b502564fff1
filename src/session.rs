//! Session aggregation: drives the per-frame pipeline for one workout and
//! collects its repetitions into a summary.

use crate::angles::{compute_angles, AngleMap};
use crate::error::{EngineError, Result};
use crate::landmark::LandmarkFrame;
use crate::posture::{classify_angle, mean_angle, AngleSmoother, Posture};
use crate::profile::ExerciseProfile;
use crate::repetition::RepStateMachine;
use crate::scoring::score_form;
use crate::util::{mean, round_to};
use serde::{Deserialize, Serialize};
use tracing::{info, trace, warn};

/// User-facing hint attached to every processed frame.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Feedback {
    Reposition,
    InExtended,
    InFlexed,
    Transitioning,
}

impl Feedback {
    pub fn for_posture(posture: Posture) -> Self {
        match posture {
            Posture::Extended => Feedback::InExtended,
            Posture::Flexed => Feedback::InFlexed,
            Posture::Transitional => Feedback::Transitioning,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Feedback::Reposition => "Position yourself better in the camera view",
            Feedback::InExtended => "Good position! Now go down",
            Feedback::InFlexed => "Perfect! Now push/pull up",
            Feedback::Transitioning => "Keep going...",
        }
    }
}

/// One completed repetition. Also emitted as the per-rep event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepetitionRecord {
    /// 1-based, gapless within a session
    pub sequence: u32,
    pub accuracy: u8,
    pub angles: AngleMap,
    pub timestamp_ms: u64,
}

/// Per-frame state event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateEvent {
    pub timestamp_ms: u64,
    pub posture: Posture,
    pub rep_count: usize,
    pub feedback: Feedback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameOutcome {
    pub state: StateEvent,
    pub rep: Option<RepetitionRecord>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Intensity {
    Low,
    Moderate,
    High,
    VeryHigh,
}

/// Finalized workout, the only object handed to storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub exercise: String,
    pub started_at_ms: u64,
    pub ended_at_ms: u64,
    pub duration_secs: f64,
    pub rep_count: usize,
    pub mean_accuracy: f64,
    pub records: Vec<RepetitionRecord>,
}

impl SessionSummary {
    /// Rough energy estimate from per-rep constants.
    pub fn calories_burned(&self) -> u32 {
        let per_rep = match self.exercise.as_str() {
            "pushup" => 0.5,
            "pullup" => 1.0,
            "squat" => 0.4,
            _ => 0.5,
        };
        (self.rep_count as f64 * per_rep).round() as u32
    }

    pub fn reps_per_minute(&self) -> Option<f64> {
        (self.duration_secs > 0.0).then(|| self.rep_count as f64 / (self.duration_secs / 60.0))
    }

    pub fn intensity(&self) -> Intensity {
        match self.reps_per_minute() {
            Some(rpm) if rpm < 10.0 => Intensity::Low,
            Some(rpm) if rpm < 20.0 => Intensity::Moderate,
            Some(rpm) if rpm < 30.0 => Intensity::High,
            _ => Intensity::VeryHigh,
        }
    }
}

#[derive(Debug)]
struct ActiveSession {
    profile: ExerciseProfile,
    machine: RepStateMachine,
    smoother: Option<AngleSmoother>,
    started_at_ms: u64,
    records: Vec<RepetitionRecord>,
    last_feedback: Feedback,
}

impl ActiveSession {
    fn state_event(&self, timestamp_ms: u64) -> StateEvent {
        StateEvent {
            timestamp_ms,
            posture: self.machine.current(),
            rep_count: self.records.len(),
            feedback: self.last_feedback,
        }
    }

    fn mean_accuracy(&self) -> Option<f64> {
        let scores: Vec<f64> = self.records.iter().map(|r| f64::from(r.accuracy)).collect();
        mean(&scores)
    }
}

/// Owns the working state of at most one workout at a time.
#[derive(Debug, Default)]
pub struct SessionAggregator {
    active: Option<ActiveSession>,
    smoothing_alpha: Option<f64>,
}

impl SessionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Smooth the mean angle with the given weight before classification.
    pub fn with_smoothing(alpha: Option<f64>) -> Self {
        Self {
            active: None,
            smoothing_alpha: alpha,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn exercise(&self) -> Option<&str> {
        self.active.as_ref().map(|s| s.profile.id.as_str())
    }

    pub fn rep_count(&self) -> Option<usize> {
        self.active.as_ref().map(|s| s.records.len())
    }

    pub fn posture(&self) -> Option<Posture> {
        self.active.as_ref().map(|s| s.machine.current())
    }

    pub fn records(&self) -> Option<&[RepetitionRecord]> {
        self.active.as_ref().map(|s| s.records.as_slice())
    }

    /// Running mean accuracy of the reps so far.
    pub fn running_accuracy(&self) -> Option<f64> {
        self.active.as_ref().and_then(ActiveSession::mean_accuracy)
    }

    /// Begin a workout with `profile`, captured at `at_ms` on the frame clock.
    pub fn start(&mut self, profile: &ExerciseProfile, at_ms: u64) -> Result<()> {
        if let Some(active) = &self.active {
            warn!(exercise = %active.profile.id, "start rejected: session already active");
            return Err(EngineError::SessionState(format!(
                "a {} session is already active",
                active.profile.id
            )));
        }
        profile.validate()?;

        self.active = Some(ActiveSession {
            profile: profile.clone(),
            machine: RepStateMachine::new(profile.min_dwell_ms),
            smoother: self.smoothing_alpha.map(AngleSmoother::new),
            started_at_ms: at_ms,
            records: Vec::new(),
            last_feedback: Feedback::InExtended,
        });
        info!(exercise = %profile.id, at_ms, "session started");
        Ok(())
    }

    /// Run one frame through angle measurement, classification, the state
    /// machine and (on a completed rep) scoring.
    pub fn on_frame(&mut self, frame: &LandmarkFrame) -> Result<FrameOutcome> {
        let session = self.active.as_mut().ok_or_else(|| {
            EngineError::SessionState("frame received with no active session".into())
        })?;
        let now = frame.timestamp_ms;

        let angles = compute_angles(frame, &session.profile);
        let Some(raw_mean) = mean_angle(&angles) else {
            trace!(at_ms = now, "insufficient landmarks; asking user to reposition");
            session.last_feedback = Feedback::Reposition;
            return Ok(FrameOutcome {
                state: session.state_event(now),
                rep: None,
            });
        };

        let signal = match session.smoother.as_mut() {
            Some(smoother) => smoother.update(raw_mean),
            None => raw_mean,
        };
        let posture = classify_angle(signal, &session.profile);
        session.last_feedback = Feedback::for_posture(posture);

        let rep = if session.machine.observe(posture, now).completes_rep() {
            let record = RepetitionRecord {
                sequence: session.records.len() as u32 + 1,
                accuracy: score_form(&angles, &session.profile),
                angles,
                timestamp_ms: now,
            };
            info!(
                exercise = %session.profile.id,
                sequence = record.sequence,
                accuracy = record.accuracy,
                "repetition completed"
            );
            session.records.push(record.clone());
            Some(record)
        } else {
            None
        };

        Ok(FrameOutcome {
            state: session.state_event(now),
            rep,
        })
    }

    /// Finalize the active workout at `at_ms` and clear working state.
    ///
    /// With zero reps the session stays active so the caller can keep going
    /// or [`abandon`](Self::abandon) it.
    pub fn stop(&mut self, at_ms: u64) -> Result<SessionSummary> {
        let session = self.active.take().ok_or_else(|| {
            EngineError::SessionState("stop requested with no active session".into())
        })?;
        let Some(mean_accuracy) = session.mean_accuracy() else {
            warn!(exercise = %session.profile.id, "stop rejected: no repetitions recorded");
            self.active = Some(session);
            return Err(EngineError::EmptySession);
        };

        let duration_ms = at_ms.saturating_sub(session.started_at_ms);
        let summary = SessionSummary {
            exercise: session.profile.id,
            started_at_ms: session.started_at_ms,
            ended_at_ms: at_ms,
            duration_secs: duration_ms as f64 / 1000.0,
            rep_count: session.records.len(),
            mean_accuracy: round_to(mean_accuracy, 2),
            records: session.records,
        };
        info!(
            exercise = %summary.exercise,
            reps = summary.rep_count,
            mean_accuracy = summary.mean_accuracy,
            duration_secs = summary.duration_secs,
            "session finished"
        );
        Ok(summary)
    }

    /// Drop the active workout without producing a summary.
    pub fn abandon(&mut self) -> bool {
        match self.active.take() {
            Some(session) => {
                info!(
                    exercise = %session.profile.id,
                    reps = session.records.len(),
                    "session abandoned"
                );
                true
            }
            None => false,
        }
    }
}
