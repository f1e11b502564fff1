// Library surface for the binary, integration tests and embedding hosts.
// The engine modules (angles through session) do no I/O; config, runtime and
// store are host-side plumbing.
pub mod angles;
pub mod app_dirs;
pub mod config;
pub mod error;
pub mod landmark;
pub mod posture;
pub mod profile;
pub mod repetition;
pub mod runtime;
pub mod scoring;
pub mod session;
pub mod store;
pub mod util;

pub use error::{EngineError, StoreError};
pub use landmark::{Landmark, LandmarkFrame};
pub use posture::Posture;
pub use profile::{ExerciseProfile, ProfileCatalog};
pub use session::{Feedback, RepetitionRecord, SessionAggregator, SessionSummary, StateEvent};

/// How long the frame loop waits for a frame before reporting idle.
pub const TICK_RATE_MS: u64 = 100;
