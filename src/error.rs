use thiserror::Error;

/// Failures the recognition engine reports back to its caller.
///
/// Every variant is local and recoverable: the frame loop keeps running and
/// the aggregator state is left as it was before the failing call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed exercise profile, rejected before any frame is processed
    #[error("invalid exercise profile: {0}")]
    InvalidProfile(String),

    /// Call made in the wrong session state (start while active, frame/stop while idle)
    #[error("session state error: {0}")]
    SessionState(String),

    /// `stop()` with zero completed repetitions
    #[error("no repetitions recorded; complete at least one rep before stopping")]
    EmptySession,

    /// No profile registered under the requested exercise identifier
    #[error("unknown exercise: {0}")]
    UnknownExercise(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// Failures of the summary persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
