use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use tracing::warn;

use crate::landmark::{FrameRecord, LandmarkFrame};

/// Unified event type consumed by the frame loop
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    Frame(LandmarkFrame),
    /// A line of input that could not be parsed as a frame
    Malformed { line: usize, error: String },
    /// The pose source has no more frames
    EndOfStream,
    /// No frame arrived within the tick interval
    Idle,
}

/// Source of landmark frames (pose model output, recorded stream, etc.)
pub trait FrameSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<FrameEvent, RecvTimeoutError>;
}

/// Reads JSON-lines frames on a background thread
pub struct ReaderFrameSource {
    rx: Receiver<FrameEvent>,
}

impl ReaderFrameSource {
    /// `movenet` remaps 17-keypoint input into the 33-point numbering.
    pub fn new<R>(reader: R, movenet: bool) -> Self
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || {
            for (idx, line) in reader.split(b'\n').enumerate() {
                let line_no = idx + 1;
                let bytes = match line {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        warn!(line = line_no, error = %e, "frame stream read failed");
                        break;
                    }
                };
                let event = match String::from_utf8(bytes) {
                    Ok(text) if text.trim().is_empty() => continue,
                    Ok(text) => parse_line(line_no, &text, movenet),
                    Err(e) => FrameEvent::Malformed {
                        line: line_no,
                        error: e.to_string(),
                    },
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
            let _ = tx.send(FrameEvent::EndOfStream);
        });

        Self { rx }
    }
}

fn parse_line(line_no: usize, text: &str, movenet: bool) -> FrameEvent {
    match serde_json::from_str::<FrameRecord>(text) {
        Ok(record) => FrameEvent::Frame(record.into_frame(movenet)),
        Err(e) => FrameEvent::Malformed {
            line: line_no,
            error: e.to_string(),
        },
    }
}

impl FrameSource for ReaderFrameSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FrameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test frame source for unit tests
pub struct TestFrameSource {
    rx: Receiver<FrameEvent>,
}

impl TestFrameSource {
    pub fn new(rx: Receiver<FrameEvent>) -> Self {
        Self { rx }
    }
}

impl FrameSource for TestFrameSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<FrameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the frame loop one event at a time
pub struct Runner<S: FrameSource, T: Ticker> {
    source: S,
    ticker: T,
}

impl<S: FrameSource, T: Ticker> Runner<S, T> {
    pub fn new(source: S, ticker: T) -> Self {
        Self { source, ticker }
    }

    /// Blocks up to tick interval and returns the next event, Idle on timeout,
    /// or EndOfStream once the source has gone away
    pub fn step(&self) -> FrameEvent {
        match self.source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => FrameEvent::Idle,
            Err(RecvTimeoutError::Disconnected) => FrameEvent::EndOfStream,
        }
    }
}
