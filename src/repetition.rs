//! Debounced posture state machine that detects completed repetitions.
//!
//! A repetition completes exactly on an honoured `FLEXED -> EXTENDED` edge.
//! Posture changes arriving sooner than `min_dwell_ms` after the last honoured
//! transition are dropped without touching state.

use crate::posture::Posture;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Posture,
    pub to: Posture,
    pub at_ms: u64,
}

impl Transition {
    pub fn completes_rep(&self) -> bool {
        self.from == Posture::Flexed && self.to == Posture::Extended
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Same posture as the stored one
    Unchanged,
    /// Posture changed inside the dwell window and was ignored
    Debounced,
    Transitioned(Transition),
}

impl Step {
    pub fn completes_rep(&self) -> bool {
        matches!(self, Step::Transitioned(t) if t.completes_rep())
    }
}

#[derive(Debug, Clone)]
pub struct RepStateMachine {
    current: Posture,
    previous: Option<Posture>,
    last_transition_ms: Option<u64>,
    min_dwell_ms: u64,
}

impl RepStateMachine {
    /// Fresh machine in the ready (`EXTENDED`) posture.
    pub fn new(min_dwell_ms: u64) -> Self {
        Self {
            current: Posture::Extended,
            previous: None,
            last_transition_ms: None,
            min_dwell_ms,
        }
    }

    pub fn current(&self) -> Posture {
        self.current
    }

    pub fn previous(&self) -> Option<Posture> {
        self.previous
    }

    pub fn last_transition_ms(&self) -> Option<u64> {
        self.last_transition_ms
    }

    /// Feed the posture classified for the frame captured at `now_ms`.
    ///
    /// The first observation anchors the dwell clock: the ready posture is
    /// considered entered at that instant.
    pub fn observe(&mut self, posture: Posture, now_ms: u64) -> Step {
        let anchor = *self.last_transition_ms.get_or_insert(now_ms);

        if posture == self.current {
            return Step::Unchanged;
        }

        let elapsed = now_ms.saturating_sub(anchor);
        if elapsed < self.min_dwell_ms {
            trace!(
                from = %self.current,
                to = %posture,
                elapsed_ms = elapsed,
                "posture change inside dwell window ignored"
            );
            return Step::Debounced;
        }

        let transition = Transition {
            from: self.current,
            to: posture,
            at_ms: now_ms,
        };
        self.previous = Some(self.current);
        self.current = posture;
        self.last_transition_ms = Some(now_ms);
        debug!(from = %transition.from, to = %transition.to, at_ms = now_ms, "posture transition");

        Step::Transitioned(transition)
    }
}
