//! Engine state machine
//!
//! One primary state plus one orthogonal paused bit, with every transition
//! funneled through this module instead of scattered flag checks:
//!
//! ```text
//! Unattached -> Loading -> Ready -> AlmostFinished -> Finished
//!                   \________\___________\_____________/
//!                                                 Stopped (terminal)
//! ```
//!
//! `Loading` may skip `Ready` (a source that exhausts before buffering half
//! the target never becomes ready) and any state may jump to `Finished` or
//! `Stopped`. Once `Stopped`, nothing changes again.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Primary engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacerState {
    /// No source attached yet
    Unattached,
    /// Source attached, buffering toward the ready threshold
    Loading,
    /// Enough look-ahead buffered for live delivery
    Ready,
    /// Source exhausted and the buffered remainder is nearly drained
    AlmostFinished,
    /// Delivery complete
    Finished,
    /// Terminal; set by `stop()`
    Stopped,
}

impl std::fmt::Display for PacerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacerState::Unattached => write!(f, "unattached"),
            PacerState::Loading => write!(f, "loading"),
            PacerState::Ready => write!(f, "ready"),
            PacerState::AlmostFinished => write!(f, "almost-finished"),
            PacerState::Finished => write!(f, "finished"),
            PacerState::Stopped => write!(f, "stopped"),
        }
    }
}

/// State machine with centrally enforced transitions
///
/// The `mark_*` methods return whether the transition happened now, which is
/// what gates each lifecycle event to at most one emission per source.
#[derive(Debug)]
pub struct StateMachine {
    state: PacerState,
    paused: bool,
    source_exhausted: bool,
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: PacerState::Unattached,
            paused: false,
            source_exhausted: false,
        }
    }

    pub fn state(&self) -> PacerState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_stopped(&self) -> bool {
        self.state == PacerState::Stopped
    }

    /// Finished or stopped: no further dispatching
    pub fn is_finished(&self) -> bool {
        matches!(self.state, PacerState::Finished | PacerState::Stopped)
    }

    pub fn is_attached(&self) -> bool {
        !matches!(self.state, PacerState::Unattached)
    }

    pub fn source_exhausted(&self) -> bool {
        self.source_exhausted
    }

    /// A new source was attached: restart the per-source lifecycle
    ///
    /// The paused bit deliberately survives attachment; pausing is the
    /// caller's toggle, not a property of one source.
    pub fn attach(&mut self) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::InvalidState(
                "cannot attach a source when stopped".into(),
            ));
        }
        self.state = PacerState::Loading;
        self.source_exhausted = false;
        Ok(())
    }

    /// Upstream signaled end-of-stream
    pub fn mark_exhausted(&mut self) {
        if !self.is_stopped() {
            self.source_exhausted = true;
        }
    }

    /// Ready threshold crossed; returns true on the Loading -> Ready edge
    pub fn mark_ready(&mut self) -> bool {
        if self.state == PacerState::Loading {
            self.state = PacerState::Ready;
            true
        } else {
            false
        }
    }

    /// Buffer nearly drained after exhaustion; true on the first crossing
    pub fn mark_almost_finished(&mut self) -> bool {
        match self.state {
            PacerState::Loading | PacerState::Ready => {
                self.state = PacerState::AlmostFinished;
                true
            }
            _ => false,
        }
    }

    /// Delivery complete; true when this call performed the transition
    pub fn finish(&mut self) -> bool {
        if self.is_finished() {
            return false;
        }
        self.state = PacerState::Finished;
        true
    }

    /// Enter the terminal state; true when this call performed the transition
    pub fn stop(&mut self) -> bool {
        if self.is_stopped() {
            return false;
        }
        self.state = PacerState::Stopped;
        true
    }

    /// Toggle the paused bit, returning its new value
    pub fn toggle_pause(&mut self) -> Result<bool> {
        if self.is_stopped() {
            return Err(Error::InvalidState("cannot pause when stopped".into()));
        }
        self.paused = !self.paused;
        Ok(self.paused)
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}
