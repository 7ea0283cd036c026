//! Upstream backpressure with hysteresis
//!
//! Keeps the buffered look-ahead near the target without oscillating: the
//! source is paused above `required_buffer_secs` and not resumed until the
//! buffer drains below half of it. Between the two thresholds nothing
//! happens, so a source hovering at a boundary value never sees rapid
//! pause/resume toggling. Once the source has exhausted there is nothing
//! left to throttle and the remainder drains freely.

use tracing::debug;

use crate::source::SourceControl;

/// What the controller wants done to the source this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceAction {
    Pause,
    Resume,
}

/// Hysteresis-band backpressure controller
#[derive(Debug)]
pub struct OverflowController {
    required_buffer_secs: f64,
    paused_by_us: bool,
}

impl OverflowController {
    pub fn new(required_buffer_secs: f64) -> Self {
        Self {
            required_buffer_secs,
            paused_by_us: false,
        }
    }

    /// Reset for a freshly attached source
    pub fn reset(&mut self, required_buffer_secs: f64) {
        self.required_buffer_secs = required_buffer_secs;
        self.paused_by_us = false;
    }

    /// Whether the last action taken was a pause we have not yet undone
    pub fn paused_by_us(&self) -> bool {
        self.paused_by_us
    }

    /// Retarget the band without touching pause bookkeeping (reconfiguration
    /// while a source stays attached)
    pub fn set_required_buffer_secs(&mut self, required_buffer_secs: f64) {
        self.required_buffer_secs = required_buffer_secs;
    }

    /// Decide this cycle's action from the buffered duration
    ///
    /// `source_reports_paused` lets an externally paused source be resumed
    /// once the buffer drains, matching the pause lever being shared with
    /// the host.
    pub fn evaluate(
        &mut self,
        cached_seconds: f64,
        source_exhausted: bool,
        source_reports_paused: bool,
    ) -> Option<SourceAction> {
        if source_exhausted {
            return None;
        }

        if !self.paused_by_us && cached_seconds > self.required_buffer_secs {
            self.paused_by_us = true;
            debug!(cached_seconds, "buffer above target, pausing source");
            return Some(SourceAction::Pause);
        }

        if cached_seconds < self.required_buffer_secs / 2.0
            && (self.paused_by_us || source_reports_paused)
        {
            self.paused_by_us = false;
            debug!(cached_seconds, "buffer below half target, resuming source");
            return Some(SourceAction::Resume);
        }

        None
    }

    /// Apply a decision to the source control handle
    pub fn apply(action: SourceAction, source: &dyn SourceControl) {
        match action {
            SourceAction::Pause => source.pause(),
            SourceAction::Resume => source.resume(),
        }
    }
}
