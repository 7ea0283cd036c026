//! Drift compensation against a remote playback clock
//!
//! The engine only consumes remote progress through this oracle; how the
//! remote side computes its playback time is out of scope. Each cycle the
//! compensator compares local played time against the remote's and decides
//! whether this cycle's dispatch should be held, and how much to shave off
//! the next wake interval.

use tracing::trace;

/// Oracle over the remote peer's playback progress
///
/// Supplied by the host; absence disables compensation entirely.
pub trait RemoteClock: Send + Sync {
    /// Remote playback position in seconds, when known
    fn playing_time(&self) -> Option<f64>;

    /// Whether the remote reports its own playback as lagging
    fn is_lagging(&self) -> bool;
}

/// Added wake delay per second of local lead
const DELAY_MS_PER_SECOND_AHEAD: f64 = 1000.0;

/// Per-cycle drift assessment state
#[derive(Debug, Default)]
pub struct DriftCompensator {
    last_delay_ms: f64,
}

impl DriftCompensator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget accumulated delay (new source attached)
    pub fn reset(&mut self) {
        self.last_delay_ms = 0.0;
    }

    /// Milliseconds to subtract from the next wake interval
    pub fn delay_ms(&self) -> f64 {
        self.last_delay_ms
    }

    /// Assess drift for this cycle
    ///
    /// Returns true when dispatch should be held:
    /// - local ahead of remote: hold, and slow future wakes proportionally
    ///   to the lead;
    /// - remote behind and reporting itself lagging: hold for one natural
    ///   cycle with no added slow-down.
    ///
    /// Compensation is disabled with no oracle, while paused, or when local
    /// played time is unavailable (unattached or finished).
    pub fn assess(
        &mut self,
        local_secs: Option<f64>,
        remote: Option<&dyn RemoteClock>,
        paused: bool,
    ) -> bool {
        let (Some(remote), Some(local), false) = (remote, local_secs, paused) else {
            return false;
        };
        let Some(remote_secs) = remote.playing_time() else {
            return false;
        };

        if local > remote_secs {
            self.last_delay_ms = (local - remote_secs) * DELAY_MS_PER_SECOND_AHEAD;
            trace!(
                local,
                remote = remote_secs,
                delay_ms = self.last_delay_ms,
                "local ahead of remote, holding dispatch"
            );
            return true;
        }

        if remote.is_lagging() && remote_secs > local {
            // Remote is behind and struggling: wait one cycle, no penalty
            self.last_delay_ms = 0.0;
            trace!(local, remote = remote_secs, "remote lagging, holding dispatch");
            return true;
        }

        self.last_delay_ms = 0.0;
        false
    }
}
