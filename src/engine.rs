//! Pacing engine orchestration
//!
//! Coordinates the chunk buffer, overflow backpressure, drift compensation,
//! and the state machine around a self-rescheduling delivery loop.
//!
//! Concurrency model: one `tokio::sync::RwLock` guards all mutable engine
//! state. Each pacing cycle runs synchronously under a single write-lock
//! acquisition — no await inside a cycle — so cycles never overlap and the
//! ingest path (`push_chunk`) interleaves only between cycles. The producer
//! appends to the back of the buffer, the cycle consumes from the front.
//! The loop re-checks the terminal state at the top of every cycle, before
//! any side effect, so `stop()` guarantees no post-stop dispatch.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::{broadcast, RwLock};
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use crate::buffer::ChunkBuffer;
use crate::config::{FrameSpec, MediaKind, StreamOptions};
use crate::drift::{DriftCompensator, RemoteClock};
use crate::error::{Error, Result};
use crate::events::{EventBus, PacerEvent};
use crate::overflow::OverflowController;
use crate::sink::{MediaPayload, MediaSink};
use crate::source::SourceControl;
use crate::state::{PacerState, StateMachine};

/// Wake interval when delivery is not eligible (idle, paused, starving)
const IDLE_INTERVAL_MS: f64 = 500.0;

/// Floor for the next wake; a drift penalty can shrink the interval but the
/// loop must always yield to the timer
const MIN_WAKE_MS: f64 = 1.0;

/// Buffered duration below which an active source counts as starving
const STARVATION_THRESHOLD_SECS: f64 = 1.0;

struct PacerInner {
    spec: FrameSpec,
    buffer: ChunkBuffer,
    machine: StateMachine,
    overflow: OverflowController,
    drift: DriftCompensator,
    source: Option<Box<dyn SourceControl>>,
    remote: Option<Arc<dyn RemoteClock>>,
    played_bytes: u64,
}

impl PacerInner {
    fn cached_seconds(&self) -> f64 {
        self.spec.seconds_for_bytes(self.buffer.total_bytes())
    }

    /// Local played time in seconds; unavailable when unattached or finished
    fn played_seconds(&self) -> Option<f64> {
        if !self.machine.is_attached() || self.machine.is_finished() {
            return None;
        }
        Some(self.spec.seconds_for_bytes(self.played_bytes))
    }

    /// An attached, unthrottled source whose buffer has run critically low
    fn is_starving(&self) -> bool {
        if self.machine.source_exhausted() || self.overflow.paused_by_us() {
            return false;
        }
        self.cached_seconds() < STARVATION_THRESHOLD_SECS
    }

    /// Eligible for the nominal per-frame interval, as opposed to idling
    fn delivery_active(&self) -> bool {
        self.machine.is_attached()
            && !self.machine.is_finished()
            && !self.machine.is_paused()
            && !self.is_starving()
    }

    fn payload_for<'a>(&self, frame: &'a [u8]) -> MediaPayload<'a> {
        match self.spec.kind {
            MediaKind::Video => MediaPayload::Video {
                data: frame,
                width: self.spec.video.width,
                height: self.spec.video.height,
            },
            MediaKind::Audio => MediaPayload::Audio {
                data: frame,
                bits_per_sample: self.spec.audio.bits_per_sample,
                sample_rate: self.spec.audio.sample_rate,
                channel_count: self.spec.audio.channel_count,
                frame_count: self.spec.samples_per_channel(frame.len()),
            },
        }
    }
}

/// Real-time pacing engine for a push-delivered media byte stream
///
/// Construction wires a [`MediaSink`]; `start()` spawns the pacing loop;
/// `set_source` attaches an upstream producer which then feeds bytes through
/// `push_chunk` / `end_of_stream`. Lifecycle is observed through
/// [`subscribe`](Self::subscribe).
pub struct StreamPacer {
    inner: Arc<RwLock<PacerInner>>,
    events: Arc<EventBus>,
    sink: Arc<dyn MediaSink>,
    running: Arc<AtomicBool>,
}

impl StreamPacer {
    /// Create a new engine for the given options and sink
    pub fn new(options: StreamOptions, sink: Arc<dyn MediaSink>) -> Self {
        let spec = FrameSpec::resolve(&options);
        debug!(
            kind = %spec.kind,
            frame_byte_length = spec.frame_byte_length(),
            required_buffer_secs = spec.required_buffer_secs(),
            "creating pacing engine"
        );
        Self {
            inner: Arc::new(RwLock::new(PacerInner {
                spec,
                buffer: ChunkBuffer::new(),
                machine: StateMachine::new(),
                overflow: OverflowController::new(spec.required_buffer_secs()),
                drift: DriftCompensator::new(),
                source: None,
                remote: None,
                played_bytes: 0,
            })),
            events: Arc::new(EventBus::default()),
            sink,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<PacerEvent> {
        self.events.subscribe()
    }

    /// Install or remove the remote playback oracle
    ///
    /// With no oracle installed, drift compensation is disabled.
    pub async fn set_remote_clock(&self, remote: Option<Arc<dyn RemoteClock>>) {
        self.inner.write().await.remote = remote;
    }

    /// Reconfigure stream parameters, recomputing frame geometry
    pub async fn set_options(&self, options: StreamOptions) {
        let spec = FrameSpec::resolve(&options);
        let mut inner = self.inner.write().await;
        inner.spec = spec;
        inner
            .overflow
            .set_required_buffer_secs(spec.required_buffer_secs());
        info!(
            kind = %inner.spec.kind,
            frame_byte_length = inner.spec.frame_byte_length(),
            "stream options updated"
        );
    }

    /// Spawn the self-rescheduling pacing loop
    ///
    /// Idempotent while running; fails once the engine is stopped.
    pub async fn start(&self) -> Result<()> {
        if self.inner.read().await.machine.is_stopped() {
            return Err(Error::InvalidState("cannot start when stopped".into()));
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("pacing loop already running");
            return Ok(());
        }

        let inner = Arc::clone(&self.inner);
        let events = Arc::clone(&self.events);
        let sink = Arc::clone(&self.sink);
        tokio::spawn(async move {
            info!("pacing loop started");
            loop {
                let wait = {
                    let mut guard = inner.write().await;
                    // Terminal check before any side effect
                    if guard.machine.is_stopped() {
                        break;
                    }
                    Self::cycle(&mut guard, &events, sink.as_ref())
                };
                sleep(wait).await;
            }
            info!("pacing loop exited");
        });
        Ok(())
    }

    /// Attach a new source, detaching and releasing any previous one
    ///
    /// Resets the buffer, counters, drift state, and the per-source
    /// lifecycle; the paused bit is preserved.
    pub async fn set_source(&self, source: Box<dyn SourceControl>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.machine.attach()?;
        if let Some(old) = inner.source.take() {
            debug!("releasing previous source");
            old.release();
        }
        inner.buffer.clear();
        inner.played_bytes = 0;
        inner.drift.reset();
        let required = inner.spec.required_buffer_secs();
        inner.overflow.reset(required);
        inner.source = Some(source);
        info!("source attached, loading");
        Ok(())
    }

    /// Data-arrival signal from the source adapter
    ///
    /// Appends to the back of the frame buffer and fires `ready` once the
    /// buffered duration first crosses half the look-ahead target. Ignored
    /// when no source is attached or after stop.
    pub async fn push_chunk(&self, chunk: Bytes) {
        let mut inner = self.inner.write().await;
        if inner.machine.is_stopped() || !inner.machine.is_attached() {
            trace!(len = chunk.len(), "dropping chunk, engine not accepting data");
            return;
        }
        inner.buffer.append(chunk);

        if inner.cached_seconds() > inner.spec.required_buffer_secs() / 2.0
            && inner.machine.mark_ready()
        {
            info!(
                cached_seconds = inner.cached_seconds(),
                "buffered past half target, ready to play"
            );
            self.events.emit_lossy(PacerEvent::ReadyToPlay {
                timestamp: Utc::now(),
            });
        }
    }

    /// End-of-stream signal from the source adapter
    ///
    /// The buffered remainder drains unthrottled from here on.
    pub async fn end_of_stream(&self) {
        let mut inner = self.inner.write().await;
        if !inner.machine.is_attached() || inner.machine.is_stopped() {
            return;
        }
        info!("source signaled end of stream");
        inner.machine.mark_exhausted();
    }

    /// Toggle the paused bit, returning its new value
    pub async fn pause(&self) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let paused = inner.machine.toggle_pause()?;
        info!(paused, "pause toggled");
        self.events.emit_lossy(PacerEvent::PauseToggled {
            paused,
            timestamp: Utc::now(),
        });
        Ok(paused)
    }

    /// Stop the engine: force finish, enter the terminal state, release the
    /// source
    ///
    /// Idempotent. All further mutating calls fail with an invalid-state
    /// error; the pacing loop exits at its next wake without side effects.
    pub async fn stop(&self) {
        let mut inner = self.inner.write().await;
        if inner.machine.is_stopped() {
            return;
        }
        if inner.machine.finish() {
            self.events.emit_lossy(PacerEvent::Finished {
                timestamp: Utc::now(),
            });
        }
        inner.machine.stop();
        if let Some(source) = inner.source.take() {
            source.release();
        }
        info!("engine stopped");
    }

    /// Current primary state
    pub async fn state(&self) -> PacerState {
        self.inner.read().await.machine.state()
    }

    pub async fn is_paused(&self) -> bool {
        self.inner.read().await.machine.is_paused()
    }

    pub async fn is_stopped(&self) -> bool {
        self.inner.read().await.machine.is_stopped()
    }

    pub async fn is_finished(&self) -> bool {
        self.inner.read().await.machine.is_finished()
    }

    /// Seconds of media currently buffered
    pub async fn cached_seconds(&self) -> f64 {
        self.inner.read().await.cached_seconds()
    }

    /// Local played time in seconds; `None` when unattached or finished
    pub async fn played_seconds(&self) -> Option<f64> {
        self.inner.read().await.played_seconds()
    }

    /// Whether an active source's buffer has run critically low
    pub async fn is_starving(&self) -> bool {
        self.inner.read().await.is_starving()
    }

    /// One pacing cycle; returns the interval until the next wake
    ///
    /// Runs synchronously under the engine lock: drift assessment, overflow
    /// decision, interval computation, at most one dispatch, then the
    /// exhaustion transitions.
    fn cycle(inner: &mut PacerInner, events: &EventBus, sink: &dyn MediaSink) -> Duration {
        // 1. Drift: should this cycle's dispatch be held, and by how much
        //    should future wakes slow down
        let local = inner.played_seconds();
        let paused = inner.machine.is_paused();
        let hold = inner.drift.assess(local, inner.remote.as_deref(), paused);

        // 2. Backpressure on the upstream source
        let cached = inner.cached_seconds();
        if inner.source.is_some() {
            let reports_paused = inner.source.as_deref().is_some_and(|s| s.is_paused());
            let action =
                inner
                    .overflow
                    .evaluate(cached, inner.machine.source_exhausted(), reports_paused);
            if let (Some(action), Some(source)) = (action, inner.source.as_deref()) {
                OverflowController::apply(action, source);
            }
        }

        // 3-4. Next wake: nominal frame interval when actively delivering,
        //      long idle tick otherwise, minus the drift penalty
        let base_ms = if inner.delivery_active() {
            inner.spec.frame_interval_ms()
        } else {
            trace!(
                state = %inner.machine.state(),
                cached_seconds = cached,
                "delivery idle this cycle"
            );
            IDLE_INTERVAL_MS
        };
        let wait_ms = (base_ms - inner.drift.delay_ms()).max(MIN_WAKE_MS);

        // 5. Dispatch at most one frame
        let frame_len = inner.spec.frame_byte_length();
        let exhausted = inner.machine.source_exhausted();
        let can_dispatch = !paused
            && !inner.machine.is_finished()
            && !hold
            && (inner.buffer.total_bytes() >= frame_len as u64 || exhausted);
        if can_dispatch {
            let frame = inner.buffer.extract_frame(frame_len).or_else(|| {
                // Deliberate final short drain once the source has exhausted
                if exhausted {
                    inner.buffer.drain_remainder()
                } else {
                    None
                }
            });
            if let Some(frame) = frame {
                inner.played_bytes += frame.len() as u64;
                if let Err(e) = sink.deliver(inner.payload_for(&frame)) {
                    warn!(error = %e, "sink dispatch failed");
                    events.emit_lossy(PacerEvent::DispatchError {
                        message: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        // 6. Exhaustion transitions, evaluated after the dispatch attempt
        if exhausted && !inner.machine.is_finished() {
            let total = inner.buffer.total_bytes();
            if total < inner.spec.almost_finished_threshold_bytes()
                && inner.machine.mark_almost_finished()
            {
                info!(remaining_bytes = total, "almost finished");
                events.emit_lossy(PacerEvent::AlmostFinished {
                    timestamp: Utc::now(),
                });
            } else if total < frame_len as u64 && inner.machine.finish() {
                info!("buffer drained, finished");
                events.emit_lossy(PacerEvent::Finished {
                    timestamp: Utc::now(),
                });
            }
        }

        Duration::from_secs_f64(wait_ms / 1000.0)
    }
}
