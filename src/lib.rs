//! # pacecast
//!
//! Real-time pacing engine for push-delivered media byte streams.
//!
//! **Purpose:** Adapt a continuous stream of decoded media bytes (raw PCM or
//! raw planar video frames) into a steady, real-time delivery cadence for a
//! live-media sink, absorbing upstream jitter and staying synchronized with a
//! remote peer's playback progress.
//!
//! **Architecture:** A chunk buffer sits between the push source and a
//! self-rescheduling pacing loop. Each cycle the loop consults the drift
//! compensator (against an optional remote playback oracle), applies
//! hysteresis backpressure to the source, dispatches at most one fixed-size
//! frame to the sink, and computes its next wake interval. Lifecycle is
//! surfaced through a broadcast event bus.
//!
//! Transport, encryption, codecs, and decoding are external: the engine
//! consumes already-decoded bytes and hands frames to a caller-supplied
//! [`MediaSink`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use pacecast::{MediaPayload, MediaSink, StreamOptions, StreamPacer};
//!
//! struct PrintSink;
//!
//! impl MediaSink for PrintSink {
//!     fn deliver(&self, payload: MediaPayload<'_>) -> anyhow::Result<()> {
//!         println!("frame: {} bytes", payload.len());
//!         Ok(())
//!     }
//! }
//!
//! # async fn run() -> pacecast::Result<()> {
//! let pacer = StreamPacer::new(StreamOptions::default(), Arc::new(PrintSink));
//! let _events = pacer.subscribe();
//! pacer.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod drift;
pub mod engine;
pub mod error;
pub mod events;
pub mod overflow;
pub mod sink;
pub mod source;
pub mod state;

pub use config::{AudioOptions, MediaKind, StreamOptions, VideoOptions};
pub use drift::RemoteClock;
pub use engine::StreamPacer;
pub use error::{Error, Result};
pub use events::{EventBus, PacerEvent};
pub use sink::{MediaPayload, MediaSink};
pub use source::SourceControl;
pub use state::PacerState;
