//! Downstream live-media sink contract
//!
//! One fixed-size frame is delivered per pacing cycle. The sink is external
//! (typically a native real-time track source); delivery must be quick and
//! non-blocking, in the spirit of an audio output callback. Failures are
//! caught by the engine and surfaced as `DispatchError` events rather than
//! terminating the pacing loop.

/// One frame's worth of media, borrowed from the pacing cycle
#[derive(Debug, Clone, Copy)]
pub enum MediaPayload<'a> {
    /// Planar 4:2:0 pixel buffer, `1.5 * width * height` bytes at full size
    Video {
        data: &'a [u8],
        width: u32,
        height: u32,
    },

    /// Interleaved PCM block, nominally 10 ms of samples
    Audio {
        data: &'a [u8],
        bits_per_sample: u32,
        sample_rate: u32,
        channel_count: u32,
        /// Samples per channel in `data`
        frame_count: usize,
    },
}

impl MediaPayload<'_> {
    /// Byte length of the payload
    pub fn len(&self) -> usize {
        match self {
            MediaPayload::Video { data, .. } => data.len(),
            MediaPayload::Audio { data, .. } => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Receiver of paced frames
///
/// Implementations bridge to the actual transmission engine. Any error
/// returned is converted into a lifecycle event; the stream keeps running.
pub trait MediaSink: Send + Sync {
    fn deliver(&self, payload: MediaPayload<'_>) -> anyhow::Result<()>;
}

impl<T: MediaSink + ?Sized> MediaSink for std::sync::Arc<T> {
    fn deliver(&self, payload: MediaPayload<'_>) -> anyhow::Result<()> {
        (**self).deliver(payload)
    }
}
