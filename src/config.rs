//! Stream configuration and derived frame geometry
//!
//! Two layers, mirroring the split between caller-facing options and engine
//! internals:
//!
//! 1. [`StreamOptions`]: caller-supplied configuration, every field optional
//!    with built-in defaults. Deserializable from TOML for hosts that keep
//!    stream parameters in a config file. Missing or partial sections resolve
//!    silently to defaults rather than failing.
//! 2. [`FrameSpec`]: values derived from the options — bytes per dispatched
//!    frame, pacing units per second, buffering targets. Fixed per attached
//!    source; recomputed only through `StreamPacer::set_options`.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of media the engine is pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Audio => write!(f, "audio"),
            MediaKind::Video => write!(f, "video"),
        }
    }
}

/// Video geometry options
///
/// Presence of this section selects video mode; defaults are 640x360 @ 24fps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VideoOptions {
    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            frame_rate: default_frame_rate(),
        }
    }
}

/// Audio sample format options
///
/// Defaults are 16-bit, 65000 Hz, mono.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioOptions {
    #[serde(default = "default_bits_per_sample")]
    pub bits_per_sample: u32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    #[serde(default = "default_channel_count")]
    pub channel_count: u32,
}

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            bits_per_sample: default_bits_per_sample(),
            sample_rate: default_sample_rate(),
            channel_count: default_channel_count(),
        }
    }
}

/// Caller-facing stream options
///
/// `video: Some(_)` selects video pacing; `None` selects audio pacing. Audio
/// format parameters are always resolved (the original surface accepted
/// `video: bool | {..}` — callers wanting default video geometry pass
/// `Some(VideoOptions::default())`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamOptions {
    #[serde(default)]
    pub video: Option<VideoOptions>,

    #[serde(default)]
    pub audio: AudioOptions,

    /// Seconds of buffered media remaining (past one frame) at which the
    /// `almost-finished` event fires after the source exhausts.
    #[serde(default = "default_almost_finished_trigger_secs")]
    pub almost_finished_trigger_secs: f64,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            video: None,
            audio: AudioOptions::default(),
            almost_finished_trigger_secs: default_almost_finished_trigger_secs(),
        }
    }
}

impl StreamOptions {
    /// Options for a video stream with default geometry
    pub fn video_default() -> Self {
        Self {
            video: Some(VideoOptions::default()),
            ..Self::default()
        }
    }

    /// Parse options from a TOML document
    ///
    /// Missing fields and missing sections resolve to defaults; only a
    /// syntactically invalid document is an error.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| Error::Config(e.to_string()))
    }
}

fn default_width() -> u32 {
    640
}

fn default_height() -> u32 {
    360
}

fn default_frame_rate() -> u32 {
    24
}

fn default_bits_per_sample() -> u32 {
    16
}

fn default_sample_rate() -> u32 {
    65000
}

fn default_channel_count() -> u32 {
    1
}

fn default_almost_finished_trigger_secs() -> f64 {
    20.0
}

/// Audio pacing runs at a fixed 100 dispatches per second (10 ms of samples
/// per frame), independent of sample rate.
pub const AUDIO_UNITS_PER_SECOND: f64 = 100.0;

/// Target look-ahead buffered for video sources, in seconds
pub const VIDEO_REQUIRED_BUFFER_SECS: f64 = 5.0;

/// Target look-ahead buffered for audio sources, in seconds
pub const AUDIO_REQUIRED_BUFFER_SECS: f64 = 10.0;

/// Derived frame geometry and pacing parameters
///
/// Everything the engine needs per cycle, precomputed from [`StreamOptions`]:
/// how many bytes make one dispatched frame, how many frames play per second,
/// and how much look-ahead the overflow controller targets.
#[derive(Debug, Clone, Copy)]
pub struct FrameSpec {
    pub kind: MediaKind,
    pub video: VideoOptions,
    pub audio: AudioOptions,
    pub almost_finished_trigger_secs: f64,

    frame_byte_length: usize,
    units_per_second: f64,
    required_buffer_secs: f64,
}

impl FrameSpec {
    /// Derive pacing parameters from caller options
    pub fn resolve(options: &StreamOptions) -> Self {
        let audio = options.audio;
        let video = options.video.unwrap_or_default();
        let kind = if options.video.is_some() {
            MediaKind::Video
        } else {
            MediaKind::Audio
        };

        let frame_byte_length = match kind {
            // Planar 4:2:0 pixel buffer: 1.5 bytes per pixel
            MediaKind::Video => (3 * video.width as usize * video.height as usize) / 2,
            MediaKind::Audio => {
                (audio.sample_rate as usize * audio.bits_per_sample as usize / 8
                    / AUDIO_UNITS_PER_SECOND as usize)
                    * audio.channel_count as usize
            }
        };

        let units_per_second = match kind {
            MediaKind::Video => video.frame_rate as f64,
            MediaKind::Audio => AUDIO_UNITS_PER_SECOND,
        };

        let required_buffer_secs = match kind {
            MediaKind::Video => VIDEO_REQUIRED_BUFFER_SECS,
            MediaKind::Audio => AUDIO_REQUIRED_BUFFER_SECS,
        };

        Self {
            kind,
            video,
            audio,
            almost_finished_trigger_secs: options.almost_finished_trigger_secs,
            frame_byte_length,
            units_per_second,
            required_buffer_secs,
        }
    }

    /// Bytes per dispatched frame
    pub fn frame_byte_length(&self) -> usize {
        self.frame_byte_length
    }

    /// Frames dispatched per second of real time
    pub fn units_per_second(&self) -> f64 {
        self.units_per_second
    }

    /// Target look-ahead the overflow controller maintains, in seconds
    pub fn required_buffer_secs(&self) -> f64 {
        self.required_buffer_secs
    }

    /// Bytes consumed per second of media
    pub fn bytes_per_second(&self) -> f64 {
        self.frame_byte_length as f64 * self.units_per_second
    }

    /// Seconds of media represented by `bytes` buffered or played
    pub fn seconds_for_bytes(&self, bytes: u64) -> f64 {
        bytes as f64 / self.frame_byte_length as f64 / self.units_per_second
    }

    /// Nominal inter-frame interval in milliseconds when dispatching
    pub fn frame_interval_ms(&self) -> f64 {
        match self.kind {
            MediaKind::Video => 1000.0 / self.video.frame_rate as f64,
            MediaKind::Audio => 10.0,
        }
    }

    /// Byte threshold below which `almost-finished` fires once the source
    /// has exhausted
    pub fn almost_finished_threshold_bytes(&self) -> u64 {
        self.frame_byte_length as u64
            + (self.almost_finished_trigger_secs * self.bytes_per_second()) as u64
    }

    /// Samples per channel represented by an audio payload of `byte_len`
    pub fn samples_per_channel(&self, byte_len: usize) -> usize {
        let bytes_per_sample = (self.audio.bits_per_sample / 8).max(1) as usize;
        byte_len / bytes_per_sample / self.audio.channel_count.max(1) as usize
    }
}
