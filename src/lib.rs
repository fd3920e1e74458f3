//! Scrolly maps a scroll position onto a video timeline and keeps the video on that position.
//!
//! The public API centers on [`ScrollyVideo`]:
//!
//! - Build an [`EngineConfig`] and a [`Mount`] holding the host's collaborators
//! - Feed scroll and metadata events, call [`ScrollyVideo::frame`] once per display refresh
//! - Optionally decode the whole video into frames ([`DecodePipeline`], [`DecodeWorker`]) so
//!   seeking paints a stored frame instead of asking the native element to seek
#![forbid(unsafe_code)]
#![warn(missing_docs)]

extern crate self as scrolly;

pub(crate) mod animation;
pub(crate) mod engine;
pub(crate) mod foundation;
pub(crate) mod media;
pub(crate) mod playback;
pub(crate) mod render;

pub use crate::animation::ease::{Ease, EaseFn, Easing};
pub use crate::foundation::core::{CancelToken, Direction, TransitionId};
pub use crate::foundation::error::{ScrollyError, ScrollyResult};
pub use crate::foundation::math::{clamp_time, clamp_unit, usable_duration};

pub use crate::playback::clock::PlaybackClock;
pub use crate::playback::controller::{
    PositionController, TargetContext, TargetDecision, TransitionDefaults,
};
pub use crate::playback::request::{
    Strategy, TransitionOptions, TransitionOpts, TransitionRequest,
};
pub use crate::playback::scheduler::{
    MAX_PLAY_RATE, MIN_PLAY_RATE, TickOutcome, TransitionScheduler, TransitionState,
};

pub use crate::render::backend::{EngineMode, RenderBackend};
pub use crate::render::canvas::{CanvasBackend, MemorySurface, MemorySurfaceLog, Surface};
pub use crate::render::fit::{Layout, ObjectFit, fit_rect};
pub use crate::render::native::{
    MediaElement, NativeBackend, SimulatedMediaElement, SimulatedState,
};
pub use crate::render::switch::{CanvasTarget, RenderTargetSwitch};

pub use crate::media::avcc::AvcDecoderConfig;
pub use crate::media::decoder::{
    Bitstream, ChunkKind, CodecConfig, DecoderFactory, DecoderOutput, EncodedChunk, VideoDecoder,
};
#[cfg(feature = "media-ffmpeg")]
pub use crate::media::ffmpeg::{
    FfmpegDecoder, FfmpegDecoderFactory, FfmpegDecoderOpts, is_ffmpeg_on_path,
};
pub use crate::media::frame::{DecodedFrame, FrameLedger, RawFrame};
pub use crate::media::mp4::{Mp4Demuxer, Mp4Sample, SampleEntry, VideoTrack};
pub use crate::media::pipeline::{DecodeOptions, DecodePipeline, DecodeStep, decode};
pub use crate::media::protocol::{
    WorkerRequest, WorkerResponse, from_json as message_from_json, to_json as message_to_json,
};
#[cfg(feature = "http")]
pub use crate::media::source::HttpSource;
pub use crate::media::source::{ByteSource, FileSource, MemorySource, default_source};
pub use crate::media::store::FrameStore;
pub use crate::media::worker::{
    DecodeWorker, WORKER_TICK, WorkerEnvelope, WorkerOptions,
};

pub use crate::engine::config::{DecodeMode, EngineConfig};
pub use crate::engine::scroll::{
    RecordingScrollHost, SCROLL_ARRIVAL_PX, SCROLL_DEBOUNCE_MS, ScrollEvent, ScrollGeometry,
    ScrollHost, ScrollSync,
};
pub use crate::engine::{Mount, PositionHook, ReadyHook, ScrollyVideo};
