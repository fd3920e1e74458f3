use std::time::Duration;

use crate::foundation::error::ScrollyResult;
use crate::media::frame::RawFrame;
use crate::media::mp4::VideoTrack;

/// Decoder configuration extracted from container metadata. Immutable per session.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct CodecConfig {
    /// RFC 6381 codec string, e.g. `avc1.64001f`.
    pub codec: String,
    /// Serialized `avcC` record.
    #[serde(with = "hex_bytes")]
    pub description: Vec<u8>,
    /// Coded width.
    pub coded_width: u32,
    /// Coded height.
    pub coded_height: u32,
}

impl CodecConfig {
    /// Build from a demuxed track.
    pub fn from_track(track: &VideoTrack) -> Self {
        Self {
            codec: track.codec(),
            description: track.avcc.to_description(),
            coded_width: track.width,
            coded_height: track.height,
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        s.serialize_str(&hex)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        if s.len() % 2 != 0 {
            return Err(serde::de::Error::custom("odd-length hex string"));
        }
        (0..s.len())
            .step_by(2)
            .map(|i| {
                s.get(i..i + 2)
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| serde::de::Error::custom("invalid hex"))
            })
            .collect()
    }
}

/// Key vs delta framing of an encoded chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkKind {
    /// Independently decodable.
    Key,
    /// Depends on earlier chunks.
    Delta,
}

/// Byte layout a decoder expects for chunk payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Bitstream {
    /// Start-code delimited NAL units, parameter sets in band on keyframes.
    #[default]
    AnnexB,
    /// Length-prefixed NAL units as stored in MP4; parameter sets come from the description.
    Avcc,
}

/// One timestamped access unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedChunk {
    /// Framing.
    pub kind: ChunkKind,
    /// Presentation timestamp in microseconds.
    pub timestamp_us: i64,
    /// Duration in microseconds.
    pub duration_us: i64,
    /// Payload in the decoder's [`Bitstream`] layout.
    pub data: Vec<u8>,
}

/// Result of polling a decoder.
#[derive(Debug)]
pub enum DecoderOutput {
    /// A decoded frame, in output order.
    Frame(RawFrame),
    /// Nothing available yet.
    Pending,
    /// Flushed and fully drained.
    Finished,
}

/// Streaming video decoder.
///
/// Chunks go in with [`VideoDecoder::decode`] in decode order; frames come out through
/// [`VideoDecoder::poll_output`]. [`VideoDecoder::decode_queue_size`] reports chunks accepted but
/// not yet turned into frames and drives backpressure.
pub trait VideoDecoder: Send {
    /// Payload layout this decoder wants.
    fn bitstream(&self) -> Bitstream {
        Bitstream::AnnexB
    }

    /// Prepare for `config`. Called once, before the first chunk.
    fn configure(&mut self, config: &CodecConfig) -> ScrollyResult<()>;

    /// Queue one chunk.
    fn decode(&mut self, chunk: EncodedChunk) -> ScrollyResult<()>;

    /// Chunks queued and not yet output.
    fn decode_queue_size(&self) -> usize;

    /// Take the next frame without blocking.
    fn poll_output(&mut self) -> ScrollyResult<DecoderOutput>;

    /// Take the next frame, waiting up to `timeout`.
    fn wait_output(&mut self, timeout: Duration) -> ScrollyResult<DecoderOutput> {
        let _ = timeout;
        self.poll_output()
    }

    /// No more chunks will follow.
    fn flush(&mut self) -> ScrollyResult<()>;

    /// Release decoder resources. Idempotent.
    fn close(&mut self);
}

/// Creates a fresh decoder per decode session.
pub trait DecoderFactory: Send + Sync {
    /// New unconfigured decoder.
    fn create(&self) -> ScrollyResult<Box<dyn VideoDecoder>>;
}

impl<F> DecoderFactory for F
where
    F: Fn() -> ScrollyResult<Box<dyn VideoDecoder>> + Send + Sync,
{
    fn create(&self) -> ScrollyResult<Box<dyn VideoDecoder>> {
        self()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/decoder.rs"]
mod tests;
