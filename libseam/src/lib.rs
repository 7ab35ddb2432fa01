//! Gapless, independently decodable Ogg/Opus chunks
//!
//! A continuous source is cut into overlapping chunks. Every chunk is a
//! complete stream with its own headers and codec state, framed by
//! predicted lead-in and lead-out audio, and tagged with the number of
//! samples a player should cross-fade with its neighbours.
#![allow(clippy::needless_range_loop)]

pub mod codec;
pub mod container;
pub mod core;
pub mod lpc;
pub mod segmenter;
pub mod streaming;

pub use codec::{decode_packet, FrameCodec, PcmCodec};
#[cfg(feature = "opus")]
pub use codec::OpusCodec;
pub use container::{
    ChunkStream, OggOpusMuxer, OggOpusReader, Packet, PacketMuxer, StreamHead, DEFAULT_SERIAL,
};
pub use crate::core::{
    frame_size, is_supported_rate, CodecError, Sample, SampleFormat, SeamError, SeamResult,
    Settings, Tags, REFERENCE_RATE, SUPPORTED_RATES, TAG_CROSSFADE_IN, TAG_CROSSFADE_OUT,
};
pub use lpc::{extend_signal, LinearPredictor};
pub use segmenter::{ChunkInfo, ChunkSegmenter, ReaderSource, SampleSource, SliceSource};
pub use streaming::{EncoderOptions, FrameEncoder};
