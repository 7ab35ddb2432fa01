//! frame codecs
//!
//! The encoder hands a codec exactly one frame of interleaved, normalized
//! samples at a time and receives one compressed packet back.

#[cfg(feature = "opus")]
pub mod opus;
pub mod pcm;

#[cfg(feature = "opus")]
pub use self::opus::OpusCodec;
pub use pcm::{decode_packet, PcmCodec};

use crate::core::CodecError;

/// A codec that compresses fixed size frames
pub trait FrameCodec {
    /// Encoder latency in samples at the configured rate
    fn lookahead(&self) -> usize;

    /// Target bitrate for the frames that follow
    fn set_bitrate(&mut self, bits_per_second: u32) -> Result<(), CodecError>;

    /// Compress one frame of interleaved samples into `out`, replacing its
    /// contents.
    fn encode(&mut self, pcm: &[f32], out: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Name written to the comment header
    fn vendor(&self) -> &str;
}

impl<C: FrameCodec + ?Sized> FrameCodec for Box<C> {
    fn lookahead(&self) -> usize {
        (**self).lookahead()
    }

    fn set_bitrate(&mut self, bits_per_second: u32) -> Result<(), CodecError> {
        (**self).set_bitrate(bits_per_second)
    }

    fn encode(&mut self, pcm: &[f32], out: &mut Vec<u8>) -> Result<(), CodecError> {
        (**self).encode(pcm, out)
    }

    fn vendor(&self) -> &str {
        (**self).vendor()
    }
}
