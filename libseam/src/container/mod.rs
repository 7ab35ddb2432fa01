//! Ogg/Opus container writing and reading

pub mod reader;
pub mod writer;

pub use reader::{ChunkStream, OggOpusReader, Packet};
pub use writer::{OggOpusMuxer, DEFAULT_SERIAL};

use crate::core::{SeamResult, Tags};

/// magic of an ogg page
pub const OGG_MAGIC: [u8; 4] = *b"OggS";

/// magic of the identification header packet
pub const OPUS_HEAD: [u8; 8] = *b"OpusHead";

/// magic of the comment header packet
pub const OPUS_TAGS: [u8; 8] = *b"OpusTags";

/// page header flags
pub(crate) const FLAG_CONTINUED: u8 = 0x01;
pub(crate) const FLAG_BOS: u8 = 0x02;
pub(crate) const FLAG_EOS: u8 = 0x04;

/// granule of a page on which no packet ends
pub(crate) const NO_GRANULE: u64 = u64::MAX;

/// Stream parameters carried by the identification header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamHead {
    /// samples at 48 kHz the decoder drops from the start
    pub pre_skip: u16,
    pub channels: u8,
    /// rate of the original input, informational only
    pub input_rate: u32,
}

/// Sink for compressed packets with timing information
pub trait PacketMuxer {
    /// Write the stream headers. Called once, before any frame.
    fn write_header(&mut self, head: &StreamHead, vendor: &str, tags: &Tags) -> SeamResult<()>;

    /// Write one packet. `granule` counts samples including pre-skip, on the
    /// 48 kHz time base, up to the end of this packet.
    fn write_frame(&mut self, last: bool, granule: u64, packet: &[u8]) -> SeamResult<()>;

    /// Close the stream if the last frame has not been written. Idempotent.
    fn finish(&mut self) -> SeamResult<()>;
}

impl<M: PacketMuxer + ?Sized> PacketMuxer for &mut M {
    fn write_header(&mut self, head: &StreamHead, vendor: &str, tags: &Tags) -> SeamResult<()> {
        (**self).write_header(head, vendor, tags)
    }

    fn write_frame(&mut self, last: bool, granule: u64, packet: &[u8]) -> SeamResult<()> {
        (**self).write_frame(last, granule, packet)
    }

    fn finish(&mut self) -> SeamResult<()> {
        (**self).finish()
    }
}
