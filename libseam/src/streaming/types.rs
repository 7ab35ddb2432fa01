use crate::core::Tags;

/// Per stream parameters for a [`FrameEncoder`](super::FrameEncoder)
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderOptions {
    /// sample rate in Hz
    pub rate: u32,
    /// 1 or 2
    pub channels: u8,
    /// granule the stream starts counting from, in samples at `rate`
    pub granule_offset: u64,
    /// comment header pairs, written in order
    pub tags: Tags,
}

impl EncoderOptions {
    pub fn new(rate: u32, channels: u8) -> Self {
        Self {
            rate,
            channels,
            granule_offset: 0,
            tags: Tags::new(),
        }
    }

    pub fn with_granule_offset(mut self, offset: u64) -> Self {
        self.granule_offset = offset;
        self
    }

    pub fn with_tags(mut self, tags: Tags) -> Self {
        self.tags = tags;
        self
    }
}

/// lifecycle of an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EncoderState {
    Open,
    Finished,
    /// a frame failed to encode or mux; nothing more is written
    Poisoned,
}
