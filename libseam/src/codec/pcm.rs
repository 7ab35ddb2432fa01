//! reference codec: delayed 16 bit pcm
//!
//! Behaves like a real codec as far as timing goes. Output lags input by a
//! fixed lookahead, so a decoder has to drop `pre_skip` samples and honor
//! the final granule to get the input back. Packets are raw little endian
//! 16 bit samples, which makes exact reconstruction testable.

use crate::core::{
    f32_to_i16, frame_size, is_supported_rate, CodecError, Sample, MAX_BITRATE, MIN_BITRATE,
};

use super::FrameCodec;

const VENDOR: &str = concat!("libseam-audio ", env!("CARGO_PKG_VERSION"), " pcm");

/// Delay line codec producing 16 bit pcm packets
#[derive(Debug, Clone)]
pub struct PcmCodec {
    rate: u32,
    channels: usize,
    bitrate: Option<u32>,
    lookahead: usize,
    delay: Vec<f32>,
    scratch: Vec<f32>,
}

impl PcmCodec {
    /// Create a codec with a 6.5 ms lookahead
    pub fn new(rate: u32, channels: u8) -> Result<Self, CodecError> {
        if !is_supported_rate(rate) {
            return Err(CodecError::BadArg(format!("unsupported sample rate {}", rate)));
        }
        if !(1..=2).contains(&channels) {
            return Err(CodecError::BadArg(format!("unsupported channel count {}", channels)));
        }
        let lookahead = rate as usize * 13 / 2000;
        Ok(Self {
            rate,
            channels: channels as usize,
            bitrate: None,
            lookahead,
            delay: vec![0.0; lookahead * channels as usize],
            scratch: Vec::new(),
        })
    }

    /// Use a different lookahead, at most one frame
    pub fn with_lookahead(mut self, lookahead: usize) -> Result<Self, CodecError> {
        if lookahead > frame_size(self.rate) {
            return Err(CodecError::BadArg(format!(
                "lookahead {} exceeds one frame",
                lookahead
            )));
        }
        self.lookahead = lookahead;
        self.delay = vec![0.0; lookahead * self.channels];
        Ok(self)
    }

    /// last accepted bitrate
    pub fn bitrate(&self) -> Option<u32> {
        self.bitrate
    }
}

impl FrameCodec for PcmCodec {
    fn lookahead(&self) -> usize {
        self.lookahead
    }

    fn set_bitrate(&mut self, bits_per_second: u32) -> Result<(), CodecError> {
        if !(MIN_BITRATE..=MAX_BITRATE).contains(&bits_per_second) {
            return Err(CodecError::BadArg(format!(
                "bitrate {} outside {}..={}",
                bits_per_second, MIN_BITRATE, MAX_BITRATE
            )));
        }
        self.bitrate = Some(bits_per_second);
        Ok(())
    }

    fn encode(&mut self, pcm: &[f32], out: &mut Vec<u8>) -> Result<(), CodecError> {
        let frame_len = frame_size(self.rate) * self.channels;
        if pcm.len() != frame_len {
            return Err(CodecError::BadArg(format!(
                "frame of {} samples, expected {}",
                pcm.len(),
                frame_len
            )));
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.delay);
        self.scratch.extend_from_slice(pcm);
        let (emit, keep) = self.scratch.split_at(frame_len);

        out.clear();
        out.reserve(frame_len * 2);
        for &s in emit {
            out.extend_from_slice(&f32_to_i16(s).to_le_bytes());
        }
        self.delay.copy_from_slice(keep);
        Ok(())
    }

    fn vendor(&self) -> &str {
        VENDOR
    }
}

/// Decode a packet produced by [`PcmCodec`] to normalized samples
pub fn decode_packet(packet: &[u8]) -> Result<Vec<f32>, CodecError> {
    if packet.len() % 2 != 0 {
        return Err(CodecError::InvalidPacket);
    }
    Ok(packet
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]).to_f32())
        .collect())
}
