//! libopus frame codec

use opus::{Application, Bitrate, Channels, Encoder, ErrorCode};

use crate::core::{frame_size, CodecError};

use super::FrameCodec;

/// largest packet libopus produces for one frame
const MAX_PACKET: usize = 4000;

/// Opus encoder in audio application mode
pub struct OpusCodec {
    encoder: Encoder,
    frame_len: usize,
    lookahead: usize,
    vendor: String,
    buf: Vec<u8>,
}

impl OpusCodec {
    pub fn new(rate: u32, channels: u8) -> Result<Self, CodecError> {
        let layout = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            n => return Err(CodecError::BadArg(format!("unsupported channel count {}", n))),
        };
        let mut encoder = Encoder::new(rate, layout, Application::Audio).map_err(map_error)?;
        let lookahead = encoder.get_lookahead().map_err(map_error)?;
        let lookahead = usize::try_from(lookahead)
            .map_err(|_| CodecError::InternalError(format!("negative lookahead {}", lookahead)))?;

        Ok(Self {
            encoder,
            frame_len: frame_size(rate) * channels as usize,
            lookahead,
            vendor: opus::version().to_string(),
            buf: vec![0; MAX_PACKET],
        })
    }
}

impl FrameCodec for OpusCodec {
    fn lookahead(&self) -> usize {
        self.lookahead
    }

    fn set_bitrate(&mut self, bits_per_second: u32) -> Result<(), CodecError> {
        let bits = i32::try_from(bits_per_second)
            .map_err(|_| CodecError::BadArg(format!("bitrate {}", bits_per_second)))?;
        self.encoder
            .set_bitrate(Bitrate::Bits(bits))
            .map_err(map_error)
    }

    fn encode(&mut self, pcm: &[f32], out: &mut Vec<u8>) -> Result<(), CodecError> {
        if pcm.len() != self.frame_len {
            return Err(CodecError::BadArg(format!(
                "frame of {} samples, expected {}",
                pcm.len(),
                self.frame_len
            )));
        }
        let n = self
            .encoder
            .encode_float(pcm, &mut self.buf)
            .map_err(map_error)?;
        out.clear();
        out.extend_from_slice(&self.buf[..n]);
        Ok(())
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }
}

fn map_error(e: opus::Error) -> CodecError {
    match e.code() {
        ErrorCode::BadArg => CodecError::BadArg(e.to_string()),
        ErrorCode::BufferTooSmall => CodecError::BufferTooSmall,
        ErrorCode::InternalError => CodecError::InternalError(e.to_string()),
        ErrorCode::InvalidPacket => CodecError::InvalidPacket,
        ErrorCode::Unimplemented => CodecError::Unimplemented,
        ErrorCode::InvalidState => CodecError::InvalidState,
        ErrorCode::AllocFail => CodecError::AllocFail,
        _ => CodecError::Other(e.to_string()),
    }
}
