use tracing::{debug, trace, warn};

use super::types::{EncoderOptions, EncoderState};
use crate::codec::FrameCodec;
use crate::container::{PacketMuxer, StreamHead};
use crate::core::{
    frame_size, granule_multiplier, is_supported_rate, CodecError, Sample, SeamError, SeamResult,
};
use crate::lpc::LinearPredictor;

/// where the frame handed to the codec currently lives
#[derive(Clone, Copy)]
enum FrameRef {
    /// the input buffer
    Input,
    /// the scratch buffer, starting at this sample
    Scratch(usize),
}

/// Cuts raw samples into codec frames and muxes the packets
///
/// The stream starts with a synthetic lead-in frame predicted backwards from
/// the first real samples, and a short last frame is completed by forward
/// prediction. Granules count the lead-in, so the header pre-skip covers the
/// lead-in plus the codec lookahead.
///
/// The stream is finalized exactly once, either by [`FrameEncoder::finish`]
/// or when the encoder is dropped.
pub struct FrameEncoder<C: FrameCodec, M: PacketMuxer> {
    codec: C,
    muxer: M,
    lpc: LinearPredictor,
    rate: u32,
    channels: usize,
    frame_size: usize,
    granule_mul: u64,
    lookahead: usize,
    pre_skip: u16,
    /// input waiting for a full frame
    buf: Vec<f32>,
    buf_len: usize,
    /// two frames for lead-in, padding and the last full frame
    scratch: Vec<f32>,
    scratch_len: usize,
    packet: Vec<u8>,
    granule: u64,
    /// codec lookahead not yet covered by granules of padding
    final_padding: usize,
    bitrate: Option<u32>,
    first: bool,
    state: EncoderState,
}

impl<C: FrameCodec, M: PacketMuxer> FrameEncoder<C, M> {
    /// Create an encoder and write the stream headers.
    pub fn new(codec: C, mut muxer: M, options: EncoderOptions) -> SeamResult<Self> {
        if !is_supported_rate(options.rate) {
            return Err(SeamError::invalid(
                "rate",
                format!("unsupported sample rate {}", options.rate),
            ));
        }
        if !(1..=2).contains(&options.channels) {
            return Err(SeamError::invalid(
                "channels",
                format!("{} channels, expected 1 or 2", options.channels),
            ));
        }

        let fs = frame_size(options.rate);
        let channels = options.channels as usize;
        let lookahead = codec.lookahead();
        if lookahead > fs {
            return Err(CodecError::BadArg(format!(
                "codec lookahead {} exceeds one frame of {} samples",
                lookahead, fs
            ))
            .into());
        }

        let granule_mul = granule_multiplier(options.rate);
        let pre_skip = u16::try_from((fs + lookahead) as u64 * granule_mul)
            .map_err(|_| CodecError::BadArg("pre-skip does not fit the header".into()))?;

        let head = StreamHead {
            pre_skip,
            channels: options.channels,
            input_rate: options.rate,
        };
        muxer.write_header(&head, codec.vendor(), &options.tags)?;

        debug!(
            rate = options.rate,
            channels,
            lookahead,
            pre_skip,
            granule_offset = options.granule_offset,
            "frame encoder started"
        );

        Ok(Self {
            codec,
            muxer,
            lpc: LinearPredictor::default(),
            rate: options.rate,
            channels,
            frame_size: fs,
            granule_mul,
            lookahead,
            pre_skip,
            buf: vec![0.0; fs * channels],
            buf_len: 0,
            scratch: vec![0.0; 2 * fs * channels],
            scratch_len: 0,
            packet: Vec::new(),
            granule: options.granule_offset,
            final_padding: lookahead,
            bitrate: None,
            first: true,
            state: EncoderState::Open,
        })
    }

    /// samples per channel in one frame
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// codec latency in samples at the configured rate
    pub fn lookahead(&self) -> usize {
        self.lookahead
    }

    /// header pre-skip on the 48 kHz time base
    pub fn pre_skip(&self) -> u16 {
        self.pre_skip
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn channels(&self) -> u8 {
        self.channels as u8
    }

    /// granule of the last written frame, in samples at the configured rate
    pub fn granule(&self) -> u64 {
        self.granule
    }

    /// samples per channel waiting for a full frame
    pub fn pending_samples(&self) -> usize {
        self.buf_len
    }

    /// Set the target bitrate for the following frames.
    ///
    /// The codec is only reconfigured when the value changes.
    pub fn set_bitrate(&mut self, bits_per_second: u32) -> SeamResult<()> {
        self.check_open()?;
        if self.bitrate == Some(bits_per_second) {
            return Ok(());
        }
        let result = self.codec.set_bitrate(bits_per_second).map_err(SeamError::from);
        self.poison_on_err(result)?;
        self.bitrate = Some(bits_per_second);
        Ok(())
    }

    /// Push interleaved samples. Every full frame is encoded right away.
    pub fn push<T: Sample>(&mut self, samples: &[T]) -> SeamResult<()> {
        self.check_open()?;
        let ch = self.channels;
        if samples.len() % ch != 0 {
            return Err(SeamError::invalid(
                "samples",
                format!("{} values do not divide into {} channels", samples.len(), ch),
            ));
        }

        let fs = self.frame_size;
        let mut rest = samples;
        while !rest.is_empty() {
            let n = (fs - self.buf_len).min(rest.len() / ch);
            let dst = &mut self.buf[self.buf_len * ch..(self.buf_len + n) * ch];
            for (d, s) in dst.iter_mut().zip(&rest[..n * ch]) {
                *d = s.to_f32();
            }
            self.buf_len += n;
            rest = &rest[n * ch..];

            if self.buf_len == fs {
                self.buf_len = 0;
                let last_in_seq = rest.len() / ch < fs;
                let result = self.encode_frame(fs, last_in_seq, false);
                self.poison_on_err(result)?;
            }
        }
        Ok(())
    }

    /// Finalize the stream and report any error
    pub fn finish(mut self) -> SeamResult<()> {
        self.check_open()?;
        self.finalize()
    }

    fn check_open(&self) -> SeamResult<()> {
        match self.state {
            EncoderState::Open => Ok(()),
            _ => Err(SeamError::Finished),
        }
    }

    fn poison_on_err<T>(&mut self, result: SeamResult<T>) -> SeamResult<T> {
        if result.is_err() {
            self.state = EncoderState::Poisoned;
        }
        result
    }

    fn finalize(&mut self) -> SeamResult<()> {
        self.state = EncoderState::Finished;

        let fs = self.frame_size;
        let needs_extra = fs - self.buf_len < self.lookahead;
        debug!(
            pending = self.buf_len,
            extra_frame = needs_extra,
            "finalizing frame encoder"
        );

        let pending = std::mem::take(&mut self.buf_len);
        self.encode_frame(pending, needs_extra, !needs_extra)?;
        if needs_extra {
            self.encode_frame(0, false, true)?;
        }
        self.muxer.finish()
    }

    /// Encode the `n_src` samples at the start of the input buffer as one
    /// frame, completing a short frame by prediction.
    fn encode_frame(&mut self, n_src: usize, last_in_seq: bool, flush: bool) -> SeamResult<()> {
        let fs = self.frame_size;
        let ch = self.channels;

        if self.first {
            self.first = false;
            self.write_lead_in(n_src)?;
        }

        self.granule += n_src as u64;

        let mut frame = FrameRef::Input;
        if n_src < fs {
            let at = self.scratch_len;
            self.scratch[at * ch..(at + n_src) * ch].copy_from_slice(&self.buf[..n_src * ch]);
            self.scratch_len += n_src;

            let n_fit = (fs / 2).min(self.scratch_len);
            let fit_from = (self.scratch_len - n_fit) * ch;
            let (known, tail) = self.scratch.split_at_mut(self.scratch_len * ch);
            if n_fit == 0 {
                // nothing was ever pushed
                tail[..(fs - n_src) * ch].fill(0.0);
            } else {
                for c in 0..ch {
                    self.lpc.fit(&known[fit_from + c..], n_fit, ch);
                    self.lpc
                        .predict(&known[fit_from + c..], n_fit, &mut tail[c..], fs - n_src, ch);
                }
            }

            let add = self.final_padding.min(fs - n_src);
            self.granule += add as u64;
            self.final_padding -= add;
            frame = FrameRef::Scratch(at);
        }

        if last_in_seq {
            match frame {
                FrameRef::Input => self.scratch[..fs * ch].copy_from_slice(&self.buf[..fs * ch]),
                FrameRef::Scratch(at) => self.scratch.copy_within(at * ch..(at + fs) * ch, 0),
            }
            self.scratch_len = fs;
            frame = FrameRef::Scratch(0);
        }

        let pcm = match frame {
            FrameRef::Input => &self.buf[..fs * ch],
            FrameRef::Scratch(at) => &self.scratch[at * ch..(at + fs) * ch],
        };
        self.codec.encode(pcm, &mut self.packet)?;

        let granule = self.granule * self.granule_mul;
        trace!(granule, bytes = self.packet.len(), flush, "frame");
        self.muxer.write_frame(flush, granule, &self.packet)
    }

    /// Predict one frame of plausible past from the first real samples and
    /// encode it ahead of them.
    fn write_lead_in(&mut self, n_src: usize) -> SeamResult<()> {
        let fs = self.frame_size;
        let ch = self.channels;

        self.scratch.fill(0.0);
        self.scratch[..n_src * ch].copy_from_slice(&self.buf[..n_src * ch]);
        reverse_frames(&mut self.scratch[..fs * ch], ch);

        let half = fs / 2;
        let (reversed, target) = self.scratch.split_at_mut(fs * ch);
        for c in 0..ch {
            let src = &reversed[half * ch + c..];
            self.lpc.fit(src, half, ch);
            self.lpc.predict(src, half, &mut target[c..], fs, ch);
        }
        reverse_frames(target, ch);

        self.granule += fs as u64;
        self.codec.encode(target, &mut self.packet)?;

        let granule = self.granule * self.granule_mul;
        trace!(granule, bytes = self.packet.len(), "lead-in frame");
        self.muxer.write_frame(false, granule, &self.packet)
    }
}

impl<C: FrameCodec, M: PacketMuxer> Drop for FrameEncoder<C, M> {
    fn drop(&mut self) {
        if self.state == EncoderState::Open {
            if let Err(e) = self.finalize() {
                warn!(error = %e, "finalizing frame encoder on drop failed");
            }
        }
    }
}

/// reverse the order of interleaved sample frames, keeping channel order
fn reverse_frames(buf: &mut [f32], channels: usize) {
    buf.reverse();
    if channels > 1 {
        for frame in buf.chunks_exact_mut(channels) {
            frame.reverse();
        }
    }
}
