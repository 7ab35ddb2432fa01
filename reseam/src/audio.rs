use anyhow::{Context, Result};
use libseam_audio::{SampleSource, SeamError, SeamResult};
use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as MediaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Decodes an audio file packet by packet and hands out interleaved f32
/// samples in range [-1.0, 1.0]
///
/// Nothing is resampled or remixed; the file's own rate and channel count
/// are reported by [`rate`](Self::rate) and [`channels`](Self::channels).
pub struct SymphoniaSource {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    rate: u32,
    channels: usize,
    /// decoded samples not yet handed out
    pending: Vec<f32>,
    pos: usize,
    done: bool,
}

impl SymphoniaSource {
    /// Open an audio file (mp3, wav, flac, ogg, etc.)
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path).context("Failed to open audio file")?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());
        Self::from_stream(mss, path.extension().and_then(|e| e.to_str()))
    }

    /// Decode audio held in memory (for WASM support)
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());
        Self::from_stream(mss, None)
    }

    fn from_stream(mss: MediaSourceStream, extension: Option<&str>) -> Result<Self> {
        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .context("Unsupported audio format")?;
        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .context("No audio track found")?;

        let track_id = track.id;
        let rate = track
            .codec_params
            .sample_rate
            .context("Unknown sample rate")?;
        let channels = track
            .codec_params
            .channels
            .context("Unknown channel count")?
            .count();

        let decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .context("Failed to create decoder")?;

        debug!(rate, channels, track_id, "opened audio input");

        Ok(Self {
            format,
            decoder,
            track_id,
            rate,
            channels,
            pending: Vec::new(),
            pos: 0,
            done: false,
        })
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Decode the next packet of our track into `pending`.
    /// False once the input is exhausted.
    fn decode_next(&mut self) -> SeamResult<bool> {
        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(MediaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    self.done = true;
                    return Ok(false);
                }
                // a new track layout starts; everything we can use has been read
                Err(MediaError::ResetRequired) => {
                    self.done = true;
                    return Ok(false);
                }
                Err(e) => return Err(media_error(e)),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(MediaError::DecodeError(msg)) => {
                    trace!(msg, "skipping undecodable packet");
                    continue;
                }
                Err(e) => return Err(media_error(e)),
            };

            self.pending.clear();
            self.pos = 0;
            append_samples(&decoded, &mut self.pending, self.channels);
            if !self.pending.is_empty() {
                return Ok(true);
            }
        }
    }
}

impl SampleSource for SymphoniaSource {
    fn read_samples(&mut self, buf: &mut [f32]) -> SeamResult<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.pos == self.pending.len() {
                if self.done || !self.decode_next()? {
                    break;
                }
                continue;
            }
            let n = (buf.len() - filled).min(self.pending.len() - self.pos);
            buf[filled..filled + n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
            self.pos += n;
            filled += n;
        }
        Ok(filled)
    }
}

fn media_error(e: MediaError) -> SeamError {
    match e {
        MediaError::IoError(e) => SeamError::Io(e),
        other => SeamError::Container(other.to_string()),
    }
}

fn append_samples(buffer: &AudioBufferRef, samples: &mut Vec<f32>, channels: usize) {
    match buffer {
        AudioBufferRef::F32(buf) => {
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame]);
                }
            }
        }
        AudioBufferRef::F64(buf) => {
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame] as f32);
                }
            }
        }
        AudioBufferRef::S16(buf) => {
            let scale = 1.0 / 32768.0;
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame] as f32 * scale);
                }
            }
        }
        AudioBufferRef::S24(buf) => {
            let scale = 1.0 / 8388608.0;
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame].inner() as f32 * scale);
                }
            }
        }
        AudioBufferRef::S32(buf) => {
            let scale = 1.0 / 2147483648.0;
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push(buf.chan(ch)[frame] as f32 * scale);
                }
            }
        }
        AudioBufferRef::U8(buf) => {
            for frame in 0..buf.frames() {
                for ch in 0..channels {
                    samples.push((buf.chan(ch)[frame] as f32 - 128.0) / 128.0);
                }
            }
        }
        _ => {
            // remaining layouts (u16, u24, u32, s8) do not come out of the
            // bundled decoders
        }
    }
}
