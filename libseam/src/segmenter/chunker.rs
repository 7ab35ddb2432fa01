use std::io::Write;

use tracing::debug;

use super::SampleSource;
use crate::codec::{FrameCodec, PcmCodec};
use crate::container::OggOpusMuxer;
use crate::core::{SeamError, SeamResult, Settings, Tags, TAG_CROSSFADE_IN, TAG_CROSSFADE_OUT};
use crate::streaming::{EncoderOptions, FrameEncoder};

/// Builds a fresh codec for every chunk
pub type CodecFactory<C> = Box<dyn FnMut(&Settings) -> SeamResult<C>>;

/// Describes a chunk that was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {
    pub index: u64,
    /// absolute index of the first sample
    pub start: u64,
    /// samples per channel in the chunk
    pub len: u64,
    /// leading samples shared with the previous chunk
    pub crossfade_in: u64,
    /// trailing samples shared with the next chunk
    pub crossfade_out: u64,
}

impl ChunkInfo {
    /// one past the last sample
    pub fn end(&self) -> u64 {
        self.start + self.len
    }
}

/// Splits a source into overlapping chunks, each one a complete Ogg/Opus
/// stream of its own
///
/// The source is read strictly forward. Chunks come out in increasing index
/// order and share `overlap_samples` of audio with their neighbours.
pub struct ChunkSegmenter<S: SampleSource, C: FrameCodec = PcmCodec> {
    source: S,
    settings: Settings,
    codec: CodecFactory<C>,
    /// absolute index of the next sample the source yields
    offs: u64,
    /// samples read but not yet done with; they end at `offs`
    buf: Vec<f32>,
    buf_len: usize,
    at_end: bool,
}

impl<S: SampleSource> ChunkSegmenter<S, PcmCodec> {
    /// Segmenter producing 16 bit pcm chunks
    pub fn new(source: S, settings: Settings) -> Self {
        Self::with_codec(source, settings, |s: &Settings| {
            Ok(PcmCodec::new(s.rate(), s.channels())?)
        })
    }
}

impl<S: SampleSource, C: FrameCodec> ChunkSegmenter<S, C> {
    /// Segmenter with a codec built by `factory` for every chunk
    pub fn with_codec<F>(source: S, settings: Settings, factory: F) -> Self
    where
        F: FnMut(&Settings) -> SeamResult<C> + 'static,
    {
        let channels = settings.channels() as usize;
        // one more sample than a chunk holds, to see the end of the source
        let capacity = (settings.total_length_samples() as usize + 1) * channels;
        Self {
            source,
            settings,
            codec: Box::new(factory),
            offs: 0,
            buf: vec![0.0; capacity],
            buf_len: 0,
            at_end: false,
        }
    }

    /// The first sample the source yields has absolute index `offset`.
    /// Chunks starting before it are skipped.
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.offs = offset;
        self.buf_len = 0;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// absolute index of the first sample not yet handed out
    pub fn read_offset(&self) -> u64 {
        self.offs - self.buf_len as u64
    }

    /// Index of the chunk the next call to [`produce_next`] writes
    ///
    /// [`produce_next`]: ChunkSegmenter::produce_next
    pub fn current_index(&self) -> u64 {
        self.settings.next_chunk_index(self.read_offset())
    }

    /// false once the source has ended
    pub fn has_next(&self) -> bool {
        !self.at_end
    }

    /// Encode the next chunk into `out`.
    ///
    /// Returns `None` when the source has no more audio. On error nothing
    /// already read is lost and the end of the source is not recorded, so the
    /// call may be repeated.
    pub fn produce_next<W: Write>(&mut self, out: &mut W) -> SeamResult<Option<ChunkInfo>> {
        if self.at_end {
            return Ok(None);
        }

        let ch = self.settings.channels() as usize;
        let idx = self.current_index();
        let start = self.settings.chunk_start(idx);
        let end = self.settings.chunk_end(idx);
        if end == u64::MAX {
            return Err(SeamError::invalid(
                "offset",
                format!("chunk {} ends past the last addressable sample", idx),
            ));
        }

        if !self.skip_to(start)? {
            debug!(index = idx, start, "source ended before chunk start");
            self.at_end = true;
            return Ok(None);
        }

        let crossfade_in = if idx == 0 {
            0
        } else {
            self.settings.overlap_samples()
        };
        let mut crossfade_out = self.settings.overlap_samples();

        // read through `end`, plus one sample that stays pending
        let want = (end + 1 - self.offs) as usize;
        let at = self.buf_len * ch;
        let got = self.source.read_samples(&mut self.buf[at..at + want * ch])? / ch;
        self.offs += got as u64;
        self.buf_len += got;

        let source_ended = got < want;
        if source_ended {
            crossfade_out = 0;
        }

        let len = self.buf_len.min((end - start) as usize);
        if len == 0 {
            self.at_end = true;
            return Ok(None);
        }

        self.encode_chunk(out, len, crossfade_in, crossfade_out)?;
        self.at_end = source_ended;

        // keep the trailing overlap and whatever was read past the chunk
        let keep_from = len - crossfade_out as usize;
        self.buf.copy_within(keep_from * ch..self.buf_len * ch, 0);
        self.buf_len -= keep_from;

        let info = ChunkInfo {
            index: idx,
            start,
            len: len as u64,
            crossfade_in,
            crossfade_out,
        };
        debug!(
            index = info.index,
            start = info.start,
            len = info.len,
            crossfade_in,
            crossfade_out,
            last = source_ended,
            "chunk produced"
        );
        Ok(Some(info))
    }

    /// Drop pending samples and read from the source until the next sample
    /// handed out is `start`. False if the source ends first.
    fn skip_to(&mut self, start: u64) -> SeamResult<bool> {
        let ch = self.settings.channels() as usize;

        let behind = start.saturating_sub(self.read_offset()) as usize;
        if behind > 0 && behind < self.buf_len {
            self.buf.copy_within(behind * ch..self.buf_len * ch, 0);
            self.buf_len -= behind;
            return Ok(true);
        }
        if behind > 0 {
            self.buf_len = 0;
        }

        let capacity = self.buf.len() / ch;
        while self.offs < start {
            let want = ((start - self.offs) as usize).min(capacity);
            let got = self.source.read_samples(&mut self.buf[..want * ch])? / ch;
            self.offs += got as u64;
            if got < want {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn encode_chunk<W: Write>(
        &mut self,
        out: &mut W,
        len: usize,
        crossfade_in: u64,
        crossfade_out: u64,
    ) -> SeamResult<()> {
        let ch = self.settings.channels() as usize;
        let codec = (self.codec)(&self.settings)?;

        let mut tags = Tags::new();
        tags.push(TAG_CROSSFADE_IN, crossfade_in);
        tags.push(TAG_CROSSFADE_OUT, crossfade_out);
        let options = EncoderOptions::new(self.settings.rate(), self.settings.channels())
            .with_tags(tags);

        let mut encoder = FrameEncoder::new(codec, OggOpusMuxer::new(out), options)?;
        encoder.set_bitrate(self.settings.bitrate())?;
        encoder.push(&self.buf[..len * ch])?;
        encoder.finish()
    }
}
