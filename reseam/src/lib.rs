//! reseam - gapless chunk splitter library
//!
//! Splits a continuous source into independently decodable Ogg/Opus chunks,
//! writes them to a directory and describes them in a JSON manifest.
//! It works on native targets and can be compiled to WebAssembly.
//!

pub mod audio;

#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
pub mod wasm;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

/// Re-export libseam types
pub use libseam_audio::{ChunkInfo, SampleSource, Settings};

use libseam_audio::{ChunkSegmenter, FrameCodec, SliceSource};

/// Codec used for the chunk packets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecChoice {
    /// 16 bit pcm packets with codec timing, always available
    #[default]
    Pcm,
    /// libopus, needs the `opus` feature
    Opus,
}

impl CodecChoice {
    pub fn is_available(self) -> bool {
        match self {
            CodecChoice::Pcm => true,
            CodecChoice::Opus => cfg!(feature = "opus"),
        }
    }
}

impl FromStr for CodecChoice {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pcm" => Ok(CodecChoice::Pcm),
            "opus" => Ok(CodecChoice::Opus),
            _ => bail!("Invalid codec: {}. Use: pcm, opus", s),
        }
    }
}

impl fmt::Display for CodecChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecChoice::Pcm => f.write_str("pcm"),
            CodecChoice::Opus => f.write_str("opus"),
        }
    }
}

/// Options for a split run
#[derive(Debug, Clone, Default)]
pub struct SplitOptions {
    pub settings: Settings,
    pub codec: CodecChoice,
    /// absolute index of the first sample the source yields
    pub start_offset: u64,
}

impl SplitOptions {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn with_codec(mut self, codec: CodecChoice) -> Self {
        self.codec = codec;
        self
    }

    /// Resume a split whose source starts at `offset` samples
    pub fn starting_at(mut self, offset: u64) -> Self {
        self.start_offset = offset;
        self
    }
}

/// One finished chunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedChunk {
    pub info: ChunkInfo,
    /// a complete Ogg/Opus stream
    pub data: Vec<u8>,
}

impl EncodedChunk {
    pub fn content_id(&self) -> String {
        content_id(&self.data)
    }
}

/// Content address of chunk bytes: lowercase hex blake3
pub fn content_id(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// File name of chunk `index`, e.g. `chunk-00042.opus`
pub fn chunk_file_name(prefix: &str, index: u64) -> String {
    format!("{}{:05}.opus", prefix, index)
}

/// Split `source`, handing every chunk to `sink` as soon as it is encoded
///
/// # Returns
/// Number of chunks produced
pub fn split_stream<S, F>(source: S, options: &SplitOptions, sink: F) -> Result<u64>
where
    S: SampleSource,
    F: FnMut(EncodedChunk) -> Result<()>,
{
    match options.codec {
        CodecChoice::Pcm => {
            let segmenter = ChunkSegmenter::new(source, options.settings)
                .starting_at(options.start_offset);
            drive(segmenter, sink)
        }
        #[cfg(feature = "opus")]
        CodecChoice::Opus => {
            let segmenter = ChunkSegmenter::with_codec(source, options.settings, |s: &Settings| {
                Ok(libseam_audio::OpusCodec::new(s.rate(), s.channels())?)
            })
            .starting_at(options.start_offset);
            drive(segmenter, sink)
        }
        #[cfg(not(feature = "opus"))]
        CodecChoice::Opus => bail!("opus codec support was not compiled in"),
    }
}

fn drive<S, C, F>(mut segmenter: ChunkSegmenter<S, C>, mut sink: F) -> Result<u64>
where
    S: SampleSource,
    C: FrameCodec,
    F: FnMut(EncodedChunk) -> Result<()>,
{
    let mut produced = 0;
    while segmenter.has_next() {
        let mut data = Vec::new();
        let index = segmenter.current_index();
        let Some(info) = segmenter
            .produce_next(&mut data)
            .with_context(|| format!("Failed to encode chunk {}", index))?
        else {
            break;
        };
        sink(EncodedChunk { info, data })?;
        produced += 1;
    }
    info!(chunks = produced, "split finished");
    Ok(produced)
}

/// Split samples held in memory
///
/// # Arguments
/// * `samples` - Interleaved f32 samples in range [-1.0, 1.0]
/// * `settings` - Rate and channel count must describe `samples`
pub fn split_samples(samples: &[f32], settings: &Settings) -> Result<Vec<EncodedChunk>> {
    let mut chunks = Vec::new();
    split_stream(
        SliceSource::new(samples),
        &SplitOptions::new(*settings),
        |chunk| {
            chunks.push(chunk);
            Ok(())
        },
    )?;
    Ok(chunks)
}

// ============================================================================
// Manifest
// ============================================================================

/// Describes one chunk file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: u64,
    pub file: String,
    pub start: u64,
    pub len: u64,
    pub crossfade_in: u64,
    pub crossfade_out: u64,
    pub bytes: usize,
    /// blake3 of the file contents
    pub id: String,
}

impl ManifestEntry {
    pub fn new(chunk: &EncodedChunk, file: impl Into<String>) -> Self {
        Self {
            index: chunk.info.index,
            file: file.into(),
            start: chunk.info.start,
            len: chunk.info.len,
            crossfade_in: chunk.info.crossfade_in,
            crossfade_out: chunk.info.crossfade_out,
            bytes: chunk.data.len(),
            id: chunk.content_id(),
        }
    }
}

/// Everything a player needs to stitch the chunks of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub created: String,
    pub encoder: String,
    pub codec: CodecChoice,
    pub settings: Settings,
    pub chunks: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(settings: Settings, codec: CodecChoice) -> Self {
        Self {
            created: now_utc(),
            encoder: format!("reseam {}", env!("CARGO_PKG_VERSION")),
            codec,
            settings,
            chunks: Vec::new(),
        }
    }

    /// total samples covered, overlaps counted once
    pub fn total_samples(&self) -> u64 {
        self.chunks.last().map_or(0, |c| c.start + c.len)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize manifest")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid manifest")
    }
}

// Get current time - use js_sys for WASM, chrono for native
#[cfg(all(target_arch = "wasm32", feature = "wasm"))]
fn now_utc() -> String {
    let date = js_sys::Date::new_0();
    date.to_iso_string().as_string().unwrap_or_default()
}

#[cfg(not(all(target_arch = "wasm32", feature = "wasm")))]
fn now_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ============================================================================
// Output directory
// ============================================================================

/// Writes chunk files into one directory and keeps their manifest entries
#[derive(Debug)]
pub struct ChunkDir {
    dir: PathBuf,
    prefix: String,
    entries: Vec<ManifestEntry>,
}

impl ChunkDir {
    /// Create `dir` if needed
    pub fn create(dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self {
            dir,
            prefix: prefix.into(),
            entries: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Write one chunk file
    pub fn write(&mut self, chunk: &EncodedChunk) -> Result<&ManifestEntry> {
        let name = chunk_file_name(&self.prefix, chunk.info.index);
        let path = self.dir.join(&name);
        fs::write(&path, &chunk.data)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.entries.push(ManifestEntry::new(chunk, name));
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Write `manifest.json` next to the chunks
    pub fn write_manifest(&self, settings: Settings, codec: CodecChoice) -> Result<PathBuf> {
        let mut manifest = Manifest::new(settings, codec);
        manifest.chunks = self.entries.clone();
        let path = self.dir.join("manifest.json");
        fs::write(&path, manifest.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Geometry of one chunk, computed without encoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PlannedChunk {
    pub index: u64,
    pub start: u64,
    pub end: u64,
    pub start_secs: f64,
    pub end_secs: f64,
}

/// Chunks a source of `total` samples is split into
pub fn plan(settings: &Settings, total: u64) -> Vec<PlannedChunk> {
    let rate = settings.rate() as f64;
    let mut chunks = Vec::new();
    let mut index = 0;
    while settings.chunk_start(index) < total {
        let start = settings.chunk_start(index);
        let end = settings.chunk_end(index).min(total);
        chunks.push(PlannedChunk {
            index,
            start,
            end,
            start_secs: start as f64 / rate,
            end_secs: end as f64 / rate,
        });
        if end == total {
            break;
        }
        index += 1;
    }
    chunks
}

/// Information about a chunk file
#[derive(Debug, Clone, Serialize)]
pub struct ChunkFileInfo {
    pub pre_skip: u16,
    pub channels: u8,
    pub input_rate: u32,
    pub vendor: String,
    pub tags: Vec<(String, String)>,
    pub packets: usize,
    pub final_granule: u64,
    pub duration_secs: f64,
    pub eos: bool,
}

/// Parse a chunk and report what a decoder would see
pub fn get_chunk_info(data: &[u8]) -> Result<ChunkFileInfo> {
    let stream = libseam_audio::OggOpusReader::new()
        .read(data)
        .context("Invalid chunk file")?;
    let duration_secs = stream.duration_secs();

    Ok(ChunkFileInfo {
        pre_skip: stream.head.pre_skip,
        channels: stream.head.channels,
        input_rate: stream.head.input_rate,
        tags: stream
            .tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        vendor: stream.vendor,
        packets: stream.packets.len(),
        final_granule: stream.final_granule,
        duration_secs,
        eos: stream.eos,
    })
}
