//! overlapping chunk segmentation of a continuous source

mod chunker;
mod source;

pub use chunker::{ChunkInfo, ChunkSegmenter, CodecFactory};
pub use source::{ReaderSource, SampleSource, SliceSource};
