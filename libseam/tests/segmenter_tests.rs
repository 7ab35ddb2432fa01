//! Chunk segmenter tests for libseam

use std::cell::Cell;
use std::rc::Rc;

use libseam_audio::{
    ChunkInfo, ChunkSegmenter, CodecError, FrameCodec, OggOpusReader, PcmCodec, SampleSource,
    SeamError, SeamResult, Settings, SliceSource,
};

/// 8 kHz mono, 80 sample overlap, 4000 sample chunks
fn small_settings() -> Settings {
    Settings::new(8000, 1, 16_000, 0.01, 0.5).unwrap()
}

fn ramp(n: usize) -> Vec<f32> {
    (0..n).map(|i| ((i % 4000) as f32 / 4000.0) - 0.5).collect()
}

fn run<S: SampleSource>(
    mut segmenter: ChunkSegmenter<S>,
) -> Vec<(ChunkInfo, Vec<u8>)> {
    let mut chunks = Vec::new();
    while segmenter.has_next() {
        let mut out = Vec::new();
        match segmenter.produce_next(&mut out).unwrap() {
            Some(info) => chunks.push((info, out)),
            None => assert!(out.is_empty()),
        }
    }
    chunks
}

// ============================================================================
// Geometry and tags
// ============================================================================

#[test]
fn test_chunks_follow_geometry() {
    let settings = small_settings();
    let data = ramp(10_200);
    let chunks = run(ChunkSegmenter::new(SliceSource::new(&data), settings));

    assert_eq!(chunks.len(), 3);
    for (i, (info, _)) in chunks.iter().enumerate() {
        assert_eq!(info.index, i as u64);
        assert_eq!(info.start, settings.chunk_start(info.index));
    }
    assert_eq!(chunks[0].0.end(), 4080);
    assert_eq!(chunks[1].0.start, 4000);
    assert_eq!(chunks[1].0.end(), 8160);
    assert_eq!(chunks[2].0.start, 8080);
    assert_eq!(chunks[2].0.end(), 10_200);
}

#[test]
fn test_crossfade_tags() {
    let settings = small_settings();
    let data = ramp(14_000);
    let chunks = run(ChunkSegmenter::new(SliceSource::new(&data), settings));
    assert_eq!(chunks.len(), 4);

    let last = chunks.len() - 1;
    for (i, (info, bytes)) in chunks.iter().enumerate() {
        let stream = OggOpusReader::new().read(bytes).unwrap();
        let cf_in = stream.tags.crossfade_in().unwrap() as u64;
        let cf_out = stream.tags.crossfade_out().unwrap() as u64;
        assert_eq!(cf_in, info.crossfade_in);
        assert_eq!(cf_out, info.crossfade_out);

        assert_eq!(cf_in, if i == 0 { 0 } else { 80 }, "chunk {i}");
        assert_eq!(cf_out, if i == last { 0 } else { 80 }, "chunk {i}");
    }

    // neighbours agree on the shared span
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].0.crossfade_out, pair[1].0.crossfade_in);
        assert_eq!(pair[0].0.end() - pair[0].0.crossfade_out, pair[1].0.start);
    }
}

#[test]
fn test_chunk_tags_come_first() {
    let data = ramp(5000);
    let chunks = run(ChunkSegmenter::new(SliceSource::new(&data), small_settings()));
    let stream = OggOpusReader::new().read(&chunks[1].1).unwrap();
    let keys: Vec<&str> = stream.tags.iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["CF_IN", "CF_OUT"]);
}

// ============================================================================
// End of stream
// ============================================================================

#[test]
fn test_source_of_exactly_one_chunk() {
    let settings = Settings::default();
    let total = settings.chunk_end(0) as usize;
    let data = ramp(total * 2);
    let mut segmenter = ChunkSegmenter::new(SliceSource::new(&data), settings);

    let mut out = Vec::new();
    let info = segmenter.produce_next(&mut out).unwrap().unwrap();
    assert_eq!(info.index, 0);
    assert_eq!(info.len, 240_048);
    assert_eq!(info.crossfade_in, 0);
    assert_eq!(info.crossfade_out, 0);
    assert!(!segmenter.has_next());

    let stream = OggOpusReader::new().read(&out).unwrap();
    assert_eq!(stream.duration_samples(), 240_048);

    out.clear();
    assert!(segmenter.produce_next(&mut out).unwrap().is_none());
    assert!(out.is_empty());
}

#[test]
fn test_source_not_read_after_end() {
    let calls = Rc::new(Cell::new(0usize));
    let remaining = Rc::new(Cell::new(6000usize));
    let source = {
        let calls = calls.clone();
        let remaining = remaining.clone();
        move |buf: &mut [f32]| {
            calls.set(calls.get() + 1);
            let n = buf.len().min(remaining.get());
            buf[..n].fill(0.25);
            remaining.set(remaining.get() - n);
            n
        }
    };

    let mut segmenter = ChunkSegmenter::new(source, small_settings());
    let mut out = Vec::new();
    assert!(segmenter.produce_next(&mut out).unwrap().is_some());
    assert!(segmenter.has_next());
    let last = segmenter.produce_next(&mut out).unwrap().unwrap();
    assert_eq!(last.end(), 6000);
    assert_eq!(last.crossfade_out, 0);
    assert!(!segmenter.has_next());

    let seen = calls.get();
    for _ in 0..3 {
        assert!(segmenter.produce_next(&mut out).unwrap().is_none());
    }
    assert_eq!(calls.get(), seen);
}

#[test]
fn test_empty_source() {
    let mut segmenter = ChunkSegmenter::new(SliceSource::new(&[]), small_settings());
    assert!(segmenter.has_next());
    let mut out = Vec::new();
    assert!(segmenter.produce_next(&mut out).unwrap().is_none());
    assert!(!segmenter.has_next());
    assert!(out.is_empty());
}

#[test]
fn test_one_sample_past_chunk_end() {
    let settings = small_settings();
    let data = ramp(4081);
    let chunks = run(ChunkSegmenter::new(SliceSource::new(&data), settings));
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].0.crossfade_out, 80);
    assert_eq!(chunks[1].0.start, 4000);
    assert_eq!(chunks[1].0.len, 81);
    assert_eq!(chunks[1].0.crossfade_out, 0);
}

// ============================================================================
// Resuming
// ============================================================================

#[test]
fn test_starting_at_skips_partial_chunk() {
    let settings = small_settings();
    let data = ramp(9000);
    let segmenter = ChunkSegmenter::new(SliceSource::new(&data[100..]), settings).starting_at(100);
    assert_eq!(segmenter.read_offset(), 100);
    assert_eq!(segmenter.current_index(), 1);

    let chunks = run(segmenter);
    assert_eq!(chunks[0].0.index, 1);
    assert_eq!(chunks[0].0.start, 4000);
    assert_eq!(chunks[0].0.crossfade_in, 80);
    assert_eq!(chunks.last().unwrap().0.end(), 9000);
}

#[test]
fn test_starting_at_chunk_boundary() {
    let settings = small_settings();
    let start = settings.chunk_start(2);
    let data = ramp(start as usize + 500);
    let chunks = run(
        ChunkSegmenter::new(SliceSource::new(&data[start as usize..]), settings).starting_at(start),
    );
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].0.index, 2);
    assert_eq!(chunks[0].0.len, 500);
}

#[test]
fn test_resumed_chunks_match_full_run() {
    let settings = small_settings();
    let data = ramp(12_500);
    let full = run(ChunkSegmenter::new(SliceSource::new(&data), settings));

    let start = settings.chunk_start(1);
    let resumed = run(
        ChunkSegmenter::new(SliceSource::new(&data[start as usize..]), settings).starting_at(start),
    );
    assert_eq!(resumed.len(), full.len() - 1);
    for (a, b) in full[1..].iter().zip(&resumed) {
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }
}

// ============================================================================
// Codec failures
// ============================================================================

/// pcm codec that refuses frames while `broken` is set
struct Flaky {
    inner: PcmCodec,
    broken: Rc<Cell<bool>>,
}

impl FrameCodec for Flaky {
    fn lookahead(&self) -> usize {
        self.inner.lookahead()
    }

    fn set_bitrate(&mut self, bits_per_second: u32) -> Result<(), CodecError> {
        self.inner.set_bitrate(bits_per_second)
    }

    fn encode(&mut self, pcm: &[f32], out: &mut Vec<u8>) -> Result<(), CodecError> {
        if self.broken.get() {
            return Err(CodecError::InternalError("flaky".into()));
        }
        self.inner.encode(pcm, out)
    }

    fn vendor(&self) -> &str {
        self.inner.vendor()
    }
}

#[test]
fn test_codec_failure_can_be_retried() {
    let settings = small_settings();
    let data = ramp(6000);
    let broken = Rc::new(Cell::new(true));
    let factory = {
        let broken = broken.clone();
        move |s: &Settings| -> SeamResult<Flaky> {
            Ok(Flaky {
                inner: PcmCodec::new(s.rate(), s.channels())?,
                broken: broken.clone(),
            })
        }
    };
    let mut segmenter = ChunkSegmenter::with_codec(SliceSource::new(&data), settings, factory);

    let mut out = Vec::new();
    let err = segmenter.produce_next(&mut out).unwrap_err();
    assert!(err.is_codec());
    assert!(matches!(err, SeamError::Codec(CodecError::InternalError(_))));
    assert!(segmenter.has_next());
    assert_eq!(segmenter.current_index(), 0);

    broken.set(false);
    let mut retried = Vec::new();
    let info = segmenter.produce_next(&mut retried).unwrap().unwrap();
    assert_eq!(info.index, 0);
    assert_eq!(info.len, 4080);

    let clean = run(ChunkSegmenter::new(SliceSource::new(&data), settings));
    assert_eq!(clean[0].1, retried);

    let info = segmenter.produce_next(&mut Vec::new()).unwrap().unwrap();
    assert_eq!(info, clean[1].0);
    assert!(!segmenter.has_next());
}

#[test]
fn test_codec_factory_error_is_returned() {
    let data = ramp(100);
    let mut segmenter = ChunkSegmenter::with_codec(
        SliceSource::new(&data),
        small_settings(),
        |_: &Settings| -> SeamResult<PcmCodec> { Err(CodecError::AllocFail.into()) },
    );
    let err = segmenter.produce_next(&mut Vec::new()).unwrap_err();
    assert!(matches!(err, SeamError::Codec(CodecError::AllocFail)));
    assert!(segmenter.has_next());
}

#[test]
fn test_huge_start_offset_is_rejected() {
    let data = ramp(100);
    let mut segmenter =
        ChunkSegmenter::new(SliceSource::new(&data), small_settings()).starting_at(u64::MAX - 10);
    match segmenter.produce_next(&mut Vec::new()) {
        Err(SeamError::InvalidSettings { field, .. }) => assert_eq!(field, "offset"),
        other => panic!("expected InvalidSettings, got {:?}", other),
    }
}

#[test]
fn test_chunks_shorter_than_overlap() {
    // 80 samples of overlap around 40 sample chunks
    let settings = Settings::new(8000, 1, 16_000, 0.01, 0.005).unwrap();
    let data = ramp(500);
    let chunks = run(ChunkSegmenter::new(SliceSource::new(&data), settings));

    let starts: Vec<u64> = chunks.iter().map(|c| c.0.start).collect();
    assert_eq!(starts, vec![0, 40, 160, 280, 400]);
    assert_eq!(chunks[0].0.len, 120);
    assert_eq!(chunks[1].0.len, 200);
    assert_eq!(chunks[4].0.end(), 500);
    assert_eq!(chunks[4].0.crossfade_out, 0);
    for pair in chunks.windows(2) {
        assert_eq!(pair[0].0.end() - pair[0].0.crossfade_out, pair[1].0.start);
        assert_eq!(pair[1].0.crossfade_in, 80);
    }
    for (info, bytes) in &chunks {
        let stream = OggOpusReader::new().read(bytes).unwrap();
        assert_eq!(stream.duration_samples(), info.len * 6);
    }
}

// ============================================================================
// Stereo
// ============================================================================

#[test]
fn test_stereo_chunks() {
    let settings = Settings::new(16000, 2, 64_000, 0.005, 0.25).unwrap();
    assert_eq!(settings.overlap_samples(), 80);
    let frames = 9000;
    let data: Vec<f32> = (0..frames)
        .flat_map(|i| [(i % 100) as f32 / 200.0, -((i % 50) as f32) / 100.0])
        .collect();
    let chunks = run(ChunkSegmenter::new(SliceSource::new(&data), settings));

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks.last().unwrap().0.end(), frames as u64);
    for (info, bytes) in &chunks {
        let stream = OggOpusReader::new().read(bytes).unwrap();
        assert_eq!(stream.head.channels, 2);
        assert_eq!(stream.head.input_rate, 16000);
        assert_eq!(stream.duration_samples(), info.len * 3);
    }
}
