//! End to end reconstruction tests for libseam
//!
//! Chunks are written with the pcm reference codec, so after dropping the
//! pre-skip and honoring the final granule every chunk must give back its
//! slice of the source exactly.

use libseam_audio::{
    decode_packet, ChunkInfo, ChunkSegmenter, EncoderOptions, FrameEncoder, OggOpusMuxer,
    OggOpusReader, PcmCodec, Settings, SliceSource, REFERENCE_RATE,
};

/// deterministic audio on the 16 bit grid, so the pcm codec is lossless
fn test_signal(frames: usize, channels: usize) -> Vec<f32> {
    let mut state = 12345u64;
    (0..frames * channels)
        .map(|i| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let jitter = ((state >> 40) as f32 / (1u64 << 24) as f32 - 0.5) * 0.05;
            let t = (i / channels) as f32;
            let tone = 0.6 * (t * 0.031 * (1 + i % channels) as f32).sin();
            ((tone + jitter) * 32768.0).round() / 32768.0
        })
        .collect()
}

/// decoded audio of one chunk with pre-skip and end padding removed
fn decode_chunk(bytes: &[u8], rate: u32) -> Vec<f32> {
    let stream = OggOpusReader::new().read(bytes).unwrap();
    let ch = stream.head.channels as usize;
    let mul = (REFERENCE_RATE / rate) as u64;

    let decoded: Vec<f32> = stream
        .packets
        .iter()
        .flat_map(|p| decode_packet(&p.data).unwrap())
        .collect();
    let skip = (stream.head.pre_skip as u64 / mul) as usize * ch;
    let keep = (stream.duration_samples() / mul) as usize * ch;
    assert!(skip + keep <= decoded.len());
    decoded[skip..skip + keep].to_vec()
}

fn split(data: &[f32], settings: Settings) -> Vec<(ChunkInfo, Vec<u8>)> {
    let mut segmenter = ChunkSegmenter::new(SliceSource::new(data), settings);
    let mut chunks = Vec::new();
    loop {
        let mut out = Vec::new();
        match segmenter.produce_next(&mut out).unwrap() {
            Some(info) => chunks.push((info, out)),
            None => return chunks,
        }
    }
}

fn check_reconstruction(settings: Settings, frames: usize) {
    let ch = settings.channels() as usize;
    let data = test_signal(frames, ch);
    let chunks = split(&data, settings);
    assert!(chunks.len() > 1);

    let mut rebuilt = Vec::new();
    for (info, bytes) in &chunks {
        let audio = decode_chunk(bytes, settings.rate());
        assert_eq!(audio.len(), info.len as usize * ch, "chunk {}", info.index);

        let start = info.start as usize * ch;
        assert_eq!(
            &audio[..],
            &data[start..start + audio.len()],
            "chunk {} differs from source",
            info.index
        );
        rebuilt.extend_from_slice(&audio[info.crossfade_in as usize * ch..]);
    }
    assert_eq!(rebuilt, data);
}

#[test]
fn test_mono_chunks_reconstruct_source() {
    let settings = Settings::new(8000, 1, 16_000, 0.005, 0.1).unwrap();
    check_reconstruction(settings, 3210);
}

#[test]
fn test_stereo_chunks_reconstruct_source() {
    let settings = Settings::new(16000, 2, 64_000, 0.002, 0.15).unwrap();
    check_reconstruction(settings, 7777);
}

#[test]
fn test_full_rate_chunks_reconstruct_source() {
    let settings = Settings::new(48000, 2, 128_000, 0.001, 0.05).unwrap();
    check_reconstruction(settings, 9600 + 17);
}

#[test]
fn test_overlaps_decode_identically() {
    let settings = Settings::new(12000, 1, 32_000, 0.01, 0.2).unwrap();
    let data = test_signal(12000, 1);
    let chunks = split(&data, settings);
    let overlap = settings.overlap_samples() as usize;

    for pair in chunks.windows(2) {
        let a = decode_chunk(&pair[0].1, settings.rate());
        let b = decode_chunk(&pair[1].1, settings.rate());
        assert_eq!(&a[a.len() - overlap..], &b[..overlap]);
    }
}

#[test]
fn test_encoder_reconstructs_any_length() {
    // lengths around frame boundaries and the codec lookahead at 8 kHz
    for n in [1, 52, 107, 108, 109, 159, 160, 161, 320, 1000] {
        let data = test_signal(n, 1);
        let mut bytes = Vec::new();
        let codec = PcmCodec::new(8000, 1).unwrap();
        let mut encoder = FrameEncoder::new(
            codec,
            OggOpusMuxer::new(&mut bytes),
            EncoderOptions::new(8000, 1),
        )
        .unwrap();
        encoder.push(&data).unwrap();
        encoder.finish().unwrap();

        assert_eq!(decode_chunk(&bytes, 8000), data, "length {n}");
    }
}

#[test]
fn test_lead_in_is_not_silence() {
    let settings = Settings::new(8000, 1, 16_000, 0.005, 0.1).unwrap();
    let data = test_signal(2000, 1);
    let chunks = split(&data, settings);

    let stream = OggOpusReader::new().read(&chunks[1].1).unwrap();
    let lead_in = decode_packet(&stream.packets[0].data).unwrap();
    // 52 samples of codec delay come first, then the predicted past
    assert!(lead_in[52..].iter().any(|&v| v != 0.0));
    assert!(lead_in.iter().all(|v| v.abs() <= 1.0));
}
