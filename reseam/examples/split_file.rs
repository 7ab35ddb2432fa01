//! Example: Split an audio file into gapless chunks and inspect the first one
//!
//! Run with: cargo run --example split_file input.flac out_dir

use reseam::audio::SymphoniaSource;
use reseam::{get_chunk_info, split_stream, ChunkDir, CodecChoice, Settings, SplitOptions};
use std::env;
use std::path::Path;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        eprintln!("Usage: {} <input-audio> <output-dir>", args[0]);
        std::process::exit(1);
    }

    let input_path = &args[1];
    let output_dir = &args[2];

    println!("Reading {}...", input_path);
    let source = SymphoniaSource::open(Path::new(input_path))?;
    println!("  Sample rate: {} Hz", source.rate());
    println!("  Channels: {}", source.channels());

    // 2 second chunks with 5 ms of overlap
    let settings = Settings::new(source.rate(), source.channels() as u8, 128_000, 0.005, 2.0)?;

    println!("\nSplitting...");
    let mut dir = ChunkDir::create(output_dir, "chunk-")?;
    let mut first = None;
    let produced = split_stream(source, &SplitOptions::new(settings), |chunk| {
        if first.is_none() {
            first = Some(chunk.data.clone());
        }
        let entry = dir.write(&chunk)?;
        println!("  {} ({} samples, {} bytes)", entry.file, entry.len, entry.bytes);
        Ok(())
    })?;
    let manifest = dir.write_manifest(settings, CodecChoice::Pcm)?;
    println!("\nWrote {} chunks and {}", produced, manifest.display());

    if let Some(data) = first {
        let info = get_chunk_info(&data)?;
        println!("\nFirst chunk:");
        println!("  Pre-skip: {}", info.pre_skip);
        println!("  Packets: {}", info.packets);
        println!("  Duration: {:.3}s", info.duration_secs);
        for (key, value) in &info.tags {
            println!("  {}={}", key, value);
        }
    }

    Ok(())
}
