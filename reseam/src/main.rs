use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use libseam_audio::{is_supported_rate, ReaderSource, SampleFormat};
use reseam::audio::SymphoniaSource;
use reseam::{ChunkDir, CodecChoice, SampleSource, Settings, SplitOptions};
use std::fs;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "reseam")]
#[command(version)]
#[command(about = "Gapless chunked Ogg/Opus splitter", long_about = None)]
struct Cli {
    /// More log output (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split audio into independently decodable chunk files
    Split {
        /// Output directory
        out_dir: PathBuf,
        /// Raw interleaved samples (default: stdin)
        #[arg(short, long, conflicts_with = "decode")]
        input: Option<PathBuf>,
        /// Decode an audio file (mp3, wav, flac, ogg, etc.) instead of raw samples
        #[arg(long)]
        decode: Option<PathBuf>,
        /// Raw sample format (s16le, f32le)
        #[arg(long, default_value = "s16le")]
        format: SampleFormat,
        /// Codec for the chunk packets (pcm, opus)
        #[arg(long, default_value = "pcm")]
        codec: CodecChoice,
        /// Chunk file name prefix
        #[arg(long, default_value = "chunk-")]
        prefix: String,
        /// Absolute index of the first input sample, for resumed runs
        #[arg(long, default_value = "0")]
        start: u64,
        /// Write manifest.json next to the chunks
        #[arg(long)]
        manifest: bool,
        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Show information about a chunk file
    Inspect {
        /// Chunk file
        input: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print chunk boundaries for a source of the given length
    Plan {
        /// Source duration in seconds
        #[arg(long)]
        duration: f64,
        #[command(flatten)]
        settings: SettingsArgs,
    },
}

#[derive(Args)]
struct SettingsArgs {
    /// JSON settings file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Sample rate (8000, 12000, 16000, 24000, 48000)
    #[arg(long)]
    rate: Option<u32>,
    /// Channel count (1 or 2)
    #[arg(long)]
    channels: Option<u8>,
    /// Target bitrate in bits per second
    #[arg(long)]
    bitrate: Option<u32>,
    /// Overlap between chunks in seconds
    #[arg(long)]
    overlap: Option<f64>,
    /// Chunk length in seconds
    #[arg(long)]
    length: Option<f64>,
}

impl SettingsArgs {
    fn resolve(&self) -> Result<Settings> {
        let base = match &self.config {
            Some(path) => {
                let json = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Settings::from_json(&json).context("Invalid settings file")?
            }
            None => Settings::default(),
        };
        Settings::new(
            self.rate.unwrap_or(base.rate()),
            self.channels.unwrap_or(base.channels()),
            self.bitrate.unwrap_or(base.bitrate()),
            self.overlap.unwrap_or(base.overlap()),
            self.length.unwrap_or(base.length()),
        )
        .context("Invalid settings")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Split {
            out_dir,
            input,
            decode,
            format,
            codec,
            prefix,
            start,
            manifest,
            settings,
        } => {
            split(SplitArgs {
                out_dir,
                input,
                decode,
                format,
                codec,
                prefix,
                start,
                manifest,
                settings,
            })?;
        }
        Commands::Inspect { input, json } => {
            inspect(&input, json)?;
        }
        Commands::Plan { duration, settings } => {
            plan(duration, &settings)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(io::stderr),
        )
        .init();
}

struct SplitArgs {
    out_dir: PathBuf,
    input: Option<PathBuf>,
    decode: Option<PathBuf>,
    format: SampleFormat,
    codec: CodecChoice,
    prefix: String,
    start: u64,
    manifest: bool,
    settings: SettingsArgs,
}

fn split(args: SplitArgs) -> Result<()> {
    if !args.codec.is_available() {
        bail!(
            "This build has no {} support. Rebuild with --features {}",
            args.codec,
            args.codec
        );
    }

    let mut settings = args.settings.resolve()?;

    if let Some(path) = &args.decode {
        println!("Reading {}...", path.display());
        let source = SymphoniaSource::open(path)?;
        println!("  Sample rate: {} Hz", source.rate());
        println!("  Channels: {}", source.channels());

        if !is_supported_rate(source.rate()) {
            bail!(
                "{} Hz input cannot be chunked without resampling",
                source.rate()
            );
        }
        if !(1..=2).contains(&source.channels()) {
            bail!("{} channel input is not supported", source.channels());
        }
        // the file decides rate and channel count
        settings = Settings::new(
            source.rate(),
            source.channels() as u8,
            settings.bitrate(),
            settings.overlap(),
            settings.length(),
        )
        .context("Invalid settings for this input")?;

        return run_split(source, settings, &args);
    }

    match &args.input {
        Some(path) => {
            println!("Reading {}...", path.display());
            let file = fs::File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            run_split(
                ReaderSource::new(BufReader::new(file), args.format),
                settings,
                &args,
            )
        }
        None => {
            println!("Reading {:?} samples from stdin...", args.format);
            run_split(
                ReaderSource::new(io::stdin().lock(), args.format),
                settings,
                &args,
            )
        }
    }
}

fn run_split<S: SampleSource>(source: S, settings: Settings, args: &SplitArgs) -> Result<()> {
    println!(
        "Splitting into {:.3}s chunks with {:.3}s overlap ({}, {} Hz, {} ch)...",
        settings.length(),
        settings.overlap(),
        args.codec,
        settings.rate(),
        settings.channels()
    );

    let mut dir = ChunkDir::create(&args.out_dir, args.prefix.as_str())?;
    let options = SplitOptions::new(settings)
        .with_codec(args.codec)
        .starting_at(args.start);

    let produced = reseam::split_stream(source, &options, |chunk| {
        let entry = dir.write(&chunk)?;
        println!(
            "  {}  {:>10} .. {:<10} {:>8} bytes",
            entry.file,
            entry.start,
            entry.start + entry.len,
            entry.bytes
        );
        Ok(())
    })?;

    if args.manifest {
        let path = dir.write_manifest(settings, args.codec)?;
        println!("  Manifest: {}", path.display());
    }

    println!("Done!");
    println!("  Chunks: {}", produced);
    println!("  Output: {}", dir.path().display());

    Ok(())
}

fn inspect(input: &PathBuf, json: bool) -> Result<()> {
    let data = fs::read(input).context("Failed to read chunk file")?;
    let info = reseam::get_chunk_info(&data)?;

    if json {
        let json_str = serde_json::to_string_pretty(&info).context("Failed to serialize info")?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("Ogg/Opus Chunk");
    println!("───────────────────────────────");
    println!("  Vendor:      {}", info.vendor);
    println!("  Channels:    {}", info.channels);
    println!("  Input rate:  {} Hz", info.input_rate);
    println!("  Pre-skip:    {}", info.pre_skip);
    println!("  Packets:     {}", info.packets);
    println!("  Granule:     {}", info.final_granule);
    println!("  Duration:    {:.6}s", info.duration_secs);
    println!("  Complete:    {}", if info.eos { "yes" } else { "no" });
    println!("  Content id:  {}", reseam::content_id(&data));

    if !info.tags.is_empty() {
        println!();
        println!("Tags");
        println!("───────────────────────────────");
        for (key, value) in &info.tags {
            println!("  {:<12} {}", key, value);
        }
    }

    Ok(())
}

fn plan(duration: f64, settings: &SettingsArgs) -> Result<()> {
    if !(duration.is_finite() && duration >= 0.0) {
        bail!("Invalid duration: {}", duration);
    }
    let settings = settings.resolve()?;
    let total = (duration * settings.rate() as f64).round() as u64;

    println!(
        "{} samples at {} Hz, {} per chunk, {} overlap",
        total,
        settings.rate(),
        settings.length_samples(),
        settings.overlap_samples()
    );
    for chunk in reseam::plan(&settings, total) {
        println!(
            "  {:>5}  {:>10} .. {:<10}  {:>9.3}s .. {:.3}s",
            chunk.index, chunk.start, chunk.end, chunk.start_secs, chunk.end_secs
        );
    }

    Ok(())
}
