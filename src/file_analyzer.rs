use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;

use arrvee_levels::audio::{peak_dbfs, rms_dbfs};
use arrvee_levels::{AnalysisConfig, Averaging, Band, Coordinator, LevelTracker};

#[derive(Parser)]
#[command(name = "arrvee-file-analyzer")]
#[command(about = "Runs the level analysis over a WAV file and writes frame-by-frame JSON")]
struct Args {
    /// WAV file to analyze
    #[arg()]
    input_file: String,

    /// Output JSON file path
    #[arg(long, short, default_value = "levels.json")]
    output: String,

    /// Analysis frames per second
    #[arg(long, default_value = "60")]
    frame_rate: f32,

    /// Number of spectrum bands per frame
    #[arg(long, default_value = "16")]
    bands: usize,

    /// Group spectrum bins by octave instead of evenly
    #[arg(long)]
    log_scale: bool,

    /// JSON analysis config
    #[arg(long, short)]
    config: Option<String>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    filename: String,
    sample_rate: u32,
    channels: u16,
    duration_seconds: f32,
    total_frames: usize,
}

#[derive(Debug, Serialize)]
struct BandLevel {
    band: &'static str,
    peak: f32,
    rms: f32,
    peak_db: f32,
    rms_db: f32,
    meter: f32,
}

#[derive(Debug, Serialize)]
struct FrameReport {
    timestamp: f32,
    levels: Vec<BandLevel>,
    spectrum: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct BandSummary {
    band: &'static str,
    max_peak_db: f32,
    mean_rms_db: f32,
}

#[derive(Debug, Serialize)]
struct AnalysisReport {
    file_info: FileInfo,
    config: AnalysisConfig,
    averaging: Averaging,
    bands: usize,
    summary: Vec<BandSummary>,
    frames: Vec<FrameReport>,
}

struct DecodedAudio {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

fn read_wav(path: &str) -> Result<DecodedAudio> {
    let reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open WAV '{}'", path))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read float samples")?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read int samples")?
        }
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn analyze(args: &Args, config: &AnalysisConfig, audio: &DecodedAudio) -> Result<AnalysisReport> {
    let sample_rate = audio.sample_rate as f32;
    let channels = audio.channels.max(1) as usize;
    let mut coordinator = Coordinator::new(config, sample_rate)?;

    let mode = if args.log_scale {
        Averaging::Logarithmic
    } else {
        Averaging::Linear
    };
    let hop_frames = ((sample_rate / args.frame_rate).round() as usize).max(1);
    let window_secs = hop_frames as f32 / sample_rate;
    let dt = 1.0 / args.frame_rate;

    let mut trackers: Vec<LevelTracker> = Band::ALL
        .iter()
        .map(|_| LevelTracker::new(config.tracker.clone()))
        .collect();
    let mut summary: Vec<BandSummary> = Band::ALL
        .iter()
        .map(|band| BandSummary {
            band: band.name(),
            max_peak_db: f32::NEG_INFINITY,
            mean_rms_db: 0.0,
        })
        .collect();

    let mut frames = Vec::new();
    let mut spectrum = vec![0.0; mode.output_len(args.bands)?];

    for (index, hop) in audio.samples.chunks(hop_frames * channels).enumerate() {
        coordinator.feed_interleaved(hop, channels);

        let mut levels = Vec::with_capacity(Band::ALL.len());
        for (i, band) in Band::ALL.iter().enumerate() {
            let peak = coordinator.peak(*band, window_secs);
            let rms = coordinator.rms(*band, window_secs);
            let peak_db = peak_dbfs(peak);
            let rms_db = rms_dbfs(rms);

            summary[i].max_peak_db = summary[i].max_peak_db.max(peak_db);
            summary[i].mean_rms_db += rms_db;

            levels.push(BandLevel {
                band: band.name(),
                peak,
                rms,
                peak_db,
                rms_db,
                meter: trackers[i].update(rms_db, dt),
            });
        }

        let written = coordinator.band_averages(mode, &mut spectrum, args.bands)?;
        frames.push(FrameReport {
            timestamp: (index * hop_frames) as f32 / sample_rate,
            levels,
            spectrum: spectrum[..written].to_vec(),
        });
    }

    if !frames.is_empty() {
        for band in summary.iter_mut() {
            band.mean_rms_db /= frames.len() as f32;
        }
    }

    Ok(AnalysisReport {
        file_info: FileInfo {
            filename: args.input_file.clone(),
            sample_rate: audio.sample_rate,
            channels: audio.channels,
            duration_seconds: (audio.samples.len() / channels) as f32 / sample_rate,
            total_frames: frames.len(),
        },
        config: config.clone(),
        averaging: mode,
        bands: args.bands,
        summary,
        frames,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if !(args.frame_rate > 0.0) {
        bail!("Frame rate must be positive, got {}", args.frame_rate);
    }

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    info!("Arrvee File Analyzer");
    info!("Input file: {}", args.input_file);
    let audio = read_wav(&args.input_file)?;
    info!(
        "Loaded {} samples ({} Hz, {} channel(s))",
        audio.samples.len(),
        audio.sample_rate,
        audio.channels
    );

    let report = analyze(&args, &config, &audio)?;

    let writer = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer_pretty(writer, &report)?;

    info!("\n=== ANALYSIS RESULTS ===");
    info!("Duration: {:.2} seconds", report.file_info.duration_seconds);
    info!("Total frames: {}", report.file_info.total_frames);
    for band in &report.summary {
        info!(
            "{:>4}: max peak {:6.1} dBFS, mean rms {:6.1} dBFS",
            band.band, band.max_peak_db, band.mean_rms_db
        );
    }
    info!("Results written to {}", args.output);

    Ok(())
}
