use anyhow::Result;
use clap::Parser;
use crossbeam_channel::RecvTimeoutError;
use log::{info, warn};
use std::time::{Duration, Instant};

use arrvee_levels::audio::capture::InputCapture;
use arrvee_levels::audio::{peak_dbfs, rms_dbfs};
use arrvee_levels::{AnalysisConfig, Averaging, Band, LevelTracker};

#[derive(Parser)]
#[command(name = "arrvee-levels")]
#[command(about = "Live level meter for the default audio input")]
struct Args {
    /// JSON analysis config (history size, crossover, tracker settings)
    #[arg(long, short)]
    config: Option<String>,

    /// Report interval in milliseconds
    #[arg(long, default_value = "100")]
    interval_ms: u64,

    /// Number of spectrum bands to report
    #[arg(long, default_value = "8")]
    bands: usize,

    /// Group spectrum bins by octave instead of evenly
    #[arg(long)]
    log_scale: bool,

    /// Stop after this many seconds (runs until the stream ends otherwise)
    #[arg(long)]
    seconds: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };

    info!("Starting Arrvee level meter");
    let capture = InputCapture::open_default(&config)?;
    let monitor = capture.monitor();
    info!(
        "Listening on {} ({} Hz, {} channel(s))",
        capture.device_name(),
        capture.sample_rate(),
        capture.channels()
    );

    let mode = if args.log_scale {
        Averaging::Logarithmic
    } else {
        Averaging::Linear
    };
    let mut spectrum = vec![0.0; mode.output_len(args.bands)?];
    let mut trackers: Vec<LevelTracker> = Band::ALL
        .iter()
        .map(|_| LevelTracker::new(config.tracker.clone()))
        .collect();

    let interval = Duration::from_millis(args.interval_ms.max(1));
    let window_secs = interval.as_secs_f32();
    let started = Instant::now();
    let mut last = started;

    loop {
        if let Some(limit) = args.seconds {
            if started.elapsed().as_secs_f32() >= limit {
                break;
            }
        }

        match capture.errors().recv_timeout(interval) {
            Ok(err) => warn!("Input stream error: {}", err),
            Err(RecvTimeoutError::Timeout) => {
                let now = Instant::now();
                let dt = now.duration_since(last).as_secs_f32();
                last = now;

                let mut line = String::new();
                for (band, tracker) in Band::ALL.iter().zip(trackers.iter_mut()) {
                    let peak = monitor.peak(*band, window_secs);
                    let rms = monitor.rms(*band, window_secs);
                    let meter = tracker.update(rms_dbfs(rms), dt);
                    line.push_str(&format!(
                        "{}: {:6.1} dB peak {:6.1} dB rms {:4.2} | ",
                        band.name(),
                        peak_dbfs(peak),
                        rms_dbfs(rms),
                        meter
                    ));
                }
                info!("{}", line.trim_end_matches(" | "));

                match monitor.band_averages(mode, &mut spectrum, args.bands) {
                    Ok(written) => {
                        let bars: Vec<String> =
                            spectrum[..written].iter().map(|v| format!("{:.3}", v)).collect();
                        info!("spectrum [{}]", bars.join(" "));
                    }
                    Err(e) => warn!("Spectrum unavailable: {}", e),
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                warn!("Input stream closed");
                break;
            }
        }
    }

    info!("Level meter stopped after {:.1}s", started.elapsed().as_secs_f32());
    Ok(())
}
