use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{
    Device, FromSample, Sample, SampleFormat, SampleRate, SizedSample, Stream, StreamError,
    SupportedStreamConfig, SupportedStreamConfigRange,
};
use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use super::{Coordinator, LevelMonitor};
use crate::config::AnalysisConfig;

/// Rates tried in order before falling back to the device default.
pub const PREFERRED_SAMPLE_RATES: [u32; 2] = [48_000, 44_100];

/// Live input from the system's default capture device.
///
/// The audio callback owns the [`Coordinator`]; the capture keeps a
/// [`LevelMonitor`] for the rest of the program. Dropping the capture stops
/// the stream.
pub struct InputCapture {
    stream: Stream,
    monitor: LevelMonitor,
    device_name: String,
    sample_rate: u32,
    channels: u16,
    errors: Receiver<StreamError>,
}

impl InputCapture {
    /// Opens the default input device, trying 48 kHz, then 44.1 kHz, then
    /// whatever the device reports as its default config.
    pub fn open_default(config: &AnalysisConfig) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| anyhow!("No input device available"))?;
        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio device: {}", device_name);

        for candidate in Self::candidate_configs(&device) {
            let rate = candidate.sample_rate().0;
            match Self::start(&device, &candidate, config) {
                Ok((stream, monitor, errors)) => {
                    info!(
                        "Capturing {} channel(s) at {} Hz ({:?})",
                        candidate.channels(),
                        rate,
                        candidate.sample_format()
                    );
                    return Ok(Self {
                        stream,
                        monitor,
                        device_name,
                        sample_rate: rate,
                        channels: candidate.channels(),
                        errors,
                    });
                }
                Err(e) => warn!("Failed to open input stream at {} Hz: {}", rate, e),
            }
        }

        Err(anyhow!("Failed to open an input stream on {}", device_name))
    }

    // 48k, 44.1k (when the device supports them), then the default config.
    fn candidate_configs(device: &Device) -> Vec<SupportedStreamConfig> {
        let mut candidates = Vec::new();

        match device.supported_input_configs() {
            Ok(ranges) => {
                let ranges: Vec<_> = ranges.collect();
                for rate in PREFERRED_SAMPLE_RATES {
                    if let Some(range) = pick_range(&ranges, rate) {
                        candidates.push(range.with_sample_rate(SampleRate(rate)));
                    }
                }
            }
            Err(e) => warn!("Failed to query supported input configs: {}", e),
        }

        match device.default_input_config() {
            Ok(default) => candidates.push(default),
            Err(e) => warn!("Failed to get default input config: {}", e),
        }

        candidates
    }

    fn start(
        device: &Device,
        supported: &SupportedStreamConfig,
        config: &AnalysisConfig,
    ) -> Result<(Stream, LevelMonitor, Receiver<StreamError>)> {
        let coordinator = Coordinator::new(config, supported.sample_rate().0 as f32)?;
        let monitor = coordinator.monitor();
        let (sender, receiver) = crossbeam_channel::unbounded();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => Self::build_stream::<f32>(device, supported, coordinator, sender)?,
            SampleFormat::I16 => Self::build_stream::<i16>(device, supported, coordinator, sender)?,
            SampleFormat::U16 => Self::build_stream::<u16>(device, supported, coordinator, sender)?,
            SampleFormat::I32 => Self::build_stream::<i32>(device, supported, coordinator, sender)?,
            other => return Err(anyhow!("Unsupported sample format {:?}", other)),
        };
        stream.play()?;

        Ok((stream, monitor, receiver))
    }

    fn build_stream<T>(
        device: &Device,
        supported: &SupportedStreamConfig,
        mut coordinator: Coordinator,
        sender: Sender<StreamError>,
    ) -> Result<Stream>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        let config = supported.config();
        let channels = config.channels as usize;

        let stream = device.build_input_stream(
            &config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                downmix(data, channels, |sample| coordinator.feed(sample));
            },
            move |err| {
                // The stream reports from its own thread; the owner logs.
                let _ = sender.send(err);
            },
            None,
        )?;

        Ok(stream)
    }

    pub fn monitor(&self) -> LevelMonitor {
        self.monitor.clone()
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Errors reported by the backend since the stream started.
    pub fn errors(&self) -> &Receiver<StreamError> {
        &self.errors
    }

    pub fn pause(&self) -> Result<()> {
        self.stream.pause()?;
        Ok(())
    }

    pub fn resume(&self) -> Result<()> {
        self.stream.play()?;
        Ok(())
    }
}

// A range covering `rate`, f32 first.
fn pick_range(
    ranges: &[SupportedStreamConfigRange],
    rate: u32,
) -> Option<SupportedStreamConfigRange> {
    let fits = |r: &&SupportedStreamConfigRange| {
        r.min_sample_rate().0 <= rate && rate <= r.max_sample_rate().0
    };
    ranges
        .iter()
        .filter(fits)
        .find(|r| r.sample_format() == SampleFormat::F32)
        .or_else(|| ranges.iter().find(fits))
        .cloned()
}

// Averages each interleaved frame to one f32. A trailing partial frame is dropped.
fn downmix<T>(data: &[T], channels: usize, mut sink: impl FnMut(f32))
where
    T: Sample,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    let norm = 1.0 / channels as f32;
    for frame in data.chunks_exact(channels) {
        let sum: f32 = frame.iter().map(|&s| f32::from_sample(s)).sum();
        sink(sum * norm);
    }
}
