use thiserror::Error;

/// Errors raised at the boundary of the analysis core.
///
/// Once a [`Coordinator`](crate::Coordinator) is built the signal path itself
/// cannot fail; everything here is a caller precondition or a config problem.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("{what} must be a non-zero power of two, got {value}")]
    NotPowerOfTwo { what: &'static str, value: usize },

    #[error("band index {0} is out of range (0=raw, 1=low, 2=mid, 3=high)")]
    InvalidBand(i64),

    #[error("averaging mode {0} is unknown (0=linear, 1=logarithmic)")]
    InvalidAveraging(u32),

    #[error("destination holds {available} values but {needed} are required")]
    DestinationTooShort { needed: usize, available: usize },

    #[error("spectral window expects {expected} samples, got {actual}")]
    WindowLength { expected: usize, actual: usize },

    #[error("cannot reduce spectrum to {requested} bands (valid: 1..={max})")]
    InvalidBandCount { requested: usize, max: usize },

    #[error("{requested} log bands cannot cover {octaves} octaves")]
    TooFewLogBands { requested: usize, octaves: usize },

    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f32),

    #[error("crossover {crossover_hz} Hz / Q {q} is not a usable filter setting")]
    InvalidFilter { crossover_hz: f32, q: f32 },

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
