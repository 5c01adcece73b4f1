use thiserror::Error;

/// Errors raised by the synthesis core and device negotiation.
#[derive(Debug, Error)]
pub enum SynthError {
    /// Envelope durations must be finite and positive, amplitudes finite.
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// Note frequency must be finite and positive.
    #[error("invalid frequency {0} Hz")]
    InvalidFrequency(f32),

    /// A patch with no partials or a malformed partial.
    #[error("invalid patch '{name}': {reason}")]
    InvalidPatch {
        /// Patch name.
        name: String,
        /// What is wrong with it.
        reason: String,
    },

    /// No instrument with this name in the bank.
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),

    /// Out-of-range settings value.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The host has no default output device.
    #[error("no output device available")]
    NoOutputDevice,

    /// The device cannot supply mono signed 16-bit PCM at the requested rate.
    #[error("output device cannot supply {channels} channel(s) of i16 at {sample_rate} Hz")]
    UnsupportedFormat {
        /// Requested channel count.
        channels: u16,
        /// Requested sample rate.
        sample_rate: u32,
    },

    #[error("failed to query device configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to build output stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start output stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

pub type Result<T> = std::result::Result<T, SynthError>;
