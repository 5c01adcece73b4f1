mod envelope;
mod waveform;
mod note;

// Re-export key types so they're accessible from core::oscillator
pub use self::envelope::{EnvelopeConfig, EnvelopeStage};
pub use self::waveform::{phase, Fm, Waveform, SAW_HARMONICS};
pub use self::note::{Note, NoteId};
