//! Real-time polyphonic synthesizer: key events in, mono 16-bit PCM out.

pub mod app;
pub mod config;
pub mod core;
pub mod error;
pub mod input;
pub mod messaging;

pub use crate::core::instrument::{Instrument, InstrumentBank, Partial, Patch};
pub use crate::core::oscillator::{EnvelopeConfig, EnvelopeStage, Fm, Note, NoteId, Waveform};
pub use crate::core::synth::{ClipMode, Mixer, Synth};
pub use crate::core::voice::VoiceRegistry;
pub use crate::error::SynthError;
