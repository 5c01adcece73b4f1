pub mod audio;

use std::sync::Arc;
use log::debug;
use crate::config::Settings;
use crate::core::instrument::Instrument;
use crate::core::oscillator::NoteId;
use crate::core::voice::VoiceRegistry;
use crate::error::{Result, SynthError};
pub use audio::{ClipMode, Mixer};

/// Synthesis engine context: the sample clock, the live voices and the
/// output mixer.
///
/// Shared between the control side and the audio callback behind a single
/// lock; every timestamp is expressed on this engine's sample clock.
#[derive(Debug)]
pub struct Synth {
    sample_rate: u32,
    sample_clock: u64,
    voices: VoiceRegistry,
    mixer: Mixer,
}

impl Synth {
    pub fn new(sample_rate: u32, mixer: Mixer) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SynthError::InvalidSettings("sample rate must be positive".to_string()));
        }
        Ok(Synth {
            sample_rate,
            sample_clock: 0,
            voices: VoiceRegistry::new(),
            mixer,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(
            settings.sample_rate,
            Mixer::new(settings.amplitude, settings.headroom_voices, settings.clip),
        )
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Samples rendered since the engine started.
    pub fn sample_clock(&self) -> u64 {
        self.sample_clock
    }

    /// Current time in seconds on the sample clock.
    pub fn now(&self) -> f64 {
        self.sample_clock as f64 / self.sample_rate as f64
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    /// Handle note on event
    pub fn note_on(&mut self, id: NoteId, frequency: f32, instrument: Arc<dyn Instrument>) -> Result<()> {
        let now = self.now();
        self.note_on_at(id, frequency, instrument, now)
    }

    pub fn note_on_at(&mut self, id: NoteId, frequency: f32, instrument: Arc<dyn Instrument>, at: f64) -> Result<()> {
        debug!("note on: id={} {:.2} Hz ({}) at {:.4}s", id, frequency, instrument.name(), at);
        self.voices.note_on(id, frequency, instrument, at)
    }

    /// Handle note off event
    pub fn note_off(&mut self, id: NoteId) -> usize {
        let now = self.now();
        self.note_off_at(id, now)
    }

    /// Releases `id` at `at`, or at the current clock time if `at` lies
    /// ahead of it. Releases cannot be scheduled.
    pub fn note_off_at(&mut self, id: NoteId, at: f64) -> usize {
        let at = at.min(self.now());
        let released = self.voices.note_off(id, at);
        debug!("note off: id={} at {:.4}s released {} voice(s)", id, at, released);
        released
    }

    pub fn is_held(&self, id: NoteId) -> bool {
        self.voices.is_held(id)
    }

    /// Removes voices whose release has finished. Control side only.
    pub fn compact(&mut self) -> usize {
        self.voices.compact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::Patch;

    #[test]
    fn clock_advances_by_rendered_samples() {
        let mut synth = Synth::new(44100, Mixer::default()).unwrap();
        assert_eq!(synth.now(), 0.0);
        synth.render(441);
        assert_eq!(synth.sample_clock(), 441);
        assert!((synth.now() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn note_events_are_stamped_with_clock_time() {
        let mut synth = Synth::new(100, Mixer::default()).unwrap();
        synth.render(50);
        synth.note_on(7, 440.0, Arc::new(Patch::bell())).unwrap();
        synth.render(25);
        assert_eq!(synth.note_off(7), 1);
        let note = &synth.voices().notes()[0];
        assert_eq!(note.time_on(), 0.5);
        assert_eq!(note.time_off(), Some(0.75));
    }

    #[test]
    fn from_settings_uses_configured_rate() {
        let settings = Settings { sample_rate: 48000, ..Settings::default() };
        assert_eq!(Synth::from_settings(&settings).unwrap().sample_rate(), 48000);
    }

    #[test]
    fn zero_sample_rate_is_rejected() {
        assert!(matches!(Synth::new(0, Mixer::default()), Err(SynthError::InvalidSettings(_))));
        let settings = Settings { sample_rate: 0, ..Settings::default() };
        assert!(Synth::from_settings(&settings).is_err());
    }

    #[test]
    fn release_stamped_ahead_of_the_clock_starts_now() {
        let mut synth = Synth::new(100, Mixer::default()).unwrap();
        synth.note_on(1, 440.0, Arc::new(Patch::harmonica())).unwrap();
        synth.render(2);
        assert_eq!(synth.note_off_at(1, 5.0), 1);
        assert_eq!(synth.voices().notes()[0].time_off(), Some(0.02));
    }
}
