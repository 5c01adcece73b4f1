use std::fmt;
use std::sync::Arc;
use crate::core::instrument::Instrument;
use crate::error::{Result, SynthError};

/// Identity of the key that produced a note.
pub type NoteId = i32;

/// One sounding voice: a pitch bound to an instrument and its key timestamps.
#[derive(Clone)]
pub struct Note {
    id: NoteId,
    frequency: f32,
    time_on: f64,
    time_off: Option<f64>,
    pub(crate) active: bool,
    instrument: Arc<dyn Instrument>,
}

impl Note {
    pub fn new(id: NoteId, frequency: f32, instrument: Arc<dyn Instrument>, time_on: f64) -> Result<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(SynthError::InvalidFrequency(frequency));
        }
        Ok(Self {
            id,
            frequency,
            time_on,
            time_off: None,
            active: true,
            instrument,
        })
    }

    pub fn id(&self) -> NoteId {
        self.id
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn instrument(&self) -> &Arc<dyn Instrument> {
        &self.instrument
    }

    pub fn time_on(&self) -> f64 {
        self.time_on
    }

    /// `None` until the key has been released.
    pub fn time_off(&self) -> Option<f64> {
        self.time_off
    }

    pub fn is_released(&self) -> bool {
        self.time_off.is_some()
    }

    /// Whether the last rendered sample still had this note sounding.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Marks the key release. Only the first call has any effect; times
    /// before `time_on` are clamped to it.
    pub fn release(&mut self, at: f64) -> bool {
        if self.time_off.is_some() {
            return false;
        }
        self.time_off = Some(at.max(self.time_on));
        true
    }

    /// Contribution of this note at time `t`, updating its liveness.
    /// A held note stays active even while its envelope is silent.
    #[inline]
    pub fn render(&mut self, t: f64) -> f32 {
        let (sample, alive) = self.instrument.render(self.frequency, t, self.time_on, self.time_off);
        self.active = alive || self.time_off.is_none();
        sample
    }
}

impl fmt::Debug for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Note")
            .field("id", &self.id)
            .field("frequency", &self.frequency)
            .field("time_on", &self.time_on)
            .field("time_off", &self.time_off)
            .field("active", &self.active)
            .field("instrument", &self.instrument.name())
            .finish()
    }
}
