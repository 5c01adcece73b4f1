use serde::{Serialize, Deserialize};
use crate::error::{Result, SynthError};

/// Which part of the envelope a note is in. Derived from the note's
/// timestamps and the current time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeStage {
    Attack,
    Decay,
    Sustain,
    Release,
}

/// Attack/decay/sustain/release shape, immutable once built.
///
/// Times are in seconds. The attack ramps 0 -> `start_amplitude`, the decay
/// ramps `start_amplitude` -> `sustain_amplitude`, and the release ramps
/// whatever level the note had at key-up down to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeFields")]
pub struct EnvelopeConfig {
    attack_time: f32,
    decay_time: f32,
    release_time: f32,
    start_amplitude: f32,
    sustain_amplitude: f32,
}

#[derive(Deserialize)]
struct EnvelopeFields {
    attack_time: f32,
    decay_time: f32,
    release_time: f32,
    start_amplitude: f32,
    sustain_amplitude: f32,
}

impl TryFrom<EnvelopeFields> for EnvelopeConfig {
    type Error = SynthError;

    fn try_from(f: EnvelopeFields) -> Result<Self> {
        EnvelopeConfig::new(f.attack_time, f.decay_time, f.release_time, f.start_amplitude, f.sustain_amplitude)
    }
}

impl EnvelopeConfig {
    pub fn new(
        attack_time: f32,
        decay_time: f32,
        release_time: f32,
        start_amplitude: f32,
        sustain_amplitude: f32,
    ) -> Result<Self> {
        for (label, value) in [("attack", attack_time), ("decay", decay_time), ("release", release_time)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SynthError::InvalidEnvelope(format!(
                    "{label} time must be a positive number of seconds, got {value}"
                )));
            }
        }
        if !start_amplitude.is_finite() || !sustain_amplitude.is_finite() {
            return Err(SynthError::InvalidEnvelope("amplitudes must be finite".to_string()));
        }
        Ok(Self {
            attack_time,
            decay_time,
            release_time,
            start_amplitude,
            sustain_amplitude,
        })
    }

    /// Built-in shapes; durations are known to be positive.
    pub(crate) const fn preset(
        attack_time: f32,
        decay_time: f32,
        release_time: f32,
        start_amplitude: f32,
        sustain_amplitude: f32,
    ) -> Self {
        Self { attack_time, decay_time, release_time, start_amplitude, sustain_amplitude }
    }

    pub fn attack_time(&self) -> f32 {
        self.attack_time
    }

    pub fn decay_time(&self) -> f32 {
        self.decay_time
    }

    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    pub fn start_amplitude(&self) -> f32 {
        self.start_amplitude
    }

    pub fn sustain_amplitude(&self) -> f32 {
        self.sustain_amplitude
    }

    /// A released note is in `Release` whatever `t` is, matching the branch
    /// `amplitude` takes.
    pub fn stage(&self, t: f64, time_on: f64, time_off: Option<f64>) -> EnvelopeStage {
        if time_off.is_some() {
            return EnvelopeStage::Release;
        }
        let life_time = t - time_on;
        let (attack_end, decay_end) = self.boundaries();
        if life_time <= attack_end {
            EnvelopeStage::Attack
        } else if life_time <= decay_end {
            EnvelopeStage::Decay
        } else {
            EnvelopeStage::Sustain
        }
    }

    /// Envelope level of a note pressed at `time_on` (and released at
    /// `time_off`, if it has been) evaluated at time `t`.
    ///
    /// Pure: the release starting level is recomputed from the timestamps on
    /// every call instead of being cached on the note. Before `time_off` a
    /// released note holds its key-up level.
    pub fn amplitude(&self, t: f64, time_on: f64, time_off: Option<f64>) -> f32 {
        let amplitude = match time_off {
            None => self.held_level(t - time_on),
            Some(off) => {
                let release_level = self.held_level(off - time_on);
                let progress = ramp_progress(t - off, self.release_time as f64);
                release_level * (1.0 - progress)
            }
        };
        amplitude.max(0.0)
    }

    /// Attack/decay/sustain level `life_time` seconds after key-down.
    fn held_level(&self, life_time: f64) -> f32 {
        let (attack_end, decay_end) = self.boundaries();
        if life_time <= attack_end {
            ramp_progress(life_time, attack_end) * self.start_amplitude
        } else if life_time <= decay_end {
            let progress = ramp_progress(life_time - attack_end, self.decay_time as f64);
            self.start_amplitude + progress * (self.sustain_amplitude - self.start_amplitude)
        } else {
            self.sustain_amplitude
        }
    }

    /// Ends of the attack and decay segments, seconds after key-down.
    fn boundaries(&self) -> (f64, f64) {
        let attack = self.attack_time as f64;
        (attack, attack + self.decay_time as f64)
    }
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self::preset(0.01, 1.0, 1.0, 1.0, 0.0)
    }
}

/// Fraction of a linear segment of length `duration` covered after
/// `elapsed` seconds, in [0, 1]. A zero-length segment is already complete.
fn ramp_progress(elapsed: f64, duration: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (elapsed / duration).clamp(0.0, 1.0) as f32
}
