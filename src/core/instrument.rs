//! Instruments: stateless sound sources shared by every note that plays them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use serde::{Serialize, Deserialize};
use crate::core::oscillator::{EnvelopeConfig, Fm, Waveform};
use crate::error::{Result, SynthError};

/// A sound source. Per-note state (pitch, timestamps) is passed in, so one
/// instance can be shared by any number of notes across threads.
pub trait Instrument: Send + Sync {
    fn name(&self) -> &str;

    fn envelope(&self) -> &EnvelopeConfig;

    fn volume(&self) -> f32;

    /// Raw timbre at time `t` for a note at `frequency`, before the envelope.
    fn oscillate(&self, frequency: f32, t: f64) -> f32;

    /// Enveloped sample and whether the envelope is still above zero.
    fn render(&self, frequency: f32, t: f64, time_on: f64, time_off: Option<f64>) -> (f32, bool) {
        let amplitude = self.envelope().amplitude(t, time_on, time_off);
        if amplitude <= 0.0 {
            return (0.0, false);
        }
        (self.volume() * amplitude * self.oscillate(frequency, t), true)
    }
}

/// One weighted oscillator inside a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Partial {
    pub waveform: Waveform,
    /// Frequency as a multiple of the note's fundamental.
    #[serde(default = "unit")]
    pub multiplier: f32,
    pub gain: f32,
    #[serde(default)]
    pub fm: Option<Fm>,
}

fn unit() -> f32 {
    1.0
}

impl Partial {
    pub fn new(waveform: Waveform, multiplier: f32, gain: f32) -> Self {
        Self { waveform, multiplier, gain, fm: None }
    }

    pub fn with_fm(mut self, depth: f32, rate: f32) -> Self {
        self.fm = Some(Fm::new(depth, rate));
        self
    }

    #[inline]
    fn sample(&self, frequency: f32, t: f64) -> f32 {
        self.gain * self.waveform.sample(t, frequency * self.multiplier, self.fm)
    }
}

/// Additive instrument: a fixed weighted sum of oscillators under one envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PatchFields")]
pub struct Patch {
    name: String,
    volume: f32,
    envelope: EnvelopeConfig,
    partials: Vec<Partial>,
}

#[derive(Deserialize)]
struct PatchFields {
    name: String,
    #[serde(default = "unit")]
    volume: f32,
    envelope: EnvelopeConfig,
    partials: Vec<Partial>,
}

impl TryFrom<PatchFields> for Patch {
    type Error = SynthError;

    fn try_from(f: PatchFields) -> Result<Self> {
        Patch::new(f.name, f.volume, f.envelope, f.partials)
    }
}

impl Patch {
    pub fn new(name: impl Into<String>, volume: f32, envelope: EnvelopeConfig, partials: Vec<Partial>) -> Result<Self> {
        let name = name.into();
        let invalid = |reason: String| SynthError::InvalidPatch { name: name.clone(), reason };

        if name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if !volume.is_finite() || volume < 0.0 {
            return Err(invalid(format!("volume must be finite and non-negative, got {volume}")));
        }
        if partials.is_empty() {
            return Err(invalid("at least one partial is required".to_string()));
        }
        for (i, p) in partials.iter().enumerate() {
            if !p.gain.is_finite() {
                return Err(invalid(format!("partial {i} has a non-finite gain")));
            }
            if p.waveform != Waveform::Noise && (!p.multiplier.is_finite() || p.multiplier <= 0.0) {
                return Err(invalid(format!("partial {i} multiplier must be positive, got {}", p.multiplier)));
            }
            if let Some(fm) = p.fm {
                if !fm.depth.is_finite() || !fm.rate.is_finite() {
                    return Err(invalid(format!("partial {i} has non-finite modulation")));
                }
            }
        }
        Ok(Self { name, volume, envelope, partials })
    }

    pub fn partials(&self) -> &[Partial] {
        &self.partials
    }

    /// Bright, slowly decaying bell: sine harmonics 2, 3 and 4 with a
    /// slight vibrato on the lowest.
    pub fn bell() -> Self {
        Self {
            name: "bell".to_string(),
            volume: 1.0,
            envelope: EnvelopeConfig::default(),
            partials: vec![
                Partial::new(Waveform::Sine, 2.0, 1.0).with_fm(0.001, 5.0),
                Partial::new(Waveform::Sine, 3.0, 0.5),
                Partial::new(Waveform::Sine, 4.0, 0.25),
            ],
        }
    }

    /// Reedy square stack with a breath of noise.
    pub fn harmonica() -> Self {
        Self {
            name: "harmonica".to_string(),
            volume: 1.0,
            envelope: EnvelopeConfig::preset(0.1, 0.01, 0.1, 1.0, 0.8),
            partials: vec![
                Partial::new(Waveform::Square, 1.0, 1.0).with_fm(0.001, 5.0),
                Partial::new(Waveform::Square, 1.5, 0.5),
                Partial::new(Waveform::Square, 2.0, 0.25),
                Partial::new(Waveform::Noise, 1.0, 0.05),
            ],
        }
    }

    /// Single band-limited saw with fast attack and release.
    pub fn pure_saw() -> Self {
        Self {
            name: "saw".to_string(),
            volume: 0.8,
            envelope: EnvelopeConfig::preset(0.01, 0.01, 0.01, 1.0, 0.8),
            partials: vec![Partial::new(Waveform::Saw, 1.0, 1.0).with_fm(0.001, 5.0)],
        }
    }

    pub fn factory_presets() -> Vec<Patch> {
        vec![Self::bell(), Self::harmonica(), Self::pure_saw()]
    }
}

impl Instrument for Patch {
    fn name(&self) -> &str {
        &self.name
    }

    fn envelope(&self) -> &EnvelopeConfig {
        &self.envelope
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    #[inline]
    fn oscillate(&self, frequency: f32, t: f64) -> f32 {
        self.partials.iter().map(|p| p.sample(frequency, t)).sum()
    }
}

/// The roster of instruments, built once at startup and alive for the whole
/// session. Notes hold `Arc` clones of its entries.
#[derive(Clone, Default)]
pub struct InstrumentBank {
    instruments: Vec<Arc<dyn Instrument>>,
    by_name: HashMap<String, usize>,
}

impl InstrumentBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory presets followed by `patches`; a patch sharing a preset's name
    /// replaces it.
    pub fn with_patches(patches: impl IntoIterator<Item = Patch>) -> Self {
        let mut bank = Self::new();
        for patch in Patch::factory_presets().into_iter().chain(patches) {
            bank.insert(Arc::new(patch));
        }
        bank
    }

    pub fn insert(&mut self, instrument: Arc<dyn Instrument>) {
        let key = instrument.name().to_lowercase();
        match self.by_name.get(&key).copied() {
            Some(index) => self.instruments[index] = instrument,
            None => {
                self.by_name.insert(key, self.instruments.len());
                self.instruments.push(instrument);
            }
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Instrument>> {
        self.by_name
            .get(&name.to_lowercase())
            .map(|&index| Arc::clone(&self.instruments[index]))
            .ok_or_else(|| SynthError::UnknownInstrument(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.instruments.iter().map(|i| i.name())
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl fmt::Debug for InstrumentBank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_scales_by_envelope_and_volume() {
        let saw = Patch::pure_saw();
        let t = 0.123;
        let expected = 0.8 * saw.envelope().amplitude(t, 0.0, None) * saw.oscillate(220.0, t);
        let (sample, alive) = saw.render(220.0, t, 0.0, None);
        assert!(alive);
        assert!((sample - expected).abs() < 1e-6);
    }

    #[test]
    fn silent_envelope_reports_dead() {
        let bell = Patch::bell();
        let (sample, alive) = bell.render(440.0, 3.0, 0.0, Some(1.5));
        assert_eq!(sample, 0.0);
        assert!(!alive);
    }

    #[test]
    fn presets_differ_in_envelope_shape() {
        let bell = Patch::bell();
        let harmonica = Patch::harmonica();
        let saw = Patch::pure_saw();
        assert!(bell.envelope().decay_time() > harmonica.envelope().decay_time());
        assert!(harmonica.envelope().attack_time() > saw.envelope().attack_time());
        assert_eq!(bell.envelope().sustain_amplitude(), 0.0);
        assert_eq!(saw.envelope().release_time(), 0.01);
    }

    #[test]
    fn patch_validation() {
        let env = EnvelopeConfig::default();
        assert!(Patch::new("empty", 1.0, env.clone(), vec![]).is_err());
        assert!(Patch::new("", 1.0, env.clone(), vec![Partial::new(Waveform::Sine, 1.0, 1.0)]).is_err());
        assert!(Patch::new("neg", 1.0, env.clone(), vec![Partial::new(Waveform::Sine, 0.0, 1.0)]).is_err());
        assert!(Patch::new("vol", f32::NAN, env.clone(), vec![Partial::new(Waveform::Sine, 1.0, 1.0)]).is_err());
        // noise ignores its multiplier
        assert!(Patch::new("hiss", 1.0, env, vec![Partial::new(Waveform::Noise, 0.0, 0.1)]).is_ok());
    }

    #[test]
    fn patch_from_json() {
        let json = r#"{
            "name": "organ",
            "envelope": {"attack_time":0.02,"decay_time":0.05,"release_time":0.2,"start_amplitude":1.0,"sustain_amplitude":0.9},
            "partials": [
                {"waveform":"sine","gain":1.0},
                {"waveform":"triangle","multiplier":2.0,"gain":0.3,"fm":{"depth":0.002,"rate":6.0}}
            ]
        }"#;
        let patch: Patch = serde_json::from_str(json).unwrap();
        assert_eq!(patch.name(), "organ");
        assert_eq!(patch.volume(), 1.0);
        assert_eq!(patch.partials().len(), 2);
        assert_eq!(patch.partials()[0].multiplier, 1.0);
        assert_eq!(patch.partials()[1].fm, Some(Fm::new(0.002, 6.0)));

        let no_partials = r#"{"name":"x","envelope":{"attack_time":0.02,"decay_time":0.05,"release_time":0.2,"start_amplitude":1.0,"sustain_amplitude":0.9},"partials":[]}"#;
        assert!(serde_json::from_str::<Patch>(no_partials).is_err());
    }

    #[test]
    fn bank_lookup_and_override() {
        let custom = Patch::new(
            "Bell",
            0.5,
            EnvelopeConfig::default(),
            vec![Partial::new(Waveform::Sine, 1.0, 1.0)],
        )
        .unwrap();
        let bank = InstrumentBank::with_patches([custom]);
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.get("BELL").unwrap().volume(), 0.5);
        assert_eq!(bank.get("harmonica").unwrap().name(), "harmonica");
        assert!(matches!(bank.get("theremin"), Err(SynthError::UnknownInstrument(_))));
    }
}
