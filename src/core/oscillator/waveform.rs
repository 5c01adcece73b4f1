use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Number of harmonics summed by the band-limited sawtooth.
pub const SAW_HARMONICS: u32 = 39;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Saw,
    Noise,
}

/// Frequency modulation of the phase argument.
///
/// `depth` is expressed in carrier frequency units, `rate` in Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fm {
    pub depth: f32,
    pub rate: f32,
}

impl Fm {
    pub const fn new(depth: f32, rate: f32) -> Self {
        Self { depth, rate }
    }
}

/// Phase in radians at time `t` for a carrier at `frequency`, optionally
/// perturbed by a sine LFO.
#[inline]
pub fn phase(t: f64, frequency: f32, fm: Option<Fm>) -> f64 {
    let frequency = frequency as f64;
    let carrier = 2.0 * PI * frequency * t;
    match fm {
        Some(fm) => carrier + fm.depth as f64 * frequency * (2.0 * PI * fm.rate as f64 * t).sin(),
        None => carrier,
    }
}

impl Waveform {
    /// Amplitude of this waveform at absolute time `t` (seconds).
    ///
    /// Output is in [-1, 1] except for `Saw`, whose additive approximation
    /// overshoots slightly near the wrap (Gibbs ripple).
    #[inline]
    pub fn sample(self, t: f64, frequency: f32, fm: Option<Fm>) -> f32 {
        let phase = phase(t, frequency, fm);
        match self {
            Waveform::Sine => phase.sin() as f32,
            // sin(phase) == 0 maps to -1
            Waveform::Square => {
                if phase.sin() > 0.0 {
                    1.0
                } else {
                    -1.0
                }
            },
            Waveform::Triangle => (phase.sin().asin() * 2.0 / PI) as f32,
            Waveform::Saw => {
                let sum: f64 = (1..=SAW_HARMONICS)
                    .map(|i| {
                        let i = i as f64;
                        (i * phase).sin() / i
                    })
                    .sum();
                (sum * 2.0 / PI) as f32
            },
            Waveform::Noise => rand::random::<f32>() * 2.0 - 1.0,
        }
    }
}
