use serde::{Serialize, Deserialize};

/// Full-scale output amplitude of the reference mix.
pub const DEFAULT_AMPLITUDE: f32 = 20000.0;
/// Number of simultaneous voices the mix leaves headroom for.
pub const DEFAULT_HEADROOM_VOICES: u32 = 4;

/// How a mix that exceeds the output range is brought back into it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipMode {
    /// Clamp to the i16 range.
    #[default]
    Hard,
    /// Saturate through tanh before clamping.
    Soft,
}

/// Converts the summed voice signal into signed 16-bit PCM.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixer {
    /// Scale applied to the raw voice sum.
    gain: f32,
    clip: ClipMode,
}

impl Mixer {
    pub fn new(amplitude: f32, headroom_voices: u32, clip: ClipMode) -> Self {
        Self {
            gain: amplitude / headroom_voices.max(1) as f32,
            clip,
        }
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[inline]
    pub fn quantize(&self, mix: f32) -> i16 {
        let scaled = match self.clip {
            ClipMode::Hard => mix * self.gain,
            ClipMode::Soft => {
                let full_scale = i16::MAX as f32;
                (mix * self.gain / full_scale).tanh() * full_scale
            }
        };
        if scaled.is_nan() {
            return 0;
        }
        scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(DEFAULT_AMPLITUDE, DEFAULT_HEADROOM_VOICES, ClipMode::Hard)
    }
}

impl super::Synth {
    /// Fills `out` with exactly `out.len()` mono samples, advancing the sample
    /// clock by the same amount. An empty registry renders silence.
    ///
    /// Runs on the audio thread: no allocation, no locking.
    pub fn render_buffer(&mut self, out: &mut [i16]) {
        let sample_rate = self.sample_rate as f64;
        let mixer = self.mixer;
        for slot in out.iter_mut() {
            let t = self.sample_clock as f64 / sample_rate;
            let mix: f32 = self
                .voices
                .notes_mut()
                .iter_mut()
                .map(|note| note.render(t))
                .sum();
            *slot = mixer.quantize(mix);
            self.sample_clock += 1;
        }
    }

    /// Offline convenience around [`render_buffer`](Self::render_buffer).
    pub fn render(&mut self, sample_count: usize) -> Vec<i16> {
        let mut out = vec![0; sample_count];
        self.render_buffer(&mut out);
        out
    }
}
