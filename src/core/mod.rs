pub mod instrument;
pub mod oscillator;
pub mod synth;
pub mod voice;

pub use synth::Synth;
