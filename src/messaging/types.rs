use crate::core::oscillator::NoteId;

/// Message types sent from input collaborators to the control loop
#[derive(Debug, Clone, PartialEq)]
pub enum SynthMessage {
    NoteOn { id: NoteId, frequency: f32 },
    NoteOff { id: NoteId },
    /// Instrument used by subsequent note-ons.
    SelectInstrument(String),
    Quit,
}
