use std::sync::Arc;
use crate::core::instrument::Instrument;
use crate::core::oscillator::{Note, NoteId};
use crate::error::Result;

/// Initial capacity of the registry; pushes past this reallocate on the
/// control side, never while rendering.
pub const DEFAULT_VOICE_CAPACITY: usize = 64;

/// The set of currently sounding notes.
///
/// Notes are not deduplicated by id, and their order carries no meaning.
#[derive(Debug)]
pub struct VoiceRegistry {
    notes: Vec<Note>,
}

impl Default for VoiceRegistry {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_VOICE_CAPACITY)
    }
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { notes: Vec::with_capacity(capacity) }
    }

    pub fn note_on(&mut self, id: NoteId, frequency: f32, instrument: Arc<dyn Instrument>, at: f64) -> Result<()> {
        let note = Note::new(id, frequency, instrument, at)?;
        self.notes.push(note);
        Ok(())
    }

    /// Releases every unreleased note with this id. Returns how many were
    /// released, so a second call for the same key returns 0.
    pub fn note_off(&mut self, id: NoteId, at: f64) -> usize {
        let mut released = 0;
        for note in self.notes.iter_mut().filter(|n| n.id() == id) {
            if note.release(at) {
                released += 1;
            }
        }
        released
    }

    /// Whether a key with this id is currently held down.
    pub fn is_held(&self, id: NoteId) -> bool {
        self.notes.iter().any(|n| n.id() == id && !n.is_released())
    }

    /// Drops notes the renderer found silent after release. Must not run
    /// while a buffer is being rendered. Returns the number removed.
    pub fn compact(&mut self) -> usize {
        let before = self.notes.len();
        self.notes.retain(Note::is_active);
        before - self.notes.len()
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub(crate) fn notes_mut(&mut self) -> &mut [Note] {
        &mut self.notes
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::instrument::Patch;

    fn saw() -> Arc<dyn Instrument> {
        Arc::new(Patch::pure_saw())
    }

    #[test]
    fn note_on_appends_duplicates() {
        let mut voices = VoiceRegistry::new();
        voices.note_on(1, 440.0, saw(), 0.0).unwrap();
        voices.note_on(1, 440.0, saw(), 0.1).unwrap();
        assert_eq!(voices.len(), 2);
        assert!(voices.note_on(2, 0.0, saw(), 0.1).is_err());
        assert_eq!(voices.len(), 2);
    }

    #[test]
    fn note_off_releases_all_matching_and_is_idempotent() {
        let mut voices = VoiceRegistry::new();
        voices.note_on(1, 440.0, saw(), 0.0).unwrap();
        voices.note_on(1, 440.0, saw(), 0.1).unwrap();
        voices.note_on(2, 220.0, saw(), 0.1).unwrap();

        assert_eq!(voices.note_off(1, 0.5), 2);
        assert_eq!(voices.note_off(1, 0.9), 0);
        assert!(voices.notes().iter().filter(|n| n.id() == 1).all(|n| n.time_off() == Some(0.5)));
        assert!(voices.is_held(2));
        assert!(!voices.is_held(1));
    }

    #[test]
    fn compact_keeps_held_and_sounding_notes() {
        let mut voices = VoiceRegistry::new();
        voices.note_on(1, 440.0, saw(), 0.0).unwrap();
        voices.note_on(2, 330.0, saw(), 0.0).unwrap();
        voices.note_on(3, 220.0, saw(), 0.0).unwrap();
        voices.note_off(1, 0.1);
        voices.note_off(2, 0.1);

        for note in voices.notes_mut() {
            note.render(0.105);
        }
        // nothing is silent yet
        assert_eq!(voices.compact(), 0);

        for note in voices.notes_mut() {
            note.render(0.2);
        }
        assert_eq!(voices.compact(), 2);
        assert_eq!(voices.notes()[0].id(), 3);
    }

    #[test]
    fn fresh_notes_survive_compaction_before_rendering() {
        let mut voices = VoiceRegistry::new();
        voices.note_on(1, 440.0, saw(), 0.0).unwrap();
        voices.note_off(1, 0.0);
        assert_eq!(voices.compact(), 0);
    }
}
