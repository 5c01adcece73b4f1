use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use log::{debug, trace, warn};
use std::sync::{Arc, Mutex};
use crate::core::instrument::{Instrument, InstrumentBank};
use crate::core::synth::Synth;
use crate::error::Result;
use super::SynthMessage;

/// Default cap on messages applied per control tick.
pub const MAX_MESSAGES_PER_TICK: usize = 256;

/// MessageBus carries note events from input collaborators to the engine
/// and owns the control side of the engine lock.
pub struct MessageBus {
    pub(crate) sender: Sender<SynthMessage>,
    pub(crate) receiver: Receiver<SynthMessage>,
    synth_ref: Arc<Mutex<Synth>>,
    bank: InstrumentBank,
    current: Arc<dyn Instrument>,
    max_messages: usize,
}

impl MessageBus {
    /// Create a new message bus playing `instrument` from `bank`.
    pub fn new(synth: Arc<Mutex<Synth>>, bank: InstrumentBank, instrument: &str) -> Result<Self> {
        let (sender, receiver) = unbounded();
        let current = bank.get(instrument)?;

        Ok(MessageBus {
            sender,
            receiver,
            synth_ref: synth,
            bank,
            current,
            max_messages: MAX_MESSAGES_PER_TICK,
        })
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.max(1);
        self
    }

    /// Get a sender that can be cloned and passed to input threads
    pub fn sender(&self) -> Sender<SynthMessage> {
        self.sender.clone()
    }

    pub fn instrument(&self) -> &Arc<dyn Instrument> {
        &self.current
    }

    /// One control tick: takes the engine lock, applies pending messages,
    /// drops finished voices, releases the lock.
    ///
    /// Returns `false` once a `Quit` has been received.
    pub fn poll(&mut self) -> bool {
        let synth_ref = Arc::clone(&self.synth_ref);
        let mut synth = match synth_ref.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("engine lock poisoned, recovering");
                poisoned.into_inner()
            }
        };

        let mut running = true;
        for _ in 0..self.max_messages {
            match self.receiver.try_recv() {
                Ok(SynthMessage::Quit) => {
                    running = false;
                    break;
                }
                Ok(msg) => self.handle_message(&mut synth, msg),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("all input senders dropped");
                    running = false;
                    break;
                }
            }
        }

        let removed = synth.compact();
        if removed > 0 {
            trace!("compacted {} finished voice(s), {} live", removed, synth.voices().len());
        }
        running
    }

    /// Handle an individual message
    fn handle_message(&mut self, synth: &mut Synth, msg: SynthMessage) {
        match msg {
            SynthMessage::NoteOn { id, frequency } => {
                // key repeat while held
                if synth.is_held(id) {
                    return;
                }
                if let Err(err) = synth.note_on(id, frequency, Arc::clone(&self.current)) {
                    warn!("ignoring note on for id {}: {}", id, err);
                }
            },
            SynthMessage::NoteOff { id } => {
                synth.note_off(id);
            },
            SynthMessage::SelectInstrument(name) => match self.bank.get(&name) {
                Ok(instrument) => {
                    debug!("instrument changed to {}", instrument.name());
                    self.current = instrument;
                },
                Err(err) => warn!("{}", err),
            },
            SynthMessage::Quit => {},
        }
    }

    /// Public method to send a message
    pub fn send(&self, msg: SynthMessage) -> std::result::Result<(), crossbeam_channel::SendError<SynthMessage>> {
        self.sender.send(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::synth::Mixer;

    fn setup() -> (Arc<Mutex<Synth>>, MessageBus) {
        let synth = Arc::new(Mutex::new(Synth::new(44100, Mixer::default()).unwrap()));
        let bus = MessageBus::new(Arc::clone(&synth), InstrumentBank::with_patches([]), "bell").unwrap();
        (synth, bus)
    }

    #[test]
    fn unknown_startup_instrument_is_an_error() {
        let synth = Arc::new(Mutex::new(Synth::new(44100, Mixer::default()).unwrap()));
        assert!(MessageBus::new(synth, InstrumentBank::with_patches([]), "kazoo").is_err());
    }

    #[test]
    fn key_repeat_does_not_stack_voices() {
        let (synth, mut bus) = setup();
        bus.send(SynthMessage::NoteOn { id: 1, frequency: 440.0 }).unwrap();
        bus.send(SynthMessage::NoteOn { id: 1, frequency: 440.0 }).unwrap();
        assert!(bus.poll());
        assert_eq!(synth.lock().unwrap().voices().len(), 1);

        // a re-press after release is a new voice
        bus.send(SynthMessage::NoteOff { id: 1 }).unwrap();
        bus.send(SynthMessage::NoteOn { id: 1, frequency: 440.0 }).unwrap();
        assert!(bus.poll());
        assert_eq!(synth.lock().unwrap().voices().len(), 2);
    }

    #[test]
    fn select_instrument_applies_to_later_notes() {
        let (synth, mut bus) = setup();
        bus.send(SynthMessage::NoteOn { id: 1, frequency: 440.0 }).unwrap();
        bus.send(SynthMessage::SelectInstrument("Harmonica".into())).unwrap();
        bus.send(SynthMessage::NoteOn { id: 2, frequency: 220.0 }).unwrap();
        bus.send(SynthMessage::SelectInstrument("missing".into())).unwrap();
        bus.poll();
        let synth = synth.lock().unwrap();
        let names: Vec<&str> = synth.voices().notes().iter().map(|n| n.instrument().name()).collect();
        assert_eq!(names, ["bell", "harmonica"]);
        assert_eq!(bus.instrument().name(), "harmonica");
    }

    #[test]
    fn invalid_frequency_is_dropped() {
        let (synth, mut bus) = setup();
        bus.send(SynthMessage::NoteOn { id: 1, frequency: -1.0 }).unwrap();
        assert!(bus.poll());
        assert!(synth.lock().unwrap().voices().is_empty());
    }

    #[test]
    fn quit_stops_the_loop() {
        let (_synth, mut bus) = setup();
        bus.send(SynthMessage::Quit).unwrap();
        assert!(!bus.poll());
    }

    #[test]
    fn poll_compacts_finished_voices() {
        let (synth, mut bus) = setup();
        bus.send(SynthMessage::SelectInstrument("saw".into())).unwrap();
        bus.send(SynthMessage::NoteOn { id: 4, frequency: 110.0 }).unwrap();
        bus.poll();
        synth.lock().unwrap().render(441);
        bus.send(SynthMessage::NoteOff { id: 4 }).unwrap();
        bus.poll();
        assert_eq!(synth.lock().unwrap().voices().len(), 1);
        // saw releases in 10 ms
        synth.lock().unwrap().render(882);
        bus.poll();
        assert!(synth.lock().unwrap().voices().is_empty());
    }

    #[test]
    fn message_cap_defers_the_rest() {
        let (synth, bus) = setup();
        let mut bus = bus.with_max_messages(2);
        for id in 0..5 {
            bus.send(SynthMessage::NoteOn { id, frequency: 440.0 }).unwrap();
        }
        bus.poll();
        assert_eq!(synth.lock().unwrap().voices().len(), 2);
        bus.poll();
        bus.poll();
        assert_eq!(synth.lock().unwrap().voices().len(), 5);
    }
}
