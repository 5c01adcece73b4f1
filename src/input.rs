//! Line-based stand-in for a keyboard: turns typed commands into note events.
//!
//! Keys follow the classic two-row computer keyboard layout, `z` = A3 up to
//! `,` = A4. A line holds whitespace separated tokens:
//!
//! - `+z` press, `-z` release
//! - `:harmonica` switch instrument
//! - `q` quit

use std::io::BufRead;
use std::thread::{self, JoinHandle};
use crossbeam_channel::Sender;
use log::{debug, warn};
use crate::core::oscillator::NoteId;
use crate::messaging::SynthMessage;

/// Keys in pitch order; the index is the note id.
pub const KEY_LAYOUT: [char; 13] = ['z', 's', 'x', 'c', 'f', 'v', 'g', 'b', 'n', 'j', 'm', 'k', ','];

const REFERENCE_PITCH: f32 = 440.0;

/// Note id and frequency for a mapped key.
pub fn key_to_note(key: char) -> Option<(NoteId, f32)> {
    let index = KEY_LAYOUT.iter().position(|&k| k == key.to_ascii_lowercase())?;
    let id = index as NoteId;
    let frequency = REFERENCE_PITCH * 2.0f32.powf((id - 12) as f32 / 12.0);
    Some((id, frequency))
}

/// Parses one line of input. Unknown tokens are reported and skipped.
pub fn parse_line(line: &str) -> Vec<SynthMessage> {
    let mut messages = Vec::new();
    for token in line.split_whitespace() {
        match parse_token(token) {
            Some(msg) => messages.push(msg),
            None => warn!("unrecognised input '{}'", token),
        }
    }
    messages
}

fn parse_token(token: &str) -> Option<SynthMessage> {
    if token.eq_ignore_ascii_case("q") {
        return Some(SynthMessage::Quit);
    }
    if let Some(name) = token.strip_prefix(':') {
        return (!name.is_empty()).then(|| SynthMessage::SelectInstrument(name.to_string()));
    }
    let mut chars = token.chars();
    let action = chars.next()?;
    let key = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let (id, frequency) = key_to_note(key)?;
    match action {
        '+' => Some(SynthMessage::NoteOn { id, frequency }),
        '-' => Some(SynthMessage::NoteOff { id }),
        _ => None,
    }
}

/// Feeds stdin into `sender` on a background thread. End of input sends `Quit`.
pub fn spawn_stdin_reader(sender: Sender<SynthMessage>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-input".into())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("failed to read input: {}", err);
                        break;
                    }
                };
                for msg in parse_line(&line) {
                    if sender.send(msg).is_err() {
                        return;
                    }
                }
            }
            debug!("input closed");
            let _ = sender.send(SynthMessage::Quit);
        })
}
