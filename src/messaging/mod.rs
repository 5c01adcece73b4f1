mod bus;
mod types;

pub use bus::{MessageBus, MAX_MESSAGES_PER_TICK};
pub use types::SynthMessage;
