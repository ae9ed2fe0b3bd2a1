#[cfg(feature = "rtrb")]
use rtrb::Consumer;

use crate::engine::params::{EngineParams, ProcessingMode};
use crate::fx::looper::LooperCommand;

/// Control-surface messages for the signal path.
///
/// Whole-snapshot parameter updates keep the message `Copy` and the audio
/// side allocation-free; partial updates are the sender's job.
#[derive(Debug, Copy, Clone)]
pub enum ControlMessage {
    SetMode(ProcessingMode),
    UpdateParams(EngineParams),
    Looper(LooperCommand),
}

pub trait MessageReceiver {
    fn pop(&mut self) -> Option<ControlMessage>;
}

#[cfg(feature = "rtrb")]
impl MessageReceiver for Consumer<ControlMessage> {
    fn pop(&mut self) -> Option<ControlMessage> {
        Consumer::pop(self).ok()
    }
}
