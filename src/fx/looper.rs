#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fx::{ProcessSpec, Processor};

/// Loop buffer length in seconds.
const LOOP_SECONDS: f32 = 60.0;

/// Looper transport states.
///
/// ```text
///             start_recording            stop
///  Stopped ───────────────────▶ Recording ────▶ Stopped (loop captured)
///     │                            │ buffer full
///     │ start_playback             ▼
///     ├───────────────────────▶ Playing ◀──────┐
///     │                            │ start_overdubbing
///     │ start_overdubbing          ▼           │
///     └───────────────────────▶ Overdubbing ───┘
/// ```
///
/// Transitions guarded on an empty loop (`start_playback`/`start_overdubbing`
/// with no captured material) are silent no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooperState {
    Stopped,
    Recording,
    Playing,
    Overdubbing,
}

/// External transport commands, applied between blocks only.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooperCommand {
    Stop,
    StartRecording,
    StartPlayback,
    StartOverdubbing,
    Clear,
}

impl LooperCommand {
    /// Map the control surface's 0..=4 state value onto a command.
    pub fn from_index(index: u32) -> Option<Self> {
        match index {
            0 => Some(Self::Stop),
            1 => Some(Self::StartRecording),
            2 => Some(Self::StartPlayback),
            3 => Some(Self::StartOverdubbing),
            4 => Some(Self::Clear),
            _ => None,
        }
    }
}

/// Phrase looper over a fixed 60-second stereo buffer.
///
/// Recording tracks the loop length live and rolls over into playback when
/// the buffer fills. Playback replays the captured loop; overdubbing sums new
/// input into it in place. Stopped is a pure pass-through.
pub struct LooperFx {
    buffer: [Vec<f32>; 2],
    capacity: usize,
    position: usize,
    loop_length: usize,
    state: LooperState,
}

impl LooperFx {
    pub fn new() -> Self {
        Self {
            buffer: [Vec::new(), Vec::new()],
            capacity: 0,
            position: 0,
            loop_length: 0,
            state: LooperState::Stopped,
        }
    }

    pub fn state(&self) -> LooperState {
        self.state
    }

    /// Captured loop length in samples. Zero means no loop; while recording
    /// it tracks the write position live.
    pub fn loop_length(&self) -> usize {
        self.loop_length
    }

    /// Playback position as a fraction of the loop, for display purposes.
    pub fn loop_position(&self) -> f32 {
        if self.loop_length == 0 {
            0.0
        } else {
            self.position as f32 / self.loop_length as f32
        }
    }

    /// Dispatch an external command. Must be called between blocks.
    pub fn apply_command(&mut self, command: LooperCommand) {
        match command {
            LooperCommand::StartRecording => self.start_recording(),
            LooperCommand::StartPlayback => self.start_playback(),
            LooperCommand::StartOverdubbing => self.start_overdubbing(),
            LooperCommand::Stop => self.stop(),
            LooperCommand::Clear => self.clear(),
        }
    }

    /// Begin recording a new loop. Prior loop content is cleared immediately;
    /// a half-overwritten old phrase is more confusing than silence.
    pub fn start_recording(&mut self) {
        for channel in &mut self.buffer {
            channel.fill(0.0);
        }
        self.position = 0;
        self.loop_length = 0;
        self.state = LooperState::Recording;
    }

    /// Begin playback from the top of the loop. No-op without a loop.
    pub fn start_playback(&mut self) {
        if self.loop_length == 0 {
            return;
        }
        self.position = 0;
        self.state = LooperState::Playing;
    }

    /// Begin summing input into the existing loop. No-op without a loop.
    pub fn start_overdubbing(&mut self) {
        if self.loop_length == 0 {
            return;
        }
        self.state = LooperState::Overdubbing;
    }

    /// Halt the transport. Leaving Recording finalizes the loop length.
    pub fn stop(&mut self) {
        if self.state == LooperState::Recording {
            self.loop_length = self.position;
        }
        self.position = 0;
        self.state = LooperState::Stopped;
    }

    /// Drop the captured loop and return to Stopped.
    pub fn clear(&mut self) {
        for channel in &mut self.buffer {
            channel.fill(0.0);
        }
        self.position = 0;
        self.loop_length = 0;
        self.state = LooperState::Stopped;
    }

    /// Record one frame. Returns true if the buffer filled and the transport
    /// rolled over into playback.
    #[inline]
    fn record_frame(&mut self, left: f32, right: f32) -> bool {
        self.buffer[0][self.position] = left;
        self.buffer[1][self.position] = right;
        self.position += 1;
        self.loop_length = self.position;

        if self.position >= self.capacity {
            // Overflow: the captured loop is the whole buffer.
            self.loop_length = self.capacity;
            self.position = 0;
            self.state = LooperState::Playing;
            return true;
        }
        false
    }

    #[inline]
    fn advance_playback(&mut self) {
        self.position = (self.position + 1) % self.loop_length.max(1);
    }
}

impl Default for LooperFx {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for LooperFx {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.capacity = (spec.sample_rate * LOOP_SECONDS) as usize;
        for channel in &mut self.buffer {
            *channel = vec![0.0; self.capacity];
        }
        self.reset();
    }

    fn reset(&mut self) {
        for channel in &mut self.buffer {
            channel.fill(0.0);
        }
        self.position = 0;
        self.loop_length = 0;
        self.state = LooperState::Stopped;
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        if self.capacity == 0 {
            return;
        }

        // Per-state handling stays per sample because recording can roll over
        // into playback mid-block, exactly at the capacity boundary.
        match channels {
            [] => {}
            [mono] => {
                for sample in mono.iter_mut() {
                    match self.state {
                        LooperState::Stopped => {} // pass-through
                        LooperState::Recording => {
                            self.record_frame(*sample, *sample);
                        }
                        LooperState::Playing => {
                            *sample = self.buffer[0][self.position];
                            self.advance_playback();
                        }
                        LooperState::Overdubbing => {
                            let mixed = self.buffer[0][self.position] + *sample;
                            self.buffer[0][self.position] = mixed;
                            self.buffer[1][self.position] = mixed;
                            *sample = mixed;
                            self.advance_playback();
                        }
                    }
                }
            }
            [left, right, ..] => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    match self.state {
                        LooperState::Stopped => {} // pass-through
                        LooperState::Recording => {
                            self.record_frame(*l, *r);
                        }
                        LooperState::Playing => {
                            *l = self.buffer[0][self.position];
                            *r = self.buffer[1][self.position];
                            self.advance_playback();
                        }
                        LooperState::Overdubbing => {
                            let mixed_l = self.buffer[0][self.position] + *l;
                            let mixed_r = self.buffer[1][self.position] + *r;
                            self.buffer[0][self.position] = mixed_l;
                            self.buffer[1][self.position] = mixed_r;
                            *l = mixed_l;
                            *r = mixed_r;
                            self.advance_playback();
                        }
                    }
                }
            }
        }
    }
}
