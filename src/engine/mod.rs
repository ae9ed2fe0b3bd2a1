//! Signal path: owns the effect processors and routes audio through the
//! active mode.
//!
//! The path is driven from two sides. The audio thread calls
//! [`SignalPath::process_block`] once per buffer; a control thread pushes
//! [`ControlMessage`]s through an SPSC ring which the audio side drains at
//! the start of every block, so parameter changes land on block boundaries
//! and never mid-buffer.

pub mod message;
pub mod params;

use std::panic::{self, AssertUnwindSafe};

#[cfg(feature = "rtrb")]
use rtrb::Consumer;
use thiserror::Error;

#[cfg(feature = "rtrb")]
use crate::engine::message::ControlMessage;
use crate::engine::params::{EngineParams, ProcessingMode};
use crate::fx::looper::LooperCommand;
use crate::fx::{DelayFx, GranularFx, LooperFx, ProcessSpec, Processor, ReverbFx};
use crate::{MAX_BLOCK_SIZE, MAX_CHANNELS};

/// Rejected stream configuration.
#[derive(Debug, Error, PartialEq)]
pub enum PrepareError {
    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(f32),
    #[error("block size must be 1..={MAX_BLOCK_SIZE}, got {0}")]
    InvalidBlockSize(usize),
    #[error("channel count must be 1..={MAX_CHANNELS}, got {0}")]
    InvalidChannelCount(usize),
}

/// Owns every effect and runs the one(s) selected by the current mode.
///
/// All processors stay prepared at all times, so a mode switch is just a
/// dispatch change: no allocation, no rebuild, and each effect keeps its
/// internal state (delay tails, recorded loops) across switches.
pub struct SignalPath {
    delay: DelayFx,
    granular: GranularFx,
    reverb: ReverbFx,
    looper: LooperFx,
    params: EngineParams,
    prepared: bool,
    #[cfg(feature = "rtrb")]
    rx: Option<Consumer<ControlMessage>>,
}

impl SignalPath {
    pub fn new() -> Self {
        Self {
            delay: DelayFx::new(),
            granular: GranularFx::new(),
            reverb: ReverbFx::new(),
            looper: LooperFx::new(),
            params: EngineParams::default(),
            prepared: false,
            #[cfg(feature = "rtrb")]
            rx: None,
        }
    }

    /// Attach the consumer end of a control ring. Messages are drained at
    /// the start of each processed block.
    #[cfg(feature = "rtrb")]
    pub fn set_control_receiver(&mut self, rx: Consumer<ControlMessage>) {
        self.rx = Some(rx);
    }

    /// Validate the stream configuration and size every processor for it.
    ///
    /// Cached parameters are re-applied afterwards so sample-rate-derived
    /// values (delay lengths, grain trigger periods) are recomputed for the
    /// new rate.
    pub fn prepare(&mut self, spec: &ProcessSpec) -> Result<(), PrepareError> {
        if !spec.sample_rate.is_finite() || spec.sample_rate <= 0.0 {
            return Err(PrepareError::InvalidSampleRate(spec.sample_rate));
        }
        if spec.max_block_size == 0 || spec.max_block_size > MAX_BLOCK_SIZE {
            return Err(PrepareError::InvalidBlockSize(spec.max_block_size));
        }
        if spec.num_channels == 0 || spec.num_channels > MAX_CHANNELS {
            return Err(PrepareError::InvalidChannelCount(spec.num_channels));
        }

        tracing::debug!(
            sample_rate = spec.sample_rate,
            max_block_size = spec.max_block_size,
            num_channels = spec.num_channels,
            "preparing signal path"
        );

        self.delay.prepare(spec);
        self.granular.prepare(spec);
        self.reverb.prepare(spec);
        self.looper.prepare(spec);
        self.prepared = true;

        let params = self.params;
        self.apply_params(&params);
        Ok(())
    }

    /// Clear all processor state; the prepared configuration survives.
    pub fn reset(&mut self) {
        self.delay.reset();
        self.granular.reset();
        self.reverb.reset();
        self.looper.reset();
    }

    pub fn mode(&self) -> ProcessingMode {
        self.params.mode
    }

    pub fn set_mode(&mut self, mode: ProcessingMode) {
        if mode == self.params.mode {
            return;
        }
        tracing::debug!(?mode, "switching processing mode");
        self.params.mode = mode;
    }

    /// Apply a full parameter snapshot.
    ///
    /// Every effect receives its section whether or not its mode is active,
    /// so a later mode switch finds current values in place.
    pub fn apply_params(&mut self, params: &EngineParams) {
        self.params = *params;
        self.delay.apply_params(&params.delay);
        self.granular.apply_params(&params.granular);
        self.reverb.apply_params(&params.reverb);
    }

    /// Current parameter snapshot, suitable for persisting and feeding back
    /// through [`apply_params`].
    pub fn snapshot(&self) -> EngineParams {
        self.params
    }

    pub fn looper_command(&mut self, command: LooperCommand) {
        self.looper.apply_command(command);
    }

    pub fn looper_state(&self) -> crate::fx::looper::LooperState {
        self.looper.state()
    }

    /// Process one planar block in place.
    ///
    /// Before prepare this is a pass-through. A panic inside an effect is
    /// contained here: the block is silenced, the fault logged, and the
    /// stream keeps running.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        self.drain_control_messages();

        if !self.prepared {
            return;
        }

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            match self.params.mode {
                ProcessingMode::DelayOnly => self.delay.process_block(channels),
                ProcessingMode::ReverbOnly => self.reverb.process_block(channels),
                ProcessingMode::GranularOnly => self.granular.process_block(channels),
                ProcessingMode::LooperOnly => self.looper.process_block(channels),
                ProcessingMode::Serial => {
                    // The standard delay stays out of the chain: the granular
                    // stage already supplies delay and feedback.
                    self.looper.process_block(channels);
                    self.granular.process_block(channels);
                    self.reverb.process_block(channels);
                }
            }
        }));

        if result.is_err() {
            tracing::error!(mode = ?self.params.mode, "effect panicked, emitting silence");
            for channel in channels.iter_mut() {
                channel.fill(0.0);
            }
        }
    }

    #[cfg(feature = "rtrb")]
    fn drain_control_messages(&mut self) {
        use crate::engine::message::MessageReceiver;

        let Some(mut rx) = self.rx.take() else {
            return;
        };
        // Qualified call: the inherent `Consumer::pop` would otherwise shadow
        // the receiver seam.
        while let Some(msg) = MessageReceiver::pop(&mut rx) {
            match msg {
                ControlMessage::SetMode(mode) => self.set_mode(mode),
                ControlMessage::UpdateParams(params) => self.apply_params(&params),
                ControlMessage::Looper(command) => self.looper_command(command),
            }
        }
        self.rx = Some(rx);
    }

    #[cfg(not(feature = "rtrb"))]
    fn drain_control_messages(&mut self) {}
}

impl Default for SignalPath {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fx::delay::DelayParams;
    use crate::fx::looper::LooperState;
    use crate::fx::reverb::ReverbParams;

    fn spec() -> ProcessSpec {
        ProcessSpec::new(48_000.0, 512, 2)
    }

    fn prepared_path() -> SignalPath {
        let mut path = SignalPath::new();
        path.prepare(&spec()).unwrap();
        path
    }

    #[test]
    fn prepare_rejects_bad_configurations() {
        let mut path = SignalPath::new();
        assert_eq!(
            path.prepare(&ProcessSpec::new(0.0, 512, 2)),
            Err(PrepareError::InvalidSampleRate(0.0))
        );
        assert!(path.prepare(&ProcessSpec::new(f32::NAN, 512, 2)).is_err());
        assert_eq!(
            path.prepare(&ProcessSpec::new(48_000.0, 0, 2)),
            Err(PrepareError::InvalidBlockSize(0))
        );
        assert_eq!(
            path.prepare(&ProcessSpec::new(48_000.0, MAX_BLOCK_SIZE + 1, 2)),
            Err(PrepareError::InvalidBlockSize(MAX_BLOCK_SIZE + 1))
        );
        assert_eq!(
            path.prepare(&ProcessSpec::new(48_000.0, 512, 0)),
            Err(PrepareError::InvalidChannelCount(0))
        );
        assert_eq!(
            path.prepare(&ProcessSpec::new(48_000.0, 512, MAX_CHANNELS + 1)),
            Err(PrepareError::InvalidChannelCount(MAX_CHANNELS + 1))
        );
    }

    #[test]
    fn unprepared_path_passes_audio_through() {
        let mut path = SignalPath::new();
        let input: Vec<f32> = (0..64).map(|n| n as f32 * 0.01).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        path.process_block(&mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn delay_mode_dry_settings_are_bit_exact() {
        let mut path = prepared_path();
        path.apply_params(&EngineParams {
            delay: DelayParams {
                wet_mix: 0.0,
                ..DelayParams::default()
            },
            ..path.snapshot()
        });

        let input: Vec<f32> = (0..256).map(|n| (n as f32 * 0.05).sin()).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        path.process_block(&mut [&mut left[..], &mut right[..]]);
        assert_eq!(left, input, "dry delay settings must be a bit-exact bypass");
    }

    #[test]
    fn mode_switch_keeps_cached_parameters() {
        let mut path = prepared_path();
        let custom = EngineParams {
            reverb: ReverbParams {
                room_size: 0.9,
                ..ReverbParams::default()
            },
            ..path.snapshot()
        };
        path.apply_params(&custom);

        path.set_mode(ProcessingMode::ReverbOnly);
        assert_eq!(path.mode(), ProcessingMode::ReverbOnly);
        assert_eq!(path.snapshot().reverb.room_size, 0.9);
    }

    #[test]
    fn looper_commands_reach_the_looper() {
        let mut path = prepared_path();
        assert_eq!(path.looper_state(), LooperState::Stopped);
        path.looper_command(LooperCommand::StartRecording);
        assert_eq!(path.looper_state(), LooperState::Recording);
        path.looper_command(LooperCommand::Clear);
        assert_eq!(path.looper_state(), LooperState::Stopped);
    }

    #[cfg(feature = "rtrb")]
    #[test]
    fn control_messages_apply_at_the_block_boundary() {
        let (mut tx, rx) = rtrb::RingBuffer::new(16);
        let mut path = prepared_path();
        path.set_control_receiver(rx);

        tx.push(ControlMessage::SetMode(ProcessingMode::LooperOnly))
            .unwrap();
        tx.push(ControlMessage::Looper(LooperCommand::StartRecording))
            .unwrap();

        let mut left = vec![0.0f32; 64];
        let mut right = vec![0.0f32; 64];
        path.process_block(&mut [&mut left[..], &mut right[..]]);

        assert_eq!(path.mode(), ProcessingMode::LooperOnly);
        assert_eq!(path.looper_state(), LooperState::Recording);
    }

    #[test]
    fn snapshot_survives_a_round_trip() {
        let mut path = prepared_path();
        let custom = EngineParams {
            mode: ProcessingMode::Serial,
            delay: DelayParams {
                time_seconds: 1.25,
                feedback: 0.3,
                wet_mix: 0.8,
            },
            ..EngineParams::default()
        };
        path.apply_params(&custom);

        let saved = path.snapshot();
        let mut restored = prepared_path();
        restored.apply_params(&saved);
        assert_eq!(restored.snapshot(), custom);
    }
}
