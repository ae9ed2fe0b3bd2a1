//! Stereo block processors built on the `dsp` primitives.
//!
//! Every effect implements the same `Processor` contract so the signal path
//! can prepare, reset and run them uniformly. Audio is planar and processed
//! in place; processors touch at most the first two channels and leave any
//! further channels untouched.

/// Stereo feedback delay with wet/dry mixing.
pub mod delay;
/// Granular delay: ring buffer plus a pool of enveloped read cursors.
pub mod granular;
/// Phrase looper with a four-state record/play machine.
pub mod looper;
/// Schroeder reverb pair with width and damping controls.
pub mod reverb;

pub use delay::DelayFx;
pub use granular::GranularFx;
pub use looper::LooperFx;
pub use reverb::ReverbFx;

/// Stream configuration handed to every processor before audio starts.
///
/// All internal buffer sizings derive from this; a new spec invalidates and
/// re-derives them. Validation happens once at the `SignalPath` boundary,
/// processors trust the values they receive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f32,
    pub max_block_size: usize,
    pub num_channels: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f32, max_block_size: usize, num_channels: usize) -> Self {
        Self {
            sample_rate,
            max_block_size,
            num_channels,
        }
    }
}

/// Uniform prepare/reset/process contract shared by all effects.
///
/// `process_block` mutates the block in place and must stay allocation-free;
/// anything sized by the stream belongs in `prepare`.
pub trait Processor: Send {
    fn prepare(&mut self, spec: &ProcessSpec);

    fn reset(&mut self);

    fn process_block(&mut self, channels: &mut [&mut [f32]]);
}
