pub mod dsp;
pub mod engine;
pub mod fx; // Stereo block processors behind the shared Processor trait

pub use engine::{PrepareError, SignalPath};
pub use fx::ProcessSpec;

/// Largest block size the engine will ever be asked to render.
pub const MAX_BLOCK_SIZE: usize = 2048;
/// Channel counts accepted at prepare time. Processing touches at most two.
pub const MAX_CHANNELS: usize = 8;
