#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fx::delay::DelayParams;
use crate::fx::granular::GranularParams;
use crate::fx::reverb::ReverbParams;

/// Which effects are in the path and in what order.
///
/// The four single-effect modes run exactly one processor. `Serial` chains
/// looper, granular and reverb in that order; the standard delay sits out of
/// the serial chain because the granular stage already provides delay and
/// feedback, and stacking both turns to mud.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    #[default]
    DelayOnly,
    ReverbOnly,
    GranularOnly,
    LooperOnly,
    Serial,
}

impl ProcessingMode {
    /// Map a host-facing choice index to a mode. Out-of-range indices fall
    /// back to `DelayOnly`.
    pub fn from_index(index: usize) -> Self {
        match index {
            0 => Self::DelayOnly,
            1 => Self::ReverbOnly,
            2 => Self::GranularOnly,
            3 => Self::LooperOnly,
            4 => Self::Serial,
            _ => Self::DelayOnly,
        }
    }
}

/// Full parameter snapshot for the signal path.
///
/// Plain data, cheap to copy across the control/audio boundary. Every effect
/// carries its parameters even when its mode is inactive, so switching modes
/// restores the last values instead of defaults.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineParams {
    pub mode: ProcessingMode,
    pub delay: DelayParams,
    pub granular: GranularParams,
    pub reverb: ReverbParams,
}
