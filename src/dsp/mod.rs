//! Low-level DSP primitives used by the effect processors.
//!
//! These components are allocation-free after `prepare` and realtime-safe,
//! making them safe to embed directly inside processors running on the audio
//! thread. They intentionally stay focused on the signal-processing math so
//! the `fx` layer can handle channels, parameters and routing.

/// Fixed-capacity circular delay line.
pub mod delay;
/// State-variable filter used for post-reverb damping.
pub mod filter;
/// Comb/allpass filters and the Schroeder reverb network.
pub mod reverb;
