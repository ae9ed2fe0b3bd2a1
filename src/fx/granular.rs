use rand::{rngs::SmallRng, Rng, SeedableRng};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fx::{ProcessSpec, Processor};

/*
Granular Delay
==============

A granular delay continuously records the input into a ring buffer and plays
it back as a cloud of short, enveloped fragments ("grains"). Each grain is an
independent read cursor into the ring:

  - it starts `delay_time` seconds behind the write position (plus a random
    offset scaled by `spread`),
  - it advances by `pitch_ratio` samples per sample, so ratios other than 1.0
    transpose the fragment (naive resampling - no formant correction),
  - its output is shaped by a raised-cosine (Hann) window over its lifetime,
    so grains fade in and out without clicks.

Per sample the processor:
  1. writes `input + feedback * previous_written_sample` into the ring (the
     feedback tap is one sample old, which keeps the loop delay-free-safe),
  2. advances a trigger counter and spawns a grain every
     `sample_rate / density` samples,
  3. sums all active grains into the wet signal, advancing and retiring them,
  4. advances the write position,
  5. blends wet and dry.

Grain storage is a fixed pool reused by scanning for an inactive slot. When
the trigger fires faster than grains retire and no slot is free, the trigger
is skipped silently - the pool never grows on the audio thread.
*/

/// Ring buffer length in seconds.
const BUFFER_SECONDS: f32 = 5.0;
/// Fixed grain pool size. Triggers that find no free slot are skipped.
const MAX_GRAINS: usize = 32;
/// Every grain plays at this base gain before the envelope is applied.
const GRAIN_GAIN: f32 = 0.5;

/// Parameters for the granular delay. Applied as one struct; out-of-range
/// values are clamped, never rejected.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GranularParams {
    /// How far behind the write head grains start, in seconds, 0.01..=5.0.
    pub delay_seconds: f32,
    /// Grain length in seconds, 0.001..=2.0.
    pub grain_size: f32,
    /// Grains spawned per second, 0.01..=100.0.
    pub density: f32,
    /// Read-rate ratio, -4.0..=4.0. 1.0 plays at pitch, negative reverses.
    pub pitch_ratio: f32,
    /// Ring-buffer feedback, 0.0..=1.0 (internally capped at 0.95).
    pub feedback: f32,
    /// Wet/dry blend, 0.0 = dry only, 1.0 = grains only.
    pub wet_mix: f32,
    /// Random start-position spread as a fraction of the delay time, 0.0..=1.0.
    pub spread: f32,
}

impl Default for GranularParams {
    fn default() -> Self {
        Self {
            delay_seconds: 0.5,
            grain_size: 0.1,
            density: 1.0,
            pitch_ratio: 1.0,
            feedback: 0.5,
            wet_mix: 0.5,
            spread: 0.0,
        }
    }
}

/// One playback cursor into the ring buffer. Grains are plain data; the pool
/// owns them and reuses slots by index.
#[derive(Debug, Clone, Copy)]
struct Grain {
    /// Fractional ring position. f64 so fractional advance stays exact even
    /// near the far end of a long buffer.
    read_pos: f64,
    pitch_ratio: f32,
    age: u32,
    total: u32,
    amplitude: f32,
    active: bool,
}

impl Grain {
    const fn inactive() -> Self {
        Self {
            read_pos: 0.0,
            pitch_ratio: 1.0,
            age: 0,
            total: 0,
            amplitude: 0.0,
            active: false,
        }
    }
}

/// Raised-cosine (Hann) window over phase 0..=1. Clamped so both endpoints
/// evaluate to exactly zero.
#[inline]
pub fn hann(phase: f32) -> f32 {
    let phase = phase.clamp(0.0, 1.0);
    0.5 * (1.0 - (std::f32::consts::TAU * phase).cos())
}

pub struct GranularFx {
    buffer: [Vec<f32>; 2],
    buffer_len: usize,
    write_pos: usize,
    grains: [Grain; MAX_GRAINS],
    /// Samples since the last grain spawn. f64 because the trigger period
    /// reaches tens of millions of samples at minimum density, past the
    /// point where an f32 counter stops incrementing.
    trigger_timer: f64,
    samples_per_trigger: f64,
    sample_rate: f32,
    params: GranularParams,
    rng: SmallRng,
}

impl GranularFx {
    pub fn new() -> Self {
        Self {
            buffer: [Vec::new(), Vec::new()],
            buffer_len: 0,
            write_pos: 0,
            grains: [Grain::inactive(); MAX_GRAINS],
            trigger_timer: 0.0,
            samples_per_trigger: f64::MAX,
            sample_rate: 0.0,
            params: GranularParams::default(),
            rng: SmallRng::from_os_rng(),
        }
    }

    /// Apply a parameter snapshot. Density and grain size are clamped here so
    /// the trigger period can never divide by zero and grain lifetimes are
    /// never empty.
    pub fn apply_params(&mut self, params: &GranularParams) {
        self.params = GranularParams {
            delay_seconds: params.delay_seconds.clamp(0.01, BUFFER_SECONDS),
            grain_size: params.grain_size.clamp(0.001, 2.0),
            density: params.density.clamp(0.01, 100.0),
            pitch_ratio: params.pitch_ratio.clamp(-4.0, 4.0),
            feedback: params.feedback.clamp(0.0, 1.0),
            wet_mix: params.wet_mix.clamp(0.0, 1.0),
            spread: params.spread.clamp(0.0, 1.0),
        };
        self.update_trigger_period();
    }

    fn update_trigger_period(&mut self) {
        self.samples_per_trigger = (self.sample_rate / self.params.density) as f64;
    }

    /// Number of grains currently playing.
    pub fn active_grains(&self) -> usize {
        self.grains.iter().filter(|g| g.active).count()
    }

    /// Scan for a free slot and start a grain there. Skipped silently when
    /// the pool is saturated.
    fn trigger_grain(&mut self) {
        let Some(slot) = self.grains.iter_mut().find(|g| !g.active) else {
            return;
        };

        let total = (self.params.grain_size * self.sample_rate) as u32;
        let jitter: f32 = self.rng.random_range(-1.0..=1.0);
        let delay_seconds = (self.params.delay_seconds
            + self.params.spread * self.params.delay_seconds * jitter)
            .max(0.01);
        let delay_samples = (delay_seconds * self.sample_rate) as f64;
        let read_pos =
            (self.write_pos as f64 - delay_samples).rem_euclid(self.buffer_len as f64);

        *slot = Grain {
            read_pos,
            pitch_ratio: self.params.pitch_ratio,
            age: 0,
            total: total.max(1),
            amplitude: GRAIN_GAIN,
            active: true,
        };
    }

    /// Linearly interpolated read from one ring channel.
    #[inline]
    fn read_interpolated(channel: &[f32], position: f64) -> f32 {
        let len = channel.len();
        let base = position.floor();
        let frac = (position - base) as f32;
        let idx = base as usize % len;
        let next = (idx + 1) % len;
        channel[idx] * (1.0 - frac) + channel[next] * frac
    }

    /// Sum all active grains into a stereo wet sample. Each grain advances
    /// once per sample and reads both channels from the same cursor.
    fn process_grains(&mut self, stereo: bool) -> (f32, f32) {
        let mut wet_l = 0.0;
        let mut wet_r = 0.0;
        let buffer_len = self.buffer_len as f64;

        for grain in self.grains.iter_mut().filter(|g| g.active) {
            let phase = grain.age as f32 / grain.total as f32;
            let envelope = hann(phase);

            let sample_l = Self::read_interpolated(&self.buffer[0], grain.read_pos);
            let sample_r = if stereo {
                Self::read_interpolated(&self.buffer[1], grain.read_pos)
            } else {
                sample_l
            };

            wet_l += sample_l * grain.amplitude * envelope;
            wet_r += sample_r * grain.amplitude * envelope;

            grain.read_pos = (grain.read_pos + grain.pitch_ratio as f64).rem_euclid(buffer_len);
            grain.age += 1;
            if grain.age >= grain.total {
                grain.active = false;
            }
        }

        (wet_l, wet_r)
    }

    /// Write input plus the one-sample-old feedback tap into the ring.
    #[inline]
    fn write_ring(&mut self, channel: usize, input: f32) {
        let previous = (self.write_pos + self.buffer_len - 1) % self.buffer_len;
        let feedback = self.params.feedback.min(0.95);
        let fed_back = self.buffer[channel][previous] * feedback;
        self.buffer[channel][self.write_pos] = input + fed_back;
    }

    #[inline]
    fn tick_trigger(&mut self) {
        self.trigger_timer += 1.0;
        if self.trigger_timer >= self.samples_per_trigger {
            self.trigger_grain();
            self.trigger_timer = 0.0;
        }
    }
}

impl Default for GranularFx {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for GranularFx {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.sample_rate = spec.sample_rate;
        self.buffer_len = (spec.sample_rate * BUFFER_SECONDS) as usize;
        for channel in &mut self.buffer {
            *channel = vec![0.0; self.buffer_len];
        }
        self.update_trigger_period();
        self.reset();
    }

    fn reset(&mut self) {
        for channel in &mut self.buffer {
            channel.fill(0.0);
        }
        self.write_pos = 0;
        self.grains = [Grain::inactive(); MAX_GRAINS];
        self.trigger_timer = 0.0;
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        if self.buffer_len == 0 {
            return;
        }
        let wet = self.params.wet_mix;
        let dry = 1.0 - wet;

        match channels {
            [] => {}
            [mono] => {
                for sample in mono.iter_mut() {
                    let input = *sample;
                    self.write_ring(0, input);
                    self.tick_trigger();
                    let (wet_sample, _) = self.process_grains(false);
                    *sample = wet_sample * wet + input * dry;
                    self.write_pos = (self.write_pos + 1) % self.buffer_len;
                }
            }
            [left, right, ..] => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (input_l, input_r) = (*l, *r);
                    self.write_ring(0, input_l);
                    self.write_ring(1, input_r);
                    self.tick_trigger();
                    let (wet_l, wet_r) = self.process_grains(true);
                    *l = wet_l * wet + input_l * dry;
                    *r = wet_r * wet + input_r * dry;
                    self.write_pos = (self.write_pos + 1) % self.buffer_len;
                }
            }
        }
    }
}
