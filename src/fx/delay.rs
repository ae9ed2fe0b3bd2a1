#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::delay::DelayLine;
use crate::fx::{ProcessSpec, Processor};

/// Longest delay the standard delay can hold.
const MAX_DELAY_SECONDS: f32 = 60.0;

/// Parameters for the standard delay. Applied as one struct; out-of-range
/// values are clamped, never rejected.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayParams {
    /// Delay time in seconds, 0.01..=60.0.
    pub time_seconds: f32,
    /// Fed-back fraction of the delayed signal, 0.0..=1.0.
    pub feedback: f32,
    /// Wet/dry blend, 0.0 = dry only, 1.0 = delayed only.
    pub wet_mix: f32,
}

impl Default for DelayParams {
    fn default() -> Self {
        Self {
            time_seconds: 0.5,
            feedback: 0.5,
            wet_mix: 0.5,
        }
    }
}

/// Stereo feedback delay: one `DelayLine` per channel.
///
/// Per sample and channel: `delayed = pop(); push(input + delayed * feedback);
/// out = delayed * wet + input * (1 - wet)`. A mono block runs the left line
/// only.
pub struct DelayFx {
    left: DelayLine,
    right: DelayLine,
    sample_rate: f32,
    feedback: f32,
    wet_mix: f32,
}

impl DelayFx {
    pub fn new() -> Self {
        Self {
            left: DelayLine::new(),
            right: DelayLine::new(),
            sample_rate: 0.0,
            feedback: 0.5,
            wet_mix: 0.5,
        }
    }

    /// Apply a parameter snapshot. The delay time is converted to samples and
    /// re-clamped against the capacity established at prepare time, so a host
    /// sending 2 minutes simply gets the 60 s maximum.
    pub fn apply_params(&mut self, params: &DelayParams) {
        self.feedback = params.feedback.clamp(0.0, 1.0);
        self.wet_mix = params.wet_mix.clamp(0.0, 1.0);

        let seconds = params.time_seconds.clamp(0.01, MAX_DELAY_SECONDS);
        let delay_samples = (seconds * self.sample_rate).round() as usize;
        self.left.set_delay(delay_samples);
        self.right.set_delay(delay_samples);
    }

    #[inline]
    fn tick(line: &mut DelayLine, input: f32, feedback: f32, wet: f32) -> f32 {
        let delayed = line.pop();
        line.push(input + delayed * feedback);
        delayed * wet + input * (1.0 - wet)
    }
}

impl Default for DelayFx {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for DelayFx {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.sample_rate = spec.sample_rate;
        let max_delay_samples = (spec.sample_rate * MAX_DELAY_SECONDS) as usize;
        self.left.prepare(max_delay_samples);
        self.right.prepare(max_delay_samples);
        self.reset();
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let feedback = self.feedback;
        let wet = self.wet_mix;

        match channels {
            [] => {}
            [mono] => {
                for sample in mono.iter_mut() {
                    *sample = Self::tick(&mut self.left, *sample, feedback, wet);
                }
            }
            [left, right, ..] => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    *l = Self::tick(&mut self.left, *l, feedback, wet);
                    *r = Self::tick(&mut self.right, *r, feedback, wet);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(sample_rate: f32) -> DelayFx {
        let mut fx = DelayFx::new();
        fx.prepare(&ProcessSpec::new(sample_rate, 512, 2));
        fx
    }

    fn process_mono(fx: &mut DelayFx, input: &[f32]) -> Vec<f32> {
        let mut buffer = input.to_vec();
        fx.process_block(&mut [&mut buffer[..]]);
        buffer
    }

    #[test]
    fn dry_mix_is_identity() {
        let mut fx = prepared(1_000.0);
        fx.apply_params(&DelayParams {
            time_seconds: 0.05,
            feedback: 0.7,
            wet_mix: 0.0,
        });

        let input: Vec<f32> = (0..128).map(|n| (n as f32 * 0.1).sin()).collect();
        let output = process_mono(&mut fx, &input);
        assert_eq!(output, input, "wet=0 must reproduce the dry input exactly");
    }

    #[test]
    fn full_wet_has_no_dry_leakage() {
        let mut fx = prepared(1_000.0);
        fx.apply_params(&DelayParams {
            time_seconds: 0.05, // 50 samples
            feedback: 0.0,
            wet_mix: 1.0,
        });

        let mut input = vec![0.0f32; 128];
        input[0] = 1.0;
        let output = process_mono(&mut fx, &input);

        assert_eq!(output[0], 0.0, "dry impulse must not leak at wet=1");
        assert!((output[50] - 1.0).abs() < 1e-6, "echo expected at 50 samples");
    }

    #[test]
    fn feedback_echoes_decay_monotonically() {
        let mut fx = prepared(1_000.0);
        fx.apply_params(&DelayParams {
            time_seconds: 0.01, // 10 samples
            feedback: 0.6,
            wet_mix: 1.0,
        });

        let mut input = vec![0.0f32; 100];
        input[0] = 1.0;
        let output = process_mono(&mut fx, &input);

        let peaks: Vec<f32> = (1..10).map(|n| output[n * 10].abs()).collect();
        assert!(peaks[0] > 0.9);
        for pair in peaks.windows(2) {
            assert!(
                pair[1] < pair[0],
                "echo peaks should decay: {peaks:?}"
            );
        }
    }

    #[test]
    fn unity_feedback_does_not_diverge() {
        let mut fx = prepared(1_000.0);
        fx.apply_params(&DelayParams {
            time_seconds: 0.01,
            feedback: 1.5, // clamped to 1.0
            wet_mix: 1.0,
        });

        let mut input = vec![0.0f32; 1_000];
        input[0] = 1.0;
        let output = process_mono(&mut fx, &input);

        let peak = output.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));
        assert!(peak <= 1.0 + 1e-6, "clamped feedback must not diverge, peak={peak}");
    }

    #[test]
    fn delay_time_clamps_to_capacity() {
        let mut fx = prepared(100.0); // capacity = 6000 samples
        fx.apply_params(&DelayParams {
            time_seconds: 1_000.0,
            feedback: 0.0,
            wet_mix: 1.0,
        });

        // Clamped to 60 s => 6000 samples; just verify nothing panics and
        // the processor keeps producing finite output.
        let input = vec![0.25f32; 256];
        let output = process_mono(&mut fx, &input);
        assert!(output.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn stereo_channels_are_independent() {
        let mut fx = prepared(1_000.0);
        fx.apply_params(&DelayParams {
            time_seconds: 0.01,
            feedback: 0.0,
            wet_mix: 1.0,
        });

        let mut left = vec![0.0f32; 32];
        let mut right = vec![0.0f32; 32];
        left[0] = 1.0; // impulse on the left only
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        assert!((left[10] - 1.0).abs() < 1e-6);
        assert!(right.iter().all(|&s| s == 0.0), "right channel must stay silent");
    }
}
