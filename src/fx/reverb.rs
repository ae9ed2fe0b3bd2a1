#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::dsp::filter::SVFilter;
use crate::dsp::reverb::SchroederReverb;
use crate::fx::{ProcessSpec, Processor};

/// Sample offset between the left and right networks. Different delay
/// lengths decorrelate the two tails, which is what makes the width control
/// audible.
const STEREO_DETUNE_SAMPLES: usize = 23;

/// Parameters for the reverb. Applied as one struct; out-of-range values are
/// clamped, never rejected.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReverbParams {
    /// Apparent room size, 0.0..=1.0.
    pub room_size: f32,
    /// High-frequency absorption, 0.0..=1.0.
    pub damping: f32,
    /// Wet output level, 0.0..=1.0.
    pub wet_level: f32,
    /// Dry output level, 0.0..=1.0.
    pub dry_level: f32,
    /// Stereo width via mid/side scaling, 0.0 = mono, 1.0 = full width.
    pub width: f32,
    /// Freeze toggle: sustains the current tail indefinitely.
    pub freeze: bool,
}

impl Default for ReverbParams {
    fn default() -> Self {
        Self {
            room_size: 0.5,
            damping: 0.5,
            wet_level: 0.33,
            dry_level: 1.0,
            width: 1.0,
            freeze: false,
        }
    }
}

/// Stereo reverb: two detuned Schroeder networks, a damping-linked post
/// low-pass on the wet path, mid/side width, and a separate dry level.
///
/// The post filter reinforces the damping perception beyond the comb
/// filters' own absorption: its cutoff sweeps from 20 kHz (damping 0) down
/// to 1 kHz (damping 1) and it is only engaged once damping is audible
/// (> 0.1), keeping the undamped path untouched.
pub struct ReverbFx {
    left: SchroederReverb,
    right: SchroederReverb,
    lowpass_l: SVFilter,
    lowpass_r: SVFilter,
    params: ReverbParams,
}

impl ReverbFx {
    pub fn new() -> Self {
        let sample_rate = 48_000.0;
        Self {
            left: SchroederReverb::new(sample_rate, 0),
            right: SchroederReverb::new(sample_rate, STEREO_DETUNE_SAMPLES),
            lowpass_l: SVFilter::lowpass(12_000.0, sample_rate),
            lowpass_r: SVFilter::lowpass(12_000.0, sample_rate),
            params: ReverbParams::default(),
        }
    }

    /// Apply a parameter snapshot.
    pub fn apply_params(&mut self, params: &ReverbParams) {
        self.params = ReverbParams {
            room_size: params.room_size.clamp(0.0, 1.0),
            damping: params.damping.clamp(0.0, 1.0),
            wet_level: params.wet_level.clamp(0.0, 1.0),
            dry_level: params.dry_level.clamp(0.0, 1.0),
            width: params.width.clamp(0.0, 1.0),
            freeze: params.freeze,
        };

        for network in [&mut self.left, &mut self.right] {
            network.set_room_size(self.params.room_size);
            network.set_damping(self.params.damping);
            network.set_frozen(self.params.freeze);
        }

        // Cutoff inversely tracks damping: 20 kHz when open, 1 kHz when shut.
        let cutoff = 20_000.0 + (1_000.0 - 20_000.0) * self.params.damping;
        self.lowpass_l.set_cutoff(cutoff);
        self.lowpass_r.set_cutoff(cutoff);
    }

    #[inline]
    fn wet_pair(&mut self, input_l: f32, input_r: f32) -> (f32, f32) {
        let mut wet_l = self.left.process(input_l);
        let mut wet_r = self.right.process(input_r);

        // Post low-pass only once damping is meaningfully engaged.
        if self.params.damping > 0.1 {
            wet_l = self.lowpass_l.process(wet_l);
            wet_r = self.lowpass_r.process(wet_r);
        }

        // Mid/side width on the wet signal only.
        let mid = (wet_l + wet_r) * 0.5;
        let side = (wet_l - wet_r) * 0.5 * self.params.width;
        (mid + side, mid - side)
    }
}

impl Default for ReverbFx {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for ReverbFx {
    fn prepare(&mut self, spec: &ProcessSpec) {
        self.left.configure(spec.sample_rate);
        self.right.configure(spec.sample_rate);
        self.lowpass_l.set_sample_rate(spec.sample_rate);
        self.lowpass_r.set_sample_rate(spec.sample_rate);
        self.reset();
    }

    fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
        self.lowpass_l.reset();
        self.lowpass_r.reset();
    }

    fn process_block(&mut self, channels: &mut [&mut [f32]]) {
        let wet_level = self.params.wet_level;
        let dry_level = self.params.dry_level;

        match channels {
            [] => {}
            [mono] => {
                for sample in mono.iter_mut() {
                    let dry = *sample;
                    let (wet_l, wet_r) = self.wet_pair(dry, dry);
                    let wet = (wet_l + wet_r) * 0.5;
                    *sample = wet * wet_level + dry * dry_level;
                }
            }
            [left, right, ..] => {
                for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                    let (dry_l, dry_r) = (*l, *r);
                    let (wet_l, wet_r) = self.wet_pair(dry_l, dry_r);
                    *l = wet_l * wet_level + dry_l * dry_level;
                    *r = wet_r * wet_level + dry_r * dry_level;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared() -> ReverbFx {
        let mut fx = ReverbFx::new();
        fx.prepare(&ProcessSpec::new(48_000.0, 512, 2));
        fx
    }

    fn stereo_impulse(len: usize) -> (Vec<f32>, Vec<f32>) {
        let mut left = vec![0.0f32; len];
        let right = vec![0.0f32; len];
        left[0] = 1.0;
        (left, right)
    }

    #[test]
    fn zero_wet_full_dry_is_identity() {
        let mut fx = prepared();
        fx.apply_params(&ReverbParams {
            wet_level: 0.0,
            dry_level: 1.0,
            ..ReverbParams::default()
        });

        let input: Vec<f32> = (0..256).map(|n| (n as f32 * 0.07).sin()).collect();
        let mut left = input.clone();
        let mut right = input.clone();
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        assert_eq!(left, input, "wet=0/dry=1 must reproduce the input exactly");
        assert_eq!(right, input);
    }

    #[test]
    fn full_wet_has_no_dry_leakage() {
        let mut fx = prepared();
        fx.apply_params(&ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            damping: 0.0,
            ..ReverbParams::default()
        });

        let (mut left, mut right) = stereo_impulse(64);
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        // The shortest comb is ~29.7 ms, far beyond this block: the impulse
        // itself must not appear in the output.
        assert!(left[0].abs() < 1e-6, "dry impulse leaked at wet-only settings");
    }

    #[test]
    fn produces_a_tail() {
        let mut fx = prepared();
        fx.apply_params(&ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            ..ReverbParams::default()
        });

        let (mut left, mut right) = stereo_impulse(48_000);
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        let tail_energy: f32 = left[2_000..].iter().map(|s| s * s).sum();
        assert!(tail_energy > 0.0, "expected a reverb tail");
    }

    #[test]
    fn zero_width_collapses_to_mono() {
        let mut fx = prepared();
        fx.apply_params(&ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            width: 0.0,
            ..ReverbParams::default()
        });

        let (mut left, mut right) = stereo_impulse(24_000);
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        for (i, (l, r)) in left.iter().zip(right.iter()).enumerate() {
            assert!(
                (l - r).abs() < 1e-6,
                "width=0 must emit identical channels, sample {i}: {l} vs {r}"
            );
        }
    }

    #[test]
    fn full_width_keeps_channels_decorrelated() {
        let mut fx = prepared();
        fx.apply_params(&ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            width: 1.0,
            ..ReverbParams::default()
        });

        let (mut left, mut right) = stereo_impulse(24_000);
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        let difference: f32 = left
            .iter()
            .zip(right.iter())
            .map(|(l, r)| (l - r).abs())
            .sum();
        assert!(difference > 1e-3, "full width should leave the channels distinct");
    }

    #[test]
    fn heavy_damping_darkens_the_tail() {
        let tail_energy = |damping: f32| -> f32 {
            let mut fx = prepared();
            fx.apply_params(&ReverbParams {
                wet_level: 1.0,
                dry_level: 0.0,
                damping,
                ..ReverbParams::default()
            });
            let (mut left, mut right) = stereo_impulse(48_000);
            fx.process_block(&mut [&mut left[..], &mut right[..]]);
            left[2_000..].iter().map(|s| s * s).sum()
        };

        let bright = tail_energy(0.0);
        let dark = tail_energy(1.0);
        assert!(
            dark < bright,
            "damping should remove tail energy: bright={bright}, dark={dark}"
        );
    }

    #[test]
    fn freeze_sustains_the_tail() {
        let mut fx = prepared();
        fx.apply_params(&ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            freeze: false,
            ..ReverbParams::default()
        });

        // Feed energy, then freeze and run silence through twice.
        let mut left = vec![0.5f32; 4_800];
        let mut right = vec![0.5f32; 4_800];
        fx.process_block(&mut [&mut left[..], &mut right[..]]);

        fx.apply_params(&ReverbParams {
            wet_level: 1.0,
            dry_level: 0.0,
            freeze: true,
            ..ReverbParams::default()
        });

        let energy_of_silence = |fx: &mut ReverbFx| -> f32 {
            let mut l = vec![0.0f32; 48_000];
            let mut r = vec![0.0f32; 48_000];
            fx.process_block(&mut [&mut l[..], &mut r[..]]);
            l.iter().map(|s| s * s).sum()
        };

        let first = energy_of_silence(&mut fx);
        let second = energy_of_silence(&mut fx);

        assert!(first > 0.0, "frozen tail should carry energy");
        assert!(
            second > first * 0.5,
            "frozen tail must not decay: first={first}, second={second}"
        );
    }
}
