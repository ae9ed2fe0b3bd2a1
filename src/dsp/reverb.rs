//! Schroeder reverb network: four parallel comb filters feeding two series
//! allpass filters.
//!
//! ```text
//! Input ──┬──→ [Comb 1] ──┐
//!         ├──→ [Comb 2] ──┤
//!         ├──→ [Comb 3] ──┼──→ (+) ──→ [Allpass 1] ──→ [Allpass 2] ──→ Output
//!         └──→ [Comb 4] ──┘
//! ```
//!
//! Comb delay times are mutually prime so the tail stays dense instead of
//! piling up at one resonance. A network can be built with a sample offset
//! added to every delay length; running left and right through two networks
//! with different offsets decorrelates the channels for stereo width.
//!
//! Freeze holds the current reverberant energy indefinitely: comb feedback is
//! pinned at 1.0, damping is lifted, and new input is muted so the recirculating
//! energy neither decays nor grows.

/// Max comb filter delay: 50ms at 192kHz = 9600 samples
const MAX_COMB_DELAY: usize = 9600;
/// Max allpass filter delay: 10ms at 192kHz = 1920 samples
const MAX_ALLPASS_DELAY: usize = 1920;

/// Comb filter delay times in ms (mutually prime ratios).
const COMB_DELAYS_MS: [f32; 4] = [29.7, 37.1, 41.1, 43.7];
/// Allpass delay times in ms.
const ALLPASS_DELAYS_MS: [f32; 2] = [5.0, 1.7];

/// A feedback comb filter with one-pole damping (pre-allocated, RT-safe).
pub struct CombFilter {
    buffer: Vec<f32>,
    delay_samples: usize,
    write_pos: usize,
    feedback: f32,
    damp: f32,
    frozen: bool,
    filter_state: f32,
}

impl CombFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; MAX_COMB_DELAY],
            delay_samples: delay_samples.clamp(1, MAX_COMB_DELAY),
            write_pos: 0,
            feedback: 0.5,
            damp: 0.5,
            frozen: false,
            filter_state: 0.0,
        }
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, 0.99);
    }

    pub fn set_damp(&mut self, damp: f32) {
        self.damp = damp.clamp(0.0, 1.0);
    }

    pub fn set_frozen(&mut self, frozen: bool) {
        self.frozen = frozen;
    }

    /// Set delay length (RT-safe, no allocation).
    pub fn set_delay(&mut self, delay_samples: usize) {
        self.delay_samples = delay_samples.clamp(1, MAX_COMB_DELAY);
        self.write_pos %= self.delay_samples;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.write_pos];

        // Frozen combs recirculate losslessly and ignore new input.
        let (feedback, damp, input_gain) = if self.frozen {
            (1.0, 0.0, 0.0)
        } else {
            (self.feedback, self.damp, 1.0)
        };

        // One-pole lowpass in the feedback path absorbs high frequencies
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;

        self.buffer[self.write_pos] = input * input_gain + self.filter_state * feedback;

        self.write_pos = (self.write_pos + 1) % self.delay_samples;

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
        self.write_pos = 0;
    }
}

/// An allpass filter for reverb diffusion (pre-allocated, RT-safe).
pub struct AllpassFilter {
    buffer: Vec<f32>,
    delay_samples: usize,
    write_pos: usize,
    feedback: f32,
}

impl AllpassFilter {
    pub fn new(delay_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; MAX_ALLPASS_DELAY],
            delay_samples: delay_samples.clamp(1, MAX_ALLPASS_DELAY),
            write_pos: 0,
            feedback: 0.5,
        }
    }

    /// Set delay length (RT-safe, no allocation).
    pub fn set_delay(&mut self, delay_samples: usize) {
        self.delay_samples = delay_samples.clamp(1, MAX_ALLPASS_DELAY);
        self.write_pos %= self.delay_samples;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];

        // Allpass: output = -g*input + delayed + g*delayed_output
        let output = -self.feedback * input + delayed;

        self.buffer[self.write_pos] = input + self.feedback * output;

        self.write_pos = (self.write_pos + 1) % self.delay_samples;

        output
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// Schroeder reverb with 4 comb filters and 2 allpass filters.
pub struct SchroederReverb {
    combs: [CombFilter; 4],
    allpasses: [AllpassFilter; 2],
    detune_samples: usize,
}

impl SchroederReverb {
    /// Create a network tuned for `sample_rate`. `detune_samples` is added to
    /// every delay length; give the two channels of a stereo pair different
    /// offsets to decorrelate them.
    pub fn new(sample_rate: f32, detune_samples: usize) -> Self {
        let comb = |ms: f32| CombFilter::new((ms * sample_rate / 1000.0) as usize + detune_samples);
        let allpass =
            |ms: f32| AllpassFilter::new((ms * sample_rate / 1000.0) as usize + detune_samples);

        Self {
            combs: [
                comb(COMB_DELAYS_MS[0]),
                comb(COMB_DELAYS_MS[1]),
                comb(COMB_DELAYS_MS[2]),
                comb(COMB_DELAYS_MS[3]),
            ],
            allpasses: [allpass(ALLPASS_DELAYS_MS[0]), allpass(ALLPASS_DELAYS_MS[1])],
            detune_samples,
        }
    }

    /// Retune delay lengths for a new sample rate (RT-safe, no allocation).
    pub fn configure(&mut self, sample_rate: f32) {
        for (comb, &delay_ms) in self.combs.iter_mut().zip(COMB_DELAYS_MS.iter()) {
            comb.set_delay((delay_ms * sample_rate / 1000.0) as usize + self.detune_samples);
        }
        for (allpass, &delay_ms) in self.allpasses.iter_mut().zip(ALLPASS_DELAYS_MS.iter()) {
            allpass.set_delay((delay_ms * sample_rate / 1000.0) as usize + self.detune_samples);
        }
    }

    /// Set the room size (scales comb feedback for longer/shorter decay).
    pub fn set_room_size(&mut self, size: f32) {
        let feedback = 0.7 + size.clamp(0.0, 1.0) * 0.28; // 0.7 to 0.98
        for comb in &mut self.combs {
            comb.set_feedback(feedback);
        }
    }

    /// Set damping (high frequency absorption).
    pub fn set_damping(&mut self, damp: f32) {
        for comb in &mut self.combs {
            comb.set_damp(damp.clamp(0.0, 1.0));
        }
    }

    /// Freeze or thaw the tail. Frozen tails sustain indefinitely.
    pub fn set_frozen(&mut self, frozen: bool) {
        for comb in &mut self.combs {
            comb.set_frozen(frozen);
        }
    }

    /// Process a single sample through the reverb.
    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        // Sum outputs of all comb filters (parallel)
        let mut output = 0.0;
        for comb in &mut self.combs {
            output += comb.process(input);
        }
        output *= 0.25; // Normalize for 4 combs

        // Pass through allpass filters (series)
        for allpass in &mut self.allpasses {
            output = allpass.process(output);
        }

        output
    }

    /// Reset all filter states.
    pub fn reset(&mut self) {
        for comb in &mut self.combs {
            comb.reset();
        }
        for allpass in &mut self.allpasses {
            allpass.reset();
        }
    }
}
