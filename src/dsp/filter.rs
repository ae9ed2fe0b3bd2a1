use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
}

/// Topology-preserving state-variable filter.
///
/// Used by the reverb as a post-damping stage, where the cutoff tracks the
/// damping parameter every block. Coefficients are recomputed on
/// `set_cutoff`, not per sample.
pub struct SVFilter {
    ic1eq: f32, // First integrator's memory
    ic2eq: f32, // Second integrator's memory

    cutoff_hz: f32,
    resonance: f32,
    sample_rate: f32,
    g: f32,
    k: f32,
    filter_type: FilterType,
}

impl SVFilter {
    pub fn new(filter_type: FilterType, cutoff_hz: f32, sample_rate: f32) -> Self {
        let mut filter = Self {
            ic1eq: 0.0,
            ic2eq: 0.0,
            cutoff_hz,
            resonance: 0.0,
            sample_rate: sample_rate.max(1.0),
            g: 0.0,
            k: 2.0,
            filter_type,
        };
        filter.update_coefficients();
        filter
    }

    pub fn lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::LowPass, cutoff_hz, sample_rate)
    }

    pub fn highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self::new(FilterType::HighPass, cutoff_hz, sample_rate)
    }

    pub fn set_sample_rate(&mut self, sample_rate: f32) {
        self.sample_rate = sample_rate.max(1.0);
        self.update_coefficients();
    }

    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        // keep the prewarp away from Nyquist
        self.cutoff_hz = cutoff_hz.clamp(10.0, self.sample_rate * 0.49);
        self.update_coefficients();
    }

    pub fn cutoff(&self) -> f32 {
        self.cutoff_hz
    }

    pub fn set_resonance(&mut self, resonance: f32) {
        self.resonance = resonance.clamp(0.0, 0.99);
        self.update_coefficients();
    }

    fn update_coefficients(&mut self) {
        let wd = TAU * self.cutoff_hz;
        let wa = (2.0 * self.sample_rate) * (wd / (2.0 * self.sample_rate)).tan();
        self.g = wa / (2.0 * self.sample_rate);
        self.k = 2.0 - (2.0 * self.resonance);
    }

    #[inline]
    pub fn process(&mut self, sample: f32) -> f32 {
        let h = 1.0 / (1.0 + self.g * (self.g + self.k));
        let v3 = sample - self.ic2eq;
        let v1 = h * (self.ic1eq + self.g * v3);
        let v2 = self.ic2eq + self.g * v1;

        self.ic1eq = 2.0 * v1 - self.ic1eq;
        self.ic2eq = 2.0 * v2 - self.ic2eq;

        match self.filter_type {
            FilterType::LowPass => v2,
            FilterType::HighPass => sample - self.k * v1 - v2,
        }
    }

    pub fn reset(&mut self) {
        self.ic1eq = 0.0;
        self.ic2eq = 0.0;
    }
}
