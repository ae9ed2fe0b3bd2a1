/// Single-channel circular delay line.
///
/// The capacity is fixed at `prepare` time; `push`/`pop` never allocate.
/// The read offset is clamped to `capacity - 1`, so a misconfigured delay
/// time degrades to the longest representable delay instead of wrapping
/// into future samples.
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
    delay_samples: usize,
}

impl DelayLine {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            write_pos: 0,
            delay_samples: 0,
        }
    }

    /// Allocate the backing buffer. The line holds delays up to
    /// `max_delay_samples` (capacity is one larger so a full-length delay
    /// never collides with the write cursor).
    pub fn prepare(&mut self, max_delay_samples: usize) {
        self.buffer = vec![0.0; max_delay_samples.max(1) + 1];
        self.write_pos = 0;
        self.delay_samples = self.delay_samples.min(self.buffer.len() - 1);
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Set the read offset in samples, clamped to `[0, capacity - 1]`.
    pub fn set_delay(&mut self, delay_samples: usize) {
        self.delay_samples = delay_samples.min(self.buffer.len().saturating_sub(1));
    }

    pub fn delay(&self) -> usize {
        self.delay_samples
    }

    /// Write a sample at the cursor, then advance it.
    #[inline]
    pub fn push(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read the sample `delay` positions behind the write cursor.
    #[inline]
    pub fn pop(&self) -> f32 {
        let len = self.buffer.len();
        let read_pos = (self.write_pos + len - self.delay_samples) % len;
        self.buffer[read_pos]
    }
}

impl Default for DelayLine {
    fn default() -> Self {
        Self::new()
    }
}
