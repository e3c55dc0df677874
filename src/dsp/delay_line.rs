/// Single-channel circular delay buffer with fractional reads.
///
/// Capacity is fixed when the line is sized during `prepare`; nothing on the
/// processing path allocates. Reads are taken relative to the current write
/// position, so a read must happen before the write of the same sample.
#[derive(Debug, Clone, Default)]
pub struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut line = Self::default();
        line.resize(capacity);
        line
    }

    /// Resize the buffer. Only called from `prepare`; clears the contents.
    pub fn resize(&mut self, capacity: usize) {
        if self.buffer.len() != capacity {
            self.buffer = vec![0.0; capacity];
        }
        self.clear();
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub const fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Largest delay that still leaves room for both interpolation taps.
    pub fn max_delay(&self) -> f32 {
        self.buffer.len().saturating_sub(2) as f32
    }

    /// Read `delay` samples behind the write position, linearly interpolating
    /// between the two nearest integer taps.
    #[inline]
    pub fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        if len < 3 {
            return 0.0;
        }

        let delay = delay.clamp(1.0, self.max_delay());
        let whole = delay as usize;
        let frac = delay - whole as f32;

        let near = (self.write_pos + len - whole) % len;
        let far = (near + len - 1) % len;

        (1.0 - frac).mul_add(self.buffer[near], frac * self.buffer[far])
    }

    /// Store a sample at the write position and advance it by one.
    #[inline]
    pub fn write(&mut self, value: f32) {
        let len = self.buffer.len();
        if len == 0 {
            return;
        }
        self.buffer[self.write_pos] = value;
        self.write_pos = (self.write_pos + 1) % len;
    }

    /// True when every stored sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.buffer.iter().all(|&s| s == 0.0)
    }
}
