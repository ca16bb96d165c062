//! Rolling performance metrics.
//!
//! Each processing worker keeps one buffer for FPS and one for latency and
//! reports the moving average downstream with every frame.

/// Fixed-capacity circular accumulator over `f64` samples.
///
/// Appending past capacity overwrites the oldest sample. The average is
/// taken over the filled portion until the buffer fills, and over the whole
/// window afterwards; once full it stays full.
pub struct CircularBuffer {
    data: Vec<f64>,
    head: usize,
    len: usize,
}

impl CircularBuffer {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");
        Self {
            data: vec![0.0; capacity],
            head: 0,
            len: 0,
        }
    }

    /// Record a sample, evicting the oldest once capacity is reached.
    pub fn append(&mut self, value: f64) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.data.len();
        if self.len < self.data.len() {
            self.len += 1;
        }
    }

    pub fn last(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let last = (self.head + self.data.len() - 1) % self.data.len();
        Some(self.data[last])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Arithmetic mean of the held samples, `0.0` if none recorded yet.
    ///
    /// When `ndigits >= 0` the result is rounded to that many decimal
    /// digits, otherwise it is returned at full precision.
    pub fn average(&self, ndigits: i32) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let sum: f64 = if self.len < self.data.len() {
            // Only the filled portion counts before the first wrap.
            let start = (self.head + self.data.len() - self.len) % self.data.len();
            (0..self.len)
                .map(|i| self.data[(start + i) % self.data.len()])
                .sum()
        } else {
            self.data.iter().sum()
        };
        let mean = sum / self.len as f64;
        if ndigits >= 0 {
            let scale = 10f64.powi(ndigits);
            (mean * scale).round() / scale
        } else {
            mean
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_averages_zero() {
        let buffer = CircularBuffer::new(5);
        assert_eq!(buffer.average(-1), 0.0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn partial_fill_averages_filled_portion() {
        let mut buffer = CircularBuffer::new(10);
        buffer.append(2.0);
        buffer.append(4.0);
        assert_eq!(buffer.average(-1), 3.0);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn overwrite_never_retains_older_than_capacity() {
        // After N appends into capacity C, the average must equal the
        // mean of the last C samples exactly.
        let mut buffer = CircularBuffer::new(4);
        for i in 0..25 {
            buffer.append(i as f64);
        }
        // Last 4 samples: 21, 22, 23, 24.
        assert_eq!(buffer.average(-1), (21.0 + 22.0 + 23.0 + 24.0) / 4.0);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn capacity_one_tracks_last_sample() {
        let mut buffer = CircularBuffer::new(1);
        for i in 0..10 {
            buffer.append(i as f64 * 1.5);
            assert_eq!(buffer.average(-1), i as f64 * 1.5);
            assert_eq!(buffer.last(), Some(i as f64 * 1.5));
        }
    }

    #[test]
    fn rounding_to_requested_digits() {
        let mut buffer = CircularBuffer::new(3);
        buffer.append(1.0);
        buffer.append(2.0);
        buffer.append(2.0);
        assert_eq!(buffer.average(1), 1.7);
        assert_eq!(buffer.average(0), 2.0);
        assert!((buffer.average(-1) - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn stays_full_after_filling() {
        let mut buffer = CircularBuffer::new(3);
        for _ in 0..3 {
            buffer.append(1.0);
        }
        assert_eq!(buffer.len(), 3);
        buffer.append(1.0);
        assert_eq!(buffer.len(), 3);
    }
}
