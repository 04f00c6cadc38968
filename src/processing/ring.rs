// BUFFER COMPONENT ------------------------------------------------------------

/// Fixed-capacity ring of samples, zero-filled at startup and overwritten in
/// place once full. All reads go through `lagged` so the modular arithmetic
/// lives in exactly one place.
#[derive(Clone)]
pub struct RingBuffer {
    samples: Vec<f64>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: vec![0.0; capacity],
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Write the value for the current cycle. `cycle` must already be in
    /// range; the predictor advances it modulo the capacity.
    pub fn set(&mut self, cycle: usize, value: f64) {
        self.samples[cycle] = value;
    }

    /// Read the sample `offset` cycles behind `cycle`. Negative offsets index
    /// forward and alias onto the oldest slots, which is what a negative
    /// peak offset is expected to do.
    pub fn lagged(&self, cycle: usize, offset: isize) -> f64 {
        let len = self.samples.len() as isize;
        let index = (cycle as isize - offset).rem_euclid(len);
        self.samples[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lagged_reads_wrap_modularly() {
        let mut ring = RingBuffer::new(4);
        for cycle in 0..4 {
            ring.set(cycle, cycle as f64);
        }
        assert_eq!(ring.lagged(0, 0), 0.0);
        assert_eq!(ring.lagged(0, 1), 3.0);
        assert_eq!(ring.lagged(0, 5), 3.0);
        assert_eq!(ring.lagged(3, 2), 1.0);
    }

    #[test]
    fn negative_offsets_index_forward() {
        let mut ring = RingBuffer::new(4);
        for cycle in 0..4 {
            ring.set(cycle, cycle as f64 * 10.0);
        }
        assert_eq!(ring.lagged(1, -1), 20.0);
        assert_eq!(ring.lagged(3, -1), 0.0);
    }

    #[test]
    fn overwrites_in_place() {
        let mut ring = RingBuffer::new(3);
        ring.set(1, 5.0);
        ring.set(1, 7.0);
        assert_eq!(ring.lagged(1, 0), 7.0);
        assert_eq!(ring.len(), 3);
    }
}
