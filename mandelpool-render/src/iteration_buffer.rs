use std::sync::atomic::{AtomicU64, Ordering};

/// Raw per-pixel iteration values kept for the histogram pass.
///
/// Pass 1 writes each pixel exactly once, pass 2 only reads. Values are
/// stored as `f64` bit patterns in relaxed atomics so workers can share the
/// buffer without locks; the inter-pass barrier orders the writes before
/// the reads.
#[derive(Debug)]
pub struct IterationBuffer {
    values: Vec<AtomicU64>,
}

impl IterationBuffer {
    pub fn new(len: usize) -> Self {
        Self {
            values: (0..len).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn set(&self, index: usize, value: f64) {
        self.values[index].store(value.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self, index: usize) -> f64 {
        f64::from_bits(self.values[index].load(Ordering::Relaxed))
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values
            .iter()
            .map(|v| f64::from_bits(v.load(Ordering::Relaxed)))
    }
}
