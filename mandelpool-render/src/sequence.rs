use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::Rng;

/// The order in which workers claim pixels: a permutation of
/// `0..width*height`, fixed when created and shared read-only by every
/// worker of every generation until the image size or shuffle flag changes.
///
/// A shuffled order gives a visually uniform progressive fill instead of a
/// top-to-bottom sweep; it never affects the computed values.
#[derive(Debug, Clone)]
pub struct WorkSequence {
    indices: Arc<[u32]>,
    shuffled: bool,
}

impl WorkSequence {
    pub fn new(total: usize, shuffle: bool) -> Self {
        Self::with_rng(total, shuffle, &mut rand::thread_rng())
    }

    pub fn with_rng<R: Rng + ?Sized>(total: usize, shuffle: bool, rng: &mut R) -> Self {
        let mut indices: Vec<u32> = (0..total as u32).collect();
        if shuffle {
            indices.shuffle(rng);
        }
        Self {
            indices: indices.into(),
            shuffled: shuffle,
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    /// Whether this sequence can be reused for an image of `total` pixels.
    pub fn matches(&self, total: usize, shuffle: bool) -> bool {
        self.indices.len() == total && self.shuffled == shuffle
    }

    /// Pixel index claimed at cursor position `pos`.
    #[inline]
    pub fn get(&self, pos: usize) -> usize {
        self.indices[pos] as usize
    }
}
