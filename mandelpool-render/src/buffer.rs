use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use mandelpool_core::PixelRect;

use crate::color::{to_rgba, BLACK};

/// The packed `0xAARRGGBB` output image, shared between render workers and
/// the presentation layer.
///
/// Workers write disjoint pixels; readers may observe a partially rendered
/// frame at any time. Each pixel is an independent relaxed atomic, so no
/// lock is ever taken.
#[derive(Debug)]
pub struct OutputImage {
    pub width: u32,
    pub height: u32,
    pixels: Vec<AtomicU32>,
}

impl OutputImage {
    /// Create an image filled with opaque black.
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: (0..len).map(|_| AtomicU32::new(BLACK)).collect(),
        }
    }

    /// A new image of the given size with `source` stretched over it.
    pub fn scaled_from(source: &OutputImage, width: u32, height: u32) -> Self {
        let image = Self::new(width, height);
        let rect = PixelRect::new(0.0, 0.0, source.width as f64, source.height as f64);
        image.blit_resampled(&source.snapshot(), source.width, source.height, rect);
        image
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Store a packed color at a row-major pixel index.
    #[inline]
    pub fn set(&self, index: usize, argb: u32) {
        self.pixels[index].store(argb, Ordering::Relaxed);
    }

    #[inline]
    pub fn pixel(&self, index: usize) -> u32 {
        self.pixels[index].load(Ordering::Relaxed)
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u32 {
        self.pixel(y as usize * self.width as usize + x as usize)
    }

    /// Copy out the current contents (possibly mid-render).
    pub fn snapshot(&self) -> Vec<u32> {
        self.pixels
            .iter()
            .map(|p| p.load(Ordering::Relaxed))
            .collect()
    }

    /// Current contents as RGBA bytes, 4 per pixel, row-major.
    pub fn to_rgba8(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.pixels.len() * 4];
        out.par_chunks_mut(4)
            .zip(self.pixels.par_iter())
            .for_each(|(px, argb)| px.copy_from_slice(&to_rgba(argb.load(Ordering::Relaxed))));
        out
    }

    /// Stretch the region `rect` of the current contents over the whole image
    /// (nearest neighbour). Pixels sampled from outside the image turn black.
    ///
    /// Used as a coarse preview while a new generation fills in; must only be
    /// called while no workers are writing.
    pub fn resample_from(&self, rect: PixelRect) {
        let source = self.snapshot();
        self.blit_resampled(&source, self.width, self.height, rect);
    }

    fn blit_resampled(&self, source: &[u32], src_w: u32, src_h: u32, rect: PixelRect) {
        let width = self.width as usize;
        let sx = rect.width / self.width as f64;
        let sy = rect.height / self.height as f64;
        self.pixels.par_iter().enumerate().for_each(|(idx, dst)| {
            let x = (idx % width) as f64;
            let y = (idx / width) as f64;
            let src_x = (rect.x + (x + 0.5) * sx).floor();
            let src_y = (rect.y + (y + 0.5) * sy).floor();
            let inside = src_x >= 0.0
                && src_y >= 0.0
                && src_x < src_w as f64
                && src_y < src_h as f64;
            let color = if inside {
                source[src_y as usize * src_w as usize + src_x as usize]
            } else {
                BLACK
            };
            dst.store(color, Ordering::Relaxed);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_is_black_opaque() {
        let img = OutputImage::new(4, 3);
        assert_eq!(img.len(), 12);
        assert!(img.snapshot().iter().all(|&p| p == BLACK));
        assert!(img.to_rgba8().chunks_exact(4).all(|c| c == [0, 0, 0, 255]));
    }

    #[test]
    fn set_and_get_address_row_major() {
        let img = OutputImage::new(5, 4);
        img.set(2 * 5 + 3, 0xFFAB_CDEF);
        assert_eq!(img.get(3, 2), 0xFFAB_CDEF);
        assert_eq!(img.get(2, 3), BLACK);
        let rgba = img.to_rgba8();
        let o = (2 * 5 + 3) * 4;
        assert_eq!(&rgba[o..o + 4], &[0xAB, 0xCD, 0xEF, 0xFF]);
    }

    #[test]
    fn resample_zooms_top_left_quadrant() {
        let img = OutputImage::new(4, 4);
        for i in 0..16 {
            img.set(i, 0xFF00_0000 | i as u32);
        }
        img.resample_from(PixelRect::new(0.0, 0.0, 2.0, 2.0));
        // Each source pixel of the 2×2 corner now covers a 2×2 block.
        assert_eq!(img.get(0, 0), 0xFF00_0000);
        assert_eq!(img.get(1, 1), 0xFF00_0000);
        assert_eq!(img.get(2, 0), 0xFF00_0001);
        assert_eq!(img.get(3, 3), 0xFF00_0005);
    }

    #[test]
    fn resample_outside_turns_black() {
        let img = OutputImage::new(2, 2);
        for i in 0..4 {
            img.set(i, 0xFFFF_FFFF);
        }
        img.resample_from(PixelRect::new(1.0, 0.0, 2.0, 2.0));
        assert_eq!(img.get(0, 0), 0xFFFF_FFFF);
        assert_eq!(img.get(1, 0), BLACK);
    }

    #[test]
    fn scaled_from_stretches_source() {
        let src = OutputImage::new(2, 1);
        src.set(0, 0xFF11_1111);
        src.set(1, 0xFF22_2222);
        let dst = OutputImage::scaled_from(&src, 4, 2);
        assert_eq!(dst.get(0, 0), 0xFF11_1111);
        assert_eq!(dst.get(1, 1), 0xFF11_1111);
        assert_eq!(dst.get(2, 0), 0xFF22_2222);
        assert_eq!(dst.get(3, 1), 0xFF22_2222);
    }
}
