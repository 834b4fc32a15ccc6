use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex::Complex;
use crate::error::CoreError;

/// Left edge of the canonical Mandelbrot framing.
const FIT_ORIGIN: Complex = Complex { re: -2.5, im: 1.0 };
/// Real span of the canonical framing (`-2.5 ..= 1.0`).
const FIT_WIDTH: f64 = 3.5;
/// Imaginary span of the canonical framing (`-1.0 ..= 1.0`).
const FIT_HEIGHT: f64 = 2.0;

/// A rectangle in pixel space.
///
/// Fractional and negative coordinates are allowed: the rectangle handed to
/// [`Viewport::show`] may lie partly or entirely outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Grow the shorter dimension (keeping the rectangle centred) so that
    /// `width / height == ratio`.
    pub fn fitted_to_aspect(self, ratio: f64) -> Self {
        let mut rect = self;
        if rect.width / rect.height > ratio {
            let delta = rect.width / ratio - rect.height;
            rect.y -= delta / 2.0;
            rect.height += delta;
        } else {
            let delta = rect.height * ratio - rect.width;
            rect.x -= delta / 2.0;
            rect.width += delta;
        }
        rect
    }

    fn validate(&self) -> crate::Result<()> {
        let finite = self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite();
        if !finite || self.width <= 0.0 || self.height <= 0.0 {
            return Err(CoreError::InvalidViewport {
                reason: format!(
                    "rectangle must be finite with a positive size, got {}×{} at ({}, {})",
                    self.width, self.height, self.x, self.y
                ),
            });
        }
        Ok(())
    }
}

/// The visible region of the complex plane.
///
/// `origin` is the complex coordinate of pixel `(0, 0)` (the top-left
/// corner); `scale` is the number of plane units spanned by one pixel.
/// Plane `im` decreases as pixel `y` increases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Complex coordinate of the top-left pixel.
    pub origin: Complex,

    /// Complex-plane units per pixel.
    pub scale: f64,

    /// Image width in pixels.
    pub width: u32,

    /// Image height in pixels.
    pub height: u32,
}

impl Viewport {
    /// Create a viewport with explicit parameters.
    pub fn new(origin: Complex, scale: f64, width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidViewport {
                reason: format!("dimensions must be > 0, got {width}×{height}"),
            });
        }
        if scale <= 0.0 || !scale.is_finite() {
            return Err(CoreError::InvalidViewport {
                reason: format!("scale must be positive and finite, got {scale}"),
            });
        }
        Ok(Self {
            origin,
            scale,
            width,
            height,
        })
    }

    /// A viewport of the given size showing the whole classic Mandelbrot extent.
    pub fn fitted(width: u32, height: u32) -> crate::Result<Self> {
        let mut vp = Self::new(FIT_ORIGIN, 1.0, width, height)?;
        vp.fit();
        Ok(vp)
    }

    /// Map a pixel coordinate to a point on the complex plane.
    #[inline]
    pub fn pixel_to_complex(&self, px: u32, py: u32) -> Complex {
        self.point_at(px as f64, py as f64)
    }

    /// Map fractional pixel coordinates to a complex-plane point.
    #[inline]
    pub fn point_at(&self, px: f64, py: f64) -> Complex {
        self.origin + Complex::new(px * self.scale, -py * self.scale)
    }

    /// The aspect ratio of the image (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Show `rect` (in current pixel coordinates) across the full image.
    ///
    /// The rectangle is first widened or heightened to the image aspect ratio
    /// and the adjusted rectangle is returned. On error nothing changes.
    pub fn show(&mut self, rect: PixelRect) -> crate::Result<PixelRect> {
        rect.validate()?;
        let rect = rect.fitted_to_aspect(self.aspect_ratio());

        let origin = self.origin + Complex::new(rect.x * self.scale, -rect.y * self.scale);
        let scale = rect.width * self.scale / self.width as f64;
        if scale <= 0.0 || !scale.is_finite() || !origin.re.is_finite() || !origin.im.is_finite()
        {
            return Err(CoreError::InvalidViewport {
                reason: format!("rectangle maps to a degenerate scale ({scale})"),
            });
        }

        self.origin = origin;
        self.scale = scale;
        debug!(
            origin_re = origin.re,
            origin_im = origin.im,
            scale,
            "Viewport updated"
        );
        Ok(rect)
    }

    /// Reset to the canonical framing, padding the shorter dimension.
    pub fn fit(&mut self) -> PixelRect {
        self.origin = FIT_ORIGIN;
        self.scale = 1.0;
        let rect = PixelRect::new(0.0, 0.0, FIT_WIDTH, FIT_HEIGHT);
        // A fixed positive rectangle cannot fail validation.
        self.show(rect).unwrap_or(rect)
    }

    /// Zoom by `factor` keeping the plane point under `(px, py)` fixed.
    ///
    /// `factor < 1` zooms in.
    pub fn zoom(&mut self, px: f64, py: f64, factor: f64) -> crate::Result<PixelRect> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(CoreError::InvalidZoomFactor(factor));
        }
        let (width, height) = (self.width as f64, self.height as f64);
        let w = width * factor;
        let h = height * factor;
        let nx = (width - w) * px / width;
        let ny = (height - h) * py / height;
        self.show(PixelRect::new(nx, ny, w, h))
    }

    /// Shift the view by `(dx, dy)` pixels.
    pub fn pan(&mut self, dx: f64, dy: f64) -> crate::Result<PixelRect> {
        self.show(PixelRect::new(
            dx,
            dy,
            self.width as f64,
            self.height as f64,
        ))
    }

    /// Same origin and scale at a different image size.
    pub fn resized(&self, width: u32, height: u32) -> crate::Result<Self> {
        Self::new(self.origin, self.scale, width, height)
    }
}
