//! Hue-based coloring of iteration values.
//!
//! Colors are packed as `0xAARRGGBB` with an opaque alpha channel.

/// Opaque black, used for points that did not escape.
pub const BLACK: u32 = 0xFF00_0000;

#[inline]
fn channel(v: f32) -> u32 {
    (v * 255.0 + 0.5) as u32
}

/// Convert hue/saturation/brightness (each nominally in `[0, 1]`) to a
/// packed opaque color.
///
/// Hue wraps (only its fractional part is used). Channels are rounded as
/// `(int)(v * 255 + 0.5)` in single precision.
pub fn hsb_to_rgb(hue: f32, saturation: f32, brightness: f32) -> u32 {
    let (r, g, b) = if saturation == 0.0 {
        let v = channel(brightness);
        (v, v, v)
    } else {
        let h = (hue - hue.floor()) * 6.0;
        let f = h - h.floor();
        let p = brightness * (1.0 - saturation);
        let q = brightness * (1.0 - saturation * f);
        let t = brightness * (1.0 - saturation * (1.0 - f));
        let (r, g, b) = match h as u32 {
            0 => (brightness, t, p),
            1 => (q, brightness, p),
            2 => (p, brightness, t),
            3 => (p, q, brightness),
            4 => (t, p, brightness),
            5 => (brightness, p, q),
            _ => (0.0, 0.0, 0.0),
        };
        (channel(r), channel(g), channel(b))
    };
    BLACK | (r.min(255) << 16) | (g.min(255) << 8) | b.min(255)
}

/// Display color for an iteration value.
///
/// `hue = iteration / max_iterations`, full saturation, `brightness = 1 − hue`;
/// black when the point did not escape (`iteration >= max_iterations`).
#[inline]
pub fn iteration_color(iteration: f64, max_iterations: u32) -> u32 {
    let max = max_iterations as f64;
    if iteration >= max {
        return BLACK;
    }
    let hue = (iteration / max) as f32;
    hsb_to_rgb(hue, 1.0, 1.0 - hue)
}

/// Unpack `0xAARRGGBB` into `[r, g, b, a]` bytes.
#[inline]
pub fn to_rgba(argb: u32) -> [u8; 4] {
    [
        (argb >> 16) as u8,
        (argb >> 8) as u8,
        argb as u8,
        (argb >> 24) as u8,
    ]
}
