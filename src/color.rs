// ============================================================================
// PIXEL TYPE — 32-bit BGRA color, premultiplied alpha in surface storage
// ============================================================================

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// A 4-byte pixel in B, G, R, A channel order.
///
/// Surfaces store colors premultiplied by alpha.  Algorithms that blend in
/// straight-alpha space (e.g. the weighted blur) convert with
/// [`to_straight_alpha`](Self::to_straight_alpha) before accumulating and
/// reconvert with [`to_premultiplied_alpha`](Self::to_premultiplied_alpha)
/// afterwards.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct ColorBgra {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl ColorBgra {
    pub const TRANSPARENT: ColorBgra = ColorBgra { b: 0, g: 0, r: 0, a: 0 };
    pub const BLACK: ColorBgra = ColorBgra { b: 0, g: 0, r: 0, a: 255 };
    pub const WHITE: ColorBgra = ColorBgra { b: 255, g: 255, r: 255, a: 255 };

    pub const fn from_bgra(b: u8, g: u8, r: u8, a: u8) -> Self {
        Self { b, g, r, a }
    }

    /// Opaque color from the three color channels.
    pub const fn from_bgr(b: u8, g: u8, r: u8) -> Self {
        Self { b, g, r, a: 255 }
    }

    /// Build a pixel from wide intermediate sums, clamping each channel
    /// to [0, 255].
    pub fn from_bgra_clamped(b: i64, g: i64, r: i64, a: i64) -> Self {
        Self {
            b: b.clamp(0, 255) as u8,
            g: g.clamp(0, 255) as u8,
            r: r.clamp(0, 255) as u8,
            a: a.clamp(0, 255) as u8,
        }
    }

    /// Convert premultiplied storage to straight alpha.  A zero-alpha pixel
    /// maps to fully transparent black.
    pub fn to_straight_alpha(self) -> Self {
        if self.a == 0 {
            return Self::TRANSPARENT;
        }
        let a = self.a as u32;
        let unscale = |v: u8| (((v as u32) * 255 + a / 2) / a).min(255) as u8;
        Self {
            b: unscale(self.b),
            g: unscale(self.g),
            r: unscale(self.r),
            a: self.a,
        }
    }

    /// Convert straight alpha back to premultiplied storage.
    pub fn to_premultiplied_alpha(self) -> Self {
        let a = self.a as u32;
        // (v * a + 0x80) * 257 >> 16 is round(v * a / 255) without a divide.
        let scale = |v: u8| ((((v as u32) * a + 0x80) * 257) >> 16) as u8;
        Self {
            b: scale(self.b),
            g: scale(self.g),
            r: scale(self.r),
            a: self.a,
        }
    }

    /// Linear blend between `self` and `other`.  `frac` outside [0, 1]
    /// extrapolates; every channel is clamped back to byte range.
    pub fn lerp(self, other: ColorBgra, frac: f32) -> Self {
        let mix = |from: u8, to: u8| {
            (from as f32 + (to as f32 - from as f32) * frac)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Self {
            b: mix(self.b, other.b),
            g: mix(self.g, other.g),
            r: mix(self.r, other.r),
            a: mix(self.a, other.a),
        }
    }

    /// Perceptual intensity in [0, 1] (Rec. 601 luma weights).
    pub fn intensity(self) -> f32 {
        (0.114 * self.b as f32 + 0.587 * self.g as f32 + 0.299 * self.r as f32) / 255.0
    }

    /// Perceptual intensity as a byte, integer arithmetic only.
    pub fn intensity_byte(self) -> u8 {
        ((7471 * self.b as u32 + 38470 * self.g as u32 + 19595 * self.r as u32) >> 16) as u8
    }
}

// ============================================================================
// COLOR SPACE HELPERS
// ============================================================================

/// RGB (0..1) → HSL (H: 0..1, S: 0..1, L: 0..1)
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if (max - min).abs() < 1e-6 {
        return (0.0, 0.0, l);
    }

    let d = max - min;
    let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };

    let h = if (max - r).abs() < 1e-6 {
        let mut h = (g - b) / d;
        if h < 0.0 {
            h += 6.0;
        }
        h / 6.0
    } else if (max - g).abs() < 1e-6 {
        ((b - r) / d + 2.0) / 6.0
    } else {
        ((r - g) / d + 4.0) / 6.0
    };

    (h, s, l)
}

/// HSL (H: 0..1, S: 0..1, L: 0..1) → RGB (0..1)
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s.abs() < 1e-6 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    let r = hue_to_rgb(p, q, h + 1.0 / 3.0);
    let g = hue_to_rgb(p, q, h);
    let b = hue_to_rgb(p, q, h - 1.0 / 3.0);

    (r, g, b)
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_round_trip_opaque() {
        let c = ColorBgra::from_bgra(12, 200, 99, 255);
        assert_eq!(c.to_premultiplied_alpha(), c);
        assert_eq!(c.to_straight_alpha(), c);
    }

    #[test]
    fn premultiply_scales_by_alpha() {
        let c = ColorBgra::from_bgra(200, 100, 50, 128);
        let p = c.to_premultiplied_alpha();
        assert_eq!(p.a, 128);
        assert_eq!(p.b, 100);
        assert_eq!(p.g, 50);
        // Straight conversion recovers the original within rounding.
        let s = p.to_straight_alpha();
        assert!((s.b as i32 - 200).abs() <= 1);
        assert!((s.g as i32 - 100).abs() <= 1);
    }

    #[test]
    fn zero_alpha_unscales_to_transparent() {
        let c = ColorBgra::from_bgra(9, 9, 9, 0);
        assert_eq!(c.to_straight_alpha(), ColorBgra::TRANSPARENT);
    }

    #[test]
    fn lerp_extrapolation_clamps() {
        let white = ColorBgra::WHITE;
        let gray = ColorBgra::from_bgr(128, 128, 128);
        // Negative fraction pushes away from gray, past white.
        let sharpened = white.lerp(gray, -0.5);
        assert_eq!(sharpened, ColorBgra::WHITE);

        let mid = ColorBgra::BLACK.lerp(ColorBgra::WHITE, 0.5);
        assert_eq!(mid.r, 128);
        assert_eq!(mid.a, 255);
    }

    #[test]
    fn hsl_round_trip() {
        let (h, s, l) = rgb_to_hsl(0.8, 0.3, 0.1);
        let (r, g, b) = hsl_to_rgb(h, s, l);
        assert!((r - 0.8).abs() < 1e-4);
        assert!((g - 0.3).abs() < 1e-4);
        assert!((b - 0.1).abs() < 1e-4);
    }
}
