// ============================================================================
// UNARY PIXEL OPS — reusable per-pixel transforms (straight-alpha space)
// ============================================================================
//
// Each op maps one straight-alpha color to another; the adjustment effects
// convert from premultiplied storage before applying and reconvert after.

use crate::color::{ColorBgra, hsl_to_rgb, rgb_to_hsl};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

/// A pure per-pixel color transform.
pub trait UnaryPixelOp: Send + Sync {
    fn apply(&self, color: ColorBgra) -> ColorBgra;
}

/// Apply `op` over `rect`, unwrapping premultiplied storage around it.
pub fn render_unary(op: &dyn UnaryPixelOp, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
    for y in rect.top()..=rect.bottom() {
        let src_row = src.row_span(rect.left(), y, rect.width);
        let dst_row = dst.row_span_mut(rect.left(), y, rect.width);
        for (s, d) in src_row.iter().zip(dst_row.iter_mut()) {
            *d = op.apply(s.to_straight_alpha()).to_premultiplied_alpha();
        }
    }
}

pub struct Identity;

impl UnaryPixelOp for Identity {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        color
    }
}

/// Luminance-based grayscale conversion.
pub struct Desaturate;

impl UnaryPixelOp for Desaturate {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        let lum = color.intensity_byte();
        ColorBgra::from_bgra(lum, lum, lum, color.a)
    }
}

/// Invert the color channels, leaving alpha untouched.
pub struct Invert;

impl UnaryPixelOp for Invert {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        ColorBgra::from_bgra(255 - color.b, 255 - color.g, 255 - color.r, color.a)
    }
}

/// Input/output range remap with per-channel gamma, precomputed as three
/// 256-entry lookup tables.
pub struct Level {
    curve_b: [u8; 256],
    curve_g: [u8; 256],
    curve_r: [u8; 256],
}

impl Level {
    /// `gamma` is `[r, g, b]`; 1.0 is linear, above 1.0 brightens.
    pub fn new(
        in_low: ColorBgra,
        in_high: ColorBgra,
        gamma: [f32; 3],
        out_low: ColorBgra,
        out_high: ColorBgra,
    ) -> Self {
        Self {
            curve_b: build_level_curve(in_low.b, in_high.b, gamma[2], out_low.b, out_high.b),
            curve_g: build_level_curve(in_low.g, in_high.g, gamma[1], out_low.g, out_high.g),
            curve_r: build_level_curve(in_low.r, in_high.r, gamma[0], out_low.r, out_high.r),
        }
    }
}

impl UnaryPixelOp for Level {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        ColorBgra::from_bgra(
            self.curve_b[color.b as usize],
            self.curve_g[color.g as usize],
            self.curve_r[color.r as usize],
            color.a,
        )
    }
}

fn build_level_curve(in_low: u8, in_high: u8, gamma: f32, out_low: u8, out_high: u8) -> [u8; 256] {
    let mut curve = [0u8; 256];
    let in_range = (in_high as f32 - in_low as f32).max(1.0);
    let out_range = out_high as f32 - out_low as f32;
    let inv_gamma = 1.0 / gamma.max(0.01);

    for (i, entry) in curve.iter_mut().enumerate() {
        let normalized = ((i as f32 - in_low as f32) / in_range).clamp(0.0, 1.0);
        let corrected = normalized.powf(inv_gamma);
        *entry = (out_low as f32 + corrected * out_range).round().clamp(0.0, 255.0) as u8;
    }
    curve
}

/// Hue rotation, saturation scale and lightness offset via an HSL
/// round-trip.
pub struct HueSaturationLightness {
    hue_shift: f32,
    sat_factor: f32,
    light_offset: f32,
}

impl HueSaturationLightness {
    /// `hue_delta` in degrees (-180..180), `saturation` in percent
    /// (100 = unchanged), `lightness` in -100..100.
    pub fn new(hue_delta: i32, saturation: i32, lightness: i32) -> Self {
        Self {
            hue_shift: hue_delta as f32 / 360.0,
            sat_factor: saturation as f32 / 100.0,
            light_offset: lightness as f32 * 255.0 / 100.0,
        }
    }
}

impl UnaryPixelOp for HueSaturationLightness {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        let (h, s, l) = rgb_to_hsl(
            color.r as f32 / 255.0,
            color.g as f32 / 255.0,
            color.b as f32 / 255.0,
        );
        let mut nh = (h + self.hue_shift).fract();
        if nh < 0.0 {
            nh += 1.0;
        }
        let ns = (s * self.sat_factor).clamp(0.0, 1.0);
        let (r, g, b) = hsl_to_rgb(nh, ns, l);
        ColorBgra::from_bgra(
            (b * 255.0 + self.light_offset).round().clamp(0.0, 255.0) as u8,
            (g * 255.0 + self.light_offset).round().clamp(0.0, 255.0) as u8,
            (r * 255.0 + self.light_offset).round().clamp(0.0, 255.0) as u8,
            color.a,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn desaturate_produces_gray() {
        let c = Desaturate.apply(ColorBgra::from_bgr(10, 200, 60));
        assert_eq!(c.b, c.g);
        assert_eq!(c.g, c.r);
        assert_eq!(c.a, 255);
    }

    #[test]
    fn invert_is_involutive() {
        let c = ColorBgra::from_bgra(3, 77, 201, 180);
        assert_eq!(Invert.apply(Invert.apply(c)), c);
    }

    #[test]
    fn level_identity_when_ranges_match() {
        let level = Level::new(
            ColorBgra::BLACK,
            ColorBgra::WHITE,
            [1.0, 1.0, 1.0],
            ColorBgra::BLACK,
            ColorBgra::WHITE,
        );
        for v in [0u8, 1, 127, 254, 255] {
            let c = ColorBgra::from_bgr(v, v, v);
            assert_eq!(level.apply(c), c);
        }
    }

    #[test]
    fn level_curve_is_monotonic() {
        let curve = build_level_curve(20, 235, 1.4, 0, 255);
        for i in 1..256 {
            assert!(curve[i] >= curve[i - 1]);
        }
        assert_eq!(curve[0], 0);
        assert_eq!(curve[255], 255);
    }

    #[test]
    fn hsl_identity_settings_keep_color() {
        let op = HueSaturationLightness::new(0, 100, 0);
        let c = ColorBgra::from_bgr(12, 80, 230);
        let out = op.apply(c);
        assert!((out.b as i32 - c.b as i32).abs() <= 1);
        assert!((out.g as i32 - c.g as i32).abs() <= 1);
        assert!((out.r as i32 - c.r as i32).abs() <= 1);
    }
}
