// ============================================================================
// PROCEDURAL RENDERERS — effects that synthesize pixels from coordinates
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::color::ColorBgra;
use crate::error::Result;
use crate::ops::effects::{ChangeSignal, Chrome, Effect, EffectData};
use crate::ops::pixel_ops::{Invert, UnaryPixelOp};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

// ============================================================================
// MANDELBROT FRACTAL
// ============================================================================

const ESCAPE: f64 = 100_000.0;
const ZOOM_FACTOR: f64 = 20.0;
const X_OFFSET: f64 = -0.7;
const Y_OFFSET: f64 = -0.29;

/// Escape-time measure for one point of the complex plane, smoothed by the
/// final orbit magnitude so color bands blend into each other.
fn mandelbrot(r: f64, i: f64, factor: i32) -> f64 {
    let inv_log_escape = 1.0 / ESCAPE.ln();
    let mut c = 0i32;
    let mut x = 0.0f64;
    let mut y = 0.0f64;

    while c * factor < 1024 && x * x + y * y < ESCAPE {
        let t = x;
        x = x * x - y * y + r;
        y = 2.0 * t * y + i;
        c += 1;
    }

    c as f64 - (y * y + x * x).ln() * inv_log_escape
}

fn clamp_to_byte(v: f64) -> i32 {
    v.clamp(0.0, 255.0) as i32
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MandelbrotFractalData {
    factor: i32,
    quality: i32,
    zoom: i32,
    angle: f64,
    invert_colors: bool,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for MandelbrotFractalData {
    fn default() -> Self {
        Self {
            factor: 1,
            quality: 2,
            zoom: 10,
            angle: 0.0,
            invert_colors: false,
            changed: ChangeSignal::default(),
        }
    }
}

impl Clone for MandelbrotFractalData {
    fn clone(&self) -> Self {
        Self {
            factor: self.factor,
            quality: self.quality,
            zoom: self.zoom,
            angle: self.angle,
            invert_colors: self.invert_colors,
            changed: ChangeSignal::default(),
        }
    }
}

impl MandelbrotFractalData {
    pub fn factor(&self) -> i32 {
        self.factor
    }

    /// Iteration budget divisor, clamped to [1, 10]. Higher values escape
    /// sooner and shift the palette.
    pub fn set_factor(&mut self, factor: i32) {
        let factor = factor.clamp(1, 10);
        if factor != self.factor {
            self.factor = factor;
            self.changed.emit();
        }
    }

    pub fn quality(&self) -> i32 {
        self.quality
    }

    /// Supersampling level, clamped to [1, 5]; a pixel averages
    /// `quality * quality + 1` jittered samples.
    pub fn set_quality(&mut self, quality: i32) {
        let quality = quality.clamp(1, 5);
        if quality != self.quality {
            self.quality = quality;
            self.changed.emit();
        }
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: i32) {
        let zoom = zoom.clamp(0, 100);
        if zoom != self.zoom {
            self.zoom = zoom;
            self.changed.emit();
        }
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// View rotation in degrees, wrapped into [0, 360).
    pub fn set_angle(&mut self, angle: f64) {
        let angle = angle.rem_euclid(360.0);
        if angle != self.angle {
            self.angle = angle;
            self.changed.emit();
        }
    }

    pub fn invert_colors(&self) -> bool {
        self.invert_colors
    }

    pub fn set_invert_colors(&mut self, invert: bool) {
        if invert != self.invert_colors {
            self.invert_colors = invert;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for MandelbrotFractalData {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Renders the Mandelbrot set over the image, replacing its contents.
///
/// Each pixel is supersampled: the sample points rotate by the configured
/// angle before being zoomed onto a fixed window of the complex plane, and
/// the smoothed escape value is banded into alpha, blue, green and red at
/// successive thresholds.
#[derive(Debug, Clone, Default)]
pub struct MandelbrotFractalEffect {
    pub data: MandelbrotFractalData,
}

impl MandelbrotFractalEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for MandelbrotFractalEffect {
    fn name(&self) -> &str {
        "Mandelbrot Fractal"
    }

    fn icon(&self) -> &str {
        "effect-mandelbrot-fractal"
    }

    fn menu_category(&self) -> &str {
        "Render"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Mandelbrot Fractal", &mut self.data))
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        // A renderer ignores the source pixels but keeps its dimensions
        // for the aspect mapping; banded destinations only span their rows.
        let w = src.width() as f64;
        let h = src.height() as f64;
        let inv_h = 1.0 / h;
        let zoom = 1.0 + ZOOM_FACTOR * self.data.zoom() as f64;
        let inv_zoom = 1.0 / zoom;
        let quality = self.data.quality();
        let inv_quality = 1.0 / quality as f64;
        let count = quality * quality + 1;
        let inv_count = 1.0 / count as f64;
        let angle_theta = self.data.angle().to_radians();
        let factor = self.data.factor();

        for y in rect.top()..=rect.bottom() {
            for x in rect.left()..=rect.right() {
                let mut r = 0i32;
                let mut g = 0i32;
                let mut b = 0i32;
                let mut a = 0i32;

                for i in 0..count {
                    let i = i as f64;
                    let u = (2.0 * x as f64 - w + i * inv_count) * inv_h;
                    let v = (2.0 * y as f64 - h + (i * inv_quality) % 1.0) * inv_h;

                    let radius = (u * u + v * v).sqrt();
                    let theta = v.atan2(u) + angle_theta;
                    let up = radius * theta.cos();
                    let vp = radius * theta.sin();

                    let m = mandelbrot(up * inv_zoom + X_OFFSET, vp * inv_zoom + Y_OFFSET, factor);
                    let c = 64.0 + factor as f64 * m;

                    r += clamp_to_byte(c - 768.0);
                    g += clamp_to_byte(c - 512.0);
                    b += clamp_to_byte(c - 256.0);
                    a += clamp_to_byte(c);
                }

                // The staggered thresholds keep a >= b >= g >= r, so the
                // averaged channels are already valid premultiplied values.
                let mut color = ColorBgra::from_bgra(
                    (b / count) as u8,
                    (g / count) as u8,
                    (r / count) as u8,
                    (a / count) as u8,
                );
                if self.data.invert_colors() {
                    color = Invert.apply(color.to_straight_alpha()).to_premultiplied_alpha();
                }
                dst.put(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::effects::{render_effect, render_in_parallel};

    #[test]
    fn output_channels_stay_premultiplied_valid() {
        let src = Surface::new(12, 10);
        let mut dst = Surface::new(12, 10);
        let effect = MandelbrotFractalEffect::new();
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        for y in 0..10 {
            for x in 0..12 {
                let c = dst.get(x, y);
                assert!(c.a >= c.b && c.b >= c.g && c.g >= c.r, "banding order at {x},{y}");
                // Every sample contributes close to the 64 base offset.
                assert!(c.a >= 60);
            }
        }
    }

    #[test]
    fn parallel_render_matches_sequential() {
        let src = Surface::new(10, 8);
        let mut effect = MandelbrotFractalEffect::new();
        effect.data.set_quality(1);

        let mut seq = Surface::new(10, 8);
        render_effect(&effect, &src, &mut seq, &[src.bounds()]);
        let mut par = Surface::new(10, 8);
        render_in_parallel(&effect, &src, &mut par, &[src.bounds()]);
        assert_eq!(seq, par);
    }

    #[test]
    fn invert_option_flips_channels_and_keeps_alpha() {
        let src = Surface::new(8, 8);
        let plain_effect = MandelbrotFractalEffect::new();
        let mut inverted_effect = MandelbrotFractalEffect::new();
        inverted_effect.data.set_invert_colors(true);

        let mut plain = Surface::new(8, 8);
        render_effect(&plain_effect, &src, &mut plain, &[src.bounds()]);
        let mut inverted = Surface::new(8, 8);
        render_effect(&inverted_effect, &src, &mut inverted, &[src.bounds()]);

        for y in 0..8 {
            for x in 0..8 {
                let p = plain.get(x, y);
                let i = inverted.get(x, y);
                assert_eq!(p.a, i.a);
                if p.a == 255 {
                    assert_eq!(i.b, 255 - p.b);
                    assert_eq!(i.g, 255 - p.g);
                    assert_eq!(i.r, 255 - p.r);
                }
            }
        }
    }

    #[test]
    fn data_setters_clamp_to_their_ranges() {
        let mut data = MandelbrotFractalData::default();
        data.set_factor(0);
        assert_eq!(data.factor(), 1);
        data.set_quality(9);
        assert_eq!(data.quality(), 5);
        data.set_zoom(200);
        assert_eq!(data.zoom(), 100);
        data.set_angle(-90.0);
        assert_eq!(data.angle(), 270.0);
    }
}
