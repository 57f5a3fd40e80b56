// ============================================================================
// FIXED 3x3 KERNEL CONVOLUTION — color-difference effects
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::color::ColorBgra;
use crate::error::Result;
use crate::ops::effects::{ChangeSignal, Chrome, Effect, EffectData};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

/// Apply a 3x3 weight matrix to every pixel of `rect`.
///
/// Kernel taps falling outside the buffer are skipped, truncating the
/// kernel at edges rather than clamping or wrapping. Sums are computed
/// over RGB only and clamped to byte range; output alpha is opaque.
pub fn render_color_difference(
    weights: &[[f64; 3]; 3],
    src: &Surface,
    dst: &mut SurfaceMut<'_>,
    rect: RectI,
) {
    let width = src.width();
    let height = src.height();

    for y in rect.top()..=rect.bottom() {
        for x in rect.left()..=rect.right() {
            let mut b_sum = 0.0f64;
            let mut g_sum = 0.0f64;
            let mut r_sum = 0.0f64;

            for (fy, row) in weights.iter().enumerate() {
                let sy = y + fy as i32 - 1;
                if sy < 0 || sy >= height {
                    continue;
                }
                for (fx, &weight) in row.iter().enumerate() {
                    let sx = x + fx as i32 - 1;
                    if sx < 0 || sx >= width {
                        continue;
                    }
                    let c = src.get(sx, sy);
                    b_sum += weight * c.b as f64;
                    g_sum += weight * c.g as f64;
                    r_sum += weight * c.r as f64;
                }
            }

            dst.put(
                x,
                y,
                ColorBgra::from_bgra(
                    b_sum.clamp(0.0, 255.0) as u8,
                    g_sum.clamp(0.0, 255.0) as u8,
                    r_sum.clamp(0.0, 255.0) as u8,
                    255,
                ),
            );
        }
    }
}

// ============================================================================
// EDGE DETECT
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct EdgeDetectData {
    angle: f64,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for EdgeDetectData {
    fn default() -> Self {
        Self { angle: 45.0, changed: ChangeSignal::default() }
    }
}

impl Clone for EdgeDetectData {
    fn clone(&self) -> Self {
        Self { angle: self.angle, changed: ChangeSignal::default() }
    }
}

impl EdgeDetectData {
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// Detection direction in degrees, wrapped into [0, 360).
    pub fn set_angle(&mut self, angle: f64) {
        let angle = angle.rem_euclid(360.0);
        if angle != self.angle {
            self.angle = angle;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for EdgeDetectData {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Directional edge detector: a ring of cosine weights around a zero
/// center tap, oriented by the configured angle.
#[derive(Debug, Clone, Default)]
pub struct EdgeDetectEffect {
    pub data: EdgeDetectData,
}

impl EdgeDetectEffect {
    pub fn new() -> Self {
        Self::default()
    }

    fn compute_weights(&self) -> [[f64; 3]; 3] {
        let r = self.data.angle().to_radians();
        let dr = std::f64::consts::FRAC_PI_4;
        [
            [(r + dr).cos(), (r + 2.0 * dr).cos(), (r + 3.0 * dr).cos()],
            [r.cos(), 0.0, (r + 4.0 * dr).cos()],
            [(r - dr).cos(), (r - 2.0 * dr).cos(), (r - 3.0 * dr).cos()],
        ]
    }
}

impl Effect for EdgeDetectEffect {
    fn name(&self) -> &str {
        "Edge Detect"
    }

    fn icon(&self) -> &str {
        "effect-edge-detect"
    }

    fn menu_category(&self) -> &str {
        "Stylize"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Edge Detect", &mut self.data))
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let weights = self.compute_weights();
        render_color_difference(&weights, src, dst, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::effects::render_effect;

    const IDENTITY: [[f64; 3]; 3] = [[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]];

    #[test]
    fn identity_kernel_reproduces_rgb_with_opaque_alpha() {
        let mut src = Surface::new(4, 4);
        src.put(1, 2, ColorBgra::from_bgr(11, 22, 33));
        let mut dst = Surface::new(4, 4);
        render_color_difference(&IDENTITY, &src, &mut dst.view_mut(), src.bounds());

        let c = dst.get(1, 2);
        assert_eq!((c.b, c.g, c.r, c.a), (11, 22, 33, 255));
        // Transparent source pixels still come out opaque black.
        assert_eq!(dst.get(0, 0), ColorBgra::from_bgra(0, 0, 0, 255));
    }

    #[test]
    fn sums_are_clamped_to_byte_range() {
        let amplify = [[0.0; 3], [0.0, 3.0, 0.0], [0.0; 3]];
        let negate = [[0.0; 3], [0.0, -1.0, 0.0], [0.0; 3]];
        let src = Surface::new_filled(3, 3, ColorBgra::from_bgr(200, 200, 200));
        let mut dst = Surface::new(3, 3);

        render_color_difference(&amplify, &src, &mut dst.view_mut(), src.bounds());
        assert_eq!(dst.get(1, 1), ColorBgra::WHITE);

        render_color_difference(&negate, &src, &mut dst.view_mut(), src.bounds());
        assert_eq!(dst.get(1, 1), ColorBgra::from_bgra(0, 0, 0, 255));
    }

    #[test]
    fn edge_kernel_is_quiet_on_flat_regions() {
        // Ring weights are eight cosines spaced pi/4 apart; they sum to
        // zero, so a flat region convolves to black.
        let src = Surface::new_filled(6, 6, ColorBgra::from_bgr(90, 90, 90));
        let mut dst = Surface::new(6, 6);
        let effect = EdgeDetectEffect::new();
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        let c = dst.get(3, 3);
        assert!(c.b <= 1 && c.g <= 1 && c.r <= 1);
        assert_eq!(c.a, 255);
    }

    #[test]
    fn edge_kernel_responds_to_a_vertical_edge() {
        let mut src = Surface::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                let v = if x < 4 { 255 } else { 0 };
                src.put(x, y, ColorBgra::from_bgr(v, v, v));
            }
        }
        let mut dst = Surface::new(8, 8);
        let effect = EdgeDetectEffect::new();
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        let on_edge = dst.get(4, 4);
        let off_edge = dst.get(6, 4);
        assert!(on_edge.g > off_edge.g);
    }
}
