// ============================================================================
// SEPARABLE WEIGHTED CONVOLUTION — Gaussian-style blur
// ============================================================================
//
// Triangular integer weight profile of length 2*radius+1, applied as a 2D
// separable sliding window. Per-column partial sums are kept in scratch
// arrays and shifted left as the window advances along the scanline, so
// each output pixel only samples one fresh column.

use serde::{Deserialize, Serialize};

use crate::color::ColorBgra;
use crate::error::Result;
use crate::ops::effects::{ChangeSignal, Chrome, Effect, EffectData};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

/// Linearly-ramped integer weights, mirrored around the center tap.
pub fn create_blur_weights(radius: i32) -> Vec<i64> {
    let len = (1 + radius * 2) as usize;
    let mut weights = vec![0i64; len];
    for i in 0..=radius as usize {
        weights[i] = 16 * (i as i64 + 1);
        weights[len - i - 1] = weights[i];
    }
    weights
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GaussianBlurData {
    radius: i32,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for GaussianBlurData {
    fn default() -> Self {
        Self { radius: 2, changed: ChangeSignal::default() }
    }
}

impl Clone for GaussianBlurData {
    fn clone(&self) -> Self {
        Self { radius: self.radius, changed: ChangeSignal::default() }
    }
}

impl GaussianBlurData {
    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn set_radius(&mut self, radius: i32) {
        let radius = radius.clamp(0, 200);
        if radius != self.radius {
            self.radius = radius;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for GaussianBlurData {
    fn is_default(&self) -> bool {
        self.radius == 0
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct GaussianBlurEffect {
    pub data: GaussianBlurData,
}

impl GaussianBlurEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-column partial sums over the vertical weight profile.
struct ColumnSums {
    wa: Vec<i64>,
    wc: Vec<i64>,
    a: Vec<i64>,
    b: Vec<i64>,
    g: Vec<i64>,
    r: Vec<i64>,
}

impl ColumnSums {
    fn new(len: usize) -> Self {
        Self {
            wa: vec![0; len],
            wc: vec![0; len],
            a: vec![0; len],
            b: vec![0; len],
            g: vec![0; len],
            r: vec![0; len],
        }
    }

    fn clear(&mut self, wx: usize) {
        self.wa[wx] = 0;
        self.wc[wx] = 0;
        self.a[wx] = 0;
        self.b[wx] = 0;
        self.g[wx] = 0;
        self.r[wx] = 0;
    }

    fn shift_left(&mut self) {
        self.wa.rotate_left(1);
        self.wc.rotate_left(1);
        self.a.rotate_left(1);
        self.b.rotate_left(1);
        self.g.rotate_left(1);
        self.r.rotate_left(1);
    }

    /// Accumulate the vertical profile for column `src_x` at output row `y`.
    ///
    /// Samples are converted to straight alpha; the channel taps carry both
    /// the spatial weight and an alpha multiplier of `a + (a >> 7)`, which
    /// is exactly 256 for an opaque sample, so fully opaque uniform regions
    /// divide back out losslessly.
    fn fill_column(
        &mut self,
        wx: usize,
        src: &Surface,
        src_x: i32,
        y: i32,
        radius: i32,
        weights: &[i64],
    ) {
        self.clear(wx);
        if src_x < 0 || src_x >= src.width() {
            return;
        }
        for (wy, &wp) in weights.iter().enumerate() {
            let src_y = y + wy as i32 - radius;
            if src_y < 0 || src_y >= src.height() {
                continue;
            }
            let c = src.get(src_x, src_y).to_straight_alpha();
            let alpha = c.a as i64;

            self.wa[wx] += wp;
            let wp = wp * (alpha + (alpha >> 7));
            self.wc[wx] += wp;
            let wp = wp >> 8;

            self.a[wx] += wp * alpha;
            self.b[wx] += wp * c.b as i64;
            self.g[wx] += wp * c.g as i64;
            self.r[wx] += wp * c.r as i64;
        }
    }
}

fn blend_totals(weights: &[i64], sums: &ColumnSums) -> ColorBgra {
    let mut wa_sum = 0i64;
    let mut wc_sum = 0i64;
    let mut a_sum = 0i64;
    let mut b_sum = 0i64;
    let mut g_sum = 0i64;
    let mut r_sum = 0i64;
    for (wx, &w) in weights.iter().enumerate() {
        wa_sum += w * sums.wa[wx];
        wc_sum += w * sums.wc[wx];
        a_sum += w * sums.a[wx];
        b_sum += w * sums.b[wx];
        g_sum += w * sums.g[wx];
        r_sum += w * sums.r[wx];
    }
    wc_sum >>= 8;

    if wa_sum == 0 || wc_sum == 0 {
        ColorBgra::TRANSPARENT
    } else {
        ColorBgra::from_bgra_clamped(
            b_sum / wc_sum,
            g_sum / wc_sum,
            r_sum / wc_sum,
            a_sum / wa_sum,
        )
        .to_premultiplied_alpha()
    }
}

impl Effect for GaussianBlurEffect {
    fn name(&self) -> &str {
        "Gaussian Blur"
    }

    fn icon(&self) -> &str {
        "effect-gaussian-blur"
    }

    fn menu_category(&self) -> &str {
        "Blurs"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Gaussian Blur", &mut self.data))
    }

    fn is_no_op(&self) -> bool {
        self.data.is_default()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let radius = self.data.radius();
        if radius == 0 {
            dst.copy_rect_from(src, rect);
            return;
        }

        let weights = create_blur_weights(radius);
        let wlen = weights.len();
        let mut sums = ColumnSums::new(wlen);

        for y in rect.top()..=rect.bottom() {
            for wx in 0..wlen {
                let src_x = rect.left() + wx as i32 - radius;
                sums.fill_column(wx, src, src_x, y, radius, &weights);
            }
            dst.put(rect.left(), y, blend_totals(&weights, &sums));

            for x in rect.left() + 1..=rect.right() {
                sums.shift_left();
                sums.fill_column(wlen - 1, src, x + radius, y, radius, &weights);
                dst.put(x, y, blend_totals(&weights, &sums));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::effects::render_effect;

    #[test]
    fn weight_profile_is_triangular_and_mirrored() {
        let w = create_blur_weights(3);
        assert_eq!(w, vec![16, 32, 48, 64, 48, 32, 16]);
    }

    #[test]
    fn radius_zero_is_identity() {
        let mut src = Surface::new(5, 5);
        src.put(1, 3, ColorBgra::from_bgr(9, 8, 7));
        let mut dst = Surface::new(5, 5);
        let mut effect = GaussianBlurEffect::new();
        assert!(!effect.is_no_op());
        effect.data.set_radius(0);
        assert!(effect.is_no_op());
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        assert_eq!(src, dst);
    }

    #[test]
    fn uniform_opaque_white_is_unchanged() {
        let src = Surface::new_filled(10, 10, ColorBgra::WHITE);
        let mut dst = Surface::new(10, 10);
        let mut effect = GaussianBlurEffect::new();
        effect.data.set_radius(3);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        assert_eq!(src, dst);
    }

    #[test]
    fn fully_transparent_input_stays_transparent() {
        let src = Surface::new(6, 6);
        let mut dst = Surface::new_filled(6, 6, ColorBgra::WHITE);
        let mut effect = GaussianBlurEffect::new();
        effect.data.set_radius(2);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        for p in dst.pixels() {
            assert_eq!(*p, ColorBgra::TRANSPARENT);
        }
    }

    #[test]
    fn radius_one_on_a_white_square_with_a_black_corner() {
        let white = Surface::new_filled(4, 4, ColorBgra::WHITE);
        let mut effect = GaussianBlurEffect::new();
        effect.data.set_radius(1);

        let mut dst = Surface::new(4, 4);
        render_effect(&effect, &white, &mut dst, &[white.bounds()]);
        assert_eq!(white, dst);

        let mut src = white.clone();
        src.put(0, 0, ColorBgra::BLACK);
        let mut dst = Surface::new(4, 4);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        for (x, y) in [(1, 0), (0, 1), (1, 1)] {
            assert!(dst.get(x, y).g < 255);
            assert_eq!(dst.get(x, y).a, 255);
        }
        for y in 0..4 {
            for x in 0..4 {
                if x > 1 || y > 1 {
                    assert_eq!(dst.get(x, y), ColorBgra::WHITE);
                }
            }
        }
    }

    #[test]
    fn dark_corner_bleeds_into_neighbors_only() {
        let mut src = Surface::new_filled(8, 8, ColorBgra::WHITE);
        src.put(0, 0, ColorBgra::from_bgr(0, 0, 0));
        let mut dst = Surface::new(8, 8);
        let mut effect = GaussianBlurEffect::new();
        effect.data.set_radius(2);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        // Near the corner the white picks up some black.
        assert!(dst.get(1, 1).g < 255);
        assert_eq!(dst.get(1, 1).a, 255);
        // Outside the kernel's reach nothing changes.
        assert_eq!(dst.get(5, 5), ColorBgra::WHITE);
        assert_eq!(dst.get(7, 7), ColorBgra::WHITE);
    }

    #[test]
    fn distinct_regions_render_independently() {
        let mut src = Surface::new(12, 6);
        for y in 0..6 {
            for x in 0..12 {
                src.put(x, y, ColorBgra::from_bgr((x * 20) as u8, 128, (y * 40) as u8));
            }
        }
        let mut effect = GaussianBlurEffect::new();
        effect.data.set_radius(2);

        let mut whole = Surface::new(12, 6);
        render_effect(&effect, &src, &mut whole, &[src.bounds()]);

        let mut split = Surface::new(12, 6);
        let rois = [RectI::new(0, 0, 7, 6), RectI::new(7, 0, 5, 6)];
        render_effect(&effect, &src, &mut split, &rois);
        assert_eq!(whole, split);
    }
}
