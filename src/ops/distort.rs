// ============================================================================
// DISTORT — inverse-transform warps with bilinear resampling
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::color::ColorBgra;
use crate::error::Result;
use crate::ops::effects::{ChangeSignal, Chrome, Effect, EffectData};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

/// How a warp fills pixels whose source sample lands outside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeBehavior {
    /// Extend the border pixels outward.
    Clamp,
    /// Mirror the image across its edges.
    Reflect,
    /// Tile the image.
    Wrap,
}

/// Fold a coordinate back into `[0, n)` by mirroring at the edges.
fn reflect_coord(v: f64, n: i32) -> f64 {
    let n = n as f64;
    let t = v.rem_euclid(2.0 * n);
    if t < n { t } else { 2.0 * n - t }
}

/// Bilinear sample in premultiplied space, with taps clamped to bounds.
fn bilinear_clamped(src: &Surface, x: f64, y: f64) -> ColorBgra {
    let fx = x.floor();
    let fy = y.floor();
    let tx = x - fx;
    let ty = y - fy;

    let x0 = (fx as i32).clamp(0, src.width() - 1);
    let x1 = (fx as i32 + 1).clamp(0, src.width() - 1);
    let y0 = (fy as i32).clamp(0, src.height() - 1);
    let y1 = (fy as i32 + 1).clamp(0, src.height() - 1);

    let c00 = src.get(x0, y0);
    let c10 = src.get(x1, y0);
    let c01 = src.get(x0, y1);
    let c11 = src.get(x1, y1);

    let blend = |a: u8, b: u8, c: u8, d: u8| {
        let top = a as f64 + (b as f64 - a as f64) * tx;
        let bottom = c as f64 + (d as f64 - c as f64) * tx;
        (top + (bottom - top) * ty).round() as i64
    };

    ColorBgra::from_bgra_clamped(
        blend(c00.b, c10.b, c01.b, c11.b),
        blend(c00.g, c10.g, c01.g, c11.g),
        blend(c00.r, c10.r, c01.r, c11.r),
        blend(c00.a, c10.a, c01.a, c11.a),
    )
}

fn sample_with_edges(src: &Surface, x: f64, y: f64, edges: EdgeBehavior) -> ColorBgra {
    let (x, y) = match edges {
        EdgeBehavior::Clamp => (x, y),
        EdgeBehavior::Reflect => (reflect_coord(x, src.width()), reflect_coord(y, src.height())),
        EdgeBehavior::Wrap => (x.rem_euclid(src.width() as f64), y.rem_euclid(src.height() as f64)),
    };
    bilinear_clamped(src, x, y)
}

// ============================================================================
// POLAR INVERSION
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct PolarInversionData {
    amount: f64,
    edge_behavior: EdgeBehavior,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for PolarInversionData {
    fn default() -> Self {
        Self { amount: 0.0, edge_behavior: EdgeBehavior::Reflect, changed: ChangeSignal::default() }
    }
}

impl Clone for PolarInversionData {
    fn clone(&self) -> Self {
        Self {
            amount: self.amount,
            edge_behavior: self.edge_behavior,
            changed: ChangeSignal::default(),
        }
    }
}

impl PolarInversionData {
    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Inversion strength, clamped to [-4, 4]. Zero leaves the image
    /// unchanged; 1 is a full inversion about the default radius.
    pub fn set_amount(&mut self, amount: f64) {
        let amount = amount.clamp(-4.0, 4.0);
        if amount != self.amount {
            self.amount = amount;
            self.changed.emit();
        }
    }

    pub fn edge_behavior(&self) -> EdgeBehavior {
        self.edge_behavior
    }

    pub fn set_edge_behavior(&mut self, edges: EdgeBehavior) {
        if edges != self.edge_behavior {
            self.edge_behavior = edges;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for PolarInversionData {
    fn is_default(&self) -> bool {
        self.amount == 0.0
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Circle inversion about the image center.
///
/// Each destination pixel is pulled from the source point whose distance
/// from the center is scaled by `lerp(1, radius^2 / d^2, amount)`, where
/// `radius` is half the shorter image dimension. The exact center maps to
/// itself.
#[derive(Debug, Clone, Default)]
pub struct PolarInversionEffect {
    pub data: PolarInversionData,
}

impl PolarInversionEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for PolarInversionEffect {
    fn name(&self) -> &str {
        "Polar Inversion"
    }

    fn icon(&self) -> &str {
        "effect-polar-inversion"
    }

    fn menu_category(&self) -> &str {
        "Distort"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Polar Inversion", &mut self.data))
    }

    fn is_no_op(&self) -> bool {
        self.data.is_default()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let cx = src.width() as f64 * 0.5;
        let cy = src.height() as f64 * 0.5;
        let radius = src.width().min(src.height()) as f64 * 0.5;
        let radius2 = radius * radius;
        let amount = self.data.amount();
        let edges = self.data.edge_behavior();

        for y in rect.top()..=rect.bottom() {
            for x in rect.left()..=rect.right() {
                let dx = x as f64 - cx;
                let dy = y as f64 - cy;
                let d2 = dx * dx + dy * dy;

                let color = if d2 == 0.0 {
                    src.get(x, y)
                } else {
                    let invert_distance = 1.0 + (radius2 / d2 - 1.0) * amount;
                    let sx = dx * invert_distance + cx;
                    let sy = dy * invert_distance + cy;
                    sample_with_edges(src, sx, sy, edges)
                };
                dst.put(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::effects::render_effect;

    fn gradient(width: i32, height: i32) -> Surface {
        let mut src = Surface::new(width, height);
        for y in 0..height {
            for x in 0..width {
                src.put(x, y, ColorBgra::from_bgr((x * 23 % 256) as u8, (y * 31 % 256) as u8, 50));
            }
        }
        src
    }

    #[test]
    fn zero_amount_is_identity() {
        let src = gradient(9, 7);
        let mut dst = Surface::new(9, 7);
        let effect = PolarInversionEffect::new();
        assert!(effect.is_no_op());
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        assert_eq!(dst, src);
    }

    #[test]
    fn full_inversion_swaps_near_and_far() {
        // At amount 1 the transform is an exact circle inversion: a pixel
        // just inside the default radius samples from just outside it.
        let src = gradient(16, 16);
        let mut effect = PolarInversionEffect::new();
        effect.data.set_amount(1.0);
        let mut dst = Surface::new(16, 16);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        // Center is a fixed point of the mapping.
        assert_eq!(dst.get(8, 8), src.get(8, 8));
        // (12, 8) sits at distance 4 from the center with radius 8, so it
        // samples from (24, 8), which mirrors across the right edge to (8, 8).
        assert_eq!(dst.get(12, 8), src.get(8, 8));
    }

    #[test]
    fn reflect_keeps_opaque_coverage() {
        let src = Surface::new_filled(12, 12, ColorBgra::from_bgr(30, 60, 90));
        let mut effect = PolarInversionEffect::new();
        effect.data.set_amount(-4.0);
        let mut dst = Surface::new(12, 12);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        for y in 0..12 {
            for x in 0..12 {
                assert_eq!(dst.get(x, y), src.get(x, y));
            }
        }
    }

    #[test]
    fn clamp_extends_the_border() {
        let mut src = Surface::new_filled(8, 8, ColorBgra::WHITE);
        // Distinct border column so an out-of-range sample is visible.
        for y in 0..8 {
            src.put(7, y, ColorBgra::from_bgr(1, 2, 3));
        }
        let mut effect = PolarInversionEffect::new();
        effect.data.set_amount(1.0);
        effect.data.set_edge_behavior(EdgeBehavior::Clamp);
        let mut dst = Surface::new(8, 8);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        // (5, 4) is at distance 1 from the center; inversion sends it to
        // distance 16, far past the right edge, so it clamps to the border.
        assert_eq!(dst.get(5, 4), src.get(7, 4));
    }

    #[test]
    fn amount_setter_clamps_and_signals() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let fired = Arc::new(AtomicUsize::new(0));
        let mut data = PolarInversionData::default();
        let counter = fired.clone();
        data.on_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        data.set_amount(9.0);
        assert_eq!(data.amount(), 4.0);
        data.set_amount(9.0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
