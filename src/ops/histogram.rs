// ============================================================================
// LOCAL HISTOGRAM — sliding-window channel histograms and the effects on them
// ============================================================================
//
// Maintains per-channel histograms over a square window of side 2*radius+1
// centered on each output pixel, clipped to the buffer. The window advances
// one pixel at a time along the scanline by adding the entering column and
// subtracting the leaving one, so the cost per pixel is O(window side), not
// O(window area).

use serde::{Deserialize, Serialize};

use crate::color::ColorBgra;
use crate::ops::effects::{ChangeSignal, Chrome, Effect, EffectData};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};
use crate::error::Result;

/// Consumes the window histograms of premultiplied channel values.
pub trait LocalHistogram: Send + Sync {
    fn window_radius(&self) -> i32;

    /// Derive the output pixel from the histograms of the window around it.
    /// `area` is the clipped window pixel count; each histogram sums to it.
    fn apply(
        &self,
        src: ColorBgra,
        area: i32,
        hb: &[i32; 256],
        hg: &[i32; 256],
        hr: &[i32; 256],
        ha: &[i32; 256],
    ) -> ColorBgra;
}

/// Alpha-weighted variant: color histograms bucket straight-alpha channel
/// values, each sample counted with weight `alpha`; `sum` is the running
/// total of alpha over the window.
pub trait LocalHistogramAlpha: Send + Sync {
    fn window_radius(&self) -> i32;

    fn apply_with_alpha(
        &self,
        src: ColorBgra,
        area: i32,
        sum: i32,
        hb: &[i32; 256],
        hg: &[i32; 256],
        hr: &[i32; 256],
    ) -> ColorBgra;
}

/// Value below which `fraction` percent of the window's samples fall.
fn channel_percentile(fraction: i32, area: i32, hist: &[i32; 256]) -> u8 {
    let min_count = area * fraction / 100;
    let mut value = 0usize;
    let mut count = 0;
    while value < 255 && count < min_count {
        count += hist[value];
        value += 1;
    }
    value as u8
}

fn percentile_color(
    fraction: i32,
    area: i32,
    hb: &[i32; 256],
    hg: &[i32; 256],
    hr: &[i32; 256],
    ha: &[i32; 256],
) -> ColorBgra {
    ColorBgra::from_bgra(
        channel_percentile(fraction, area, hb),
        channel_percentile(fraction, area, hg),
        channel_percentile(fraction, area, hr),
        channel_percentile(fraction, area, ha),
    )
}

// ============================================================================
// SLIDING-WINDOW RENDERERS
// ============================================================================

struct Histograms {
    hb: [i32; 256],
    hg: [i32; 256],
    hr: [i32; 256],
    ha: [i32; 256],
    sum: i32,
}

impl Histograms {
    fn new() -> Self {
        Self { hb: [0; 256], hg: [0; 256], hr: [0; 256], ha: [0; 256], sum: 0 }
    }

    fn reset(&mut self) {
        self.hb = [0; 256];
        self.hg = [0; 256];
        self.hr = [0; 256];
        self.ha = [0; 256];
        self.sum = 0;
    }

    /// Add (`sign` = 1) or remove (`sign` = -1) one window column of raw
    /// premultiplied samples.
    fn shift_column(&mut self, src: &Surface, x: i32, top: i32, bottom: i32, sign: i32) {
        for y in top..=bottom {
            let c = src.get(x, y);
            self.hb[c.b as usize] += sign;
            self.hg[c.g as usize] += sign;
            self.hr[c.r as usize] += sign;
            self.ha[c.a as usize] += sign;
        }
    }

    /// Alpha-weighted column shift: straight-alpha channel values bucketed
    /// with weight `alpha`.
    fn shift_column_weighted(&mut self, src: &Surface, x: i32, top: i32, bottom: i32, sign: i32) {
        for y in top..=bottom {
            let c = src.get(x, y);
            let s = c.to_straight_alpha();
            let w = sign * c.a as i32;
            self.hb[s.b as usize] += w;
            self.hg[s.g as usize] += w;
            self.hr[s.r as usize] += w;
            self.sum += w;
        }
    }
}

/// Window geometry for one output pixel: clipped column span and row span.
fn window_rows(y: i32, radius: i32, height: i32) -> (i32, i32) {
    ((y - radius).max(0), (y + radius).min(height - 1))
}

pub fn render_histogram_rect(
    op: &dyn LocalHistogram,
    src: &Surface,
    dst: &mut SurfaceMut<'_>,
    rect: RectI,
) {
    let radius = op.window_radius();
    let width = src.width();
    let height = src.height();
    let mut hist = Histograms::new();

    for y in rect.top()..=rect.bottom() {
        let (top, bottom) = window_rows(y, radius, height);
        let rows = bottom - top + 1;
        hist.reset();
        let mut area = 0;

        let first = rect.left();
        for wx in (first - radius).max(0)..=(first + radius).min(width - 1) {
            hist.shift_column(src, wx, top, bottom, 1);
            area += rows;
        }
        dst.put(first, y, op.apply(src.get(first, y), area, &hist.hb, &hist.hg, &hist.hr, &hist.ha));

        for x in first + 1..=rect.right() {
            let leaving = x - radius - 1;
            if leaving >= 0 {
                hist.shift_column(src, leaving, top, bottom, -1);
                area -= rows;
            }
            let entering = x + radius;
            if entering < width {
                hist.shift_column(src, entering, top, bottom, 1);
                area += rows;
            }
            dst.put(x, y, op.apply(src.get(x, y), area, &hist.hb, &hist.hg, &hist.hr, &hist.ha));
        }
    }
}

pub fn render_histogram_rect_with_alpha(
    op: &dyn LocalHistogramAlpha,
    src: &Surface,
    dst: &mut SurfaceMut<'_>,
    rect: RectI,
) {
    let radius = op.window_radius();
    let width = src.width();
    let height = src.height();
    let mut hist = Histograms::new();

    for y in rect.top()..=rect.bottom() {
        let (top, bottom) = window_rows(y, radius, height);
        let rows = bottom - top + 1;
        hist.reset();
        let mut area = 0;

        let first = rect.left();
        for wx in (first - radius).max(0)..=(first + radius).min(width - 1) {
            hist.shift_column_weighted(src, wx, top, bottom, 1);
            area += rows;
        }
        dst.put(
            first,
            y,
            op.apply_with_alpha(src.get(first, y), area, hist.sum, &hist.hb, &hist.hg, &hist.hr),
        );

        for x in first + 1..=rect.right() {
            let leaving = x - radius - 1;
            if leaving >= 0 {
                hist.shift_column_weighted(src, leaving, top, bottom, -1);
                area -= rows;
            }
            let entering = x + radius;
            if entering < width {
                hist.shift_column_weighted(src, entering, top, bottom, 1);
                area += rows;
            }
            dst.put(
                x,
                y,
                op.apply_with_alpha(src.get(x, y), area, hist.sum, &hist.hb, &hist.hg, &hist.hr),
            );
        }
    }
}

// ============================================================================
// SHARPEN
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SharpenData {
    amount: i32,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for SharpenData {
    fn default() -> Self {
        Self { amount: 2, changed: ChangeSignal::default() }
    }
}

impl Clone for SharpenData {
    fn clone(&self) -> Self {
        Self { amount: self.amount, changed: ChangeSignal::default() }
    }
}

impl SharpenData {
    pub fn amount(&self) -> i32 {
        self.amount
    }

    /// Window radius, clamped to 1..=20.
    pub fn set_amount(&mut self, amount: i32) {
        let amount = amount.clamp(1, 20);
        if amount != self.amount {
            self.amount = amount;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for SharpenData {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Pushes each pixel away from its local median.
#[derive(Debug, Clone, Default)]
pub struct SharpenEffect {
    pub data: SharpenData,
}

impl SharpenEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

struct SharpenOp {
    radius: i32,
}

impl LocalHistogram for SharpenOp {
    fn window_radius(&self) -> i32 {
        self.radius
    }

    fn apply(
        &self,
        src: ColorBgra,
        area: i32,
        hb: &[i32; 256],
        hg: &[i32; 256],
        hr: &[i32; 256],
        ha: &[i32; 256],
    ) -> ColorBgra {
        let median = percentile_color(50, area, hb, hg, hr, ha);
        src.lerp(median, -0.5)
    }
}

impl Effect for SharpenEffect {
    fn name(&self) -> &str {
        "Sharpen"
    }

    fn icon(&self) -> &str {
        "effect-sharpen"
    }

    fn menu_category(&self) -> &str {
        "Photo"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Sharpen", &mut self.data))
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let op = SharpenOp { radius: self.data.amount() };
        render_histogram_rect(&op, src, dst, rect);
    }
}

// ============================================================================
// UNFOCUS
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct UnfocusData {
    radius: i32,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for UnfocusData {
    fn default() -> Self {
        Self { radius: 4, changed: ChangeSignal::default() }
    }
}

impl Clone for UnfocusData {
    fn clone(&self) -> Self {
        Self { radius: self.radius, changed: ChangeSignal::default() }
    }
}

impl UnfocusData {
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

impl EffectData for UnfocusData {
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

/// Box blur via the alpha-weighted window mean.
#[derive(Debug, Clone, Default)]
pub struct UnfocusEffect {
    pub data: UnfocusData,
}

impl UnfocusEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

struct UnfocusOp {
    radius: i32,
}

impl LocalHistogramAlpha for UnfocusOp {
    fn window_radius(&self) -> i32 {
        self.radius
    }

    fn apply_with_alpha(
        &self,
        _src: ColorBgra,
        area: i32,
        sum: i32,
        hb: &[i32; 256],
        hg: &[i32; 256],
        hr: &[i32; 256],
    ) -> ColorBgra {
        // A bucket can hold up to area * 255 weight, so the weighted sum
        // can reach area * 255 * 255. Widen once that exceeds i32 range.
        if (area as i64) * 255 * 255 <= i32::MAX as i64 {
            let mut b = 0i32;
            let mut g = 0i32;
            let mut r = 0i32;
            for i in 1..256 {
                b += i as i32 * hb[i];
                g += i as i32 * hg[i];
                r += i as i32 * hr[i];
            }
            let alpha = sum / area;
            let div = area * 255;
            ColorBgra::from_bgra_clamped(
                (b / div) as i64,
                (g / div) as i64,
                (r / div) as i64,
                alpha as i64,
            )
        } else {
            let mut b = 0i64;
            let mut g = 0i64;
            let mut r = 0i64;
            for i in 1..256 {
                b += i as i64 * hb[i] as i64;
                g += i as i64 * hg[i] as i64;
                r += i as i64 * hr[i] as i64;
            }
            let alpha = sum as i64 / area as i64;
            let div = area as i64 * 255;
            ColorBgra::from_bgra_clamped(b / div, g / div, r / div, alpha)
        }
    }
}

impl Effect for UnfocusEffect {
    fn name(&self) -> &str {
        "Unfocus"
    }

    fn icon(&self) -> &str {
        "effect-unfocus"
    }

    fn menu_category(&self) -> &str {
        "Blurs"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Unfocus", &mut self.data))
    }

    fn is_no_op(&self) -> bool {
        self.data.is_default()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        if self.data.radius() == 0 {
            dst.copy_rect_from(src, rect);
            return;
        }
        let op = UnfocusOp { radius: self.data.radius() };
        render_histogram_rect_with_alpha(&op, src, dst, rect);
    }
}

// ============================================================================
// REDUCE NOISE
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ReduceNoiseData {
    radius: i32,
    strength: f64,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for ReduceNoiseData {
    fn default() -> Self {
        Self { radius: 6, strength: 0.4, changed: ChangeSignal::default() }
    }
}

impl Clone for ReduceNoiseData {
    fn clone(&self) -> Self {
        Self { radius: self.radius, strength: self.strength, changed: ChangeSignal::default() }
    }
}

impl ReduceNoiseData {
    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn strength(&self) -> f64 {
        self.strength
    }

    pub fn set_radius(&mut self, radius: i32) {
        let radius = radius.clamp(1, 200);
        if radius != self.radius {
            self.radius = radius;
            self.changed.emit();
        }
    }

    pub fn set_strength(&mut self, strength: f64) {
        let strength = strength.clamp(0.0, 1.0);
        if strength != self.strength {
            self.strength = strength;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for ReduceNoiseData {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Pulls each pixel toward the normalized rank of its own value within the
/// window, weighted down in bright regions where noise is less visible.
#[derive(Debug, Clone, Default)]
pub struct ReduceNoiseEffect {
    pub data: ReduceNoiseData,
}

impl ReduceNoiseEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

struct ReduceNoiseOp {
    radius: i32,
    strength: f64,
}

fn rank_of_color(
    color: ColorBgra,
    area: i32,
    hb: &[i32; 256],
    hg: &[i32; 256],
    hr: &[i32; 256],
) -> ColorBgra {
    let mut bc = 0i64;
    let mut gc = 0i64;
    let mut rc = 0i64;
    for i in 0..color.b as usize {
        bc += hb[i] as i64;
    }
    for i in 0..color.g as usize {
        gc += hg[i] as i64;
    }
    for i in 0..color.r as usize {
        rc += hr[i] as i64;
    }
    ColorBgra::from_bgr(
        (bc * 255 / area as i64) as u8,
        (gc * 255 / area as i64) as u8,
        (rc * 255 / area as i64) as u8,
    )
}

impl LocalHistogram for ReduceNoiseOp {
    fn window_radius(&self) -> i32 {
        self.radius
    }

    fn apply(
        &self,
        src: ColorBgra,
        area: i32,
        hb: &[i32; 256],
        hg: &[i32; 256],
        hr: &[i32; 256],
        _ha: &[i32; 256],
    ) -> ColorBgra {
        let normalized = rank_of_color(src, area, hb, hg, hr);
        let frac = self.strength * (1.0 - 0.75 * src.intensity() as f64);
        src.lerp(normalized, frac as f32)
    }
}

impl Effect for ReduceNoiseEffect {
    fn name(&self) -> &str {
        "Reduce Noise"
    }

    fn icon(&self) -> &str {
        "effect-reduce-noise"
    }

    fn menu_category(&self) -> &str {
        "Noise"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Reduce Noise", &mut self.data))
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let op = ReduceNoiseOp {
            radius: self.data.radius(),
            strength: -0.2 * self.data.strength(),
        };
        render_histogram_rect(&op, src, dst, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::effects::render_effect;

    /// Asserts the histogram invariant and copies the source through.
    struct AreaProbe {
        radius: i32,
    }

    impl LocalHistogram for AreaProbe {
        fn window_radius(&self) -> i32 {
            self.radius
        }

        fn apply(
            &self,
            src: ColorBgra,
            area: i32,
            hb: &[i32; 256],
            hg: &[i32; 256],
            hr: &[i32; 256],
            ha: &[i32; 256],
        ) -> ColorBgra {
            for hist in [hb, hg, hr, ha] {
                assert_eq!(hist.iter().sum::<i32>(), area);
            }
            assert!(area > 0);
            src
        }
    }

    #[test]
    fn bucket_counts_match_clipped_area_everywhere() {
        let mut src = Surface::new(9, 7);
        for y in 0..7 {
            for x in 0..9 {
                src.put(x, y, ColorBgra::from_bgr((x * 28) as u8, (y * 36) as u8, 99));
            }
        }
        let mut dst = Surface::new(9, 7);
        let probe = AreaProbe { radius: 3 };
        render_histogram_rect(&probe, &src, &mut dst.view_mut(), src.bounds());
        assert_eq!(src, dst);
    }

    #[test]
    fn corner_window_area_is_clipped() {
        // radius 2 at (0, 0) of a 5x5 buffer: 3x3 window.
        struct CornerProbe;
        impl LocalHistogram for CornerProbe {
            fn window_radius(&self) -> i32 {
                2
            }
            fn apply(
                &self,
                src: ColorBgra,
                area: i32,
                _: &[i32; 256],
                _: &[i32; 256],
                _: &[i32; 256],
                _: &[i32; 256],
            ) -> ColorBgra {
                if src.b == 1 {
                    assert_eq!(area, 9);
                }
                src
            }
        }
        let mut src = Surface::new_filled(5, 5, ColorBgra::BLACK);
        src.put(0, 0, ColorBgra::from_bgr(1, 0, 0));
        let mut dst = Surface::new(5, 5);
        render_histogram_rect(&CornerProbe, &src, &mut dst.view_mut(), src.bounds());
    }

    #[test]
    fn unfocus_on_uniform_opaque_color_is_identity() {
        let color = ColorBgra::from_bgr(40, 90, 200);
        let src = Surface::new_filled(8, 8, color);
        let mut dst = Surface::new(8, 8);
        let mut effect = UnfocusEffect::new();
        effect.data.set_radius(3);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        assert_eq!(src, dst);
    }

    #[test]
    fn unfocus_radius_zero_copies_source() {
        let mut src = Surface::new(4, 4);
        src.put(2, 1, ColorBgra::from_bgr(10, 20, 30));
        let mut dst = Surface::new(4, 4);
        let effect = UnfocusEffect::new();
        assert!(effect.is_no_op());
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        assert_eq!(src, dst);
    }

    #[test]
    fn unfocus_spreads_an_isolated_bright_pixel() {
        let mut src = Surface::new_filled(9, 9, ColorBgra::BLACK);
        src.put(4, 4, ColorBgra::WHITE);
        let mut dst = Surface::new(9, 9);
        let mut effect = UnfocusEffect::new();
        effect.data.set_radius(2);
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        // Neighbor within the window picks up some of the white.
        assert!(dst.get(3, 4).g > 0);
        // Far corner's window never sees the bright pixel.
        assert_eq!(dst.get(0, 0), ColorBgra::BLACK);
    }

    #[test]
    fn sharpen_leaves_uniform_regions_untouched() {
        let color = ColorBgra::from_bgr(77, 123, 5);
        let src = Surface::new_filled(6, 6, color);
        let mut dst = Surface::new(6, 6);
        let effect = SharpenEffect::new();
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        assert_eq!(src, dst);
    }

    #[test]
    fn sharpen_increases_local_contrast_at_an_edge() {
        let mut src = Surface::new(8, 4);
        for y in 0..4 {
            for x in 0..8 {
                let v = if x < 4 { 64 } else { 192 };
                src.put(x, y, ColorBgra::from_bgr(v, v, v));
            }
        }
        let mut dst = Surface::new(8, 4);
        let effect = SharpenEffect::new();
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);

        // The dark side of the edge gets darker, the bright side brighter.
        assert!(dst.get(3, 2).g <= 64);
        assert!(dst.get(4, 2).g >= 192);
    }

    #[test]
    fn reduce_noise_keeps_uniform_regions_stable() {
        let color = ColorBgra::from_bgr(120, 120, 120);
        let src = Surface::new_filled(7, 7, color);
        let mut dst = Surface::new(7, 7);
        let effect = ReduceNoiseEffect::new();
        render_effect(&effect, &src, &mut dst, &[src.bounds()]);
        for y in 0..7 {
            for x in 0..7 {
                let c = dst.get(x, y);
                assert!((c.g as i32 - 120).abs() <= 12);
                assert_eq!(c.a, 255);
            }
        }
    }

    #[test]
    fn reduce_noise_lives_in_the_noise_menu() {
        let effect = ReduceNoiseEffect::new();
        assert_eq!(effect.menu_category(), "Noise");
    }

    #[test]
    fn data_setters_clamp_and_signal_once_per_change() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        let fired = Arc::new(AtomicUsize::new(0));
        let mut data = UnfocusData::default();
        let counter = fired.clone();
        data.on_change(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        data.set_radius(10);
        data.set_radius(10);
        data.set_radius(500);
        assert_eq!(data.radius(), 200);
        assert_eq!(fired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn preview_clone_drops_listeners() {
        let mut data = SharpenData::default();
        data.on_change(|| panic!("listener leaked into clone"));
        let mut copy = data.clone();
        copy.set_amount(9);
        assert_eq!(copy.amount(), 9);
    }
}
