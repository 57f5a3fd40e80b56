// ============================================================================
// ADJUSTMENTS — per-pixel color corrections (curves, levels, simple ops)
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::color::ColorBgra;
use crate::error::{Error, Result};
use crate::ops::effects::{ChangeSignal, Chrome, Effect, EffectData};
use crate::ops::pixel_ops::{
    Desaturate, HueSaturationLightness, Invert, Level, UnaryPixelOp, render_unary,
};
use crate::ops::spline::SplineInterpolator;
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

// ============================================================================
// CURVES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveMode {
    Rgb,
    Luminosity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveChannel {
    Red,
    Green,
    Blue,
}

fn default_points() -> BTreeMap<i32, i32> {
    BTreeMap::from([(0, 0), (255, 255)])
}

fn is_identity(points: &BTreeMap<i32, i32>) -> bool {
    points.len() == 2 && points.get(&0) == Some(&0) && points.get(&255) == Some(&255)
}

/// Tone curve control points.
///
/// Each mode keeps an independent set of control points: one curve in
/// luminosity mode, one per channel in RGB mode. Switching modes swaps to
/// the other set without discarding either. The endpoints at x = 0 and
/// x = 255 always exist and cannot be removed.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurvesData {
    mode: CurveMode,
    luminosity: BTreeMap<i32, i32>,
    red: BTreeMap<i32, i32>,
    green: BTreeMap<i32, i32>,
    blue: BTreeMap<i32, i32>,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for CurvesData {
    fn default() -> Self {
        Self {
            mode: CurveMode::Luminosity,
            luminosity: default_points(),
            red: default_points(),
            green: default_points(),
            blue: default_points(),
            changed: ChangeSignal::default(),
        }
    }
}

impl Clone for CurvesData {
    fn clone(&self) -> Self {
        Self {
            mode: self.mode,
            luminosity: self.luminosity.clone(),
            red: self.red.clone(),
            green: self.green.clone(),
            blue: self.blue.clone(),
            changed: ChangeSignal::default(),
        }
    }
}

impl CurvesData {
    pub fn mode(&self) -> CurveMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: CurveMode) {
        if mode != self.mode {
            self.mode = mode;
            self.changed.emit();
        }
    }

    pub fn luminosity_points(&self) -> &BTreeMap<i32, i32> {
        &self.luminosity
    }

    pub fn channel_points(&self, channel: CurveChannel) -> &BTreeMap<i32, i32> {
        match channel {
            CurveChannel::Red => &self.red,
            CurveChannel::Green => &self.green,
            CurveChannel::Blue => &self.blue,
        }
    }

    fn points_mut(&mut self, channel: Option<CurveChannel>) -> &mut BTreeMap<i32, i32> {
        match channel {
            None => &mut self.luminosity,
            Some(CurveChannel::Red) => &mut self.red,
            Some(CurveChannel::Green) => &mut self.green,
            Some(CurveChannel::Blue) => &mut self.blue,
        }
    }

    /// Add or move a control point. `channel` is `None` for the
    /// luminosity curve.
    pub fn set_point(&mut self, channel: Option<CurveChannel>, x: i32, y: i32) -> Result<()> {
        if !(0..=255).contains(&x) || !(0..=255).contains(&y) {
            return Err(Error::InvalidConfig(format!(
                "curve point ({x}, {y}) outside byte range"
            )));
        }
        let points = self.points_mut(channel);
        if points.insert(x, y) != Some(y) {
            self.changed.emit();
        }
        Ok(())
    }

    /// Remove a control point. The endpoints are not removable.
    pub fn remove_point(&mut self, channel: Option<CurveChannel>, x: i32) -> Result<()> {
        if x == 0 || x == 255 {
            return Err(Error::InvalidConfig(format!(
                "curve endpoint at x = {x} cannot be removed"
            )));
        }
        if self.points_mut(channel).remove(&x).is_some() {
            self.changed.emit();
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.luminosity = default_points();
        self.red = default_points();
        self.green = default_points();
        self.blue = default_points();
        self.changed.emit();
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for CurvesData {
    fn is_default(&self) -> bool {
        match self.mode {
            CurveMode::Luminosity => is_identity(&self.luminosity),
            CurveMode::Rgb => {
                is_identity(&self.red) && is_identity(&self.green) && is_identity(&self.blue)
            }
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Sample a control-point set into a 256-entry byte lookup table via a
/// natural cubic spline.
fn build_curve_lut(points: &BTreeMap<i32, i32>) -> [u8; 256] {
    let mut spline = SplineInterpolator::new();
    for (&x, &y) in points {
        spline.add(x as f64, y as f64);
    }
    let mut lut = [0u8; 256];
    for (i, entry) in lut.iter_mut().enumerate() {
        *entry = spline.interpolate(i as f64).round().clamp(0.0, 255.0) as u8;
    }
    lut
}

/// Shifts all channels by the luminance delta the curve prescribes.
struct LuminosityCurve {
    lut: [u8; 256],
}

impl UnaryPixelOp for LuminosityCurve {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        let lum = color.intensity_byte();
        let diff = self.lut[lum as usize] as i32 - lum as i32;
        ColorBgra::from_bgra_clamped(
            color.b as i64 + diff as i64,
            color.g as i64 + diff as i64,
            color.r as i64 + diff as i64,
            color.a as i64,
        )
    }
}

/// Maps each channel through its own lookup table.
struct ChannelCurves {
    red: [u8; 256],
    green: [u8; 256],
    blue: [u8; 256],
}

impl UnaryPixelOp for ChannelCurves {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        ColorBgra::from_bgra(
            self.blue[color.b as usize],
            self.green[color.g as usize],
            self.red[color.r as usize],
            color.a,
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurvesEffect {
    pub data: CurvesData,
}

impl CurvesEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for CurvesEffect {
    fn name(&self) -> &str {
        "Curves"
    }

    fn icon(&self) -> &str {
        "adjustment-curves"
    }

    fn menu_category(&self) -> &str {
        "Adjustments"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Curves", &mut self.data))
    }

    fn is_no_op(&self) -> bool {
        self.data.is_default()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        match self.data.mode() {
            CurveMode::Luminosity => {
                let op = LuminosityCurve { lut: build_curve_lut(self.data.luminosity_points()) };
                render_unary(&op, src, dst, rect);
            }
            CurveMode::Rgb => {
                let op = ChannelCurves {
                    red: build_curve_lut(self.data.channel_points(CurveChannel::Red)),
                    green: build_curve_lut(self.data.channel_points(CurveChannel::Green)),
                    blue: build_curve_lut(self.data.channel_points(CurveChannel::Blue)),
                };
                render_unary(&op, src, dst, rect);
            }
        }
    }
}

// ============================================================================
// LEVELS
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct LevelsData {
    input_low: ColorBgra,
    input_high: ColorBgra,
    gamma: [f32; 3],
    output_low: ColorBgra,
    output_high: ColorBgra,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for LevelsData {
    fn default() -> Self {
        Self {
            input_low: ColorBgra::BLACK,
            input_high: ColorBgra::WHITE,
            gamma: [1.0, 1.0, 1.0],
            output_low: ColorBgra::BLACK,
            output_high: ColorBgra::WHITE,
            changed: ChangeSignal::default(),
        }
    }
}

impl Clone for LevelsData {
    fn clone(&self) -> Self {
        Self {
            input_low: self.input_low,
            input_high: self.input_high,
            gamma: self.gamma,
            output_low: self.output_low,
            output_high: self.output_high,
            changed: ChangeSignal::default(),
        }
    }
}

impl LevelsData {
    pub fn input_range(&self) -> (ColorBgra, ColorBgra) {
        (self.input_low, self.input_high)
    }

    pub fn output_range(&self) -> (ColorBgra, ColorBgra) {
        (self.output_low, self.output_high)
    }

    pub fn gamma(&self) -> [f32; 3] {
        self.gamma
    }

    pub fn set_input_range(&mut self, low: ColorBgra, high: ColorBgra) {
        if (low, high) != (self.input_low, self.input_high) {
            self.input_low = low;
            self.input_high = high;
            self.changed.emit();
        }
    }

    pub fn set_output_range(&mut self, low: ColorBgra, high: ColorBgra) {
        if (low, high) != (self.output_low, self.output_high) {
            self.output_low = low;
            self.output_high = high;
            self.changed.emit();
        }
    }

    /// Per-channel gamma as `[r, g, b]`, each clamped to 0.1..=10.0.
    pub fn set_gamma(&mut self, gamma: [f32; 3]) {
        let gamma = gamma.map(|g| g.clamp(0.1, 10.0));
        if gamma != self.gamma {
            self.gamma = gamma;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }

    fn to_op(&self) -> Level {
        Level::new(
            self.input_low,
            self.input_high,
            self.gamma,
            self.output_low,
            self.output_high,
        )
    }
}

impl EffectData for LevelsData {
    fn is_default(&self) -> bool {
        self.input_low == ColorBgra::BLACK
            && self.input_high == ColorBgra::WHITE
            && self.gamma == [1.0, 1.0, 1.0]
            && self.output_low == ColorBgra::BLACK
            && self.output_high == ColorBgra::WHITE
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct LevelsEffect {
    pub data: LevelsData,
}

impl LevelsEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for LevelsEffect {
    fn name(&self) -> &str {
        "Levels"
    }

    fn icon(&self) -> &str {
        "adjustment-levels"
    }

    fn menu_category(&self) -> &str {
        "Adjustments"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Levels", &mut self.data))
    }

    fn is_no_op(&self) -> bool {
        self.data.is_default()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let op = self.data.to_op();
        render_unary(&op, src, dst, rect);
    }
}

// ============================================================================
// HUE / SATURATION
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HueSaturationData {
    hue: i32,
    saturation: i32,
    lightness: i32,
    #[serde(skip)]
    changed: ChangeSignal,
}

impl Default for HueSaturationData {
    fn default() -> Self {
        Self { hue: 0, saturation: 100, lightness: 0, changed: ChangeSignal::default() }
    }
}

impl Clone for HueSaturationData {
    fn clone(&self) -> Self {
        Self {
            hue: self.hue,
            saturation: self.saturation,
            lightness: self.lightness,
            changed: ChangeSignal::default(),
        }
    }
}

impl HueSaturationData {
    pub fn hue(&self) -> i32 {
        self.hue
    }

    pub fn saturation(&self) -> i32 {
        self.saturation
    }

    pub fn lightness(&self) -> i32 {
        self.lightness
    }

    pub fn set_hue(&mut self, hue: i32) {
        let hue = hue.clamp(-180, 180);
        if hue != self.hue {
            self.hue = hue;
            self.changed.emit();
        }
    }

    pub fn set_saturation(&mut self, saturation: i32) {
        let saturation = saturation.clamp(0, 200);
        if saturation != self.saturation {
            self.saturation = saturation;
            self.changed.emit();
        }
    }

    pub fn set_lightness(&mut self, lightness: i32) {
        let lightness = lightness.clamp(-100, 100);
        if lightness != self.lightness {
            self.lightness = lightness;
            self.changed.emit();
        }
    }

    pub fn on_change(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.changed.connect(listener);
    }
}

impl EffectData for HueSaturationData {
    fn is_default(&self) -> bool {
        self.hue == 0 && self.saturation == 100 && self.lightness == 0
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct HueSaturationEffect {
    pub data: HueSaturationData,
}

impl HueSaturationEffect {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Effect for HueSaturationEffect {
    fn name(&self) -> &str {
        "Hue / Saturation"
    }

    fn icon(&self) -> &str {
        "adjustment-hue-saturation"
    }

    fn menu_category(&self) -> &str {
        "Adjustments"
    }

    fn is_configurable(&self) -> bool {
        true
    }

    fn launch_configuration(&mut self, chrome: &mut dyn Chrome) -> Result<bool> {
        Ok(chrome.run_simple_dialog("Hue / Saturation", &mut self.data))
    }

    fn is_no_op(&self) -> bool {
        self.data.is_default()
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let op = HueSaturationLightness::new(
            self.data.hue(),
            self.data.saturation(),
            self.data.lightness(),
        );
        render_unary(&op, src, dst, rect);
    }
}

// ============================================================================
// SIMPLE ADJUSTMENTS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BlackAndWhiteEffect;

impl Effect for BlackAndWhiteEffect {
    fn name(&self) -> &str {
        "Black and White"
    }

    fn icon(&self) -> &str {
        "adjustment-black-and-white"
    }

    fn menu_category(&self) -> &str {
        "Adjustments"
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        render_unary(&Desaturate, src, dst, rect);
    }
}

#[derive(Debug, Clone, Default)]
pub struct InvertColorsEffect;

impl Effect for InvertColorsEffect {
    fn name(&self) -> &str {
        "Invert Colors"
    }

    fn icon(&self) -> &str {
        "adjustment-invert"
    }

    fn menu_category(&self) -> &str {
        "Adjustments"
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        render_unary(&Invert, src, dst, rect);
    }
}

/// Desaturation followed by a warm-toned gamma remap.
#[derive(Debug, Clone, Default)]
pub struct SepiaEffect;

struct SepiaOp {
    level: Level,
}

impl UnaryPixelOp for SepiaOp {
    fn apply(&self, color: ColorBgra) -> ColorBgra {
        self.level.apply(Desaturate.apply(color))
    }
}

impl Effect for SepiaEffect {
    fn name(&self) -> &str {
        "Sepia"
    }

    fn icon(&self) -> &str {
        "adjustment-sepia"
    }

    fn menu_category(&self) -> &str {
        "Adjustments"
    }

    fn boxed_clone(&self) -> Box<dyn Effect> {
        Box::new(self.clone())
    }

    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        let op = SepiaOp {
            level: Level::new(
                ColorBgra::BLACK,
                ColorBgra::WHITE,
                [1.2, 1.0, 0.8],
                ColorBgra::BLACK,
                ColorBgra::WHITE,
            ),
        };
        render_unary(&op, src, dst, rect);
    }
}
