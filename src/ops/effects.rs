// ============================================================================
// EFFECT ENGINE — region-of-interest dispatch, configuration, parallel driver
// ============================================================================

use std::any::Any;

use rayon::prelude::*;

use crate::color::ColorBgra;
use crate::error::{Error, Result};
use crate::rect::RectI;
use crate::surface::{Surface, SurfaceMut};

// ============================================================================
// EFFECT DATA — cloneable parameter records with change notification
// ============================================================================

/// Subscriber list fired once per committed field mutation.
///
/// Used by data records to drive live preview.  Deliberately not `Clone`:
/// a preview clone of a config starts with no listeners.
#[derive(Default)]
pub struct ChangeSignal {
    listeners: Vec<Box<dyn Fn() + Send + Sync>>,
}

impl ChangeSignal {
    pub fn connect(&mut self, listener: impl Fn() + Send + Sync + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&self) {
        for listener in &self.listeners {
            listener();
        }
    }
}

impl std::fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ChangeSignal({} listeners)", self.listeners.len())
    }
}

/// The user-configurable data record an effect renders from.
///
/// `is_default` reports whether the current values leave the image
/// untouched, letting callers skip a redundant render.  The `Any` plumbing
/// lets a dialog host downcast to the concrete record it is editing.
pub trait EffectData: Any + Send + Sync {
    /// True when rendering with these values would not modify the image.
    fn is_default(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The narrow seam to the UI collaborator: runs the standard parameter
/// dialog for an effect's data record and reports whether the user accepted.
pub trait Chrome {
    fn run_simple_dialog(&mut self, title: &str, data: &mut dyn EffectData) -> bool;
}

// ============================================================================
// EFFECT TRAIT — overridable render granularity
// ============================================================================

/// A raster effect rendered over one or more regions of interest.
///
/// Four entry points, coarse to fine: `render` (whole call), `render_rect`
/// (one region), `render_row` (one scanline span), `render_pixel`.  Each
/// default forwards to the next finer level, so an implementation only
/// supplying `render_pixel` gets correct region and row behavior for free;
/// the coarser overloads exist purely as faster paths.
///
/// `src` must never be written; all writes land inside the supplied regions
/// of `dst` and depend only on `src`, which keeps overlapping regions
/// conflict-free.
pub trait Effect: Send + Sync {
    fn name(&self) -> &str;

    /// Icon resource name for menus and the history pad.
    fn icon(&self) -> &str {
        "effects-default"
    }

    fn menu_category(&self) -> &str {
        "General"
    }

    fn is_configurable(&self) -> bool {
        false
    }

    /// Run the effect's configuration dialog through `chrome`, returning
    /// whether the user accepted.  The outcome is reported exactly once per
    /// dialog close.  Calling this on a non-configurable effect is a
    /// programming error and fails loudly.
    fn launch_configuration(&mut self, _chrome: &mut dyn Chrome) -> Result<bool> {
        Err(Error::NotConfigurable(self.name().to_string()))
    }

    /// True when the current configuration would not modify the image.
    fn is_no_op(&self) -> bool {
        false
    }

    /// Deep copy for live preview: background rendering works from the
    /// clone while the UI keeps mutating the original's data record.
    fn boxed_clone(&self) -> Box<dyn Effect>;

    /// Render every region of interest.  Regions are clipped against the
    /// source and destination bounds; empty regions are skipped.
    fn render(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rois: &[RectI]) {
        let clip = src.bounds().intersect(dst.bounds());
        for roi in rois {
            let rect = roi.intersect(clip);
            if !rect.is_empty() {
                self.render_rect(src, dst, rect);
            }
        }
    }

    /// Render one non-empty region, already clipped to bounds.
    fn render_rect(&self, src: &Surface, dst: &mut SurfaceMut<'_>, rect: RectI) {
        for y in rect.top()..=rect.bottom() {
            let src_row = src.row_span(rect.left(), y, rect.width);
            let dst_row = dst.row_span_mut(rect.left(), y, rect.width);
            self.render_row(src_row, dst_row);
        }
    }

    /// Render one scanline span.
    fn render_row(&self, src_row: &[ColorBgra], dst_row: &mut [ColorBgra]) {
        for (src, dst) in src_row.iter().zip(dst_row.iter_mut()) {
            *dst = self.render_pixel(*src);
        }
    }

    /// Render a single pixel.  Defaults to the identity transform.
    fn render_pixel(&self, color: ColorBgra) -> ColorBgra {
        color
    }
}

// ============================================================================
// RENDER DRIVERS
// ============================================================================

/// Render sequentially into an owned destination surface.
pub fn render_effect(effect: &dyn Effect, src: &Surface, dst: &mut Surface, rois: &[RectI]) {
    effect.render(src, &mut dst.view_mut(), rois);
}

/// Render with one rayon task per destination row band.
///
/// Each worker receives a banded view of `dst` and the full region list;
/// clipping against the band bounds confines its writes to its own rows
/// while `src` is read freely.  Row-restarting effects (all of the windowed
/// algorithms rebuild their state per scanline) lose nothing to the split.
pub fn render_in_parallel(effect: &dyn Effect, src: &Surface, dst: &mut Surface, rois: &[RectI]) {
    let width = dst.width();
    if width <= 0 || dst.height() <= 0 {
        return;
    }
    dst.pixels_mut()
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            let mut band = SurfaceMut::from_rows(row, width, y as i32, 1);
            effect.render(src, &mut band, rois);
        });
}
