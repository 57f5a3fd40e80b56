// ============================================================================
// SURFACE DIFF — compact reversible encoding of the changed region
// ============================================================================

use rayon::prelude::*;

use crate::color::ColorBgra;
use crate::error::{Error, Result};
use crate::rect::RectI;
use crate::surface::Surface;

/// Give up on a diff when it would save less than this fraction of a full
/// snapshot's pixels.
const MINIMUM_SAVINGS_PERCENT: i64 = 10;

/// The difference between two equally-sized surfaces, stored as a change
/// mask over the bounding rectangle plus the packed original values of the
/// changed pixels.
///
/// `apply_and_swap` is an involution: applied to a surface in the "after"
/// state it restores "before" while the stored pixels flip to "after", so
/// applying it again returns to where it started. This is what lets one
/// diff serve both undo and redo.
#[derive(Debug, Clone)]
pub struct SurfaceDiff {
    bounds: RectI,
    mask: Vec<bool>,
    pixels: Vec<ColorBgra>,
}

impl SurfaceDiff {
    /// Compare `before` and `after` and encode the difference.
    ///
    /// Returns `Ok(None)` when too much of the surface changed for a diff
    /// to beat a plain snapshot; the caller falls back to keeping a copy.
    pub fn create(before: &Surface, after: &Surface) -> Result<Option<SurfaceDiff>> {
        if before.width() != after.width() || before.height() != after.height() {
            return Err(Error::SizeMismatch(
                before.width(),
                before.height(),
                after.width(),
                after.height(),
            ));
        }

        let width = before.width();
        let bounds = changed_bounds(before, after);
        if bounds.is_empty() {
            return Ok(Some(SurfaceDiff { bounds, mask: Vec::new(), pixels: Vec::new() }));
        }

        let total = before.bounds().area();
        let savings = 100 - bounds.area() * 100 / total;
        if savings < MINIMUM_SAVINGS_PERCENT {
            log::debug!(
                "diff covers {}% of the surface, falling back to snapshot",
                100 - savings
            );
            return Ok(None);
        }

        let mut mask = vec![false; bounds.area() as usize];
        let mut pixels = Vec::new();
        let mut idx = 0usize;
        for y in bounds.top()..=bounds.bottom() {
            let row_start = (y * width + bounds.left()) as usize;
            let before_row = &before.pixels()[row_start..row_start + bounds.width as usize];
            let after_row = &after.pixels()[row_start..row_start + bounds.width as usize];
            for (b, a) in before_row.iter().zip(after_row) {
                if b != a {
                    mask[idx] = true;
                    pixels.push(*b);
                }
                idx += 1;
            }
        }

        Ok(Some(SurfaceDiff { bounds, mask, pixels }))
    }

    /// Bounding rectangle of every changed pixel, for minimal redraw.
    pub fn bounds(&self) -> RectI {
        self.bounds
    }

    /// Swap the stored pixels with the surface's, flipping both between
    /// their "before" and "after" states in place.
    pub fn apply_and_swap(&mut self, surface: &mut Surface) -> Result<()> {
        let width = surface.width();
        if !self.bounds.is_empty() && surface.bounds().intersect(self.bounds) != self.bounds {
            return Err(Error::SizeMismatch(
                surface.width(),
                surface.height(),
                self.bounds.width,
                self.bounds.height,
            ));
        }

        let data = surface.pixels_mut();
        let mut mask_idx = 0usize;
        let mut pix_idx = 0usize;
        for y in self.bounds.top()..=self.bounds.bottom() {
            let row_start = (y * width + self.bounds.left()) as usize;
            for x in 0..self.bounds.width as usize {
                if self.mask[mask_idx] {
                    std::mem::swap(&mut self.pixels[pix_idx], &mut data[row_start + x]);
                    pix_idx += 1;
                }
                mask_idx += 1;
            }
        }
        Ok(())
    }

    pub fn memory_bytes(&self) -> usize {
        self.mask.len() + self.pixels.len() * std::mem::size_of::<ColorBgra>()
    }
}

/// Minimal rectangle enclosing every differing pixel, scanned row-parallel.
fn changed_bounds(before: &Surface, after: &Surface) -> RectI {
    let width = before.width() as usize;
    if width == 0 {
        return RectI::empty();
    }

    let spans: Vec<Option<(i32, i32)>> = before
        .pixels()
        .par_chunks(width)
        .zip(after.pixels().par_chunks(width))
        .map(|(b_row, a_row)| {
            let mut span: Option<(i32, i32)> = None;
            for (x, (b, a)) in b_row.iter().zip(a_row).enumerate() {
                if b != a {
                    let x = x as i32;
                    span = Some(match span {
                        None => (x, x),
                        Some((lo, hi)) => (lo.min(x), hi.max(x)),
                    });
                }
            }
            span
        })
        .collect();

    let mut bounds = RectI::empty();
    for (y, span) in spans.into_iter().enumerate() {
        if let Some((lo, hi)) = span {
            let row = RectI::new(lo, y as i32, hi - lo + 1, 1);
            bounds = bounds.union(row);
        }
    }
    bounds
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: i32, height: i32) -> Surface {
        let mut s = Surface::new(width, height);
        for y in 0..height {
            for x in 0..width {
                s.put(x, y, ColorBgra::from_bgr((x * 7) as u8, (y * 11) as u8, 42));
            }
        }
        s
    }

    #[test]
    fn identical_surfaces_produce_an_empty_diff() {
        let a = gradient(16, 16);
        let b = a.clone();
        let diff = SurfaceDiff::create(&a, &b).unwrap().unwrap();
        assert!(diff.bounds().is_empty());
        assert_eq!(diff.memory_bytes(), 0);
    }

    #[test]
    fn bounds_are_minimal() {
        let before = gradient(20, 20);
        let mut after = before.clone();
        after.put(5, 7, ColorBgra::WHITE);
        after.put(9, 12, ColorBgra::BLACK);

        let diff = SurfaceDiff::create(&before, &after).unwrap().unwrap();
        assert_eq!(diff.bounds(), RectI::from_ltrb(5, 7, 9, 12));
    }

    #[test]
    fn apply_and_swap_is_an_involution() {
        let before = gradient(24, 18);
        let mut after = before.clone();
        for x in 3..9 {
            after.put(x, 4, ColorBgra::from_bgr(255, 0, 255));
        }

        let mut diff = SurfaceDiff::create(&before, &after).unwrap().unwrap();

        let mut surface = after.clone();
        diff.apply_and_swap(&mut surface).unwrap();
        assert_eq!(surface, before);

        diff.apply_and_swap(&mut surface).unwrap();
        assert_eq!(surface, after);
    }

    #[test]
    fn unchanged_pixels_inside_bounds_survive_the_swap() {
        let before = gradient(10, 10);
        let mut after = before.clone();
        // Two distant corners changed; the rectangle between them is not.
        after.put(1, 1, ColorBgra::WHITE);
        after.put(8, 8, ColorBgra::WHITE);

        let mut diff = SurfaceDiff::create(&before, &after).unwrap().unwrap();
        let mut surface = after.clone();
        diff.apply_and_swap(&mut surface).unwrap();
        assert_eq!(surface, before);
    }

    #[test]
    fn whole_surface_change_falls_back_to_snapshot() {
        let before = gradient(8, 8);
        let mut after = Surface::new(8, 8);
        for y in 0..8 {
            for x in 0..8 {
                after.put(x, y, ColorBgra::WHITE);
            }
        }
        assert!(SurfaceDiff::create(&before, &after).unwrap().is_none());
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let a = Surface::new(4, 4);
        let b = Surface::new(5, 4);
        assert!(matches!(
            SurfaceDiff::create(&a, &b),
            Err(Error::SizeMismatch(4, 4, 5, 4))
        ));
    }
}
