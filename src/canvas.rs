// ============================================================================
// CANVAS STATE — layers, active-layer tracking, invalidation accumulation
// ============================================================================

use crate::color::ColorBgra;
use crate::error::{Error, Result};
use crate::rect::RectI;
use crate::surface::Surface;

/// A named layer owning exactly one pixel surface.
///
/// The surface is only reachable through the layer, so buffer replacement
/// during undo/redo is a single ownership swap: a concurrent redraw sees
/// either the old surface or the new one, never a half-written mix.
pub struct Layer {
    pub name: String,
    pub visible: bool,
    pub opacity: f32,
    surface: Surface,
}

impl Layer {
    pub fn new(name: String, width: i32, height: i32, fill: ColorBgra) -> Self {
        Self {
            name,
            visible: true,
            opacity: 1.0,
            surface: Surface::new_filled(width, height, fill),
        }
    }

    pub fn from_surface(name: String, surface: Surface) -> Self {
        Self { name, visible: true, opacity: 1.0, surface }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut Surface {
        &mut self.surface
    }

    /// Swap in a replacement buffer, returning the old one.
    pub fn replace_surface(&mut self, surface: Surface) -> Surface {
        std::mem::replace(&mut self.surface, surface)
    }
}

/// The document collaborator consumed by the history engine and the effect
/// pipeline: layer access, buffer replacement and region invalidation.
pub struct CanvasState {
    pub width: i32,
    pub height: i32,
    pub layers: Vec<Layer>,
    pub active_layer_index: usize,
    dirty: bool,
    invalid: Option<RectI>,
}

impl CanvasState {
    /// New single-layer canvas with an opaque white background.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width,
            height,
            layers: vec![Layer::new("Background".into(), width, height, ColorBgra::WHITE)],
            active_layer_index: 0,
            dirty: false,
            invalid: None,
        }
    }

    pub fn bounds(&self) -> RectI {
        RectI::new(0, 0, self.width, self.height)
    }

    pub fn layer(&self, index: usize) -> Result<&Layer> {
        self.layers
            .get(index)
            .ok_or(Error::LayerIndex { index, count: self.layers.len() })
    }

    pub fn layer_mut(&mut self, index: usize) -> Result<&mut Layer> {
        let count = self.layers.len();
        self.layers
            .get_mut(index)
            .ok_or(Error::LayerIndex { index, count })
    }

    pub fn active_layer(&self) -> &Layer {
        &self.layers[self.active_layer_index]
    }

    pub fn active_layer_mut(&mut self) -> &mut Layer {
        &mut self.layers[self.active_layer_index]
    }

    /// Add a transparent layer on top and make it active.
    pub fn add_layer(&mut self, name: String) -> usize {
        self.layers
            .push(Layer::new(name, self.width, self.height, ColorBgra::TRANSPARENT));
        self.active_layer_index = self.layers.len() - 1;
        self.active_layer_index
    }

    /// Accumulate an invalid region for the redraw scheduler.  `None` marks
    /// the whole canvas.
    pub fn mark_dirty(&mut self, region: Option<RectI>) {
        let region = region.unwrap_or_else(|| self.bounds());
        if region.is_empty() {
            return;
        }
        self.invalid = Some(match self.invalid {
            Some(existing) => existing.union(region),
            None => region,
        });
    }

    /// Drain the accumulated invalid region.
    pub fn take_invalid(&mut self) -> Option<RectI> {
        self.invalid.take()
    }

    /// Whether the document has unsaved edits.  Maintained by the history
    /// engine.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_canvas_has_white_background() {
        let canvas = CanvasState::new(4, 4);
        assert_eq!(canvas.layers.len(), 1);
        assert_eq!(canvas.active_layer().surface().get(0, 0), ColorBgra::WHITE);
        assert!(!canvas.is_dirty());
    }

    #[test]
    fn layer_index_error() {
        let canvas = CanvasState::new(2, 2);
        assert!(matches!(
            canvas.layer(3),
            Err(Error::LayerIndex { index: 3, count: 1 })
        ));
    }

    #[test]
    fn invalid_region_accumulates() {
        let mut canvas = CanvasState::new(10, 10);
        canvas.mark_dirty(Some(RectI::new(0, 0, 2, 2)));
        canvas.mark_dirty(Some(RectI::new(4, 4, 2, 2)));
        assert_eq!(canvas.take_invalid(), Some(RectI::new(0, 0, 6, 6)));
        assert_eq!(canvas.take_invalid(), None);
    }

    #[test]
    fn replace_surface_swaps_ownership() {
        let mut canvas = CanvasState::new(2, 2);
        let replacement = Surface::new_filled(2, 2, ColorBgra::BLACK);
        let old = canvas.active_layer_mut().replace_surface(replacement);
        assert_eq!(old.get(0, 0), ColorBgra::WHITE);
        assert_eq!(canvas.active_layer().surface().get(0, 0), ColorBgra::BLACK);
    }
}
