// ============================================================================
// PAINTCORE — raster effect rendering and reversible edit history
// ============================================================================
//
// The two halves of a raster editor's core:
//
// * an effect engine that renders per-pixel and windowed transforms over
//   arbitrary regions of interest of a premultiplied BGRA surface, and
// * a history engine that makes every committed edit reversible by storing
//   a compact diff of the changed region (or a full snapshot when too much
//   changed), applied in place as an involution.

pub mod canvas;
pub mod color;
pub mod components;
pub mod error;
pub mod ops;
pub mod rect;
pub mod surface;

pub use canvas::{CanvasState, Layer};
pub use color::ColorBgra;
pub use components::diff::SurfaceDiff;
pub use components::history::{
    CompoundHistoryItem, HistoryItem, HistoryManager, ItemState, SimpleHistoryItem,
};
pub use error::{Error, Result};
pub use ops::effects::{
    ChangeSignal, Chrome, Effect, EffectData, render_effect, render_in_parallel,
};
pub use rect::RectI;
pub use surface::{Surface, SurfaceMut};
