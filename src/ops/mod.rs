// ============================================================================
// OPS — effect engine and the operations built on it
// ============================================================================

pub mod adjustments;
pub mod convolution;
pub mod distort;
pub mod effects;
pub mod filters;
pub mod histogram;
pub mod pixel_ops;
pub mod render;
pub mod spline;
