use thiserror::Error;

/// Errors surfaced by the rendering core.
#[derive(Debug, Error)]
pub enum Error {
    /// `launch_configuration` was called on an effect that has no dialog.
    #[error("effect '{0}' is not configurable")]
    NotConfigurable(String),

    /// An effect data record holds values the effect cannot render with.
    #[error("invalid effect configuration: {0}")]
    InvalidConfig(String),

    /// Two surfaces that must share dimensions do not.
    #[error("surface size mismatch: {0}x{1} vs {2}x{3}")]
    SizeMismatch(i32, i32, i32, i32),

    /// A layer index referred to a layer that does not exist.
    #[error("layer index {index} out of bounds ({count} layers)")]
    LayerIndex { index: usize, count: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
