//! Error types for rigid-mesh sculpting.

/// Errors raised when building a [`crate::ClayMesh`] or a
/// [`crate::SurfaceDeformer`].
///
/// Brush strokes never fail: a miss or an inert brush is reported through
/// [`crate::StrokeStart`] instead.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SculptError {
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid sculpt configuration: {0}")]
    InvalidConfig(String),
}
