//! Rigid-mesh sculpting for Clayground.
//!
//! This crate provides the push/pull brush:
//! - Raycast from a world-space pointer ray to the grabbed vertex
//! - Radial power-falloff snapshot of the vertices around it
//! - Per-frame displacement toward a camera-facing drag plane
//!
//! # Architecture
//!
//! - **Types**: tools, camera, stroke outcomes
//! - **Mesh**: the rigid clay mesh with its transform, normals and bounds
//! - **Stroke**: the frozen weights and start positions of one gesture
//! - **Deformer**: the Idle/StrokeActive state machine that ties them together

pub mod deformer;
pub mod error;
pub mod mesh;
pub mod stroke;
pub mod types;

pub use deformer::SurfaceDeformer;
pub use error::SculptError;
pub use mesh::ClayMesh;
pub use stroke::BrushStroke;
pub use types::{Camera, SculptTool, StrokeResult, StrokeStart};
