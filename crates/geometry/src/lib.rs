//! Clayground geometry helpers shared by the jelly and sculpting crates
//!
//! - [`ray`] - rays, Moller-Trumbore, barycentrics and ray/plane intersection
//! - [`bounds`] - axis-aligned boxes and bounding spheres
//! - [`normals`] - area-weighted vertex normals
//! - [`falloff`] - radial brush influence weights
//! - [`buffer`] - position+normal buffers handed to the renderer

pub mod bounds;
pub mod buffer;
pub mod falloff;
pub mod normals;
pub mod ray;

pub use bounds::{Aabb, BoundingSphere};
pub use buffer::{MeshBuffer, RenderVertex};
pub use falloff::{compute_weights, Falloff, Influence};
pub use normals::{compute_vertex_normals, recompute_vertex_normals};
pub use ray::{
    barycentric, ray_plane_intersection, ray_triangle_intersection,
    raycast_triangles, MeshHit, Ray, TriangleHit,
};
