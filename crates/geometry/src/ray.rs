//! Ray intersection helpers.
//!
//! Ray-triangle intersection uses the Moller-Trumbore algorithm. Mesh raycasts
//! are brute force over every triangle, which is fine for the sizes sculpted
//! interactively.

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

/// Epsilon for floating point comparisons in ray intersection
const EPSILON: f32 = 1e-6;

/// A half-line with an origin and a direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ray {
    pub origin: Vec3,
    /// Direction, normalized on construction
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray; the direction is normalized (zero stays zero).
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Point at distance `t` along the ray
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Map the ray through an affine transform (e.g. world to mesh local).
    pub fn transformed(&self, transform: &Affine3A) -> Self {
        Self::new(
            transform.transform_point3(self.origin),
            transform.transform_vector3(self.direction),
        )
    }
}

/// Where a ray crosses a single triangle.
///
/// `u` and `v` are the Moller-Trumbore edge parameters, i.e. the weights of
/// the second and third corner.
#[derive(Debug, Clone, Copy)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

impl TriangleHit {
    /// Corner weights in (v0, v1, v2) order.
    pub fn weights(&self) -> Vec3 {
        Vec3::new(1.0 - self.u - self.v, self.u, self.v)
    }
}

/// Closest hit of a ray against an indexed triangle list.
#[derive(Debug, Clone, Copy)]
pub struct MeshHit {
    /// Triangle index (first index is `face * 3`)
    pub face: usize,
    /// Vertex indices of the hit triangle
    pub vertices: [usize; 3],
    /// Hit point in the same space as the ray
    pub point: Vec3,
    /// Distance along the ray
    pub t: f32,
    /// Barycentric weights for `vertices`
    pub barycentric: Vec3,
}

impl MeshHit {
    /// The triangle corner with the largest barycentric weight.
    ///
    /// This is the corner the hit point "belongs" to, not necessarily the
    /// nearest vertex of the whole mesh.
    pub fn dominant_vertex(&self) -> usize {
        let b = self.barycentric;
        if b.x >= b.y && b.x >= b.z {
            self.vertices[0]
        } else if b.y >= b.z {
            self.vertices[1]
        } else {
            self.vertices[2]
        }
    }
}

/// Moller-Trumbore test of a ray against the triangle `v0 v1 v2`.
///
/// Both faces count. Hits at or behind the origin, and rays lying in the
/// triangle's plane, are `None`.
pub fn ray_triangle_intersection(
    ray_origin: Vec3,
    ray_dir: Vec3,
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
) -> Option<TriangleHit> {
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;

    let pvec = ray_dir.cross(edge2);
    let det = edge1.dot(pvec);

    // Parallel to the plane, or a zero-area triangle
    if det.abs() < EPSILON {
        return None;
    }

    let inv_det = 1.0 / det;
    let tvec = ray_origin - v0;

    let u = tvec.dot(pvec) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let qvec = tvec.cross(edge1);
    let v = ray_dir.dot(qvec) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = edge2.dot(qvec) * inv_det;
    if t < EPSILON {
        return None;
    }

    Some(TriangleHit { t, u, v })
}

/// Barycentric weights of `p` (projected onto the triangle plane) for `a`, `b`, `c`.
///
/// Returns `None` for degenerate triangles.
pub fn barycentric(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Option<Vec3> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < EPSILON {
        return None;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some(Vec3::new(1.0 - v - w, v, w))
}

/// Intersect a ray with the plane through `point` with normal `normal`.
///
/// Returns `None` when the ray is parallel to the plane or the plane lies
/// behind the ray origin.
pub fn ray_plane_intersection(ray: &Ray, point: Vec3, normal: Vec3) -> Option<Vec3> {
    let denom = normal.dot(ray.direction);
    if denom.abs() < EPSILON {
        return None;
    }

    let t = normal.dot(point - ray.origin) / denom;
    if !t.is_finite() || t < 0.0 {
        return None;
    }

    Some(ray.at(t))
}

/// Cast a ray against an indexed triangle list and return the closest hit.
///
/// Triangles referencing out-of-range vertices are skipped.
pub fn raycast_triangles(ray: &Ray, positions: &[Vec3], indices: &[u32]) -> Option<MeshHit> {
    let mut closest: Option<MeshHit> = None;

    for (face, tri) in indices.chunks_exact(3).enumerate() {
        let corners = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let (Some(&v0), Some(&v1), Some(&v2)) = (
            positions.get(corners[0]),
            positions.get(corners[1]),
            positions.get(corners[2]),
        ) else {
            continue;
        };

        let Some(hit) = ray_triangle_intersection(ray.origin, ray.direction, v0, v1, v2) else {
            continue;
        };

        if closest.is_some_and(|prev| hit.t >= prev.t) {
            continue;
        }

        let point = ray.at(hit.t);
        closest = Some(MeshHit {
            face,
            vertices: corners,
            point,
            t: hit.t,
            barycentric: barycentric(point, v0, v1, v2).unwrap_or_else(|| hit.weights()),
        });
    }

    closest
}
