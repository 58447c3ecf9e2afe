//! Rigid clay mesh that the push/pull brush edits in place.
//!
//! Vertices live in mesh-local space. The index buffer never changes after
//! construction; only positions move, after which normals and bounding
//! volumes must be recomputed before the next raycast or render.

use geometry::{
    raycast_triangles, recompute_vertex_normals, Aabb, BoundingSphere, MeshBuffer, MeshHit, Ray,
};
use glam::{Affine3A, Quat, Vec3};
use tracing::trace;

use crate::error::SculptError;

#[derive(Debug, Clone)]
pub struct ClayMesh {
    pub id: u32,
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
    normals: Vec<Vec3>,
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    pub color: [f32; 4],
    bounds: Aabb,
    bounding_sphere: BoundingSphere,
}

impl ClayMesh {
    /// Build a mesh at the origin with unit scale.
    ///
    /// The index buffer must hold whole triangles that reference existing
    /// vertices, and every vertex must be finite.
    pub fn new(id: u32, vertices: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, SculptError> {
        if vertices.is_empty() {
            return Err(SculptError::InvalidMesh("mesh has no vertices".to_string()));
        }
        if indices.len() % 3 != 0 {
            return Err(SculptError::InvalidMesh(format!(
                "index count {} is not a multiple of 3",
                indices.len()
            )));
        }
        if let Some(&bad) = indices.iter().find(|&&i| i as usize >= vertices.len()) {
            return Err(SculptError::InvalidMesh(format!(
                "index {} out of range for {} vertices",
                bad,
                vertices.len()
            )));
        }
        if let Some(bad) = vertices.iter().position(|v| !v.is_finite()) {
            return Err(SculptError::InvalidMesh(format!(
                "vertex {bad} is not finite"
            )));
        }

        let mut mesh = Self {
            id,
            vertices,
            indices,
            normals: Vec::new(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            color: [0.8, 0.6, 0.5, 1.0],
            bounds: Aabb::empty(),
            bounding_sphere: BoundingSphere::default(),
        };
        mesh.recompute_geometry();
        Ok(mesh)
    }

    /// Place the mesh in the world. Scale components must be finite and
    /// non-zero so the transform stays invertible.
    pub fn set_transform(
        &mut self,
        translation: Vec3,
        rotation: Quat,
        scale: Vec3,
    ) -> Result<(), SculptError> {
        if !translation.is_finite() || !rotation.is_finite() || !scale.is_finite() {
            return Err(SculptError::InvalidMesh("transform must be finite".to_string()));
        }
        if scale.abs().min_element() < f32::EPSILON {
            return Err(SculptError::InvalidMesh(format!(
                "scale {scale:?} is not invertible"
            )));
        }
        self.translation = translation;
        self.rotation = rotation.normalize();
        self.scale = scale;
        Ok(())
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut [Vec3] {
        &mut self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.bounding_sphere
    }

    /// Local to world.
    pub fn transform(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn local_to_world(&self, point: Vec3) -> Vec3 {
        self.transform().transform_point3(point)
    }

    pub fn world_to_local(&self, point: Vec3) -> Vec3 {
        self.transform().inverse().transform_point3(point)
    }

    /// Refresh normals and bounding volumes after vertices moved.
    pub fn recompute_geometry(&mut self) {
        recompute_vertex_normals(&self.vertices, &self.indices, &mut self.normals);
        self.bounds = Aabb::from_points(&self.vertices);
        self.bounding_sphere = BoundingSphere::from_points(&self.vertices);
        trace!(
            "mesh {}: geometry refreshed, bounds {:?}",
            self.id,
            self.bounds
        );
    }

    /// Closest triangle hit by a world-space ray.
    ///
    /// The returned hit is in mesh-local space.
    pub fn raycast(&self, ray: &Ray) -> Option<MeshHit> {
        let local = ray.transformed(&self.transform().inverse());
        if local.direction == Vec3::ZERO || !self.may_hit(&local) {
            return None;
        }
        raycast_triangles(&local, &self.vertices, &self.indices)
    }

    /// Cheap rejection against the bounding sphere.
    fn may_hit(&self, local: &Ray) -> bool {
        let sphere = self.bounding_sphere;
        let along = (sphere.center - local.origin).dot(local.direction).max(0.0);
        local.at(along).distance(sphere.center) <= sphere.radius + 1e-4
    }

    /// World-space positions and normals for the renderer.
    pub fn render_buffer(&self) -> MeshBuffer {
        let transform = self.transform();
        let positions: Vec<Vec3> = self
            .vertices
            .iter()
            .map(|&v| transform.transform_point3(v))
            .collect();
        // Normals transform by the inverse-transpose, which for scale-rotate
        // is rotation applied to n / scale
        let normals: Vec<Vec3> = self
            .normals
            .iter()
            .map(|&n| (self.rotation * (n / self.scale)).normalize_or_zero())
            .collect();
        MeshBuffer::from_parts(&positions, &normals, &self.indices)
    }
}
