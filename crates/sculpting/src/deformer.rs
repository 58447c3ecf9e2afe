//! Push/pull stroke state machine for one rigid mesh.
//!
//! Idle until [`SurfaceDeformer::start_stroke`] hits the mesh, then active
//! until the stroke is ended or cancelled. Vertex positions are edited live;
//! ending a stroke only drops the snapshot.

use clayground_config::SculptConfig;
use geometry::{ray_plane_intersection, Falloff, Ray};
use tracing::{debug, trace, warn};

use crate::error::SculptError;
use crate::mesh::ClayMesh;
use crate::stroke::BrushStroke;
use crate::types::{Camera, SculptTool, StrokeResult, StrokeStart};

#[derive(Debug)]
pub struct SurfaceDeformer {
    mesh: ClayMesh,
    stroke: Option<BrushStroke>,
    config: SculptConfig,
}

impl SurfaceDeformer {
    /// Wrap `mesh`, rejecting brush settings that [`SculptConfig::validate`]
    /// refuses.
    pub fn new(mesh: ClayMesh, config: SculptConfig) -> Result<Self, SculptError> {
        config.validate().map_err(|err| {
            warn!("mesh {}: rejected sculpt config: {}", mesh.id, err);
            SculptError::InvalidConfig(err.to_string())
        })?;
        Ok(Self {
            mesh,
            stroke: None,
            config,
        })
    }

    pub fn mesh(&self) -> &ClayMesh {
        &self.mesh
    }

    /// Give the mesh back, dropping any stroke in progress as-is.
    pub fn into_mesh(self) -> ClayMesh {
        self.mesh
    }

    pub fn is_stroke_active(&self) -> bool {
        self.stroke.is_some()
    }

    pub fn stroke(&self) -> Option<&BrushStroke> {
        self.stroke.as_ref()
    }

    /// Begin a stroke where `ray` (world space) hits the mesh.
    ///
    /// The target is the corner of the hit triangle with the largest
    /// barycentric weight. Every vertex within `brush_size` of it is
    /// snapshotted with a power falloff weight. Without a size the configured
    /// `default_brush_size` is used.
    pub fn start_stroke(
        &mut self,
        tool: SculptTool,
        brush_size: Option<f32>,
        ray: &Ray,
    ) -> StrokeStart {
        if self.stroke.is_some() {
            debug!("mesh {}: stroke already active", self.mesh.id);
            return StrokeStart::AlreadyActive;
        }

        let Some(hit) = self.mesh.raycast(ray) else {
            trace!("mesh {}: stroke start missed", self.mesh.id);
            return StrokeStart::Missed;
        };
        let target = hit.dominant_vertex();

        let brush_size = brush_size.unwrap_or(self.config.default_brush_size);
        let falloff = Falloff::Power(self.config.falloff_exponent);
        let Some(stroke) =
            BrushStroke::begin(tool, brush_size, target, self.mesh.vertices(), falloff)
        else {
            return StrokeStart::Missed;
        };

        let affected = stroke.affected.len();
        debug!(
            "mesh {}: {:?} stroke on vertex {} affecting {} vertices",
            self.mesh.id, tool, target, affected
        );
        self.stroke = Some(stroke);
        StrokeStart::Started { target, affected }
    }

    /// Drag the stroke toward where `ray` crosses the camera-facing plane
    /// through the target vertex.
    ///
    /// When the ray runs parallel to that plane (or away from it) the point
    /// at the camera-to-target distance along the ray is used instead.
    /// Returns `false` when no stroke is active.
    pub fn update_stroke(&mut self, ray: &Ray, camera: &Camera) -> bool {
        let Some(stroke) = self.stroke.as_ref() else {
            return false;
        };

        let Some(&target_local) = self.mesh.vertices().get(stroke.target) else {
            return false;
        };
        let target_world = self.mesh.local_to_world(target_local);

        let point = ray_plane_intersection(ray, target_world, camera.direction)
            .unwrap_or_else(|| ray.at(camera.position.distance(target_world)));
        let new_target = self.mesh.world_to_local(point);
        if !new_target.is_finite() {
            warn!("mesh {}: stroke target is not finite, skipping", self.mesh.id);
            return true;
        }

        stroke.apply(new_target, self.config.pull_factor, self.mesh.vertices_mut());
        self.mesh.recompute_geometry();
        trace!("mesh {}: stroke moved to {:?}", self.mesh.id, new_target);
        true
    }

    /// Finish the stroke and commit the current geometry.
    pub fn end_stroke(&mut self) -> Option<StrokeResult> {
        let stroke = self.stroke.take()?;
        debug!(
            "mesh {}: {:?} stroke ended on vertex {}",
            self.mesh.id, stroke.tool, stroke.target
        );
        Some(StrokeResult {
            tool: stroke.tool,
            vertices: self.mesh.vertices().to_vec(),
            original_positions: stroke.original_positions(),
        })
    }

    /// Abandon the stroke and put every touched vertex back.
    pub fn cancel_stroke(&mut self) -> bool {
        let Some(stroke) = self.stroke.take() else {
            return false;
        };
        stroke.restore(self.mesh.vertices_mut());
        self.mesh.recompute_geometry();
        debug!("mesh {}: stroke cancelled", self.mesh.id);
        true
    }
}
