//! Frame driver that owns every jelly body in the scene.
//!
//! [`JellyWorld::advance`] takes the raw render-frame delta and turns it into
//! fixed solver ticks, so the per-tick damping in [`crate::solver`] behaves
//! the same at any frame rate. Structural operations address bodies by id.

use clayground_config::ClayConfig;
use geometry::MeshBuffer;
use glam::Vec3;
use tracing::{debug, info, trace, warn};

use crate::body::JellyBody;
use crate::drag;
use crate::error::JellyError;
use crate::lifecycle::LifecycleManager;
use crate::solver::{self, StepReport};
use crate::topology::build_or_refresh;
use crate::types::{BodyId, Color, NodeId};

/// Summary of one [`JellyWorld::advance`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceReport {
    /// Solver ticks run this frame
    pub ticks: u32,
    /// Bodies that disappeared into a merge this frame
    pub merged: usize,
    pub step: StepReport,
}

pub struct JellyWorld {
    config: ClayConfig,
    bodies: Vec<JellyBody>,
    lifecycle: LifecycleManager,
    merge_enabled: bool,
    merge_timer: f32,
    accumulator: f32,
}

impl JellyWorld {
    /// Create an empty world. The whole config is validated first.
    pub fn new(config: ClayConfig) -> Result<Self, JellyError> {
        config.validate().map_err(|err| {
            warn!("Rejected world config: {}", err);
            JellyError::InvalidConfig(err.to_string())
        })?;
        let lifecycle = LifecycleManager::new(config.template.clone(), config.merge.clone());
        Ok(Self {
            config,
            bodies: Vec::new(),
            lifecycle,
            merge_enabled: false,
            merge_timer: 0.0,
            accumulator: 0.0,
        })
    }

    pub fn config(&self) -> &ClayConfig {
        &self.config
    }

    pub fn bodies(&self) -> &[JellyBody] {
        &self.bodies
    }

    pub fn body(&self, id: BodyId) -> Option<&JellyBody> {
        self.bodies.iter().find(|b| b.id == id)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut JellyBody> {
        self.bodies.iter_mut().find(|b| b.id == id)
    }

    fn require_mut(&mut self, id: BodyId) -> Result<&mut JellyBody, JellyError> {
        self.body_mut(id).ok_or(JellyError::BodyNotFound(id))
    }

    fn position_of(&self, id: BodyId) -> Result<usize, JellyError> {
        self.bodies
            .iter()
            .position(|b| b.id == id)
            .ok_or(JellyError::BodyNotFound(id))
    }

    pub fn merge_enabled(&self) -> bool {
        self.merge_enabled
    }

    /// Toggle the periodic merge scan. Turning it on restarts the cadence.
    pub fn set_merge_enabled(&mut self, enabled: bool) {
        if enabled && !self.merge_enabled {
            self.merge_timer = 0.0;
        }
        self.merge_enabled = enabled;
    }

    pub fn create_body(
        &mut self,
        center: Vec3,
        radius: f32,
        stiffness: f32,
        color: Color,
    ) -> Result<BodyId, JellyError> {
        let body = self.lifecycle.create_body(center, radius, stiffness, color)?;
        let id = body.id;
        self.bodies.push(body);
        info!("Created {} at {:?}", id, center);
        Ok(id)
    }

    pub fn delete_body(&mut self, id: BodyId) -> Result<JellyBody, JellyError> {
        let index = self.position_of(id)?;
        info!("Deleted {}", id);
        Ok(self.bodies.remove(index))
    }

    /// Replace a body with its two halves, in the same slot.
    pub fn split_body(&mut self, id: BodyId) -> Result<[BodyId; 2], JellyError> {
        let index = self.position_of(id)?;
        let [first, second] = self.lifecycle.split_body(&self.bodies[index])?;
        let ids = [first.id, second.id];
        self.bodies[index] = first;
        self.bodies.insert(index + 1, second);
        info!("Split {} into {} and {}", id, ids[0], ids[1]);
        Ok(ids)
    }

    /// Run a merge scan immediately. Returns how many bodies disappeared.
    pub fn merge_now(&mut self) -> usize {
        let before = self.bodies.len();
        let bodies = std::mem::take(&mut self.bodies);
        self.bodies = self.lifecycle.merge_if_close(bodies);
        let merged = before - self.bodies.len();
        if merged > 0 {
            info!("Merge scan absorbed {} bodies", merged);
        }
        merged
    }

    /// Fuse two bodies into one with a bridging spring, whatever their distance.
    pub fn connect_bodies(&mut self, a: BodyId, b: BodyId) -> Result<BodyId, JellyError> {
        if a == b {
            return Err(JellyError::SameBody(a));
        }
        let index_a = self.position_of(a)?;
        self.position_of(b)?;

        let body_a = self.bodies.remove(index_a);
        let index_b = self.position_of(b)?;
        let body_b = self.bodies.remove(index_b);

        let joined = self.lifecycle.connect_bodies(body_a, body_b);
        let id = joined.id;
        self.bodies.insert(index_a.min(self.bodies.len()), joined);
        Ok(id)
    }

    pub fn start_drag(&mut self, id: BodyId, node: NodeId, point: Vec3) -> Result<bool, JellyError> {
        let config = self.config.drag.clone();
        drag::start_drag(self.require_mut(id)?, node, point, &config)
    }

    /// Grab whichever node of the body is closest to `point`.
    pub fn start_drag_nearest(&mut self, id: BodyId, point: Vec3) -> Result<bool, JellyError> {
        let body = self.body(id).ok_or(JellyError::BodyNotFound(id))?;
        match body.nearest_node(point) {
            Some(node) => self.start_drag(id, node, point),
            None => Ok(false),
        }
    }

    pub fn update_drag(&mut self, id: BodyId, point: Vec3) -> Result<bool, JellyError> {
        Ok(drag::update_drag(self.require_mut(id)?, point))
    }

    pub fn end_drag(&mut self, id: BodyId) -> Result<bool, JellyError> {
        Ok(drag::end_drag(self.require_mut(id)?))
    }

    pub fn pin_node(&mut self, id: BodyId, node: NodeId, pinned: bool) -> Result<(), JellyError> {
        drag::pin_node(self.require_mut(id)?, node, pinned)
    }

    /// Step every body by `dt`, bypassing the fixed-step accumulator.
    ///
    /// The solver still slices `dt` into ticks no longer than
    /// `fixed_timestep`, but nothing carries over between calls and the merge
    /// cadence does not run.
    pub fn step_all(&mut self, dt: f32) -> StepReport {
        solver::step_all(&mut self.bodies, dt, &self.config.solver)
    }

    /// Advance the simulation by one render frame.
    ///
    /// The frame delta is capped, added to an accumulator and consumed in
    /// fixed ticks. If the tick limit is hit, whatever remains in the
    /// accumulator is dropped instead of being carried into the next frame.
    pub fn advance(&mut self, frame_dt: f32) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        if !frame_dt.is_finite() || frame_dt <= 0.0 {
            return report;
        }

        let cfg = &self.config.solver;
        let frame_dt = frame_dt.min(cfg.max_frame_delta);
        let tick = cfg.fixed_timestep;
        self.accumulator += frame_dt;

        while self.accumulator >= tick && report.ticks < cfg.max_ticks_per_advance {
            let step = solver::step_all(&mut self.bodies, tick, cfg);
            report.step.dropped_springs += step.dropped_springs;
            report.step.frozen_nodes += step.frozen_nodes;
            self.accumulator -= tick;
            report.ticks += 1;
        }
        if self.accumulator >= tick {
            trace!("Dropping {:.4}s of simulation time", self.accumulator);
            self.accumulator = 0.0;
        }

        if self.merge_enabled {
            self.merge_timer += frame_dt;
            if self.merge_timer >= self.config.merge.merge_interval {
                self.merge_timer = 0.0;
                report.merged = self.merge_now();
            }
        }

        if report.step.frozen_nodes > 0 {
            debug!("{} nodes frozen this frame", report.step.frozen_nodes);
        }
        report
    }

    /// Current render buffers for every body that has enough nodes.
    pub fn render_buffers(&mut self) -> Vec<(BodyId, MeshBuffer)> {
        let topology = &self.config.topology;
        self.bodies
            .iter_mut()
            .filter_map(|body| build_or_refresh(body, topology).map(|mesh| (body.id, mesh)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clayground_config::SolverConfig;

    const BLUE: Color = [0.2, 0.4, 1.0, 1.0];

    fn world() -> JellyWorld {
        JellyWorld::new(ClayConfig::default()).unwrap()
    }

    fn lowest_node(body: &JellyBody) -> f32 {
        body.nodes
            .iter()
            .map(|n| n.position.y)
            .fold(f32::INFINITY, f32::min)
    }

    fn max_speed(body: &JellyBody) -> f32 {
        body.nodes
            .iter()
            .map(|n| n.velocity.length())
            .fold(0.0, f32::max)
    }

    fn mean_speed(body: &JellyBody) -> f32 {
        body.nodes.iter().map(|n| n.velocity.length()).sum::<f32>() / body.node_count() as f32
    }

    #[test]
    fn test_body_settles_on_ground() {
        let mut world = world();
        let id = world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        for _ in 0..900 {
            world.advance(0.016);
        }

        let body = world.body(id).unwrap();
        let lowest = lowest_node(body);
        assert!(lowest >= 0.1 - 1e-4);
        assert!(lowest < 0.15, "lowest node at {lowest}");
        assert!(body.center.y > 0.1 && body.center.y < 1.1, "center {:?}", body.center);
        assert!(body.mean_velocity().length() < 0.05);
        assert!(body.nodes.iter().all(|n| n.position.is_finite() && !n.frozen));
    }

    #[test]
    fn test_body_at_origin_comes_to_rest_with_frame_steps() {
        let mut world = world();
        let id = world.create_body(Vec3::ZERO, 1.0, 50.0, BLUE).unwrap();

        let mut peak = 0.0_f32;
        for _ in 0..60 {
            world.step_all(0.016);
            peak = peak.max(max_speed(world.body(id).unwrap()));
        }
        let body = world.body(id).unwrap();
        // Half the template starts below ground and is pushed up onto it
        assert!((lowest_node(body) - 0.1).abs() < 1e-4);
        assert!(body.nodes.iter().all(|n| n.position.y >= 0.1 && !n.frozen));
        assert!(body.center.y > 0.1 && body.center.y < 1.1, "center {:?}", body.center);
        assert!(peak < 25.0, "peak speed {peak}");
        assert!(max_speed(body) < 2.0);

        for _ in 60..600 {
            world.step_all(0.016);
        }
        let body = world.body(id).unwrap();
        assert!((lowest_node(body) - 0.1).abs() < 1e-4);
        assert!(body.mean_velocity().length() < 0.05, "{:?}", body.mean_velocity());
        assert!(max_speed(body) < 0.5);
    }

    #[test]
    fn test_step_all_damps_a_dropped_body() {
        let mut world = world();
        let id = world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        let mut peak = 0.0_f32;
        let mut early = 0.0;
        for frame in 1..=600 {
            world.step_all(0.016);
            let body = world.body(id).unwrap();
            peak = peak.max(max_speed(body));
            if frame == 60 {
                early = mean_speed(body);
            }
        }

        let body = world.body(id).unwrap();
        assert!(peak < 25.0, "peak speed {peak}");
        assert!(mean_speed(body) < early * 0.5);
        assert!(body.mean_velocity().length() < 0.05);
        assert!(body.nodes.iter().all(|n| n.position.is_finite() && !n.frozen));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = ClayConfig {
            solver: SolverConfig {
                fixed_timestep: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            JellyWorld::new(config),
            Err(JellyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_advance_runs_fixed_ticks() {
        let mut world = world();
        world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        // 16 ms at 240 Hz: three whole ticks, the remainder carries over
        assert_eq!(world.advance(0.016).ticks, 3);
        // Huge deltas are capped to one frame
        assert!(world.advance(5.0).ticks <= 4);
        assert_eq!(world.advance(0.0).ticks, 0);
        assert_eq!(world.advance(f32::NAN).ticks, 0);
    }

    #[test]
    fn test_advance_drops_backlog_past_tick_limit() {
        let config = ClayConfig {
            solver: SolverConfig {
                fixed_timestep: 0.001,
                max_ticks_per_advance: 4,
                ..Default::default()
            },
            ..Default::default()
        };
        let mut world = JellyWorld::new(config).unwrap();
        world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        assert_eq!(world.advance(0.016).ticks, 4);
        assert_eq!(world.advance(0.0005).ticks, 0);
    }

    #[test]
    fn test_merge_runs_on_cadence_when_enabled() {
        let mut world = world();
        world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();
        world
            .create_body(Vec3::new(1.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        for _ in 0..40 {
            world.advance(0.016);
        }
        assert_eq!(world.bodies().len(), 2);

        world.set_merge_enabled(true);
        let merged: usize = (0..40).map(|_| world.advance(0.016).merged).sum();
        assert_eq!(merged, 1);
        assert_eq!(world.bodies().len(), 1);
        assert_eq!(world.bodies()[0].node_count(), 26);
    }

    #[test]
    fn test_dragged_body_is_not_merged() {
        let mut world = world();
        let a = world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();
        world
            .create_body(Vec3::new(1.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        assert!(world.start_drag_nearest(a, Vec3::new(0.0, 3.0, 0.0)).unwrap());
        assert_eq!(world.merge_now(), 0);

        assert!(world.end_drag(a).unwrap());
        assert_eq!(world.merge_now(), 1);
    }

    #[test]
    fn test_split_replaces_body() {
        let mut world = world();
        let id = world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();
        let [first, second] = world.split_body(id).unwrap();

        assert!(world.body(id).is_none());
        assert_eq!(world.bodies().len(), 2);
        assert_eq!(
            world.body(first).unwrap().node_count() + world.body(second).unwrap().node_count(),
            13
        );

        // Halves fly apart
        for _ in 0..20 {
            world.advance(0.016);
        }
        let gap = world.body(first).unwrap().center.x - world.body(second).unwrap().center.x;
        assert!(gap < 0.0);
    }

    #[test]
    fn test_missing_body_errors() {
        let mut world = world();
        let ghost = BodyId(77);
        assert_eq!(world.delete_body(ghost).unwrap_err(), JellyError::BodyNotFound(ghost));
        assert!(world.split_body(ghost).is_err());
        assert!(world.start_drag(ghost, NodeId(0), Vec3::ZERO).is_err());
        assert!(world.update_drag(ghost, Vec3::ZERO).is_err());
        assert!(world.end_drag(ghost).is_err());
    }

    #[test]
    fn test_delete_and_connect() {
        let mut world = world();
        let a = world
            .create_body(Vec3::new(-5.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();
        let b = world
            .create_body(Vec3::new(5.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();
        let c = world
            .create_body(Vec3::new(0.0, 3.0, 5.0), 1.0, 50.0, BLUE)
            .unwrap();

        let deleted = world.delete_body(c).unwrap();
        assert_eq!(deleted.id, c);

        let joined = world.connect_bodies(a, b).unwrap();
        assert_eq!(world.bodies().len(), 1);
        assert_eq!(world.body(joined).unwrap().node_count(), 26);
        assert!(world.connect_bodies(joined, joined).is_err());
    }

    #[test]
    fn test_render_buffers() {
        let mut world = world();
        let id = world
            .create_body(Vec3::new(0.0, 3.0, 0.0), 1.0, 50.0, BLUE)
            .unwrap();

        let buffers = world.render_buffers();
        assert_eq!(buffers.len(), 1);
        assert_eq!(buffers[0].0, id);
        // Every node triple of a unit template body is within the threshold
        assert_eq!(buffers[0].1.triangle_count(), 286);

        world.advance(0.016);
        let moved = world.render_buffers();
        assert_eq!(moved[0].1.indices, buffers[0].1.indices);
        assert_ne!(moved[0].1.vertices[1].position, buffers[0].1.vertices[1].position);
    }
}
