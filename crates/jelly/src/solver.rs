//! Spring-mass integration.
//!
//! Each tick is semi-implicit Euler: forces are gathered from gravity and
//! springs, velocities are integrated and damped, positions follow, and the
//! result is clamped against the ground plane and the square play-area
//! boundary.
//!
//! [`step`] never integrates more than `fixed_timestep` at once. A longer `dt`
//! is cut into equal slices no longer than that, because the template's spring
//! damping is unstable for explicit integration at a full 16 ms frame.
//!
//! The velocity retention (0.99 by default) is applied once per slice
//! regardless of the slice length, so it is not frame-rate independent.

use clayground_config::SolverConfig;
use glam::Vec3;
use tracing::{trace, warn};

use crate::body::JellyBody;
use crate::types::{SoftBodyNode, Spring};

/// Springs shorter than this are treated as degenerate and skipped.
const MIN_SPRING_LENGTH: f32 = 1e-6;

/// What happened during a tick that the caller may want to surface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Springs removed because an endpoint no longer exists
    pub dropped_springs: usize,
    /// Nodes frozen because they produced a non-finite state
    pub frozen_nodes: usize,
}

impl StepReport {
    fn absorb(&mut self, other: StepReport) {
        self.dropped_springs += other.dropped_springs;
        self.frozen_nodes += other.frozen_nodes;
    }
}

/// Advance one body by `dt` seconds, capped at `config.max_frame_delta`.
///
/// The capped `dt` is integrated in `slice_count` equal ticks. A non-positive
/// or non-finite `dt` leaves the body untouched.
pub fn step(body: &mut JellyBody, dt: f32, config: &SolverConfig) -> StepReport {
    let mut report = StepReport::default();
    if !dt.is_finite() || dt <= 0.0 {
        return report;
    }
    let dt = dt.min(config.max_frame_delta);

    report.dropped_springs = body.prune_springs();

    let slices = slice_count(dt, config.fixed_timestep);
    let tick = dt / slices as f32;
    for _ in 0..slices {
        report.frozen_nodes += integrate_tick(body, tick, config);
    }

    body.recompute_center();
    trace!(
        "{}: stepped dt={:.4} in {} slices center={:?}",
        body.id, dt, slices, body.center
    );
    report
}

/// Number of equal slices needed so none is longer than `tick`.
pub fn slice_count(dt: f32, tick: f32) -> u32 {
    if !tick.is_finite() || tick <= 0.0 || dt <= tick {
        return 1;
    }
    (dt / tick).ceil() as u32
}

/// One semi-implicit Euler tick over every dynamic node. Returns how many
/// nodes were frozen.
fn integrate_tick(body: &mut JellyBody, dt: f32, config: &SolverConfig) -> usize {
    for node in &mut body.nodes {
        node.force = config.gravity * node.mass;
    }
    accumulate_spring_forces(&mut body.nodes, &body.springs);

    let mut frozen = 0;
    for (index, node) in body.nodes.iter_mut().enumerate() {
        if !node.is_dynamic() {
            continue;
        }
        if integrate_node(node, dt, config) {
            warn!("{}: node {} went non-finite and was frozen", body.id, index);
            frozen += 1;
        }
    }
    frozen
}

/// Advance every body by `dt`, see [`step`].
pub fn step_all(bodies: &mut [JellyBody], dt: f32, config: &SolverConfig) -> StepReport {
    let mut report = StepReport::default();
    for body in bodies.iter_mut() {
        report.absorb(step(body, dt, config));
    }
    report
}

/// Add elastic and damping forces of every spring to its endpoints.
///
/// The force along `dir = normalize(b - a)` is added to `a` and subtracted
/// from `b`, so a stretched spring pulls its endpoints together.
fn accumulate_spring_forces(nodes: &mut [SoftBodyNode], springs: &[Spring]) {
    for spring in springs {
        let (a, b) = (spring.a.index(), spring.b.index());
        if a == b || a >= nodes.len() || b >= nodes.len() {
            continue;
        }

        let delta = nodes[b].position - nodes[a].position;
        let length = delta.length();
        if !length.is_finite() || length < MIN_SPRING_LENGTH {
            continue;
        }
        let dir = delta / length;

        let elastic = spring.stiffness * (length - spring.rest_length);
        let relative_velocity = (nodes[b].velocity - nodes[a].velocity).dot(dir);
        let damping = spring.damping * relative_velocity;

        let force = dir * (elastic + damping);
        if !force.is_finite() {
            continue;
        }
        nodes[a].force += force;
        nodes[b].force -= force;
    }
}

/// Integrate one dynamic node and resolve collisions.
///
/// Returns `true` if the node had to be frozen.
fn integrate_node(node: &mut SoftBodyNode, dt: f32, config: &SolverConfig) -> bool {
    let previous = node.position;

    let acceleration = node.force / node.mass;
    node.velocity += acceleration * dt;
    node.velocity *= config.velocity_retention;
    node.velocity = node.velocity.clamp_length_max(config.max_speed);
    node.position += node.velocity * dt;

    resolve_collisions(node, config);

    if node.position.is_finite() && node.velocity.is_finite() {
        return false;
    }

    node.position = if previous.is_finite() {
        previous
    } else {
        Vec3::new(0.0, config.ground_height, 0.0)
    };
    node.velocity = Vec3::ZERO;
    node.frozen = true;
    true
}

/// Clamp against the ground plane and the X/Z boundary walls.
fn resolve_collisions(node: &mut SoftBodyNode, config: &SolverConfig) {
    let position = &mut node.position;
    let velocity = &mut node.velocity;

    if position.y < config.ground_height {
        position.y = config.ground_height;
        velocity.y *= -config.ground_restitution;
        velocity.x *= config.ground_friction;
        velocity.z *= config.ground_friction;
    }

    let bound = config.boundary;
    if position.x.abs() > bound {
        position.x = position.x.clamp(-bound, bound);
        velocity.x *= -config.boundary_restitution;
    }
    if position.z.abs() > bound {
        position.z = position.z.clamp(-bound, bound);
        velocity.z *= -config.boundary_restitution;
    }
}
