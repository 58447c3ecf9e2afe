//! Grabbing and dragging a node of a jelly body.
//!
//! The grabbed node is pinned and follows the pointer exactly. Nearby nodes
//! get a linear-falloff share of the pointer motion so the surface around the
//! grab point moves with it; springs handle the rest of the body.

use clayground_config::DragConfig;
use geometry::{compute_weights, Falloff, Influence};
use glam::Vec3;
use tracing::debug;

use crate::body::JellyBody;
use crate::error::JellyError;
use crate::types::NodeId;

/// An in-progress drag. At most one exists per body.
#[derive(Debug, Clone)]
pub struct DragState {
    pub node: NodeId,
    /// Pin flag to restore when the drag ends
    pub(crate) was_pinned: bool,
    last_point: Vec3,
    follow_strength: f32,
    /// Other nodes near the grab point, weighted at grab time
    influences: Vec<Influence>,
}

impl DragState {
    pub fn influenced_nodes(&self) -> usize {
        self.influences.len()
    }
}

/// Grab `node` and move it to `point`.
///
/// Returns `Ok(false)` without touching the body if a drag is already active
/// or the point is not finite.
pub fn start_drag(
    body: &mut JellyBody,
    node: NodeId,
    point: Vec3,
    config: &DragConfig,
) -> Result<bool, JellyError> {
    if body.drag.is_some() {
        debug!("{}: drag already active, ignoring new grab", body.id);
        return Ok(false);
    }

    let body_id = body.id;
    let target = body
        .node_mut(node)
        .ok_or(JellyError::NodeNotFound { body: body_id, node })?;
    if !point.is_finite() {
        return Ok(false);
    }

    let was_pinned = target.pinned;
    target.pinned = true;
    target.frozen = false;
    target.position = point;
    target.velocity = Vec3::ZERO;

    let positions = body.positions();
    let influences: Vec<Influence> =
        compute_weights(point, &positions, config.influence_radius, Falloff::Linear)
            .into_iter()
            .filter(|influence| influence.index != node.index())
            .collect();

    debug!(
        "{}: grabbed node {:?} with {} influenced nodes",
        body.id,
        node,
        influences.len()
    );

    body.drag = Some(DragState {
        node,
        was_pinned,
        last_point: point,
        follow_strength: config.follow_strength,
        influences,
    });
    body.recompute_center();
    Ok(true)
}

/// Move the grabbed node to `point`. Returns `false` when no drag is active.
pub fn update_drag(body: &mut JellyBody, point: Vec3) -> bool {
    let Some(drag) = body.drag.as_mut() else {
        return false;
    };
    if !point.is_finite() {
        return false;
    }

    let delta = point - drag.last_point;
    drag.last_point = point;

    if let Some(grabbed) = body.nodes.get_mut(drag.node.index()) {
        grabbed.position = point;
        grabbed.velocity = Vec3::ZERO;
    }

    for influence in &drag.influences {
        let Some(node) = body.nodes.get_mut(influence.index) else {
            continue;
        };
        if node.is_dynamic() {
            node.position += delta * influence.weight * drag.follow_strength;
        }
    }

    body.recompute_center();
    true
}

/// Release the grabbed node. Returns `false` when no drag was active.
pub fn end_drag(body: &mut JellyBody) -> bool {
    let Some(drag) = body.drag.take() else {
        return false;
    };

    if let Some(node) = body.nodes.get_mut(drag.node.index()) {
        node.pinned = drag.was_pinned;
    }
    debug!("{}: released node {:?}", body.id, drag.node);
    true
}

/// Pin or unpin a node outside of a drag gesture.
pub fn pin_node(body: &mut JellyBody, node: NodeId, pinned: bool) -> Result<(), JellyError> {
    let body_id = body.id;
    let target = body
        .node_mut(node)
        .ok_or(JellyError::NodeNotFound { body: body_id, node })?;
    target.pinned = pinned;
    if pinned {
        target.velocity = Vec3::ZERO;
        target.frozen = false;
    }
    Ok(())
}
