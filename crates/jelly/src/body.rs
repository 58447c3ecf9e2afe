//! The jelly body aggregate.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::drag::DragState;
use crate::topology::TopologyState;
use crate::types::{BodyId, Color, NodeId, SoftBodyNode, Spring};

/// A deformable body: an ordered node arena plus the springs between nodes.
///
/// Every spring indexes into `nodes`; constructors and the solver drop any
/// spring that does not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JellyBody {
    pub id: BodyId,
    /// Order matters: split partitions this list at its midpoint
    pub nodes: Vec<SoftBodyNode>,
    pub springs: Vec<Spring>,
    /// Unweighted mean of node positions (not the centre of mass)
    pub center: Vec3,
    pub color: Color,
    /// Stiffness the body was created with
    pub stiffness: f32,
    #[serde(skip)]
    pub topology: TopologyState,
    #[serde(skip)]
    pub(crate) drag: Option<DragState>,
}

impl JellyBody {
    /// Assemble a body, dropping springs that reference missing nodes.
    pub fn new(
        id: BodyId,
        nodes: Vec<SoftBodyNode>,
        springs: Vec<Spring>,
        color: Color,
        stiffness: f32,
    ) -> Self {
        let mut body = Self {
            id,
            nodes,
            springs,
            center: Vec3::ZERO,
            color,
            stiffness,
            topology: TopologyState::Unbuilt,
            drag: None,
        };
        body.prune_springs();
        body.recompute_center();
        body
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> Option<&SoftBodyNode> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SoftBodyNode> {
        self.nodes.get_mut(id.index())
    }

    /// Recompute `center` as the equal-weight mean of node positions.
    pub fn recompute_center(&mut self) {
        if self.nodes.is_empty() {
            return;
        }
        let sum: Vec3 = self.nodes.iter().map(|n| n.position).sum();
        self.center = sum / self.nodes.len() as f32;
    }

    /// Drop springs whose endpoints are not in the arena. Returns how many
    /// were removed.
    pub fn prune_springs(&mut self) -> usize {
        let node_count = self.nodes.len();
        let before = self.springs.len();
        self.springs.retain(|s| s.is_valid_for(node_count));
        let dropped = before - self.springs.len();
        if dropped > 0 {
            warn!("{}: dropped {} springs with missing endpoints", self.id, dropped);
        }
        dropped
    }

    /// Node closest to `point`.
    pub fn nearest_node(&self, point: Vec3) -> Option<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(point)
                    .total_cmp(&b.position.distance_squared(point))
            })
            .map(|(index, _)| NodeId::from(index))
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.nodes.iter().map(|n| n.position).collect()
    }

    /// Mean node velocity.
    pub fn mean_velocity(&self) -> Vec3 {
        if self.nodes.is_empty() {
            return Vec3::ZERO;
        }
        let sum: Vec3 = self.nodes.iter().map(|n| n.velocity).sum();
        sum / self.nodes.len() as f32
    }

    /// Whether a drag gesture currently owns this body.
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Number of springs touching `node`.
    pub fn spring_count_for(&self, node: NodeId) -> usize {
        self.springs
            .iter()
            .filter(|s| s.a == node || s.b == node)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f32) -> SoftBodyNode {
        SoftBodyNode::new(Vec3::new(x, 1.0, 0.0), 1.0, [1.0; 4])
    }

    fn spring(a: u32, b: u32) -> Spring {
        Spring {
            a: NodeId(a),
            b: NodeId(b),
            rest_length: 1.0,
            stiffness: 10.0,
            damping: 0.0,
        }
    }

    #[test]
    fn test_center_is_unweighted_mean() {
        let mut nodes = vec![node(0.0), node(4.0)];
        nodes[1].mass = 100.0;
        let body = JellyBody::new(BodyId(1), nodes, vec![spring(0, 1)], [1.0; 4], 10.0);
        assert_eq!(body.center, Vec3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_new_prunes_dangling_springs() {
        let body = JellyBody::new(
            BodyId(1),
            vec![node(0.0), node(1.0)],
            vec![spring(0, 1), spring(1, 5), spring(1, 1)],
            [1.0; 4],
            10.0,
        );
        assert_eq!(body.springs.len(), 1);
        assert_eq!(body.spring_count_for(NodeId(1)), 1);
    }

    #[test]
    fn test_nearest_node() {
        let body = JellyBody::new(
            BodyId(1),
            vec![node(0.0), node(2.0), node(5.0)],
            Vec::new(),
            [1.0; 4],
            10.0,
        );
        assert_eq!(body.nearest_node(Vec3::new(2.4, 0.0, 0.0)), Some(NodeId(1)));

        let empty = JellyBody::new(BodyId(2), Vec::new(), Vec::new(), [1.0; 4], 10.0);
        assert_eq!(empty.nearest_node(Vec3::ZERO), None);
    }
}
