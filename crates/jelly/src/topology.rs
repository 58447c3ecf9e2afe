//! Renderable surface for a node cloud.
//!
//! Triangles are derived once per body from node proximity. After that only
//! positions and normals are refreshed. The triangle search is a brute-force
//! O(n³) scan over node triples, which is only acceptable because template
//! bodies carry a small, fixed number of nodes.

use clayground_config::TopologyConfig;
use geometry::{compute_vertex_normals, MeshBuffer};
use glam::Vec3;
use tracing::debug;

use crate::body::JellyBody;

/// Whether a body's triangle list has been derived yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopologyState {
    #[default]
    Unbuilt,
    /// Static triangle list, three indices per triangle
    Built(Vec<u32>),
}

impl TopologyState {
    pub fn indices(&self) -> Option<&[u32]> {
        match self {
            TopologyState::Unbuilt => None,
            TopologyState::Built(indices) => Some(indices),
        }
    }

    pub fn is_built(&self) -> bool {
        matches!(self, TopologyState::Built(_))
    }

    /// Forget the triangle list so the next refresh rebuilds it.
    pub fn invalidate(&mut self) {
        *self = TopologyState::Unbuilt;
    }
}

/// Build the triangle list on first use, then refresh positions and normals.
///
/// Bodies with fewer than `config.min_nodes` nodes produce no mesh and stay
/// unbuilt.
pub fn build_or_refresh(body: &mut JellyBody, config: &TopologyConfig) -> Option<MeshBuffer> {
    if body.node_count() < config.min_nodes {
        return None;
    }

    let positions = body.positions();

    if let TopologyState::Unbuilt = body.topology {
        let indices = proximity_triangles(&positions, body.center, config.proximity_threshold);
        debug!(
            "{}: built topology with {} triangles from {} nodes",
            body.id,
            indices.len() / 3,
            positions.len()
        );
        body.topology = TopologyState::Built(indices);
    }

    let indices = body.topology.indices()?;
    let normals = compute_vertex_normals(&positions, indices);
    Some(MeshBuffer::from_parts(&positions, &normals, indices))
}

/// Emit a triangle for every node triple whose pairwise distances are all
/// below `threshold`, wound so its normal faces away from `center`.
fn proximity_triangles(positions: &[Vec3], center: Vec3, threshold: f32) -> Vec<u32> {
    let n = positions.len();
    let threshold_sq = threshold * threshold;
    let close = |i: usize, j: usize| positions[i].distance_squared(positions[j]) < threshold_sq;

    let mut indices = Vec::new();
    for i in 0..n {
        for j in (i + 1)..n {
            if !close(i, j) {
                continue;
            }
            for k in (j + 1)..n {
                if !close(i, k) || !close(j, k) {
                    continue;
                }

                let (a, b, c) = (positions[i], positions[j], positions[k]);
                let normal = (b - a).cross(c - a);
                let outward = (a + b + c) / 3.0 - center;
                if normal.dot(outward) < 0.0 {
                    indices.extend([i as u32, k as u32, j as u32]);
                } else {
                    indices.extend([i as u32, j as u32, k as u32]);
                }
            }
        }
    }
    indices
}
