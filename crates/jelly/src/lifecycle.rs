//! Creating, splitting and merging jelly bodies.
//!
//! Structural operations never mutate a body in place: split and merge build
//! new bodies with fresh ids and reindexed springs, and the caller swaps them
//! in for the originals. This keeps node indices inside every body valid.

use std::collections::HashMap;
use std::f32::consts::TAU;

use clayground_config::{BodyTemplateConfig, MergeConfig};
use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use tracing::debug;

use crate::body::JellyBody;
use crate::error::JellyError;
use crate::types::{BodyId, Color, NodeId, SoftBodyNode, Spring};

/// Owns body id allocation, the split RNG, and the template/merge tuning.
#[derive(Debug, Clone)]
pub struct LifecycleManager {
    template: BodyTemplateConfig,
    merge: MergeConfig,
    next_id: u32,
    rng: Pcg32,
}

impl LifecycleManager {
    pub fn new(template: BodyTemplateConfig, merge: MergeConfig) -> Self {
        let rng = Pcg32::seed_from_u64(merge.seed);
        Self {
            template,
            merge,
            next_id: 0,
            rng,
        }
    }

    /// Hand out the next unused body id.
    pub fn allocate_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Build a body from the template: one heavy centre node plus
    /// `outer_nodes` light nodes on a sphere of `radius` around `center`.
    ///
    /// Every pair of nodes closer than `radius * connect_factor` is joined by
    /// a spring, which gives an overlapping, non-minimal spring network.
    pub fn create_body(
        &mut self,
        center: Vec3,
        radius: f32,
        stiffness: f32,
        color: Color,
    ) -> Result<JellyBody, JellyError> {
        if !center.is_finite() {
            return Err(JellyError::InvalidTemplate(format!(
                "center must be finite, got {center:?}"
            )));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(JellyError::InvalidTemplate(format!(
                "radius must be positive, got {radius}"
            )));
        }
        if !stiffness.is_finite() || stiffness <= 0.0 {
            return Err(JellyError::InvalidTemplate(format!(
                "stiffness must be positive, got {stiffness}"
            )));
        }
        let outer = self.template.outer_nodes;
        if outer == 0 {
            return Err(JellyError::InvalidTemplate(
                "template needs at least one outer node".to_string(),
            ));
        }

        let mut nodes = Vec::with_capacity(outer + 1);
        nodes.push(SoftBodyNode::new(center, self.template.center_mass, color));
        for i in 0..outer {
            nodes.push(SoftBodyNode::new(
                center + sphere_point(i, outer) * radius,
                self.template.outer_mass,
                color,
            ));
        }

        let connect_distance = radius * self.template.connect_factor;
        let mut springs = Vec::new();
        for a in 0..nodes.len() {
            for b in (a + 1)..nodes.len() {
                if nodes[a].position.distance(nodes[b].position) >= connect_distance {
                    continue;
                }
                springs.extend(Spring::between(
                    &nodes,
                    NodeId::from(a),
                    NodeId::from(b),
                    stiffness,
                    self.template.spring_damping,
                ));
            }
        }

        let id = self.allocate_id();
        let body = JellyBody::new(id, nodes, springs, color, stiffness);
        debug!(
            "{}: created with {} nodes and {} springs",
            id,
            body.node_count(),
            body.springs.len()
        );
        Ok(body)
    }

    /// Split a body into two halves at the midpoint of its node list.
    ///
    /// The partition is by index, not by position. Springs crossing the
    /// midpoint are severed. The halves get opposite impulses along X, a
    /// shared upward kick, and independent random jitter along Z.
    pub fn split_body(&mut self, body: &JellyBody) -> Result<[JellyBody; 2], JellyError> {
        let count = body.node_count();
        if count < 2 {
            return Err(JellyError::TooFewNodes {
                body: body.id,
                count,
            });
        }
        let mid = count / 2;

        let mut nodes = body.nodes.clone();
        // A node pinned only for a drag must not stay pinned in the children
        if let Some(drag) = &body.drag {
            if let Some(node) = nodes.get_mut(drag.node.index()) {
                node.pinned = drag.was_pinned;
            }
        }
        let second_nodes = nodes.split_off(mid);
        let first_nodes = nodes;

        let mut first_springs = Vec::new();
        let mut second_springs = Vec::new();
        let mut severed = 0;
        for spring in &body.springs {
            let (a, b) = (spring.a.index(), spring.b.index());
            match (a < mid, b < mid) {
                (true, true) => first_springs.push(*spring),
                (false, false) => second_springs.push(Spring {
                    a: NodeId::from(a - mid),
                    b: NodeId::from(b - mid),
                    ..*spring
                }),
                _ => severed += 1,
            }
        }

        let jitter = self.merge.split_jitter.max(0.0);
        let impulses = [
            Vec3::new(
                -self.merge.split_speed,
                self.merge.split_lift,
                self.rng.random_range(-jitter..=jitter),
            ),
            Vec3::new(
                self.merge.split_speed,
                self.merge.split_lift,
                self.rng.random_range(-jitter..=jitter),
            ),
        ];

        let [first_nodes, second_nodes] =
            [(first_nodes, impulses[0]), (second_nodes, impulses[1])].map(
                |(mut nodes, impulse)| {
                    for node in nodes.iter_mut().filter(|n| !n.pinned) {
                        node.velocity += impulse;
                    }
                    nodes
                },
            );

        let first_id = self.allocate_id();
        let second_id = self.allocate_id();
        let first = JellyBody::new(
            first_id,
            first_nodes,
            first_springs,
            body.color,
            body.stiffness,
        );
        let second = JellyBody::new(
            second_id,
            second_nodes,
            second_springs,
            body.color,
            body.stiffness,
        );

        debug!(
            "{}: split into {} ({} nodes) and {} ({} nodes), {} springs severed",
            body.id,
            first.id,
            first.node_count(),
            second.id,
            second.node_count(),
            severed
        );
        Ok([first, second])
    }

    /// Merge every group of bodies whose centres are within the merge
    /// distance of each other, transitively.
    ///
    /// Each detected pair is bridged by one spring between its closest nodes.
    /// Bodies with an active drag are left alone. Untouched bodies keep their
    /// ids and relative order; a merged body takes the slot of its first
    /// member.
    pub fn merge_if_close(&mut self, bodies: Vec<JellyBody>) -> Vec<JellyBody> {
        let n = bodies.len();
        let merge_distance = self.merge.merge_distance;

        let mut sets = DisjointSet::new(n);
        let mut pairs = Vec::new();
        for i in 0..n {
            if bodies[i].is_dragging() || bodies[i].nodes.is_empty() {
                continue;
            }
            for j in (i + 1)..n {
                if bodies[j].is_dragging() || bodies[j].nodes.is_empty() {
                    continue;
                }
                if bodies[i].center.distance(bodies[j].center) < merge_distance {
                    pairs.push((i, j));
                    sets.union(i, j);
                }
            }
        }

        if pairs.is_empty() {
            return bodies;
        }

        // Group members in input order
        let mut group_of_root: HashMap<usize, usize> = HashMap::new();
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for i in 0..n {
            let root = sets.find(i);
            let group = *group_of_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[group].push(i);
        }

        // Bridges are measured before any body is consumed
        let bridges: Vec<(usize, usize, NodeId, NodeId, f32)> = pairs
            .iter()
            .filter_map(|&(i, j)| {
                let (a, b, _) = closest_node_pair(&bodies[i], &bodies[j])?;
                let stiffness =
                    self.merge.stiffness_factor * 0.5 * (bodies[i].stiffness + bodies[j].stiffness);
                Some((i, j, a, b, stiffness))
            })
            .collect();

        let mut slots: Vec<Option<JellyBody>> = bodies.into_iter().map(Some).collect();
        let mut result = Vec::with_capacity(groups.len());

        for group in &groups {
            if group.len() == 1 {
                if let Some(body) = slots[group[0]].take() {
                    result.push(body);
                }
                continue;
            }

            let members: Vec<JellyBody> = group.iter().filter_map(|&i| slots[i].take()).collect();
            let mut offsets: HashMap<usize, usize> = HashMap::new();
            let mut nodes = Vec::new();
            let mut springs = Vec::new();
            for (&index, member) in group.iter().zip(&members) {
                offsets.insert(index, nodes.len());
                springs.extend(member.springs.iter().map(|s| s.offset(nodes.len())));
                nodes.extend(member.nodes.iter().cloned());
            }

            for &(i, j, a, b, stiffness) in &bridges {
                let (Some(&offset_i), Some(&offset_j)) = (offsets.get(&i), offsets.get(&j)) else {
                    continue;
                };
                springs.extend(Spring::between(
                    &nodes,
                    NodeId::from(offset_i + a.index()),
                    NodeId::from(offset_j + b.index()),
                    stiffness,
                    self.merge.connect_damping,
                ));
            }

            let stiffness =
                members.iter().map(|m| m.stiffness).sum::<f32>() / members.len() as f32;
            let color = members[0].color;
            let id = self.allocate_id();
            let merged = JellyBody::new(id, nodes, springs, color, stiffness);
            debug!(
                "merged {:?} into {} ({} nodes, {} springs)",
                members.iter().map(|m| m.id).collect::<Vec<_>>(),
                id,
                merged.node_count(),
                merged.springs.len()
            );
            result.push(merged);
        }

        result
    }

    /// Join two bodies into one regardless of distance, bridged by a single
    /// spring between their closest nodes.
    pub fn connect_bodies(&mut self, a: JellyBody, b: JellyBody) -> JellyBody {
        let bridge = closest_node_pair(&a, &b);
        let stiffness = self.merge.stiffness_factor * 0.5 * (a.stiffness + b.stiffness);
        let offset = a.node_count();

        let mut nodes = a.nodes;
        nodes.extend(b.nodes);
        let mut springs = a.springs;
        springs.extend(b.springs.iter().map(|s| s.offset(offset)));
        if let Some((na, nb, _)) = bridge {
            springs.extend(Spring::between(
                &nodes,
                na,
                NodeId::from(offset + nb.index()),
                stiffness,
                self.merge.connect_damping,
            ));
        }

        let id = self.allocate_id();
        debug!("connected {} and {} into {}", a.id, b.id, id);
        JellyBody::new(id, nodes, springs, a.color, 0.5 * (a.stiffness + b.stiffness))
    }
}

/// Unit-sphere point for outer node `i` of `count`:
/// `theta = 2π·i/count`, `phi = acos(2·i/count − 1)`.
fn sphere_point(i: usize, count: usize) -> Vec3 {
    let fraction = i as f32 / count as f32;
    let theta = TAU * fraction;
    let phi = (2.0 * fraction - 1.0).clamp(-1.0, 1.0).acos();
    Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin())
}

/// Closest pair of nodes across two bodies and their distance.
pub fn closest_node_pair(a: &JellyBody, b: &JellyBody) -> Option<(NodeId, NodeId, f32)> {
    let mut best: Option<(NodeId, NodeId, f32)> = None;
    for (i, na) in a.nodes.iter().enumerate() {
        for (j, nb) in b.nodes.iter().enumerate() {
            let distance = na.position.distance(nb.position);
            if best.is_none_or(|(_, _, d)| distance < d) {
                best = Some((NodeId::from(i), NodeId::from(j), distance));
            }
        }
    }
    best
}

/// Union-find over body indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = ra.min(rb);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = [1.0, 0.2, 0.2, 1.0];

    fn manager() -> LifecycleManager {
        LifecycleManager::new(BodyTemplateConfig::default(), MergeConfig::default())
    }

    #[test]
    fn test_create_body_template() {
        let mut lifecycle = manager();
        let center = Vec3::new(1.0, 3.0, -2.0);
        let body = lifecycle.create_body(center, 1.0, 50.0, RED).unwrap();

        assert_eq!(body.node_count(), 13);
        assert_eq!(body.nodes[0].position, center);
        assert_eq!(body.nodes[0].mass, 0.5);
        for node in &body.nodes[1..] {
            assert_eq!(node.mass, 0.1);
            assert!((node.position.distance(center) - 1.0).abs() < 1e-5);
        }

        // Radius 1 keeps every pair within 2.5, so the network is complete
        assert_eq!(body.springs.len(), 13 * 12 / 2);
        for spring in &body.springs {
            assert_eq!(spring.stiffness, 50.0);
            assert_eq!(spring.damping, 2.0);
            let pa = body.nodes[spring.a.index()].position;
            let pb = body.nodes[spring.b.index()].position;
            assert!((pa.distance(pb) - spring.rest_length).abs() < 1e-6);
        }
    }

    #[test]
    fn test_create_body_connectivity_rule() {
        let template = BodyTemplateConfig {
            connect_factor: 1.2,
            ..Default::default()
        };
        let mut lifecycle = LifecycleManager::new(template, MergeConfig::default());
        let body = lifecycle.create_body(Vec3::ZERO, 1.0, 50.0, RED).unwrap();

        for a in 0..body.node_count() {
            for b in (a + 1)..body.node_count() {
                let close = body.nodes[a].position.distance(body.nodes[b].position) < 1.2;
                let linked = body.springs.iter().any(|s| {
                    (s.a.index(), s.b.index()) == (a, b) || (s.a.index(), s.b.index()) == (b, a)
                });
                assert_eq!(close, linked);
            }
        }
        // The centre is linked to every outer node
        assert_eq!(body.spring_count_for(NodeId(0)), 12);
    }

    #[test]
    fn test_create_body_rejects_bad_input() {
        let mut lifecycle = manager();
        assert!(lifecycle.create_body(Vec3::ZERO, 0.0, 50.0, RED).is_err());
        assert!(lifecycle.create_body(Vec3::ZERO, 1.0, -5.0, RED).is_err());
        assert!(lifecycle.create_body(Vec3::NAN, 1.0, 5.0, RED).is_err());
    }

    #[test]
    fn test_ids_are_unique() {
        let mut lifecycle = manager();
        let a = lifecycle.create_body(Vec3::ZERO, 1.0, 50.0, RED).unwrap();
        let b = lifecycle.create_body(Vec3::ZERO, 1.0, 50.0, RED).unwrap();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_split_partitions_by_index() {
        let mut lifecycle = manager();
        let body = lifecycle.create_body(Vec3::new(0.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let [first, second] = lifecycle.split_body(&body).unwrap();

        assert_eq!(first.node_count() + second.node_count(), 13);
        assert_eq!(first.node_count(), 6);
        assert_eq!(first.nodes[0].position, body.nodes[0].position);
        assert_eq!(second.nodes[0].position, body.nodes[6].position);

        // Only intra-half springs survive, all reindexed into their child
        assert_eq!(first.springs.len(), 6 * 5 / 2);
        assert_eq!(second.springs.len(), 7 * 6 / 2);
        for spring in &first.springs {
            assert!(spring.is_valid_for(first.node_count()));
        }
        for spring in &second.springs {
            assert!(spring.is_valid_for(second.node_count()));
        }

        assert!(first.nodes.iter().all(|n| n.velocity.x < 0.0 && n.velocity.y > 0.0));
        assert!(second.nodes.iter().all(|n| n.velocity.x > 0.0 && n.velocity.y > 0.0));
        assert!(first.nodes.iter().all(|n| n.velocity.z.abs() <= 0.5));

        assert_ne!(first.id, body.id);
        assert_ne!(second.id, first.id);
        assert!(first.center.distance(body.center) > 0.0);
    }

    #[test]
    fn test_split_single_node_fails() {
        let mut lifecycle = manager();
        let body = JellyBody::new(
            BodyId(99),
            vec![SoftBodyNode::new(Vec3::ONE, 0.1, RED)],
            Vec::new(),
            RED,
            50.0,
        );
        assert_eq!(
            lifecycle.split_body(&body).unwrap_err(),
            JellyError::TooFewNodes {
                body: BodyId(99),
                count: 1
            }
        );
    }

    #[test]
    fn test_merge_two_close_bodies() {
        let mut lifecycle = manager();
        let a = lifecycle.create_body(Vec3::new(0.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let b = lifecycle.create_body(Vec3::new(1.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let spring_total = a.springs.len() + b.springs.len();

        let merged = lifecycle.merge_if_close(vec![a, b]);
        assert_eq!(merged.len(), 1);

        let body = &merged[0];
        assert_eq!(body.node_count(), 26);
        assert_eq!(body.springs.len(), spring_total + 1);

        let bridge = body.springs.last().unwrap();
        assert_eq!(bridge.stiffness, 25.0);
        assert!(bridge.a.index() < 13 && bridge.b.index() >= 13);
        assert!(body.springs.iter().all(|s| s.is_valid_for(26)));
    }

    #[test]
    fn test_merge_is_transitive() {
        let mut lifecycle = manager();
        let bodies: Vec<JellyBody> = [0.0, 1.5, 3.0]
            .iter()
            .map(|&x| lifecycle.create_body(Vec3::new(x, 2.0, 0.0), 0.5, 40.0, RED).unwrap())
            .collect();
        let springs: usize = bodies.iter().map(|b| b.springs.len()).sum();

        let merged = lifecycle.merge_if_close(bodies);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].node_count(), 39);
        // Two detected pairs (0-1 and 1-2), one bridge each
        assert_eq!(merged[0].springs.len(), springs + 2);
    }

    #[test]
    fn test_distant_bodies_untouched() {
        let mut lifecycle = manager();
        let a = lifecycle.create_body(Vec3::new(-4.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let b = lifecycle.create_body(Vec3::new(4.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let ids = (a.id, b.id);

        let result = lifecycle.merge_if_close(vec![a, b]);
        assert_eq!(result.len(), 2);
        assert_eq!((result[0].id, result[1].id), ids);
    }

    #[test]
    fn test_merge_keeps_unrelated_bodies() {
        let mut lifecycle = manager();
        let far = lifecycle.create_body(Vec3::new(-6.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let a = lifecycle.create_body(Vec3::new(3.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let b = lifecycle.create_body(Vec3::new(4.0, 2.0, 0.0), 1.0, 50.0, RED).unwrap();
        let far_id = far.id;

        let result = lifecycle.merge_if_close(vec![far, a, b]);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, far_id);
        assert_eq!(result[1].node_count(), 26);
    }

    #[test]
    fn test_connect_distant_bodies() {
        let mut lifecycle = manager();
        let a = lifecycle.create_body(Vec3::new(-4.0, 2.0, 0.0), 1.0, 60.0, RED).unwrap();
        let b = lifecycle.create_body(Vec3::new(4.0, 2.0, 0.0), 1.0, 20.0, RED).unwrap();
        let springs = a.springs.len() + b.springs.len();

        let joined = lifecycle.connect_bodies(a, b);
        assert_eq!(joined.node_count(), 26);
        assert_eq!(joined.springs.len(), springs + 1);
        assert_eq!(joined.stiffness, 40.0);

        let bridge = joined.springs.last().unwrap();
        assert_eq!(bridge.stiffness, 20.0);
        assert!(bridge.rest_length > 5.0);
    }

    #[test]
    fn test_closest_node_pair() {
        let a = JellyBody::new(
            BodyId(0),
            vec![
                SoftBodyNode::new(Vec3::ZERO, 0.1, RED),
                SoftBodyNode::new(Vec3::X, 0.1, RED),
            ],
            Vec::new(),
            RED,
            1.0,
        );
        let b = JellyBody::new(
            BodyId(1),
            vec![
                SoftBodyNode::new(Vec3::new(5.0, 0.0, 0.0), 0.1, RED),
                SoftBodyNode::new(Vec3::new(1.5, 0.0, 0.0), 0.1, RED),
            ],
            Vec::new(),
            RED,
            1.0,
        );
        let (na, nb, distance) = closest_node_pair(&a, &b).unwrap();
        assert_eq!((na, nb), (NodeId(1), NodeId(1)));
        assert!((distance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_set() {
        let mut sets = DisjointSet::new(5);
        sets.union(0, 1);
        sets.union(3, 4);
        sets.union(1, 4);
        assert_eq!(sets.find(0), sets.find(3));
        assert_ne!(sets.find(0), sets.find(2));
    }
}
