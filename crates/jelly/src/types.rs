//! Core soft-body data: nodes, springs and identifiers.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// RGBA color, render-only.
pub type Color = [f32; 4];

/// Type-safe body identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "body#{}", self.0)
    }
}

/// Index of a node in its body's node arena.
///
/// Indices are only stable until the body is split or merged; both operations
/// produce new bodies with reindexed springs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        NodeId(index as u32)
    }
}

/// A point mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftBodyNode {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Accumulated force, reset at the start of every tick
    #[serde(skip)]
    pub force: Vec3,
    pub mass: f32,
    /// Position is driven externally; the solver does not integrate it
    pub pinned: bool,
    /// Set when the node produced a non-finite state; cleared by a drag
    #[serde(default)]
    pub frozen: bool,
    pub color: Color,
}

impl SoftBodyNode {
    pub fn new(position: Vec3, mass: f32, color: Color) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            force: Vec3::ZERO,
            mass,
            pinned: false,
            frozen: false,
            color,
        }
    }

    /// Whether the solver integrates this node.
    pub fn is_dynamic(&self) -> bool {
        !self.pinned && !self.frozen
    }
}

/// A damped spring between two nodes of the same body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub a: NodeId,
    pub b: NodeId,
    pub rest_length: f32,
    pub stiffness: f32,
    /// Damps relative velocity along the spring axis
    pub damping: f32,
}

impl Spring {
    /// Spring whose rest length is the current distance between `a` and `b`.
    pub fn between(
        nodes: &[SoftBodyNode],
        a: NodeId,
        b: NodeId,
        stiffness: f32,
        damping: f32,
    ) -> Option<Self> {
        let pa = nodes.get(a.index())?.position;
        let pb = nodes.get(b.index())?.position;
        Some(Self {
            a,
            b,
            rest_length: pa.distance(pb),
            stiffness,
            damping,
        })
    }

    /// Both endpoints index into an arena of `node_count` nodes.
    pub fn is_valid_for(&self, node_count: usize) -> bool {
        self.a.index() < node_count && self.b.index() < node_count && self.a != self.b
    }

    /// Same spring with both endpoints shifted by `offset` (used when
    /// concatenating node arenas).
    pub fn offset(&self, offset: usize) -> Self {
        Self {
            a: NodeId::from(self.a.index() + offset),
            b: NodeId::from(self.b.index() + offset),
            ..*self
        }
    }
}
