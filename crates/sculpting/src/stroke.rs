//! Snapshot of one push/pull gesture.
//!
//! Weights and start positions are captured once when the stroke begins and
//! never change until it ends. Each update recomputes every affected vertex
//! from its start position, so the result depends only on the latest pointer
//! target and not on how many updates came before it.

use geometry::{compute_weights, Falloff, Influence};
use glam::Vec3;

use crate::types::SculptTool;

#[derive(Debug, Clone)]
pub struct BrushStroke {
    pub tool: SculptTool,
    pub brush_size: f32,
    /// Vertex the pointer grabbed
    pub target: usize,
    /// Local position of `target` when the stroke began
    pub target_start: Vec3,
    /// Vertices within `brush_size` of the target, weighted at stroke start
    pub affected: Vec<Influence>,
}

impl BrushStroke {
    /// Snapshot every vertex within `brush_size` of `target`.
    ///
    /// Returns `None` when `target` is not a vertex of `vertices`. A
    /// non-positive brush size gives an empty, inert snapshot.
    pub fn begin(
        tool: SculptTool,
        brush_size: f32,
        target: usize,
        vertices: &[Vec3],
        falloff: Falloff,
    ) -> Option<Self> {
        let target_start = *vertices.get(target)?;
        let affected = compute_weights(target_start, vertices, brush_size, falloff);
        Some(Self {
            tool,
            brush_size,
            target,
            target_start,
            affected,
        })
    }

    pub fn is_inert(&self) -> bool {
        self.affected.is_empty()
    }

    /// Move the affected vertices toward `new_target` (mesh-local).
    ///
    /// Push: the target lands exactly on `new_target` and every other vertex
    /// is offset from its start by `weight * (new_target - target_start)`.
    /// Pull: every vertex is lerped from its start toward `new_target` by
    /// `weight * pull_factor`.
    pub fn apply(&self, new_target: Vec3, pull_factor: f32, vertices: &mut [Vec3]) {
        let delta = new_target - self.target_start;
        for influence in &self.affected {
            let Some(vertex) = vertices.get_mut(influence.index) else {
                continue;
            };
            *vertex = match self.tool {
                SculptTool::Push if influence.index == self.target => new_target,
                SculptTool::Push => influence.start + delta * influence.weight,
                SculptTool::Pull => influence
                    .start
                    .lerp(new_target, influence.weight * pull_factor),
            };
        }
    }

    /// Put every affected vertex back where the stroke found it.
    pub fn restore(&self, vertices: &mut [Vec3]) {
        for influence in &self.affected {
            if let Some(vertex) = vertices.get_mut(influence.index) {
                *vertex = influence.start;
            }
        }
    }

    /// `(index, start position)` of every vertex the stroke can move.
    pub fn original_positions(&self) -> Vec<(usize, Vec3)> {
        self.affected.iter().map(|i| (i.index, i.start)).collect()
    }
}
