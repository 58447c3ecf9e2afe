//! Core sculpting types.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Brush behaviour for a rigid-mesh stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SculptTool {
    /// Target vertex follows the pointer exactly; neighbours follow by weight
    #[default]
    Push = 0,
    /// Every affected vertex eases toward the pointer by weight
    Pull = 1,
}

/// Viewpoint used to build the drag plane during a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    /// View direction, normalized on construction
    pub direction: Vec3,
}

impl Camera {
    pub fn new(position: Vec3, direction: Vec3) -> Self {
        Self {
            position,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Camera at `position` looking at `target`.
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self::new(position, target - position)
    }
}

/// Outcome of trying to start a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrokeStart {
    /// A stroke is already in progress; nothing changed
    AlreadyActive,
    /// The ray did not hit the mesh; nothing changed
    Missed,
    /// A stroke began on `target` with `affected` vertices in the snapshot
    Started { target: usize, affected: usize },
}

/// Committed geometry of a finished stroke.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeResult {
    pub tool: SculptTool,
    /// Final local-space vertex buffer
    pub vertices: Vec<Vec3>,
    /// Position of every touched vertex before the stroke, for undo
    pub original_positions: Vec<(usize, Vec3)>,
}
