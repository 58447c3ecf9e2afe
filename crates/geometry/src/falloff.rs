//! Radial brush influence.
//!
//! Both the rigid-mesh push/pull brush and the jelly drag tool weight nearby
//! points by `(1 - distance / radius) ^ exponent`. The rigid brush uses an
//! exponent below one, which keeps weights high further out from the centre.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Falloff curve for brush influence.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Falloff {
    /// strength = 1 - distance/radius
    #[default]
    Linear,
    /// strength = (1 - distance/radius) ^ exponent
    Power(f32),
}

impl Falloff {
    /// Strength at a normalized distance (0.0 = center, 1.0 = edge).
    pub fn evaluate(&self, normalized_distance: f32) -> f32 {
        let t = 1.0 - normalized_distance.clamp(0.0, 1.0);
        match self {
            Falloff::Linear => t,
            Falloff::Power(exponent) => t.powf(*exponent),
        }
    }
}

/// A point inside the brush with its frozen weight and start position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    /// Index into the candidate slice
    pub index: usize,
    pub weight: f32,
    pub start: Vec3,
}

/// Weight every candidate within `radius` of `center`.
///
/// Returns an empty list when `radius <= 0` or nothing is in range.
pub fn compute_weights(
    center: Vec3,
    candidates: &[Vec3],
    radius: f32,
    falloff: Falloff,
) -> Vec<Influence> {
    if radius.is_nan() || radius <= 0.0 || !center.is_finite() {
        return Vec::new();
    }

    candidates
        .iter()
        .enumerate()
        .filter_map(|(index, &position)| {
            let distance = position.distance(center);
            (distance <= radius).then(|| Influence {
                index,
                weight: falloff.evaluate(distance / radius),
                start: position,
            })
        })
        .collect()
}
