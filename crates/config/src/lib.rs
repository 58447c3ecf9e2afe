//! Shared configuration for Clayground
//!
//! This crate is the single source of truth for every tuning constant used by
//! the jelly solver and the sculpting brushes. Every section deserializes with
//! `#[serde(default)]`, so a host can override a single field from JSON and
//! keep the defaults for the rest.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Upper bound for a single physics tick in seconds (one 60 Hz frame).
pub const MAX_FRAME_DELTA: f32 = 0.016;

/// Default fixed physics tick used by the frame driver.
pub const DEFAULT_FIXED_TIMESTEP: f32 = 1.0 / 240.0;

/// Default gravitational acceleration (Y is up)
pub const DEFAULT_GRAVITY: Vec3 = Vec3::new(0.0, -9.8, 0.0);

/// Height of the ground plane nodes rest on.
pub const DEFAULT_GROUND_HEIGHT: f32 = 0.1;

/// Half-extent of the square play area on X and Z.
pub const DEFAULT_BOUNDARY: f32 = 8.0;

/// Falloff exponent of the rigid-mesh push/pull brush.
pub const DEFAULT_SCULPT_FALLOFF_EXPONENT: f32 = 0.6;

/// Lerp factor applied to pull-brush weights.
pub const DEFAULT_PULL_FACTOR: f32 = 0.7;

/// Errors produced while loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Integration and collision settings for the spring-mass solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Constant acceleration applied to every node
    pub gravity: Vec3,
    /// Cap applied to any incoming frame delta (seconds)
    pub max_frame_delta: f32,
    /// Tick length used by the fixed-step driver (seconds)
    pub fixed_timestep: f32,
    /// Ticks the driver may run for one frame before dropping the remainder
    pub max_ticks_per_advance: u32,
    /// Per-tick velocity retention, applied regardless of dt
    pub velocity_retention: f32,
    /// Hard cap on node speed
    pub max_speed: f32,
    /// Minimum height of any unpinned node
    pub ground_height: f32,
    /// Fraction of vertical speed kept (and reversed) on ground contact
    pub ground_restitution: f32,
    /// Fraction of horizontal speed kept on ground contact
    pub ground_friction: f32,
    /// Half-extent of the play area on X and Z
    pub boundary: f32,
    /// Fraction of speed kept (and reversed) on boundary contact
    pub boundary_restitution: f32,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            max_frame_delta: MAX_FRAME_DELTA,
            fixed_timestep: DEFAULT_FIXED_TIMESTEP,
            max_ticks_per_advance: 8,
            velocity_retention: 0.99,
            max_speed: 50.0,
            ground_height: DEFAULT_GROUND_HEIGHT,
            ground_restitution: 0.5,
            ground_friction: 0.8,
            boundary: DEFAULT_BOUNDARY,
            boundary_restitution: 0.5,
        }
    }
}

/// Shape of the node cloud generated by the "add" tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyTemplateConfig {
    /// Nodes placed on the sphere around the centre node
    pub outer_nodes: usize,
    pub center_mass: f32,
    pub outer_mass: f32,
    /// Pairs closer than `radius * connect_factor` get a spring
    pub connect_factor: f32,
    pub spring_damping: f32,
}

impl Default for BodyTemplateConfig {
    fn default() -> Self {
        Self {
            outer_nodes: 12,
            center_mass: 0.5,
            outer_mass: 0.1,
            connect_factor: 2.5,
            spring_damping: 2.0,
        }
    }
}

/// Triangle extraction for soft-body rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Three nodes form a triangle when all pairwise distances are below this
    pub proximity_threshold: f32,
    /// Bodies with fewer nodes produce no mesh
    pub min_nodes: usize,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            proximity_threshold: 2.5,
            min_nodes: 4,
        }
    }
}

/// Split and merge behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Bodies whose centres are closer than this merge
    pub merge_distance: f32,
    /// Seconds of simulated time between merge scans
    pub merge_interval: f32,
    /// Connecting springs get this fraction of the bodies' stiffness
    pub stiffness_factor: f32,
    pub connect_damping: f32,
    /// Horizontal separation speed given to each half on split
    pub split_speed: f32,
    /// Upward speed given to both halves on split
    pub split_lift: f32,
    /// Max magnitude of the random Z jitter on split
    pub split_jitter: f32,
    /// Seed of the world RNG
    pub seed: u64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            merge_distance: 2.0,
            merge_interval: 0.5,
            stiffness_factor: 0.5,
            connect_damping: 2.0,
            split_speed: 2.0,
            split_lift: 1.0,
            split_jitter: 0.5,
            seed: 0x5eed_c1a7,
        }
    }
}

/// Jelly drag tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Nodes within this distance of the grabbed node follow it
    pub influence_radius: f32,
    /// Fraction of the grabbed node's motion applied at weight 1
    pub follow_strength: f32,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            influence_radius: 1.0,
            follow_strength: 0.5,
        }
    }
}

/// Rigid-mesh push/pull brush.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SculptConfig {
    pub falloff_exponent: f32,
    pub pull_factor: f32,
    /// Brush size used when the host does not pass one
    pub default_brush_size: f32,
}

impl Default for SculptConfig {
    fn default() -> Self {
        Self {
            falloff_exponent: DEFAULT_SCULPT_FALLOFF_EXPONENT,
            pull_factor: DEFAULT_PULL_FACTOR,
            default_brush_size: 0.5,
        }
    }
}

impl SculptConfig {
    /// The brush section on its own, for hosts that only sculpt.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("sculpt.falloff_exponent", self.falloff_exponent)?;
        unit_interval("sculpt.pull_factor", self.pull_factor)?;
        non_negative("sculpt.default_brush_size", self.default_brush_size)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClayConfig {
    pub solver: SolverConfig,
    pub template: BodyTemplateConfig,
    pub topology: TopologyConfig,
    pub merge: MergeConfig,
    pub drag: DragConfig,
    pub sculpt: SculptConfig,
}

impl ClayConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: ClayConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject values the solver or brushes cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.solver;
        if !s.gravity.is_finite() {
            return Err(invalid("solver.gravity must be finite"));
        }
        positive("solver.max_frame_delta", s.max_frame_delta)?;
        positive("solver.fixed_timestep", s.fixed_timestep)?;
        if s.max_ticks_per_advance == 0 {
            return Err(invalid("solver.max_ticks_per_advance must be at least 1"));
        }
        unit_interval("solver.velocity_retention", s.velocity_retention)?;
        positive("solver.max_speed", s.max_speed)?;
        unit_interval("solver.ground_restitution", s.ground_restitution)?;
        unit_interval("solver.ground_friction", s.ground_friction)?;
        unit_interval("solver.boundary_restitution", s.boundary_restitution)?;
        positive("solver.boundary", s.boundary)?;
        if s.fixed_timestep > s.max_frame_delta {
            return Err(invalid(
                "solver.fixed_timestep must not exceed solver.max_frame_delta",
            ));
        }
        if s.boundary <= s.ground_height {
            return Err(invalid("solver.boundary must exceed solver.ground_height"));
        }

        let t = &self.template;
        if t.outer_nodes == 0 {
            return Err(invalid("template.outer_nodes must be at least 1"));
        }
        positive("template.center_mass", t.center_mass)?;
        positive("template.outer_mass", t.outer_mass)?;
        positive("template.connect_factor", t.connect_factor)?;
        non_negative("template.spring_damping", t.spring_damping)?;

        positive("topology.proximity_threshold", self.topology.proximity_threshold)?;
        if self.topology.min_nodes < 3 {
            return Err(invalid("topology.min_nodes must be at least 3"));
        }

        let m = &self.merge;
        positive("merge.merge_distance", m.merge_distance)?;
        positive("merge.merge_interval", m.merge_interval)?;
        positive("merge.stiffness_factor", m.stiffness_factor)?;
        non_negative("merge.connect_damping", m.connect_damping)?;
        non_negative("merge.split_speed", m.split_speed)?;
        non_negative("merge.split_lift", m.split_lift)?;
        non_negative("merge.split_jitter", m.split_jitter)?;

        non_negative("drag.influence_radius", self.drag.influence_radius)?;
        unit_interval("drag.follow_strength", self.drag.follow_strength)?;

        self.sculpt.validate()
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}

fn positive(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be positive, got {value}")))
    }
}

fn non_negative(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must not be negative, got {value}")))
    }
}

fn unit_interval(name: &str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be in (0, 1], got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.solver.max_frame_delta, MAX_FRAME_DELTA);
        assert_eq!(config.solver.ground_height, 0.1);
        assert_eq!(config.template.outer_nodes, 12);
        assert_eq!(config.sculpt.falloff_exponent, 0.6);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config =
            ClayConfig::from_json_str(r#"{ "merge": { "merge_distance": 3.5 } }"#).unwrap();
        assert_eq!(config.merge.merge_distance, 3.5);
        assert_eq!(config.merge.merge_interval, 0.5);
        assert_eq!(config.solver, SolverConfig::default());
    }

    #[test]
    fn test_json_roundtrip() {
        let mut config = ClayConfig::default();
        config.solver.boundary = 12.0;
        let json = config.to_json_string().unwrap();
        let parsed = ClayConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_rejects_bad_values() {
        let err = ClayConfig::from_json_str(r#"{ "solver": { "fixed_timestep": 0.0 } }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = ClayConfig::from_json_str(r#"{ "sculpt": { "pull_factor": 1.5 } }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let err = ClayConfig::from_json_str(r#"{ "solver": { "fixed_timestep": 0.05 } }"#);
        assert!(matches!(err, Err(ConfigError::Invalid(_))));

        let sculpt = SculptConfig {
            falloff_exponent: f32::NAN,
            ..SculptConfig::default()
        };
        assert!(matches!(sculpt.validate(), Err(ConfigError::Invalid(_))));

        let err = ClayConfig::from_json_str("not json");
        assert!(matches!(err, Err(ConfigError::Parse(_))));
    }
}
