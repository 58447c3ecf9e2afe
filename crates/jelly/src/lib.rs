//! Jelly soft bodies for Clayground.
//!
//! Each body is a small cloud of point masses joined by damped springs,
//! integrated with semi-implicit Euler and clamped to a ground plane and a
//! square play area.
//!
//! # Architecture
//!
//! - **Types**: nodes, springs and the ids that address them
//! - **Body**: a node arena plus springs that refer into it by index
//! - **Solver**: force accumulation, integration and collision
//! - **Topology**: one-time proximity triangulation for rendering
//! - **Drag**: pin-and-follow interaction with a single node
//! - **Lifecycle**: create, split, merge and connect
//! - **World**: owns the bodies and drives them with a fixed timestep

pub mod body;
pub mod drag;
pub mod error;
pub mod lifecycle;
pub mod solver;
pub mod topology;
pub mod types;
pub mod world;

pub use body::JellyBody;
pub use drag::{end_drag, pin_node, start_drag, update_drag, DragState};
pub use error::JellyError;
pub use lifecycle::{closest_node_pair, LifecycleManager};
pub use solver::{step, step_all, StepReport};
pub use topology::{build_or_refresh, TopologyState};
pub use types::{BodyId, Color, NodeId, SoftBodyNode, Spring};
pub use world::{AdvanceReport, JellyWorld};
