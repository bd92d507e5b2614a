//! # Trajectory control module
//!
//! Trajectory control keeps the robot on a precomputed, time parameterised
//! trajectory. Each cycle the trajectory is sampled at the time elapsed since
//! following began, giving a reference pose and a feedforward velocity. The
//! error between the reference and estimated pose is passed through one PID
//! controller per field axis (x, y and heading), and the controller outputs
//! are added to the feedforward velocity.
//!
//! The demand is produced in the field frame, it is up to the caller to
//! rotate it into the robot frame before passing it to the kinematics.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod state;
pub mod trajectory;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use controllers::*;
pub use params::Params;
pub use state::*;
pub use trajectory::*;
