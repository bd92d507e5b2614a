//! Locomotion control module
//!
//! Turns a robot frame chassis velocity demand into steer angle and drive
//! speed setpoints for each swerve module.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod cmd;
mod params;
mod state;
mod steer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use cmd::*;
pub use params::*;
pub use state::*;
pub use steer::*;

use crate::kinematics::KinematicsError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during LocoCtrl operation.
#[derive(Debug, thiserror::Error)]
pub enum LocoCtrlError {
    #[error("Kinematics error: {0}")]
    KinematicsError(#[from] KinematicsError),

    #[error("Maximum module speed must be positive and finite, got {0}")]
    InvalidMaxSpeed(f64),

    #[error("Received a non-finite command: {0:?}")]
    NonFiniteCmd(LocoCmd),
}
