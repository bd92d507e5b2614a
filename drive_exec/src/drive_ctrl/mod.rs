//! # Drive control module
//!
//! The drive controller runs the whole swerve control chain once per cycle:
//!
//! 1. Read and check the sensors.
//! 2. Estimate the chassis velocity from the modules and update odometry.
//! 3. Pick the velocity demand, either from the latest manual input or from
//!    the trajectory follower.
//! 4. Convert the demand into module setpoints with LocoCtrl.
//! 5. Send the setpoints to the actuators.
//!
//! Nothing in the cycle blocks or allocates. Commands (drive inputs, new
//! trajectories, pose resets) only update the controller's state, and take
//! effect on the next cycle.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod sens_mon;
mod slew;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

pub use params::*;
pub use sens_mon::*;
pub use slew::*;
pub use state::*;

use crate::{loc::LocError, loco_ctrl::LocoCtrlError, traj_ctrl::TrajCtrlError};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Operating modes of the drive controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriveMode {
    /// Tele-operated driving from the latest manual input.
    Manual,

    /// Autonomous following of a trajectory.
    FollowTraj,

    /// Zero velocity, wheels holding their direction.
    Stopped,

    /// Module setpoints given directly, bypassing the kinematics.
    Raw,
}

/// Errors which can occur in the drive controller.
#[derive(Debug, thiserror::Error)]
pub enum DriveCtrlError {
    #[error("Invalid parameter {0}: {1}")]
    InvalidParam(&'static str, f64),

    #[error("Command rejected, the drive is in safe mode")]
    SafeModeActive,

    #[error("Command rejected, received non-finite input")]
    NonFiniteInput,

    #[error("LocoCtrl error: {0}")]
    LocoCtrlError(#[from] LocoCtrlError),

    #[error("Localisation error: {0}")]
    LocError(#[from] LocError),

    #[error("TrajCtrl error: {0}")]
    TrajCtrlError(#[from] TrajCtrlError),
}
