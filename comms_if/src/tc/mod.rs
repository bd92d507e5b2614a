//! # Telecommand module
//!
//! Telecommands are the instructions given to the drive executable by its
//! operator, either from a script or from a ground station. On the wire they
//! are JSON objects with a `type` and, for those commands that need one, a
//! `payload`:
//!
//! ```json
//! {"type": "SetPose", "payload": {"x_m": 1.0, "y_m": 2.0, "heading_rad": 0.0}}
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of swerve modules addressed by module level telecommands.
pub const NUM_MODULES: usize = 4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A telecommand, i.e. an instruction sent to the drive executable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Tc {
    /// Stop all motion and reject motion commands until `MakeUnsafe`.
    MakeSafe,

    /// Leave safe mode.
    MakeUnsafe,

    /// Manual teleoperated input.
    ///
    /// All axes are normalised to [-1, 1]: `x` is forwards, `y` is to the
    /// left and `rot` is counter-clockwise.
    Drive {
        x: f64,
        y: f64,
        rot: f64,
        field_relative: bool,
    },

    /// Begin following the trajectory stored in the given JSON file. Relative
    /// paths are taken from the `params/trajectories` directory.
    FollowTraj { path: String },

    /// Abort the current trajectory, leaving a zero velocity command.
    AbortTraj,

    /// Reset the estimated pose.
    SetPose { x_m: f64, y_m: f64, heading_rad: f64 },

    /// Reset the estimated position, keeping the current heading.
    ResetTranslation { x_m: f64, y_m: f64 },

    /// Make the current heading sensor reading the field zero.
    ZeroHeading,

    /// Diagnostic: directly set each module's continuous steer angle and
    /// drive speed.
    Raw {
        str_abs_pos_deg: [f64; NUM_MODULES],
        drv_speed_ms: [f64; NUM_MODULES],
    },

    /// Command zero velocity, holding the steer angles.
    Stop,
}

/// Possible parsing errors.
#[derive(Debug, Error)]
pub enum TcParseError {
    #[error("TC contains invalid JSON or is not a recognised TC: {0}")]
    InvalidJson(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Tc {
    /// Parse a new TC from a JSON packet
    pub fn from_json(json_str: &str) -> Result<Self, TcParseError> {
        serde_json::from_str(json_str).map_err(TcParseError::InvalidJson)
    }

    /// Serialise the TC into a JSON packet
    pub fn to_json(&self) -> Result<String, TcParseError> {
        serde_json::to_string(self).map_err(TcParseError::InvalidJson)
    }

    /// Returns true if this TC may be executed while in safe mode.
    pub fn allowed_in_safe(&self) -> bool {
        !matches!(
            self,
            Tc::Drive { .. } | Tc::FollowTraj { .. } | Tc::Raw { .. }
        )
    }
}
