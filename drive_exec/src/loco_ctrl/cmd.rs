//! Commands passed into LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;

use crate::kinematics::{ChassisVel, NUM_MODULES};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Commands that can be executed by LocoCtrl.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub enum LocoCmd {
    /// Drive the chassis at the given velocity, which must be in the robot
    /// frame.
    Vel(ChassisVel),

    /// Bring all wheels to zero speed, holding the current steer demands.
    Stop,

    /// Drive each module directly, bypassing the kinematics.
    Raw {
        /// Steer axis absolute position demands.
        ///
        /// Units: degrees
        str_abs_pos_deg: [f64; NUM_MODULES],

        /// Drive axis speed demands.
        ///
        /// Units: meters/second
        drv_speed_ms: [f64; NUM_MODULES],
    },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocoCmd {
    /// Returns true if every value in the command is finite.
    pub fn is_finite(&self) -> bool {
        match self {
            LocoCmd::Vel(v) => {
                v.vx_ms.is_finite() && v.vy_ms.is_finite() && v.omega_rads.is_finite()
            }
            LocoCmd::Stop => true,
            LocoCmd::Raw {
                str_abs_pos_deg,
                drv_speed_ms,
            } => str_abs_pos_deg
                .iter()
                .chain(drv_speed_ms.iter())
                .all(|v| v.is_finite()),
        }
    }
}
