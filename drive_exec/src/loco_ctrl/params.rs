//! Parameters structure for LocoCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::kinematics::NUM_MODULES;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for Locomotion control.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    // ---- GEOMETRY ----
    /// The position of each module's steer axis in the robot body frame, in
    /// the order front left, front right, rear left, rear right.
    ///
    /// Units: meters,
    /// Frame: Robot body
    pub module_pos_m_rb: [[f64; 2]; NUM_MODULES],

    // ---- CAPABILITIES ----
    /// Maximum ground speed of any single module.
    ///
    /// Units: meters/second
    pub max_module_speed_ms: f64,
}
