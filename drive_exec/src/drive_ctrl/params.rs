//! Parameters structure for DriveCtrl

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::loco_ctrl;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive controller.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Period of the control cycle.
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    // ---- MANUAL DRIVING ----
    /// Linear velocity demanded by a full scale manual input.
    ///
    /// Units: meters/second
    pub max_vel_ms: f64,

    /// Rotation rate demanded by a full scale manual input.
    ///
    /// Units: radians/second
    pub max_omega_rads: f64,

    /// Limit on the rate of change of each manual linear velocity demand.
    ///
    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Limit on the rate of change of the manual rotation rate demand.
    ///
    /// Units: radians/second^2
    pub max_ang_accel_radss: f64,

    /// Normalised rotation inputs with a magnitude below this are treated as
    /// no rotation being requested.
    pub rot_deadband: f64,

    // ---- HEADING HOLD ----
    /// If true the heading is held while no rotation is requested.
    pub heading_hold: bool,

    pub head_hold_k_p: f64,
    pub head_hold_k_i: f64,
    pub head_hold_k_d: f64,

    // ---- SENSOR PLAUSIBILITY ----
    /// Units: meters/second
    pub max_plausible_drv_speed_ms: f64,

    /// Units: degrees/second
    pub max_plausible_str_rate_degs: f64,

    // ---- LOCOMOTION ----
    pub loco: loco_ctrl::Params,
}
