//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Field X position controller proportional gain
    pub x_k_p: f64,

    /// Field X position controller integral gain
    pub x_k_i: f64,

    /// Field X position controller derivative gain
    pub x_k_d: f64,

    /// Field Y position controller proportional gain
    pub y_k_p: f64,

    /// Field Y position controller integral gain
    pub y_k_i: f64,

    /// Field Y position controller derivative gain
    pub y_k_d: f64,

    /// Heading controller proportional gain
    pub head_k_p: f64,

    /// Heading controller integral gain
    pub head_k_i: f64,

    /// Heading controller derivative gain
    pub head_k_d: f64,

    /// Limit on the magnitude of each linear feedback term.
    ///
    /// Units: meters/second
    pub max_fb_vel_ms: f64,

    /// Limit on the magnitude of the heading feedback term.
    ///
    /// Units: radians/second
    pub max_fb_rate_rads: f64,
}
