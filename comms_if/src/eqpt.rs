//! # Equipment Interface
//!
//! This module defines the data read from the drive equipment.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

/// Encoder readings of a single swerve module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderSample {
    /// Continuous absolute steer position, counter clockwise positive. Not
    /// wrapped, keeps counting through full turns.
    ///
    /// Units: degrees
    pub str_abs_pos_deg: f64,

    /// Units: degrees/second
    pub str_rate_degs: f64,

    /// Wheel ground speed.
    ///
    /// Units: meters/second
    pub drv_speed_ms: f64,

    /// Continuous distance rolled by the wheel.
    ///
    /// Units: meters
    pub drv_pos_m: f64,
}
