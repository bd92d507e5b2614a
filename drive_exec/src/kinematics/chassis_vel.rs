//! Chassis velocity and reference frames

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Planar velocity of the whole chassis.
///
/// The frame is carried with the value so that a field relative velocity can
/// never be passed where a robot relative one is expected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChassisVel {
    /// Velocity along the frame's X axis.
    ///
    /// Units: meters/second
    pub vx_ms: f64,

    /// Velocity along the frame's Y axis.
    ///
    /// Units: meters/second
    pub vy_ms: f64,

    /// Rotation rate about Z, counter clockwise positive. Identical in both
    /// frames.
    ///
    /// Units: radians/second
    pub omega_rads: f64,

    /// The frame in which `vx_ms` and `vy_ms` are expressed.
    pub frame: Frame,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reference frames for a chassis velocity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Robot body frame, X forwards and Y to the left.
    Robot,

    /// Field (world) frame, fixed to the playing area.
    Field,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ChassisVel {
    /// New velocity in the robot frame.
    pub fn new_rb(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: Frame::Robot,
        }
    }

    /// New velocity in the field frame.
    pub fn new_fld(vx_ms: f64, vy_ms: f64, omega_rads: f64) -> Self {
        Self {
            vx_ms,
            vy_ms,
            omega_rads,
            frame: Frame::Field,
        }
    }

    /// Zero velocity in the robot frame.
    pub fn zero_rb() -> Self {
        Self::new_rb(0.0, 0.0, 0.0)
    }

    /// Express this velocity in the robot frame, given the robot's heading in
    /// the field.
    pub fn to_robot(&self, heading_rad: f64) -> Self {
        match self.frame {
            Frame::Robot => *self,
            Frame::Field => {
                let (s, c) = (-heading_rad).sin_cos();
                Self::new_rb(
                    c * self.vx_ms - s * self.vy_ms,
                    s * self.vx_ms + c * self.vy_ms,
                    self.omega_rads,
                )
            }
        }
    }

    /// Express this velocity in the field frame, given the robot's heading in
    /// the field.
    pub fn to_field(&self, heading_rad: f64) -> Self {
        match self.frame {
            Frame::Field => *self,
            Frame::Robot => {
                let (s, c) = heading_rad.sin_cos();
                Self::new_fld(
                    c * self.vx_ms - s * self.vy_ms,
                    s * self.vx_ms + c * self.vy_ms,
                    self.omega_rads,
                )
            }
        }
    }

    /// Magnitude of the translational velocity.
    pub fn speed_ms(&self) -> f64 {
        self.vx_ms.hypot(self.vy_ms)
    }
}

impl Default for ChassisVel {
    fn default() -> Self {
        Self::zero_rb()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_frame_conversion() {
        // Robot facing field +Y, driving field +X means driving to its right
        let fld = ChassisVel::new_fld(1.0, 0.0, 0.5);
        let rb = fld.to_robot(FRAC_PI_2);

        assert_eq!(rb.frame, Frame::Robot);
        assert_abs_diff_eq!(rb.vx_ms, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(rb.vy_ms, -1.0, epsilon = 1e-12);
        assert_eq!(rb.omega_rads, 0.5);

        let back = rb.to_field(FRAC_PI_2);
        assert_eq!(back.frame, Frame::Field);
        assert_abs_diff_eq!(back.vx_ms, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(back.vy_ms, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_same_frame_is_identity() {
        let rb = ChassisVel::new_rb(0.3, -0.2, 1.0);
        assert_eq!(rb.to_robot(1.234), rb);

        let fld = ChassisVel::new_fld(0.3, -0.2, 1.0);
        assert_eq!(fld.to_field(1.234), fld);
    }
}
