//! Speed and direction of a single swerve module

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::wrap_180;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Module velocities below this magnitude have no meaningful direction.
///
/// Units: meters/second
pub const MIN_DIRECTED_SPEED_MS: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Wheel speed and direction of a module.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleState {
    /// Wheel ground speed, may be negative for measured states.
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Wheel direction from RB_X towards RB_Y. Canonical `[-180, 180)` when
    /// produced by the kinematics, continuous when measured.
    ///
    /// Units: degrees
    pub angle_deg: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ModuleState {
    pub fn new(speed_ms: f64, angle_deg: f64) -> Self {
        Self {
            speed_ms,
            angle_deg,
        }
    }

    /// Build a state from a velocity vector in the RB frame.
    ///
    /// If the vector is too short to have a direction the state takes
    /// `fallback_angle_deg` and a zero speed.
    pub fn from_vector(vx_ms: f64, vy_ms: f64, fallback_angle_deg: f64) -> Self {
        let speed_ms = vx_ms.hypot(vy_ms);

        if speed_ms < MIN_DIRECTED_SPEED_MS {
            Self::new(0.0, fallback_angle_deg)
        } else {
            Self::new(speed_ms, wrap_180(vy_ms.atan2(vx_ms).to_degrees()))
        }
    }

    /// Velocity vector of the wheel in the RB frame.
    pub fn vector(&self) -> Vector2<f64> {
        let (s, c) = self.angle_deg.to_radians().sin_cos();
        Vector2::new(self.speed_ms * c, self.speed_ms * s)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_canonical_angle() {
        // Straight backwards lands on the lower bound
        let s = ModuleState::from_vector(-1.0, 0.0, 12.0);
        assert_abs_diff_eq!(s.speed_ms, 1.0);
        assert_abs_diff_eq!(s.angle_deg, -180.0);

        let s = ModuleState::from_vector(0.0, -2.0, 12.0);
        assert_abs_diff_eq!(s.speed_ms, 2.0);
        assert_abs_diff_eq!(s.angle_deg, -90.0);
    }

    #[test]
    fn test_fallback_angle() {
        let s = ModuleState::from_vector(0.0, 0.0, 42.0);
        assert_eq!(s, ModuleState::new(0.0, 42.0));
    }
}
