//! # Localisation module
//!
//! Dead reckoning of the robot's pose in the field from the wheel derived
//! chassis velocity and the heading sensor.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod filters;
mod odometry;
mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::kinematics::Frame;

pub use filters::*;
pub use odometry::*;
pub use params::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The pose of the robot in the field frame.
///
/// Heading is counter clockwise positive from the field X axis, the opposite
/// polarity to the clockwise heading sensor. It is not wrapped, so that it
/// stays continuous while the robot spins.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Units: meters
    pub x_m: f64,

    /// Units: meters
    pub y_m: f64,

    /// Units: radians
    pub heading_rad: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in localisation.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LocError {
    #[error("The moving average window must contain at least one sample")]
    EmptyWindow,

    #[error("The fusion threshold must be finite and non-negative, got {0}")]
    InvalidFusionThreshold(f64),

    #[error("Cycle time step must be finite and non-negative, got {0}")]
    InvalidTimeStep(f64),

    #[error("Received a non-finite pose: {0:?}")]
    NonFinitePose(Pose),

    #[error("Odometry requires a robot frame velocity, got {0:?}")]
    WrongFrame(Frame),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            x_m,
            y_m,
            heading_rad,
        }
    }

    /// True if all fields are finite.
    pub fn is_finite(&self) -> bool {
        self.x_m.is_finite() && self.y_m.is_finite() && self.heading_rad.is_finite()
    }
}
