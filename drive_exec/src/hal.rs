//! # Hardware access layer
//!
//! The ports through which the drive controller reads the robot's sensors and
//! commands its actuators. Implementations must not block, each call is
//! expected to return the latest value the hardware has already made
//! available.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use comms_if::eqpt::EncoderSample;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Read access to the robot's sensors.
pub trait SensorPort {
    /// Heading sensor reading, field zeroed and clockwise positive, or `None`
    /// if the sensor has no valid reading.
    ///
    /// Units: degrees
    fn read_heading_deg(&mut self) -> Option<f64>;

    /// Encoder readings of the given module, or `None` if the module's
    /// encoders could not be read.
    fn read_encoder(&mut self, module: usize) -> Option<EncoderSample>;
}

/// Write access to the module actuators.
pub trait ActuatorPort {
    /// Demand a continuous absolute steer position.
    ///
    /// Units: degrees
    fn set_angle(&mut self, module: usize, str_abs_pos_deg: f64);

    /// Demand a wheel ground speed.
    ///
    /// Units: meters/second
    fn set_velocity(&mut self, module: usize, drv_speed_ms: f64);
}
