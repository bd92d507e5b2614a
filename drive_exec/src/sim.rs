//! # Simulated swerve base
//!
//! A kinematic simulation of the robot which implements both hardware ports,
//! used to exercise the drive controller without hardware.
//!
//! Steer axes slew towards their demands at a limited rate and wheel speeds
//! at a limited acceleration. The chassis moves with the least squares
//! velocity of its modules, so demands which the modules can't agree on
//! (for instance while steering) produce realistic tracking error. The
//! heading sensor reads clockwise positive and may drift.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Deserialize;

use crate::{
    hal::{ActuatorPort, EncoderSample, SensorPort},
    kinematics::{KinematicsError, ModuleState, SwerveKinematics, NUM_MODULES},
    loc::Pose,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters of the simulation.
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Maximum steer axis rate.
    ///
    /// Units: degrees/second
    pub max_str_rate_degs: f64,

    /// Maximum wheel acceleration.
    ///
    /// Units: meters/second^2
    pub max_drv_accel_mss: f64,

    /// Drift rate of the heading sensor.
    ///
    /// Units: degrees/second
    pub gyro_drift_degs: f64,

    /// True pose of the robot at the start of the simulation.
    pub start_pose: Pose,
}

/// The simulated robot.
#[derive(Debug, Clone)]
pub struct SimBase {
    params: SimParams,

    kin: SwerveKinematics,

    /// Simulation time
    time_s: f64,

    true_pose: Pose,

    /// Accumulated heading sensor drift
    gyro_bias_deg: f64,

    encoders: [EncoderSample; NUM_MODULES],

    dem_str_abs_pos_deg: [f64; NUM_MODULES],
    dem_drv_speed_ms: [f64; NUM_MODULES],

    heading_fault: bool,
    encoder_faults: [bool; NUM_MODULES],
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimBase {
    /// Create a new simulation with the given module positions.
    pub fn new(
        params: SimParams,
        module_pos_m_rb: [[f64; 2]; NUM_MODULES],
    ) -> Result<Self, KinematicsError> {
        Ok(Self {
            kin: SwerveKinematics::new(module_pos_m_rb)?,
            time_s: 0.0,
            true_pose: params.start_pose,
            gyro_bias_deg: 0.0,
            encoders: [EncoderSample::default(); NUM_MODULES],
            dem_str_abs_pos_deg: [0.0; NUM_MODULES],
            dem_drv_speed_ms: [0.0; NUM_MODULES],
            heading_fault: false,
            encoder_faults: [false; NUM_MODULES],
            params,
        })
    }

    /// Advance the simulation by `dt_s`.
    pub fn step(&mut self, dt_s: f64) {
        if dt_s <= 0.0 {
            return;
        }

        // Actuators
        let max_str_step_deg = self.params.max_str_rate_degs * dt_s;
        let max_drv_step_ms = self.params.max_drv_accel_mss * dt_s;

        let mut states = [ModuleState::default(); NUM_MODULES];

        for i in 0..NUM_MODULES {
            let e = &mut self.encoders[i];

            let str_step_deg = (self.dem_str_abs_pos_deg[i] - e.str_abs_pos_deg)
                .clamp(-max_str_step_deg, max_str_step_deg);
            e.str_abs_pos_deg += str_step_deg;
            e.str_rate_degs = str_step_deg / dt_s;

            e.drv_speed_ms += (self.dem_drv_speed_ms[i] - e.drv_speed_ms)
                .clamp(-max_drv_step_ms, max_drv_step_ms);
            e.drv_pos_m += e.drv_speed_ms * dt_s;

            states[i] = ModuleState::new(e.drv_speed_ms, e.str_abs_pos_deg);
        }

        // Chassis, heading first then position along the new heading
        let vel_rb = self.kin.inverse(&states);
        self.true_pose.heading_rad += vel_rb.omega_rads * dt_s;

        let vel_fld = vel_rb.to_field(self.true_pose.heading_rad);
        self.true_pose.x_m += vel_fld.vx_ms * dt_s;
        self.true_pose.y_m += vel_fld.vy_ms * dt_s;

        self.gyro_bias_deg += self.params.gyro_drift_degs * dt_s;
        self.time_s += dt_s;

        trace!("Sim t = {:.3} s, true pose {:?}", self.time_s, self.true_pose);
    }

    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// The ground truth pose.
    pub fn true_pose(&self) -> Pose {
        self.true_pose
    }

    /// Make the heading sensor report no reading.
    pub fn set_heading_fault(&mut self, fault: bool) {
        self.heading_fault = fault;
    }

    /// Make a module's encoders report no reading.
    pub fn set_encoder_fault(&mut self, module: usize, fault: bool) {
        if let Some(f) = self.encoder_faults.get_mut(module) {
            *f = fault;
        }
    }
}

impl SensorPort for SimBase {
    fn read_heading_deg(&mut self) -> Option<f64> {
        if self.heading_fault {
            None
        } else {
            Some(-self.true_pose.heading_rad.to_degrees() + self.gyro_bias_deg)
        }
    }

    fn read_encoder(&mut self, module: usize) -> Option<EncoderSample> {
        match self.encoder_faults.get(module) {
            Some(false) => self.encoders.get(module).copied(),
            _ => None,
        }
    }
}

impl ActuatorPort for SimBase {
    fn set_angle(&mut self, module: usize, str_abs_pos_deg: f64) {
        if let Some(d) = self.dem_str_abs_pos_deg.get_mut(module) {
            *d = str_abs_pos_deg;
        }
    }

    fn set_velocity(&mut self, module: usize, drv_speed_ms: f64) {
        if let Some(d) = self.dem_drv_speed_ms.get_mut(module) {
            *d = drv_speed_ms;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SQUARE_M: [[f64; 2]; NUM_MODULES] =
        [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]];

    fn params() -> SimParams {
        SimParams {
            max_str_rate_degs: 90.0,
            max_drv_accel_mss: 1.0,
            gyro_drift_degs: 0.0,
            start_pose: Pose::default(),
        }
    }

    #[test]
    fn test_actuator_limits() {
        let mut sim = SimBase::new(params(), SQUARE_M).unwrap();

        for i in 0..NUM_MODULES {
            sim.set_angle(i, 45.0);
            sim.set_velocity(i, 1.0);
        }
        sim.step(0.1);

        let e = sim.read_encoder(0).unwrap();
        assert_abs_diff_eq!(e.str_abs_pos_deg, 9.0, epsilon = 1e-9);
        assert_abs_diff_eq!(e.str_rate_degs, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(e.drv_speed_ms, 0.1, epsilon = 1e-9);
        assert_abs_diff_eq!(e.drv_pos_m, 0.01, epsilon = 1e-9);
    }

    #[test]
    fn test_spin() {
        let mut sim = SimBase::new(
            SimParams {
                max_str_rate_degs: 1e6,
                max_drv_accel_mss: 1e6,
                ..params()
            },
            SQUARE_M,
        )
        .unwrap();

        // Wheels tangential for counter clockwise rotation
        let angles = [135.0, 45.0, -135.0, -45.0];
        let r_m = 0.3 * 2f64.sqrt();
        for i in 0..NUM_MODULES {
            sim.set_angle(i, angles[i]);
            sim.set_velocity(i, r_m);
        }
        for _ in 0..10 {
            sim.step(0.1);
        }

        let pose = sim.true_pose();
        assert_abs_diff_eq!(pose.heading_rad, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.x_m, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y_m, 0.0, epsilon = 1e-9);

        // Heading sensor is clockwise positive
        assert_abs_diff_eq!(
            sim.read_heading_deg().unwrap(),
            -(1f64.to_degrees()),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_faults() {
        let mut sim = SimBase::new(params(), SQUARE_M).unwrap();

        sim.set_heading_fault(true);
        sim.set_encoder_fault(2, true);

        assert!(sim.read_heading_deg().is_none());
        assert!(sim.read_encoder(2).is_none());
        assert!(sim.read_encoder(1).is_some());
        assert!(sim.read_encoder(NUM_MODULES).is_none());
    }
}
