//! Odometry estimator
//!
//! Integrates the chassis velocity into a field pose. The heading rate comes
//! either from the heading sensor or from the wheels: at low rates the gyro
//! signal is dominated by drift, so when its smoothed magnitude is below the
//! fusion threshold the wheel derived rotation rate is used instead.
//!
//! The heading sensor reads clockwise positive, so its signal is negated
//! before being differentiated. Everything downstream of that, including the
//! produced [`Pose`], is counter clockwise positive.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use serde::Serialize;

use super::{Derivative, Integral, LocError, MovingAverage, Params, Pose};
use crate::kinematics::{ChassisVel, Frame};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Dead reckoning pose estimator.
#[derive(Debug, Clone)]
pub struct Odometry {
    params: Params,

    x_m: Integral,
    y_m: Integral,
    heading_rad: Integral,

    /// Derivative of the negated heading sensor reading, degrees/second.
    gyro_rate: Derivative,

    /// Moving average of the magnitude of `gyro_rate`.
    gyro_rate_avg: MovingAverage,
}

/// Input data to the odometry estimator.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Heading sensor reading, clockwise positive.
    ///
    /// Units: degrees
    pub heading_deg: f64,

    /// Measured chassis velocity, robot frame.
    pub chassis_vel: ChassisVel,

    /// Time since the previous update.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// Status report for odometry processing.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq)]
pub struct StatusReport {
    /// Heading rate derived from the sensor, counter clockwise positive.
    ///
    /// Units: degrees/second
    pub gyro_rate_degs: f64,

    /// Moving average of the magnitude of the sensor heading rate.
    ///
    /// Units: degrees/second
    pub gyro_rate_avg_degs: f64,

    /// True if the sensor rate was integrated this cycle, false if the wheel
    /// rate was.
    pub using_gyro: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Odometry {
    /// Create a new estimator starting at the given pose.
    pub fn new(params: Params, start: Pose) -> Result<Self, LocError> {
        if params.rate_avg_window == 0 {
            return Err(LocError::EmptyWindow);
        }
        if !(params.fusion_threshold_degs.is_finite() && params.fusion_threshold_degs >= 0.0) {
            return Err(LocError::InvalidFusionThreshold(
                params.fusion_threshold_degs,
            ));
        }
        if !start.is_finite() {
            return Err(LocError::NonFinitePose(start));
        }

        Ok(Self {
            x_m: Integral::new(start.x_m),
            y_m: Integral::new(start.y_m),
            heading_rad: Integral::new(start.heading_rad),
            gyro_rate: Derivative::default(),
            gyro_rate_avg: MovingAverage::new(params.rate_avg_window),
            params,
        })
    }

    /// Get the current pose estimate.
    pub fn get_pose(&self) -> Pose {
        Pose {
            x_m: self.x_m.value(),
            y_m: self.y_m.value(),
            heading_rad: self.heading_rad.value(),
        }
    }

    /// Reseed all integrators to the given pose.
    pub fn set_pose(&mut self, pose: Pose) -> Result<(), LocError> {
        if !pose.is_finite() {
            return Err(LocError::NonFinitePose(pose));
        }

        self.x_m.set(pose.x_m);
        self.y_m.set(pose.y_m);
        self.heading_rad.set(pose.heading_rad);

        trace!("Odometry reseeded to {:?}", pose);

        Ok(())
    }

    /// Forget the heading sensor history.
    ///
    /// Must be called when the sensor reading jumps for a reason other than
    /// motion, for instance when its zero is moved.
    pub fn reset_gyro_rate(&mut self) {
        self.gyro_rate.reset();
        self.gyro_rate_avg.reset();
    }
}

impl State for Odometry {
    type InputData = InputData;
    type OutputData = Pose;
    type StatusReport = StatusReport;
    type ProcError = LocError;

    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let dt_s = input_data.dt_s;
        if !(dt_s.is_finite() && dt_s >= 0.0) {
            return Err(LocError::InvalidTimeStep(dt_s));
        }
        if input_data.chassis_vel.frame != Frame::Robot {
            return Err(LocError::WrongFrame(input_data.chassis_vel.frame));
        }

        let mut report = StatusReport::default();

        // Heading rate
        report.gyro_rate_degs = self.gyro_rate.sample(-input_data.heading_deg, dt_s);
        report.gyro_rate_avg_degs = self.gyro_rate_avg.sample(report.gyro_rate_degs.abs());
        report.using_gyro = report.gyro_rate_avg_degs >= self.params.fusion_threshold_degs;

        let rate_rads = if report.using_gyro {
            report.gyro_rate_degs.to_radians()
        } else {
            input_data.chassis_vel.omega_rads
        };

        let heading_rad = self.heading_rad.sample(rate_rads, dt_s);

        // Position, travel direction in the field is the robot frame
        // direction plus the freshly integrated heading
        let speed_ms = input_data.chassis_vel.speed_ms();
        let dir_rad = input_data
            .chassis_vel
            .vy_ms
            .atan2(input_data.chassis_vel.vx_ms)
            + heading_rad;

        self.x_m.sample(speed_ms * dir_rad.cos(), dt_s);
        self.y_m.sample(speed_ms * dir_rad.sin(), dt_s);

        let pose = self.get_pose();

        trace!("Odometry {:?}, {:?}", pose, report);

        Ok((pose, report))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const DT_S: f64 = 0.02;

    fn input(heading_deg: f64, chassis_vel: ChassisVel) -> InputData {
        InputData {
            heading_deg,
            chassis_vel,
            dt_s: DT_S,
        }
    }

    #[test]
    fn test_stationary() {
        let start = Pose::new(1.0, -2.0, 0.3);
        let mut odom = Odometry::new(Params::default(), start).unwrap();

        for _ in 0..1000 {
            let (pose, report) = odom.proc(&input(17.0, ChassisVel::zero_rb())).unwrap();
            assert_eq!(pose, start);
            assert!(!report.using_gyro);
        }
    }

    #[test]
    fn test_set_pose_exact() {
        let mut odom = Odometry::new(Params::default(), Pose::default()).unwrap();

        for _ in 0..10 {
            odom.proc(&input(0.0, ChassisVel::new_rb(1.0, 0.5, 0.2)))
                .unwrap();
        }

        let p = Pose::new(0.123456789, -9.87654321, -2.5);
        odom.set_pose(p).unwrap();
        assert_eq!(odom.get_pose(), p);

        assert!(matches!(
            odom.set_pose(Pose::new(f64::NAN, 0.0, 0.0)),
            Err(LocError::NonFinitePose(_))
        ));
        assert_eq!(odom.get_pose(), p);
    }

    #[test]
    fn test_straight_line() {
        let mut odom = Odometry::new(Params::default(), Pose::default()).unwrap();

        // 1 m/s forwards for 1 s
        for _ in 0..50 {
            odom.proc(&input(0.0, ChassisVel::new_rb(1.0, 0.0, 0.0)))
                .unwrap();
        }

        let pose = odom.get_pose();
        assert_abs_diff_eq!(pose.x_m, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y_m, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.heading_rad, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_heading_rotates_travel() {
        // Facing field +Y, driving robot forwards travels field +Y
        let mut odom =
            Odometry::new(Params::default(), Pose::new(0.0, 0.0, FRAC_PI_2)).unwrap();

        for _ in 0..50 {
            odom.proc(&input(-90.0, ChassisVel::new_rb(1.0, 0.0, 0.0)))
                .unwrap();
        }

        let pose = odom.get_pose();
        assert_abs_diff_eq!(pose.x_m, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(pose.y_m, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_gyro_fusion() {
        let params = Params {
            rate_avg_window: 1,
            fusion_threshold_degs: 1.0,
        };
        let mut odom = Odometry::new(params, Pose::default()).unwrap();

        // Seed the derivative
        odom.proc(&input(0.0, ChassisVel::zero_rb())).unwrap();

        // Gyro drifting clockwise at 0.5 deg/s while the wheels say we're
        // turning, the wheels are trusted
        let (_, report) = odom
            .proc(&input(0.5 * DT_S, ChassisVel::new_rb(0.0, 0.0, 1.0)))
            .unwrap();
        assert!(!report.using_gyro);
        assert_abs_diff_eq!(report.gyro_rate_degs, -0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(odom.get_pose().heading_rad, DT_S, epsilon = 1e-12);

        // Gyro turning clockwise at 90 deg/s, i.e. negative CCW rate, and
        // the wheels have slipped and see nothing
        let before = odom.get_pose().heading_rad;
        let (_, report) = odom
            .proc(&input(0.5 * DT_S + 90.0 * DT_S, ChassisVel::zero_rb()))
            .unwrap();
        assert!(report.using_gyro);
        assert_abs_diff_eq!(report.gyro_rate_degs, -90.0, epsilon = 1e-6);
        assert_abs_diff_eq!(
            odom.get_pose().heading_rad - before,
            -FRAC_PI_2 * DT_S,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_heading_polarity() {
        let params = Params {
            rate_avg_window: 1,
            fusion_threshold_degs: 1.0,
        };
        let mut odom = Odometry::new(params, Pose::default()).unwrap();

        // Sensor turning clockwise at 90 deg/s for 1 s with the wheels
        // slipping, the pose heading is the sensor reading negated
        let mut heading_deg = 0.0;
        odom.proc(&input(heading_deg, ChassisVel::zero_rb())).unwrap();
        for _ in 0..50 {
            heading_deg += 90.0 * DT_S;
            odom.proc(&input(heading_deg, ChassisVel::zero_rb()))
                .unwrap();
        }

        assert_abs_diff_eq!(
            odom.get_pose().heading_rad,
            -heading_deg.to_radians(),
            epsilon = 1e-9
        );
        assert_abs_diff_eq!(odom.get_pose().heading_rad, -FRAC_PI_2, epsilon = 1e-9);

        // Reseeding doesn't flip the sign
        let p = Pose::new(0.0, 0.0, -FRAC_PI_2);
        odom.set_pose(p).unwrap();
        assert_eq!(odom.get_pose(), p);
    }

    #[test]
    fn test_invalid() {
        assert_eq!(
            Odometry::new(
                Params {
                    rate_avg_window: 0,
                    fusion_threshold_degs: 1.0
                },
                Pose::default()
            )
            .unwrap_err(),
            LocError::EmptyWindow
        );

        let mut odom = Odometry::new(Params::default(), Pose::default()).unwrap();
        assert_eq!(
            odom.proc(&InputData {
                heading_deg: 0.0,
                chassis_vel: ChassisVel::zero_rb(),
                dt_s: -0.1
            })
            .unwrap_err(),
            LocError::InvalidTimeStep(-0.1)
        );

        // A field frame velocity would be rotated by the heading twice
        let pose = odom.get_pose();
        assert_eq!(
            odom.proc(&input(0.0, ChassisVel::new_fld(1.0, 0.0, 0.0)))
                .unwrap_err(),
            LocError::WrongFrame(Frame::Field)
        );
        assert_eq!(odom.get_pose(), pose);
    }
}
