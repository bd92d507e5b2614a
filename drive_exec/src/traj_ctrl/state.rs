//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::*;
use crate::kinematics::ChassisVel;
use crate::loc::Pose;
use util::{maths::ang_dist_pi, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory follower
#[derive(Debug, Clone)]
pub struct TrajCtrl {
    params: Params,

    /// Executing mode
    mode: TrajCtrlMode,

    /// The trajectory being followed
    traj: Option<Arc<Trajectory>>,

    /// Time since following started
    elapsed_s: f64,

    /// Controller objects used to calculate the feedback terms
    controllers: TrajControllers,
}

/// Input data to trajectory control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// The current pose estimate.
    pub pose: Pose,

    /// Time step to advance the trajectory clock by after this cycle.
    ///
    /// Units: seconds
    pub dt_s: f64,
}

/// The status report containing the tracking errors.
#[derive(Debug, Default, Copy, Clone, Serialize, PartialEq)]
pub struct StatusReport {
    /// Trajectory time at which the reference was sampled
    pub traj_time_s: f64,

    /// Reference minus estimated field X position
    pub x_error_m: f64,

    /// Reference minus estimated field Y position
    pub y_error_m: f64,

    /// Wrapped heading error
    pub head_error_rad: f64,

    /// True if any feedback term was limited
    pub fb_limited: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Controller gains and limits must be finite")]
    InvalidGains,

    #[error("Feedback limits must be non-negative")]
    InvalidLimits,

    #[error("No trajectory is being followed")]
    NoTrajectory,

    #[error("Cycle time step must be finite and non-negative, got {0}")]
    InvalidTimeStep(f64),
}

/// The possible modes of execution of TrajCtrl.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub enum TrajCtrlMode {
    Off,
    Following,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajCtrl {
    /// Create a new trajectory follower.
    pub fn new(params: Params) -> Result<Self, TrajCtrlError> {
        let controllers = TrajControllers::new(&params);

        if !controllers.is_finite()
            || !params.max_fb_vel_ms.is_finite()
            || !params.max_fb_rate_rads.is_finite()
        {
            return Err(TrajCtrlError::InvalidGains);
        }
        if params.max_fb_vel_ms < 0.0 || params.max_fb_rate_rads < 0.0 {
            return Err(TrajCtrlError::InvalidLimits);
        }

        Ok(Self {
            params,
            mode: TrajCtrlMode::Off,
            traj: None,
            elapsed_s: 0.0,
            controllers,
        })
    }

    /// Start following a new trajectory from its beginning, replacing any
    /// trajectory currently being followed.
    pub fn begin(&mut self, traj: Arc<Trajectory>) {
        info!(
            "Following new trajectory of {} points over {:.2} s",
            traj.points().len(),
            traj.total_time_s()
        );

        self.traj = Some(traj);
        self.elapsed_s = 0.0;
        self.controllers.reset();
        self.mode = TrajCtrlMode::Following;
    }

    /// Stop following the current trajectory.
    pub fn abort(&mut self) {
        if self.mode == TrajCtrlMode::Following {
            debug!("Trajectory following stopped at {:.2} s", self.elapsed_s);
        }

        self.traj = None;
        self.mode = TrajCtrlMode::Off;
    }

    pub fn mode(&self) -> TrajCtrlMode {
        self.mode
    }

    /// Time since following began.
    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    /// The trajectory being followed, if any.
    pub fn trajectory(&self) -> Option<&Arc<Trajectory>> {
        self.traj.as_ref()
    }

    /// True once the elapsed time has exceeded the trajectory's total time.
    ///
    /// Also true if no trajectory is being followed.
    pub fn is_finished(&self) -> bool {
        match self.traj {
            Some(ref t) => self.elapsed_s > t.total_time_s(),
            None => true,
        }
    }
}

impl State for TrajCtrl {
    type InputData = InputData;
    type OutputData = ChassisVel;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Calculate the field frame velocity demand for the current elapsed
    /// time, then advance the clock by `dt_s`.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let dt_s = input_data.dt_s;
        if !(dt_s.is_finite() && dt_s >= 0.0) {
            return Err(TrajCtrlError::InvalidTimeStep(dt_s));
        }

        let traj = self.traj.as_ref().ok_or(TrajCtrlError::NoTrajectory)?;
        let target = traj.sample(self.elapsed_s);
        let pose = &input_data.pose;

        let x_error_m = target.pose.x_m - pose.x_m;
        let y_error_m = target.pose.y_m - pose.y_m;
        let head_error_rad = ang_dist_pi(pose.heading_rad, target.pose.heading_rad);

        let mut fb_limited = false;
        let mut clamp = |v: f64, lim: f64| {
            let c = v.clamp(-lim, lim);
            fb_limited |= c != v;
            c
        };

        let fb_x = clamp(
            self.controllers.x_ctrl.get(x_error_m, dt_s),
            self.params.max_fb_vel_ms,
        );
        let fb_y = clamp(
            self.controllers.y_ctrl.get(y_error_m, dt_s),
            self.params.max_fb_vel_ms,
        );
        let fb_head = clamp(
            self.controllers.head_ctrl.get(head_error_rad, dt_s),
            self.params.max_fb_rate_rads,
        );

        let output = ChassisVel::new_fld(
            target.vel.vx_ms + fb_x,
            target.vel.vy_ms + fb_y,
            target.vel.omega_rads + fb_head,
        );

        let report = StatusReport {
            traj_time_s: self.elapsed_s,
            x_error_m,
            y_error_m,
            head_error_rad,
            fb_limited,
        };

        trace!("TrajCtrl output {:?}, {:?}", output, report);

        self.elapsed_s += dt_s;

        Ok((output, report))
    }
}
