//! # Telemetry
//!
//! Snapshots of the drive controller's state, published each cycle by the
//! control loop and read at a lower rate by the telemetry task.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use std::sync::{Arc, Mutex, TryLockError};

use crate::{
    drive_ctrl::{DriveMode, SensFaults},
    kinematics::{ChassisVel, ModuleState, NUM_MODULES},
    loc::Pose,
    traj_ctrl,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The state of the drive controller at the end of a cycle.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TmSnapshot {
    /// Number of cycles executed
    pub cycle_count: u64,

    pub mode: DriveMode,

    pub safe: bool,

    pub pose: Pose,

    /// Chassis velocity estimated from the modules, robot frame.
    pub meas_vel: ChassisVel,

    /// Chassis velocity demanded this cycle, robot frame.
    pub cmd_vel: ChassisVel,

    /// Measured module states, canonical angles.
    pub module_states: [ModuleState; NUM_MODULES],

    pub sens_faults: SensFaults,

    /// Trajectory tracking errors, if a trajectory was followed this cycle.
    pub traj: Option<traj_ctrl::StatusReport>,
}

/// Flattened telemetry record for archiving.
#[derive(Debug, Clone, Serialize)]
pub struct TmRecord {
    pub time_s: f64,
    pub cycle_count: u64,
    pub mode: String,
    pub safe: bool,
    pub x_m: f64,
    pub y_m: f64,
    pub heading_rad: f64,
    pub meas_vx_ms: f64,
    pub meas_vy_ms: f64,
    pub meas_omega_rads: f64,
    pub cmd_vx_ms: f64,
    pub cmd_vy_ms: f64,
    pub cmd_omega_rads: f64,
    pub mod_0_speed_ms: f64,
    pub mod_0_angle_deg: f64,
    pub mod_1_speed_ms: f64,
    pub mod_1_angle_deg: f64,
    pub mod_2_speed_ms: f64,
    pub mod_2_angle_deg: f64,
    pub mod_3_speed_ms: f64,
    pub mod_3_angle_deg: f64,
    pub num_sens_faults: usize,
    pub traj_time_s: f64,
    pub traj_x_error_m: f64,
    pub traj_y_error_m: f64,
    pub traj_head_error_rad: f64,
}

/// Shared handle to the latest snapshot.
#[derive(Debug, Clone)]
pub struct TmHandle(Arc<Mutex<TmSnapshot>>);

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TmSnapshot {
    fn default() -> Self {
        Self {
            cycle_count: 0,
            mode: DriveMode::Stopped,
            safe: false,
            pose: Pose::default(),
            meas_vel: ChassisVel::zero_rb(),
            cmd_vel: ChassisVel::zero_rb(),
            module_states: [ModuleState::default(); NUM_MODULES],
            sens_faults: SensFaults::default(),
            traj: None,
        }
    }
}

impl TmRecord {
    pub fn new(time_s: f64, tm: &TmSnapshot) -> Self {
        let m = &tm.module_states;
        let traj = tm.traj.unwrap_or_default();

        Self {
            time_s,
            cycle_count: tm.cycle_count,
            mode: format!("{:?}", tm.mode),
            safe: tm.safe,
            x_m: tm.pose.x_m,
            y_m: tm.pose.y_m,
            heading_rad: tm.pose.heading_rad,
            meas_vx_ms: tm.meas_vel.vx_ms,
            meas_vy_ms: tm.meas_vel.vy_ms,
            meas_omega_rads: tm.meas_vel.omega_rads,
            cmd_vx_ms: tm.cmd_vel.vx_ms,
            cmd_vy_ms: tm.cmd_vel.vy_ms,
            cmd_omega_rads: tm.cmd_vel.omega_rads,
            mod_0_speed_ms: m[0].speed_ms,
            mod_0_angle_deg: m[0].angle_deg,
            mod_1_speed_ms: m[1].speed_ms,
            mod_1_angle_deg: m[1].angle_deg,
            mod_2_speed_ms: m[2].speed_ms,
            mod_2_angle_deg: m[2].angle_deg,
            mod_3_speed_ms: m[3].speed_ms,
            mod_3_angle_deg: m[3].angle_deg,
            num_sens_faults: tm.sens_faults.count(),
            traj_time_s: traj.traj_time_s,
            traj_x_error_m: traj.x_error_m,
            traj_y_error_m: traj.y_error_m,
            traj_head_error_rad: traj.head_error_rad,
        }
    }
}

impl TmHandle {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(TmSnapshot::default())))
    }

    /// Replace the shared snapshot.
    ///
    /// Never blocks. If a reader currently holds the snapshot the publish is
    /// skipped and `false` returned, the next cycle's publish will replace it.
    pub fn publish(&self, tm: &TmSnapshot) -> bool {
        match self.0.try_lock() {
            Ok(mut s) => {
                *s = *tm;
                true
            }
            Err(TryLockError::Poisoned(p)) => {
                *p.into_inner() = *tm;
                true
            }
            Err(TryLockError::WouldBlock) => false,
        }
    }

    /// Copy out the latest snapshot.
    pub fn latest(&self) -> TmSnapshot {
        match self.0.lock() {
            Ok(s) => *s,
            Err(p) => *p.into_inner(),
        }
    }
}

impl Default for TmHandle {
    fn default() -> Self {
        Self::new()
    }
}
