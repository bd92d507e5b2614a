//! # Telecommand processor module
//!
//! The telecommand processor maps telecommands onto the drive controller's
//! commands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use std::{path::Path, sync::Arc};

// Internal
use crate::{
    drive_ctrl::{DriveCtrl, DriveCtrlError},
    hal::{ActuatorPort, SensorPort},
    loc::Pose,
    traj_ctrl::{TrajError, Trajectory},
};
use comms_if::tc::Tc;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur while executing a telecommand.
#[derive(Debug, thiserror::Error)]
pub enum TcExecError {
    #[error("{0:?} is not allowed in safe mode")]
    RejectedInSafe(Tc),

    #[error("Could not load trajectory: {0}")]
    TrajLoadError(#[from] TrajError),

    #[error(transparent)]
    DriveCtrlError(#[from] DriveCtrlError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute a telecommand.
///
/// Relative trajectory paths are resolved against `traj_dir`.
pub fn exec<H>(dc: &mut DriveCtrl<H>, tc: &Tc, traj_dir: &Path) -> Result<(), TcExecError>
where
    H: SensorPort + ActuatorPort,
{
    if dc.is_safe() && !tc.allowed_in_safe() {
        warn!("Rejecting {:?} while in safe mode", tc);
        return Err(TcExecError::RejectedInSafe(tc.clone()));
    }

    // Handle different Tcs
    match tc {
        Tc::MakeSafe => {
            debug!("Recieved MakeSafe command");
            dc.make_safe();
        }
        Tc::MakeUnsafe => {
            debug!("Recieved MakeUnsafe command");
            dc.make_unsafe();
        }
        Tc::Drive {
            x,
            y,
            rot,
            field_relative,
        } => dc.drive(*x, *y, *rot, *field_relative)?,
        Tc::FollowTraj { path } => {
            let path = traj_dir.join(path);
            debug!("Loading trajectory from {:?}", path);
            let traj = Trajectory::load(&path)?;
            dc.follow_traj(Arc::new(traj))?;
        }
        Tc::AbortTraj => dc.abort_traj(),
        Tc::SetPose {
            x_m,
            y_m,
            heading_rad,
        } => dc.set_pose(Pose::new(*x_m, *y_m, *heading_rad))?,
        Tc::ResetTranslation { x_m, y_m } => dc.reset_translation(*x_m, *y_m)?,
        Tc::ZeroHeading => dc.zero_heading()?,
        Tc::Raw {
            str_abs_pos_deg,
            drv_speed_ms,
        } => dc.set_raw(*str_abs_pos_deg, *drv_speed_ms)?,
        Tc::Stop => dc.stop(),
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        drive_ctrl::{DriveMode, Params},
        kinematics::NUM_MODULES,
        loc, loco_ctrl,
        sim::{SimBase, SimParams},
        traj_ctrl,
    };
    use std::path::PathBuf;

    fn drive_ctrl() -> DriveCtrl<SimBase> {
        let module_pos_m_rb = [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]];

        let params = Params {
            cycle_period_s: 0.02,
            max_vel_ms: 2.0,
            max_omega_rads: 4.0,
            max_accel_mss: 4.0,
            max_ang_accel_radss: 8.0,
            rot_deadband: 0.05,
            heading_hold: false,
            head_hold_k_p: 1.0,
            head_hold_k_i: 0.0,
            head_hold_k_d: 0.0,
            max_plausible_drv_speed_ms: 6.0,
            max_plausible_str_rate_degs: 3000.0,
            loco: loco_ctrl::Params {
                module_pos_m_rb,
                max_module_speed_ms: 3.0,
            },
        };
        let traj_params = traj_ctrl::Params {
            x_k_p: 1.0,
            x_k_i: 0.0,
            x_k_d: 0.0,
            y_k_p: 1.0,
            y_k_i: 0.0,
            y_k_d: 0.0,
            head_k_p: 1.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            max_fb_vel_ms: 0.5,
            max_fb_rate_rads: 1.0,
        };
        let sim = SimBase::new(
            SimParams {
                max_str_rate_degs: 1000.0,
                max_drv_accel_mss: 1000.0,
                gyro_drift_degs: 0.0,
                start_pose: Pose::default(),
            },
            module_pos_m_rb,
        )
        .unwrap();

        DriveCtrl::new(
            params,
            loc::Params::default(),
            traj_params,
            Pose::default(),
            sim,
        )
        .unwrap()
    }

    fn traj_dir() -> PathBuf {
        std::env::temp_dir()
    }

    #[test]
    fn test_tcs() {
        let mut dc = drive_ctrl();

        exec(
            &mut dc,
            &Tc::Drive {
                x: 0.5,
                y: 0.0,
                rot: 0.0,
                field_relative: true,
            },
            &traj_dir(),
        )
        .unwrap();
        assert_eq!(dc.mode(), DriveMode::Manual);

        exec(&mut dc, &Tc::Stop, &traj_dir()).unwrap();
        assert_eq!(dc.mode(), DriveMode::Stopped);

        exec(
            &mut dc,
            &Tc::SetPose {
                x_m: 1.0,
                y_m: 2.0,
                heading_rad: 0.5,
            },
            &traj_dir(),
        )
        .unwrap();
        assert_eq!(dc.get_pose(), Pose::new(1.0, 2.0, 0.5));

        exec(&mut dc, &Tc::ResetTranslation { x_m: 0.0, y_m: 0.0 }, &traj_dir()).unwrap();
        assert_eq!(dc.get_pose(), Pose::new(0.0, 0.0, 0.5));

        exec(&mut dc, &Tc::ZeroHeading, &traj_dir()).unwrap();
        assert_eq!(dc.get_pose(), Pose::new(0.0, 0.0, 0.0));

        exec(
            &mut dc,
            &Tc::Raw {
                str_abs_pos_deg: [0.0; NUM_MODULES],
                drv_speed_ms: [0.1; NUM_MODULES],
            },
            &traj_dir(),
        )
        .unwrap();
        assert_eq!(dc.mode(), DriveMode::Raw);
    }

    #[test]
    fn test_safe_mode_rejection() {
        let mut dc = drive_ctrl();

        exec(&mut dc, &Tc::MakeSafe, &traj_dir()).unwrap();
        assert!(dc.is_safe());

        let tc = Tc::FollowTraj {
            path: "does_not_exist.json".into(),
        };
        assert!(matches!(
            exec(&mut dc, &tc, &traj_dir()),
            Err(TcExecError::RejectedInSafe(_))
        ));

        exec(&mut dc, &Tc::AbortTraj, &traj_dir()).unwrap();
        exec(&mut dc, &Tc::MakeUnsafe, &traj_dir()).unwrap();
        assert!(!dc.is_safe());
    }

    #[test]
    fn test_follow_traj_from_file() {
        let mut dc = drive_ctrl();

        assert!(matches!(
            exec(
                &mut dc,
                &Tc::FollowTraj {
                    path: "drive_exec_tc_missing_traj.json".into()
                },
                &traj_dir()
            ),
            Err(TcExecError::TrajLoadError(TrajError::FileLoadError(_, _)))
        ));

        let path = traj_dir().join("drive_exec_tc_test_traj.json");
        std::fs::write(
            &path,
            r#"{"points": [
                {"t_s": 0.0, "pose": {"x_m": 0.0, "y_m": 0.0, "heading_rad": 0.0},
                 "vel": {"vx_ms": 0.2, "vy_ms": 0.0, "omega_rads": 0.0, "frame": "Field"}},
                {"t_s": 1.0, "pose": {"x_m": 0.2, "y_m": 0.0, "heading_rad": 0.0},
                 "vel": {"vx_ms": 0.2, "vy_ms": 0.0, "omega_rads": 0.0, "frame": "Field"}}
            ]}"#,
        )
        .unwrap();

        exec(
            &mut dc,
            &Tc::FollowTraj {
                path: "drive_exec_tc_test_traj.json".into(),
            },
            &traj_dir(),
        )
        .unwrap();
        assert_eq!(dc.mode(), DriveMode::FollowTraj);
        assert!(!dc.is_finished());

        std::fs::remove_file(&path).ok();
    }
}
