//! Drive controller state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::*;
use crate::{
    hal::{ActuatorPort, SensorPort},
    kinematics::{ChassisVel, ModuleState, NUM_MODULES},
    loc::{self, Odometry, Pose},
    loco_ctrl::{self, LocoCmd, LocoCtrl},
    tm::TmSnapshot,
    traj_ctrl::{self, PidController, TrajCtrl, Trajectory},
};
use util::{
    maths::{ang_dist_pi, wrap_180},
    module::State,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Swerve drive controller, owning the robot's hardware ports.
pub struct DriveCtrl<H> {
    params: Params,

    hw: H,

    mode: DriveMode,

    safe: bool,

    sens_mon: SensMon,
    loco_ctrl: LocoCtrl,
    odom: Odometry,
    traj_ctrl: TrajCtrl,

    // Manual driving
    manual_input: ManualInput,
    /// Manual input arrived while following a trajectory, manual mode is
    /// entered after one stopped cycle
    manual_pending: bool,
    slew_x: SlewRateLimiter,
    slew_y: SlewRateLimiter,
    slew_rot: SlewRateLimiter,

    // Heading hold
    head_hold_ctrl: PidController,
    held_heading_rad: Option<f64>,

    /// Module setpoints demanded in raw mode
    raw_cmd: LocoCmd,

    // Latest cycle data
    cycle_count: u64,
    sens: SensData,
    pose: Pose,
    meas_vel: ChassisVel,
    meas_states: [ModuleState; NUM_MODULES],
    cmd_vel: ChassisVel,
    traj_report: Option<traj_ctrl::StatusReport>,
}

/// The latest manual drive input, scaled into physical units.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct ManualInput {
    /// Units: meters/second
    x_ms: f64,

    /// Units: meters/second
    y_ms: f64,

    /// Units: radians/second
    rot_rads: f64,

    /// True if the rotation input was outside the deadband.
    rot_requested: bool,

    field_relative: bool,
}

/// Status report for one drive control cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    pub mode: DriveMode,

    pub safe: bool,

    pub sens_faults: SensFaults,

    pub loco: loco_ctrl::StatusReport,

    pub odom: loc::StatusReport,

    pub traj: Option<traj_ctrl::StatusReport>,

    /// True on the cycle a trajectory completed.
    pub traj_completed: bool,

    /// True if heading hold produced the rotation demand.
    pub holding_heading: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<H> DriveCtrl<H>
where
    H: SensorPort + ActuatorPort,
{
    /// Create a new drive controller starting at the given pose.
    ///
    /// The controller starts stopped and not in safe mode.
    pub fn new(
        params: Params,
        loc_params: loc::Params,
        traj_params: traj_ctrl::Params,
        start_pose: Pose,
        hw: H,
    ) -> Result<Self, DriveCtrlError> {
        check_param("cycle_period_s", params.cycle_period_s, false)?;
        check_param("max_vel_ms", params.max_vel_ms, false)?;
        check_param("max_omega_rads", params.max_omega_rads, false)?;
        check_param("max_accel_mss", params.max_accel_mss, false)?;
        check_param("max_ang_accel_radss", params.max_ang_accel_radss, false)?;
        check_param("rot_deadband", params.rot_deadband, true)?;
        check_param(
            "max_plausible_drv_speed_ms",
            params.max_plausible_drv_speed_ms,
            false,
        )?;
        check_param(
            "max_plausible_str_rate_degs",
            params.max_plausible_str_rate_degs,
            false,
        )?;
        for &(name, k) in [
            ("head_hold_k_p", params.head_hold_k_p),
            ("head_hold_k_i", params.head_hold_k_i),
            ("head_hold_k_d", params.head_hold_k_d),
        ]
        .iter()
        {
            if !k.is_finite() {
                return Err(DriveCtrlError::InvalidParam(name, k));
            }
        }

        let loco_ctrl = LocoCtrl::new(params.loco.clone())?;
        let odom = Odometry::new(loc_params, start_pose)?;
        let traj_ctrl = TrajCtrl::new(traj_params)?;

        let sens_mon = SensMon::new(SensLimits {
            max_drv_speed_ms: params.max_plausible_drv_speed_ms,
            max_str_rate_degs: params.max_plausible_str_rate_degs,
        });

        info!("DriveCtrl initialised at {:?}", start_pose);

        Ok(Self {
            mode: DriveMode::Stopped,
            safe: false,
            sens_mon,
            loco_ctrl,
            odom,
            traj_ctrl,
            manual_input: ManualInput::default(),
            manual_pending: false,
            slew_x: SlewRateLimiter::new(params.max_accel_mss),
            slew_y: SlewRateLimiter::new(params.max_accel_mss),
            slew_rot: SlewRateLimiter::new(params.max_ang_accel_radss),
            head_hold_ctrl: PidController::new(
                params.head_hold_k_p,
                params.head_hold_k_i,
                params.head_hold_k_d,
            ),
            held_heading_rad: None,
            raw_cmd: LocoCmd::Stop,
            cycle_count: 0,
            sens: SensData::default(),
            pose: start_pose,
            meas_vel: ChassisVel::zero_rb(),
            meas_states: [ModuleState::default(); NUM_MODULES],
            cmd_vel: ChassisVel::zero_rb(),
            traj_report: None,
            params,
            hw,
        })
    }

    // ---- COMMANDS ----

    /// Set the manual drive input.
    ///
    /// `x`, `y` and `rot` are normalised to `[-1, 1]` and clamped to it. When
    /// `field_relative` is true `x` and `y` are along the field axes,
    /// otherwise along the robot's. Takes over from any trajectory being
    /// followed, after one cycle commanding zero velocity.
    pub fn drive(
        &mut self,
        x: f64,
        y: f64,
        rot: f64,
        field_relative: bool,
    ) -> Result<(), DriveCtrlError> {
        if self.safe {
            return Err(DriveCtrlError::SafeModeActive);
        }
        if !(x.is_finite() && y.is_finite() && rot.is_finite()) {
            return Err(DriveCtrlError::NonFiniteInput);
        }

        let rot = rot.clamp(-1.0, 1.0);
        let rot_requested = rot.abs() >= self.params.rot_deadband;

        self.manual_input = ManualInput {
            x_ms: x.clamp(-1.0, 1.0) * self.params.max_vel_ms,
            y_ms: y.clamp(-1.0, 1.0) * self.params.max_vel_ms,
            rot_rads: if rot_requested {
                rot * self.params.max_omega_rads
            } else {
                0.0
            },
            rot_requested,
            field_relative,
        };

        match self.mode {
            DriveMode::Manual => (),
            DriveMode::FollowTraj => {
                info!("Manual input received, abandoning trajectory");
                self.traj_ctrl.abort();
                self.enter_mode(DriveMode::Stopped);
                self.manual_pending = true;
            }
            DriveMode::Stopped if self.manual_pending => (),
            _ => self.enter_mode(DriveMode::Manual),
        }

        Ok(())
    }

    /// Start following the given trajectory from its beginning.
    pub fn follow_traj(&mut self, traj: Arc<Trajectory>) -> Result<(), DriveCtrlError> {
        if self.safe {
            return Err(DriveCtrlError::SafeModeActive);
        }

        self.traj_ctrl.begin(traj);
        self.enter_mode(DriveMode::FollowTraj);

        Ok(())
    }

    /// Stop following the current trajectory, commanding zero velocity from
    /// the next cycle.
    pub fn abort_traj(&mut self) {
        if self.mode == DriveMode::FollowTraj {
            info!("Trajectory aborted");
            self.traj_ctrl.abort();
            self.enter_mode(DriveMode::Stopped);
        }
    }

    /// Command zero velocity from the next cycle, leaving any mode.
    pub fn stop(&mut self) {
        self.traj_ctrl.abort();
        self.enter_mode(DriveMode::Stopped);
    }

    /// Drive the modules directly with continuous steer positions and wheel
    /// speeds.
    pub fn set_raw(
        &mut self,
        str_abs_pos_deg: [f64; NUM_MODULES],
        drv_speed_ms: [f64; NUM_MODULES],
    ) -> Result<(), DriveCtrlError> {
        if self.safe {
            return Err(DriveCtrlError::SafeModeActive);
        }

        let cmd = LocoCmd::Raw {
            str_abs_pos_deg,
            drv_speed_ms,
        };
        if !cmd.is_finite() {
            return Err(DriveCtrlError::NonFiniteInput);
        }

        self.raw_cmd = cmd;
        self.traj_ctrl.abort();
        self.enter_mode(DriveMode::Raw);

        Ok(())
    }

    /// Reseed the pose estimate.
    pub fn set_pose(&mut self, pose: Pose) -> Result<(), DriveCtrlError> {
        self.odom.set_pose(pose)?;
        self.pose = pose;

        // Any held heading was relative to the old estimate
        self.held_heading_rad = None;

        info!("Pose set to {:?}", pose);

        Ok(())
    }

    /// Reseed the position estimate, keeping the current heading.
    pub fn reset_translation(&mut self, x_m: f64, y_m: f64) -> Result<(), DriveCtrlError> {
        let heading_rad = self.odom.get_pose().heading_rad;
        self.set_pose(Pose::new(x_m, y_m, heading_rad))
    }

    /// Make the current heading the field zero.
    pub fn zero_heading(&mut self) -> Result<(), DriveCtrlError> {
        self.sens_mon.zero_heading();
        self.odom.reset_gyro_rate();

        let pose = self.odom.get_pose();
        self.set_pose(Pose::new(pose.x_m, pose.y_m, 0.0))
    }

    /// Enter safe mode, stopping all motion and rejecting motion commands.
    pub fn make_safe(&mut self) {
        if !self.safe {
            warn!("Entering safe mode");
        }
        self.safe = true;
        self.stop();
    }

    /// Leave safe mode. The drive remains stopped until commanded.
    pub fn make_unsafe(&mut self) {
        if self.safe {
            info!("Leaving safe mode");
        }
        self.safe = false;
    }

    // ---- GETTERS ----

    pub fn get_pose(&self) -> Pose {
        self.pose
    }

    /// The chassis velocity estimated from the modules, robot frame.
    pub fn get_chassis_vel(&self) -> ChassisVel {
        self.meas_vel
    }

    /// The chassis velocity demanded on the last cycle, robot frame.
    pub fn get_cmd_vel(&self) -> ChassisVel {
        self.cmd_vel
    }

    /// Measured module states with canonical angles.
    pub fn get_module_states(&self) -> [ModuleState; NUM_MODULES] {
        self.meas_states
    }

    /// True once the trajectory being followed has completed, or if none is
    /// being followed.
    pub fn is_finished(&self) -> bool {
        self.traj_ctrl.is_finished()
    }

    pub fn mode(&self) -> DriveMode {
        self.mode
    }

    pub fn is_safe(&self) -> bool {
        self.safe
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    pub fn hw(&self) -> &H {
        &self.hw
    }

    pub fn hw_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// Telemetry snapshot of the last cycle.
    pub fn tm_snapshot(&self) -> TmSnapshot {
        TmSnapshot {
            cycle_count: self.cycle_count,
            mode: self.mode,
            safe: self.safe,
            pose: self.pose,
            meas_vel: self.meas_vel,
            cmd_vel: self.cmd_vel,
            module_states: self.meas_states,
            sens_faults: self.sens.faults,
            traj: self.traj_report,
        }
    }

    // ---- CYCLIC PROCESSING ----

    /// Run one control cycle.
    pub fn proc(&mut self) -> Result<StatusReport, DriveCtrlError> {
        let dt_s = self.params.cycle_period_s;

        // ---- SENSORS ----

        let raw_heading_deg = self.hw.read_heading_deg();
        let mut raw_encoders = [None; NUM_MODULES];
        for (i, e) in raw_encoders.iter_mut().enumerate() {
            *e = self.hw.read_encoder(i);
        }
        self.sens = self.sens_mon.check(raw_heading_deg, &raw_encoders);

        // ---- ODOMETRY ----

        let mut meas_states = [ModuleState::default(); NUM_MODULES];
        for (s, e) in meas_states.iter_mut().zip(self.sens.encoders.iter()) {
            *s = ModuleState::new(e.drv_speed_ms, e.str_abs_pos_deg);
        }
        self.meas_vel = self.loco_ctrl.kinematics().inverse(&meas_states);

        for s in meas_states.iter_mut() {
            s.angle_deg = wrap_180(s.angle_deg);
        }
        self.meas_states = meas_states;

        let (pose, odom_report) = self.odom.proc(&loc::InputData {
            heading_deg: self.sens.heading_deg,
            chassis_vel: self.meas_vel,
            dt_s,
        })?;
        self.pose = pose;

        // ---- DEMAND SELECTION ----

        let mut traj_completed = false;
        let mut holding_heading = false;
        self.traj_report = None;

        let cmd = match self.mode {
            DriveMode::Manual => {
                let (vel, holding) = self.calc_manual_vel(dt_s);
                holding_heading = holding;
                LocoCmd::Vel(vel)
            }
            DriveMode::FollowTraj => {
                if self.traj_ctrl.is_finished() {
                    info!("Trajectory complete");
                    traj_completed = true;
                    self.traj_ctrl.abort();
                    self.enter_mode(DriveMode::Stopped);
                    LocoCmd::Stop
                } else {
                    let (vel_fld, report) = self.traj_ctrl.proc(&traj_ctrl::InputData {
                        pose: self.pose,
                        dt_s,
                    })?;
                    self.traj_report = Some(report);
                    LocoCmd::Vel(vel_fld.to_robot(self.pose.heading_rad))
                }
            }
            DriveMode::Stopped => {
                if self.manual_pending {
                    self.enter_mode(DriveMode::Manual);
                }
                LocoCmd::Stop
            }
            DriveMode::Raw => self.raw_cmd,
        };

        self.cmd_vel = match cmd {
            LocoCmd::Vel(v) => v,
            _ => ChassisVel::zero_rb(),
        };

        // ---- MODULE SETPOINTS ----

        let mut str_abs_pos_deg = [0f64; NUM_MODULES];
        for (p, e) in str_abs_pos_deg.iter_mut().zip(self.sens.encoders.iter()) {
            *p = e.str_abs_pos_deg;
        }

        let (output, loco_report) = self.loco_ctrl.proc(&loco_ctrl::InputData {
            cmd,
            str_abs_pos_deg,
        })?;

        // ---- ACTUATORS ----

        for i in 0..NUM_MODULES {
            self.hw.set_angle(i, output.str_abs_pos_deg[i]);
            self.hw.set_velocity(i, output.drv_speed_ms[i]);
        }

        self.cycle_count += 1;

        let report = StatusReport {
            mode: self.mode,
            safe: self.safe,
            sens_faults: self.sens.faults,
            loco: loco_report,
            odom: odom_report,
            traj: self.traj_report,
            traj_completed,
            holding_heading,
        };

        trace!("DriveCtrl cycle {}: {:?}", self.cycle_count, report);

        Ok(report)
    }

    /// Stop the drive and run a final cycle so the zero demand reaches the
    /// actuators.
    pub fn shutdown(&mut self) -> Result<StatusReport, DriveCtrlError> {
        info!("Shutting down DriveCtrl");
        self.stop();
        self.proc()
    }

    /// Calculate the robot frame velocity demand from the manual input.
    ///
    /// Returns the demand and whether heading hold produced the rotation.
    fn calc_manual_vel(&mut self, dt_s: f64) -> (ChassisVel, bool) {
        let input = self.manual_input;

        let vx_ms = self.slew_x.calculate(input.x_ms, dt_s);
        let vy_ms = self.slew_y.calculate(input.y_ms, dt_s);
        let mut omega_rads = self.slew_rot.calculate(input.rot_rads, dt_s);

        let holding = self.params.heading_hold && !input.rot_requested;
        if holding {
            let target_rad = match self.held_heading_rad {
                Some(h) => h,
                None => {
                    debug!("Holding heading {:.3} rad", self.pose.heading_rad);
                    self.head_hold_ctrl.reset();
                    self.held_heading_rad = Some(self.pose.heading_rad);
                    self.pose.heading_rad
                }
            };

            let err_rad = ang_dist_pi(self.pose.heading_rad, target_rad);
            omega_rads = self
                .head_hold_ctrl
                .get(err_rad, dt_s)
                .clamp(-self.params.max_omega_rads, self.params.max_omega_rads);

            // Keep the rotation limiter in step so releasing the hold is
            // smooth
            self.slew_rot.reset(omega_rads);
        } else {
            self.held_heading_rad = None;
        }

        let vel = if input.field_relative {
            ChassisVel::new_fld(vx_ms, vy_ms, omega_rads).to_robot(self.pose.heading_rad)
        } else {
            ChassisVel::new_rb(vx_ms, vy_ms, omega_rads)
        };

        (vel, holding)
    }

    /// Switch mode, resetting the state which must start afresh in the new
    /// mode.
    fn enter_mode(&mut self, mode: DriveMode) {
        self.manual_pending = false;

        if mode == self.mode {
            return;
        }

        debug!("DriveCtrl mode {:?} -> {:?}", self.mode, mode);

        if mode == DriveMode::Manual {
            self.slew_x.reset(0.0);
            self.slew_y.reset(0.0);
            self.slew_rot.reset(0.0);
            self.held_heading_rad = None;
        }

        self.mode = mode;
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check a parameter is finite and positive, or non-negative if `allow_zero`.
fn check_param(name: &'static str, value: f64, allow_zero: bool) -> Result<(), DriveCtrlError> {
    let ok = value.is_finite() && (value > 0.0 || (allow_zero && value == 0.0));

    if ok {
        Ok(())
    } else {
        Err(DriveCtrlError::InvalidParam(name, value))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        kinematics::Frame,
        sim::{SimBase, SimParams},
        traj_ctrl::TrajPoint,
    };
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    const DT_S: f64 = 0.02;

    const SQUARE_M: [[f64; 2]; NUM_MODULES] =
        [[0.3, 0.3], [0.3, -0.3], [-0.3, 0.3], [-0.3, -0.3]];

    fn params() -> Params {
        Params {
            cycle_period_s: DT_S,
            max_vel_ms: 2.0,
            max_omega_rads: 4.0,
            max_accel_mss: 4.0,
            max_ang_accel_radss: 8.0,
            rot_deadband: 0.05,
            heading_hold: false,
            head_hold_k_p: 4.0,
            head_hold_k_i: 0.0,
            head_hold_k_d: 0.0,
            max_plausible_drv_speed_ms: 6.0,
            max_plausible_str_rate_degs: 3000.0,
            loco: loco_ctrl::Params {
                module_pos_m_rb: SQUARE_M,
                max_module_speed_ms: 3.0,
            },
        }
    }

    fn traj_params() -> traj_ctrl::Params {
        traj_ctrl::Params {
            x_k_p: 2.0,
            x_k_i: 0.0,
            x_k_d: 0.0,
            y_k_p: 2.0,
            y_k_i: 0.0,
            y_k_d: 0.0,
            head_k_p: 2.0,
            head_k_i: 0.0,
            head_k_d: 0.0,
            max_fb_vel_ms: 0.5,
            max_fb_rate_rads: 1.0,
        }
    }

    fn drive_ctrl_with(params: Params, start_pose: Pose) -> DriveCtrl<SimBase> {
        let sim = SimBase::new(
            SimParams {
                max_str_rate_degs: 1000.0,
                max_drv_accel_mss: 1000.0,
                gyro_drift_degs: 0.0,
                start_pose,
            },
            SQUARE_M,
        )
        .unwrap();

        DriveCtrl::new(params, loc::Params::default(), traj_params(), start_pose, sim).unwrap()
    }

    fn drive_ctrl(start_pose: Pose) -> DriveCtrl<SimBase> {
        drive_ctrl_with(params(), start_pose)
    }

    fn run(dc: &mut DriveCtrl<SimBase>, cycles: usize) -> StatusReport {
        let mut report = None;
        for _ in 0..cycles {
            report = Some(dc.proc().unwrap());
            dc.hw_mut().step(DT_S);
        }
        report.unwrap()
    }

    fn assert_pose_tracks_truth(dc: &DriveCtrl<SimBase>, epsilon: f64) {
        // The estimate lags the truth by the final simulation step
        let est = dc.get_pose();
        let truth = dc.hw().true_pose();
        assert_abs_diff_eq!(est.x_m, truth.x_m, epsilon = epsilon);
        assert_abs_diff_eq!(est.y_m, truth.y_m, epsilon = epsilon);
        assert_abs_diff_eq!(est.heading_rad, truth.heading_rad, epsilon = epsilon);
    }

    #[test]
    fn test_starts_stopped() {
        let mut dc = drive_ctrl(Pose::default());
        assert_eq!(dc.mode(), DriveMode::Stopped);
        assert!(!dc.is_safe());

        let report = run(&mut dc, 10);
        assert_eq!(report.mode, DriveMode::Stopped);
        assert!(!report.sens_faults.any());
        assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());
        assert_eq!(dc.get_pose(), Pose::default());
        assert_eq!(dc.cycle_count(), 10);
    }

    #[test]
    fn test_manual_robot_relative() {
        let mut dc = drive_ctrl(Pose::default());

        // Quarter speed forwards, 0.5 m/s
        dc.drive(0.25, 0.0, 0.0, false).unwrap();
        assert_eq!(dc.mode(), DriveMode::Manual);

        // Slew limited on the first cycle
        run(&mut dc, 1);
        assert_abs_diff_eq!(dc.get_cmd_vel().vx_ms, 4.0 * DT_S, epsilon = 1e-9);

        run(&mut dc, 49);
        assert_abs_diff_eq!(dc.get_cmd_vel().vx_ms, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(dc.get_chassis_vel().vx_ms, 0.5, epsilon = 1e-6);

        let pose = dc.get_pose();
        assert!(pose.x_m > 0.3);
        assert_abs_diff_eq!(pose.y_m, 0.0, epsilon = 1e-9);
        assert_pose_tracks_truth(&dc, 0.5 * DT_S + 1e-6);

        for s in dc.get_module_states().iter() {
            assert_abs_diff_eq!(s.angle_deg, 0.0, epsilon = 1e-9);
        }

        // Inputs are clamped
        dc.drive(5.0, 0.0, 0.0, false).unwrap();
        run(&mut dc, 100);
        assert_abs_diff_eq!(dc.get_cmd_vel().vx_ms, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_manual_field_relative() {
        // Facing field +Y
        let mut dc = drive_ctrl(Pose::new(0.0, 0.0, FRAC_PI_2));

        // Drive along field +X, which is to the robot's right
        dc.drive(0.5, 0.0, 0.0, true).unwrap();
        run(&mut dc, 50);

        let cmd = dc.get_cmd_vel();
        assert_eq!(cmd.frame, Frame::Robot);
        assert_abs_diff_eq!(cmd.vx_ms, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(cmd.vy_ms, -1.0, epsilon = 1e-6);

        for s in dc.get_module_states().iter() {
            assert_abs_diff_eq!(s.angle_deg, -90.0, epsilon = 1e-6);
        }

        let truth = dc.hw().true_pose();
        assert!(truth.x_m > 0.5);
        assert_abs_diff_eq!(truth.y_m, 0.0, epsilon = 0.05);
        assert_abs_diff_eq!(truth.heading_rad, FRAC_PI_2, epsilon = 1e-6);
        assert_pose_tracks_truth(&dc, DT_S + 1e-6);
    }

    #[test]
    fn test_follow_straight_traj() {
        let mut dc = drive_ctrl(Pose::default());

        let traj = Arc::new(
            Trajectory::new(vec![
                TrajPoint {
                    t_s: 0.0,
                    pose: Pose::new(0.0, 0.0, 0.0),
                    vel: ChassisVel::new_fld(0.5, 0.0, 0.0),
                },
                TrajPoint {
                    t_s: 2.0,
                    pose: Pose::new(1.0, 0.0, 0.0),
                    vel: ChassisVel::new_fld(0.5, 0.0, 0.0),
                },
            ])
            .unwrap(),
        );

        dc.follow_traj(traj).unwrap();
        assert_eq!(dc.mode(), DriveMode::FollowTraj);
        assert!(!dc.is_finished());

        let mut completed_at = None;
        for i in 0..200 {
            let report = run(&mut dc, 1);

            if report.traj_completed {
                assert_eq!(report.mode, DriveMode::Stopped);
                assert!(report.traj.is_none());
                assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());
                completed_at = Some(i);
                break;
            }

            let traj_report = report.traj.unwrap();
            assert_abs_diff_eq!(traj_report.x_error_m, 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(traj_report.y_error_m, 0.0, epsilon = 1e-6);
        }

        let completed_at = completed_at.unwrap();
        assert!(completed_at >= 100 && completed_at <= 102);
        assert!(dc.is_finished());

        let truth = dc.hw().true_pose();
        assert_abs_diff_eq!(truth.x_m, 1.0, epsilon = 0.05);
        assert_abs_diff_eq!(truth.y_m, 0.0, epsilon = 1e-6);

        // Stays stopped
        run(&mut dc, 5);
        assert_eq!(dc.mode(), DriveMode::Stopped);
        assert_abs_diff_eq!(dc.get_chassis_vel().vx_ms, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_follow_corrects_offset() {
        // Start 0.2 m to the side of a stationary target
        let mut dc = drive_ctrl(Pose::new(0.0, 0.2, 0.0));

        let traj = Arc::new(
            Trajectory::new(vec![TrajPoint {
                t_s: 3.0,
                pose: Pose::new(0.0, 0.0, 0.0),
                vel: ChassisVel::new_fld(0.0, 0.0, 0.0),
            }])
            .unwrap(),
        );

        dc.follow_traj(traj).unwrap();
        run(&mut dc, 140);

        assert_eq!(dc.mode(), DriveMode::FollowTraj);
        assert_abs_diff_eq!(dc.hw().true_pose().y_m, 0.0, epsilon = 0.01);
    }

    #[test]
    fn test_abort_commands_zero() {
        let mut dc = drive_ctrl(Pose::default());

        let traj = Arc::new(
            Trajectory::new(vec![
                TrajPoint {
                    t_s: 0.0,
                    pose: Pose::new(0.0, 0.0, 0.0),
                    vel: ChassisVel::new_fld(1.0, 0.0, 0.0),
                },
                TrajPoint {
                    t_s: 5.0,
                    pose: Pose::new(5.0, 0.0, 0.0),
                    vel: ChassisVel::new_fld(1.0, 0.0, 0.0),
                },
            ])
            .unwrap(),
        );

        dc.follow_traj(traj).unwrap();
        run(&mut dc, 10);
        assert!(dc.get_cmd_vel().vx_ms > 0.9);

        dc.abort_traj();
        assert_eq!(dc.mode(), DriveMode::Stopped);

        run(&mut dc, 1);
        assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());
        for i in 0..NUM_MODULES {
            assert_eq!(dc.hw_mut().read_encoder(i).unwrap().drv_speed_ms, 0.0);
        }
    }

    #[test]
    fn test_manual_takeover_stops_first() {
        let mut dc = drive_ctrl(Pose::default());

        let traj = Arc::new(
            Trajectory::new(vec![
                TrajPoint {
                    t_s: 0.0,
                    pose: Pose::new(0.0, 0.0, 0.0),
                    vel: ChassisVel::new_fld(1.0, 0.0, 0.0),
                },
                TrajPoint {
                    t_s: 5.0,
                    pose: Pose::new(5.0, 0.0, 0.0),
                    vel: ChassisVel::new_fld(1.0, 0.0, 0.0),
                },
            ])
            .unwrap(),
        );

        dc.follow_traj(traj).unwrap();
        run(&mut dc, 10);
        assert!(dc.get_cmd_vel().vx_ms > 0.9);

        dc.drive(1.0, 0.0, 0.0, false).unwrap();
        assert_eq!(dc.mode(), DriveMode::Stopped);
        assert!(dc.is_finished());

        // Repeated input while the stop is pending doesn't skip it
        dc.drive(1.0, 0.0, 0.0, false).unwrap();

        run(&mut dc, 1);
        assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());
        for i in 0..NUM_MODULES {
            assert_eq!(dc.hw_mut().read_encoder(i).unwrap().drv_speed_ms, 0.0);
        }
        assert_eq!(dc.mode(), DriveMode::Manual);

        // Manual demand then ramps up from zero
        run(&mut dc, 1);
        assert_abs_diff_eq!(dc.get_cmd_vel().vx_ms, 4.0 * DT_S, epsilon = 1e-9);
    }

    #[test]
    fn test_stop_cancels_pending_manual() {
        let mut dc = drive_ctrl(Pose::default());

        let traj = Arc::new(
            Trajectory::new(vec![TrajPoint {
                t_s: 5.0,
                pose: Pose::new(1.0, 0.0, 0.0),
                vel: ChassisVel::new_fld(0.0, 0.0, 0.0),
            }])
            .unwrap(),
        );

        dc.follow_traj(traj).unwrap();
        run(&mut dc, 5);

        dc.drive(1.0, 0.0, 0.0, false).unwrap();
        dc.stop();

        run(&mut dc, 3);
        assert_eq!(dc.mode(), DriveMode::Stopped);
        assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());
    }

    #[test]
    fn test_shutdown_zeroes_actuators() {
        let mut dc = drive_ctrl(Pose::default());

        dc.drive(0.5, 0.0, 0.0, false).unwrap();
        run(&mut dc, 50);
        assert!(dc.hw_mut().read_encoder(0).unwrap().drv_speed_ms > 0.9);

        let report = dc.shutdown().unwrap();
        assert_eq!(report.mode, DriveMode::Stopped);
        assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());

        dc.hw_mut().step(DT_S);
        for i in 0..NUM_MODULES {
            assert_eq!(dc.hw_mut().read_encoder(i).unwrap().drv_speed_ms, 0.0);
        }
    }

    #[test]
    fn test_safe_mode() {
        let mut dc = drive_ctrl(Pose::default());

        dc.drive(1.0, 0.0, 0.0, false).unwrap();
        run(&mut dc, 20);

        dc.make_safe();
        assert!(dc.is_safe());
        assert_eq!(dc.mode(), DriveMode::Stopped);

        assert!(matches!(
            dc.drive(1.0, 0.0, 0.0, false),
            Err(DriveCtrlError::SafeModeActive)
        ));
        assert!(matches!(
            dc.set_raw([0.0; NUM_MODULES], [1.0; NUM_MODULES]),
            Err(DriveCtrlError::SafeModeActive)
        ));

        let report = run(&mut dc, 1);
        assert!(report.safe);
        assert_eq!(dc.get_cmd_vel(), ChassisVel::zero_rb());

        // Pose commands are still accepted
        dc.set_pose(Pose::new(1.0, 1.0, 0.0)).unwrap();

        dc.make_unsafe();
        assert_eq!(dc.mode(), DriveMode::Stopped);
        dc.drive(1.0, 0.0, 0.0, false).unwrap();
        assert_eq!(dc.mode(), DriveMode::Manual);
    }

    #[test]
    fn test_raw_mode() {
        let mut dc = drive_ctrl(Pose::default());

        dc.set_raw([90.0, 90.0, 450.0, -270.0], [0.0; NUM_MODULES])
            .unwrap();
        assert_eq!(dc.mode(), DriveMode::Raw);
        run(&mut dc, 30);

        let encs: Vec<_> = (0..NUM_MODULES)
            .map(|i| dc.hw_mut().read_encoder(i).unwrap())
            .collect();
        assert_abs_diff_eq!(encs[0].str_abs_pos_deg, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(encs[2].str_abs_pos_deg, 450.0, epsilon = 1e-9);
        assert_abs_diff_eq!(encs[3].str_abs_pos_deg, -270.0, epsilon = 1e-9);

        // Measured states are reported canonically
        assert_abs_diff_eq!(dc.get_module_states()[2].angle_deg, 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dc.get_module_states()[3].angle_deg, 90.0, epsilon = 1e-9);

        assert!(matches!(
            dc.set_raw([f64::NAN; NUM_MODULES], [0.0; NUM_MODULES]),
            Err(DriveCtrlError::NonFiniteInput)
        ));

        dc.drive(0.0, 0.0, 0.0, false).unwrap();
        assert_eq!(dc.mode(), DriveMode::Manual);
    }

    #[test]
    fn test_pose_resets() {
        let mut dc = drive_ctrl(Pose::default());

        dc.drive(0.0, 0.0, 0.5, false).unwrap();
        run(&mut dc, 50);
        dc.stop();
        run(&mut dc, 5);

        let heading_rad = dc.get_pose().heading_rad;
        assert!(heading_rad > 0.5);

        dc.reset_translation(3.0, -1.0).unwrap();
        assert_eq!(dc.get_pose(), Pose::new(3.0, -1.0, heading_rad));

        dc.zero_heading().unwrap();
        assert_eq!(dc.get_pose(), Pose::new(3.0, -1.0, 0.0));

        // No spurious rotation from the heading sensor's jump
        run(&mut dc, 20);
        assert_eq!(dc.get_pose(), Pose::new(3.0, -1.0, 0.0));

        let p = Pose::new(-2.0, 4.0, 1.0);
        dc.set_pose(p).unwrap();
        assert_eq!(dc.get_pose(), p);
        assert!(matches!(
            dc.set_pose(Pose::new(0.0, f64::NAN, 0.0)),
            Err(DriveCtrlError::LocError(_))
        ));
    }

    #[test]
    fn test_heading_hold() {
        let mut p = params();
        p.heading_hold = true;
        let mut dc = drive_ctrl_with(p, Pose::default());

        // Rotation inside the deadband is no rotation
        dc.drive(0.25, 0.0, 0.01, false).unwrap();
        let report = run(&mut dc, 1);
        assert!(report.holding_heading);

        dc.drive(0.0, 0.0, 0.5, false).unwrap();
        let report = run(&mut dc, 50);
        assert!(!report.holding_heading);

        dc.drive(0.0, 0.0, 0.0, false).unwrap();
        let report = run(&mut dc, 1);
        assert!(report.holding_heading);
        let held_rad = dc.get_pose().heading_rad;

        run(&mut dc, 50);
        assert_abs_diff_eq!(dc.get_pose().heading_rad, held_rad, epsilon = 0.05);
        assert_abs_diff_eq!(dc.get_chassis_vel().omega_rads, 0.0, epsilon = 0.05);
    }

    #[test]
    fn test_sensor_faults() {
        let mut dc = drive_ctrl(Pose::default());

        dc.drive(0.25, 0.0, 0.0, false).unwrap();
        run(&mut dc, 20);

        dc.hw_mut().set_encoder_fault(1, true);
        dc.hw_mut().set_heading_fault(true);

        let report = run(&mut dc, 5);
        assert!(report.sens_faults.heading);
        assert!(report.sens_faults.drv_speed[1]);
        assert!(!report.sens_faults.drv_speed[0]);
        assert_eq!(dc.tm_snapshot().sens_faults, report.sens_faults);

        // Held values keep the estimate sensible
        assert_abs_diff_eq!(dc.get_chassis_vel().vx_ms, 0.5, epsilon = 1e-6);

        dc.hw_mut().set_encoder_fault(1, false);
        dc.hw_mut().set_heading_fault(false);
        let report = run(&mut dc, 1);
        assert!(!report.sens_faults.any());
    }

    #[test]
    fn test_invalid_params() {
        let mut p = params();
        p.cycle_period_s = 0.0;

        let sim = SimBase::new(
            SimParams {
                max_str_rate_degs: 1000.0,
                max_drv_accel_mss: 1000.0,
                gyro_drift_degs: 0.0,
                start_pose: Pose::default(),
            },
            SQUARE_M,
        )
        .unwrap();

        assert!(matches!(
            DriveCtrl::new(p, loc::Params::default(), traj_params(), Pose::default(), sim),
            Err(DriveCtrlError::InvalidParam("cycle_period_s", _))
        ));
    }
}
