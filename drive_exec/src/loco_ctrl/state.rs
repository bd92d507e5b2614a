//! Implementations for the LocoCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace};
use serde::Serialize;

// Internal
use super::{solve_str_abs_pos_deg, LocoCmd, LocoCtrlError, Params};
use crate::kinematics::{desaturate, ChassisVel, ModuleState, SwerveKinematics, NUM_MODULES};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Locomotion control module state
#[derive(Debug, Clone)]
pub struct LocoCtrl {
    params: Params,

    kin: SwerveKinematics,

    /// Canonical module states demanded on the previous cycle, used to hold
    /// the wheel directions when a module has no velocity demand.
    target_states: [ModuleState; NUM_MODULES],

    output: Option<OutputData>,
}

/// Input data to Locomotion Control.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// The command to be executed.
    pub cmd: LocoCmd,

    /// Current (continuous) absolute position of each steer axis.
    ///
    /// Units: degrees
    pub str_abs_pos_deg: [f64; NUM_MODULES],
}

/// Output command from LocoCtrl that the actuators must execute.
#[derive(Clone, Copy, Serialize, Debug, Default, PartialEq)]
pub struct OutputData {
    /// Steer axis absolute position demand, continuous.
    ///
    /// Units: degrees
    pub str_abs_pos_deg: [f64; NUM_MODULES],

    /// Drive axis ground speed demand.
    ///
    /// Units: meters/second
    pub drv_speed_ms: [f64; NUM_MODULES],
}

/// Status report for LocoCtrl processing.
#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
pub struct StatusReport {
    /// True if the module speeds had to be scaled down this cycle.
    pub desaturated: bool,

    /// The scale applied to all module speeds, `1.0` if not desaturated.
    pub speed_scale: f64,
}

impl Default for StatusReport {
    fn default() -> Self {
        Self {
            desaturated: false,
            speed_scale: 1.0,
        }
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocoCtrl {
    /// Create a new instance of LocoCtrl from its parameters.
    pub fn new(params: Params) -> Result<Self, LocoCtrlError> {
        if !(params.max_module_speed_ms.is_finite() && params.max_module_speed_ms > 0.0) {
            return Err(LocoCtrlError::InvalidMaxSpeed(params.max_module_speed_ms));
        }

        let kin = SwerveKinematics::new(params.module_pos_m_rb)?;

        Ok(Self {
            params,
            kin,
            target_states: [ModuleState::default(); NUM_MODULES],
            output: None,
        })
    }

    /// The kinematics used by this controller.
    pub fn kinematics(&self) -> &SwerveKinematics {
        &self.kin
    }

    /// The canonical module states demanded on the last cycle.
    pub fn target_states(&self) -> &[ModuleState; NUM_MODULES] {
        &self.target_states
    }

    /// The output of the last cycle, if any.
    pub fn output(&self) -> Option<&OutputData> {
        self.output.as_ref()
    }

    /// Calculate the output for a velocity command.
    fn calc_vel_output(
        &mut self,
        cmd_vel: &ChassisVel,
        str_abs_pos_deg: &[f64; NUM_MODULES],
        report: &mut StatusReport,
    ) -> Result<OutputData, LocoCtrlError> {
        let mut states = self.kin.forward(cmd_vel, &self.target_states)?;

        report.speed_scale = desaturate(&mut states, self.params.max_module_speed_ms);
        report.desaturated = report.speed_scale < 1.0;
        if report.desaturated {
            debug!(
                "Module speeds desaturated by a factor of {:.3}",
                report.speed_scale
            );
        }

        self.target_states = states;

        let mut output = OutputData::default();
        for i in 0..NUM_MODULES {
            output.str_abs_pos_deg[i] =
                solve_str_abs_pos_deg(str_abs_pos_deg[i], states[i].angle_deg);
            output.drv_speed_ms[i] = states[i].speed_ms;
        }

        Ok(output)
    }

    /// Calculate the output for a stop command, holding the steer demands.
    fn calc_stop_output(&mut self, input: &InputData) -> OutputData {
        let mut output = OutputData::default();

        for i in 0..NUM_MODULES {
            self.target_states[i].speed_ms = 0.0;
            output.str_abs_pos_deg[i] =
                solve_str_abs_pos_deg(input.str_abs_pos_deg[i], self.target_states[i].angle_deg);
        }

        output
    }
}

impl State for LocoCtrl {
    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = LocoCtrlError;

    /// Perform cyclic processing of Locomotion Control.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut report = StatusReport::default();

        if !input_data.cmd.is_finite() {
            return Err(LocoCtrlError::NonFiniteCmd(input_data.cmd));
        }

        let output = match input_data.cmd {
            LocoCmd::Vel(ref v) => {
                self.calc_vel_output(v, &input_data.str_abs_pos_deg, &mut report)?
            }
            LocoCmd::Stop => self.calc_stop_output(input_data),
            LocoCmd::Raw {
                str_abs_pos_deg,
                drv_speed_ms,
            } => OutputData {
                str_abs_pos_deg,
                drv_speed_ms,
            },
        };

        trace!("LocoCtrl output: {:?}", output);

        self.output = Some(output);

        Ok((output, report))
    }
}
