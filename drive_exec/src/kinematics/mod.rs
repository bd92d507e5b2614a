//! # Kinematics module
//!
//! Transforms between the chassis velocity of the swerve base and the
//! speed/angle pairs of its four wheel modules.
//!
//! The forward transform (chassis to modules) evaluates, for each module at
//! position `r_i` in the Robot Body (RB) frame, `v_i = v + omega x r_i`. The
//! inverse transform solves the overdetermined linear system formed by
//! stacking all module equations, in a least squares sense, using a pseudo
//! inverse which is computed once when the kinematics are built.
//!
//! Angle conventions: chassis `omega_rads` and all headings are counter
//! clockwise positive about RB_Z (up). Module angles are measured from RB_X
//! (forwards) towards RB_Y (left) in degrees.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod chassis_vel;
mod module_state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::trace;
use nalgebra::{SMatrix, SVector, Vector2};

pub use chassis_vel::*;
pub use module_state::*;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of swerve modules on the base.
pub const NUM_MODULES: usize = comms_if::tc::NUM_MODULES;

/// Number of rows in the kinematics matrix, two per module.
const NUM_ROWS: usize = 2 * NUM_MODULES;

/// Minimum area of the triangle formed by three module positions for them
/// to be considered non-collinear.
///
/// Units: meters^2
const MIN_GEOMETRY_AREA_M2: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematics of the swerve base, built from the fixed module positions.
#[derive(Debug, Clone)]
pub struct SwerveKinematics {
    /// Position of each module in the RB frame.
    ///
    /// Units: meters,
    /// Frame: Robot body
    module_pos_m_rb: [Vector2<f64>; NUM_MODULES],

    /// Forward matrix mapping `[vx, vy, omega]` to stacked module velocity
    /// vectors `[vx_0, vy_0, vx_1, vy_1, ...]`.
    fwd_mat: SMatrix<f64, NUM_ROWS, 3>,

    /// Least squares pseudo inverse of `fwd_mat`.
    inv_mat: SMatrix<f64, 3, NUM_ROWS>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which can occur in kinematics calculations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KinematicsError {
    #[error("Module {0} position {1:?} is not finite")]
    NonFiniteGeometry(usize, [f64; 2]),

    #[error("Module geometry is degenerate, at least 3 modules must not be collinear")]
    DegenerateGeometry,

    #[error("Kinematics require a robot frame chassis velocity, got a {0:?} frame one")]
    WrongFrame(Frame),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SwerveKinematics {
    /// Build the kinematics for the given module positions.
    ///
    /// Returns an error if the geometry cannot resolve a chassis velocity,
    /// i.e. if fewer than three of the modules are non-collinear.
    pub fn new(module_pos_m_rb: [[f64; 2]; NUM_MODULES]) -> Result<Self, KinematicsError> {
        for (i, p) in module_pos_m_rb.iter().enumerate() {
            if !p[0].is_finite() || !p[1].is_finite() {
                return Err(KinematicsError::NonFiniteGeometry(i, *p));
            }
        }

        let pos: [Vector2<f64>; NUM_MODULES] = [
            Vector2::from(module_pos_m_rb[0]),
            Vector2::from(module_pos_m_rb[1]),
            Vector2::from(module_pos_m_rb[2]),
            Vector2::from(module_pos_m_rb[3]),
        ];

        if !has_non_collinear_triple(&pos) {
            return Err(KinematicsError::DegenerateGeometry);
        }

        // Each module contributes the rows
        //  [1, 0, -y_i]
        //  [0, 1,  x_i]
        let mut fwd_mat = SMatrix::<f64, NUM_ROWS, 3>::zeros();
        for (i, p) in pos.iter().enumerate() {
            fwd_mat[(2 * i, 0)] = 1.0;
            fwd_mat[(2 * i, 2)] = -p[1];
            fwd_mat[(2 * i + 1, 1)] = 1.0;
            fwd_mat[(2 * i + 1, 2)] = p[0];
        }

        // Pseudo inverse (A^T A)^-1 A^T, the 3x3 normal matrix is invertible
        // whenever the geometry passed the collinearity check.
        let fwd_t = fwd_mat.transpose();
        let inv_mat = (fwd_t * fwd_mat)
            .try_inverse()
            .ok_or(KinematicsError::DegenerateGeometry)?
            * fwd_t;

        Ok(Self {
            module_pos_m_rb: pos,
            fwd_mat,
            inv_mat,
        })
    }

    /// Get the position of each module in the RB frame.
    pub fn module_pos_m_rb(&self) -> &[Vector2<f64>; NUM_MODULES] {
        &self.module_pos_m_rb
    }

    /// Calculate the module states which achieve the given chassis velocity.
    ///
    /// Modules whose demanded velocity is zero have no defined direction, for
    /// these the angle in `prev_states` is kept and the speed set to zero.
    ///
    /// The chassis velocity must be in the robot frame.
    pub fn forward(
        &self,
        vel: &ChassisVel,
        prev_states: &[ModuleState; NUM_MODULES],
    ) -> Result<[ModuleState; NUM_MODULES], KinematicsError> {
        if vel.frame != Frame::Robot {
            return Err(KinematicsError::WrongFrame(vel.frame));
        }

        let vel_vec = SVector::<f64, 3>::new(vel.vx_ms, vel.vy_ms, vel.omega_rads);
        let mod_vec = self.fwd_mat * vel_vec;

        let mut states = [ModuleState::default(); NUM_MODULES];
        for i in 0..NUM_MODULES {
            states[i] = ModuleState::from_vector(
                mod_vec[2 * i],
                mod_vec[2 * i + 1],
                prev_states[i].angle_deg,
            );
        }

        trace!("Forward kinematics {:?} -> {:?}", vel, states);

        Ok(states)
    }

    /// Calculate the chassis velocity which best explains the given module
    /// states, in the robot frame.
    ///
    /// Module angles may be given either canonically or continuously.
    pub fn inverse(&self, states: &[ModuleState; NUM_MODULES]) -> ChassisVel {
        let mut mod_vec = SVector::<f64, NUM_ROWS>::zeros();
        for (i, s) in states.iter().enumerate() {
            let v = s.vector();
            mod_vec[2 * i] = v[0];
            mod_vec[2 * i + 1] = v[1];
        }

        let vel_vec = self.inv_mat * mod_vec;

        ChassisVel::new_rb(vel_vec[0], vel_vec[1], vel_vec[2])
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Scale all module speeds so that none exceed `max_speed_ms`.
///
/// All speeds are scaled by the same factor so that the ratios between them,
/// and therefore the direction of travel of the chassis, are preserved.
/// Returns the applied scale factor, which is `1.0` if no scaling was needed.
pub fn desaturate(states: &mut [ModuleState; NUM_MODULES], max_speed_ms: f64) -> f64 {
    let max_req_ms = states
        .iter()
        .map(|s| s.speed_ms.abs())
        .fold(0f64, f64::max);

    if max_req_ms <= max_speed_ms || max_req_ms <= 0.0 {
        return 1.0;
    }

    let scale = max_speed_ms / max_req_ms;
    for s in states.iter_mut() {
        s.speed_ms *= scale;
    }

    scale
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Check that at least one triple of points spans a triangle of non-zero
/// area.
fn has_non_collinear_triple(pos: &[Vector2<f64>; NUM_MODULES]) -> bool {
    for i in 0..NUM_MODULES {
        for j in (i + 1)..NUM_MODULES {
            for k in (j + 1)..NUM_MODULES {
                let a = pos[j] - pos[i];
                let b = pos[k] - pos[i];
                let area = 0.5 * (a[0] * b[1] - a[1] * b[0]).abs();

                if area > MIN_GEOMETRY_AREA_M2 {
                    return true;
                }
            }
        }
    }

    false
}
