//! # Swerve drive library
//!
//! Motion control for a four wheel independently steered (swerve) robot.
//! The library is used by the `drive_exec` executable and benchmarks.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

/// Drive control - runs the full control chain once per cycle
pub mod drive_ctrl;

/// Hardware access layer - sensor and actuator ports
pub mod hal;

/// Kinematics - transforms between chassis and module velocities
pub mod kinematics;

/// Localisation - dead reckoning of the robot's field pose
pub mod loc;

/// Locomotion control - converts chassis velocity demands into module setpoints
pub mod loco_ctrl;

/// Simulated swerve base implementing the hardware ports
pub mod sim;

/// Telecommand processor - maps telecommands onto drive control commands
pub mod tc_processor;

/// Telemetry snapshots and their shared handle
pub mod tm;

/// Trajectory control - keeps the robot on the given trajectory
pub mod traj_ctrl;
