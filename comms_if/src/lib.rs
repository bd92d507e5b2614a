//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data read from the drive equipment
pub mod eqpt;

/// Telecommands accepted by the drive executable
pub mod tc;
