//! Error types for the kinematics library.
//!
//! This module defines the errors that can occur while solving leg and body
//! kinematics or while blending poses.

use core::fmt;

use crate::body::LegId;

/// Errors that can occur in kinematic calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KinematicsError {
    /// Error for invalid link length.
    /// This variant is returned when a link length is provided that is not positive and finite.
    InvalidLinkLength(&'static str),
    /// Error for invalid body geometry.
    /// This variant is returned when `d1` or `d2` is not finite.
    InvalidGeometry(&'static str),
    /// The target coincides with the leg base, so no chain direction can be formed.
    DegenerateTarget,
    /// The target lies outside both the joint-limit test and the reach envelope.
    Unreachable,
    /// A constrained body move was rejected because this leg could not keep its foothold.
    InfeasibleBodyMove {
        /// First leg that failed the reachability check.
        leg: LegId,
    },
    /// A foot could not be planted below its attachment while building a body.
    FootplantUnreachable {
        /// Leg whose footplant solve failed.
        leg: LegId,
    },
    /// Error for an interpolation parameter outside `[0, 1]`.
    InvalidAlpha(&'static str),
    /// A matrix that was expected to be a rigid transform is not one.
    NonOrthonormal(&'static str),
}

impl fmt::Display for KinematicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KinematicsError::InvalidLinkLength(msg) => write!(f, "Invalid link length: {}", msg),
            KinematicsError::InvalidGeometry(msg) => write!(f, "Invalid body geometry: {}", msg),
            KinematicsError::DegenerateTarget => {
                write!(f, "Degenerate target: coincides with the leg base")
            }
            KinematicsError::Unreachable => write!(f, "Target is not reachable by the leg tip"),
            KinematicsError::InfeasibleBodyMove { leg } => {
                write!(f, "Infeasible body move: leg {} cannot keep its foothold", leg)
            }
            KinematicsError::FootplantUnreachable { leg } => {
                write!(f, "Footplant unreachable for leg {}", leg)
            }
            KinematicsError::InvalidAlpha(msg) => {
                write!(f, "Invalid interpolation parameter: {}", msg)
            }
            KinematicsError::NonOrthonormal(msg) => write!(f, "Not a rigid transform: {}", msg),
        }
    }
}

impl core::error::Error for KinematicsError {}
