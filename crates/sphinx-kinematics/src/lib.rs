#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for three-joint leg kinematics."]
#![doc = ""]
#![doc = "This crate provides homogeneous transforms, forward and inverse kinematics"]
#![doc = "for a single leg, a three-legged body that moves while keeping its feet"]
#![doc = "planted, and pose interpolation for sampling trajectories."]
#![doc = ""]
#![doc = "Angles are in radians. Quaternions are `nalgebra` unit quaternions; use"]
#![doc = "[`quaternion_from_wxyz`] and [`quaternion_to_wxyz`] for scalar-first arrays."]

pub mod body;
pub mod error;
pub mod interpolation;
pub mod leg;
pub mod transform;

pub use body::{Body, LegId};
pub use error::KinematicsError;
pub use interpolation::{
    interpolate_transforms, position_lerp, quaternion_slerp, sample_transforms, TransformSamples,
};
pub use leg::{ChainPositions, JointAngles, Leg, LegState, YawConvention};
pub use transform::{quaternion_from_wxyz, quaternion_to_rotation, quaternion_to_wxyz, Transform};

pub use nalgebra::{UnitQuaternion, Vector3};
