//! Homogeneous rigid transforms and rotation/quaternion conversions.
//!
//! A [`Transform`] is a 4×4 matrix whose upper-left 3×3 block is a rotation,
//! whose last column holds the translation and whose last row is `[0, 0, 0, 1]`.
//! Matrices are stored column-major by `nalgebra` but constructed and read in
//! the usual row-major mathematical layout.

use core::fmt;
use core::ops::Mul;

use libm::{cos, fabs, sin};
use nalgebra::{Matrix3, Matrix4, Quaternion, Rotation3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;

/// Tolerance used when validating that a matrix is a rigid transform.
pub const ORTHONORMAL_TOLERANCE: f64 = 1e-9;

/// A rigid pose in 3-D space as a homogeneous 4×4 matrix.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform(Matrix4<f64>);

impl Transform {
    /// The identity transform.
    pub fn identity() -> Self {
        Transform(Matrix4::identity())
    }

    /// A pure translation.
    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Transform(Matrix4::new(
            1.0, 0.0, 0.0, x, //
            0.0, 1.0, 0.0, y, //
            0.0, 0.0, 1.0, z, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// A pure rotation of `angle` radians about the X axis.
    pub fn rotation_x(angle: f64) -> Self {
        let (s, c) = (sin(angle), cos(angle));
        Transform(Matrix4::new(
            1.0, 0.0, 0.0, 0.0, //
            0.0, c, -s, 0.0, //
            0.0, s, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// A pure rotation of `angle` radians about the Y axis.
    pub fn rotation_y(angle: f64) -> Self {
        let (s, c) = (sin(angle), cos(angle));
        Transform(Matrix4::new(
            c, 0.0, s, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            -s, 0.0, c, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// A pure rotation of `angle` radians about the Z axis.
    pub fn rotation_z(angle: f64) -> Self {
        let (s, c) = (sin(angle), cos(angle));
        Transform(Matrix4::new(
            c, -s, 0.0, 0.0, //
            s, c, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ))
    }

    /// Builds a transform from a translation and roll/pitch/yaw angles (radians).
    ///
    /// The rotation is `Rz(yaw) * Ry(pitch) * Rx(roll)`.
    pub fn from_rpy(translation: Vector3<f64>, roll: f64, pitch: f64, yaw: f64) -> Self {
        let rotation = UnitQuaternion::from_euler_angles(roll, pitch, yaw);
        Self::from_parts(&rotation, &translation)
    }

    /// Builds a transform from a unit quaternion and a translation vector.
    pub fn from_parts(rotation: &UnitQuaternion<f64>, translation: &Vector3<f64>) -> Self {
        let mut m = rotation.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(translation);
        Transform(m)
    }

    /// Wraps an arbitrary 4×4 matrix after checking that it is a rigid transform.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::NonOrthonormal)` if the last row is not
    /// `[0, 0, 0, 1]` or the rotation block is not a proper rotation.
    pub fn try_from_matrix(m: Matrix4<f64>) -> Result<Self, KinematicsError> {
        let last_row_ok = fabs(m[(3, 0)]) <= ORTHONORMAL_TOLERANCE
            && fabs(m[(3, 1)]) <= ORTHONORMAL_TOLERANCE
            && fabs(m[(3, 2)]) <= ORTHONORMAL_TOLERANCE
            && fabs(m[(3, 3)] - 1.0) <= ORTHONORMAL_TOLERANCE;
        if !last_row_ok {
            return Err(KinematicsError::NonOrthonormal("last row must be [0, 0, 0, 1]"));
        }

        let r: Matrix3<f64> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let gram_error = (r.transpose() * r - Matrix3::identity()).amax();
        if gram_error > ORTHONORMAL_TOLERANCE {
            return Err(KinematicsError::NonOrthonormal("rotation block is not orthonormal"));
        }
        if r.determinant() < 0.0 {
            return Err(KinematicsError::NonOrthonormal("rotation block is a reflection"));
        }
        Ok(Transform(m))
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Matrix4<f64> {
        &self.0
    }

    /// The 3×3 rotation block.
    pub fn rotation(&self) -> Matrix3<f64> {
        self.0.fixed_view::<3, 3>(0, 0).into_owned()
    }

    /// The translation column, i.e. the transform applied to the local origin.
    pub fn translation(&self) -> Vector3<f64> {
        self.0.fixed_view::<3, 1>(0, 3).into_owned()
    }

    /// Applies the transform to a point.
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation() * p + self.translation()
    }

    /// Inverse of a rigid transform, `[Rᵀ | -Rᵀt]`.
    pub fn inverse(&self) -> Self {
        let rt = self.rotation().transpose();
        let t = -(rt * self.translation());
        let mut m = Matrix4::identity();
        m.fixed_view_mut::<3, 3>(0, 0).copy_from(&rt);
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&t);
        Transform(m)
    }

    /// General matrix inverse, or `None` if the matrix is singular.
    ///
    /// Only needed for matrices that did not come through the constructors above.
    pub fn general_inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(Transform)
    }

    /// The rotation block as a unit quaternion.
    pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.rotation()))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::identity()
    }
}

impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform(self.0 * rhs.0)
    }
}

impl Mul<&Transform> for &Transform {
    type Output = Transform;

    fn mul(self, rhs: &Transform) -> Transform {
        Transform(self.0 * rhs.0)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation();
        let q = self.to_quaternion();
        write!(
            f,
            "(t: [{:.3}, {:.3}, {:.3}], q: [{:.3}, {:.3}, {:.3}, {:.3}])",
            t.x, t.y, t.z, q.w, q.i, q.j, q.k
        )
    }
}

/// Builds a unit quaternion from scalar-first components `[w, x, y, z]`.
///
/// The input is normalized.
pub fn quaternion_from_wxyz(q: [f64; 4]) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(Quaternion::new(q[0], q[1], q[2], q[3]))
}

/// Returns the scalar-first components `[w, x, y, z]` of a unit quaternion.
pub fn quaternion_to_wxyz(q: &UnitQuaternion<f64>) -> [f64; 4] {
    [q.w, q.i, q.j, q.k]
}

/// Converts a unit quaternion to its rotation matrix.
pub fn quaternion_to_rotation(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    q.to_rotation_matrix().into_inner()
}
