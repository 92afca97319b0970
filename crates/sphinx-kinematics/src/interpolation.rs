//! Rotation and translation blending between two poses.
//!
//! All functions take an interpolation parameter `alpha ∈ [0, 1]` and return
//! the first input exactly at `alpha = 0` and the second exactly at `alpha = 1`.

use libm::{acos, sin};
use nalgebra::{UnitQuaternion, Vector3};

use crate::error::KinematicsError;
use crate::transform::Transform;

/// Above this quaternion dot product slerp falls back to normalized lerp.
const DOT_THRESHOLD: f64 = 0.9995;

fn check_alpha(alpha: f64) -> Result<(), KinematicsError> {
    if alpha.is_nan() {
        return Err(KinematicsError::InvalidAlpha("must not be NaN"));
    }
    if !(0.0..=1.0).contains(&alpha) {
        return Err(KinematicsError::InvalidAlpha("must be within [0, 1]"));
    }
    Ok(())
}

/// Spherical linear interpolation between two unit quaternions.
///
/// Takes the shorter arc, and falls back to normalized linear interpolation
/// when the quaternions are nearly parallel.
///
/// # Errors
///
/// Returns `Err(KinematicsError::InvalidAlpha)` if `alpha` is NaN or outside `[0, 1]`.
pub fn quaternion_slerp(
    q1: &UnitQuaternion<f64>,
    q2: &UnitQuaternion<f64>,
    alpha: f64,
) -> Result<UnitQuaternion<f64>, KinematicsError> {
    check_alpha(alpha)?;
    Ok(slerp(q1, q2, alpha))
}

/// Component-wise linear interpolation between two positions.
///
/// # Errors
///
/// Returns `Err(KinematicsError::InvalidAlpha)` if `alpha` is NaN or outside `[0, 1]`.
pub fn position_lerp(
    p1: &Vector3<f64>,
    p2: &Vector3<f64>,
    alpha: f64,
) -> Result<Vector3<f64>, KinematicsError> {
    check_alpha(alpha)?;
    Ok(lerp(p1, p2, alpha))
}

/// Blends two rigid transforms: slerp on the rotations, lerp on the translations.
///
/// # Errors
///
/// Returns `Err(KinematicsError::InvalidAlpha)` if `alpha` is NaN or outside `[0, 1]`.
pub fn interpolate_transforms(
    t1: &Transform,
    t2: &Transform,
    alpha: f64,
) -> Result<Transform, KinematicsError> {
    check_alpha(alpha)?;
    Ok(blend(t1, t2, alpha))
}

/// Evenly spaced blends from `start` to `end`, both included.
///
/// Yields `steps + 1` transforms; a `steps` of zero is treated as one.
pub fn sample_transforms(start: Transform, end: Transform, steps: usize) -> TransformSamples {
    TransformSamples {
        start,
        end,
        steps: steps.max(1),
        next: 0,
    }
}

/// Iterator returned by [`sample_transforms`].
#[derive(Debug, Clone)]
pub struct TransformSamples {
    start: Transform,
    end: Transform,
    steps: usize,
    next: usize,
}

impl Iterator for TransformSamples {
    type Item = Transform;

    fn next(&mut self) -> Option<Transform> {
        if self.next > self.steps {
            return None;
        }
        let alpha = self.next as f64 / self.steps as f64;
        self.next += 1;
        Some(blend(&self.start, &self.end, alpha))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.steps + 1).saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TransformSamples {}

fn slerp(q1: &UnitQuaternion<f64>, q2: &UnitQuaternion<f64>, alpha: f64) -> UnitQuaternion<f64> {
    if alpha == 0.0 {
        return *q1;
    }
    if alpha == 1.0 {
        return *q2;
    }

    let a = q1.into_inner();
    let mut b = q2.into_inner();
    let mut dot = a.dot(&b);
    // q and -q are the same rotation; pick the one on the shorter arc.
    if dot < 0.0 {
        b = -b;
        dot = -dot;
    }

    if dot > DOT_THRESHOLD {
        return UnitQuaternion::new_normalize(a * (1.0 - alpha) + b * alpha);
    }

    let theta = acos(dot);
    let sin_theta = sin(theta);
    let w1 = sin((1.0 - alpha) * theta) / sin_theta;
    let w2 = sin(alpha * theta) / sin_theta;
    UnitQuaternion::new_normalize(a * w1 + b * w2)
}

fn lerp(p1: &Vector3<f64>, p2: &Vector3<f64>, alpha: f64) -> Vector3<f64> {
    if alpha == 0.0 {
        return *p1;
    }
    if alpha == 1.0 {
        return *p2;
    }
    p1 + (p2 - p1) * alpha
}

fn blend(t1: &Transform, t2: &Transform, alpha: f64) -> Transform {
    // Decomposing and recomposing is not bit-exact.
    if alpha == 0.0 {
        return *t1;
    }
    if alpha == 1.0 {
        return *t2;
    }
    let rotation = slerp(&t1.to_quaternion(), &t2.to_quaternion(), alpha);
    let translation = lerp(&t1.translation(), &t2.translation(), alpha);
    Transform::from_parts(&rotation, &translation)
}
