//! Kinematics of a single three-joint leg.
//!
//! The chain, composed from the base (joint `a1`) outward, is
//!
//! ```text
//! knee = base * Rz(π/2 - θ1) * Ry(θ2) * Tx(l)
//! tip  = knee * Ry(π + θ3)   * Tx(l)
//! ```
//!
//! so `θ1` is a yaw measured from the base frame's +Y axis, `θ2` pitches the
//! upper link (positive tilts it toward -Z) and `θ3` bends the knee, with
//! `θ3 = π` being fully extended.
//!
//! # Cached state
//!
//! Knee and tip positions are cached. [`Leg::set_base_transform`] only moves the
//! base; the cache keeps describing the previous base until
//! [`Leg::set_forward_kinematics`] or [`Leg::set_inverse_kinematics`] is called.
//! [`Leg::state`] reports which of the two situations the leg is in.

use core::f64::consts::{FRAC_PI_2, PI};
use core::fmt;

use libm::{acos, asin, atan, atan2, sin};
use nalgebra::Vector3;
use tracing::{debug, trace};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;
use crate::transform::Transform;

/// Targets closer than this to the base are treated as coinciding with it.
const DEGENERATE_DISTANCE: f64 = 1e-12;

/// The three joint angles of a leg, in radians.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointAngles {
    /// Hip yaw.
    pub theta1: f64,
    /// Hip pitch.
    pub theta2: f64,
    /// Knee bend.
    pub theta3: f64,
}

impl JointAngles {
    /// Fully extended configuration `(0, 0, π)`.
    pub const EXTENDED: JointAngles = JointAngles::new(0.0, 0.0, PI);

    /// Construct a new set of joint angles.
    pub const fn new(theta1: f64, theta2: f64, theta3: f64) -> Self {
        JointAngles {
            theta1,
            theta2,
            theta3,
        }
    }

    /// Whether all three angles lie strictly inside their joint ranges:
    /// `θ1 ∈ (-π/2, π/2)`, `θ2 ∈ (-π/2, π/2)`, `θ3 ∈ (-π, 0)`.
    pub fn within_limits(&self) -> bool {
        self.theta1 > -FRAC_PI_2
            && self.theta1 < FRAC_PI_2
            && self.theta2 > -FRAC_PI_2
            && self.theta2 < FRAC_PI_2
            && self.theta3 > -PI
            && self.theta3 < 0.0
    }
}

impl Default for JointAngles {
    fn default() -> Self {
        JointAngles::EXTENDED
    }
}

impl fmt::Display for JointAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(θ1: {:.3}, θ2: {:.3}, θ3: {:.3} rad)",
            self.theta1, self.theta2, self.theta3
        )
    }
}

/// How the hip yaw is recovered from a target in inverse kinematics.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YawConvention {
    /// `atan2(x, y)`: correct in every quadrant.
    #[default]
    TwoArgument,
    /// `atan(x / y)`: only correct for targets with `y > 0`. Targets behind the
    /// hip are mirrored to the front.
    SingleArgument,
}

impl YawConvention {
    fn yaw(self, x: f64, y: f64) -> f64 {
        match self {
            YawConvention::TwoArgument => atan2(x, y),
            YawConvention::SingleArgument if x == 0.0 && y == 0.0 => 0.0,
            YawConvention::SingleArgument => atan(x / y),
        }
    }
}

/// Whether the cached knee and tip positions match the current base transform.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegState {
    /// Cached positions were computed from the current angles and base transform.
    Consistent,
    /// The base transform changed after the last solve; cached positions still
    /// describe the previous base.
    BasePending,
}

/// Knee and tip world positions produced by forward kinematics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainPositions {
    /// World position of the knee joint (`a2`).
    pub knee: Vector3<f64>,
    /// World position of the leg tip.
    pub tip: Vector3<f64>,
}

/// A three-joint leg with two links of equal length.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    link_length: f64,
    base: Transform,
    angles: JointAngles,
    knee: Vector3<f64>,
    tip: Vector3<f64>,
    yaw_convention: YawConvention,
    state: LegState,
}

impl Leg {
    /// Construct a leg at `base` in the fully extended configuration.
    ///
    /// # Arguments
    ///
    /// * `base`: World transform of the hip joint `a1`.
    /// * `link_length`: Length of each of the two links.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidLinkLength)` if `link_length` is not positive and finite.
    pub fn new(base: Transform, link_length: f64) -> Result<Self, KinematicsError> {
        Self::with_angles(base, link_length, JointAngles::EXTENDED)
    }

    /// Construct a leg at `base` with the given joint angles.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidLinkLength)` if `link_length` is not positive and finite.
    pub fn with_angles(
        base: Transform,
        link_length: f64,
        angles: JointAngles,
    ) -> Result<Self, KinematicsError> {
        if !link_length.is_finite() {
            return Err(KinematicsError::InvalidLinkLength("must be finite"));
        }
        if link_length <= 0.0 {
            return Err(KinematicsError::InvalidLinkLength("must be positive"));
        }
        let positions = chain(&base, link_length, &angles);
        Ok(Leg {
            link_length,
            base,
            angles,
            knee: positions.knee,
            tip: positions.tip,
            yaw_convention: YawConvention::default(),
            state: LegState::Consistent,
        })
    }

    /// Returns the leg with a different yaw convention for inverse kinematics.
    pub fn with_yaw_convention(mut self, yaw_convention: YawConvention) -> Self {
        self.yaw_convention = yaw_convention;
        self
    }

    /// Returns the link length.
    pub fn link_length(&self) -> f64 {
        self.link_length
    }

    /// Returns the base (`a1`) transform.
    pub fn base_transform(&self) -> &Transform {
        &self.base
    }

    /// Returns the last committed joint angles.
    pub fn angles(&self) -> JointAngles {
        self.angles
    }

    /// Returns the cached knee position.
    pub fn knee_position(&self) -> Vector3<f64> {
        self.knee
    }

    /// Returns the cached tip position.
    pub fn tip_position(&self) -> Vector3<f64> {
        self.tip
    }

    /// Returns the yaw convention used by inverse kinematics.
    pub fn yaw_convention(&self) -> YawConvention {
        self.yaw_convention
    }

    /// Returns whether the cached positions match the current base transform.
    pub fn state(&self) -> LegState {
        self.state
    }

    /// Replaces the base transform, keeping joint angles and cached positions.
    ///
    /// The leg becomes [`LegState::BasePending`] until the next forward or
    /// inverse kinematics commit.
    pub fn set_base_transform(&mut self, base: Transform) {
        self.base = base;
        self.state = LegState::BasePending;
    }

    /// Computes knee and tip positions for `angles` under the current base
    /// without committing anything.
    pub fn forward_kinematics(&self, angles: &JointAngles) -> ChainPositions {
        chain(&self.base, self.link_length, angles)
    }

    /// Commits `angles` and recomputes the cached knee and tip positions.
    pub fn set_forward_kinematics(&mut self, angles: JointAngles) {
        let positions = self.forward_kinematics(&angles);
        self.angles = angles;
        self.knee = positions.knee;
        self.tip = positions.tip;
        self.state = LegState::Consistent;
        trace!(%angles, tip = ?self.tip, "forward kinematics committed");
    }

    /// Computes joint angles that place the tip at `target` without committing them.
    ///
    /// Out-of-domain arguments to `acos`/`asin` are clamped, so targets beyond
    /// the reach of the leg still produce angles; [`Leg::is_reachable`] is what
    /// rejects them.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::DegenerateTarget)` if `target` coincides with the base.
    pub fn inverse_kinematics(&self, target: &Vector3<f64>) -> Result<JointAngles, KinematicsError> {
        self.solve_local(&self.base, target).map(|(angles, _)| angles)
    }

    /// Whether the tip can be placed at `target`.
    ///
    /// A target is accepted if its solved angles lie inside the joint limits,
    /// or failing that, if it is within `2·l` of the base.
    pub fn is_reachable(&self, target: &Vector3<f64>) -> bool {
        self.reachable_from(&self.base, target).is_ok()
    }

    /// Solves for `target` and commits the angles if the target is reachable.
    ///
    /// On failure the leg is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::DegenerateTarget)` if `target` coincides with the base.
    /// Returns `Err(KinematicsError::Unreachable)` if `target` fails both reachability checks.
    pub fn set_inverse_kinematics(
        &mut self,
        target: &Vector3<f64>,
    ) -> Result<JointAngles, KinematicsError> {
        let angles = self.reachable_from(&self.base, target)?;
        self.set_forward_kinematics(angles);
        Ok(angles)
    }

    /// Reachability check and solve for a hypothetical base transform.
    pub(crate) fn reachable_from(
        &self,
        base: &Transform,
        target: &Vector3<f64>,
    ) -> Result<JointAngles, KinematicsError> {
        let (angles, distance) = self.solve_local(base, target)?;
        if angles.within_limits() {
            return Ok(angles);
        }
        // Coarse envelope, independent of the joint limits.
        if distance <= 2.0 * self.link_length {
            trace!(%angles, distance, "accepted by reach envelope outside joint limits");
            return Ok(angles);
        }
        debug!(distance, reach = 2.0 * self.link_length, "target unreachable");
        Err(KinematicsError::Unreachable)
    }

    /// Tip position for `angles` under a hypothetical base transform.
    pub(crate) fn tip_from(&self, base: &Transform, angles: &JointAngles) -> Vector3<f64> {
        chain(base, self.link_length, angles).tip
    }

    /// Inverse kinematics under `base`, also returning the base-to-target distance.
    fn solve_local(
        &self,
        base: &Transform,
        target: &Vector3<f64>,
    ) -> Result<(JointAngles, f64), KinematicsError> {
        let local = base.inverse().transform_point(target);
        let d = local.norm();
        if d < DEGENERATE_DISTANCE {
            return Err(KinematicsError::DegenerateTarget);
        }
        let l = self.link_length;

        let theta1 = self.yaw_convention.yaw(local.x, local.y);
        // Law of cosines on the isosceles (l, l, d) triangle.
        let theta3 = -acos(((2.0 * l * l - d * d) / (2.0 * l * l)).clamp(-1.0, 1.0));
        // Law of sines: angle between the upper link and the base-target line.
        let beta = asin((l * sin(theta3 + PI) / d).clamp(-1.0, 1.0));
        // Positive theta2 pitches toward -Z, so the elevation enters negated.
        let elevation = asin((local.z / d).clamp(-1.0, 1.0));
        let theta2 = -elevation - beta;

        Ok((JointAngles::new(theta1, theta2, theta3), d))
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Leg (l: {:.2}, {}, tip: [{:.3}, {:.3}, {:.3}])",
            self.link_length, self.angles, self.tip.x, self.tip.y, self.tip.z
        )
    }
}

fn chain(base: &Transform, l: f64, angles: &JointAngles) -> ChainPositions {
    let link = Transform::from_translation(l, 0.0, 0.0);
    let knee = *base
        * Transform::rotation_z(FRAC_PI_2 - angles.theta1)
        * Transform::rotation_y(angles.theta2)
        * link;
    let tip = knee * Transform::rotation_y(PI + angles.theta3) * link;
    ChainPositions {
        knee: knee.translation(),
        tip: tip.translation(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    const EPSILON: f64 = 1e-9;

    fn tilted_base() -> Transform {
        Transform::from_translation(0.2, -0.3, 0.5)
            * Transform::rotation_z(0.3)
            * Transform::rotation_x(0.4)
    }

    #[test]
    fn test_leg_constructor() {
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();
        assert_eq!(leg.link_length(), 1.0);
        assert_eq!(leg.angles(), JointAngles::EXTENDED);
        assert_eq!(leg.state(), LegState::Consistent);
        assert_eq!(leg.yaw_convention(), YawConvention::TwoArgument);
    }

    #[test]
    fn test_constructor_invalid_link_length() {
        let zero = Leg::new(Transform::identity(), 0.0);
        assert!(matches!(zero, Err(KinematicsError::InvalidLinkLength("must be positive"))));
        let negative = Leg::new(Transform::identity(), -1.0);
        assert!(matches!(negative, Err(KinematicsError::InvalidLinkLength("must be positive"))));
        let nan = Leg::new(Transform::identity(), f64::NAN);
        assert!(matches!(nan, Err(KinematicsError::InvalidLinkLength("must be finite"))));
    }

    #[test]
    fn test_default_angles_extend_along_base_y() {
        // Rz(π/2) turns the extended chain onto +Y; Ry(2π) is the identity.
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();
        assert_relative_eq!(leg.knee_position(), Vector3::new(0.0, 1.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(leg.tip_position(), Vector3::new(0.0, 2.0, 0.0), epsilon = EPSILON);

        // In the yawed leg plane the chain lies on +X.
        let plane = Transform::rotation_z(FRAC_PI_2);
        let planar_tip = plane.inverse().transform_point(&leg.tip_position());
        assert_relative_eq!(planar_tip, Vector3::new(2.0, 0.0, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn test_forward_kinematics_bent_knee() {
        // θ3 = -π/2: right angle at the knee, second link pointing down.
        let mut leg = Leg::new(Transform::identity(), 1.0).unwrap();
        leg.set_forward_kinematics(JointAngles::new(0.0, 0.0, -FRAC_PI_2));
        assert_relative_eq!(leg.knee_position(), Vector3::new(0.0, 1.0, 0.0), epsilon = EPSILON);
        assert_relative_eq!(leg.tip_position(), Vector3::new(0.0, 1.0, -1.0), epsilon = EPSILON);
    }

    #[test]
    fn test_forward_kinematics_is_pure() {
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();
        let before = leg.clone();
        let positions = leg.forward_kinematics(&JointAngles::new(0.5, 0.1, -1.0));
        assert_eq!(leg, before);
        assert!((positions.tip - leg.tip_position()).norm() > 0.1);
    }

    #[test]
    fn test_round_trip_within_limits() {
        let base = tilted_base();
        let mut leg = Leg::new(base, 1.0).unwrap();
        for angles in [
            JointAngles::new(0.3, 0.2, -1.0),
            JointAngles::new(-1.2, -0.9, -0.3),
            JointAngles::new(1.0, 1.2, -2.5),
            JointAngles::new(0.1, -0.4, -0.01),
        ] {
            let target = leg.forward_kinematics(&angles).tip;
            let solved = leg.inverse_kinematics(&target).unwrap();
            assert_relative_eq!(solved.theta1, angles.theta1, epsilon = 1e-9);
            assert_relative_eq!(solved.theta2, angles.theta2, epsilon = 1e-9);
            assert_relative_eq!(solved.theta3, angles.theta3, epsilon = 1e-6);

            leg.set_inverse_kinematics(&target).unwrap();
            assert_relative_eq!(leg.tip_position(), target, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_round_trip_behind_the_hip() {
        // θ1 outside (-π/2, π/2): only the two-argument yaw recovers the target.
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();
        let target = leg.forward_kinematics(&JointAngles::new(2.5, 0.3, -1.2)).tip;

        let solved = leg.inverse_kinematics(&target).unwrap();
        assert_relative_eq!(leg.forward_kinematics(&solved).tip, target, epsilon = EPSILON);

        let literal = leg.clone().with_yaw_convention(YawConvention::SingleArgument);
        let mirrored = literal.inverse_kinematics(&target).unwrap();
        assert!((literal.forward_kinematics(&mirrored).tip - target).norm() > 0.5);
    }

    #[test]
    fn test_single_argument_yaw_matches_in_front() {
        let leg = Leg::new(tilted_base(), 1.0)
            .unwrap()
            .with_yaw_convention(YawConvention::SingleArgument);
        let angles = JointAngles::new(0.4, -0.2, -1.3);
        let target = leg.forward_kinematics(&angles).tip;
        let solved = leg.inverse_kinematics(&target).unwrap();
        assert_relative_eq!(solved.theta1, angles.theta1, epsilon = 1e-9);
    }

    #[test]
    fn test_inverse_kinematics_degenerate_target() {
        let base = tilted_base();
        let mut leg = Leg::new(base, 1.0).unwrap();
        let before = leg.clone();
        let origin = base.translation();
        assert_eq!(leg.inverse_kinematics(&origin), Err(KinematicsError::DegenerateTarget));
        assert!(!leg.is_reachable(&origin));
        assert_eq!(leg.set_inverse_kinematics(&origin), Err(KinematicsError::DegenerateTarget));
        assert_eq!(leg, before);
    }

    #[test]
    fn test_reach_envelope_accepts_outside_joint_limits() {
        // Straight behind the hip: θ1 = π fails the joint limits, d = 1.9 ≤ 2l.
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();
        let target = Vector3::new(0.0, -1.9, 0.0);
        let angles = leg.inverse_kinematics(&target).unwrap();
        assert!(!angles.within_limits());
        assert!(leg.is_reachable(&target));
    }

    #[test]
    fn test_joint_limits_accept_in_front() {
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();
        let target = leg.forward_kinematics(&JointAngles::new(0.3, 0.2, -1.0)).tip;
        assert!(leg.inverse_kinematics(&target).unwrap().within_limits());
        assert!(leg.is_reachable(&target));
    }

    #[test]
    fn test_reach_boundary() {
        let leg = Leg::new(Transform::identity(), 1.0).unwrap();

        // d == 2l: θ3 = -π fails the open limit, the envelope still accepts.
        let edge = Vector3::new(0.0, 2.0, 0.0);
        let angles = leg.inverse_kinematics(&edge).unwrap();
        assert_eq!(angles.theta3, -PI);
        assert!(!angles.within_limits());
        assert!(leg.is_reachable(&edge));
        assert_relative_eq!(leg.forward_kinematics(&angles).tip, edge, epsilon = EPSILON);

        let beyond = Vector3::new(0.0, 2.0 + 1e-12, 0.0);
        assert!(!leg.is_reachable(&beyond));
    }

    #[test]
    fn test_out_of_reach_rejected_by_both_checks() {
        let mut leg = Leg::new(Transform::identity(), 1.0).unwrap();
        let before = leg.clone();
        for target in [Vector3::new(0.0, 2.1, 0.0), Vector3::new(0.0, -2.1, 0.0)] {
            // acos argument is clamped to -1, giving θ3 = -π exactly.
            let angles = leg.inverse_kinematics(&target).unwrap();
            assert_eq!(angles.theta3, -PI);
            assert!(!angles.within_limits());
            assert!(!leg.is_reachable(&target));
            assert_eq!(leg.set_inverse_kinematics(&target), Err(KinematicsError::Unreachable));
        }
        assert_eq!(leg, before);
    }

    #[test]
    fn test_set_base_transform_leaves_cache_pending() {
        let mut leg = Leg::new(Transform::identity(), 1.0).unwrap();
        let old_tip = leg.tip_position();

        leg.set_base_transform(Transform::from_translation(0.0, 0.0, 5.0));
        assert_eq!(leg.state(), LegState::BasePending);
        assert_eq!(leg.tip_position(), old_tip);

        leg.set_forward_kinematics(leg.angles());
        assert_eq!(leg.state(), LegState::Consistent);
        assert_relative_eq!(leg.tip_position(), Vector3::new(0.0, 2.0, 5.0), epsilon = EPSILON);
    }

    #[test]
    fn test_set_inverse_kinematics_clears_pending_state() {
        let mut leg = Leg::new(Transform::identity(), 1.0).unwrap();
        leg.set_base_transform(Transform::from_translation(0.0, 0.0, 1.5));
        let target = Vector3::new(0.0, 0.0, 0.0);
        leg.set_inverse_kinematics(&target).unwrap();
        assert_eq!(leg.state(), LegState::Consistent);
        assert_relative_eq!(leg.tip_position(), target, epsilon = EPSILON);
    }

    #[test]
    fn test_within_limits_is_open() {
        assert!(!JointAngles::new(FRAC_PI_2, 0.0, -1.0).within_limits());
        assert!(!JointAngles::new(0.0, -FRAC_PI_2, -1.0).within_limits());
        assert!(!JointAngles::new(0.0, 0.0, 0.0).within_limits());
        assert!(!JointAngles::EXTENDED.within_limits());
        assert!(JointAngles::new(0.0, 0.0, -1.0).within_limits());
    }
}
