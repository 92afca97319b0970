//! Three-legged body kinematics.
//!
//! A [`Body`] owns three [`Leg`]s whose base transforms are fixed offsets from
//! the body frame. Feet are planted on the ground plane `z = 0` when the body is
//! built; afterwards the only way to move the body is
//! [`Body::set_body_transform_keep_feet_fixed`], which either re-solves all three
//! legs for their unchanged footholds or changes nothing at all.

use core::f64::consts::FRAC_PI_2;
use core::fmt;

use nalgebra::Vector3;
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::KinematicsError;
use crate::leg::{JointAngles, Leg, YawConvention};
use crate::transform::Transform;

/// Largest distance between a solved tip and its foothold that still counts as held.
const FOOTHOLD_TOLERANCE: f64 = 1e-9;

/// Identifies one of the three legs of a [`Body`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LegId {
    /// Leg offset by `-d2` along the `p2` attachment's local Z.
    P1,
    /// Leg at `+d1` along the body X axis.
    P2,
    /// Leg at `-d1` along the body X axis.
    P3,
}

impl LegId {
    /// All legs, in storage order.
    pub const ALL: [LegId; 3] = [LegId::P1, LegId::P2, LegId::P3];

    const fn index(self) -> usize {
        match self {
            LegId::P1 => 0,
            LegId::P2 => 1,
            LegId::P3 => 2,
        }
    }
}

impl fmt::Display for LegId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LegId::P1 => write!(f, "p1"),
            LegId::P2 => write!(f, "p2"),
            LegId::P3 => write!(f, "p3"),
        }
    }
}

/// A body with three legs sharing one link length.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    transform: Transform,
    d1: f64,
    d2: f64,
    link_length: f64,
    legs: [Leg; 3],
}

impl Body {
    /// Construct a body at `transform` and plant each foot on `z = 0` directly
    /// below its leg attachment.
    ///
    /// # Arguments
    ///
    /// * `transform`: World transform of the body frame.
    /// * `d1`: Half-separation of the `p2`/`p3` attachments along body X.
    /// * `d2`: Offset of the `p1` attachment from `p2`.
    /// * `link_length`: Link length shared by all legs.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InvalidGeometry)` if `d1` or `d2` is not finite.
    /// Returns `Err(KinematicsError::InvalidLinkLength)` if `link_length` is not positive and finite.
    /// Returns `Err(KinematicsError::FootplantUnreachable)` if a foot cannot be planted,
    /// including when the solved angles would put the tip anywhere but the footplant.
    pub fn new(transform: Transform, d1: f64, d2: f64, link_length: f64) -> Result<Self, KinematicsError> {
        Self::with_yaw_convention(transform, d1, d2, link_length, YawConvention::default())
    }

    /// Like [`Body::new`], with every leg using `yaw_convention` for inverse kinematics.
    ///
    /// # Errors
    ///
    /// See [`Body::new`].
    pub fn with_yaw_convention(
        transform: Transform,
        d1: f64,
        d2: f64,
        link_length: f64,
        yaw_convention: YawConvention,
    ) -> Result<Self, KinematicsError> {
        if !d1.is_finite() || !d2.is_finite() {
            return Err(KinematicsError::InvalidGeometry("d1 and d2 must be finite"));
        }

        let [a1, a2, a3] = attachments(&transform, d1, d2);
        let mut legs = [
            Leg::new(a1, link_length)?.with_yaw_convention(yaw_convention),
            Leg::new(a2, link_length)?.with_yaw_convention(yaw_convention),
            Leg::new(a3, link_length)?.with_yaw_convention(yaw_convention),
        ];

        for (id, leg) in LegId::ALL.into_iter().zip(legs.iter_mut()) {
            let base = *leg.base_transform();
            let anchor = base.translation();
            let footplant = Vector3::new(anchor.x, anchor.y, 0.0);
            let angles = hold_foothold(leg, &base, &footplant).map_err(|e| {
                warn!(leg = %id, error = %e, ?footplant, "cannot plant foot");
                KinematicsError::FootplantUnreachable { leg: id }
            })?;
            leg.set_forward_kinematics(angles);
        }

        debug!(%transform, d1, d2, link_length, "body constructed");
        Ok(Body {
            transform,
            d1,
            d2,
            link_length,
            legs,
        })
    }

    /// Returns the body transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Returns `d1`.
    pub fn d1(&self) -> f64 {
        self.d1
    }

    /// Returns `d2`.
    pub fn d2(&self) -> f64 {
        self.d2
    }

    /// Returns the shared link length.
    pub fn link_length(&self) -> f64 {
        self.link_length
    }

    /// Returns one leg.
    pub fn leg(&self, id: LegId) -> &Leg {
        &self.legs[id.index()]
    }

    /// Iterates over the legs with their identifiers.
    pub fn legs(&self) -> impl Iterator<Item = (LegId, &Leg)> {
        LegId::ALL.into_iter().zip(self.legs.iter())
    }

    /// Current tip positions, in [`LegId::ALL`] order.
    pub fn footholds(&self) -> [Vector3<f64>; 3] {
        [
            self.legs[0].tip_position(),
            self.legs[1].tip_position(),
            self.legs[2].tip_position(),
        ]
    }

    /// Moves the body to `candidate` while every foot stays where it is.
    ///
    /// Each leg is checked for reachability of its current foothold from the
    /// attachment implied by `candidate`. Only if all three pass are the body
    /// transform, the leg attachments and the joint angles updated together.
    ///
    /// # Errors
    ///
    /// Returns `Err(KinematicsError::InfeasibleBodyMove)` naming the first leg
    /// that cannot hold its foothold. The body is left unchanged.
    pub fn set_body_transform_keep_feet_fixed(
        &mut self,
        candidate: Transform,
    ) -> Result<(), KinematicsError> {
        let targets = attachments(&candidate, self.d1, self.d2);
        let mut solved = [JointAngles::EXTENDED; 3];

        for (i, id) in LegId::ALL.into_iter().enumerate() {
            let leg = &self.legs[i];
            let foothold = leg.tip_position();
            solved[i] = hold_foothold(leg, &targets[i], &foothold).map_err(|e| {
                info!(leg = %id, error = %e, %candidate, "rejected body move");
                KinematicsError::InfeasibleBodyMove { leg: id }
            })?;
        }

        self.transform = candidate;
        for ((leg, base), angles) in self.legs.iter_mut().zip(targets).zip(solved) {
            leg.set_base_transform(base);
            leg.set_forward_kinematics(angles);
        }
        debug!(transform = %self.transform, "body moved with feet fixed");
        Ok(())
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Body {} (d1: {:.2}, d2: {:.2}, l: {:.2})",
            self.transform, self.d1, self.d2, self.link_length
        )
    }
}

/// Solves `leg` for `foothold` under `base` and checks the solved tip lands on it.
///
/// The reach envelope accepts targets whose angles do not reproduce them (a
/// single-argument yaw mirrors targets behind the hip), so the tip is verified
/// before anything is committed.
fn hold_foothold(
    leg: &Leg,
    base: &Transform,
    foothold: &Vector3<f64>,
) -> Result<JointAngles, KinematicsError> {
    let angles = leg.reachable_from(base, foothold)?;
    let miss = (leg.tip_from(base, &angles) - foothold).norm();
    if miss > FOOTHOLD_TOLERANCE {
        debug!(miss, %angles, "solved tip misses the foothold");
        return Err(KinematicsError::Unreachable);
    }
    Ok(angles)
}

/// World transforms of the `p1`, `p2`, `p3` attachments for a body at `body`.
fn attachments(body: &Transform, d1: f64, d2: f64) -> [Transform; 3] {
    let shared = Transform::rotation_x(FRAC_PI_2);
    let p2 = Transform::from_translation(d1, 0.0, 0.0) * shared;
    let p3 = Transform::from_translation(-d1, 0.0, 0.0) * shared;
    let p1 = p2 * Transform::from_translation(0.0, 0.0, -d2);
    [*body * p1, *body * p2, *body * p3]
}
